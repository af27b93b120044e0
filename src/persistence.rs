//! Binding document storage
//!
//! Bindings are kept as a flat TOML table next to the settings, by default in
//! `<user config dir>/controlbind/bindings.toml`. A missing file is not an
//! error; the application simply starts without bindings.

use crate::binding::BindingDocument;
use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing::{debug, info};

pub async fn save_bindings(path: &Path, document: &BindingDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !tokio::fs::try_exists(parent)
            .await
            .map_err(|e| eyre!("Failed to check if bindings directory exists: {}", e))?
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create bindings directory: {}", e))?;
        }
    }

    let content = document
        .to_toml_string()
        .map_err(|e| eyre!("Failed to serialize bindings: {}", e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write bindings file {}: {}", path.display(), e))?;

    info!("Saved {} binding(s) to {}", document.len(), path.display());
    Ok(())
}

/// Returns `None` when there is no file at `path`.
pub async fn load_bindings(path: &Path) -> Result<Option<BindingDocument>> {
    if !tokio::fs::try_exists(path)
        .await
        .map_err(|e| eyre!("Failed to check bindings file {}: {}", path.display(), e))?
    {
        debug!("No bindings file at {}", path.display());
        return Ok(None);
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| eyre!("Failed to read bindings file {}: {}", path.display(), e))?;
    let document = BindingDocument::from_toml_str(&raw)
        .map_err(|e| eyre!("Invalid bindings file {}: {}", path.display(), e))?;

    info!("Loaded {} binding(s) from {}", document.len(), path.display());
    Ok(Some(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingKey;

    #[tokio::test]
    async fn saved_document_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("bindings.toml");

        let mut document = BindingDocument::new();
        document.insert(BindingKey::keyboard("space"), "jump");
        document.insert(BindingKey::gamepad_axis(0), "steer");

        save_bindings(&path, &document).await.expect("saved");
        let loaded = load_bindings(&path).await.expect("readable");
        assert_eq!(loaded, Some(document));
    }

    #[tokio::test]
    async fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = load_bindings(&dir.path().join("bindings.toml"))
            .await
            .expect("readable");
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bindings.toml");
        tokio::fs::write(&path, "space = [1, 2]\n").await.expect("written");
        assert!(load_bindings(&path).await.is_err());
    }
}
