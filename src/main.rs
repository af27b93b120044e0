use color_eyre::{eyre::eyre, Result};
use controlbind::binding::{CallbackRegistry, RestoreIssue};
use controlbind::config::{default_settings_path, CoordinatorSettings};
use controlbind::persistence::{load_bindings, save_bindings};
use controlbind::source::{GilrsSource, InputSource, ManualSource};
use controlbind::{BindingKey, CaptureTarget, CoordinatorHandle, InputCoordinator, InputEvent};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const HELP: &str = "\
commands:
  press <key>              simulate a key press
  bind <action>            bind the next key or button press to <action>
  bind-axis <action> [n]   bind the next axis movement (axis n only, if given)
  unbind <key>             remove a binding
  list                     show bindings
  save                     write bindings to disk
  quit                     save and exit";

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let settings = match default_settings_path() {
        Some(path) => CoordinatorSettings::load(&path).await?,
        None => CoordinatorSettings::default(),
    };
    settings
        .validate()
        .map_err(|e| eyre!("Invalid settings: {}", e))?;
    let bindings_path = settings.bindings_path();

    let registry = action_registry();

    let source: Box<dyn InputSource> =
        match GilrsSource::spawn(Duration::from_millis(settings.frame_interval_ms)) {
            Ok(source) => Box::new(source),
            Err(e) => {
                warn!("Gamepad support unavailable ({}), keyboard only", e);
                Box::new(ManualSource::new())
            }
        };

    let handle = CoordinatorHandle::spawn(InputCoordinator::new(settings), source)
        .map_err(|e| eyre!("Failed to start input driver: {}", e))?;

    if let Some(path) = &bindings_path {
        if let Some(document) = load_bindings(path).await? {
            let report = handle.load_bindings(document, registry.clone()).await?;
            for issue in &report.issues {
                match issue {
                    RestoreIssue::Unresolved { key, name } => {
                        warn!("Skipping '{}': no action named '{}'", key, name)
                    }
                    RestoreIssue::Conflict { key, name } => {
                        warn!("Skipping '{}' = '{}': key already bound", key, name)
                    }
                }
            }
        }
    }

    println!("{HELP}");
    run_console(&handle, &registry, bindings_path.as_ref()).await?;

    save(&handle, bindings_path.as_ref()).await?;
    handle
        .shutdown()
        .await
        .map_err(|e| eyre!("Failed to stop input driver: {}", e))?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

fn action_registry() -> CallbackRegistry {
    let mut registry = CallbackRegistry::new();
    registry.register("jump", |ctx| info!("Jump! ({})", ctx.key));
    registry.register("fire", |ctx| info!("Fire! ({})", ctx.key));
    registry.register("pause", |_| info!("Pause toggled"));
    registry.register("steer", |ctx| match ctx.axis {
        Some(axis) => info!("Steering axis {} at {:.2}", axis.index, axis.value),
        None => info!("Steer pressed ({})", ctx.key),
    });
    registry
}

async fn run_console(
    handle: &CoordinatorHandle,
    registry: &CallbackRegistry,
    bindings_path: Option<&PathBuf>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match (command, words.next(), words.next()) {
            ("press", Some(key), _) => {
                handle
                    .inject(InputEvent::KeyDown {
                        key: key.to_string(),
                    })
                    .await?
            }
            ("bind", Some(action), _) => {
                capture(handle, registry, action, CaptureTarget::Input).await?
            }
            ("bind-axis", Some(action), index) => {
                let target = match index.map(str::parse::<usize>).transpose() {
                    Ok(index) => CaptureTarget::Axis { index },
                    Err(e) => {
                        warn!("Invalid axis index: {}", e);
                        continue;
                    }
                };
                capture(handle, registry, action, target).await?
            }
            ("unbind", Some(key), _) => {
                if let Err(e) = handle.unbind(BindingKey::from(key)).await {
                    warn!("{}", e);
                }
            }
            ("list", _, _) => {
                for (key, label) in handle.list_bindings().await? {
                    println!("{key:<20} {label}");
                }
            }
            ("save", _, _) => save(handle, bindings_path).await?,
            ("quit", _, _) => break,
            _ => println!("{HELP}"),
        }
    }

    Ok(())
}

async fn capture(
    handle: &CoordinatorHandle,
    registry: &CallbackRegistry,
    action: &str,
    target: CaptureTarget,
) -> Result<()> {
    let Some(callback) = registry.get(action).cloned() else {
        let known: Vec<_> = registry.names().collect();
        warn!("Unknown action '{}', known: {}", action, known.join(", "));
        return Ok(());
    };

    match handle.rebind(callback, target).await {
        Ok(pending) => {
            println!("Press a key, button, or move a gamepad axis to bind '{action}'...");
            let action = action.to_string();
            tokio::spawn(async move {
                match pending.wait().await {
                    Ok(outcome) => info!(
                        "'{}' bound to '{}' at {}",
                        action,
                        outcome.key,
                        outcome.captured_at.format("%H:%M:%S")
                    ),
                    Err(e) => debug!("Capture for '{}' ended: {}", action, e),
                }
            });
        }
        Err(e) => warn!("{}", e),
    }
    Ok(())
}

async fn save(handle: &CoordinatorHandle, bindings_path: Option<&PathBuf>) -> Result<()> {
    match bindings_path {
        Some(path) => save_bindings(path, &handle.export_bindings().await?).await,
        None => {
            warn!("No config directory available, bindings not saved");
            Ok(())
        }
    }
}
