//! Binding storage: keys, callbacks, the binding table and its export document
//!
//! ```text
//! BindingKey ──► BindingTable ──► Callback
//!                     │
//!                     └─► BindingDocument (export / restore)
//! ```

pub mod callback;
pub mod document;
pub mod key;
pub mod table;

pub use callback::{
    AxisReading, Callback, CallbackRegistry, CallbackResolver, InputContext, ANONYMOUS_LABEL,
};
pub use document::{BindingDocument, DocumentError};
pub use key::{BindingKey, KeyKind};
pub use table::{Binding, BindingError, BindingTable, RestoreIssue, RestoreReport};
