//! Mensajes de negocio (errores y warnings) agrupados por campo.
//!
//! Un `MessageStore` guarda, por campo y en orden de inserción, los mensajes
//! que los steps añaden. Cada store aplica su propia `MessagePolicy` al
//! insertar: break (detener el resto de steps), raise (error fatal que
//! desenrolla la llamada) y rollback (marcar el scope transaccional).

mod sources;
mod store;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub use sources::{MessageTarget, ValidationSource};
pub use store::MessageStore;

/// Vista plana campo → payloads, en orden de inserción.
pub type MessageMap = IndexMap<String, Vec<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Error,
    Warning,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Error => f.write_str("error"),
            MessageKind::Warning => f.write_str("warning"),
        }
    }
}

/// Entrada individual de un store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub field: String,
    pub payload: Value,
    /// Si este mensaje marcó el scope transaccional para rollback.
    pub rollback: bool,
}

/// Políticas aplicadas por un store en cada `add`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePolicy {
    pub break_on_add: bool,
    pub raise_on_add: bool,
    pub rollback_on_add: bool,
}

/// Overrides por llamada de la política del store (`None` = usar la del store).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddOptions {
    pub break_: Option<bool>,
    pub rollback: Option<bool>,
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn breaking(mut self, v: bool) -> Self {
        self.break_ = Some(v);
        self
    }

    pub fn rollback(mut self, v: bool) -> Self {
        self.rollback = Some(v);
        self
    }
}

/// `copy_from` acepta los mismos overrides que `add_with`.
pub type CopyOptions = AddOptions;
