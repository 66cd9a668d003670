//! Errores del core.
//!
//! Dos niveles:
//! - `DefinitionError`: errores de configuración detectados al construir una
//!   `ServiceDefinition` (anclas inexistentes, nombres vacíos...). Siempre
//!   fatales, señalan un bug del llamador.
//! - `ServiceError`: errores fatales en tiempo de invocación (contrato
//!   violado, raise por política, fallo de una transacción). Los mensajes de
//!   negocio recuperables NO son `ServiceError`; viven en un `MessageStore`.

use serde_json::Value;
use thiserror::Error;

use crate::message::{MessageKind, MessageMap};
use crate::step::Phase;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DefinitionError {
    #[error("service name must not be empty")]
    EmptyName,
    #[error("{service}: step `{step}` ({phase}) references unknown anchor `{anchor}`")]
    UnknownAnchor { service: String, phase: Phase, step: String, anchor: String },
    #[error("{service}: step `{step}` declares both `before` and `after`")]
    ConflictingAnchors { service: String, step: String },
    #[error("service `{0}` already registered")]
    DuplicateService(String),
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ServiceError {
    #[error("{service}: missing required argument `{field}`")]
    MissingArgument { service: String, field: String },
    #[error("{service}: `{field}` expected {expected}, got {actual}")]
    TypeMismatch { service: String, field: String, expected: String, actual: Value },
    #[error("{service}: raw input must be a string-keyed object, got {found}")]
    InvalidRawInputShape { service: String, found: String },
    #[error("{service}: `{field}` is not a declared argument or output")]
    UnknownField { service: String, field: String },
    #[error("unknown service `{0}`")]
    UnknownService(String),
    #[error("cannot decode `{field}`: {reason}")]
    Decode { field: String, reason: String },
    #[error("{service} raised on {kind} `{field}`: {payload}")]
    Raised {
        service: String,
        kind: MessageKind,
        field: String,
        payload: Value,
        errors: MessageMap,
        warnings: MessageMap,
    },
    #[error("{service} failed with errors on {}", fields_of(.errors))]
    Failed { service: String, errors: MessageMap },
    #[error("transaction: {0}")]
    Transaction(String),
    #[error("step failed: {0}")]
    Step(String),
}

fn fields_of(map: &MessageMap) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl ServiceError {
    /// Fallo libre devuelto por el cuerpo de un step.
    pub fn step(reason: impl Into<String>) -> Self {
        Self::Step(reason.into())
    }

    /// `true` si el error proviene de una política `raise_on_add`.
    pub fn is_raised(&self) -> bool {
        matches!(self, Self::Raised { .. })
    }

    /// Completa la foto de mensajes de un `Raised` emitido por `service`.
    /// Un `Raised` que viene de un servicio hijo conserva la suya.
    pub(crate) fn attach_snapshot(&mut self, owner: &str, errs: MessageMap, warns: MessageMap) {
        if let Self::Raised { service, errors, warnings, .. } = self {
            if service == owner {
                *errors = errs;
                *warnings = warns;
            }
        }
    }
}
