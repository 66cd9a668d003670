//! Propagación de mensajes hijo → padre.

use crate::config::Config;
use crate::errors::ServiceError;
use crate::message::{CopyOptions, MessageStore};

use super::ServiceResult;

/// Qué mensajes de un hijo se copian al padre.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationFlags {
    pub load_errors: bool,
    pub load_warnings: bool,
}

impl PropagationFlags {
    pub fn from_config(config: &Config) -> Self {
        Self { load_errors: config.load_errors,
               load_warnings: config.load_warnings }
    }
}

/// Copia warnings y después errores del hijo a los stores del padre.
///
/// Cada mensaje entra por `add` del store destino, así que aplica la política
/// del padre: puede pedir break, marcar rollback o devolver `Raised`.
pub fn propagate(child: &ServiceResult,
                 errors: &mut MessageStore,
                 warnings: &mut MessageStore,
                 flags: PropagationFlags)
                 -> Result<(), ServiceError> {
    if flags.load_warnings {
        warnings.copy_from(child.warnings(), CopyOptions::default())?;
    }
    if flags.load_errors {
        errors.copy_from(child.errors(), CopyOptions::default())?;
    }
    Ok(())
}
