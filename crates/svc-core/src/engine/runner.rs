//! Ejecución de una definición desde código host.

use std::sync::Arc;

use serde_json::Value;

use super::core::{execute, Frame};
use super::transaction::TransactionBackend;
use super::ServiceResult;
use crate::config::ConfigOverrides;
use crate::errors::ServiceError;
use crate::service::ServiceDefinition;

/// Invocación raíz configurable.
///
/// ```ignore
/// let result = def.runner()
///                 .config(ConfigOverrides::new().break_on_error(false))
///                 .run(json!({"letters": ["H", "i"]}))?;
/// ```
#[derive(Debug)]
pub struct Runner<'d> {
    definition: &'d ServiceDefinition,
    overrides: ConfigOverrides,
    backend: Option<Arc<dyn TransactionBackend>>,
}

impl<'d> Runner<'d> {
    pub(crate) fn new(definition: &'d ServiceDefinition) -> Self {
        Self { definition,
               overrides: ConfigOverrides::default(),
               backend: None }
    }

    /// Overrides de esta invocación; ganan sobre los de la definición.
    pub fn config(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = self.overrides.merge(&overrides);
        self
    }

    /// Backend transaccional para esta invocación; reemplaza al declarado.
    pub fn transactions(mut self, backend: Arc<dyn TransactionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn run(self, raw: Value) -> Result<ServiceResult, ServiceError> {
        execute(self.definition,
                raw,
                Frame { overrides: self.overrides,
                        backend: self.backend,
                        ..Frame::default() })
    }

    /// Variante estricta: el primer error añadido aborta (`Raised`) y un
    /// resultado fallido se convierte en `ServiceError::Failed`.
    pub fn run_strict(self, raw: Value) -> Result<ServiceResult, ServiceError> {
        self.config(ConfigOverrides::new().raise_on_error(true))
            .run(raw)?
            .into_strict()
    }
}
