//! Seam transaccional del motor.
//!
//! El motor no conoce ninguna base de datos: una definición (o un `Runner`)
//! aporta un `TransactionBackend` y el engine abre un scope alrededor de las
//! fases `before`/`main`/`after`. Al cerrar, el scope hace commit o rollback
//! según el estado de la invocación. Si el scope se descarta sin cerrarse
//! (p.ej. un panic en un step) se revierte.

use std::fmt;

use log::warn;

use crate::errors::ServiceError;

/// Fuente de transacciones. Debe poder compartirse entre hilos porque una
/// misma definición puede invocarse concurrentemente.
pub trait TransactionBackend: Send + Sync {
    fn begin(&self) -> Result<Box<dyn Transaction>, ServiceError>;

    /// Nombre para logs.
    fn name(&self) -> &str {
        "transactions"
    }
}

/// Una transacción abierta. Se consume al cerrarla.
pub trait Transaction: Send {
    fn commit(self: Box<Self>) -> Result<(), ServiceError>;
    fn rollback(self: Box<Self>) -> Result<(), ServiceError>;
}

impl fmt::Debug for dyn TransactionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionBackend({})", self.name())
    }
}

/// Resultado de cerrar un scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeOutcome {
    Committed,
    RolledBack,
}

pub(crate) struct TransactionScope {
    tx: Option<Box<dyn Transaction>>,
}

impl TransactionScope {
    pub(crate) fn begin(backend: &dyn TransactionBackend) -> Result<Self, ServiceError> {
        let tx = backend.begin()?;
        Ok(Self { tx: Some(tx) })
    }

    /// Cierra el scope. Un commit fallido se reporta como rollback y error.
    pub(crate) fn release(mut self, rollback: bool) -> (ScopeOutcome, Result<(), ServiceError>) {
        let Some(tx) = self.tx.take() else {
            return (ScopeOutcome::RolledBack, Ok(()));
        };
        if rollback {
            return (ScopeOutcome::RolledBack, tx.rollback());
        }
        match tx.commit() {
            Ok(()) => (ScopeOutcome::Committed, Ok(())),
            Err(e) => (ScopeOutcome::RolledBack, Err(e)),
        }
    }
}

impl Drop for TransactionScope {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback() {
                warn!("rollback on drop failed: {e}");
            }
        }
    }
}
