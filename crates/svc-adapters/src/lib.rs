//! svc-adapters: servicios concretos sobre `svc-core`.
//!
//! Este crate provee:
//! - `BuildWord` / `BuildShout`: construcción de palabras a partir de letras
//!   (ejemplo de guardas, defaults y herencia).
//! - `PlaceOrder` / `SendNotification`: alta de pedidos sobre un ledger
//!   transaccional con un servicio hijo de notificación.
//! - `InMemoryLedger`: backend transaccional en memoria (journal con
//!   rollback por truncado).
//! - `demo_registry`: registro con todos los servicios, usado por la CLI.

pub mod ledger;
pub mod services;

use std::sync::Arc;

use svc_core::{DefinitionError, ServiceRegistry};

pub use ledger::{InMemoryLedger, LedgerEntry};

/// Registro con los servicios de demostración sobre `ledger`.
pub fn demo_registry(ledger: &InMemoryLedger) -> Result<ServiceRegistry, DefinitionError> {
    let registry = ServiceRegistry::new();
    let word = services::word::build_word()?;
    registry.register(services::word::build_shout(&word)?)?;
    registry.register(word)?;
    let notifier = services::order::send_notification()?;
    registry.register(services::order::place_order(ledger, Arc::clone(&notifier))?)?;
    registry.register(notifier)?;
    Ok(registry)
}
