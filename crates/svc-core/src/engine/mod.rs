//! Motor de ejecución de servicios.
mod core;
pub mod propagate;
pub mod result;
pub mod runner;
pub mod service_ctx;
pub mod transaction;

pub use propagate::{propagate, PropagationFlags};
pub use result::{ParentLink, ServiceResult};
pub use runner::Runner;
pub use service_ctx::{ChildCall, ServiceCtx};
pub use transaction::{Transaction, TransactionBackend};
