//! svc-core: motor de ejecución de servicios.
//!
//! Un servicio declara argumentos, outputs y steps por fase (`before`,
//! `main`, `after`, `finally`). El motor valida el contrato, ejecuta el plan
//! resuelto con políticas de break/raise/rollback sobre errores y warnings,
//! envuelve la ejecución en un scope transaccional opcional y propaga los
//! mensajes de servicios hijos al padre.
pub mod config;
pub mod constants;
pub mod contract;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod message;
pub mod service;
pub mod step;

pub use config::{Config, ConfigOverrides};
pub use contract::{ContractCollection, FieldSpec, Key, TypeConstraint};
pub use engine::{ChildCall, ParentLink, Runner, ServiceCtx, ServiceResult, Transaction, TransactionBackend};
pub use errors::{DefinitionError, ServiceError};
pub use event::{ExecutionEvent, ExecutionEventKind, SkipReason};
pub use message::{AddOptions, CopyOptions, MessageKind, MessagePolicy, MessageStore};
pub use service::{ServiceBuilder, ServiceDefinition, ServiceRegistry};
pub use step::{InvocationState, Phase, StepResult, StepSpec};
