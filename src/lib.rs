//! svcflow: librería fachada.
//!
//! Reexporta el motor (`svc-core`) y los servicios de demostración
//! (`svc-adapters`), y añade `ResultSummary`, una vista compacta y
//! serializable de un `ServiceResult`.

pub mod summary;

pub use svc_adapters as adapters;
pub use svc_core as engine;
pub use svc_core::{ConfigOverrides, FieldSpec, Key, Phase, ServiceDefinition, ServiceError, ServiceRegistry, ServiceResult, StepSpec,
                   TypeConstraint};

pub use summary::ResultSummary;
