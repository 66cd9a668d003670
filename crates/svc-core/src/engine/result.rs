//! Resultado de una invocación.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::contract::Key;
use crate::errors::ServiceError;
use crate::event::{ExecutionEvent, ExecutionEventKind};
use crate::message::MessageStore;
use crate::step::{InvocationState, Phase};

/// Referencia al invocador de un servicio anidado.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub service: String,
    pub invocation_id: Uuid,
}

/// Foto final de una invocación que terminó sin error fatal.
///
/// `succeeded()` sólo mira los errores: un servicio con warnings pero sin
/// errores tuvo éxito.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResult {
    pub(crate) service: String,
    pub(crate) invocation_id: Uuid,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) state: InvocationState,
    pub(crate) arguments: IndexMap<String, Value>,
    pub(crate) outputs: IndexMap<String, Value>,
    pub(crate) errors: MessageStore,
    pub(crate) warnings: MessageStore,
    pub(crate) rolled_back: bool,
    pub(crate) plan_hash: String,
    pub(crate) events: Vec<ExecutionEvent>,
}

impl ServiceResult {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn errors(&self) -> &MessageStore {
        &self.errors
    }

    pub fn warnings(&self) -> &MessageStore {
        &self.warnings
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub fn outputs(&self) -> &IndexMap<String, Value> {
        &self.outputs
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &IndexMap<String, Value> {
        &self.arguments
    }

    /// Lectura tipada: busca en outputs y después en argumentos.
    pub fn get<T: DeserializeOwned>(&self, key: &Key<T>) -> Result<T, ServiceError> {
        let value = self.outputs.get(key.name()).or_else(|| self.arguments.get(key.name()));
        key.decode(value)
    }

    /// `true` si el scope transaccional de esta invocación se revirtió.
    pub fn rolled_back(&self) -> bool {
        self.rolled_back
    }

    pub fn plan_hash(&self) -> &str {
        &self.plan_hash
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    /// Steps de `phase` cuyo cuerpo terminó, en orden de ejecución.
    pub fn executed_steps(&self, phase: Phase) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match &e.kind {
                ExecutionEventKind::StepFinished { phase: p, step } if *p == phase => Some(step.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Convierte un resultado fallido en `ServiceError::Failed`.
    pub fn into_strict(self) -> Result<Self, ServiceError> {
        if self.failed() {
            return Err(ServiceError::Failed { service: self.service,
                                              errors: self.errors.to_mapping() });
        }
        Ok(self)
    }
}
