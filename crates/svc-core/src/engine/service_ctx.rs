//! Contexto que reciben los steps.
//!
//! `ServiceCtx` es la única vía de un step hacia su invocación: lectura y
//! escritura de argumentos/outputs, mensajes, `done()` y llamadas a
//! servicios hijos.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::core::{execute, Frame, Invocation};
use super::propagate::{propagate, PropagationFlags};
use super::{ParentLink, ServiceResult};
use crate::config::{Config, ConfigOverrides};
use crate::contract::{shape_of, ContractCollection, Key};
use crate::errors::ServiceError;
use crate::message::MessageStore;
use crate::service::ServiceDefinition;
use crate::step::Phase;

pub struct ServiceCtx<'a> {
    inv: &'a mut Invocation,
    phase: Phase,
}

impl<'a> ServiceCtx<'a> {
    pub(crate) fn new(inv: &'a mut Invocation, phase: Phase) -> Self {
        Self { inv, phase }
    }

    pub fn service_name(&self) -> &str {
        &self.inv.service
    }

    pub fn invocation_id(&self) -> Uuid {
        self.inv.id
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.inv.parent.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Configuración efectiva de esta invocación.
    pub fn config(&self) -> &Config {
        &self.inv.config
    }

    /// `true` si la invocación corre dentro de un scope transaccional (propio
    /// o heredado del padre).
    pub fn in_transaction(&self) -> bool {
        self.inv.transactional && self.phase != Phase::Finally
    }

    // --- valores -----------------------------------------------------------

    pub fn arguments(&self) -> &ContractCollection {
        &self.inv.arguments
    }

    pub fn outputs(&self) -> &ContractCollection {
        &self.inv.outputs
    }

    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.inv.arguments.get(name)
    }

    pub fn arg_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ServiceError> {
        decode(name, self.arg(name))
    }

    pub fn set_arg(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ServiceError> {
        self.inv.arguments.set(name, value.into())
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.inv.outputs.get(name)
    }

    pub fn output_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ServiceError> {
        decode(name, self.output(name))
    }

    pub fn set_output(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ServiceError> {
        self.inv.outputs.set(name, value.into())
    }

    /// Argumento u output (en ese orden) con ese nombre.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.arg(name).or_else(|| self.output(name))
    }

    /// Lectura tipada. Un nombre declarado como output se lee de los outputs;
    /// cualquier otro, de los argumentos.
    pub fn get<T: DeserializeOwned>(&self, key: &Key<T>) -> Result<T, ServiceError> {
        if self.inv.outputs.declares(key.name()) {
            key.decode(self.output(key.name()))
        } else {
            key.decode(self.arg(key.name()))
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &Key<T>, value: &T) -> Result<(), ServiceError> {
        let encoded = key.encode(value)?;
        if self.inv.outputs.declares(key.name()) {
            self.inv.outputs.set(key.name(), encoded)
        } else {
            self.inv.arguments.set(key.name(), encoded)
        }
    }

    // --- mensajes ----------------------------------------------------------

    pub fn errors(&self) -> &MessageStore {
        &self.inv.errors
    }

    pub fn errors_mut(&mut self) -> &mut MessageStore {
        &mut self.inv.errors
    }

    pub fn warnings(&self) -> &MessageStore {
        &self.inv.warnings
    }

    pub fn warnings_mut(&mut self) -> &mut MessageStore {
        &mut self.inv.warnings
    }

    pub fn add_error(&mut self, field: impl Into<String>, payload: impl Into<Value>) -> Result<(), ServiceError> {
        self.inv.errors.add(field, payload)
    }

    pub fn add_warning(&mut self, field: impl Into<String>, payload: impl Into<Value>) -> Result<(), ServiceError> {
        self.inv.warnings.add(field, payload)
    }

    // --- flujo -------------------------------------------------------------

    /// Termina la fase principal con éxito: los steps restantes de `main` no
    /// se ejecutan (salvo los `always`); `after` y `finally` sí.
    pub fn done(&mut self) {
        self.inv.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.inv.done
    }

    // --- servicios hijos ---------------------------------------------------

    /// Prepara una llamada anidada: el hijo recibe los argumentos de contexto,
    /// se une al scope transaccional (salvo que declare otro backend) y sus
    /// mensajes se copian aquí.
    pub fn call<'c>(&'c mut self, child: &'c ServiceDefinition) -> ChildCall<'c, 'a> {
        let flags = PropagationFlags::from_config(&self.inv.config);
        ChildCall { ctx: self,
                    child,
                    overrides: ConfigOverrides::default(),
                    flags }
    }

    /// Invoca un servicio de forma independiente: sin contexto, sin scope
    /// compartido y sin propagación.
    pub fn run_detached(&mut self, child: &ServiceDefinition, raw: Value) -> Result<ServiceResult, ServiceError> {
        execute(child, raw, Frame::default())
    }
}

/// Llamada anidada pendiente de ejecutar.
pub struct ChildCall<'c, 'a> {
    ctx: &'c mut ServiceCtx<'a>,
    child: &'c ServiceDefinition,
    overrides: ConfigOverrides,
    flags: PropagationFlags,
}

impl<'c, 'a> ChildCall<'c, 'a> {
    /// Copiar (o no) los errores del hijo al padre.
    pub fn load_errors(mut self, load: bool) -> Self {
        self.flags.load_errors = load;
        self
    }

    pub fn load_warnings(mut self, load: bool) -> Self {
        self.flags.load_warnings = load;
        self
    }

    /// Overrides de configuración para el hijo.
    pub fn config(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = self.overrides.merge(&overrides);
        self
    }

    pub fn run(self, raw: Value) -> Result<ServiceResult, ServiceError> {
        let mut raw = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ServiceError::InvalidRawInputShape { service: self.child.name().to_string(),
                                                                found: shape_of(&other).to_string() })
            }
        };
        let parent_scope = if self.ctx.in_transaction() { self.ctx.inv.scope_backend.clone() } else { None };
        let inv = &mut *self.ctx.inv;
        let child_args = self.child.argument_specs();
        inv.arguments.extend_with_context_where(&mut raw, |k| child_args.contains_key(k));

        let frame = Frame { overrides: self.overrides,
                            backend: None,
                            parent: Some(ParentLink { service: inv.service.to_string(),
                                                      invocation_id: inv.id }),
                            parent_scope };
        let result = execute(self.child, Value::Object(raw), frame)?;
        propagate(&result, &mut inv.errors, &mut inv.warnings, self.flags)?;
        Ok(result)
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: Option<&Value>) -> Result<T, ServiceError> {
    let v = value.cloned().unwrap_or(Value::Null);
    serde_json::from_value(v).map_err(|e| ServiceError::Decode { field: name.to_string(),
                                                                reason: e.to_string() })
}
