//! Registro de servicios por nombre, compartible entre hilos.

use std::sync::Arc;

use dashmap::DashMap;
use log::info;
use serde_json::Value;

use super::ServiceDefinition;
use crate::engine::ServiceResult;
use crate::errors::{DefinitionError, ServiceError};

#[derive(Debug, Default, Clone)]
pub struct ServiceRegistry {
    services: Arc<DashMap<String, Arc<ServiceDefinition>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una definición bajo su nombre. Un nombre repetido es un error.
    pub fn register(&self, definition: Arc<ServiceDefinition>) -> Result<(), DefinitionError> {
        let name = definition.name().to_string();
        match self.services.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(DefinitionError::DuplicateService(name)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(definition);
                info!("registered service {name}");
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ServiceDefinition>> {
        self.services.get(name).map(|d| Arc::clone(d.value()))
    }

    /// Nombres registrados, ordenados.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Busca y ejecuta un servicio raíz.
    pub fn run(&self, name: &str, raw: Value) -> Result<ServiceResult, ServiceError> {
        let definition = self.get(name).ok_or_else(|| ServiceError::UnknownService(name.to_string()))?;
        definition.run(raw)
    }
}
