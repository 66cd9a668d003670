//! Orígenes y destinos externos de mensajes.
//!
//! - `ValidationSource`: objetos de validación ajenos al motor (p.ej. los
//!   errores de un modelo de dominio) que se vuelcan con `add_from`.
//! - `MessageTarget`: destinos de `copy_to` (otro store o un mapping plano).

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use super::MessageStore;
use crate::constants::BASE_FIELD;
use crate::errors::ServiceError;

/// Objeto externo que expone sus mensajes de validación como pares
/// `(campo, payload)`.
pub trait ValidationSource {
    fn validation_messages(&self) -> Vec<(String, Value)>;
}

/// Un objeto JSON `campo → mensaje | [mensajes]`. Cualquier otra forma se
/// reporta completa bajo `base`. Los `null` no son mensajes.
impl ValidationSource for Value {
    fn validation_messages(&self) -> Vec<(String, Value)> {
        match self {
            Value::Object(map) => map.iter()
                                     .flat_map(|(field, v)| match v {
                                         Value::Array(items) => items.iter()
                                                                     .filter(|i| !i.is_null())
                                                                     .map(|i| (field.clone(), i.clone()))
                                                                     .collect::<Vec<_>>(),
                                         Value::Null => Vec::new(),
                                         other => vec![(field.clone(), other.clone())],
                                     })
                                     .collect(),
            Value::Null => Vec::new(),
            other => vec![(BASE_FIELD.to_string(), other.clone())],
        }
    }
}

impl<S: AsRef<str>> ValidationSource for IndexMap<String, Vec<S>> {
    fn validation_messages(&self) -> Vec<(String, Value)> {
        self.iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| (field.clone(), Value::from(m.as_ref()))))
            .collect()
    }
}

/// El orden de un `HashMap` no es estable; se ordena por campo.
impl<S: AsRef<str>> ValidationSource for HashMap<String, Vec<S>> {
    fn validation_messages(&self) -> Vec<(String, Value)> {
        let mut fields: Vec<&String> = self.keys().collect();
        fields.sort();
        fields.into_iter()
              .flat_map(|field| self[field].iter().map(move |m| (field.clone(), Value::from(m.as_ref()))))
              .collect()
    }
}

/// Destino de `MessageStore::copy_to`.
pub trait MessageTarget {
    fn receive(&mut self, field: &str, payload: Value) -> Result<(), ServiceError>;
}

/// Copiar a otro store aplica la política del store destino.
impl MessageTarget for MessageStore {
    fn receive(&mut self, field: &str, payload: Value) -> Result<(), ServiceError> {
        self.add(field, payload)
    }
}

impl MessageTarget for IndexMap<String, Vec<Value>> {
    fn receive(&mut self, field: &str, payload: Value) -> Result<(), ServiceError> {
        self.entry(field.to_string()).or_default().push(payload);
        Ok(())
    }
}

impl MessageTarget for HashMap<String, Vec<Value>> {
    fn receive(&mut self, field: &str, payload: Value) -> Result<(), ServiceError> {
        self.entry(field.to_string()).or_default().push(payload);
        Ok(())
    }
}
