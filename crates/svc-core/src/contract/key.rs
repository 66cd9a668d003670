//! Accesores tipados sobre las colecciones neutrales.
//!
//! Una `Key<T>` asocia un nombre declarado con un tipo Rust concreto; la
//! (de)serialización se hace con serde en el borde, la colección sigue
//! guardando `serde_json::Value`.

use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;

pub struct Key<T> {
    name: &'static str,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self { name, _ty: PhantomData }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>({})", std::any::type_name::<T>(), self.name)
    }
}

impl<T: DeserializeOwned> Key<T> {
    /// Decodifica el valor; `None` (ausente) se decodifica como `null`, lo que
    /// permite claves `Key<Option<_>>` para opcionales.
    pub fn decode(&self, value: Option<&Value>) -> Result<T, ServiceError> {
        let v = value.cloned().unwrap_or(Value::Null);
        serde_json::from_value(v).map_err(|e| ServiceError::Decode { field: self.name.to_string(),
                                                                    reason: e.to_string() })
    }
}

impl<T: Serialize> Key<T> {
    pub fn encode(&self, value: &T) -> Result<Value, ServiceError> {
        serde_json::to_value(value).map_err(|e| ServiceError::Decode { field: self.name.to_string(),
                                                                      reason: e.to_string() })
    }
}
