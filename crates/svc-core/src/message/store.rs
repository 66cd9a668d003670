use std::sync::Arc;

use indexmap::IndexMap;
use log::warn;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use super::{AddOptions, CopyOptions, Message, MessageKind, MessageMap, MessagePolicy, MessageTarget, ValidationSource};
use crate::errors::ServiceError;

/// Store de mensajes de una invocación.
///
/// Orden de efectos en `add`: primero se guarda el mensaje (así una
/// inspección posterior a un raise lo sigue viendo), luego se marca rollback
/// y por último se devuelve `Raised` o se registra la petición de break que
/// el engine consulta tras cada step.
#[derive(Debug, Clone)]
pub struct MessageStore {
    owner: Arc<str>,
    kind: MessageKind,
    policy: MessagePolicy,
    entries: IndexMap<String, Vec<Message>>,
    break_requested: bool,
    rollback_requested: bool,
}

impl MessageStore {
    pub fn new(owner: impl Into<Arc<str>>, kind: MessageKind, policy: MessagePolicy) -> Self {
        Self { owner: owner.into(),
               kind,
               policy,
               entries: IndexMap::new(),
               break_requested: false,
               rollback_requested: false }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn policy(&self) -> MessagePolicy {
        self.policy
    }

    /// Añade un mensaje aplicando la política del store.
    pub fn add(&mut self, field: impl Into<String>, payload: impl Into<Value>) -> Result<(), ServiceError> {
        self.add_with(field, payload, AddOptions::default())
    }

    /// Como `add`, con overrides de break/rollback para esta llamada.
    pub fn add_with(&mut self,
                    field: impl Into<String>,
                    payload: impl Into<Value>,
                    opts: AddOptions)
                    -> Result<(), ServiceError> {
        let field = field.into();
        let payload = payload.into();
        let rollback = opts.rollback.unwrap_or(self.policy.rollback_on_add);

        self.entries
            .entry(field.clone())
            .or_default()
            .push(Message { field: field.clone(),
                            payload: payload.clone(),
                            rollback });

        if rollback {
            self.rollback_requested = true;
        }

        if self.policy.raise_on_add {
            warn!("{} raised on {} `{}`", self.owner, self.kind, field);
            let mine = self.to_mapping();
            let (errors, warnings) = match self.kind {
                MessageKind::Error => (mine, MessageMap::new()),
                MessageKind::Warning => (MessageMap::new(), mine),
            };
            return Err(ServiceError::Raised { service: self.owner.to_string(),
                                              kind: self.kind,
                                              field,
                                              payload,
                                              errors,
                                              warnings });
        }

        if opts.break_.unwrap_or(self.policy.break_on_add) {
            self.break_requested = true;
        }
        Ok(())
    }

    /// Añade los mensajes de un objeto de validación externo.
    pub fn add_from<S>(&mut self, source: &S) -> Result<(), ServiceError>
        where S: ValidationSource + ?Sized
    {
        for (field, payload) in source.validation_messages() {
            self.add(field, payload)?;
        }
        Ok(())
    }

    /// Elimina todos los mensajes de `field` y los devuelve.
    pub fn remove(&mut self, field: &str) -> Option<Vec<Message>> {
        self.entries.shift_remove(field)
    }

    /// Reinserta cada mensaje de `other` aplicando la política de `self`
    /// (no la de `other`), con overrides opcionales.
    pub fn copy_from(&mut self, other: &MessageStore, opts: CopyOptions) -> Result<(), ServiceError> {
        for msg in other.iter() {
            self.add_with(msg.field.clone(), msg.payload.clone(), opts)?;
        }
        Ok(())
    }

    /// Entrega cada mensaje a `target` en orden de inserción.
    pub fn copy_to<T>(&self, target: &mut T) -> Result<(), ServiceError>
        where T: MessageTarget + ?Sized
    {
        for msg in self.iter() {
            target.receive(&msg.field, msg.payload.clone())?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    pub fn key_present(&self, field: &str) -> bool {
        self.entries.get(field).is_some_and(|v| !v.is_empty())
    }

    /// Payloads de `field` (vacío si no hay).
    pub fn get(&self, field: &str) -> Vec<&Value> {
        self.entries
            .get(field)
            .map(|msgs| msgs.iter().map(|m| &m.payload).collect())
            .unwrap_or_default()
    }

    pub fn messages(&self, field: &str) -> &[Message] {
        self.entries.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Número total de mensajes.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Todos los mensajes, agrupados por campo en orden de primera aparición.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.values().flatten()
    }

    pub fn to_mapping(&self) -> MessageMap {
        self.entries
            .iter()
            .filter(|(_, msgs)| !msgs.is_empty())
            .map(|(k, msgs)| (k.clone(), msgs.iter().map(|m| m.payload.clone()).collect()))
            .collect()
    }

    /// Algún `add` pidió detener los steps restantes.
    pub fn break_requested(&self) -> bool {
        self.break_requested
    }

    /// Algún `add` marcó el scope transaccional para rollback. Es pegajoso:
    /// un `add` posterior con `rollback(false)` no lo desmarca.
    pub fn rollback_requested(&self) -> bool {
        self.rollback_requested
    }
}

impl Serialize for MessageStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mapping = self.to_mapping();
        let mut map = serializer.serialize_map(Some(mapping.len()))?;
        for (k, v) in &mapping {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
