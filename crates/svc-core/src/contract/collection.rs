use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use serde_json::{Map, Value};

use super::spec::{ContractKind, DefaultScope, FieldSpec};
use crate::errors::ServiceError;

/// Declaraciones resueltas (raíz→hoja, última gana) de una colección.
pub type FieldSpecs = IndexMap<String, FieldSpec>;

/// Almacén clave→valor de argumentos u outputs de una invocación.
///
/// Ciclo de vida: `from_raw`/`empty` → `load_defaults` → `validate` →
/// mutaciones de los steps (`set`) → se descarta con la invocación.
#[derive(Debug, Clone)]
pub struct ContractCollection {
    owner: Arc<str>,
    kind: ContractKind,
    specs: Arc<FieldSpecs>,
    storage: IndexMap<String, Value>,
}

impl ContractCollection {
    /// Colección vacía (outputs).
    pub fn empty(owner: Arc<str>, kind: ContractKind, specs: Arc<FieldSpecs>) -> Self {
        Self { owner,
               kind,
               specs,
               storage: IndexMap::new() }
    }

    /// Colección inicializada con la entrada cruda del llamador, que debe ser
    /// un objeto JSON.
    pub fn from_raw(owner: Arc<str>, kind: ContractKind, specs: Arc<FieldSpecs>, raw: Value) -> Result<Self, ServiceError> {
        let map = match raw {
            Value::Object(map) => map,
            other => {
                return Err(ServiceError::InvalidRawInputShape { service: owner.to_string(),
                                                                found: shape_of(&other).to_string() })
            }
        };
        for key in map.keys().filter(|k| !specs.contains_key(k.as_str())) {
            debug!("{owner}: undeclared input key `{key}` kept as-is");
        }
        Ok(Self { owner,
                  kind,
                  specs,
                  storage: map.into_iter().collect() })
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn specs(&self) -> &FieldSpecs {
        &self.specs
    }

    pub fn declares(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    /// Asigna un valor declarado, revalidando su tipo.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ServiceError> {
        let spec = self.specs.get(key).ok_or_else(|| ServiceError::UnknownField { service: self.owner.to_string(),
                                                                                  field: key.to_string() })?;
        self.check_type(spec, &value)?;
        self.storage.insert(key.to_string(), value);
        Ok(())
    }

    /// Instala el default de cada declaración ausente, en orden de
    /// declaración: un default calculado ve los valores ya resueltos antes
    /// que él (y los argumentos, si se pasan).
    pub fn load_defaults(&mut self, arguments: Option<&ContractCollection>) {
        let specs = Arc::clone(&self.specs);
        for (name, spec) in specs.iter() {
            if self.storage.contains_key(name) {
                continue;
            }
            let Some(default) = &spec.default else { continue };
            let value = {
                let scope = DefaultScope { own: &self.storage,
                                           arguments: arguments.map(|a| &a.storage) };
                default.resolve(&scope)
            };
            self.storage.insert(name.clone(), value);
        }
    }

    /// Comprueba requeridos y tipos. No muta nada.
    pub fn validate(&self) -> Result<(), ServiceError> {
        for (name, spec) in self.specs.iter() {
            match self.storage.get(name) {
                None if spec.optional => {}
                None => {
                    return Err(ServiceError::MissingArgument { service: self.owner.to_string(),
                                                               field: name.clone() })
                }
                Some(value) => self.check_type(spec, value)?,
            }
        }
        Ok(())
    }

    /// Copia a `raw` cada valor marcado como contexto que `raw` no traiga ya.
    pub fn extend_with_context(&self, raw: &mut Map<String, Value>) {
        self.extend_with_context_where(raw, |_| true);
    }

    /// Variante filtrada: sólo claves aceptadas por `accepts` (p.ej. las que
    /// el servicio hijo declara).
    pub fn extend_with_context_where<F>(&self, raw: &mut Map<String, Value>, accepts: F)
        where F: Fn(&str) -> bool
    {
        for (name, spec) in self.specs.iter() {
            if !spec.context || raw.contains_key(name) || !accepts(name) {
                continue;
            }
            if let Some(value) = self.storage.get(name) {
                raw.insert(name.clone(), value.clone());
            }
        }
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.storage
    }

    pub fn into_values(self) -> IndexMap<String, Value> {
        self.storage
    }

    fn check_type(&self, spec: &FieldSpec, value: &Value) -> Result<(), ServiceError> {
        // Un opcional con null cuenta como ausente.
        if value.is_null() && spec.optional {
            return Ok(());
        }
        match &spec.constraint {
            Some(c) if !c.accepts(value) => Err(ServiceError::TypeMismatch { service: self.owner.to_string(),
                                                                             field: spec.name.clone(),
                                                                             expected: c.to_string(),
                                                                             actual: value.clone() }),
            _ => Ok(()),
        }
    }
}

pub(crate) fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::TypeConstraint;
    use serde_json::json;

    fn specs(list: Vec<FieldSpec>) -> Arc<FieldSpecs> {
        Arc::new(list.into_iter().map(|s| (s.name.clone(), s)).collect())
    }

    fn args(list: Vec<FieldSpec>, raw: Value) -> Result<ContractCollection, ServiceError> {
        ContractCollection::from_raw("Svc".into(), ContractKind::Argument, specs(list), raw)
    }

    #[test]
    fn non_object_input_is_rejected() {
        let err = args(vec![], json!(["a"])).unwrap_err();
        assert_eq!(err,
                   ServiceError::InvalidRawInputShape { service: "Svc".into(),
                                                        found: "array".into() });
    }

    #[test]
    fn missing_required_argument() {
        let c = args(vec![FieldSpec::argument("name")], json!({})).unwrap();
        assert!(matches!(c.validate(), Err(ServiceError::MissingArgument { field, .. }) if field == "name"));
    }

    #[test]
    fn optional_without_default_is_skipped() {
        let mut c = args(vec![FieldSpec::argument("nick").typed(TypeConstraint::String).optional()], json!({})).unwrap();
        c.load_defaults(None);
        assert!(c.validate().is_ok());
        assert!(!c.has_key("nick"));
    }

    #[test]
    fn optional_null_passes_type_check() {
        let c = args(vec![FieldSpec::argument("nick").typed(TypeConstraint::String).optional()],
                     json!({"nick": null})).unwrap();
        assert!(c.validate().is_ok());
    }

    #[test]
    fn defaults_are_type_checked() {
        let mut c = args(vec![FieldSpec::argument("n").typed(TypeConstraint::Integer).default("ten")], json!({})).unwrap();
        c.load_defaults(None);
        assert!(matches!(c.validate(), Err(ServiceError::TypeMismatch { field, expected, .. }) if field == "n" && expected == "integer"));
    }

    #[test]
    fn computed_default_sees_earlier_arguments() {
        let list = vec![FieldSpec::argument("first"),
                        FieldSpec::argument("greeting").default_with(|s| {
                                                           let first = s.get("first").and_then(Value::as_str).unwrap_or("?");
                                                           json!(format!("hi {first}"))
                                                       })];
        let mut c = args(list, json!({"first": "Ada"})).unwrap();
        c.load_defaults(None);
        assert_eq!(c.get("greeting"), Some(&json!("hi Ada")));
    }

    #[test]
    fn explicit_value_wins_over_default() {
        let mut c = args(vec![FieldSpec::argument("n").default(1)], json!({"n": 5})).unwrap();
        c.load_defaults(None);
        assert_eq!(c.get("n"), Some(&json!(5)));
    }

    #[test]
    fn literal_defaults_are_not_shared_between_collections() {
        let list = specs(vec![FieldSpec::output("items").default(json!([]))]);
        let mut a = ContractCollection::empty("Svc".into(), ContractKind::Output, Arc::clone(&list));
        let mut b = ContractCollection::empty("Svc".into(), ContractKind::Output, list);
        a.load_defaults(None);
        b.load_defaults(None);
        a.set("items", json!(["x"])).unwrap();
        assert_eq!(b.get("items"), Some(&json!([])));
    }

    #[test]
    fn set_rejects_undeclared_and_wrong_type() {
        let mut c = args(vec![FieldSpec::argument("n").typed(TypeConstraint::Integer)], json!({"n": 1})).unwrap();
        assert!(matches!(c.set("zzz", json!(1)), Err(ServiceError::UnknownField { .. })));
        assert!(matches!(c.set("n", json!("1")), Err(ServiceError::TypeMismatch { .. })));
        c.set("n", json!(2)).unwrap();
        assert_eq!(c.get("n"), Some(&json!(2)));
    }

    #[test]
    fn context_values_do_not_overwrite_explicit_keys() {
        let c = args(vec![FieldSpec::argument("actor").context(), FieldSpec::argument("locale").context(), FieldSpec::argument("plain")],
                     json!({"actor": "root", "locale": "es", "plain": 1})).unwrap();
        let mut raw = Map::new();
        raw.insert("locale".into(), json!("en"));
        c.extend_with_context(&mut raw);
        assert_eq!(raw.get("actor"), Some(&json!("root")));
        assert_eq!(raw.get("locale"), Some(&json!("en")));
        assert!(!raw.contains_key("plain"));
    }
}
