//! Declaración de argumentos y outputs (`FieldSpec`) y restricciones de tipo.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

/// A qué colección pertenece una declaración.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Argument,
    Output,
}

/// Restricción de tipo sobre un valor JSON.
#[derive(Clone)]
pub enum TypeConstraint {
    Any,
    Null,
    Bool,
    /// Números enteros (i64/u64).
    Integer,
    /// Números con parte decimal.
    Float,
    /// Cualquier número.
    Number,
    String,
    Array,
    Object,
    /// Array cuyos elementos cumplen la restricción interna.
    ArrayOf(Box<TypeConstraint>),
    /// Cumple al menos una de las restricciones.
    OneOf(Vec<TypeConstraint>),
    /// Predicado definido por la aplicación host.
    Custom { name: &'static str, check: fn(&Value) -> bool },
}

impl TypeConstraint {
    pub fn array_of(inner: TypeConstraint) -> Self {
        Self::ArrayOf(Box::new(inner))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Null => value.is_null(),
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_f64(),
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::ArrayOf(inner) => value.as_array().is_some_and(|items| items.iter().all(|i| inner.accepts(i))),
            Self::OneOf(options) => options.iter().any(|o| o.accepts(value)),
            Self::Custom { check, .. } => check(value),
        }
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::Array => f.write_str("array"),
            Self::Object => f.write_str("object"),
            Self::ArrayOf(inner) => write!(f, "array<{inner}>"),
            Self::OneOf(options) => {
                let names: Vec<String> = options.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(" | "))
            }
            Self::Custom { name, .. } => f.write_str(name),
        }
    }
}

impl fmt::Debug for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeConstraint({self})")
    }
}

/// Vista de sólo lectura que reciben los defaults calculados: valores ya
/// resueltos de la propia colección y, para outputs, los argumentos.
pub struct DefaultScope<'a> {
    pub(crate) own: &'a IndexMap<String, Value>,
    pub(crate) arguments: Option<&'a IndexMap<String, Value>>,
}

impl<'a> DefaultScope<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.own.get(name).or_else(|| self.arguments.and_then(|a| a.get(name)))
    }
}

pub type DefaultFn = Arc<dyn Fn(&DefaultScope<'_>) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum DefaultValue {
    /// Valor literal; se clona en profundidad en cada aplicación.
    Literal(Value),
    /// Calculado perezosamente en cada invocación.
    Computed(DefaultFn),
}

impl DefaultValue {
    pub(crate) fn resolve(&self, scope: &DefaultScope<'_>) -> Value {
        match self {
            Self::Literal(v) => v.clone(),
            Self::Computed(f) => f(scope),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Declaración de un argumento u output.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) kind: ContractKind,
    pub(crate) name: String,
    pub(crate) constraint: Option<TypeConstraint>,
    pub(crate) optional: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) context: bool,
}

/// Alias de lectura: argumentos y outputs comparten representación.
pub type ArgumentSpec = FieldSpec;
pub type OutputSpec = FieldSpec;

impl FieldSpec {
    /// Argumento requerido, sin tipo.
    pub fn argument(name: impl Into<String>) -> Self {
        Self { kind: ContractKind::Argument,
               name: name.into(),
               constraint: None,
               optional: false,
               default: None,
               context: false }
    }

    /// Output (siempre opcional), sin tipo.
    pub fn output(name: impl Into<String>) -> Self {
        Self { kind: ContractKind::Output,
               optional: true,
               ..Self::argument(name)
        }
    }

    pub fn typed(mut self, constraint: TypeConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_with<F>(mut self, f: F) -> Self
        where F: Fn(&DefaultScope<'_>) -> Value + Send + Sync + 'static
    {
        self.default = Some(DefaultValue::Computed(Arc::new(f)));
        self
    }

    /// Se reenvía implícitamente a servicios hijos que declaren el mismo
    /// argumento.
    pub fn context(mut self) -> Self {
        self.context = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    pub fn constraint(&self) -> Option<&TypeConstraint> {
        self.constraint.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_context(&self) -> bool {
        self.context
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}
