use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::ServiceCtx;
use crate::errors::ServiceError;

pub type StepResult = Result<(), ServiceError>;

/// Cuerpo de un step. Recibe el contexto vivo de la invocación.
pub type StepBody = Arc<dyn Fn(&mut ServiceCtx<'_>) -> StepResult + Send + Sync>;

/// Fase del ciclo de vida en la que se ejecuta un step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Before,
    Main,
    After,
    Finally,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Before => "before",
            Phase::Main => "main",
            Phase::After => "after",
            Phase::Finally => "finally",
        };
        f.write_str(s)
    }
}

/// Condición de una guarda.
#[derive(Clone)]
pub enum Condition {
    /// Valor de un argumento u output (en ese orden) interpretado como
    /// booleano: `null`, `false`, `""`, `[]` y `{}` son falsos.
    Field(String),
    /// Predicado calculado sobre el estado actual.
    Computed(Arc<dyn Fn(&ServiceCtx<'_>) -> bool + Send + Sync>),
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Condition::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Guard {
    pub condition: Condition,
    /// `unless`: invierte la condición.
    pub negate: bool,
}

impl Guard {
    pub fn allows(&self, ctx: &ServiceCtx<'_>) -> bool {
        let holds = match &self.condition {
            Condition::Field(name) => ctx.value(name).is_some_and(is_present),
            Condition::Computed(f) => f(ctx),
        };
        holds != self.negate
    }
}

pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Dónde se inserta un step al resolver el plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Al final (o en su posición actual si el nombre ya existe).
    Append,
    Before(String),
    After(String),
}

/// Declaración de un step.
#[derive(Clone)]
pub struct StepSpec {
    pub(crate) name: String,
    pub(crate) body: StepBody,
    pub(crate) guard: Option<Guard>,
    pub(crate) before: Option<String>,
    pub(crate) after: Option<String>,
    pub(crate) always: bool,
}

impl StepSpec {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
        where F: Fn(&mut ServiceCtx<'_>) -> StepResult + Send + Sync + 'static
    {
        Self { name: name.into(),
               body: Arc::new(body),
               guard: None,
               before: None,
               after: None,
               always: false }
    }

    /// Sólo se ejecuta si el campo `field` está presente/verdadero.
    pub fn when(self, field: impl Into<String>) -> Self {
        self.guarded(Condition::Field(field.into()), false)
    }

    /// Sólo se ejecuta si el campo `field` está ausente/falso.
    pub fn unless(self, field: impl Into<String>) -> Self {
        self.guarded(Condition::Field(field.into()), true)
    }

    pub fn when_with<F>(self, f: F) -> Self
        where F: Fn(&ServiceCtx<'_>) -> bool + Send + Sync + 'static
    {
        self.guarded(Condition::Computed(Arc::new(f)), false)
    }

    pub fn unless_with<F>(self, f: F) -> Self
        where F: Fn(&ServiceCtx<'_>) -> bool + Send + Sync + 'static
    {
        self.guarded(Condition::Computed(Arc::new(f)), true)
    }

    pub fn before(mut self, anchor: impl Into<String>) -> Self {
        self.before = Some(anchor.into());
        self
    }

    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.after = Some(anchor.into());
        self
    }

    /// Se ejecuta aunque un break haya detenido la fase principal.
    pub fn always(mut self) -> Self {
        self.always = true;
        self
    }

    fn guarded(mut self, condition: Condition, negate: bool) -> Self {
        self.guard = Some(Guard { condition, negate });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn is_always(&self) -> bool {
        self.always
    }

    /// Ancla efectiva; `None` si se declararon `before` y `after` a la vez.
    pub fn anchor(&self) -> Option<Anchor> {
        match (&self.before, &self.after) {
            (None, None) => Some(Anchor::Append),
            (Some(b), None) => Some(Anchor::Before(b.clone())),
            (None, Some(a)) => Some(Anchor::After(a.clone())),
            (Some(_), Some(_)) => None,
        }
    }
}

impl fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSpec")
         .field("name", &self.name)
         .field("guard", &self.guard)
         .field("before", &self.before)
         .field("after", &self.after)
         .field("always", &self.always)
         .finish()
    }
}
