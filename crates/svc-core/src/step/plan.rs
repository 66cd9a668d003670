//! Resolución del plan de steps.
//!
//! Cada definición de la cadena (raíz→hoja) aporta una lista de directivas
//! `Add`/`Remove` por fase. `resolve_phase` las reproduce en orden sobre una
//! lista vacía:
//! - `Add` sin ancla: reemplaza en su sitio si el nombre existe, si no
//!   añade al final.
//! - `Add` con ancla `before`/`after`: mueve/inserta junto al ancla, que debe
//!   estar presente en la lista resuelta en ese momento.
//! - `Remove`: borra por nombre; idempotente si no existe.
//!
//! El resultado es un orden total sin nombres duplicados. `ResolvedPlan` se
//! calcula una vez al construir la definición y no se muta después.

use serde_json::json;

use super::{Anchor, Phase, StepSpec};
use crate::constants::ENGINE_VERSION;
use crate::errors::DefinitionError;
use crate::hashing::hash_value;

#[derive(Debug, Clone)]
pub enum Directive {
    Add(StepSpec),
    Remove(String),
}

/// Reproduce las directivas de una fase para toda la cadena de ancestros.
pub fn resolve_phase<'a, I>(service: &str, phase: Phase, chain: I) -> Result<Vec<StepSpec>, DefinitionError>
    where I: IntoIterator<Item = &'a [Directive]>
{
    let mut plan: Vec<StepSpec> = Vec::new();
    for directives in chain {
        for directive in directives {
            match directive {
                Directive::Remove(name) => plan.retain(|s| s.name != *name),
                Directive::Add(spec) => apply_add(service, phase, &mut plan, spec)?,
            }
        }
    }
    Ok(plan)
}

fn apply_add(service: &str, phase: Phase, plan: &mut Vec<StepSpec>, spec: &StepSpec) -> Result<(), DefinitionError> {
    let anchor = spec.anchor()
                     .ok_or_else(|| DefinitionError::ConflictingAnchors { service: service.to_string(),
                                                                          step: spec.name.clone() })?;
    let existing = plan.iter().position(|s| s.name == spec.name);

    let (target, offset) = match anchor {
        Anchor::Append => {
            match existing {
                Some(i) => plan[i] = spec.clone(),
                None => plan.push(spec.clone()),
            }
            return Ok(());
        }
        Anchor::Before(target) => (target, 0),
        Anchor::After(target) => (target, 1),
    };

    // Un step redeclarado con ancla se mueve: se retira antes de buscar el ancla.
    if let Some(i) = existing {
        plan.remove(i);
    }
    let pos = plan.iter()
                  .position(|s| s.name == target)
                  .ok_or_else(|| DefinitionError::UnknownAnchor { service: service.to_string(),
                                                                  phase,
                                                                  step: spec.name.clone(),
                                                                  anchor: target.clone() })?;
    plan.insert(pos + offset, spec.clone());
    Ok(())
}

/// Plan inmutable de una definición: steps por fase y hash estable.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub(crate) before: Vec<StepSpec>,
    pub(crate) main: Vec<StepSpec>,
    pub(crate) after: Vec<StepSpec>,
    pub(crate) finally: Vec<StepSpec>,
    plan_hash: String,
}

impl ResolvedPlan {
    pub fn new(before: Vec<StepSpec>, main: Vec<StepSpec>, after: Vec<StepSpec>, finally: Vec<StepSpec>) -> Self {
        let names = |steps: &[StepSpec]| steps.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        let plan_hash = hash_value(&json!({
            "engine_version": ENGINE_VERSION,
            "before": names(&before),
            "main": names(&main),
            "after": names(&after),
            "finally": names(&finally),
        }));
        Self { before,
               main,
               after,
               finally,
               plan_hash }
    }

    pub fn phase(&self, phase: Phase) -> &[StepSpec] {
        match phase {
            Phase::Before => &self.before,
            Phase::Main => &self.main,
            Phase::After => &self.after,
            Phase::Finally => &self.finally,
        }
    }

    /// Nombres de los steps de una fase, en orden de ejecución.
    pub fn step_names(&self, phase: Phase) -> Vec<&str> {
        self.phase(phase).iter().map(|s| s.name.as_str()).collect()
    }

    /// Hash (blake3) del JSON canónico de los nombres resueltos por fase.
    pub fn plan_hash(&self) -> &str {
        &self.plan_hash
    }
}
