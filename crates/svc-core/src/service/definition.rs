//! Definición inmutable de un servicio y su builder.
//!
//! Una definición guarda sus propias declaraciones y un enlace a su padre.
//! Al construirla se reproduce la cadena raíz→hoja una sola vez:
//! argumentos/outputs (la última declaración gana), directivas de steps por
//! fase, overrides de configuración y backend transaccional. El resultado se
//! cachea; invocar nunca recalcula el plan.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::config::ConfigOverrides;
use crate::contract::{ContractKind, FieldSpec, FieldSpecs};
use crate::engine::{Runner, ServiceResult, TransactionBackend};
use crate::errors::{DefinitionError, ServiceError};
use crate::step::{resolve_phase, Directive, Phase, ResolvedPlan, StepSpec};

/// Declaraciones propias de un nivel de la jerarquía.
#[derive(Clone, Default)]
struct Declarations {
    arguments: Vec<FieldSpec>,
    outputs: Vec<FieldSpec>,
    before: Vec<Directive>,
    main: Vec<Directive>,
    after: Vec<Directive>,
    finally: Vec<Directive>,
    config: ConfigOverrides,
    transactions: Option<Arc<dyn TransactionBackend>>,
}

impl Declarations {
    fn directives(&self, phase: Phase) -> &[Directive] {
        match phase {
            Phase::Before => &self.before,
            Phase::Main => &self.main,
            Phase::After => &self.after,
            Phase::Finally => &self.finally,
        }
    }

    fn directives_mut(&mut self, phase: Phase) -> &mut Vec<Directive> {
        match phase {
            Phase::Before => &mut self.before,
            Phase::Main => &mut self.main,
            Phase::After => &mut self.after,
            Phase::Finally => &mut self.finally,
        }
    }
}

pub struct ServiceDefinition {
    name: String,
    parent: Option<Arc<ServiceDefinition>>,
    own: Declarations,
    arguments: Arc<FieldSpecs>,
    outputs: Arc<FieldSpecs>,
    plan: ResolvedPlan,
    config: ConfigOverrides,
    transactions: Option<Arc<dyn TransactionBackend>>,
}

impl ServiceDefinition {
    /// Servicio raíz.
    pub fn builder(name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder { name: name.into(),
                         parent: None,
                         own: Declarations::default() }
    }

    /// Servicio que hereda todo lo declarado por `parent`.
    pub fn extend(parent: &Arc<ServiceDefinition>, name: impl Into<String>) -> ServiceBuilder {
        ServiceBuilder { name: name.into(),
                         parent: Some(Arc::clone(parent)),
                         own: Declarations::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ServiceDefinition>> {
        self.parent.as_ref()
    }

    /// Nombres de la cadena de herencia, raíz primero.
    pub fn ancestry(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        let mut cur = self.parent.as_deref();
        while let Some(def) = cur {
            names.push(def.name.as_str());
            cur = def.parent.as_deref();
        }
        names.reverse();
        names
    }

    pub fn argument_specs(&self) -> Arc<FieldSpecs> {
        Arc::clone(&self.arguments)
    }

    pub fn output_specs(&self) -> Arc<FieldSpecs> {
        Arc::clone(&self.outputs)
    }

    pub fn plan(&self) -> &ResolvedPlan {
        &self.plan
    }

    pub fn config_overrides(&self) -> &ConfigOverrides {
        &self.config
    }

    pub fn transaction_backend(&self) -> Option<Arc<dyn TransactionBackend>> {
        self.transactions.clone()
    }

    /// Invoca con la configuración declarada.
    pub fn run(&self, raw: Value) -> Result<ServiceResult, ServiceError> {
        self.runner().run(raw)
    }

    pub fn runner(&self) -> Runner<'_> {
        Runner::new(self)
    }

    fn chain(&self) -> Vec<&Declarations> {
        let mut chain = vec![&self.own];
        let mut cur = self.parent.as_deref();
        while let Some(def) = cur {
            chain.push(&def.own);
            cur = def.parent.as_deref();
        }
        chain.reverse();
        chain
    }
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
         .field("name", &self.name)
         .field("ancestry", &self.ancestry())
         .field("arguments", &self.arguments.keys().collect::<Vec<_>>())
         .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
         .field("plan_hash", &self.plan.plan_hash())
         .finish()
    }
}

/// Acumula declaraciones de un nivel y produce la definición resuelta.
pub struct ServiceBuilder {
    name: String,
    parent: Option<Arc<ServiceDefinition>>,
    own: Declarations,
}

impl ServiceBuilder {
    pub fn argument(mut self, mut spec: FieldSpec) -> Self {
        spec.kind = ContractKind::Argument;
        self.own.arguments.push(spec);
        self
    }

    /// Los outputs siempre son opcionales.
    pub fn output(mut self, mut spec: FieldSpec) -> Self {
        spec.kind = ContractKind::Output;
        spec.optional = true;
        self.own.outputs.push(spec);
        self
    }

    pub fn step(self, spec: StepSpec) -> Self {
        self.directive(Phase::Main, Directive::Add(spec))
    }

    pub fn remove_step(self, name: impl Into<String>) -> Self {
        self.directive(Phase::Main, Directive::Remove(name.into()))
    }

    pub fn before_hook(self, spec: StepSpec) -> Self {
        self.directive(Phase::Before, Directive::Add(spec))
    }

    pub fn after_hook(self, spec: StepSpec) -> Self {
        self.directive(Phase::After, Directive::Add(spec))
    }

    pub fn finally_hook(self, spec: StepSpec) -> Self {
        self.directive(Phase::Finally, Directive::Add(spec))
    }

    pub fn remove_hook(self, phase: Phase, name: impl Into<String>) -> Self {
        self.directive(phase, Directive::Remove(name.into()))
    }

    /// Overrides de configuración de este nivel (ganan sobre los heredados).
    pub fn config(mut self, overrides: ConfigOverrides) -> Self {
        self.own.config = self.own.config.merge(&overrides);
        self
    }

    pub fn transactions(mut self, backend: Arc<dyn TransactionBackend>) -> Self {
        self.own.transactions = Some(backend);
        self
    }

    fn directive(mut self, phase: Phase, directive: Directive) -> Self {
        self.own.directives_mut(phase).push(directive);
        self
    }

    pub fn build(self) -> Result<Arc<ServiceDefinition>, DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        let mut def = ServiceDefinition { name: self.name,
                                          parent: self.parent,
                                          own: self.own,
                                          arguments: Arc::default(),
                                          outputs: Arc::default(),
                                          plan: ResolvedPlan::new(vec![], vec![], vec![], vec![]),
                                          config: ConfigOverrides::default(),
                                          transactions: None };

        let chain = def.chain();
        let mut arguments = FieldSpecs::new();
        let mut outputs = FieldSpecs::new();
        let mut config = ConfigOverrides::default();
        let mut transactions = None;
        for level in &chain {
            for spec in &level.arguments {
                arguments.insert(spec.name.clone(), spec.clone());
            }
            for spec in &level.outputs {
                outputs.insert(spec.name.clone(), spec.clone());
            }
            config = config.merge(&level.config);
            if let Some(backend) = &level.transactions {
                transactions = Some(Arc::clone(backend));
            }
        }
        let resolve = |phase: Phase| resolve_phase(&def.name, phase, chain.iter().map(|d| d.directives(phase)));
        let plan = ResolvedPlan::new(resolve(Phase::Before)?,
                                     resolve(Phase::Main)?,
                                     resolve(Phase::After)?,
                                     resolve(Phase::Finally)?);
        drop(chain);

        def.arguments = Arc::new(arguments);
        def.outputs = Arc::new(outputs);
        def.plan = plan;
        def.config = config;
        def.transactions = transactions;
        debug!("built service {} (plan {})", def.name, def.plan.plan_hash());
        Ok(Arc::new(def))
    }
}
