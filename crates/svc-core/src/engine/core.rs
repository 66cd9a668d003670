//! Bucle de ejecución de una invocación.
//!
//! Ciclo de vida:
//! 1. Construir argumentos (entrada cruda → defaults → validación) y outputs
//!    (defaults → validación). Un fallo aquí es fatal y no ejecuta nada.
//! 2. `Running`: abrir scope transaccional (si aplica) y ejecutar `before`,
//!    `main` (respetando break/done salvo steps `always`) y `after` (sólo sin
//!    errores).
//! 3. Cerrar el scope: rollback si hubo error fatal o algún mensaje pidió
//!    rollback; commit en otro caso.
//! 4. `finally`: corre siempre, fuera del scope.
//! 5. Estado final y traza.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

use super::transaction::{ScopeOutcome, TransactionBackend, TransactionScope};
use super::{ParentLink, ServiceCtx, ServiceResult};
use crate::config::{global, Config, ConfigOverrides};
use crate::contract::{ContractCollection, ContractKind};
use crate::errors::ServiceError;
use crate::event::{ExecutionEventKind, SkipReason, Trace};
use crate::message::{MessageKind, MessageStore};
use crate::service::ServiceDefinition;
use crate::step::{InvocationState, Phase, ResolvedPlan, StepSpec};

/// Parámetros de una invocación que no vienen de la definición.
#[derive(Default)]
pub(crate) struct Frame {
    pub(crate) overrides: ConfigOverrides,
    pub(crate) backend: Option<Arc<dyn TransactionBackend>>,
    pub(crate) parent: Option<ParentLink>,
    /// Backend del scope que el padre tiene abierto, si lo hay.
    pub(crate) parent_scope: Option<Arc<dyn TransactionBackend>>,
}

/// Estado mutable de una invocación en curso.
pub(crate) struct Invocation {
    pub(crate) service: Arc<str>,
    pub(crate) id: Uuid,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) config: Config,
    pub(crate) arguments: ContractCollection,
    pub(crate) outputs: ContractCollection,
    pub(crate) errors: MessageStore,
    pub(crate) warnings: MessageStore,
    pub(crate) state: InvocationState,
    pub(crate) done: bool,
    pub(crate) transactional: bool,
    /// Backend del scope en el que corre (propio o heredado del padre).
    pub(crate) scope_backend: Option<Arc<dyn TransactionBackend>>,
    pub(crate) trace: Trace,
}

impl Invocation {
    /// La fase principal debe detenerse (salvo steps `always`).
    fn halted(&self) -> bool {
        self.done || self.errors.break_requested() || self.warnings.break_requested()
    }

    fn rollback_requested(&self) -> bool {
        self.errors.rollback_requested() || self.warnings.rollback_requested()
    }
}

pub(crate) fn execute(definition: &ServiceDefinition, raw: Value, frame: Frame) -> Result<ServiceResult, ServiceError> {
    let config = global().apply(definition.config_overrides()).apply(&frame.overrides);
    let service: Arc<str> = Arc::from(definition.name());

    let mut arguments = ContractCollection::from_raw(Arc::clone(&service),
                                                     ContractKind::Argument,
                                                     definition.argument_specs(),
                                                     raw)?;
    arguments.load_defaults(None);
    arguments.validate()?;
    let mut outputs = ContractCollection::empty(Arc::clone(&service), ContractKind::Output, definition.output_specs());
    outputs.load_defaults(Some(&arguments));
    outputs.validate()?;

    let plan = definition.plan();
    let id = Uuid::new_v4();
    let mut inv = Invocation { service: Arc::clone(&service),
                               id,
                               parent: frame.parent,
                               config,
                               arguments,
                               outputs,
                               errors: MessageStore::new(Arc::clone(&service), MessageKind::Error, config.error_policy()),
                               warnings: MessageStore::new(Arc::clone(&service),
                                                           MessageKind::Warning,
                                                           config.warning_policy()),
                               state: InvocationState::Pending,
                               done: false,
                               transactional: false,
                               scope_backend: None,
                               trace: Trace::new(id) };
    inv.trace.record(ExecutionEventKind::InvocationStarted { service: service.to_string(),
                                                             plan_hash: plan.plan_hash().to_string(),
                                                             parent: inv.parent.clone() });
    debug!("{service} [{id}] started (plan {})", plan.plan_hash());

    // Un hijo se une al scope del padre salvo que declare un backend distinto.
    let own = frame.backend.or_else(|| definition.transaction_backend());
    let joins = match (&frame.parent_scope, &own) {
        (Some(_), None) => true,
        (Some(parent), Some(mine)) => Arc::ptr_eq(parent, mine),
        (None, _) => false,
    };
    let backend = if joins || !config.use_transactions { None } else { own };
    if joins {
        inv.transactional = true;
        inv.scope_backend = frame.parent_scope;
    }
    let scope = match backend {
        Some(b) => match TransactionScope::begin(b.as_ref()) {
            Ok(scope) => {
                inv.transactional = true;
                inv.scope_backend = Some(b);
                Ok(Some(scope))
            }
            Err(e) => Err(e),
        },
        None => Ok(None),
    };
    inv.state = InvocationState::Running;

    // Si el scope no pudo abrirse no corre ninguna fase salvo `finally`.
    let (mut outcome, scope) = match scope {
        Ok(scope) => (run_phases(plan, &mut inv), scope),
        Err(e) => {
            warn!("{service} [{id}] could not open transaction: {e}");
            (Err(e), None)
        }
    };

    let mut rolled_back = false;
    if let Some(scope) = scope {
        let rollback = outcome.is_err() || inv.rollback_requested();
        let (closed, res) = scope.release(rollback);
        rolled_back = closed == ScopeOutcome::RolledBack;
        inv.trace.record(if rolled_back {
                             ExecutionEventKind::TransactionRolledBack
                         } else {
                             ExecutionEventKind::TransactionCommitted
                         });
        debug!("{service} [{id}] transaction {}", if rolled_back { "rolled back" } else { "committed" });
        if let Err(e) = res {
            warn!("{service} [{id}] closing transaction failed: {e}");
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    let failed_before_finally = outcome.is_err() || inv.errors.any();
    let pre_finally = failed_before_finally.then(|| inv.errors.clone());
    let finally = run_finally(&plan.finally, &mut inv);
    if outcome.is_ok() {
        outcome = finally;
    }
    // `finally` no puede borrar un fallo previo.
    if let Some(snapshot) = pre_finally {
        if inv.errors.is_empty() && !snapshot.is_empty() {
            warn!("{service} [{id}] finally cleared errors; restoring them");
            inv.errors = snapshot;
        }
    }

    inv.state = if failed_before_finally || outcome.is_err() || inv.errors.any() {
        InvocationState::Failed
    } else {
        InvocationState::Succeeded
    };
    inv.trace.record(ExecutionEventKind::InvocationFinished { state: inv.state });

    match outcome {
        Ok(()) => {
            info!("{service} [{id}] finished: {:?} ({} errors, {} warnings)",
                  inv.state,
                  inv.errors.len(),
                  inv.warnings.len());
            Ok(ServiceResult { service: service.to_string(),
                               invocation_id: id,
                               parent: inv.parent,
                               state: inv.state,
                               arguments: inv.arguments.into_values(),
                               outputs: inv.outputs.into_values(),
                               errors: inv.errors,
                               warnings: inv.warnings,
                               rolled_back,
                               plan_hash: plan.plan_hash().to_string(),
                               events: inv.trace.into_events() })
        }
        Err(mut e) => {
            warn!("{service} [{id}] aborted: {e}");
            e.attach_snapshot(&service, inv.errors.to_mapping(), inv.warnings.to_mapping());
            Err(e)
        }
    }
}

/// Fases dentro del scope: `before`, `main` y `after`.
fn run_phases(plan: &ResolvedPlan, inv: &mut Invocation) -> Result<(), ServiceError> {
    for step in &plan.before {
        run_step(Phase::Before, step, inv)?;
    }
    for step in &plan.main {
        if inv.halted() && !step.always {
            skip(Phase::Main, step, SkipReason::Halted, inv);
            continue;
        }
        run_step(Phase::Main, step, inv)?;
    }
    if inv.errors.any() {
        for step in &plan.after {
            skip(Phase::After, step, SkipReason::Failed, inv);
        }
        return Ok(());
    }
    for step in &plan.after {
        run_step(Phase::After, step, inv)?;
    }
    Ok(())
}

/// Ejecuta todos los steps de `finally`; conserva el primer error.
fn run_finally(steps: &[StepSpec], inv: &mut Invocation) -> Result<(), ServiceError> {
    let mut first = Ok(());
    for step in steps {
        if let Err(e) = run_step(Phase::Finally, step, inv) {
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

fn run_step(phase: Phase, step: &StepSpec, inv: &mut Invocation) -> Result<(), ServiceError> {
    if let Some(guard) = &step.guard {
        let allowed = guard.allows(&ServiceCtx::new(inv, phase));
        if !allowed {
            skip(phase, step, SkipReason::Guard, inv);
            return Ok(());
        }
    }

    inv.trace.record(ExecutionEventKind::StepStarted { phase,
                                                       step: step.name.clone() });
    let result = (step.body)(&mut ServiceCtx::new(inv, phase));
    match result {
        Ok(()) => {
            inv.trace.record(ExecutionEventKind::StepFinished { phase,
                                                                step: step.name.clone() });
            debug!("{} step `{}` ({phase}) finished", inv.service, step.name);
            Ok(())
        }
        Err(e) => {
            inv.trace.record(ExecutionEventKind::StepAborted { phase,
                                                               step: step.name.clone(),
                                                               reason: e.to_string() });
            Err(e)
        }
    }
}

fn skip(phase: Phase, step: &StepSpec, reason: SkipReason, inv: &mut Invocation) {
    debug!("{} step `{}` ({phase}) skipped: {reason:?}", inv.service, step.name);
    inv.trace.record(ExecutionEventKind::StepSkipped { phase,
                                                       step: step.name.clone(),
                                                       reason });
}
