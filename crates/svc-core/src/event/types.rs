//! Traza de una invocación.
//!
//! Cada invocación emite eventos append-only que describen qué steps se
//! ejecutaron, cuáles se saltaron y cómo terminó el scope transaccional. La
//! traza es sólo observabilidad: no participa en el resultado.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::ParentLink;
use crate::step::{InvocationState, Phase};

/// Motivo por el que un step no se ejecutó.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// La guarda evaluó a falso.
    Guard,
    /// Un break (o `done`) detuvo la fase principal.
    Halted,
    /// Hay errores: la fase `after` no corre.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEventKind {
    /// Primer evento: fija servicio, `plan_hash` y padre (si lo hay).
    InvocationStarted { service: String, plan_hash: String, parent: Option<ParentLink> },
    StepStarted { phase: Phase, step: String },
    StepSkipped { phase: Phase, step: String, reason: SkipReason },
    StepFinished { phase: Phase, step: String },
    /// El cuerpo devolvió error (raise u otro fallo fatal).
    StepAborted { phase: Phase, step: String, reason: String },
    TransactionCommitted,
    TransactionRolledBack,
    /// Último evento.
    InvocationFinished { state: InvocationState },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub seq: u64,
    pub invocation_id: Uuid,
    pub kind: ExecutionEventKind,
    pub ts: DateTime<Utc>, // metadato
}
