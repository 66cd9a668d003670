//! Eventos de ejecución y su acumulador por invocación.

mod types;

use chrono::Utc;
use uuid::Uuid;

pub use types::{ExecutionEvent, ExecutionEventKind, SkipReason};

/// Acumulador append-only de eventos de una invocación.
#[derive(Debug, Clone)]
pub struct Trace {
    invocation_id: Uuid,
    events: Vec<ExecutionEvent>,
}

impl Trace {
    pub fn new(invocation_id: Uuid) -> Self {
        Self { invocation_id,
               events: Vec::new() }
    }

    pub fn record(&mut self, kind: ExecutionEventKind) {
        let seq = self.events.len() as u64;
        self.events.push(ExecutionEvent { seq,
                                          invocation_id: self.invocation_id,
                                          kind,
                                          ts: Utc::now() });
    }

    pub fn events(&self) -> &[ExecutionEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ExecutionEvent> {
        self.events
    }
}
