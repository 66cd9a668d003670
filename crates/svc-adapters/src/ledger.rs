//! Ledger en memoria con soporte transaccional.
//!
//! El ledger es un journal append-only de movimientos `(cuenta, delta)`. Una
//! transacción recuerda la longitud del journal al abrirse; el rollback
//! trunca hasta esa marca y el commit no hace nada. Pensado para un único
//! escritor por transacción: dos transacciones concurrentes sobre el mismo
//! ledger no están aisladas entre sí.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use serde::Serialize;
use svc_core::{ServiceError, Transaction, TransactionBackend};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub account: String,
    pub delta: i64,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    journal: Arc<Mutex<Vec<LedgerEntry>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un movimiento.
    pub fn record(&self, account: impl Into<String>, delta: i64) {
        let account = account.into();
        debug!("ledger: {account} {delta:+}");
        self.lock().push(LedgerEntry { account, delta });
    }

    pub fn balance(&self, account: &str) -> i64 {
        self.lock().iter().filter(|e| e.account == account).map(|e| e.delta).sum()
    }

    pub fn balances(&self) -> BTreeMap<String, i64> {
        let mut out = BTreeMap::new();
        for e in self.lock().iter() {
            *out.entry(e.account.clone()).or_insert(0) += e.delta;
        }
        out
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Un panic con el lock tomado no deja el journal a medias: cada
    // operación es un único push o truncate.
    fn lock(&self) -> MutexGuard<'_, Vec<LedgerEntry>> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct JournalMark {
    ledger: InMemoryLedger,
    mark: usize,
}

impl Transaction for JournalMark {
    fn commit(self: Box<Self>) -> Result<(), ServiceError> {
        debug!("ledger: commit ({} entries)", self.ledger.len().saturating_sub(self.mark));
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), ServiceError> {
        let mut journal = self.ledger.lock();
        debug!("ledger: rollback to {} (dropping {})", self.mark, journal.len().saturating_sub(self.mark));
        journal.truncate(self.mark);
        Ok(())
    }
}

impl TransactionBackend for InMemoryLedger {
    fn begin(&self) -> Result<Box<dyn Transaction>, ServiceError> {
        Ok(Box::new(JournalMark { ledger: self.clone(),
                                  mark: self.len() }))
    }

    fn name(&self) -> &str {
        "in-memory-ledger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_truncates_to_mark() {
        let ledger = InMemoryLedger::new();
        ledger.record("stock:apple", 10);
        let tx = ledger.begin().unwrap();
        ledger.record("stock:apple", -3);
        assert_eq!(ledger.balance("stock:apple"), 7);
        tx.rollback().unwrap();
        assert_eq!(ledger.balance("stock:apple"), 10);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn commit_keeps_entries() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin().unwrap();
        ledger.record("a", 1);
        ledger.record("b", -1);
        tx.commit().unwrap();
        assert_eq!(ledger.balances(), BTreeMap::from([("a".to_string(), 1), ("b".to_string(), -1)]));
    }
}
