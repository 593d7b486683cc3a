//! Host transaction context
//!
//! Stages every write of one logical operation and applies them to the
//! backing world state as a single atomic batch on commit. Dropping the
//! context without committing discards the staged writes.

use assetledger_core::{
    HistoryIter, LedgerResult, StateChange, StateVersion, TxId, WorldState,
};
use parking_lot::Mutex;
use tracing::debug;

/// Write-staging view over a world state
pub struct TransactionContext<W: WorldState> {
    tx_id: TxId,
    world: W,
    pending: Mutex<Vec<StateChange>>,
}

impl<W: WorldState> TransactionContext<W> {
    pub fn new(world: W) -> Self {
        Self {
            tx_id: TxId::new(),
            world,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Number of staged changes
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Apply staged changes to the backing world state
    pub fn commit(self) -> LedgerResult<StateVersion> {
        let changes = std::mem::take(&mut *self.pending.lock());
        if changes.is_empty() {
            return Ok(self.world.version());
        }

        let count = changes.len();
        let version = self.world.apply_batch(self.tx_id, changes)?;
        debug!("tx {} committed {} changes at {}", self.tx_id, count, version);
        Ok(version)
    }

    /// Discard staged changes
    pub fn rollback(self) {
        let discarded = self.pending.lock().len();
        debug!("tx {} rolled back {} changes", self.tx_id, discarded);
    }
}

impl<W: WorldState> WorldState for TransactionContext<W> {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        // Check pending changes first
        let staged = self.pending.lock().iter().rev().find_map(|change| match change {
            StateChange::Set { key: k, value } if k == key => Some(value.clone()),
            _ => None,
        });

        match staged {
            Some(value) => Ok(Some(value)),
            None => self.world.get(key),
        }
    }

    /// Committed history only; staged appends become visible after commit.
    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        self.world.history(key)
    }

    fn apply_batch(&self, _tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion> {
        self.pending.lock().extend(changes);
        Ok(self.world.version())
    }

    fn version(&self) -> StateVersion {
        self.world.version()
    }
}
