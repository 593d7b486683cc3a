//! In-memory world state for testing and light nodes

use assetledger_core::{
    HistoryIter, KeyModification, LedgerError, LedgerResult, StateChange, StateVersion,
    Timestamp, TxId, WorldState,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct MemoryInner {
    data: HashMap<String, Vec<u8>>,
    history: HashMap<String, Vec<KeyModification>>,
    version: StateVersion,
}

/// In-memory world state
///
/// A batch is applied under a single write lock, so readers observe either
/// all of it or none of it.
pub struct MemoryWorldState {
    inner: RwLock<MemoryInner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryInner::default()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every subsequent read (get and history) fail with `StoreIo`
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent batch fail with `StoreIo`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of history cursors that have been opened and not yet dropped
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Number of keys with a live value
    pub fn key_count(&self) -> usize {
        self.inner.read().data.len()
    }

    fn check_reads(&self, op: &'static str, key: &str) -> LedgerResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(LedgerError::store_io(op, key, "injected read failure"));
        }
        Ok(())
    }
}

impl Default for MemoryWorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState for MemoryWorldState {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.check_reads("get", key)?;
        Ok(self.inner.read().data.get(key).cloned())
    }

    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        self.check_reads("history", key)?;
        let entries = self
            .inner
            .read()
            .history
            .get(key)
            .cloned()
            .unwrap_or_default();

        Ok(Box::new(MemoryCursor::open(entries, self.open_cursors.clone())))
    }

    fn apply_batch(&self, tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion> {
        if self.fail_writes.load(Ordering::SeqCst) {
            let key = changes.first().map(|c| c.key().to_string()).unwrap_or_default();
            return Err(LedgerError::store_io("apply_batch", key, "injected write failure"));
        }

        let mut inner = self.inner.write();
        let new_version = inner.version.next();
        let timestamp = Timestamp::now();

        for change in changes {
            match change {
                StateChange::Set { key, value } => {
                    inner.data.insert(key, value);
                }
                StateChange::Append { key, value } => {
                    inner.history.entry(key).or_default().push(KeyModification {
                        tx_id,
                        version: new_version,
                        timestamp,
                        value,
                    });
                }
            }
        }

        inner.version = new_version;
        Ok(new_version)
    }

    fn version(&self) -> StateVersion {
        self.inner.read().version
    }
}

/// History cursor over a snapshot of one key's entries
struct MemoryCursor {
    entries: std::vec::IntoIter<KeyModification>,
    open: Arc<AtomicUsize>,
}

impl MemoryCursor {
    fn open(entries: Vec<KeyModification>, open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self {
            entries: entries.into_iter(),
            open,
        }
    }
}

impl Iterator for MemoryCursor {
    type Item = LedgerResult<KeyModification>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(Ok)
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Thread-safe memory store wrapper
pub type SharedMemoryWorldState = Arc<MemoryWorldState>;

/// Create a shared memory world state
pub fn create_memory_store() -> SharedMemoryWorldState {
    Arc::new(MemoryWorldState::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(world: &MemoryWorldState, key: &str) -> Vec<Vec<u8>> {
        world
            .history(key)
            .unwrap()
            .map(|m| m.unwrap().value)
            .collect()
    }

    #[test]
    fn test_memory_store_basic() {
        let world = MemoryWorldState::new();

        world.put("key1", b"value1").unwrap();
        assert_eq!(world.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert!(world.exists("key1").unwrap());
        assert!(!world.exists("key2").unwrap());
        assert_eq!(world.get("key2").unwrap(), None);

        world.put("key1", b"value2").unwrap();
        assert_eq!(world.key_count(), 1);
    }

    #[test]
    fn test_memory_store_history_order() {
        let world = MemoryWorldState::new();

        world.put("k", b"v0").unwrap();
        world.put("k", b"v1").unwrap();
        world.put("other", b"x").unwrap();
        world.put("k", b"v2").unwrap();

        assert_eq!(
            values(&world, "k"),
            vec![b"v0".to_vec(), b"v1".to_vec(), b"v2".to_vec()]
        );
        assert_eq!(world.get("k").unwrap(), Some(b"v2".to_vec()));
        assert!(values(&world, "never").is_empty());
    }

    #[test]
    fn test_memory_store_batch() {
        let world = MemoryWorldState::new();
        let tx_id = TxId::new();

        let changes = vec![
            StateChange::Set {
                key: "k1".into(),
                value: b"v1".to_vec(),
            },
            StateChange::Append {
                key: "k1".into(),
                value: b"v1".to_vec(),
            },
        ];

        let version = world.apply_batch(tx_id, changes).unwrap();
        assert_eq!(version.0, 1);
        assert_eq!(world.version(), version);

        let entry = world.history("k1").unwrap().next().unwrap().unwrap();
        assert_eq!(entry.tx_id, tx_id);
        assert_eq!(entry.version, version);
    }

    #[test]
    fn test_memory_store_write_fault_leaves_no_state() {
        let world = MemoryWorldState::new();
        world.fail_writes(true);

        let result = world.put("k1", b"v1");
        assert!(matches!(result, Err(LedgerError::StoreIo { .. })));

        world.fail_writes(false);
        assert!(!world.exists("k1").unwrap());
        assert!(values(&world, "k1").is_empty());
        assert_eq!(world.version().0, 0);
    }

    #[test]
    fn test_memory_store_cursor_release() {
        let world = MemoryWorldState::new();
        world.put("k", b"v0").unwrap();

        {
            let mut cursor = world.history("k").unwrap();
            assert_eq!(world.open_cursors(), 1);
            cursor.next();
        }
        assert_eq!(world.open_cursors(), 0);
    }
}
