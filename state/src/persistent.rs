//! Persistent world state using sled database

use assetledger_core::{
    HistoryIter, KeyModification, LedgerError, LedgerResult, StateChange, StateVersion,
    Timestamp, TxId, WorldState,
};
use parking_lot::Mutex;
use sled::transaction::{ConflictableTransactionError, TransactionError, Transactional};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const STATE_TREE: &str = "state";
const META_TREE: &str = "meta";
const HISTORY_TREE: &str = "history";
const VERSION_KEY: &[u8] = b"version";
const SEQ_PREFIX: &[u8] = b"seq:";

/// Persistent world state backed by sled database
///
/// `state` holds the latest value per key, `history` one entry per write
/// under `history_prefix(key) ‖ seq`, and `meta` the per-key sequence
/// counters plus the global version.
pub struct SledWorldState {
    db: Db,
    state: Tree,
    meta: Tree,
    history: Tree,
    version: Mutex<StateVersion>,
    flush_on_commit: bool,
    fail_flushes: AtomicBool,
}

impl SledWorldState {
    pub fn open<P: AsRef<Path>>(path: P, flush_on_commit: bool) -> LedgerResult<Self> {
        let db = sled::open(path).map_err(|e| LedgerError::store_io("open", "", e))?;

        let state = db
            .open_tree(STATE_TREE)
            .map_err(|e| LedgerError::store_io("open", STATE_TREE, e))?;
        let meta = db
            .open_tree(META_TREE)
            .map_err(|e| LedgerError::store_io("open", META_TREE, e))?;
        let history = db
            .open_tree(HISTORY_TREE)
            .map_err(|e| LedgerError::store_io("open", HISTORY_TREE, e))?;

        // Load version from disk or start at 0
        let version = match meta
            .get(VERSION_KEY)
            .map_err(|e| LedgerError::store_io("open", "version", e))?
        {
            Some(bytes) => StateVersion::new(decode_u64(&bytes)),
            None => StateVersion::new(0),
        };

        debug!("opened sled world state at {}", version);

        Ok(Self {
            db,
            state,
            meta,
            history,
            version: Mutex::new(version),
            flush_on_commit,
            fail_flushes: AtomicBool::new(false),
        })
    }

    /// Number of keys with a live value
    pub fn key_count(&self) -> usize {
        self.state.len()
    }

    /// Make every subsequent flush fail with `StoreIo`
    pub fn fail_flushes(&self, fail: bool) {
        self.fail_flushes.store(fail, Ordering::SeqCst);
    }

    /// Flush the database to disk
    pub fn flush(&self) -> LedgerResult<()> {
        if self.fail_flushes.load(Ordering::SeqCst) {
            return Err(LedgerError::store_io("flush", "", "injected flush failure"));
        }
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| LedgerError::store_io("flush", "", e))
    }
}

impl WorldState for SledWorldState {
    fn get(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        self.state
            .get(key.as_bytes())
            .map(|opt| opt.map(|v| v.to_vec()))
            .map_err(|e| LedgerError::store_io("get", key, e))
    }

    fn exists(&self, key: &str) -> LedgerResult<bool> {
        self.state
            .contains_key(key.as_bytes())
            .map_err(|e| LedgerError::store_io("exists", key, e))
    }

    fn history(&self, key: &str) -> LedgerResult<HistoryIter<'_>> {
        let owner = key.to_string();
        let iter = self
            .history
            .scan_prefix(history_prefix(key))
            .values()
            .map(move |result| {
                let bytes = result.map_err(|e| LedgerError::store_io("history", owner.as_str(), e))?;
                bincode::deserialize::<KeyModification>(&bytes)
                    .map_err(|e| LedgerError::store_io("history", owner.as_str(), e))
            });

        Ok(Box::new(iter))
    }

    fn apply_batch(&self, tx_id: TxId, changes: Vec<StateChange>) -> LedgerResult<StateVersion> {
        // Writers are serialized so the version counter cannot race
        let mut version = self.version.lock();
        let new_version = version.next();
        let timestamp = Timestamp::now();
        let batch_key = changes.first().map(|c| c.key().to_string()).unwrap_or_default();

        let result: Result<(), TransactionError<LedgerError>> = (&self.state, &self.history, &self.meta)
            .transaction(|(state, history, meta)| {
                for change in &changes {
                    match change {
                        StateChange::Set { key, value } => {
                            state.insert(key.as_bytes(), value.as_slice())?;
                        }
                        StateChange::Append { key, value } => {
                            let seq_key = seq_key(key);
                            let seq = meta.get(seq_key.as_slice())?.map(|b| decode_u64(&b)).unwrap_or(0);

                            let entry = KeyModification {
                                tx_id,
                                version: new_version,
                                timestamp,
                                value: value.clone(),
                            };
                            let bytes = bincode::serialize(&entry).map_err(|e| {
                                ConflictableTransactionError::Abort(LedgerError::store_io(
                                    "append",
                                    key.as_str(),
                                    e,
                                ))
                            })?;

                            history.insert(history_key(key, seq), bytes)?;
                            meta.insert(seq_key, (seq + 1).to_be_bytes().to_vec())?;
                        }
                    }
                }
                meta.insert(VERSION_KEY, new_version.0.to_be_bytes().to_vec())?;
                Ok(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => {
                return Err(LedgerError::store_io("apply_batch", batch_key, e))
            }
        }

        // Committed and visible from here on
        *version = new_version;
        drop(version);

        if self.flush_on_commit {
            if let Err(e) = self.flush() {
                warn!("batch at {} committed but not flushed: {}", new_version, e);
            }
        }

        Ok(new_version)
    }

    fn version(&self) -> StateVersion {
        *self.version.lock()
    }
}

fn decode_u64(bytes: &[u8]) -> u64 {
    u64::from_be_bytes(bytes.try_into().unwrap_or([0; 8]))
}

/// Length-prefixed key, so no key's prefix scan can reach another key's entries
fn history_prefix(key: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(4 + key.len());
    prefix.extend_from_slice(&(key.len() as u32).to_be_bytes());
    prefix.extend_from_slice(key.as_bytes());
    prefix
}

fn history_key(key: &str, seq: u64) -> Vec<u8> {
    let mut hk = history_prefix(key);
    hk.extend_from_slice(&seq.to_be_bytes());
    hk
}

fn seq_key(key: &str) -> Vec<u8> {
    let mut sk = SEQ_PREFIX.to_vec();
    sk.extend_from_slice(key.as_bytes());
    sk
}

/// Thread-safe persistent store wrapper
pub type SharedSledWorldState = Arc<SledWorldState>;

/// Create a shared persistent world state
pub fn create_persistent_store<P: AsRef<Path>>(
    path: P,
    flush_on_commit: bool,
) -> LedgerResult<SharedSledWorldState> {
    Ok(Arc::new(SledWorldState::open(path, flush_on_commit)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn values(world: &SledWorldState, key: &str) -> Vec<Vec<u8>> {
        world
            .history(key)
            .unwrap()
            .map(|m| m.unwrap().value)
            .collect()
    }

    #[test]
    fn test_persistent_store_basic() {
        let tmp = TempDir::new().unwrap();
        let world = SledWorldState::open(tmp.path(), false).unwrap();

        world.put("key1", b"value1").unwrap();
        assert_eq!(world.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert!(world.exists("key1").unwrap());
        assert_eq!(world.get("key2").unwrap(), None);
        assert_eq!(world.key_count(), 1);
    }

    #[test]
    fn test_persistent_history_is_per_key_and_ordered() {
        let tmp = TempDir::new().unwrap();
        let world = SledWorldState::open(tmp.path(), false).unwrap();

        // "a" is a byte prefix of "ab"; their histories must stay apart
        world.put("a", b"a0").unwrap();
        world.put("ab", b"ab0").unwrap();
        world.put("a", b"a1").unwrap();

        assert_eq!(values(&world, "a"), vec![b"a0".to_vec(), b"a1".to_vec()]);
        assert_eq!(values(&world, "ab"), vec![b"ab0".to_vec()]);
        assert!(values(&world, "abc").is_empty());
    }

    #[test]
    fn test_persistent_history_order_past_255_versions() {
        let tmp = TempDir::new().unwrap();
        let world = SledWorldState::open(tmp.path(), false).unwrap();

        for i in 0..300u32 {
            world.put("k", &i.to_be_bytes()).unwrap();
        }

        let seen: Vec<u32> = values(&world, "k")
            .into_iter()
            .map(|v| u32::from_be_bytes(v.try_into().unwrap()))
            .collect();
        assert_eq!(seen, (0..300).collect::<Vec<_>>());
    }

    #[test]
    fn test_flush_failure_keeps_committed_batch() {
        let tmp = TempDir::new().unwrap();

        {
            let world = SledWorldState::open(tmp.path(), true).unwrap();
            world.fail_flushes(true);

            world.put("k", b"v0").unwrap();
            world.put("k", b"v1").unwrap();
            assert_eq!(world.version().0, 2);

            let versions: Vec<u64> = world
                .history("k")
                .unwrap()
                .map(|m| m.unwrap().version.0)
                .collect();
            assert_eq!(versions, vec![1, 2]);

            world.fail_flushes(false);
            world.flush().unwrap();
        }

        let world = SledWorldState::open(tmp.path(), true).unwrap();
        assert_eq!(world.version().0, 2);
        assert_eq!(world.get("k").unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn test_persistent_store_reopen() {
        let tmp = TempDir::new().unwrap();
        let tx_id = TxId::new();

        // Write data
        {
            let world = SledWorldState::open(tmp.path(), true).unwrap();
            world.put("key1", b"value1").unwrap();
            let changes = vec![
                StateChange::Set {
                    key: "k2".into(),
                    value: b"v2".to_vec(),
                },
                StateChange::Append {
                    key: "k2".into(),
                    value: b"v2".to_vec(),
                },
            ];
            world.apply_batch(tx_id, changes).unwrap();
        }

        // Reopen and verify
        {
            let world = SledWorldState::open(tmp.path(), true).unwrap();
            assert_eq!(world.get("key1").unwrap(), Some(b"value1".to_vec()));
            assert_eq!(world.get("k2").unwrap(), Some(b"v2".to_vec()));
            assert_eq!(world.version().0, 2);

            let entry = world.history("k2").unwrap().next().unwrap().unwrap();
            assert_eq!(entry.tx_id, tx_id);
            assert_eq!(entry.version.0, 2);

            world.put("key1", b"value2").unwrap();
            assert_eq!(
                values(&world, "key1"),
                vec![b"value1".to_vec(), b"value2".to_vec()]
            );
        }
    }
}
