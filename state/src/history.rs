//! Per-key history log
//!
//! Append-only, ordered record versions. Nothing is cached between calls:
//! every replay opens a fresh world-state cursor and decodes as it goes.

use assetledger_core::{
    HistoryIter, KeyModification, LedgerError, LedgerResult, Record, RecordCodec, StateChange,
    StateVersion, Timestamp, TxId, WorldState,
};
use std::marker::PhantomData;

/// One decoded history entry with its write metadata
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<R> {
    pub tx_id: TxId,
    pub version: StateVersion,
    pub timestamp: Timestamp,
    pub record: R,
}

/// History log for records of type `R`
pub struct HistoryLog<W, R, C> {
    world: W,
    codec: C,
    _record: PhantomData<fn() -> R>,
}

impl<W, R, C> HistoryLog<W, R, C>
where
    W: WorldState,
    R: Record,
    C: RecordCodec<R>,
{
    pub fn new(world: W, codec: C) -> Self {
        Self {
            world,
            codec,
            _record: PhantomData,
        }
    }

    /// Add a record as the newest entry of the key's history
    pub fn append(&self, key: &str, record: &R) -> LedgerResult<()> {
        let value = self.codec.encode(record).map_err(|source| LedgerError::Encode {
            key: key.to_string(),
            source,
        })?;

        self.world.apply_batch(
            TxId::new(),
            vec![StateChange::Append {
                key: key.to_string(),
                value,
            }],
        )?;
        Ok(())
    }

    /// Replay the key's records, oldest first
    pub fn replay(&self, key: &str) -> LedgerResult<Replay<'_, R, C>> {
        Ok(Replay::new(key, self.world.history(key)?, &self.codec))
    }

    /// Replay the key's records together with their write metadata
    pub fn replay_entries(&self, key: &str) -> LedgerResult<ReplayEntries<'_, R, C>> {
        Ok(ReplayEntries(self.replay(key)?))
    }
}

/// Lazy, one-shot replay of a key's history
///
/// Yields decoded records oldest first. The first failure is yielded and ends
/// the replay. Dropping the replay releases the world-state cursor.
pub struct Replay<'a, R, C> {
    key: String,
    cursor: Option<HistoryIter<'a>>,
    codec: &'a C,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R, C> Replay<'a, R, C>
where
    R: Record,
    C: RecordCodec<R>,
{
    fn new(key: &str, cursor: HistoryIter<'a>, codec: &'a C) -> Self {
        Self {
            key: key.to_string(),
            cursor: Some(cursor),
            codec,
            _record: PhantomData,
        }
    }

    fn next_entry(&mut self) -> Option<LedgerResult<HistoryEntry<R>>> {
        let item = self.cursor.as_mut()?.next();
        let result = match item {
            None => {
                self.cursor = None;
                return None;
            }
            Some(modification) => modification.and_then(|m| self.decode(m)),
        };

        if result.is_err() {
            // Release the cursor as soon as the replay fails
            self.cursor = None;
        }
        Some(result)
    }

    fn decode(&self, m: KeyModification) -> LedgerResult<HistoryEntry<R>> {
        let record = self.codec.decode(&m.value).map_err(|source| LedgerError::Decode {
            key: self.key.clone(),
            source,
        })?;

        Ok(HistoryEntry {
            tx_id: m.tx_id,
            version: m.version,
            timestamp: m.timestamp,
            record,
        })
    }
}

impl<R, C> Iterator for Replay<'_, R, C>
where
    R: Record,
    C: RecordCodec<R>,
{
    type Item = LedgerResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().map(|entry| entry.map(|e| e.record))
    }
}

/// [`Replay`] variant that keeps each record's write metadata
pub struct ReplayEntries<'a, R, C>(Replay<'a, R, C>);

impl<R, C> Iterator for ReplayEntries<'_, R, C>
where
    R: Record,
    C: RecordCodec<R>,
{
    type Item = LedgerResult<HistoryEntry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_entry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWorldState;
    use crate::store::tests::{item, Item};
    use crate::store::StateStore;
    use assetledger_core::JsonCodec;

    type Log<'a> = HistoryLog<&'a MemoryWorldState, Item, JsonCodec<Item>>;

    fn log(world: &MemoryWorldState) -> Log<'_> {
        HistoryLog::new(world, JsonCodec::new())
    }

    #[test]
    fn test_replay_in_write_order() {
        let world = MemoryWorldState::new();
        let store = StateStore::new(&world, JsonCodec::<Item>::new());

        store.create("a", &item("a", 0.0)).unwrap();
        for qty in 1..=4 {
            store.update("a", &item("a", qty as f64)).unwrap();
        }

        let records: Vec<Item> = log(&world)
            .replay("a")
            .unwrap()
            .collect::<LedgerResult<_>>()
            .unwrap();
        let expected: Vec<Item> = (0..=4).map(|q| item("a", q as f64)).collect();
        assert_eq!(records, expected);
        assert_eq!(store.read("a").unwrap(), item("a", 4.0));
    }

    #[test]
    fn test_replay_is_restartable() {
        let world = MemoryWorldState::new();
        let log = log(&world);
        log.append("a", &item("a", 1.0)).unwrap();
        log.append("a", &item("a", 2.0)).unwrap();

        assert_eq!(log.replay("a").unwrap().count(), 2);
        assert_eq!(log.replay("a").unwrap().count(), 2);
    }

    #[test]
    fn test_append_does_not_touch_latest_value() {
        let world = MemoryWorldState::new();
        log(&world).append("a", &item("a", 1.0)).unwrap();

        assert!(!world.exists("a").unwrap());
        assert_eq!(log(&world).replay("a").unwrap().count(), 1);
    }

    #[test]
    fn test_replay_never_written_is_empty() {
        let world = MemoryWorldState::new();
        assert_eq!(log(&world).replay("ghost").unwrap().count(), 0);
        assert_eq!(world.open_cursors(), 0);
    }

    #[test]
    fn test_replay_short_circuits_on_corrupt_entry() {
        let world = MemoryWorldState::new();
        let log = log(&world);
        log.append("a", &item("a", 1.0)).unwrap();
        world.put("a", b"not json").unwrap();
        log.append("a", &item("a", 3.0)).unwrap();

        let mut replay = log.replay("a").unwrap();
        assert_eq!(replay.next().unwrap().unwrap(), item("a", 1.0));
        assert!(matches!(replay.next(), Some(Err(LedgerError::Decode { .. }))));
        assert!(replay.next().is_none());

        // the cursor was released on the error path, before the replay is dropped
        assert_eq!(world.open_cursors(), 0);
        drop(replay);

        let collected: LedgerResult<Vec<Item>> = log.replay("a").unwrap().collect();
        assert!(matches!(collected, Err(LedgerError::Decode { .. })));
        assert_eq!(world.open_cursors(), 0);
    }

    #[test]
    fn test_abandoned_replay_releases_cursor() {
        let world = MemoryWorldState::new();
        let log = log(&world);
        log.append("a", &item("a", 1.0)).unwrap();
        log.append("a", &item("a", 2.0)).unwrap();

        let mut replay = log.replay("a").unwrap();
        replay.next();
        assert_eq!(world.open_cursors(), 1);
        drop(replay);
        assert_eq!(world.open_cursors(), 0);
    }

    #[test]
    fn test_replay_entries_carry_metadata() {
        let world = MemoryWorldState::new();
        let store = StateStore::new(&world, JsonCodec::<Item>::new());
        store.create("a", &item("a", 1.0)).unwrap();
        store.update("a", &item("a", 2.0)).unwrap();

        let entries: Vec<HistoryEntry<Item>> = log(&world)
            .replay_entries("a")
            .unwrap()
            .collect::<LedgerResult<_>>()
            .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].version.0, 1);
        assert_eq!(entries[1].version.0, 2);
        assert_ne!(entries[0].tx_id, entries[1].tx_id);
        assert_eq!(entries[1].record, item("a", 2.0));
    }

    #[test]
    fn test_replay_read_failure() {
        let world = MemoryWorldState::new();
        world.fail_reads(true);
        assert!(matches!(
            log(&world).replay("a"),
            Err(LedgerError::StoreIo { .. })
        ));
    }
}
