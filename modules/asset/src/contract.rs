//! Asset contract - the public create/update/read/history operations

use assetledger_core::{JsonCodec, LedgerResult, Timestamp, TxId, WorldState};
use assetledger_state::{HistoryLog, StateStore};
use serde::Serialize;
use tracing::{debug, info};

use crate::asset::{Asset, AssetFields};

/// One historic asset version with the transaction that wrote it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetHistoryEntry {
    pub tx_id: TxId,
    pub version: u64,
    pub timestamp: Timestamp,
    pub asset: Asset,
}

/// Asset contract over a world state
///
/// The world state is injected per instance; build one over a
/// `TransactionContext` to run the operations inside a host transaction.
pub struct AssetContract<W: WorldState + Clone> {
    store: StateStore<W, Asset, JsonCodec<Asset>>,
    history: HistoryLog<W, Asset, JsonCodec<Asset>>,
}

impl<W: WorldState + Clone> AssetContract<W> {
    pub fn new(world: W) -> Self {
        Self {
            store: StateStore::new(world.clone(), JsonCodec::new()),
            history: HistoryLog::new(world, JsonCodec::new()),
        }
    }

    /// Create a new asset. Fails if the dealer already has one.
    pub fn create_asset(&self, dealer_id: &str, fields: AssetFields) -> LedgerResult<()> {
        let asset = Asset::new(dealer_id, fields);
        self.store.create(dealer_id, &asset)?;

        info!(
            "Created asset {}: balance={} status={}",
            dealer_id, asset.balance, asset.status
        );
        Ok(())
    }

    /// Replace every attribute of an existing asset except its dealer ID
    pub fn update_asset(&self, dealer_id: &str, fields: AssetFields) -> LedgerResult<()> {
        let current = self.store.read(dealer_id)?;
        let updated = Asset::new(current.dealer_id, fields);
        self.store.update(dealer_id, &updated)?;

        debug!(
            "Updated asset {}: balance={} transType={}",
            dealer_id, updated.balance, updated.trans_type
        );
        Ok(())
    }

    /// Read the current asset
    pub fn read_asset(&self, dealer_id: &str) -> LedgerResult<Asset> {
        self.store.read(dealer_id)
    }

    /// Check if the dealer has an asset
    pub fn asset_exists(&self, dealer_id: &str) -> LedgerResult<bool> {
        self.store.exists(dealer_id)
    }

    /// Every version the asset has held, oldest first. A dealer that was
    /// never written has an empty history.
    pub fn get_asset_history(&self, dealer_id: &str) -> LedgerResult<Vec<Asset>> {
        let assets = self
            .history
            .replay(dealer_id)?
            .collect::<LedgerResult<Vec<_>>>()?;

        debug!("History of {}: {} versions", dealer_id, assets.len());
        Ok(assets)
    }

    /// Like [`get_asset_history`](Self::get_asset_history), with write metadata
    pub fn get_asset_history_entries(&self, dealer_id: &str) -> LedgerResult<Vec<AssetHistoryEntry>> {
        self.history
            .replay_entries(dealer_id)?
            .map(|entry| {
                entry.map(|e| AssetHistoryEntry {
                    tx_id: e.tx_id,
                    version: e.version.0,
                    timestamp: e.timestamp,
                    asset: e.record,
                })
            })
            .collect()
    }
}
