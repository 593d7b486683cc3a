//! Node runtime hosting the asset contract

use assetledger_asset::{Asset, AssetContract, AssetFields, AssetHistoryEntry};
use assetledger_core::{
    LedgerError, LedgerResult, NodeConfig, StateVersion, StorageBackend, WorldState,
};
use assetledger_state::{create_memory_store, create_persistent_store, TransactionContext};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

type TxContract<'a> = AssetContract<&'a TransactionContext<Arc<dyn WorldState>>>;

/// Node status snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub name: String,
    pub backend: StorageBackend,
    pub state_version: u64,
}

/// Node runtime managing the world state and contract invocations
///
/// Every write runs in its own `TransactionContext` and writers are
/// serialized, so each create/update commits atomically or not at all.
pub struct NodeRuntime {
    config: NodeConfig,
    world: Arc<dyn WorldState>,
    write_lock: Mutex<()>,
}

impl NodeRuntime {
    /// Create a runtime, opening the world state the config asks for
    pub fn new(config: NodeConfig) -> LedgerResult<Self> {
        let world: Arc<dyn WorldState> = match config.storage.backend {
            StorageBackend::Memory => create_memory_store(),
            StorageBackend::Sled => {
                std::fs::create_dir_all(&config.data_dir).map_err(|e| {
                    LedgerError::store_io("open", config.data_dir.display().to_string(), e)
                })?;
                create_persistent_store(config.db_path(), config.storage.flush_on_commit)?
            }
        };

        info!(
            "World state opened: backend={:?} version={}",
            config.storage.backend,
            world.version()
        );

        Ok(Self::with_world(config, world))
    }

    /// Create a runtime over an existing world state
    pub fn with_world(config: NodeConfig, world: Arc<dyn WorldState>) -> Self {
        Self {
            config,
            world,
            write_lock: Mutex::new(()),
        }
    }

    pub fn create_asset(&self, dealer_id: &str, fields: AssetFields) -> LedgerResult<StateVersion> {
        self.submit("CreateAsset", dealer_id, |contract| {
            contract.create_asset(dealer_id, fields)
        })
    }

    pub fn update_asset(&self, dealer_id: &str, fields: AssetFields) -> LedgerResult<StateVersion> {
        self.submit("UpdateAsset", dealer_id, |contract| {
            contract.update_asset(dealer_id, fields)
        })
    }

    pub fn read_asset(&self, dealer_id: &str) -> LedgerResult<Asset> {
        self.contract().read_asset(dealer_id)
    }

    pub fn get_asset_history(&self, dealer_id: &str) -> LedgerResult<Vec<Asset>> {
        self.contract().get_asset_history(dealer_id)
    }

    pub fn get_asset_history_entries(&self, dealer_id: &str) -> LedgerResult<Vec<AssetHistoryEntry>> {
        self.contract().get_asset_history_entries(dealer_id)
    }

    /// Get current state version
    pub fn state_version(&self) -> StateVersion {
        self.world.version()
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus {
            name: self.config.name.clone(),
            backend: self.config.storage.backend,
            state_version: self.state_version().0,
        }
    }

    /// Get config reference
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn contract(&self) -> AssetContract<Arc<dyn WorldState>> {
        AssetContract::new(self.world.clone())
    }

    /// Run one contract operation as a transaction
    fn submit<F>(&self, op: &str, dealer_id: &str, f: F) -> LedgerResult<StateVersion>
    where
        F: FnOnce(&TxContract<'_>) -> LedgerResult<()>,
    {
        let _writer = self.write_lock.lock();
        let ctx = TransactionContext::new(self.world.clone());
        let tx_id = ctx.tx_id();

        let outcome = f(&AssetContract::new(&ctx));
        match outcome {
            Ok(()) => {
                let version = ctx.commit()?;
                info!("{} {} committed: tx={} version={}", op, dealer_id, tx_id, version);
                Ok(version)
            }
            Err(e) => {
                warn!("{} {} failed: {}", op, dealer_id, e);
                ctx.rollback();
                Err(e)
            }
        }
    }
}
