//! Local persistence and cross-device replication of the durable slices.

pub mod envelope;
pub mod migrations;
pub mod storage;
pub mod sync_engine;

use crate::error::Result;
use crate::tab_groups::TabGroupsState;
use envelope::PersistedState;
use std::sync::Arc;
use storage::StorageArea;
use sync_engine::SyncResult;

pub const ROOT_KEY: &str = "persist:root";
pub const LAST_UPDATE_KEY: &str = "lastUpdate";

pub struct PersistenceEngine {
    local: Arc<dyn StorageArea>,
    remote: Option<Arc<dyn StorageArea>>,
}

impl PersistenceEngine {
    pub fn new(local: Arc<dyn StorageArea>, remote: Option<Arc<dyn StorageArea>>) -> Self {
        PersistenceEngine { local, remote }
    }

    /// Write the envelope and stamp `lastUpdate` with the current time.
    pub async fn persist(&self, state: &PersistedState) -> Result<()> {
        let root = envelope::encode(state)?;
        let now = chrono::Utc::now().timestamp_millis();
        self.local
            .set(&[(ROOT_KEY, root), (LAST_UPDATE_KEY, now.to_string())])
            .await
    }

    /// Load the stored envelope. Never fails: a missing or unreadable copy
    /// yields fresh defaults.
    pub async fn rehydrate(&self) -> PersistedState {
        let raw = match self.local.get(ROOT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::info!("no persisted state, starting fresh");
                return fresh();
            }
            Err(e) => {
                tracing::warn!("reading persisted state failed: {}", e);
                return fresh();
            }
        };
        match envelope::decode(&raw) {
            Ok(mut state) => {
                state.tab_groups = TabGroupsState::from_groups(state.tab_groups).groups;
                state
            }
            Err(e) => {
                tracing::warn!("persisted state is corrupt, starting fresh: {}", e);
                fresh()
            }
        }
    }

    pub async fn sync(&self) -> Result<SyncResult> {
        match &self.remote {
            Some(remote) => sync_engine::sync_areas(self.local.as_ref(), remote.as_ref()).await,
            None => Ok(SyncResult::AlreadyUpToDate),
        }
    }
}

fn fresh() -> PersistedState {
    PersistedState {
        tab_groups: TabGroupsState::default().groups,
        ..PersistedState::default()
    }
}
