use super::envelope::{self, PersistedState};
use super::storage::StorageArea;
use super::{PersistenceEngine, LAST_UPDATE_KEY, ROOT_KEY};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug)]
pub enum SyncResult {
    /// Local copy was newer and overwrote the remote one.
    Pushed,
    /// Remote copy was newer; local storage now holds it.
    Pulled(PersistedState),
    AlreadyUpToDate,
}

async fn last_update(area: &dyn StorageArea) -> Result<i64> {
    Ok(area
        .get(LAST_UPDATE_KEY)
        .await?
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0))
}

/// Last writer wins on the whole envelope.
pub async fn sync_areas(local: &dyn StorageArea, remote: &dyn StorageArea) -> Result<SyncResult> {
    let local_ts = last_update(local).await?;
    let remote_ts = last_update(remote).await?;

    if local_ts > remote_ts {
        let Some(root) = local.get(ROOT_KEY).await? else {
            return Ok(SyncResult::AlreadyUpToDate);
        };
        remote
            .set(&[(ROOT_KEY, root), (LAST_UPDATE_KEY, local_ts.to_string())])
            .await?;
        tracing::debug!(local_ts, remote_ts, "pushed local state");
        Ok(SyncResult::Pushed)
    } else if remote_ts > local_ts {
        let Some(root) = remote.get(ROOT_KEY).await? else {
            return Ok(SyncResult::AlreadyUpToDate);
        };
        // a remote copy we cannot read must not clobber the local one
        let state = envelope::decode(&root)?;
        local
            .set(&[(ROOT_KEY, root), (LAST_UPDATE_KEY, remote_ts.to_string())])
            .await?;
        tracing::debug!(local_ts, remote_ts, "pulled remote state");
        Ok(SyncResult::Pulled(state))
    } else {
        Ok(SyncResult::AlreadyUpToDate)
    }
}

/// Start a sync job every `interval`, each bounded by `deadline`. Jobs run
/// independently, so a slow one may overlap the next. Pulled states are sent
/// on `pulled` for the app loop to apply.
pub fn spawn_sync_timer(
    engine: Arc<PersistenceEngine>,
    interval: Duration,
    deadline: Duration,
    pulled: mpsc::UnboundedSender<PersistedState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if pulled.is_closed() {
                break;
            }
            let engine = Arc::clone(&engine);
            let pulled = pulled.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(deadline, engine.sync()).await {
                    Ok(Ok(SyncResult::Pulled(state))) => {
                        let _ = pulled.send(state);
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => tracing::warn!("sync failed: {}", e),
                    Err(_) => tracing::warn!("sync timed out after {:?}", deadline),
                }
            });
        }
        tracing::debug!("sync timer stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::storage::MemoryStorage;
    use crate::tab_groups::TabGroup;

    fn state(name: &str) -> PersistedState {
        PersistedState {
            tab_groups: vec![
                TabGroup::current(),
                TabGroup {
                    id: "g1".into(),
                    name: name.into(),
                    ..TabGroup::new()
                },
            ],
            ..PersistedState::default()
        }
    }

    async fn seed(area: &MemoryStorage, s: &PersistedState, ts: i64) {
        area.set(&[
            (ROOT_KEY, envelope::encode(s).unwrap()),
            (LAST_UPDATE_KEY, ts.to_string()),
        ])
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn newer_local_is_pushed() {
        let local = MemoryStorage::new();
        let remote = MemoryStorage::new();
        seed(&local, &state("local"), 200).await;
        seed(&remote, &state("remote"), 100).await;

        assert!(matches!(sync_areas(&local, &remote).await.unwrap(), SyncResult::Pushed));
        assert_eq!(remote.get(LAST_UPDATE_KEY).await.unwrap().as_deref(), Some("200"));
        let pushed = envelope::decode(&remote.get(ROOT_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(pushed.tab_groups[1].name, "local");
    }

    #[tokio::test]
    async fn newer_remote_is_pulled() {
        let local = MemoryStorage::new();
        let remote = MemoryStorage::new();
        seed(&local, &state("local"), 100).await;
        seed(&remote, &state("remote"), 300).await;

        match sync_areas(&local, &remote).await.unwrap() {
            SyncResult::Pulled(s) => assert_eq!(s.tab_groups[1].name, "remote"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(local.get(LAST_UPDATE_KEY).await.unwrap().as_deref(), Some("300"));
    }

    #[tokio::test]
    async fn equal_timestamps_are_up_to_date() {
        let local = MemoryStorage::new();
        let remote = MemoryStorage::new();
        seed(&local, &state("a"), 100).await;
        seed(&remote, &state("b"), 100).await;
        assert!(matches!(
            sync_areas(&local, &remote).await.unwrap(),
            SyncResult::AlreadyUpToDate
        ));
        // both empty
        let empty = MemoryStorage::new();
        assert!(matches!(
            sync_areas(&empty, &MemoryStorage::new()).await.unwrap(),
            SyncResult::AlreadyUpToDate
        ));
    }

    #[tokio::test]
    async fn corrupt_remote_does_not_overwrite_local() {
        let local = MemoryStorage::new();
        let remote = MemoryStorage::new();
        seed(&local, &state("local"), 100).await;
        remote
            .set(&[(ROOT_KEY, "garbage".into()), (LAST_UPDATE_KEY, "500".into())])
            .await
            .unwrap();
        assert!(sync_areas(&local, &remote).await.is_err());
        assert_eq!(local.get(LAST_UPDATE_KEY).await.unwrap().as_deref(), Some("100"));
    }

    #[tokio::test(start_paused = true)]
    async fn timer_reports_pulled_state() {
        let local = Arc::new(MemoryStorage::new());
        let remote = Arc::new(MemoryStorage::new());
        seed(&remote, &state("from elsewhere"), 900).await;

        let remote_area: Arc<dyn StorageArea> = remote.clone();
        let engine = Arc::new(PersistenceEngine::new(local.clone(), Some(remote_area)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let timer = spawn_sync_timer(engine, Duration::from_secs(10), Duration::from_secs(5), tx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(6)).await;
        let pulled = rx.try_recv().unwrap();
        assert_eq!(pulled.tab_groups[1].name, "from elsewhere");
        assert_eq!(local.get(LAST_UPDATE_KEY).await.unwrap().as_deref(), Some("900"));
        timer.abort();
    }
}
