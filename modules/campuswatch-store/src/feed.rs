use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use campuswatch_common::CampusError;

use crate::backend::IncidentRepository;
use crate::cache::IncidentCache;

/// Handle for a running sync loop. Abort via `stop` on logout.
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Keep an `IncidentCache` in sync with a repository.
///
/// Subscribes before the initial fetch so no insert falls between the two,
/// seeds the cache with a full fetch, then applies inserts by id. A lagged
/// subscription triggers a silent full refresh; the user took no action
/// to attribute a failure to, so nothing surfaces.
pub async fn start_feed(
    repo: Arc<dyn IncidentRepository>,
    cache: Arc<RwLock<IncidentCache>>,
) -> Result<FeedHandle, CampusError> {
    let mut rx = repo.subscribe_inserts();

    let initial = repo.list_incidents().await?;
    cache.write().await.replace_all(initial);

    let task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(incident) => {
                    cache.write().await.upsert(incident);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "insert feed lagged, refreshing from store");
                    match repo.list_incidents().await {
                        Ok(all) => cache.write().await.replace_all(all),
                        Err(e) => warn!(error = %e, "refresh after lag failed"),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    Ok(FeedHandle { task })
}
