use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use referral_shared::api::ReferralApi;
use referral_shared::error::ApiResult;
use referral_shared::models::Forest;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub forest: Arc<Forest>,
    pub fetched_at: DateTime<Utc>,
}

/// Read-through cache of the last forest the API returned.
///
/// The service owns the hierarchy; this only avoids refetching it until
/// something (usually a successful registration) calls `invalidate`.
/// Fetches are single-flight: concurrent `get`s wait for the one running.
#[derive(Debug)]
pub struct ForestCache {
    snapshot: Mutex<Option<Snapshot>>,
    stale: AtomicBool,
    max_age: Option<Duration>,
}

impl ForestCache {
    pub fn new(max_age: Option<std::time::Duration>) -> Self {
        Self {
            snapshot: Mutex::new(None),
            stale: AtomicBool::new(false),
            max_age: max_age.and_then(|age| Duration::from_std(age).ok()),
        }
    }

    /// Marks the cached forest as outdated. Safe to call from any thread,
    /// including while a fetch is running; the next `get` then refetches.
    pub fn invalidate(&self) {
        debug!("Forest cache invalidated");
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Returns the cached forest, fetching it first if there is none, it was
    /// invalidated or it is older than the configured maximum age.
    pub async fn get<A>(&self, api: &A) -> ApiResult<Arc<Forest>>
    where
        A: ReferralApi + ?Sized,
    {
        let mut slot = self.snapshot.lock().await;

        let stale = self.stale.swap(false, Ordering::SeqCst);
        if let Some(snapshot) = slot.as_ref() {
            if !stale && !self.expired(snapshot) {
                debug!("Forest cache hit (fetched at {})", snapshot.fetched_at);
                return Ok(Arc::clone(&snapshot.forest));
            }
        }

        let fetched = match api.fetch_tree().await {
            Ok(fetched) => fetched,
            Err(e) => {
                if stale {
                    // keep the pending invalidation for the next attempt
                    self.stale.store(true, Ordering::SeqCst);
                }
                return Err(e);
            }
        };

        let forest = match fetched {
            Some(forest) => Arc::new(forest),
            None => {
                warn!("Tree response carried no forest, keeping previous snapshot");
                slot.as_ref()
                    .map(|s| Arc::clone(&s.forest))
                    .unwrap_or_default()
            }
        };

        info!("Fetched forest with {} root(s)", forest.len());
        *slot = Some(Snapshot {
            forest: Arc::clone(&forest),
            fetched_at: Utc::now(),
        });
        Ok(forest)
    }

    /// The current snapshot without fetching.
    pub async fn peek(&self) -> Option<Snapshot> {
        self.snapshot.lock().await.clone()
    }

    fn expired(&self, snapshot: &Snapshot) -> bool {
        match self.max_age {
            Some(max_age) => Utc::now() - snapshot.fetched_at > max_age,
            None => false,
        }
    }
}

impl Default for ForestCache {
    fn default() -> Self {
        Self::new(None)
    }
}
