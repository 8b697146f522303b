use log::{debug, error};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// One in-flight validation per key.
///
/// Scheduling a check for a key aborts whatever was pending for it, waits
/// out the debounce interval and then runs the check on the tokio runtime.
/// Aborting only stops the old task at its next await point, so callers
/// must still discard stale results themselves (the form does this with a
/// per-field generation counter).
pub struct ValidationTasks<K> {
    debounce: Duration,
    pending: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K> ValidationTasks<K>
where
    K: Eq + Hash + Copy + Debug + Send + 'static,
{
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn schedule<F>(&self, key: K, check: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            if !debounce.is_zero() {
                tokio::time::sleep(debounce).await;
            }
            check.await;
        });

        if let Some(previous) = self.pending().insert(key, handle) {
            if !previous.is_finished() {
                debug!("Validation for {:?} superseded, aborting previous check", key);
            }
            previous.abort();
        }
    }

    pub fn cancel(&self, key: K) {
        if let Some(handle) = self.pending().remove(&key) {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: K) -> bool {
        self.pending()
            .get(&key)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Waits until no validation is pending, including ones scheduled while
    /// waiting.
    pub async fn settle(&self) {
        loop {
            let handles: Vec<(K, JoinHandle<()>)> = self.pending().drain().collect();
            if handles.is_empty() {
                return;
            }

            for (key, handle) in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        error!("Validation task for {:?} panicked: {}", key, e);
                    }
                }
            }
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<K, JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<K> Drop for ValidationTasks<K> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }
}
