use super::storage::RecordCache;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

/// Periodic eviction for one name server's cache.
///
/// Holds only a weak reference: the task ends on the first tick after the
/// owning name server is dropped.
pub struct CacheJanitor {
    cache: Weak<RecordCache>,
    interval: Duration,
}

impl CacheJanitor {
    pub fn new(cache: &Arc<RecordCache>) -> Self {
        Self {
            interval: cache.cleanup_interval(),
            cache: Arc::downgrade(cache),
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "Cache janitor started"
            );

            loop {
                sleep(self.interval).await;
                let Some(cache) = self.cache.upgrade() else {
                    debug!("Cache janitor stopping, cache dropped");
                    break;
                };
                cache.cleanup();
            }
        })
    }
}
