pub mod janitor;
pub mod record;
pub mod storage;

pub use janitor::CacheJanitor;
pub use record::{DomainRecord, IpRecord};
pub use storage::{CacheLookup, CleanupStats, PendingRequest, RecordCache};
