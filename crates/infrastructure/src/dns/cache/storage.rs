use super::record::{DomainRecord, IpRecord};
use crate::dns::events::{NotificationBus, Subscription};
use ferrous_resolver_domain::{DomainError, IpOption};
use hickory_proto::rr::RecordType;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

/// A query that has been sent and not yet answered.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub domain: String,
    pub record_types: SmallVec<[RecordType; 2]>,
    pub sent_at: Instant,
    pub deadline: Instant,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Vec<IpAddr>),
    /// The upstream answered with a failure code.
    Failed(DomainError),
    /// Every requested family was answered, none with addresses.
    Empty,
    /// At least one requested family has no usable record yet.
    Miss,
}

impl CacheLookup {
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    pub fn into_result(self) -> Result<Vec<IpAddr>, DomainError> {
        match self {
            Self::Hit(ips) => Ok(ips),
            Self::Failed(e) => Err(e),
            Self::Empty | Self::Miss => Err(DomainError::RecordNotFound),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupStats {
    pub records_removed: usize,
    pub domains_removed: usize,
    pub pending_removed: usize,
}

struct CacheState {
    records: FxHashMap<String, DomainRecord>,
    pending: FxHashMap<u16, PendingRequest>,
    last_cleanup: Instant,
}

/// Answers and in-flight requests of one name server.
///
/// Keys are fully-qualified names. A single lock guards both maps and is
/// never held across an await point.
pub struct RecordCache {
    name: String,
    state: RwLock<CacheState>,
    bus: NotificationBus<RecordType>,
    cleanup_interval: Duration,
}

impl RecordCache {
    pub fn new(name: impl Into<String>, cleanup_interval: Duration) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CacheState {
                records: FxHashMap::default(),
                pending: FxHashMap::default(),
                last_cleanup: Instant::now(),
            }),
            bus: NotificationBus::new(),
            cleanup_interval,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    pub fn get(&self, domain: &str, option: IpOption) -> Result<Vec<IpAddr>, DomainError> {
        self.get_at(domain, option, Instant::now())
    }

    /// Unexpired addresses for the requested families, AAAA first.
    ///
    /// Success of either family is enough. With no addresses at all, a
    /// failure code from either family wins over `RecordNotFound`.
    pub fn get_at(
        &self,
        domain: &str,
        option: IpOption,
        now: Instant,
    ) -> Result<Vec<IpAddr>, DomainError> {
        self.lookup_at(domain, option, now).into_result()
    }

    pub fn lookup(&self, domain: &str, option: IpOption) -> CacheLookup {
        self.lookup_at(domain, option, Instant::now())
    }

    /// Like [`get_at`](Self::get_at) but tells an answered-empty domain
    /// apart from one still waiting for an answer.
    pub fn lookup_at(&self, domain: &str, option: IpOption, now: Instant) -> CacheLookup {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let Some(record) = state.records.get(domain) else {
            return CacheLookup::Miss;
        };

        let mut wanted: SmallVec<[Option<&IpRecord>; 2]> = SmallVec::new();
        if option.ipv6_enabled {
            wanted.push(record.aaaa.as_ref().filter(|r| !r.is_expired(now)));
        }
        if option.ipv4_enabled {
            wanted.push(record.a.as_ref().filter(|r| !r.is_expired(now)));
        }

        let mut ips = Vec::new();
        let mut failure = None;
        let mut answered = !wanted.is_empty();
        for slot in wanted {
            let Some(rec) = slot else {
                answered = false;
                continue;
            };
            match rec.addresses() {
                Ok(addrs) => ips.extend_from_slice(addrs),
                Err(DomainError::RecordNotFound) => {}
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match (ips.is_empty(), failure) {
            (false, _) => CacheLookup::Hit(ips),
            (true, Some(e)) => CacheLookup::Failed(e),
            (true, None) if answered => CacheLookup::Empty,
            (true, None) => CacheLookup::Miss,
        }
    }

    pub fn update(&self, domain: &str, record_type: RecordType, record: IpRecord) -> bool {
        self.update_at(domain, record_type, record, Instant::now())
    }

    /// Store `record` if it outlives the current one for `domain`/`record_type`.
    /// Records already expired at `now` are dropped.
    ///
    /// A stored record wakes subscribers of `domain`. Returns whether it was stored.
    pub fn update_at(
        &self,
        domain: &str,
        record_type: RecordType,
        record: IpRecord,
        now: Instant,
    ) -> bool {
        if !matches!(record_type, RecordType::A | RecordType::AAAA) || record.is_expired(now) {
            return false;
        }

        let run_cleanup = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let entry = state.records.entry(domain.to_string()).or_default();
            let Some(slot) = entry.slot_mut(record_type) else {
                return false;
            };
            if slot.as_ref().is_some_and(|current| current.expire >= record.expire) {
                return false;
            }

            debug!(
                server = %self.name,
                domain = %domain,
                record_type = %record_type,
                addresses = record.ips.len(),
                rcode = %record.rcode,
                "Cache updated"
            );
            *slot = Some(record);

            let due = now.saturating_duration_since(state.last_cleanup) >= self.cleanup_interval;
            if due {
                state.last_cleanup = now;
            }
            due
        };

        self.bus.publish(domain, record_type);
        if run_cleanup {
            self.cleanup_at(now);
        }
        true
    }

    /// Register interest in updates to `domain`.
    pub fn subscribe(&self, domain: &str) -> Subscription<RecordType> {
        self.bus.subscribe(domain)
    }

    /// Track an outgoing request. Returns false if `id` is already in flight.
    pub fn insert_pending(&self, id: u16, request: PendingRequest) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.pending.contains_key(&id) {
            return false;
        }
        state.pending.insert(id, request);
        true
    }

    /// Claim the request for a response id. Unknown ids yield `None`.
    pub fn take_pending(&self, id: u16) -> Option<PendingRequest> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .remove(&id)
    }

    pub fn is_pending(&self, id: u16) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .contains_key(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }

    /// Number of domains with at least one stored answer.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cleanup(&self) -> CleanupStats {
        self.cleanup_at(Instant::now())
    }

    /// Drop expired answers, empty domains and requests past their deadline.
    pub fn cleanup_at(&self, now: Instant) -> CleanupStats {
        let mut stats = CleanupStats::default();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        state.records.retain(|_, record| {
            let before = record.a.is_some() as usize + record.aaaa.is_some() as usize;
            let empty = record.purge_expired(now);
            let after = record.a.is_some() as usize + record.aaaa.is_some() as usize;
            stats.records_removed += before - after;
            if empty {
                stats.domains_removed += 1;
            }
            !empty
        });

        let before = state.pending.len();
        state.pending.retain(|_, request| request.deadline > now);
        stats.pending_removed = before - state.pending.len();
        state.last_cleanup = now;

        if stats != CleanupStats::default() {
            debug!(
                server = %self.name,
                records = stats.records_removed,
                domains = stats.domains_removed,
                pending = stats.pending_removed,
                "Cache cleanup"
            );
        }
        stats
    }
}
