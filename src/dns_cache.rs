//! A cache for DNS records, and a tracker for recently sent queries.
//!
//! This is an internal implementation, not visible to the public API.
//! Both structs are owned exclusively by the discovery thread and need
//! no locking.

#[cfg(feature = "logging")]
use crate::log::trace;
use crate::dns_parser::{RRType, RecordData};
use std::time::{Duration, Instant};

/// How long a `(record type, name)` pair suppresses an identical query.
pub(crate) const QUERY_DEDUP_WINDOW: Duration = Duration::from_secs(5);

/// One record in the cache: the owner name, the typed payload and the
/// absolute instant at which the record expires.
#[derive(Debug, Clone)]
struct CachedRecord {
    name: String,
    data: RecordData,
    expires: Instant,
}

/// A cache for all record types consumed by the browser.
///
/// A record is identified by `(owner name, payload)`; re-inserting an
/// identical record only refreshes its expiry. Expired records are evicted
/// lazily: every read first prunes the whole cache, so no sweep timer is
/// needed.
pub(crate) struct DnsCache {
    records: Vec<CachedRecord>,
}

impl DnsCache {
    pub(crate) fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Updates a record's TTL if it already exists, otherwise inserts it.
    ///
    /// A TTL of zero is an mDNS "goodbye": any matching record is removed
    /// immediately.
    pub(crate) fn update(&mut self, now: Instant, name: &str, data: RecordData, ttl_secs: u32) {
        if ttl_secs == 0 {
            trace!("goodbye record: {} {:?}", name, &data);
            self.records
                .retain(|r| !(r.name == name && r.data == data));
            return;
        }

        let expires = now + Duration::from_secs(u64::from(ttl_secs));
        match self
            .records
            .iter_mut()
            .find(|r| r.name == name && r.data == data)
        {
            Some(existing) => existing.expires = expires,
            None => {
                trace!("new record: {} {:?} ttl {}", name, &data, ttl_secs);
                self.records.push(CachedRecord {
                    name: name.to_string(),
                    data,
                    expires,
                });
            }
        }
    }

    /// Returns the `(payload, expiry)` pairs of records owned by `name`
    /// with the requested record type.
    ///
    /// Eviction of expired records happens first and covers the entire
    /// cache, not only the matches: repeated reads keep the whole cache
    /// pruned without a separate timer.
    pub(crate) fn read(
        &mut self,
        now: Instant,
        name: &str,
        rr_type: RRType,
    ) -> Vec<(RecordData, Instant)> {
        self.records.retain(|r| r.expires > now);

        self.records
            .iter()
            .filter(|r| r.name == name && r.data.rr_type() == rr_type)
            .map(|r| (r.data.clone(), r.expires))
            .collect()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.records.len()
    }
}

/// One query we sent recently.
#[derive(Debug)]
struct PendingQuery {
    sent_at: Instant,
    rr_type: RRType,
    name: String,
}

/// Remembers the queries sent in the last few seconds so that the
/// discovery loop does not flood the network with repeats.
pub(crate) struct QueryTracker {
    pending: Vec<PendingQuery>,
}

impl QueryTracker {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Returns whether a query for `(rr_type, name)` should go out now.
    ///
    /// If yes, the pair is recorded so that an identical query within
    /// [QUERY_DEDUP_WINDOW] is suppressed.
    pub(crate) fn should_send(&mut self, now: Instant, rr_type: RRType, name: &str) -> bool {
        self.pending
            .retain(|q| now.duration_since(q.sent_at) <= QUERY_DEDUP_WINDOW);

        if self
            .pending
            .iter()
            .any(|q| q.rr_type == rr_type && q.name == name)
        {
            return false;
        }

        self.pending.push(PendingQuery {
            sent_at: now,
            rr_type,
            name: name.to_string(),
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{DnsCache, QueryTracker, QUERY_DEDUP_WINDOW};
    use crate::dns_parser::{RRType, RecordData};
    use std::net::Ipv4Addr;
    use std::time::{Duration, Instant};

    fn a_record(last_octet: u8) -> RecordData {
        RecordData::A {
            addr: Ipv4Addr::new(192, 168, 0, last_octet),
        }
    }

    #[test]
    fn test_expired_record_is_never_returned() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(now, "box.local.", a_record(9), 120);
        assert_eq!(cache.read(now, "box.local.", RRType::A).len(), 1);

        let later = now + Duration::from_secs(121);
        assert!(cache.read(later, "box.local.", RRType::A).is_empty());
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(now, "box.local.", a_record(9), 10);
        cache.update(now + Duration::from_secs(8), "box.local.", a_record(9), 10);

        // Past the original expiry but within the refreshed one.
        let later = now + Duration::from_secs(15);
        let found = cache.read(later, "box.local.", RRType::A);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, now + Duration::from_secs(18));
    }

    #[test]
    fn test_goodbye_removes_record() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(now, "box.local.", a_record(9), 120);
        cache.update(now, "box.local.", a_record(9), 0);
        assert!(cache.read(now, "box.local.", RRType::A).is_empty());

        // A goodbye for a record that was never cached is a no-op.
        cache.update(now, "other.local.", a_record(1), 0);
        assert!(cache.read(now, "other.local.", RRType::A).is_empty());
    }

    #[test]
    fn test_goodbye_matches_payload_not_just_name() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(now, "box.local.", a_record(9), 120);
        cache.update(now, "box.local.", a_record(10), 120);
        cache.update(now, "box.local.", a_record(9), 0);

        let found = cache.read(now, "box.local.", RRType::A);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, a_record(10));
    }

    #[test]
    fn test_read_evicts_the_whole_cache() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(now, "short.local.", a_record(1), 5);
        cache.update(now, "long.local.", a_record(2), 500);

        // Reading an unrelated name still prunes the expired entry.
        let later = now + Duration::from_secs(10);
        let _ = cache.read(later, "unrelated.local.", RRType::SRV);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_record_kinds_do_not_mix() {
        let mut cache = DnsCache::new();
        let now = Instant::now();

        cache.update(
            now,
            "inst._svc._tcp.local.",
            RecordData::Srv {
                hostname: "box.local.".to_string(),
                port: 9757,
            },
            120,
        );

        assert!(cache.read(now, "inst._svc._tcp.local.", RRType::A).is_empty());
        assert_eq!(cache.read(now, "inst._svc._tcp.local.", RRType::SRV).len(), 1);
    }

    #[test]
    fn test_dedup_window() {
        let mut tracker = QueryTracker::new();
        let now = Instant::now();

        assert!(tracker.should_send(now, RRType::PTR, "_svc._tcp.local."));
        assert!(!tracker.should_send(
            now + Duration::from_secs(2),
            RRType::PTR,
            "_svc._tcp.local."
        ));

        // A different name or type within the window is not suppressed.
        assert!(tracker.should_send(now, RRType::SRV, "_svc._tcp.local."));
        assert!(tracker.should_send(now, RRType::PTR, "_other._tcp.local."));

        // After the window has elapsed the query goes out again.
        let later = now + QUERY_DEDUP_WINDOW + Duration::from_secs(1);
        assert!(tracker.should_send(later, RRType::PTR, "_svc._tcp.local."));
    }
}
