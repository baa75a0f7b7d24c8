//! Round-robin address selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::discovery::ServiceDirectory;

/// Resolves a logical service name to one concrete address.
///
/// Keeps one cursor per service name. The cursor only moves forward and
/// wraps to zero instead of overflowing, so the index is never out of range.
#[derive(Debug)]
pub struct AddressResolver {
    directory: Arc<dyn ServiceDirectory>,
    cursors: DashMap<String, AtomicUsize>,
}

impl AddressResolver {
    pub fn new(directory: Arc<dyn ServiceDirectory>) -> Self {
        Self {
            directory,
            cursors: DashMap::new(),
        }
    }

    /// Pick the next address for `service`, or `None` if it has no addresses.
    pub fn resolve(&self, service: &str) -> Option<String> {
        let addresses = self.directory.addresses(service);
        if addresses.is_empty() {
            tracing::debug!(service_id = %service, "No addresses known for service");
            return None;
        }

        let ticket = self.next_ticket(service);
        let index = ticket % addresses.len();
        addresses.into_iter().nth(index)
    }

    /// Advance the service cursor and return the value it held.
    fn next_ticket(&self, service: &str) -> usize {
        let advance = |cursor: &AtomicUsize| {
            match cursor.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.checked_add(1).unwrap_or(0))
            }) {
                Ok(prev) | Err(prev) => prev,
            }
        };

        if let Some(cursor) = self.cursors.get(service) {
            return advance(cursor.value());
        }
        let cursor = self.cursors.entry(service.to_string()).or_default();
        advance(cursor.value())
    }

    #[cfg(test)]
    fn seed_cursor(&self, service: &str, value: usize) {
        self.cursors
            .insert(service.to_string(), AtomicUsize::new(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::StaticDirectory;
    use std::collections::HashMap;

    fn resolver_with(addresses: &[&str]) -> (AddressResolver, StaticDirectory) {
        let dir = StaticDirectory::new();
        dir.set_addresses("svc", addresses.iter().copied());
        (AddressResolver::new(Arc::new(dir.clone())), dir)
    }

    fn tally(resolver: &AddressResolver, n: usize) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for _ in 0..n {
            let addr = resolver.resolve("svc").unwrap();
            *counts.entry(addr).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_round_robin() {
        let (lb, _) = resolver_with(&["http://a:1", "http://b:1"]);

        assert_eq!(lb.resolve("svc").unwrap(), "http://a:1");
        assert_eq!(lb.resolve("svc").unwrap(), "http://b:1");
        assert_eq!(lb.resolve("svc").unwrap(), "http://a:1");
    }

    #[test]
    fn test_unknown_or_empty_service() {
        let (lb, dir) = resolver_with(&[]);
        assert!(lb.resolve("svc").is_none());
        assert!(lb.resolve("missing").is_none());

        dir.set_addresses("svc", ["http://a:1"]);
        assert_eq!(lb.resolve("svc").unwrap(), "http://a:1");
    }

    #[test]
    fn test_balanced_distribution() {
        let (lb, _) = resolver_with(&["http://a:1", "http://b:1", "http://c:1"]);
        let counts = tally(&lb, 300);
        assert_eq!(counts.len(), 3);
        assert!(counts.values().all(|&c| c == 100));
    }

    #[test]
    fn test_single_address() {
        let (lb, _) = resolver_with(&["http://only:1"]);
        let counts = tally(&lb, 50);
        assert_eq!(counts["http://only:1"], 50);
    }

    #[test]
    fn test_cursor_wraps_to_zero() {
        let (lb, _) = resolver_with(&["http://a:1", "http://b:1"]);
        lb.seed_cursor("svc", usize::MAX - 1);

        // MAX-1 and MAX are both used, then the cursor restarts at zero.
        lb.resolve("svc").unwrap();
        lb.resolve("svc").unwrap();
        assert_eq!(lb.resolve("svc").unwrap(), "http://a:1");
        assert_eq!(lb.resolve("svc").unwrap(), "http://b:1");
    }

    #[test]
    fn test_balanced_across_wraps() {
        let (lb, _) = resolver_with(&["http://a:1", "http://b:1"]);
        for _ in 0..3 {
            // Restart just before the wrap point on an even boundary.
            lb.seed_cursor("svc", usize::MAX - 9);
            let counts = tally(&lb, 20);
            let a = counts["http://a:1"];
            let b = counts["http://b:1"];
            assert!(a.abs_diff(b) <= 2, "a={} b={}", a, b);
        }
    }

    #[test]
    fn test_cursors_are_per_service() {
        let dir = StaticDirectory::new();
        dir.set_addresses("x", ["http://x1:1", "http://x2:1"]);
        dir.set_addresses("y", ["http://y1:1", "http://y2:1"]);
        let lb = AddressResolver::new(Arc::new(dir));

        assert_eq!(lb.resolve("x").unwrap(), "http://x1:1");
        assert_eq!(lb.resolve("y").unwrap(), "http://y1:1");
        assert_eq!(lb.resolve("x").unwrap(), "http://x2:1");
    }
}
