//! In-memory service directory.
//!
//! # Responsibilities
//! - Hold logical name → address lists loaded from configuration
//! - Allow concurrent updates (config reload, tests)
//! - Normalize addresses into base URLs (`http://host:port`, no trailing slash)

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::validation::parse_address;
use crate::discovery::ServiceDirectory;

/// A thread-safe, mutable service directory.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    inner: Arc<DashMap<String, Vec<String>>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a `service -> addresses` table.
    pub fn from_map(services: &HashMap<String, Vec<String>>) -> Self {
        let directory = Self::new();
        directory.replace_all(services);
        directory
    }

    /// Set the addresses of one service, replacing any previous list.
    /// Invalid addresses are dropped with a warning.
    pub fn set_addresses<I, S>(&self, service: &str, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized: Vec<String> = addresses
            .into_iter()
            .filter_map(|a| {
                let normalized = normalize_address(a.as_ref());
                if normalized.is_none() {
                    tracing::warn!(service = %service, address = %a.as_ref(), "Ignoring invalid service address");
                }
                normalized
            })
            .collect();
        self.inner.insert(service.to_string(), normalized);
    }

    /// Forget a service entirely.
    pub fn remove(&self, service: &str) {
        self.inner.remove(service);
    }

    /// Replace the whole directory contents.
    pub fn replace_all(&self, services: &HashMap<String, Vec<String>>) {
        self.inner.retain(|name, _| services.contains_key(name));
        for (name, addresses) in services {
            self.set_addresses(name, addresses);
        }
    }

    /// Number of known services.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no service is known.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ServiceDirectory for StaticDirectory {
    fn addresses(&self, service: &str) -> Vec<String> {
        self.inner
            .get(service)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }
}

fn normalize_address(address: &str) -> Option<String> {
    let url = parse_address(address)?;
    Some(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_addresses() {
        let dir = StaticDirectory::new();
        dir.set_addresses("users", ["10.0.0.1:8080", "http://10.0.0.2:8080/", "http://"]);

        assert_eq!(
            dir.addresses("users"),
            vec!["http://10.0.0.1:8080".to_string(), "http://10.0.0.2:8080".to_string()]
        );
        assert!(dir.addresses("unknown").is_empty());
    }

    #[test]
    fn test_replace_all_drops_stale_services() {
        let mut services = HashMap::new();
        services.insert("a".to_string(), vec!["http://a:1".to_string()]);
        services.insert("b".to_string(), vec!["http://b:1".to_string()]);
        let dir = StaticDirectory::from_map(&services);
        assert_eq!(dir.len(), 2);

        services.remove("a");
        dir.replace_all(&services);
        assert_eq!(dir.len(), 1);
        assert!(dir.addresses("a").is_empty());
        assert_eq!(dir.addresses("b"), vec!["http://b:1".to_string()]);
    }
}
