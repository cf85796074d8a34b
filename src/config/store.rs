//! Current known-good remote configuration.
//!
//! # Responsibilities
//! - Hold the active `RemoteConfig` for lock-free reads
//! - Swap in new configs only after they fully decode
//!
//! # Design Decisions
//! - `ArcSwap` so readers never block writers
//! - A rejected payload leaves the previous config in place

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::remote::{decode, DecodeError, RemoteConfig};
use crate::observability::metrics;

/// Shared holder of the active configuration.
#[derive(Debug)]
pub struct ConfigStore {
    current: ArcSwap<RemoteConfig>,
    generation: AtomicU64,
}

impl ConfigStore {
    pub fn new(initial: RemoteConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the active configuration.
    pub fn current(&self) -> Arc<RemoteConfig> {
        self.current.load_full()
    }

    /// Number of configurations applied since creation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Install an already validated configuration.
    pub fn replace(&self, config: RemoteConfig) -> u64 {
        let rules = config.ingress.len();
        self.current.store(Arc::new(config));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        metrics::record_config_applied();
        tracing::info!(generation, rules, "Configuration applied");
        generation
    }

    /// Decode `payload` and install it. On failure the previous config stays active.
    pub fn apply_payload(&self, payload: &[u8]) -> Result<u64, DecodeError> {
        match decode(payload) {
            Ok(config) => Ok(self.replace(config)),
            Err(e) => {
                metrics::record_config_rejected();
                tracing::error!(
                    error = %e,
                    generation = self.generation(),
                    "Rejected remote configuration, keeping current configuration"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &[u8] = br#"{"ingress": [
        {"hostname": "a.example.com", "service": "http://localhost:8000"},
        {"service": "http_status:404"}
    ]}"#;

    #[test]
    fn test_apply_payload_swaps_config() {
        let store = ConfigStore::new(decode(b"{}").unwrap());
        assert_eq!(store.generation(), 0);
        assert!(store.current().ingress.is_empty());

        assert_eq!(store.apply_payload(GOOD).unwrap(), 1);
        assert_eq!(store.current().ingress.len(), 2);
    }

    #[test]
    fn test_rejected_payload_keeps_previous() {
        let store = ConfigStore::new(decode(GOOD).unwrap());
        let before = store.current();

        let bad = br#"{"ingress": [{"hostname": "a.example.com"}, {"service": "http_status:404"}]}"#;
        assert!(store.apply_payload(bad).is_err());
        assert!(store.apply_payload(b"garbage").is_err());

        assert_eq!(store.generation(), 0);
        assert!(Arc::ptr_eq(&before, &store.current()));
    }
}
