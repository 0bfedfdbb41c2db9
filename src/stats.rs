//! Operational counters
//!
//! Process-local diagnostic counters: path documents created, store batch
//! outcomes, and per-tenant write counts. Purely observational; nothing
//! gates behavior on them.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter registry shared across components
#[derive(Debug, Default)]
pub struct Stats {
    /// Path documents created in the search index (`index.create`)
    index_create: AtomicU64,
    /// Samples written successfully (`store.success`)
    store_success: AtomicU64,
    /// Samples that failed to write (`store.error`)
    store_error: AtomicU64,
    /// Per-tenant write counts (`tenants.<t>.write_count`)
    tenant_writes: DashMap<String, AtomicU64>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_index_create(&self, n: u64) {
        self.index_create.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_store_success(&self, n: u64) {
        self.store_success.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_store_error(&self, n: u64) {
        self.store_error.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_tenant_write(&self, tenant: &str, n: u64) {
        if let Some(counter) = self.tenant_writes.get(tenant) {
            counter.fetch_add(n, Ordering::Relaxed);
            return;
        }
        self.tenant_writes
            .entry(tenant.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(n, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            index_create: self.index_create.load(Ordering::Relaxed),
            store_success: self.store_success.load(Ordering::Relaxed),
            store_error: self.store_error.load(Ordering::Relaxed),
            tenant_writes: self
                .tenant_writes
                .iter()
                .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub index_create: u64,
    pub store_success: u64,
    pub store_error: u64,
    pub tenant_writes: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = Stats::new();
        stats.record_index_create(4);
        stats.record_store_success(100);
        stats.record_store_success(50);
        stats.record_store_error(1);
        stats.record_tenant_write("acme", 100);
        stats.record_tenant_write("acme", 50);
        stats.record_tenant_write("other", 1);

        let snap = stats.snapshot();
        assert_eq!(snap.index_create, 4);
        assert_eq!(snap.store_success, 150);
        assert_eq!(snap.store_error, 1);
        assert_eq!(snap.tenant_writes.get("acme"), Some(&150));
        assert_eq!(snap.tenant_writes.get("other"), Some(&1));
    }
}
