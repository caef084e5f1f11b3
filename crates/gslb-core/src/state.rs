//! In-memory origin state store
//!
//! One entry per origin, keyed by `(zone, name, record type)`. Entries live
//! for the process lifetime; each origin's reconciliation worker is the sole
//! writer for its own entry, while notifications and one-shot reporting read
//! the post-cycle snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::{OriginConfig, RecordType};

/// Identity of one managed origin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginKey {
    /// Zone name
    pub zone_name: String,
    /// Record name
    pub name: String,
    /// Record type
    pub record_type: RecordType,
}

impl OriginKey {
    /// Build the key for a configured origin
    pub fn for_origin(origin: &OriginConfig) -> Self {
        Self {
            zone_name: origin.zone_name.clone(),
            name: origin.name.clone(),
            record_type: origin.record_type,
        }
    }
}

impl std::fmt::Display for OriginKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.zone_name, self.name, self.record_type)
    }
}

/// Last observed reconciliation state for one origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginState {
    /// Priority level currently served; meaningful only when `initialized`
    pub current_priority: i64,
    /// Record contents currently served
    pub current_ips: Vec<String>,
    /// Whether a cycle has established the served priority yet
    pub initialized: bool,
    /// When the origin was last checked
    pub last_check: Option<DateTime<Utc>>,
}

/// Thread-safe store of per-origin state
///
/// Reads and writes are serialized under a readers/writer lock. The store is
/// cheap to clone; clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct OriginStateStore {
    inner: Arc<RwLock<HashMap<OriginKey, OriginState>>>,
}

impl OriginStateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure an entry exists for `key` without touching existing state
    pub async fn register(&self, key: &OriginKey) {
        let mut guard = self.inner.write().await;
        guard.entry(key.clone()).or_default();
    }

    /// Snapshot of the state for `key`
    pub async fn get(&self, key: &OriginKey) -> Option<OriginState> {
        let guard = self.inner.read().await;
        guard.get(key).cloned()
    }

    /// Record the outcome of a cycle.
    ///
    /// The served IPs and check timestamp are always updated. The priority
    /// only advances when `initialized` is true, so a cycle that could not
    /// establish a priority does not invent one.
    pub async fn update(
        &self,
        key: &OriginKey,
        priority: i64,
        ips: Vec<String>,
        initialized: bool,
    ) {
        let mut guard = self.inner.write().await;
        let state = guard.entry(key.clone()).or_default();

        if initialized {
            state.current_priority = priority;
            state.initialized = true;
        }
        state.current_ips = ips;
        state.last_check = Some(Utc::now());
    }

    /// Number of registered origins
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store has no entries
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
