/// Compiled-view cache
///
/// Statement preparation reads compiled views from many threads while schema
/// import is the only writer. Readers take a snapshot (`Arc` clone of the
/// whole map) under a short read lock and never see a half-published import:
/// import builds the complete new map and swaps it in with one write.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::info;

use super::sql_compiler::{CompiledView, CompiledViewMap};
use crate::schema_catalog::ClassId;

pub struct CompiledViewCache {
    snapshot: RwLock<Arc<CompiledViewMap>>,
    /// Metrics
    hits: AtomicU64,
    misses: AtomicU64,
    publishes: AtomicU64,
}

impl Default for CompiledViewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledViewCache {
    pub fn new() -> Self {
        CompiledViewCache {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            publishes: AtomicU64::new(0),
        }
    }

    /// Compiled view for `class_id`. A miss means the class is not view
    /// backed (or its view is invalid).
    pub fn get(&self, class_id: ClassId) -> Option<Arc<CompiledView>> {
        let found = self.snapshot().get(&class_id).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Current map; stays valid (and unchanged) after a later publish.
    pub fn snapshot(&self) -> Arc<CompiledViewMap> {
        self.snapshot.read().unwrap().clone()
    }

    /// Replace the whole map.
    pub fn publish(&self, views: CompiledViewMap) {
        let count = views.len();
        *self.snapshot.write().unwrap() = Arc::new(views);
        self.publishes.fetch_add(1, Ordering::Relaxed);
        info!("Published {} compiled view(s)", count);
    }

    pub fn clear(&self) {
        self.publish(HashMap::new());
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> ViewCacheMetrics {
        ViewCacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct ViewCacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub publishes: u64,
    pub size: usize,
}

impl ViewCacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
