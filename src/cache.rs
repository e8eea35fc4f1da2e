//! Build-or-load cache for finished graphs
//!
//! A `GraphCache` is an explicit handle passed to whoever needs it; there is
//! no process-wide instance. Graphs are kept in an LRU map keyed by a
//! caller-chosen build key and, when a directory is configured, persisted
//! as `<key>.json` so later processes can skip the scan.

use crate::error::GraphBuildResult;
use crate::graph::CooccurrenceGraph;
use lru::LruCache;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Default number of graphs kept in memory
pub const DEFAULT_CACHE_CAPACITY: usize = 8;

pub struct GraphCache {
    /// `None` when the capacity is zero: every lookup builds
    entries: Mutex<Option<LruCache<String, Arc<CooccurrenceGraph>>>>,
    dir: Option<PathBuf>,
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("len", &self.len())
            .field("dir", &self.dir)
            .finish()
    }
}

impl GraphCache {
    /// In-memory cache holding at most `capacity` graphs
    pub fn new(capacity: usize) -> Self {
        GraphCache {
            entries: Mutex::new(NonZeroUsize::new(capacity).map(LruCache::new)),
            dir: None,
        }
    }

    /// Also persist graphs under `dir`
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    fn lock(&self) -> MutexGuard<'_, Option<LruCache<String, Arc<CooccurrenceGraph>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// On-disk location for `key`, if a directory is configured
    pub fn path_for(&self, key: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", utf8_percent_encode(key, NON_ALPHANUMERIC))))
    }

    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, |c| c.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached graph for `key`, from memory or disk
    pub fn get(&self, key: &str) -> GraphBuildResult<Option<Arc<CooccurrenceGraph>>> {
        if let Some(graph) = self.lock().as_mut().and_then(|c| c.get(key).cloned()) {
            debug!("Graph cache hit: {}", key);
            return Ok(Some(graph));
        }
        match self.path_for(key) {
            Some(path) if path.exists() => {
                let graph = Arc::new(CooccurrenceGraph::read_json(&path)?);
                info!(
                    "Loaded graph from cache: {} nodes, {} edges ({})",
                    graph.node_count(),
                    graph.edge_count(),
                    path.display()
                );
                self.remember(key, graph.clone());
                Ok(Some(graph))
            }
            _ => Ok(None),
        }
    }

    /// Return the cached graph for `key`, building and storing it on a miss
    ///
    /// The lock is not held while `build` runs, so two callers racing on the
    /// same key may both build; the last one stored wins.
    pub fn load_or_build<F>(&self, key: &str, build: F) -> GraphBuildResult<Arc<CooccurrenceGraph>>
    where
        F: FnOnce() -> GraphBuildResult<CooccurrenceGraph>,
    {
        if let Some(graph) = self.get(key)? {
            return Ok(graph);
        }
        info!("Building graph for cache key {}", key);
        let graph = Arc::new(build()?);
        if let Some(path) = self.path_for(key) {
            graph.write_json(&path)?;
            info!("Cached graph -> {}", path.display());
        }
        self.remember(key, graph.clone());
        Ok(graph)
    }

    fn remember(&self, key: &str, graph: Arc<CooccurrenceGraph>) {
        if let Some(cache) = self.lock().as_mut() {
            cache.put(key.to_string(), graph);
        }
    }

    /// Forget `key` in memory and on disk; returns whether anything was removed
    pub fn invalidate(&self, key: &str) -> GraphBuildResult<bool> {
        let mut removed = self.lock().as_mut().and_then(|c| c.pop(key)).is_some();
        if let Some(path) = self.path_for(key) {
            if path.exists() {
                std::fs::remove_file(&path)?;
                removed = true;
            }
        }
        if removed {
            debug!("Invalidated graph cache key {}", key);
        }
        Ok(removed)
    }

    /// Drop every in-memory entry; persisted files are left alone
    pub fn clear(&self) {
        if let Some(cache) = self.lock().as_mut() {
            cache.clear();
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}
