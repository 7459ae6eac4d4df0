//! Position-keyed hint cache.
//!
//! A bounded map from Zobrist key to the last move the search settled on for
//! that position. Purely advisory: the root driver uses it to seed move
//! ordering and refreshes it after every search. Entries carry a timestamp
//! and the cache purges oldest-first once it outgrows its cap. The cache can
//! be persisted to JSON so hints survive restarts.

use crate::defs::Square;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default entry cap before the oldest entries are purged.
pub const DEFAULT_CAPACITY: usize = 5000;

/// Milliseconds since the Unix epoch, for LRU ordering and sample rows.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HintEntry {
    pub from: Square,
    pub to: Square,
    pub score: i32,
    pub depth: u8,
    pub tag: String,
    pub timestamp: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HintCache {
    entries: HashMap<u64, HintEntry>,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl HintCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        HintCache {
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a hint at sufficient depth.
    pub fn probe(&self, key: u64, min_depth: u8) -> Option<&HintEntry> {
        self.entries.get(&key).filter(|e| e.depth >= min_depth)
    }

    /// Insert or refresh an entry, purging oldest-by-timestamp entries when
    /// the cap is exceeded.
    pub fn store(&mut self, key: u64, entry: HintEntry) {
        self.entries.insert(key, entry);
        if self.entries.len() > self.capacity {
            self.purge_oldest(self.entries.len() - self.capacity);
        }
    }

    fn purge_oldest(&mut self, excess: usize) {
        let mut stamped: Vec<(u64, u64)> = self
            .entries
            .iter()
            .map(|(&k, e)| (e.timestamp, k))
            .collect();
        stamped.sort_unstable();
        for &(_, key) in stamped.iter().take(excess) {
            self.entries.remove(&key);
        }
    }

    /// Persist the cache as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string(self).context("failed to serialize hint cache")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("failed to write {}", path.as_ref().display()))?;
        Ok(())
    }

    /// Load a previously saved cache.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        serde_json::from_str(&text).context("failed to parse hint cache JSON")
    }
}
