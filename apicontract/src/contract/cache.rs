//! In-process cache of parsed contract files.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use super::model::Contract;

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Loads answered from memory.
    pub hits: u64,
    /// Loads of a path with no cached entry.
    pub misses: u64,
    /// Loads that found a changed file and re-parsed it.
    pub reloads: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    contract: Contract,
    source_mtime: SystemTime,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<PathBuf, CacheEntry>,
    stats: CacheStats,
}

/// Contracts keyed by file path and invalidated by modification time.
///
/// The cache is process-local; nothing is shared across processes.
#[derive(Debug, Default)]
pub struct ContractCache {
    state: Mutex<CacheState>,
}

impl ContractCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the contract stored at `path`.
    ///
    /// Served from memory when the file's mtime is unchanged, otherwise
    /// re-read and re-parsed. A missing or malformed file yields `None` and
    /// evicts any cached entry.
    pub fn load(&self, path: &Path) -> Option<Contract> {
        let mut state = self.state.lock();

        let mtime = match std::fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "Contract file unavailable");
                state.entries.remove(path);
                return None;
            }
        };

        let previous = state.entries.get(path).map(|entry| entry.source_mtime);
        if previous == Some(mtime) {
            state.stats.hits += 1;
            return state.entries.get(path).map(|entry| entry.contract.clone());
        }

        if previous.is_some() {
            state.stats.reloads += 1;
        } else {
            state.stats.misses += 1;
        }

        let parsed = std::fs::read(path)
            .map_err(|err| err.to_string())
            .and_then(|bytes| Contract::from_slice(&bytes).map_err(|err| err.to_string()));

        match parsed {
            Ok(contract) => {
                debug!(path = %path.display(), routes = contract.len(), "Contract cached");
                state.entries.insert(
                    path.to_path_buf(),
                    CacheEntry {
                        contract: contract.clone(),
                        source_mtime: mtime,
                    },
                );
                Some(contract)
            }
            Err(reason) => {
                warn!(path = %path.display(), %reason, "Ignoring unreadable contract file");
                state.entries.remove(path);
                None
            }
        }
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit, miss and reload counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}
