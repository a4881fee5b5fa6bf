use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::flag_state::FlagState;

/// Clock supplies the timestamps cache entries are aged against.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    state: Arc<FlagState>,
    fetched_at: DateTime<Utc>,
}

/// ProviderCache maps flag names to the last state fetched for them.
///
/// Entries are immutable snapshots replaced whole under the write lock, so a reader sees either
/// the previous or the next state, never a mix. Entries are only ever replaced on refresh; the
/// number of entries is bounded by the number of distinct flags.
pub struct ProviderCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ProviderCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Caching is disabled when the TTL is zero.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Returns the cached state for `flag_name` if it was fetched less than one TTL ago.
    pub fn get_fresh(&self, flag_name: &str) -> Option<Arc<FlagState>> {
        if !self.is_enabled() {
            return None;
        }

        let now = self.clock.now();
        let entries = self.entries.read();
        let entry = entries.get(flag_name)?;

        // A clock that went backwards yields a negative age; such entries count as expired.
        match now.signed_duration_since(entry.fetched_at).to_std() {
            Ok(age) if age < self.ttl => Some(Arc::clone(&entry.state)),
            _ => None,
        }
    }

    /// Records `state` as the latest value of `flag_name`, stamped with the current time.
    pub fn insert(&self, flag_name: &str, state: FlagState) -> Arc<FlagState> {
        let state = Arc::new(state);
        if self.is_enabled() {
            let entry = CacheEntry {
                state: Arc::clone(&state),
                fetched_at: self.clock.now(),
            };
            self.entries.write().insert(flag_name.to_string(), entry);
        }
        state
    }

    /// Drops the entry for `flag_name`, forcing the next read to refetch.
    pub fn invalidate(&self, flag_name: &str) -> bool {
        self.entries.write().remove(flag_name).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}
