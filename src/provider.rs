use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::cache::{Clock, ProviderCache, SystemClock};
use crate::config::{validate_path_segment, ProviderConfig};
use crate::error::{Error, NameKind, Result};
use crate::flag_state::FlagState;
use crate::store::{ParameterStore, StoreError};

/// FlagProvider resolves a flag name to its current [FlagState].
///
/// Providers isolate evaluation from where and how flag configuration is stored. They must be
/// safe to share between threads.
pub trait FlagProvider: Send + Sync {
    /// Returns the state of `flag_name`.
    ///
    /// A flag that has never been configured is not an error; it resolves to
    /// [FlagState::unset].
    fn get_state(&self, flag_name: &str) -> Result<FlagState>;
}

/// A [FlagProvider] backed by a [ParameterStore], one instance per application.
///
/// Each flag is stored as two JSON-encoded parameters:
///
/// ```text
/// /applications/<application_name>/flags/<flag_name>/enabled   true | false | null
/// /applications/<application_name>/flags/<flag_name>/context   ["id", ...] | null
/// ```
///
/// Resolved states are cached for the configured TTL. Errors are never cached.
pub struct ParameterStoreProvider {
    config: ProviderConfig,
    store: Arc<dyn ParameterStore>,
    cache: ProviderCache,
}

impl ParameterStoreProvider {
    pub fn new(config: ProviderConfig, store: Arc<dyn ParameterStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Like [ParameterStoreProvider::new], aging cache entries against `clock`.
    pub fn with_clock(
        config: ProviderConfig,
        store: Arc<dyn ParameterStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = ProviderCache::new(config.cache_ttl(), clock);
        Self {
            config,
            store,
            cache,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn cache(&self) -> &ProviderCache {
        &self.cache
    }

    /// Forget the cached state of `flag_name`. Returns whether anything was cached.
    pub fn invalidate(&self, flag_name: &str) -> bool {
        self.cache.invalidate(flag_name)
    }

    pub fn clear_cache(&self) {
        self.cache.clear()
    }

    fn unavailable(&self, flag_name: &str, source: StoreError) -> Error {
        warn!(
            "parameter store unavailable for flag {} of {}: {}",
            flag_name,
            self.config.application_name(),
            source
        );
        Error::ProviderUnavailable {
            flag: flag_name.to_string(),
            source,
        }
    }

    fn fetch(&self, flag_name: &str) -> Result<FlagState> {
        let enabled_path = self.config.enabled_path(flag_name);
        let context_path = self.config.context_path(flag_name);
        let timeout = self.config.timeout();

        let (enabled, context) = if self.config.batch() && self.store.supports_batch() {
            let paths = vec![enabled_path.clone(), context_path.clone()];
            debug!("fetching {}", paths.iter().join(", "));
            let mut values: HashMap<String, Option<String>> = self
                .store
                .get_parameters(&paths, timeout)
                .map_err(|e| self.unavailable(flag_name, e))?;
            let mut take = |path: &str| {
                values.remove(path).ok_or_else(|| {
                    self.unavailable(
                        flag_name,
                        StoreError::Transport {
                            path: path.to_string(),
                            message: "batch response is missing the requested path".to_string(),
                        },
                    )
                })
            };
            (take(enabled_path.as_str())?, take(context_path.as_str())?)
        } else {
            debug!("fetching {} and {}", enabled_path, context_path);
            let enabled = self
                .store
                .get_parameter(&enabled_path, timeout)
                .map_err(|e| self.unavailable(flag_name, e))?;
            let context = self
                .store
                .get_parameter(&context_path, timeout)
                .map_err(|e| self.unavailable(flag_name, e))?;
            (enabled, context)
        };

        FlagState::decode(
            flag_name,
            &enabled_path,
            enabled.as_deref(),
            &context_path,
            context.as_deref(),
        )
    }
}

impl FlagProvider for ParameterStoreProvider {
    fn get_state(&self, flag_name: &str) -> Result<FlagState> {
        validate_path_segment(NameKind::Flag, flag_name)?;

        if let Some(state) = self.cache.get_fresh(flag_name) {
            debug!("cache hit for flag {}", flag_name);
            return Ok(FlagState::clone(&state));
        }

        debug!("cache miss for flag {}", flag_name);
        let state = self.fetch(flag_name)?;
        Ok(FlagState::clone(&self.cache.insert(flag_name, state)))
    }
}

impl std::fmt::Debug for ParameterStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStoreProvider")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish()
    }
}

/// A [FlagProvider] holding flag states in memory.
///
/// Intended for tests and local development. Unknown flags resolve to [FlagState::unset].
#[derive(Debug, Default)]
pub struct InMemoryFlagProvider {
    flags: RwLock<HashMap<String, FlagState>>,
}

impl InMemoryFlagProvider {
    pub fn new(flags: HashMap<String, FlagState>) -> Self {
        Self {
            flags: RwLock::new(flags),
        }
    }

    /// Replace the state of `flag_name`.
    pub fn set(&self, flag_name: impl Into<String>, state: FlagState) {
        self.flags.write().insert(flag_name.into(), state);
    }

    pub fn remove(&self, flag_name: &str) -> Option<FlagState> {
        self.flags.write().remove(flag_name)
    }
}

impl FlagProvider for InMemoryFlagProvider {
    fn get_state(&self, flag_name: &str) -> Result<FlagState> {
        Ok(self
            .flags
            .read()
            .get(flag_name)
            .cloned()
            .unwrap_or_default())
    }
}
