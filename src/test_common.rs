#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::cache::Clock;
use crate::config::{ProviderConfig, ProviderConfigBuilder};
use crate::provider::ParameterStoreProvider;
use crate::store::{InMemoryParameterStore, ParameterStore, StoreError};

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(by).unwrap();
    }

    pub fn rewind(&self, by: Duration) {
        let mut now = self.now.lock();
        *now -= chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A store that fails every request with the same error.
pub struct FailingStore {
    pub error: fn(&str) -> StoreError,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(error: fn(&str) -> StoreError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn timing_out() -> Self {
        Self::new(|path| StoreError::Timeout {
            path: path.to_string(),
            timeout: Duration::from_secs(3),
        })
    }
}

impl ParameterStore for FailingStore {
    fn get_parameter(&self, path: &str, _timeout: Duration) -> Result<Option<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.error)(path))
    }
}

/// A single-read store that records the timeout of every request and can be switched into a
/// failing mode.
#[derive(Default)]
pub struct RecordingStore {
    pub parameters: Mutex<HashMap<String, String>>,
    pub timeouts: Mutex<Vec<Duration>>,
    pub fail_with: Mutex<Option<StoreError>>,
}

impl RecordingStore {
    pub fn put(&self, path: &str, value: &str) {
        self.parameters
            .lock()
            .insert(path.to_string(), value.to_string());
    }
}

impl ParameterStore for RecordingStore {
    fn get_parameter(&self, path: &str, timeout: Duration) -> Result<Option<String>, StoreError> {
        self.timeouts.lock().push(timeout);
        if let Some(error) = self.fail_with.lock().clone() {
            return Err(error);
        }
        Ok(self.parameters.lock().get(path).cloned())
    }
}

pub fn checkout_config() -> ProviderConfig {
    ProviderConfigBuilder::new("checkout").build().unwrap()
}

/// A provider for application `checkout` over an in-memory store with a manual clock.
pub fn checkout_provider() -> (
    ParameterStoreProvider,
    Arc<InMemoryParameterStore>,
    Arc<ManualClock>,
) {
    let store = Arc::new(InMemoryParameterStore::new());
    let clock = Arc::new(ManualClock::new());
    let provider =
        ParameterStoreProvider::with_clock(checkout_config(), store.clone(), clock.clone());
    (provider, store, clock)
}

/// Writes both parameters of `flag` for application `checkout`.
pub fn put_flag(store: &InMemoryParameterStore, flag: &str, enabled: &str, context: &str) {
    let config = checkout_config();
    store.put(config.enabled_path(flag), enabled);
    store.put(config.context_path(flag), context);
}
