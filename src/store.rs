use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use thiserror::Error;

/// A failure talking to the parameter store.
///
/// These are transport-level problems: the store could not be asked, or did not answer. A
/// parameter that simply does not exist is not an error; see [ParameterStore::get_parameter].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request did not complete within the configured timeout.
    #[error("timed out after {timeout:?} reading {path}")]
    Timeout { path: String, timeout: Duration },
    /// The caller is not allowed to read the parameter.
    #[error("access denied reading {path}")]
    AccessDenied { path: String },
    /// The in-flight request was cancelled before it produced a value.
    #[error("request for {path} was cancelled")]
    Cancelled { path: String },
    /// Any other connectivity or protocol failure reported by the client.
    #[error("transport error reading {path}: {message}")]
    Transport { path: String, message: String },
}

/// ParameterStore is the capability the provider uses to read raw values from the remote,
/// hierarchical configuration store (e.g. AWS Systems Manager Parameter Store).
///
/// Implementations own transport concerns such as credentials, retries and connection reuse.
/// Every call carries the timeout configured on the provider; an implementation should give up
/// and return [StoreError::Timeout] once it has elapsed.
pub trait ParameterStore: Send + Sync {
    /// Read a single parameter.
    ///
    /// Returns `Ok(None)` when no parameter exists at `path`.
    fn get_parameter(&self, path: &str, timeout: Duration) -> Result<Option<String>, StoreError>;

    /// Read several parameters in one request.
    ///
    /// Every requested path is present in the returned map. The default implementation falls
    /// back to one [ParameterStore::get_parameter] call per path and stops at the first error.
    fn get_parameters(
        &self,
        paths: &[String],
        timeout: Duration,
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        let mut values = HashMap::with_capacity(paths.len());
        for path in paths {
            let value = self.get_parameter(path, timeout)?;
            values.insert(path.clone(), value);
        }
        Ok(values)
    }

    /// Whether [ParameterStore::get_parameters] is a genuine multi-get rather than the
    /// per-path fallback.
    fn supports_batch(&self) -> bool {
        false
    }
}

/// A thread-safe, process-local [ParameterStore].
///
/// Useful for tests and local development where no remote store is available. It counts the
/// requests it serves so callers can observe caching behaviour.
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    parameters: RwLock<HashMap<String, String>>,
    single_reads: AtomicUsize,
    batch_reads: AtomicUsize,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite the parameter at `path`.
    pub fn put(&self, path: impl Into<String>, value: impl Into<String>) {
        self.parameters.write().insert(path.into(), value.into());
    }

    /// Delete the parameter at `path`, returning its previous value.
    pub fn remove(&self, path: &str) -> Option<String> {
        self.parameters.write().remove(path)
    }

    /// Number of [ParameterStore::get_parameter] calls served.
    pub fn single_reads(&self) -> usize {
        self.single_reads.load(Ordering::SeqCst)
    }

    /// Number of [ParameterStore::get_parameters] calls served.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    /// Total number of requests served, batched or not.
    pub fn requests(&self) -> usize {
        self.single_reads() + self.batch_reads()
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get_parameter(&self, path: &str, _timeout: Duration) -> Result<Option<String>, StoreError> {
        self.single_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.parameters.read().get(path).cloned())
    }

    fn get_parameters(
        &self,
        paths: &[String],
        _timeout: Duration,
    ) -> Result<HashMap<String, Option<String>>, StoreError> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        let parameters = self.parameters.read();
        Ok(paths
            .iter()
            .map(|path| (path.clone(), parameters.get(path).cloned()))
            .collect())
    }

    fn supports_batch(&self) -> bool {
        true
    }
}
