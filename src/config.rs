use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, NameKind, Result};

lazy_static! {
    static ref PATH_SEGMENT_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.\-]+$").unwrap();
}

/// The leading path segment every flag lives under unless configured otherwise.
pub const DEFAULT_PREFIX: &str = "applications";
/// How long a fetched flag state is served from cache.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);
/// How long a single store request may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Checks that `name` can be used as one segment of a parameter path.
pub(crate) fn validate_path_segment(kind: NameKind, name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.contains('/') {
        "must not contain '/'"
    } else if !PATH_SEGMENT_REGEX.is_match(name) {
        "may only contain letters, digits, '_', '.' and '-'"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Settings for one application's flags in the parameter store.
///
/// Flags live at `/<prefix>/<application_name>/flags/<flag_name>/{enabled,context}`. Build one with
/// [ProviderConfigBuilder].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    application_name: String,
    prefix: String,
    cache_ttl: Duration,
    timeout: Duration,
    batch: bool,
}

impl ProviderConfig {
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// How long a cached state stays fresh. Zero means every read goes to the store.
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether to prefer one multi-get over two single reads.
    pub fn batch(&self) -> bool {
        self.batch
    }

    /// `/<prefix>/<application>/flags/<flag>`
    pub fn flag_path(&self, flag_name: &str) -> String {
        format!(
            "/{}/{}/flags/{}",
            self.prefix, self.application_name, flag_name
        )
    }

    pub fn enabled_path(&self, flag_name: &str) -> String {
        format!("{}/enabled", self.flag_path(flag_name))
    }

    pub fn context_path(&self, flag_name: &str) -> String {
        format!("{}/context", self.flag_path(flag_name))
    }
}

/// Contains methods for configuring a [ProviderConfig].
///
/// Only the application name is required; every other setting has a default.
#[derive(Clone, Debug)]
pub struct ProviderConfigBuilder {
    application_name: String,
    prefix: String,
    cache_ttl: Duration,
    timeout: Duration,
    batch: bool,
}

impl ProviderConfigBuilder {
    /// Create a new builder for flags belonging to `application_name`.
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_TIMEOUT,
            batch: true,
        }
    }

    /// Sets the leading path segment. Defaults to [DEFAULT_PREFIX].
    pub fn prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets how long fetched states are reused. `Duration::ZERO` disables caching.
    pub fn cache_ttl(&mut self, ttl: Duration) -> &mut Self {
        self.cache_ttl = ttl;
        self
    }

    /// Disables caching; every evaluation reads the store.
    pub fn no_cache(&mut self) -> &mut Self {
        self.cache_ttl(Duration::ZERO)
    }

    /// Sets the timeout handed to the store on every request.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets whether both parameters of a flag are read in a single request when the store
    /// supports it.
    pub fn batch(&mut self, batch: bool) -> &mut Self {
        self.batch = batch;
        self
    }

    /// Creates a config from the current builder's properties.
    ///
    /// Fails if the application name or prefix cannot form a parameter path.
    pub fn build(&self) -> Result<ProviderConfig> {
        validate_path_segment(NameKind::Application, &self.application_name)?;
        validate_path_segment(NameKind::Prefix, &self.prefix)?;

        Ok(ProviderConfig {
            application_name: self.application_name.clone(),
            prefix: self.prefix.clone(),
            cache_ttl: self.cache_ttl,
            timeout: self.timeout,
            batch: self.batch,
        })
    }
}
