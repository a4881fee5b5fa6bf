use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::config::validate_path_segment;
use crate::error::{NameKind, Result};
use crate::eval::{self, Detail};
use crate::flag_state::FlagState;
use crate::provider::FlagProvider;

/// FlagDefinition declares a flag at the type level, so call sites cannot misspell its name.
///
/// ```
/// use parameter_store_flags::{FeatureFlag, FlagDefinition, InMemoryFlagProvider};
/// use std::sync::Arc;
///
/// struct PartyTime;
///
/// impl FlagDefinition for PartyTime {
///     const KEY: &'static str = "party_time";
/// }
///
/// let provider = Arc::new(InMemoryFlagProvider::default());
/// let flag = FeatureFlag::of::<PartyTime>(provider).unwrap();
/// assert!(!flag.is_enabled_globally().unwrap());
/// ```
pub trait FlagDefinition {
    const KEY: &'static str;
}

/// FeatureFlag is a named flag bound to the provider that resolves its state.
///
/// It holds no mutable state and is cheap to clone; clones share the provider.
#[derive(Clone)]
pub struct FeatureFlag {
    name: String,
    provider: Arc<dyn FlagProvider>,
}

impl FeatureFlag {
    /// Bind `name` to `provider`.
    ///
    /// Fails if `name` cannot be used as a parameter path segment.
    pub fn new(name: impl Into<String>, provider: Arc<dyn FlagProvider>) -> Result<Self> {
        let name = name.into();
        validate_path_segment(NameKind::Flag, &name)?;
        Ok(Self { name, provider })
    }

    /// Bind the flag declared by `F` to `provider`.
    pub fn of<F: FlagDefinition>(provider: Arc<dyn FlagProvider>) -> Result<Self> {
        Self::new(F::KEY, provider)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flag's current state as reported by its provider.
    pub fn state(&self) -> Result<FlagState> {
        self.provider.get_state(&self.name)
    }

    /// Evaluate the flag for `context` and explain the outcome.
    ///
    /// Provider errors are returned unchanged; no fallback value is substituted.
    pub fn evaluate_detail(&self, context: Option<&str>) -> Result<Detail> {
        let state = self.state()?;
        let detail = eval::evaluate(&state, context);
        debug!(
            "flag {} evaluated to {} for {:?} ({:?})",
            self.name, detail.value, context, detail.reason
        );
        Ok(detail)
    }

    /// Whether the flag is enabled for `context`. `None` evaluates the case where there is no
    /// particular identity, which is only enabled when the flag has no allow-list.
    pub fn is_enabled(&self, context: Option<&str>) -> Result<bool> {
        self.evaluate_detail(context).map(|detail| detail.value)
    }

    /// Whether the flag is enabled without reference to any identity.
    pub fn is_enabled_globally(&self) -> Result<bool> {
        self.is_enabled(None)
    }

    /// Whether the flag is enabled for `context`.
    pub fn for_context(&self, context: &str) -> Result<bool> {
        self.is_enabled(Some(context))
    }
}

impl fmt::Debug for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureFlag")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
