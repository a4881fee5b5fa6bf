//! Feature flag evaluation backed by a hierarchical parameter store.
//!
//! A [FeatureFlag] asks its [FlagProvider] for the flag's [FlagState] and applies a fixed decision
//! rule to it. [ParameterStoreProvider] reads that state from a [ParameterStore], caching it for a
//! configurable time.

mod cache;
mod config;
mod error;
mod eval;
mod flag;
mod flag_state;
mod provider;
mod store;
mod test_common;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use eval::*;
pub use flag::*;
pub use flag_state::*;
pub use provider::*;
pub use store::*;
