use thiserror::Error;

use crate::store::StoreError;

/// Result type returned by providers and flag evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Error is returned when a flag could not be resolved.
///
/// A parameter that has never been configured is not an error: it resolves to an unset
/// [crate::FlagState] and evaluates to disabled. What remains are the two situations an operator
/// has to act on, plus construction-time validation.
#[derive(Debug, Error)]
pub enum Error {
    /// The parameter store could not be reached, denied access, or timed out.
    #[error("parameter store unavailable while resolving flag {flag}: {source}")]
    ProviderUnavailable {
        flag: String,
        #[source]
        source: StoreError,
    },

    /// A stored value exists but is not valid JSON of the expected shape.
    #[error("flag {flag} has an invalid value at {path}: {value:?} ({reason})")]
    Configuration {
        flag: String,
        path: String,
        value: String,
        reason: String,
    },

    /// An application or flag name that cannot be used to build a parameter path.
    #[error("invalid {kind} name {name:?}: {reason}")]
    InvalidName {
        kind: NameKind,
        name: String,
        reason: String,
    },
}

/// Which kind of name failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameKind {
    Application,
    Prefix,
    Flag,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NameKind::Application => "application",
            NameKind::Prefix => "prefix",
            NameKind::Flag => "flag",
        })
    }
}

impl Error {
    /// True when the store itself was the problem, as opposed to the data in it.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::ProviderUnavailable { .. })
    }

    /// True when a stored value was malformed.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// The flag this error relates to, if any.
    pub fn flag(&self) -> Option<&str> {
        match self {
            Error::ProviderUnavailable { flag, .. } | Error::Configuration { flag, .. } => {
                Some(flag)
            }
            Error::InvalidName {
                kind: NameKind::Flag,
                name,
                ..
            } => Some(name),
            Error::InvalidName { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;
    use std::error::Error as _;
    use std::time::Duration;

    #[test]
    fn unavailable_keeps_store_error_as_source() {
        let err = Error::ProviderUnavailable {
            flag: "party_time".into(),
            source: StoreError::Timeout {
                path: "/applications/checkout/flags/party_time/enabled".into(),
                timeout: Duration::from_secs(3),
            },
        };

        assert!(err.is_unavailable());
        assert!(!err.is_configuration());
        assert_that!(err.flag()).contains_value("party_time");
        assert_that!(err.source().map(|s| s.to_string()))
            .is_some()
            .contains("timed out");
    }

    #[test]
    fn configuration_message_carries_path_and_value() {
        let err = Error::Configuration {
            flag: "party_time".into(),
            path: "/applications/checkout/flags/party_time/enabled".into(),
            value: "\"yes\"".into(),
            reason: "expected a boolean or null".into(),
        };

        assert!(err.is_configuration());
        let message = err.to_string();
        assert_that!(message).contains("/applications/checkout/flags/party_time/enabled");
        assert_that!(message).contains(r#""\"yes\"""#);
    }

    #[test]
    fn invalid_name_for_application_has_no_flag() {
        let err = Error::InvalidName {
            kind: NameKind::Application,
            name: "".into(),
            reason: "must not be empty".into(),
        };
        assert_that!(err.flag()).is_none();
        assert_that!(err.to_string()).starts_with("invalid application name");
    }
}
