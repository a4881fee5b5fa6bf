use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// FlagState is the raw, operator-edited configuration of one flag as read from the store.
///
/// Both fields are independently optional. `enabled: None` means the flag has not been configured
/// yet and is treated as disabled. `context: None` means the flag is not restricted to an
/// allow-list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagState {
    pub enabled: Option<bool>,
    pub context: Option<Vec<String>>,
}

impl FlagState {
    /// The state of a flag nobody has configured.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Enabled for everyone.
    pub fn on() -> Self {
        Self {
            enabled: Some(true),
            context: None,
        }
    }

    /// Explicitly disabled.
    pub fn off() -> Self {
        Self {
            enabled: Some(false),
            context: None,
        }
    }

    /// Enabled only for the given identities.
    pub fn allow_list<I, S>(identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: Some(true),
            context: Some(identities.into_iter().map(Into::into).collect()),
        }
    }

    /// Derive who this flag is effectively enabled for.
    pub fn audience(&self) -> Audience {
        match (self.enabled, &self.context) {
            (None | Some(false), _) => Audience::Nobody,
            (Some(true), None) => Audience::Everybody,
            (Some(true), Some(context)) if context.is_empty() => Audience::Nobody,
            (Some(true), Some(context)) => Audience::AllowList(context.iter().cloned().collect()),
        }
    }

    /// Decode the two raw parameter values of `flag_name` into a state.
    ///
    /// `None` means the parameter does not exist; it decodes exactly like the literal `null`.
    pub(crate) fn decode(
        flag_name: &str,
        enabled_path: &str,
        enabled_raw: Option<&str>,
        context_path: &str,
        context_raw: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            enabled: decode_value(
                flag_name,
                enabled_path,
                enabled_raw,
                "expected a boolean or null",
            )?,
            context: decode_value(
                flag_name,
                context_path,
                context_raw,
                "expected an array of strings or null",
            )?,
        })
    }
}

fn decode_value<T: DeserializeOwned>(
    flag_name: &str,
    path: &str,
    raw: Option<&str>,
    expected: &str,
) -> Result<Option<T>> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(None),
    };

    serde_json::from_str::<Option<T>>(raw).map_err(|e| {
        warn!(
            "flag {} has a malformed value at {}: {:?} ({})",
            flag_name, path, raw, e
        );
        Error::Configuration {
            flag: flag_name.to_string(),
            path: path.to_string(),
            value: raw.to_string(),
            reason: format!("{}: {}", expected, e),
        }
    })
}

/// Audience is the set of identities a flag is effectively enabled for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Audience {
    /// Disabled, unconfigured, or enabled with an empty allow-list.
    Nobody,
    /// Enabled without restriction, including for callers with no identity.
    Everybody,
    /// Enabled only for these identities.
    AllowList(BTreeSet<String>),
}

impl Audience {
    /// Whether `identity` belongs to this audience. `None` only matches [Audience::Everybody].
    pub fn contains(&self, identity: Option<&str>) -> bool {
        match (self, identity) {
            (Audience::Nobody, _) => false,
            (Audience::Everybody, _) => true,
            (Audience::AllowList(_), None) => false,
            (Audience::AllowList(allowed), Some(identity)) => allowed.contains(identity),
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Nobody => f.write_str("nobody"),
            Audience::Everybody => f.write_str("everybody"),
            Audience::AllowList(allowed) => write!(f, "[{}]", allowed.iter().join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spectral::prelude::*;
    use test_case::test_case;

    const ENABLED: &str = "/applications/app/flags/f/enabled";
    const CONTEXT: &str = "/applications/app/flags/f/context";

    fn decode(enabled: Option<&str>, context: Option<&str>) -> Result<FlagState> {
        FlagState::decode("f", ENABLED, enabled, CONTEXT, context)
    }

    #[test_case(None, None; "both missing")]
    #[test_case(Some("null"), Some("null"); "both null")]
    #[test_case(Some(" null "), None; "null with whitespace")]
    fn missing_and_null_are_unset(enabled: Option<&str>, context: Option<&str>) {
        assert_that!(decode(enabled, context))
            .is_ok()
            .is_equal_to(FlagState::unset());
    }

    #[test_case("true", Some(true))]
    #[test_case("false", Some(false))]
    #[test_case("null", None)]
    fn decodes_enabled(raw: &str, expected: Option<bool>) {
        let state = decode(Some(raw), None).unwrap();
        assert_eq!(state.enabled, expected);
    }

    #[test]
    fn decodes_context() {
        let state = decode(Some("true"), Some(r#"["wictor", "nicolas"]"#)).unwrap();
        assert_that!(state.context)
            .is_some()
            .is_equal_to(vec!["wictor".to_string(), "nicolas".to_string()]);

        let state = decode(Some("true"), Some("[]")).unwrap();
        assert_that!(state.context).is_some().has_length(0);
    }

    #[test_case(r#""yes""#; "string instead of bool")]
    #[test_case("1"; "number instead of bool")]
    #[test_case("True"; "not json")]
    #[test_case(""; "empty string")]
    #[test_case("[true]"; "array instead of bool")]
    fn malformed_enabled_is_configuration_error(raw: &str) {
        let err = decode(Some(raw), None).unwrap_err();
        match err {
            Error::Configuration {
                flag, path, value, ..
            } => {
                assert_eq!(flag, "f");
                assert_eq!(path, ENABLED);
                assert_eq!(value, raw);
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test_case(r#""wictor""#; "bare string")]
    #[test_case("[1, 2]"; "array of numbers")]
    #[test_case(r#"["a", null]"#; "array with null")]
    #[test_case(r#"{"a": 1}"#; "object")]
    #[test_case("[a]"; "not json")]
    fn malformed_context_is_configuration_error(raw: &str) {
        let err = decode(Some("true"), Some(raw)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains(CONTEXT));
    }

    #[test]
    fn audience_derivation() {
        assert_eq!(FlagState::unset().audience(), Audience::Nobody);
        assert_eq!(FlagState::off().audience(), Audience::Nobody);
        assert_eq!(
            FlagState {
                enabled: Some(false),
                context: Some(vec!["a".into()]),
            }
            .audience(),
            Audience::Nobody
        );
        assert_eq!(FlagState::on().audience(), Audience::Everybody);
        assert_eq!(
            FlagState::allow_list(Vec::<String>::new()).audience(),
            Audience::Nobody
        );
        assert_eq!(
            FlagState::allow_list(["b", "a", "b"]).audience(),
            Audience::AllowList(["a".to_string(), "b".to_string()].into_iter().collect())
        );
    }

    #[test]
    fn audience_display() {
        assert_eq!(Audience::Nobody.to_string(), "nobody");
        assert_eq!(Audience::Everybody.to_string(), "everybody");
        assert_eq!(
            FlagState::allow_list(["wictor", "nicolas"])
                .audience()
                .to_string(),
            "[nicolas, wictor]"
        );
    }

    #[test]
    fn unset_state_serializes_as_nulls() {
        let json = serde_json::to_value(FlagState::unset()).unwrap();
        assert_eq!(json, serde_json::json!({"enabled": null, "context": null}));
    }
}
