use serde::Serialize;

use crate::flag_state::FlagState;

/// Evaluate a flag's state for the identity `context`, or for no particular identity.
///
/// This is a total function over every combination of `enabled` and `context`; it never fails
/// and depends on nothing but its arguments.
///
/// | enabled          | allow-list      | result                          |
/// |------------------|-----------------|---------------------------------|
/// | `null` / `false` | any             | `false`                         |
/// | `true`           | `null`          | `true`                          |
/// | `true`           | `[]`            | `false`                         |
/// | `true`           | `[..]`          | `context` is in the allow-list  |
pub fn evaluate(state: &FlagState, context: Option<&str>) -> Detail {
    let enabled = match state.enabled {
        None => return Detail::off(Reason::NotConfigured),
        Some(enabled) => enabled,
    };

    if !enabled {
        return Detail::off(Reason::Off);
    }

    let allowed = match &state.context {
        None => return Detail::on(Reason::Everybody),
        Some(allowed) => allowed,
    };

    if allowed.is_empty() {
        return Detail::off(Reason::EmptyAllowList);
    }

    match context {
        None => Detail::off(Reason::NoContext),
        Some(context) if allowed.iter().any(|a| a == context) => {
            Detail::on(Reason::AllowListMatch)
        }
        Some(_) => Detail::off(Reason::AllowListMiss),
    }
}

/// A Detail is returned from [evaluate], combining the result of a flag evaluation with an
/// explanation of how it was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Detail {
    /// Whether the flag is enabled for the evaluated context.
    pub value: bool,

    /// The rule in the decision table that produced [Detail::value].
    pub reason: Reason,
}

impl Detail {
    fn on(reason: Reason) -> Self {
        Detail {
            value: true,
            reason,
        }
    }

    fn off(reason: Reason) -> Self {
        Detail {
            value: false,
            reason,
        }
    }
}

/// Reason describes which rule decided a flag evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind")]
pub enum Reason {
    /// The `enabled` parameter is missing or `null`.
    NotConfigured,
    /// The flag is explicitly disabled.
    Off,
    /// The flag is enabled with no allow-list.
    Everybody,
    /// The flag is enabled, but its allow-list is empty.
    EmptyAllowList,
    /// The evaluated context is on the allow-list.
    AllowListMatch,
    /// The evaluated context is not on the allow-list.
    AllowListMiss,
    /// The flag has an allow-list but no context was supplied.
    NoContext,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use spectral::prelude::*;
    use test_case::test_case;

    fn allow_list() -> FlagState {
        FlagState::allow_list(["a", "b"])
    }

    #[test_case(FlagState::unset(), None, Reason::NotConfigured)]
    #[test_case(FlagState::unset(), Some("a"), Reason::NotConfigured)]
    #[test_case(FlagState::off(), None, Reason::Off)]
    #[test_case(FlagState { enabled: Some(false), context: Some(vec!["a".into()]) }, Some("a"), Reason::Off)]
    #[test_case(FlagState { enabled: None, context: Some(vec!["a".into()]) }, Some("a"), Reason::NotConfigured)]
    #[test_case(FlagState::allow_list(Vec::<String>::new()), None, Reason::EmptyAllowList)]
    #[test_case(FlagState::allow_list(Vec::<String>::new()), Some("a"), Reason::EmptyAllowList)]
    #[test_case(allow_list(), Some("c"), Reason::AllowListMiss)]
    #[test_case(allow_list(), None, Reason::NoContext)]
    fn disabled(state: FlagState, context: Option<&str>, reason: Reason) {
        assert_that!(evaluate(&state, context)).is_equal_to(Detail {
            value: false,
            reason,
        });
    }

    #[test_case(FlagState::on(), None, Reason::Everybody)]
    #[test_case(FlagState::on(), Some("anyone"), Reason::Everybody)]
    #[test_case(allow_list(), Some("a"), Reason::AllowListMatch)]
    #[test_case(allow_list(), Some("b"), Reason::AllowListMatch)]
    fn enabled(state: FlagState, context: Option<&str>, reason: Reason) {
        assert_that!(evaluate(&state, context)).is_equal_to(Detail {
            value: true,
            reason,
        });
    }

    #[test]
    fn membership_is_exact() {
        let state = FlagState::allow_list(["wictor"]);
        assert!(!evaluate(&state, Some("Wictor")).value);
        assert!(!evaluate(&state, Some("wictor ")).value);
        assert!(!evaluate(&state, Some("")).value);
    }

    #[test]
    fn reason_serialization() {
        assert_json_eq!(
            serde_json::to_value(evaluate(&allow_list(), Some("a"))).unwrap(),
            json!({"value": true, "reason": {"kind": "ALLOW_LIST_MATCH"}})
        );
        assert_json_eq!(
            serde_json::to_value(Reason::NotConfigured).unwrap(),
            json!({"kind": "NOT_CONFIGURED"})
        );
        assert_json_eq!(
            serde_json::to_value(Reason::EmptyAllowList).unwrap(),
            json!({"kind": "EMPTY_ALLOW_LIST"})
        );
    }

    fn any_identity() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[a-z]{0,8}")
    }

    prop_compose! {
        fn any_state()(
            enabled in proptest::option::of(any::<bool>()),
            context in proptest::option::of(proptest::collection::vec("[a-z]{0,8}", 0..4)),
        ) -> FlagState {
            FlagState { enabled, context }
        }
    }

    proptest! {
        #[test]
        fn unset_or_off_is_never_enabled(
            enabled in proptest::option::of(Just(false)),
            context in proptest::option::of(proptest::collection::vec("[a-z]{0,8}", 0..4)),
            ctx in any_identity(),
        ) {
            let state = FlagState { enabled, context };
            prop_assert!(!evaluate(&state, ctx.as_deref()).value);
        }
    }

    proptest! {
        #[test]
        fn unrestricted_is_always_enabled(ctx in any_identity()) {
            prop_assert!(evaluate(&FlagState::on(), ctx.as_deref()).value);
        }
    }

    proptest! {
        #[test]
        fn empty_allow_list_is_never_enabled(ctx in any_identity()) {
            let state = FlagState::allow_list(Vec::<String>::new());
            prop_assert!(!evaluate(&state, ctx.as_deref()).value);
        }
    }

    proptest! {
        #[test]
        fn allow_list_enables_exactly_its_members(
            allowed in proptest::collection::vec("[a-z]{0,8}", 1..4),
            ctx in any_identity(),
        ) {
            let expected = matches!(&ctx, Some(c) if allowed.contains(c));
            let state = FlagState::allow_list(allowed);
            prop_assert_eq!(evaluate(&state, ctx.as_deref()).value, expected);
        }
    }

    proptest! {
        #[test]
        fn evaluation_agrees_with_audience(state in any_state(), ctx in any_identity()) {
            prop_assert_eq!(
                evaluate(&state, ctx.as_deref()).value,
                state.audience().contains(ctx.as_deref())
            );
        }
    }
}
