use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-navigation data carried alongside the path, never in the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// Let an authenticated actor through to a public-only view.
    #[serde(default)]
    pub allow_when_logged_in: bool,
}

impl NavigationState {
    pub fn allow_when_logged_in() -> Self { Self { allow_when_logged_in: true } }

    /// Lenient read of an arbitrary state object: only a literal `true` counts.
    pub fn from_value(v: &Value) -> Self {
        Self { allow_when_logged_in: v.get("allowWhenLoggedIn").and_then(Value::as_bool) == Some(true) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_literal_true_sets_override() {
        assert!(NavigationState::from_value(&json!({"allowWhenLoggedIn": true})).allow_when_logged_in);
        assert!(!NavigationState::from_value(&json!({"allowWhenLoggedIn": "true"})).allow_when_logged_in);
        assert!(!NavigationState::from_value(&json!({"allowWhenLoggedIn": 1})).allow_when_logged_in);
        assert!(!NavigationState::from_value(&Value::Null).allow_when_logged_in);
    }
}
