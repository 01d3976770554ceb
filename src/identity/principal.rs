use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::{normalize_role, Role};

/// Fields of a backend user record that may carry the role label, in lookup order.
const ROLE_FIELDS: [&str; 4] = ["role", "Role", "userRole", "roleName"];

/// The authenticated actor as the client sees it: a few well-known fields lifted
/// out of the backend's user record, the raw record kept alongside.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Raw role label; not normalized.
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub attrs: Value,
}

impl Principal {
    /// Build from a backend user record, recording `role` verbatim.
    pub fn from_user_record(user: &Value, role: impl Into<String>) -> Self {
        Self {
            user_id: first_scalar(user, &["id", "_id", "userId"]),
            email: first_scalar(user, &["email"]),
            display_name: first_scalar(user, &["name", "fullName", "username"]),
            role: role.into(),
            attrs: user.clone(),
        }
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref()
            .or(self.email.as_deref())
            .or(self.user_id.as_deref())
            .unwrap_or("<anonymous>")
    }
}

fn first_scalar(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match v.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// First present role candidate on a user record: `role`, `Role`, `userRole`,
/// `roleName`, then `roles[0]`. Null, `false`, `0` and `""` count as absent; any
/// other value is taken as-is, whatever its type.
pub fn role_label_of(user: &Value) -> Option<&Value> {
    let first_of_roles = user.get("roles").and_then(|r| r.as_array()).and_then(|a| a.first());
    ROLE_FIELDS.iter()
        .map(|k| user.get(*k))
        .chain(std::iter::once(first_of_roles))
        .flatten()
        .find(|v| is_present(v))
}

fn is_present(v: &Value) -> bool {
    match v {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Canonical role for a freshly authenticated user. Non-string, unrecognized or
/// missing labels fall back to `Student`, the least privileged role.
pub fn canonical_role_of(user: &Value) -> Role {
    role_label_of(user)
        .and_then(Value::as_str)
        .map(normalize_role)
        .and_then(|t| Role::from_canonical(&t))
        .unwrap_or(Role::Student)
}
