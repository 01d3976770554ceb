//! Canonical roles, the role-label normalizer and the role → home-path table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

static NON_CANONICAL: Lazy<Regex> = Lazy::new(|| Regex::new("[^A-Z]").expect("static pattern"));

/// Normalize a raw role label: trim, upper-case, then map every character outside
/// `A-Z` to `_`. Total and idempotent; the result is only meaningful when it equals
/// one of the canonical tokens.
pub fn normalize_role(raw: &str) -> String {
    let up = raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}').to_uppercase();
    NON_CANONICAL.replace_all(&up, "_").into_owned()
}

/// Absent labels normalize to the empty string.
pub fn normalize_role_opt(raw: Option<&str>) -> String {
    raw.map(normalize_role).unwrap_or_default()
}

/// Normalize a role label taken straight from a JSON payload. Only strings carry a
/// role; null, numbers, booleans and structured values yield the empty token.
pub fn normalize_role_value(raw: &Value) -> String {
    match raw {
        Value::String(s) => normalize_role(s),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Instructor, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPERADMIN",
            Role::Admin => "ADMIN",
            Role::Instructor => "INSTRUCTOR",
            Role::Student => "STUDENT",
        }
    }

    /// Exact match against an already-normalized token.
    pub fn from_canonical(token: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.as_str() == token)
    }

    /// Normalize then match; `None` means the label is unrecognized.
    pub fn from_label(raw: &str) -> Option<Role> {
        Role::from_canonical(&normalize_role(raw))
    }

    /// Landing route for this role.
    pub fn home_path(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "/superadmin",
            Role::Admin => "/admin",
            Role::Instructor => "/instructor",
            Role::Student => "/dashboard",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Redirect Target Table lookup on a normalized token. Misses for unrecognized tokens;
/// each guard applies its own fallback.
pub fn home_path_for(token: &str) -> Option<&'static str> {
    Role::from_canonical(token).map(|r| r.home_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_common_spellings() {
        assert_eq!(normalize_role("admin"), "ADMIN");
        assert_eq!(normalize_role(" Instructor "), "INSTRUCTOR");
        assert_eq!(normalize_role("super-admin"), "SUPER_ADMIN");
        assert_eq!(normalize_role("Super Admin!"), "SUPER_ADMIN_");
        assert_eq!(normalize_role(""), "");
        assert_eq!(normalize_role("   "), "");
    }

    #[test]
    fn byte_order_mark_is_trimmed() {
        assert_eq!(normalize_role("\u{FEFF}admin"), "ADMIN");
        assert_eq!(normalize_role("student\u{FEFF}\n"), "STUDENT");
        assert_eq!(normalize_role("\u{00A0}Instructor"), "INSTRUCTOR");
    }

    #[test]
    fn non_string_inputs_normalize_to_empty() {
        assert_eq!(normalize_role_opt(None), "");
        assert_eq!(normalize_role_value(&Value::Null), "");
        assert_eq!(normalize_role_value(&json!(42)), "");
        assert_eq!(normalize_role_value(&json!(true)), "");
        assert_eq!(normalize_role_value(&json!({"name": "ADMIN"})), "");
        assert_eq!(normalize_role_value(&json!("student")), "STUDENT");
    }

    #[test]
    fn canonical_tokens_are_fixed_points() {
        for r in Role::ALL {
            assert_eq!(normalize_role(r.as_str()), r.as_str());
            assert_eq!(Role::from_canonical(r.as_str()), Some(r));
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = ["admin", " Instructor ", "super-admin", "Super Admin!", "élève", "ß", "42", "", "r\u{00f4}le\t"];
        for s in samples {
            let once = normalize_role(s);
            assert_eq!(normalize_role(&once), once, "not idempotent for {:?}", s);
            assert!(once.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn super_admin_spelling_is_not_superadmin() {
        assert_eq!(Role::from_label("Super-Admin"), None);
        assert_eq!(Role::from_label("superadmin"), Some(Role::SuperAdmin));
    }

    #[test]
    fn home_table() {
        assert_eq!(home_path_for("SUPERADMIN"), Some("/superadmin"));
        assert_eq!(home_path_for("ADMIN"), Some("/admin"));
        assert_eq!(home_path_for("INSTRUCTOR"), Some("/instructor"));
        assert_eq!(home_path_for("STUDENT"), Some("/dashboard"));
        assert_eq!(home_path_for("SUPER_ADMIN"), None);
        assert_eq!(home_path_for(""), None);
    }

    #[test]
    fn serde_uses_canonical_tokens() {
        assert_eq!(serde_json::to_value(Role::SuperAdmin).unwrap(), json!("SUPERADMIN"));
        let r: Role = serde_json::from_value(json!("INSTRUCTOR")).unwrap();
        assert_eq!(r, Role::Instructor);
    }
}
