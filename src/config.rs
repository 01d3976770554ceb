use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const ENV_API_URL: &str = "COURSEGATE_API_URL";
pub const ENV_SESSION_FILE: &str = "COURSEGATE_SESSION_FILE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "COURSEGATE_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_REDIRECTS: &str = "COURSEGATE_MAX_REDIRECTS";

/// Runtime settings for the gate and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Base URL of the REST backend; the login endpoint is resolved against it.
    pub api_url: String,
    /// Durable session file restored at startup.
    pub session_file: PathBuf,
    pub request_timeout_secs: u64,
    /// Upper bound on redirects followed for a single navigation.
    pub max_redirects: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000".to_string(),
            session_file: PathBuf::from(".coursegate").join("session.json"),
            request_timeout_secs: 15,
            max_redirects: 8,
        }
    }
}

impl GateConfig {
    /// Read settings from the process environment, keeping defaults for unset keys.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` but with an injectable lookup so callers and tests
    /// don't have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(url) = lookup(ENV_API_URL).filter(|s| !s.trim().is_empty()) {
            cfg.api_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(p) = lookup(ENV_SESSION_FILE).filter(|s| !s.trim().is_empty()) {
            cfg.session_file = PathBuf::from(p.trim());
        }
        if let Some(v) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            cfg.request_timeout_secs = parse_num(ENV_REQUEST_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_REDIRECTS) {
            cfg.max_redirects = parse_num(ENV_MAX_REDIRECTS, &v)?;
        }
        Ok(cfg)
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim().parse::<T>().map_err(|_| {
        AppError::config("invalid_env".to_string(), format!("{}: expected a non-negative integer, got '{}'", key, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = GateConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, GateConfig::default());
        assert_eq!(cfg.max_redirects, 8);
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let cfg = GateConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://lms.example.org/ "),
            (ENV_SESSION_FILE, "/tmp/s.json"),
            (ENV_REQUEST_TIMEOUT_SECS, "3"),
            (ENV_MAX_REDIRECTS, " 2 "),
        ]))
        .unwrap();
        assert_eq!(cfg.api_url, "https://lms.example.org");
        assert_eq!(cfg.session_file, PathBuf::from("/tmp/s.json"));
        assert_eq!(cfg.request_timeout_secs, 3);
        assert_eq!(cfg.max_redirects, 2);
    }

    #[test]
    fn invalid_number_is_config_error() {
        let err = GateConfig::from_lookup(lookup_from(&[(ENV_MAX_REDIRECTS, "lots")])).unwrap_err();
        assert_eq!(err.code_str(), "invalid_env");
        assert!(matches!(err, AppError::Config { .. }));
    }
}
