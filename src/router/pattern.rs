//! Path patterns with `:param` segments.

use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Stored lower-cased; matching is case-insensitive.
    Static(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> AppResult<Self> {
        if !raw.starts_with('/') {
            return Err(AppError::user("invalid_route_pattern".to_string(), format!("pattern must start with '/': {}", raw)));
        }
        let mut segments = Vec::new();
        for part in raw.split('/').filter(|p| !p.is_empty()) {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(AppError::user("invalid_route_pattern".to_string(), format!("empty parameter name in {}", raw)));
                }
                if segments.iter().any(|s| matches!(s, Segment::Param(n) if n == name)) {
                    return Err(AppError::user("invalid_route_pattern".to_string(), format!("duplicate parameter :{} in {}", name, raw)));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Static(part.to_ascii_lowercase()));
            }
        }
        Ok(Self { raw: raw.to_string(), segments })
    }

    pub fn as_str(&self) -> &str { &self.raw }

    /// Number of literal segments; more literal segments means a more specific route.
    pub fn specificity(&self) -> usize {
        self.segments.iter().filter(|s| matches!(s, Segment::Static(_))).count()
    }

    pub fn match_segments(&self, parts: &[&str]) -> Option<Params> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Params::new();
        for (seg, part) in self.segments.iter().zip(parts) {
            match seg {
                Segment::Static(s) => {
                    if !s.eq_ignore_ascii_case(part) { return None; }
                }
                Segment::Param(name) => {
                    let value = urlencoding::decode(part).map(|c| c.into_owned()).unwrap_or_else(|_| part.to_string());
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }
}

/// Split a location into non-empty path segments, dropping query and fragment.
pub fn path_segments(location: &str) -> Vec<&str> {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    location[..end].split('/').filter(|p| !p.is_empty()).collect()
}

/// Canonical spelling of a location's path: leading slash, no trailing slash.
pub fn normalize_path(location: &str) -> String {
    format!("/{}", path_segments(location).join("/"))
}
