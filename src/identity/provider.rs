use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::GateConfig;
use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::persist::{PersistedSession, SessionStorage};
use super::principal::{canonical_role_of, Principal};
use super::role::Role;
use super::session::{SessionStore, SessionToken};

pub const LOGIN_ENDPOINT: &str = "/api/auth/login";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// What the backend hands back on success; the gate only reads the user's role
/// and keeps the token.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub user: Value,
    pub token: SessionToken,
}

pub trait AuthBackend: Send + Sync {
    fn login(&self, req: &LoginRequest) -> impl Future<Output = AppResult<LoginResponse>> + Send;
}

/// Accept `{user, token}` either bare or wrapped under `data`.
pub fn parse_login_payload(body: &Value) -> AppResult<LoginResponse> {
    let payload = body.get("data").filter(|v| !v.is_null()).unwrap_or(body);
    let user = payload.get("user").filter(|u| u.is_object());
    let token = payload.get("token").and_then(Value::as_str).filter(|t| !t.trim().is_empty());
    match (user, token) {
        (Some(u), Some(t)) => Ok(LoginResponse { user: u.clone(), token: t.to_string() }),
        _ => Err(AppError::auth("malformed_login_response", "Malformed login response")),
    }
}

/// REST backend reached over HTTP.
pub struct HttpAuthBackend {
    client: reqwest::Client,
    login_url: Url,
}

impl HttpAuthBackend {
    pub fn new(cfg: &GateConfig) -> AppResult<Self> {
        let login_url = Url::parse(&format!("{}{}", cfg.api_url.trim_end_matches('/'), LOGIN_ENDPOINT))
            .map_err(|e| AppError::config("invalid_api_url".to_string(), format!("{}: {}", cfg.api_url, e)))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self { client, login_url })
    }

    pub fn login_url(&self) -> &Url { &self.login_url }
}

impl AuthBackend for HttpAuthBackend {
    async fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let resp = self.client
            .post(self.login_url.clone())
            .json(&serde_json::json!({"email": req.email, "password": req.password}))
            .send()
            .await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let msg = body.get("message").and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("login failed: HTTP {}", status));
            warn!(target: "coursegate::auth", status = status.as_u16(), "backend rejected login");
            return Err(match status.as_u16() {
                400 | 401 | 403 => AppError::auth("invalid_credentials".to_string(), msg),
                _ => AppError::backend("backend_error".to_string(), msg),
            });
        }
        parse_login_payload(&body)
    }
}

/// In-memory account table.
#[derive(Default)]
pub struct StaticAuthBackend {
    accounts: HashMap<String, (String, Value)>,
    issued: AtomicU64,
}

impl StaticAuthBackend {
    pub fn new() -> Self { Self::default() }

    pub fn with_account(mut self, email: &str, password: &str, user: Value) -> Self {
        self.accounts.insert(email.trim().to_lowercase(), (password.to_string(), user));
        self
    }
}

impl AuthBackend for StaticAuthBackend {
    async fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        match self.accounts.get(&req.email.trim().to_lowercase()) {
            Some((pw, user)) if *pw == req.password => {
                let n = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
                Ok(LoginResponse { user: user.clone(), token: format!("static.{}.{}", n, chrono::Utc::now().timestamp_millis()) })
            }
            _ => Err(AppError::auth("invalid_credentials", "Invalid email or password")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub role: Role,
    /// Where to navigate after a successful login.
    pub home: &'static str,
    pub principal: Principal,
}

/// Login/logout/expiry flow: the only writer of the session store besides hydration.
pub struct AuthService<B: AuthBackend> {
    backend: B,
    store: Arc<SessionStore>,
    storage: Arc<dyn SessionStorage>,
}

impl<B: AuthBackend> AuthService<B> {
    pub fn new(backend: B, store: Arc<SessionStore>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { backend, store, storage }
    }

    pub fn store(&self) -> &Arc<SessionStore> { &self.store }

    pub async fn login(&self, req: &LoginRequest) -> AppResult<LoginOutcome> {
        if req.email.trim().is_empty() || req.password.is_empty() {
            return Err(AppError::user("missing_credentials", "email and password are required"));
        }
        let resp = self.backend.login(req).await?;
        let role = canonical_role_of(&resp.user);
        let mut user = resp.user;
        if let Some(obj) = user.as_object_mut() {
            obj.insert("role".into(), Value::String(role.as_str().into()));
        }
        self.storage.save(&PersistedSession::new(resp.token.clone(), role.as_str(), user.clone()))?;
        let principal = Principal::from_user_record(&user, role.as_str());
        self.store.login(principal.clone(), resp.token);
        info!(target: "coursegate::auth", user = principal.label(), role = %role, "auth.login");
        tprintln!("auth.login home={}", role.home_path());
        Ok(LoginOutcome { role, home: role.home_path(), principal })
    }

    /// Clear the in-memory session first so the gate closes even if storage fails.
    pub fn logout(&self) -> AppResult<bool> {
        let was = self.store.logout();
        self.storage.clear()?;
        info!(target: "coursegate::auth", was_authenticated = was, "auth.logout");
        Ok(was)
    }

    pub fn expire(&self) -> AppResult<bool> {
        let was = self.store.expire();
        self.storage.clear()?;
        info!(target: "coursegate::auth", was_authenticated = was, "auth.expired");
        Ok(was)
    }
}
