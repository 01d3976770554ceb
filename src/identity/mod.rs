//! Identity, session and route-guard core.
//! Keep the public surface thin and split implementation across sub-modules.

mod role;
mod principal;
mod session;
mod persist;
mod provider;
mod request_context;
mod authorizer;

pub use role::{Role, normalize_role, normalize_role_opt, normalize_role_value, home_path_for};
pub use principal::{Principal, role_label_of, canonical_role_of};
pub use session::{SessionStore, SessionSnapshot, SessionToken, RestoredSession, ListenerId};
pub use persist::{
    PersistedSession, SessionStorage, FileSessionStorage, MemorySessionStorage, StorageError,
    hydrate_from, spawn_hydration,
};
pub use provider::{
    AuthBackend, AuthService, HttpAuthBackend, StaticAuthBackend, LoginRequest, LoginResponse,
    LoginOutcome, parse_login_payload, LOGIN_ENDPOINT,
};
pub use request_context::NavigationState;
pub use authorizer::{
    protected, public, Access, Decision, GateState, AUTHENTICATED_LANDING, LOGIN_PATH, ROOT_PATH,
};
