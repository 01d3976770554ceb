//! Route guards. Pure decision functions over a session snapshot: no I/O, no
//! session mutation, and every branch ends in render, redirect or placeholder.

use serde::Serialize;
use tracing::debug;

use super::request_context::NavigationState;
use super::role::{home_path_for, normalize_role_opt, Role};
use super::session::SessionSnapshot;

pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";
/// Landing path for authenticated actors whose role has no registered home.
pub const AUTHENTICATED_LANDING: &str = "/dashboard";

/// Navigation state machine labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    Hydrating,
    Authorized,
    UnauthenticatedRedirect,
    ForbiddenRedirect,
    PublicOverride,
    /// Unknown path sent back to the root by the router.
    FallbackRedirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// No guard on the route.
    Open,
    /// Public guard, anonymous actor.
    Anonymous,
    /// Public guard, authenticated actor with the override flag.
    Override,
    SuperAdminBypass,
    AnyAuthenticated,
    RoleAllowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Session not yet hydrated: render nothing observable.
    Placeholder,
    Render { access: Access },
    /// `replace` means the current history entry is overwritten.
    Redirect { to: String, replace: bool, state: GateState },
}

impl Decision {
    fn redirect(to: &str, state: GateState) -> Self {
        Decision::Redirect { to: to.to_string(), replace: true, state }
    }

    pub fn state(&self) -> GateState {
        match self {
            Decision::Placeholder => GateState::Hydrating,
            Decision::Render { access: Access::Override } => GateState::PublicOverride,
            Decision::Render { .. } => GateState::Authorized,
            Decision::Redirect { state, .. } => *state,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Decision::Redirect { to, .. } => Some(to.as_str()),
            _ => None,
        }
    }

    pub fn renders(&self) -> bool { matches!(self, Decision::Render { .. }) }
}

/// Guard for views that need authentication, optionally restricted to `allowed`.
pub fn protected(session: &SessionSnapshot, allowed: &[Role]) -> Decision {
    if !session.has_hydrated {
        return Decision::Placeholder;
    }
    if !session.is_authenticated {
        return Decision::redirect(LOGIN_PATH, GateState::UnauthenticatedRedirect);
    }
    let token = normalize_role_opt(session.role_label());
    // Super-admin shortcut: bypasses every allow-list
    if token == Role::SuperAdmin.as_str() {
        return Decision::Render { access: Access::SuperAdminBypass };
    }
    if allowed.is_empty() {
        return Decision::Render { access: Access::AnyAuthenticated };
    }
    if allowed.iter().any(|r| r.as_str() == token) {
        return Decision::Render { access: Access::RoleAllowed };
    }
    let to = home_path_for(&token).unwrap_or(ROOT_PATH);
    debug!(target: "coursegate::guard", role = %token, to, "protected: role not allowed");
    Decision::redirect(to, GateState::ForbiddenRedirect)
}

/// Guard for views meant for anonymous actors (login, signup, password reset).
pub fn public(session: &SessionSnapshot, nav: &NavigationState) -> Decision {
    if !session.has_hydrated {
        return Decision::Placeholder;
    }
    if !session.is_authenticated {
        return Decision::Render { access: Access::Anonymous };
    }
    if nav.allow_when_logged_in {
        return Decision::Render { access: Access::Override };
    }
    let token = normalize_role_opt(session.role_label());
    let to = home_path_for(&token).unwrap_or(AUTHENTICATED_LANDING);
    debug!(target: "coursegate::guard", role = %token, to, "public: already authenticated");
    Decision::redirect(to, GateState::ForbiddenRedirect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(hydrated: bool, authed: bool, role: Option<&str>) -> SessionSnapshot {
        SessionSnapshot {
            has_hydrated: hydrated,
            is_authenticated: authed,
            role: role.map(|r| r.to_string()),
            ..Default::default()
        }
    }

    fn redirect(to: &str, state: GateState) -> Decision {
        Decision::Redirect { to: to.into(), replace: true, state }
    }

    #[test]
    fn unhydrated_is_placeholder_everywhere() {
        for authed in [false, true] {
            for role in [None, Some("ADMIN"), Some("SUPERADMIN"), Some("junk")] {
                let s = snap(false, authed, role);
                assert_eq!(protected(&s, &[Role::Student]), Decision::Placeholder);
                assert_eq!(protected(&s, &[]), Decision::Placeholder);
                assert_eq!(public(&s, &NavigationState::default()), Decision::Placeholder);
                assert_eq!(public(&s, &NavigationState::allow_when_logged_in()), Decision::Placeholder);
            }
        }
        assert_eq!(Decision::Placeholder.state(), GateState::Hydrating);
    }

    #[test]
    fn anonymous_goes_to_login() {
        let d = protected(&snap(true, false, None), &[Role::Student]);
        assert_eq!(d, redirect("/login", GateState::UnauthenticatedRedirect));
    }

    #[test]
    fn superadmin_bypasses_allow_list() {
        let d = protected(&snap(true, true, Some("SUPERADMIN")), &[Role::Admin]);
        assert_eq!(d, Decision::Render { access: Access::SuperAdminBypass });
        let d = protected(&snap(true, true, Some(" superadmin ")), &[Role::Student]);
        assert!(d.renders());
    }

    #[test]
    fn super_admin_spelling_gets_no_bypass() {
        let d = protected(&snap(true, true, Some("Super-Admin")), &[Role::Admin]);
        assert_eq!(d, redirect("/", GateState::ForbiddenRedirect));
    }

    #[test]
    fn empty_allow_list_admits_any_authenticated() {
        let d = protected(&snap(true, true, Some("whatever")), &[]);
        assert_eq!(d, Decision::Render { access: Access::AnyAuthenticated });
    }

    #[test]
    fn allowed_role_renders_after_normalizing() {
        let d = protected(&snap(true, true, Some("instructor")), &[Role::Student, Role::Instructor]);
        assert_eq!(d, Decision::Render { access: Access::RoleAllowed });
        assert_eq!(d.state(), GateState::Authorized);
    }

    #[test]
    fn wrong_role_goes_home() {
        let d = protected(&snap(true, true, Some("STUDENT")), &[Role::Admin]);
        assert_eq!(d, redirect("/dashboard", GateState::ForbiddenRedirect));
        let d = protected(&snap(true, true, Some("admin")), &[Role::SuperAdmin]);
        assert_eq!(d.redirect_target(), Some("/admin"));
    }

    #[test]
    fn unrecognized_role_falls_back_to_root() {
        let d = protected(&snap(true, true, Some("janitor")), &[Role::Student]);
        assert_eq!(d.redirect_target(), Some("/"));
        let d = protected(&snap(true, true, None), &[Role::Student]);
        assert_eq!(d.redirect_target(), Some("/"));
    }

    #[test]
    fn public_guard_branches() {
        let nav = NavigationState::default();
        assert_eq!(public(&snap(true, false, None), &nav), Decision::Render { access: Access::Anonymous });
        assert_eq!(
            public(&snap(true, true, Some("INSTRUCTOR")), &nav),
            redirect("/instructor", GateState::ForbiddenRedirect)
        );
        assert_eq!(public(&snap(true, true, Some("??")), &nav).redirect_target(), Some("/dashboard"));

        let over = public(&snap(true, true, Some("INSTRUCTOR")), &NavigationState::allow_when_logged_in());
        assert_eq!(over, Decision::Render { access: Access::Override });
        assert_eq!(over.state(), GateState::PublicOverride);
    }
}
