//!
//! coursegate router
//! -----------------
//! Declarative route table binding URL paths to (view, guard, allowed roles), and
//! the single evaluator that turns a location plus the current session into a
//! render/redirect/placeholder decision.
//!
//! Matching rules:
//! - query string and fragment are ignored, as are empty segments (trailing slash);
//! - literal segments match case-insensitively, `:param` captures one segment;
//! - the route with the most literal segments wins, ties go to registration order;
//! - anything unmatched is redirected to `/`, replacing the history entry.

pub mod pattern;

use serde::Serialize;
use tracing::debug;

use crate::error::AppResult;
use crate::identity::{self, Decision, GateState, NavigationState, Role, SessionSnapshot, ROOT_PATH};
use pattern::{normalize_path, path_segments, Params, PathPattern};

/// Views the client can render. Page content is out of scope; a view is a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Landing,
    CourseCatalog,
    Terms,
    Privacy,
    Signup,
    RegisterFirst,
    Login,
    ForgotPassword,
    Register,
    StudentDashboard,
    InstructorDashboard,
    CourseViewer,
    CreateCourse,
    EditCourse,
    SuperAdminDashboard,
    CreateFinalTest,
    AddCollege,
    AdminDashboard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "guard", content = "roles", rename_all = "snake_case")]
pub enum Guard {
    /// No guard: always rendered.
    Open,
    /// Anonymous-only view, with the navigation-state override.
    Public,
    /// Authenticated view; an empty list admits any authenticated role.
    Protected(Vec<Role>),
}

#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: PathPattern,
    pub view: View,
    pub guard: Guard,
}

impl Route {
    pub fn evaluate(&self, session: &SessionSnapshot, nav: &NavigationState) -> Decision {
        match &self.guard {
            Guard::Open => Decision::Render { access: identity::Access::Open },
            Guard::Public => identity::public(session, nav),
            Guard::Protected(roles) => identity::protected(session, roles),
        }
    }
}

/// Fixed after `build()`: access rules never depend on session state.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<(String, View, Guard)>,
}

impl RouteTableBuilder {
    pub fn open(mut self, path: &str, view: View) -> Self {
        self.routes.push((path.to_string(), view, Guard::Open));
        self
    }

    pub fn public(mut self, path: &str, view: View) -> Self {
        self.routes.push((path.to_string(), view, Guard::Public));
        self
    }

    pub fn protected(mut self, path: &str, view: View, roles: &[Role]) -> Self {
        self.routes.push((path.to_string(), view, Guard::Protected(roles.to_vec())));
        self
    }

    pub fn build(self) -> AppResult<RouteTable> {
        let mut routes = Vec::with_capacity(self.routes.len());
        for (path, view, guard) in self.routes {
            routes.push(Route { pattern: PathPattern::parse(&path)?, view, guard });
        }
        Ok(RouteTable { routes })
    }
}

#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Params,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder { RouteTableBuilder::default() }

    /// The platform's route table.
    pub fn lms() -> Self {
        use Role::*;
        let all = [Student, Admin, SuperAdmin, Instructor];
        let admins = [Admin, SuperAdmin];
        let table = Self::builder()
            .open("/", View::Landing)
            .protected("/courses", View::CourseCatalog, &all)
            .open("/terms", View::Terms)
            .open("/privacy", View::Privacy)
            .public("/signup", View::Signup)
            .public("/register-first", View::RegisterFirst)
            .public("/login", View::Login)
            .public("/forgot-password", View::ForgotPassword)
            .protected("/register", View::Register, &admins)
            .protected("/dashboard", View::StudentDashboard, &[Student])
            .protected("/instructor", View::InstructorDashboard, &[Instructor])
            .protected("/courses/:courseId", View::CourseViewer, &[Student, Instructor, Admin, SuperAdmin])
            .protected("/courses/create", View::CreateCourse, &admins)
            .protected("/courses/:courseId/edit", View::EditCourse, &admins)
            .protected("/superadmin", View::SuperAdminDashboard, &[SuperAdmin])
            .protected("/create_finaltest", View::CreateFinalTest, &[SuperAdmin])
            .protected("/add_college", View::AddCollege, &[SuperAdmin])
            .protected("/admin", View::AdminDashboard, &[Admin])
            .build();
        table.expect("built-in route table")
    }

    pub fn routes(&self) -> &[Route] { &self.routes }

    pub fn resolve(&self, location: &str) -> Option<RouteMatch<'_>> {
        let parts = path_segments(location);
        let mut best: Option<RouteMatch<'_>> = None;
        for route in &self.routes {
            let Some(params) = route.pattern.match_segments(&parts) else { continue };
            let better = match &best {
                None => true,
                Some(b) => route.pattern.specificity() > b.route.pattern.specificity(),
            };
            if better {
                best = Some(RouteMatch { route, params });
            }
        }
        best
    }
}

/// Outcome of evaluating one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    pub path: String,
    /// `None` when no route matched.
    pub view: Option<View>,
    pub params: Params,
    pub decision: Decision,
}

impl Navigation {
    pub fn state(&self) -> GateState { self.decision.state() }
}

#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
}

impl Default for Router {
    fn default() -> Self { Self::new(RouteTable::lms()) }
}

impl Router {
    pub fn new(table: RouteTable) -> Self { Self { table } }

    pub fn table(&self) -> &RouteTable { &self.table }

    pub fn navigate(&self, location: &str, nav: &NavigationState, session: &SessionSnapshot) -> Navigation {
        let path = normalize_path(location);
        let Some(m) = self.table.resolve(location) else {
            debug!(target: "coursegate::router", path = %path, "no route; falling back to root");
            return Navigation {
                path,
                view: None,
                params: Params::new(),
                decision: Decision::Redirect { to: ROOT_PATH.to_string(), replace: true, state: GateState::FallbackRedirect },
            };
        };
        let decision = m.route.evaluate(session, nav);
        debug!(
            target: "coursegate::router",
            path = %path, route = m.route.pattern.as_str(), state = ?decision.state(),
            "navigate"
        );
        Navigation { path, view: Some(m.route.view), params: m.params, decision }
    }
}
