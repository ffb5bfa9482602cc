//! Navigation gating: the console route table and the checks that decide
//! whether a session may enter a route or see a piece of content.

use std::borrow::Cow;
use std::sync::LazyLock;

use rbac_core::catalog;
use rbac_core::{PermissionCode, Session};

use crate::config::SessionConfig;

/// A node of the console route table. Routes with children are layouts
/// and are never matched themselves.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: &'static str,
    pub permission: Option<PermissionCode>,
    pub public: bool,
    pub redirect_to: Option<&'static str>,
    pub children: Vec<Route>,
}

impl Route {
    fn page(path: &'static str, permission: Option<PermissionCode>) -> Self {
        Self {
            path,
            permission,
            public: false,
            redirect_to: None,
            children: Vec::new(),
        }
    }
}

/// A matchable route with its full path.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRoute {
    pub path: String,
    pub permission: Option<PermissionCode>,
    pub public: bool,
    pub redirect_to: Option<&'static str>,
}

impl FlatRoute {
    /// Match a concrete path against this route's pattern. Returns the
    /// number of literal segments matched, or `None` on mismatch.
    fn matches(&self, path: &str) -> Option<usize> {
        let pattern: Vec<&str> = segments(&self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut literal = 0;
        for (expected, got) in pattern.iter().zip(&actual) {
            if expected.starts_with(':') {
                continue;
            }
            if expected != got {
                return None;
            }
            literal += 1;
        }
        Some(literal)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

/// The console's route table.
pub fn console_routes() -> Vec<Route> {
    let login = Route {
        public: true,
        ..Route::page("/login", None)
    };
    let index = Route {
        redirect_to: Some("/dashboard"),
        ..Route::page("", None)
    };

    vec![
        login,
        Route {
            children: vec![
                index,
                Route::page("dashboard", None),
                Route::page("users", Some(catalog::USER_LIST)),
                Route::page("users/create", Some(catalog::USER_CREATE)),
                Route::page("users/:id/edit", Some(catalog::USER_UPDATE)),
                Route::page("users/:id", Some(catalog::USER_VIEW)),
                Route::page("groups", Some(catalog::GROUP_LIST)),
                Route::page("groups/create", Some(catalog::GROUP_CREATE)),
                Route::page("groups/:id/edit", Some(catalog::GROUP_UPDATE)),
                Route::page("groups/:id", Some(catalog::GROUP_VIEW)),
                Route::page("permissions", Some(catalog::PERMISSION_LIST)),
                Route::page("permissions/create", Some(catalog::PERMISSION_CREATE)),
                Route::page("permissions/:id/edit", Some(catalog::PERMISSION_UPDATE)),
                Route::page("roles", Some(catalog::ROLE_LIST)),
            ],
            ..Route::page("/", None)
        },
    ]
}

/// Flatten a route tree into its matchable leaves, joining paths.
pub fn flatten(routes: &[Route]) -> Vec<FlatRoute> {
    let mut flat = Vec::new();
    flatten_into(routes, "", &mut flat);
    flat
}

fn flatten_into(routes: &[Route], parent: &str, out: &mut Vec<FlatRoute>) {
    for route in routes {
        let path = join(parent, route.path);
        if route.children.is_empty() {
            out.push(FlatRoute {
                path,
                permission: route.permission.clone(),
                public: route.public,
                redirect_to: route.redirect_to,
            });
        } else {
            flatten_into(&route.children, &path, out);
        }
    }
}

fn join(parent: &str, child: &str) -> String {
    match (parent.is_empty(), child.is_empty()) {
        (true, _) => child.to_owned(),
        (false, true) => parent.to_owned(),
        (false, false) if parent.ends_with('/') => format!("{parent}{child}"),
        (false, false) => format!("{parent}/{child}"),
    }
}

/// Outcome of checking a navigation target against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session state is still being established.
    Loading,
    RedirectToLogin { from: String },
    Forbidden { redirect_to: String },
    Redirect { to: String },
    NotFound,
    Allow,
}

/// Decides navigation for the console route table.
pub struct RouteGuard {
    routes: Cow<'static, [FlatRoute]>,
    forbidden_path: String,
}

/// The console table, flattened once per process.
static CONSOLE_ROUTES: LazyLock<Vec<FlatRoute>> = LazyLock::new(|| flatten(&console_routes()));

impl RouteGuard {
    /// A guard over the console route table. The flattened table is shared,
    /// so building a guard does not rebuild it.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            routes: Cow::Borrowed(CONSOLE_ROUTES.as_slice()),
            forbidden_path: config.forbidden_path.clone(),
        }
    }

    pub fn with_routes(routes: Vec<FlatRoute>, config: &SessionConfig) -> Self {
        Self {
            routes: Cow::Owned(routes),
            forbidden_path: config.forbidden_path.clone(),
        }
    }

    pub fn routes(&self) -> &[FlatRoute] {
        &self.routes
    }

    /// The most specific route matching `path`. Literal segments beat
    /// `:param` segments; ties go to the earlier route.
    pub fn find(&self, path: &str) -> Option<&FlatRoute> {
        let mut best: Option<(&FlatRoute, usize)> = None;
        for route in self.routes.iter() {
            if let Some(score) = route.matches(path) {
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((route, score));
                }
            }
        }
        best.map(|(route, _)| route)
    }

    /// Check a navigation target. Loading is reported first, then missing
    /// authentication, then a missing permission.
    pub fn check(&self, session: &Session, path: &str) -> RouteDecision {
        let Some(route) = self.find(path) else {
            return RouteDecision::NotFound;
        };
        if route.public {
            return RouteDecision::Allow;
        }
        if session.loading {
            return RouteDecision::Loading;
        }
        if !session.is_authenticated {
            return RouteDecision::RedirectToLogin {
                from: path.to_owned(),
            };
        }
        if let Some(code) = &route.permission {
            if !session.has_permission(code) {
                return RouteDecision::Forbidden {
                    redirect_to: self.forbidden_path.clone(),
                };
            }
        }
        match route.redirect_to {
            Some(to) => RouteDecision::Redirect { to: to.to_owned() },
            None => RouteDecision::Allow,
        }
    }
}

/// Shorthand for [`RouteGuard::check`] over the console route table.
///
/// The table is flattened once and shared; each call only copies the
/// forbidden path out of `config`.
pub fn check_route(session: &Session, path: &str, config: &SessionConfig) -> RouteDecision {
    RouteGuard::new(config).check(session, path)
}

/// Content-level gate: shows content only when the session holds a code.
pub struct PermissionGuard<'a> {
    session: &'a Session,
}

impl<'a> PermissionGuard<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn allows(&self, code: &PermissionCode) -> bool {
        self.session.has_permission(code)
    }

    pub fn allows_any<'c>(&self, codes: impl IntoIterator<Item = &'c PermissionCode>) -> bool {
        self.session.is_authenticated && self.session.permissions.has_any(codes)
    }

    pub fn allows_all<'c>(&self, codes: impl IntoIterator<Item = &'c PermissionCode>) -> bool {
        self.session.is_authenticated && self.session.permissions.has_all(codes)
    }

    /// `content` when permitted, otherwise `fallback`.
    pub fn render<T>(
        &self,
        code: &PermissionCode,
        content: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> T {
        if self.allows(code) { content() } else { fallback() }
    }
}
