//! RBAC Console Session: the owned session state container, permission
//! resolution, the login/logout/verify lifecycle and navigation guards.

pub mod config;
pub mod guard;
pub mod resolver;
pub mod service;
pub mod store;

pub use config::SessionConfig;
pub use guard::{PermissionGuard, RouteDecision, RouteGuard, check_route};
pub use resolver::PermissionResolver;
pub use service::SessionService;
pub use store::{SessionEvent, SessionStore};
