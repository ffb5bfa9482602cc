//! RBAC Console HTTP: the REST client and HTTP implementations of the
//! console's repository traits.

mod barrier;
pub mod client;
pub mod config;
pub mod repository;

pub use client::{ApiClient, ApiRequest};
pub use config::HttpConfig;
pub use repository::{
    HttpAuthGateway, HttpGroupRepository, HttpPermissionRepository, HttpRoleRepository,
    HttpUserRepository,
};
