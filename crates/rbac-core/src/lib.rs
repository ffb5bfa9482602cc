//! RBAC Console Core: domain models, error taxonomy, repository traits
//! and the group hierarchy model.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod repository;
pub mod storage;

pub use directory::{GroupDirectory, GroupDraft};
pub use error::{AuthError, ConsoleError, ConsoleResult, ErrorCode};
pub use hierarchy::{GroupTreeNode, build_tree};
pub use models::permission::{PermissionCode, PermissionSet};
pub use models::session::Session;
pub use storage::{ACCESS_TOKEN_KEY, MemorySessionStorage, SessionListener, SessionStorage};
