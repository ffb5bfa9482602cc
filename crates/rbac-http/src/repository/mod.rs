//! HTTP implementations of the repository traits.
//!
//! Every response is an envelope `{ base, <payload>, page? }`; `base` is
//! checked by [`ApiClient`](crate::client::ApiClient), and each repository
//! only declares the payload fields it reads.

pub mod auth;
pub mod group;
pub mod permission;
pub mod role;
pub mod user;

use rbac_core::models::page::{PageInfo, PaginatedResult};
use serde::Serialize;

pub use auth::HttpAuthGateway;
pub use group::HttpGroupRepository;
pub use permission::HttpPermissionRepository;
pub use role::HttpRoleRepository;
pub use user::HttpUserRepository;

/// Body of the batch delete endpoints.
#[derive(Serialize)]
struct IdsRequest {
    ids: Vec<String>,
}

fn paginated<T>(items: Vec<T>, page: Option<PageInfo>) -> PaginatedResult<T> {
    let page = page.unwrap_or_else(|| PageInfo {
        page_num: 1,
        page_size: u32::try_from(items.len()).unwrap_or(u32::MAX),
        total: u64::try_from(items.len()).unwrap_or(u64::MAX),
        total_pages: 1,
    });
    PaginatedResult { items, page }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_page_info_describes_a_single_page() {
        let result = paginated(vec!["a", "b", "c"], None);
        assert_eq!(result.page.page_num, 1);
        assert_eq!(result.page.page_size, 3);
        assert_eq!(result.page.total, 3);
        assert_eq!(result.page.total_pages, 1);
    }
}
