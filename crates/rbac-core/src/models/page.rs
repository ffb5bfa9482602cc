//! Pagination types shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    pub page_num: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            keyword: None,
            page_num: 1,
            page_size: 20,
        }
    }
}

impl PageRequest {
    /// Query-string pairs for a GET request.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("pageNum", self.page_num.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(keyword) = &self.keyword {
            query.push(("keyword", keyword.clone()));
        }
        query
    }
}

/// Page metadata returned alongside list results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_num: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

/// A paginated result set.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub page: PageInfo,
}
