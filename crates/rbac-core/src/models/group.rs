//! Group domain model.
//!
//! Groups form a four-level organisational hierarchy
//! (hospital → campus → department → team). Structural rules live in
//! [`crate::hierarchy`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::PageRequest;

/// Position of a group in the fixed taxonomy. Encoded as `1..=4` on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GroupType {
    Hospital,
    Campus,
    Department,
    Team,
}

impl GroupType {
    pub const ALL: [GroupType; 4] = [
        GroupType::Hospital,
        GroupType::Campus,
        GroupType::Department,
        GroupType::Team,
    ];

    /// Parent types a group of this type may hang under. Empty for
    /// hospitals, which are always roots.
    pub fn allowed_parent_types(self) -> &'static [GroupType] {
        match self {
            GroupType::Hospital => &[],
            GroupType::Campus => &[GroupType::Hospital],
            GroupType::Department => &[GroupType::Hospital, GroupType::Campus],
            GroupType::Team => &[GroupType::Department],
        }
    }

    pub fn is_allowed_parent(self, parent: GroupType) -> bool {
        self.allowed_parent_types().contains(&parent)
    }

    pub fn requires_parent(self) -> bool {
        !self.allowed_parent_types().is_empty()
    }

    /// Depth in the taxonomy, starting at 1 for hospitals.
    pub fn level(self) -> u8 {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            GroupType::Hospital => "Hospital",
            GroupType::Campus => "Campus",
            GroupType::Department => "Department",
            GroupType::Team => "Team",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for GroupType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GroupType::Hospital),
            2 => Ok(GroupType::Campus),
            3 => Ok(GroupType::Department),
            4 => Ok(GroupType::Team),
            other => Err(format!("unknown group type {other}")),
        }
    }
}

impl From<GroupType> for u8 {
    fn from(value: GroupType) -> Self {
        match value {
            GroupType::Hospital => 1,
            GroupType::Campus => 2,
            GroupType::Department => 3,
            GroupType::Team => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub is_enabled: bool,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroup {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroup {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub is_enabled: bool,
}

/// Filters for the group list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListGroups {
    pub code: Option<String>,
    pub is_enabled: Option<bool>,
    pub parent_id: Option<String>,
    pub group_type: Option<GroupType>,
    pub page: PageRequest,
}

/// Assigns roles to, or removes roles from, one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRolesChange {
    pub group_id: String,
    pub role_ids: Vec<String>,
}
