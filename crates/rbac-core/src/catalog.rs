//! Permission codes the console gates navigation and actions on.

use crate::models::permission::PermissionCode;

pub const USER_LIST: PermissionCode = PermissionCode::from_static("user:list");
pub const USER_CREATE: PermissionCode = PermissionCode::from_static("user:create");
pub const USER_UPDATE: PermissionCode = PermissionCode::from_static("user:update");
pub const USER_VIEW: PermissionCode = PermissionCode::from_static("user:view");

pub const GROUP_LIST: PermissionCode = PermissionCode::from_static("group:list");
pub const GROUP_CREATE: PermissionCode = PermissionCode::from_static("group:create");
pub const GROUP_UPDATE: PermissionCode = PermissionCode::from_static("group:update");
pub const GROUP_VIEW: PermissionCode = PermissionCode::from_static("group:view");

pub const PERMISSION_LIST: PermissionCode = PermissionCode::from_static("permission:list");
pub const PERMISSION_CREATE: PermissionCode = PermissionCode::from_static("permission:create");
pub const PERMISSION_UPDATE: PermissionCode = PermissionCode::from_static("permission:update");

pub const ROLE_LIST: PermissionCode = PermissionCode::from_static("role:list");

/// Every code above, in declaration order.
pub const ALL: &[PermissionCode] = &[
    USER_LIST,
    USER_CREATE,
    USER_UPDATE,
    USER_VIEW,
    GROUP_LIST,
    GROUP_CREATE,
    GROUP_UPDATE,
    GROUP_VIEW,
    PERMISSION_LIST,
    PERMISSION_CREATE,
    PERMISSION_UPDATE,
    ROLE_LIST,
];

pub fn is_known(code: &PermissionCode) -> bool {
    ALL.contains(code)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_entries_are_well_formed() {
        for code in ALL {
            let reparsed = PermissionCode::parse_scoped(code.as_str()).unwrap();
            assert_eq!(&reparsed, code);
        }
    }

    #[test]
    fn catalog_entries_are_unique() {
        let unique: HashSet<&str> = ALL.iter().map(PermissionCode::as_str).collect();
        assert_eq!(unique.len(), ALL.len());
    }

    #[test]
    fn unknown_codes_are_reported() {
        assert!(is_known(&PermissionCode::parse("role:list").unwrap()));
        assert!(!is_known(&PermissionCode::parse("role:lsit").unwrap()));
    }
}
