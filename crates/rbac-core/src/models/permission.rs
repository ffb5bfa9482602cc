//! Permission domain model and the permission code newtype.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConsoleError;

/// Stable identifier used for every authorization check, e.g. `user:create`.
///
/// Codes are compared by value; the storage id of the permission record
/// never takes part in authorization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    /// Build a code from a literal. Only used for the compile-time catalog,
    /// whose entries are checked by tests.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Parse a code as stored by the server: non-empty, made only of ASCII
    /// letters, digits and `_ : . -`. Codes without a `:` (e.g. `dashboard`)
    /// are accepted.
    pub fn parse(raw: &str) -> Result<Self, ConsoleError> {
        if raw.is_empty() {
            return Err(invalid_code(raw, "empty code"));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')))
        {
            return Err(invalid_code(raw, &format!("unexpected character {c:?}")));
        }
        Ok(Self(Cow::Owned(raw.to_owned())))
    }

    /// Parse a code that must have the `resource:action` shape used by the
    /// console's own catalog.
    pub fn parse_scoped(raw: &str) -> Result<Self, ConsoleError> {
        let code = Self::parse(raw)?;
        match raw.split_once(':') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() => Ok(code),
            Some(_) => Err(invalid_code(raw, "empty segment")),
            None => Err(invalid_code(raw, "expected `resource:action`")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `:` (e.g. `user`), or the whole code when
    /// it has none.
    pub fn resource(&self) -> &str {
        self.0.split_once(':').map(|(r, _)| r).unwrap_or(&self.0)
    }
}

fn invalid_code(raw: &str, reason: &str) -> ConsoleError {
    ConsoleError::validation("code", format!("invalid permission code `{raw}`: {reason}"))
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PermissionCode {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PermissionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PermissionCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    pub code: PermissionCode,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub update_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermission {
    pub code: PermissionCode,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermission {
    pub id: String,
    pub code: PermissionCode,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Filters for the permission list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ListPermissions {
    pub code: Option<String>,
    pub page: super::page::PageRequest,
}

/// The flat, deduplicated set of codes a session may exercise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet(BTreeSet<PermissionCode>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, code: &PermissionCode) -> bool {
        self.0.contains(code)
    }

    pub fn has_any<'a>(&self, codes: impl IntoIterator<Item = &'a PermissionCode>) -> bool {
        codes.into_iter().any(|c| self.has(c))
    }

    pub fn has_all<'a>(&self, codes: impl IntoIterator<Item = &'a PermissionCode>) -> bool {
        codes.into_iter().all(|c| self.has(c))
    }

    pub fn insert(&mut self, code: PermissionCode) -> bool {
        self.0.insert(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.0.iter()
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionCode>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<PermissionCode> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionCode>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> PermissionCode {
        PermissionCode::parse(raw).unwrap()
    }

    #[test]
    fn parses_resource_action_codes() {
        let c = code("user:create");
        assert_eq!(c.as_str(), "user:create");
        assert_eq!(c.resource(), "user");
    }

    #[test]
    fn accepts_codes_without_a_resource() {
        for raw in ["dashboard", "report.export", "audit-log_v2"] {
            assert_eq!(code(raw).as_str(), raw);
        }
        assert_eq!(code("dashboard").resource(), "dashboard");
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in ["", "user: create", "user/create", "usér:list"] {
            assert!(PermissionCode::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn scoped_parse_requires_resource_and_action() {
        assert!(PermissionCode::parse_scoped("user:create").is_ok());
        for raw in ["user", ":create", "user:", ""] {
            assert!(
                PermissionCode::parse_scoped(raw).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn static_and_parsed_codes_compare_equal() {
        const LIST: PermissionCode = PermissionCode::from_static("user:list");
        assert_eq!(LIST, code("user:list"));

        let set: PermissionSet = [code("user:list")].into_iter().collect();
        assert!(set.has(&LIST));
    }

    #[test]
    fn permission_set_deduplicates() {
        let set: PermissionSet = ["a:x", "b:y", "a:x"].into_iter().map(code).collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn any_and_all_checks() {
        let set: PermissionSet = ["user:list", "user:view"].into_iter().map(code).collect();
        let view = code("user:view");
        let delete = code("user:delete");

        assert!(set.has_any([&view, &delete]));
        assert!(!set.has_all([&view, &delete]));
        assert!(set.has_all([&view]));
        assert!(!set.has_any(std::iter::empty()));
        assert!(set.has_all(std::iter::empty()));
    }

    #[test]
    fn deserializes_server_codes_without_a_colon() {
        let permission: Permission =
            serde_json::from_str(r#"{"id": "1", "code": "dashboard", "name": "Dashboard"}"#)
                .unwrap();
        assert_eq!(permission.code.as_str(), "dashboard");
    }

    #[test]
    fn deserializing_a_bad_code_fails() {
        let result: Result<Permission, _> =
            serde_json::from_str(r#"{"id": "1", "code": "has space", "name": "x"}"#);
        assert!(result.is_err());
    }
}
