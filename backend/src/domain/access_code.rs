//! Access code records and their role classes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Role granted to whoever presents an access code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRole {
    /// Full control over the owning user's subscription.
    Admin,
    /// Read-only access.
    Viewer,
}

impl CodeRole {
    /// Both roles, in the order codes are issued.
    pub const ALL: [Self; 2] = [Self::Admin, Self::Viewer];

    /// Prefix placed in front of every code of this role.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Admin => "ADM-",
            Self::Viewer => "VWR-",
        }
    }

    /// Stored and displayed form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
        }
    }
}

impl fmt::Display for CodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown access code role: {0}")]
pub struct UnknownCodeRole(pub String);

impl FromStr for CodeRole {
    type Err = UnknownCodeRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Self::Admin),
            "viewer" => Ok(Self::Viewer),
            other => Err(UnknownCodeRole(other.to_owned())),
        }
    }
}

/// Store-assigned access code identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessCodeId(i64);

impl AccessCodeId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccessCodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted access code.
///
/// ## Invariants
/// - `code` is unique across every record, active or not.
/// - At most one active record per (`user_id`, `role`); maintained by
///   [`crate::domain::CodeLifecycleService`], not by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCode {
    /// Store-assigned identifier.
    pub id: AccessCodeId,
    /// Owning user.
    pub user_id: UserId,
    /// Shareable code string.
    pub code: String,
    /// Role granted by the code.
    #[serde(rename = "type")]
    pub role: CodeRole,
    /// Whether the code currently verifies.
    pub is_active: bool,
    /// When the code was issued.
    pub created_at: DateTime<Utc>,
    /// Optional hard expiry recorded with the code.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Access code awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessCode {
    /// Owning user.
    pub user_id: UserId,
    /// Shareable code string.
    pub code: String,
    /// Role granted by the code.
    pub role: CodeRole,
    /// Whether the code is inserted active.
    pub is_active: bool,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// Optional hard expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Secondary-index filter used when listing access codes.
///
/// Unset fields do not constrain the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessCodeFilter {
    /// Restrict to one owner.
    pub user_id: Option<UserId>,
    /// Restrict to one role.
    pub role: Option<CodeRole>,
    /// Restrict by activity flag.
    pub is_active: Option<bool>,
}

impl AccessCodeFilter {
    /// Every active code owned by `user_id`.
    pub fn active_for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            role: None,
            is_active: Some(true),
        }
    }

    /// Every code owned by `user_id`, active or not.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Whether `code` satisfies the filter.
    pub fn matches(&self, code: &AccessCode) -> bool {
        self.user_id.is_none_or(|user_id| code.user_id == user_id)
            && self.role.is_none_or(|role| code.role == role)
            && self.is_active.is_none_or(|active| code.is_active == active)
    }
}

/// Pair of codes returned by a successful regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCodes {
    /// Newly active admin code.
    pub admin_code: String,
    /// Newly active viewer code.
    pub viewer_code: String,
}

#[cfg(test)]
mod tests {
    //! Unit tests for access code roles and filters.

    use super::*;
    use rstest::rstest;

    fn code(user_id: i64, role: CodeRole, is_active: bool) -> AccessCode {
        AccessCode {
            id: AccessCodeId::new(1),
            user_id: UserId::new(user_id),
            code: format!("{}AAAA0000", role.prefix()),
            role,
            is_active,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[rstest]
    #[case(CodeRole::Admin, "ADM-", "admin")]
    #[case(CodeRole::Viewer, "VWR-", "viewer")]
    fn role_labels(#[case] role: CodeRole, #[case] prefix: &str, #[case] label: &str) {
        assert_eq!(role.prefix(), prefix);
        assert_eq!(role.to_string(), label);
        assert_eq!(label.parse::<CodeRole>(), Ok(role));
    }

    #[rstest]
    fn unknown_role_is_rejected() {
        let err = "owner".parse::<CodeRole>().expect_err("unknown role");
        assert_eq!(err.to_string(), "unknown access code role: owner");
    }

    #[rstest]
    fn default_filter_matches_everything() {
        let filter = AccessCodeFilter::default();
        assert!(filter.matches(&code(1, CodeRole::Admin, true)));
        assert!(filter.matches(&code(2, CodeRole::Viewer, false)));
    }

    #[rstest]
    fn active_for_user_filter_narrows_by_owner_and_flag() {
        let filter = AccessCodeFilter::active_for_user(UserId::new(1));
        assert!(filter.matches(&code(1, CodeRole::Viewer, true)));
        assert!(!filter.matches(&code(1, CodeRole::Viewer, false)));
        assert!(!filter.matches(&code(2, CodeRole::Viewer, true)));
    }

    #[rstest]
    fn role_filter_narrows_by_type() {
        let filter = AccessCodeFilter {
            role: Some(CodeRole::Admin),
            ..AccessCodeFilter::for_user(UserId::new(1))
        };
        assert!(filter.matches(&code(1, CodeRole::Admin, false)));
        assert!(!filter.matches(&code(1, CodeRole::Viewer, false)));
    }

    #[rstest]
    fn serialises_role_under_type_key() {
        let value = serde_json::to_value(code(1, CodeRole::Viewer, true)).expect("serialise");
        assert_eq!(value["type"], "viewer");
        assert_eq!(value["isActive"], true);
    }
}
