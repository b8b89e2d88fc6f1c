//! Outcome of presenting an access code.
//!
//! Verification never fails with an error. Every result, including internal
//! failures, is one of the [`VerificationOutcome`] variants so callers cannot
//! accidentally grant access by mishandling an error path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CodeRole, Tier, UserId};

/// Why a presented code did not verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// No record carries the presented string.
    UnknownCode,
    /// The record exists but was superseded.
    Inactive,
    /// Lookup failed unexpectedly; the check failed closed.
    LookupFailed,
}

/// Active code strings currently held by a user; empty when none is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionCodes {
    /// Active admin code, or an empty string.
    pub admin: String,
    /// Active viewer code, or an empty string.
    pub viewer: String,
}

/// Minimal identity claims handed to a downstream client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    /// Owning user.
    pub user_id: UserId,
    /// User display name.
    pub name: String,
    /// User email.
    pub email: String,
    /// Product label the tier was derived from.
    pub product: String,
}

/// Successful verification details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedAccess {
    /// Role granted, mirroring the code's type.
    pub role: CodeRole,
    /// End of validity: the user's expiry, or now plus the default window.
    pub until: DateTime<Utc>,
    /// Tier derived from the product label.
    pub tier: Tier,
    /// The user's currently active codes.
    pub codes: CompanionCodes,
    /// Identity claims.
    pub payload: IdentityClaims,
}

/// Closed set of verification results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum VerificationOutcome {
    /// The code does not grant access.
    Invalid {
        /// Failure category.
        reason: InvalidReason,
    },
    /// The code points at a user that no longer exists.
    UserNotFound {
        /// Dangling owner reference.
        user_id: UserId,
    },
    /// The owning user's paid period has ended.
    Expired {
        /// When the paid period ended.
        expired_at: DateTime<Utc>,
    },
    /// The code grants access.
    Success(VerifiedAccess),
}

impl VerificationOutcome {
    /// Shorthand for an [`VerificationOutcome::Invalid`] outcome.
    pub const fn invalid(reason: InvalidReason) -> Self {
        Self::Invalid { reason }
    }

    /// Whether access was granted.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
