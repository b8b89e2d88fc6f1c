//! Driving port for issuing access codes.

use async_trait::async_trait;

use crate::domain::{Error, IssuedCodes, UserId};

/// Domain use-case port for replacing a user's access codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessCodeCommand: Send + Sync {
    /// Retire the user's active codes and issue a fresh admin/viewer pair.
    ///
    /// Fails with [`crate::domain::ErrorCode::PersistenceVerificationFailed`]
    /// when the new codes cannot be read back; the writes are not rolled back
    /// and the caller should regenerate again.
    async fn regenerate_codes(&self, user_id: UserId) -> Result<IssuedCodes, Error>;
}
