//! Driving port for checking a presented access code.

use async_trait::async_trait;

use crate::domain::VerificationOutcome;

/// Domain use-case port for verifying access codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeVerificationQuery: Send + Sync {
    /// Resolve role, validity, tier and companion codes for `code`.
    ///
    /// Never fails; unexpected problems surface as
    /// [`VerificationOutcome::Invalid`].
    async fn verify(&self, code: &str) -> VerificationOutcome;
}
