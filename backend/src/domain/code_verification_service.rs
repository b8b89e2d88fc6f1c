//! Access code verification service.
//!
//! Resolves a presented code to a [`VerificationOutcome`]. Store failures never
//! escape: they are logged and reported as
//! [`InvalidReason::LookupFailed`], so a broken store denies access.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::ports::{
    AccessCodeRepository, AccessCodeRepositoryError, CodeVerificationQuery, UserRepository,
    UserRepositoryError,
};
use crate::domain::{
    AccessCodeFilter, CodeRole, CompanionCodes, IdentityClaims, InvalidReason, Tier, User,
    UserId, VerificationOutcome, VerifiedAccess,
};

/// Verification tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeVerificationConfig {
    /// Validity granted to users without an expiry date, counted from now.
    pub default_validity: TimeDelta,
}

impl Default for CodeVerificationConfig {
    fn default() -> Self {
        Self {
            default_validity: TimeDelta::days(180),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum LookupError {
    #[error(transparent)]
    Codes(#[from] AccessCodeRepositoryError),
    #[error(transparent)]
    Users(#[from] UserRepositoryError),
}

/// Verification service implementing [`CodeVerificationQuery`].
#[derive(Clone)]
pub struct CodeVerificationService<U, C> {
    users: Arc<U>,
    codes: Arc<C>,
    clock: Arc<dyn Clock>,
    config: CodeVerificationConfig,
}

impl<U, C> CodeVerificationService<U, C> {
    /// Create a verifier over the given collections.
    pub fn new(
        users: Arc<U>,
        codes: Arc<C>,
        clock: Arc<dyn Clock>,
        config: CodeVerificationConfig,
    ) -> Self {
        Self {
            users,
            codes,
            clock,
            config,
        }
    }
}

impl<U, C> CodeVerificationService<U, C>
where
    U: UserRepository,
    C: AccessCodeRepository,
{
    async fn evaluate(&self, code: &str) -> Result<VerificationOutcome, LookupError> {
        let Some(record) = self.codes.find_by_code(code).await? else {
            return Ok(VerificationOutcome::invalid(InvalidReason::UnknownCode));
        };
        if !record.is_active {
            return Ok(VerificationOutcome::invalid(InvalidReason::Inactive));
        }

        let Some(user) = self.users.find_by_id(record.user_id).await? else {
            return Ok(VerificationOutcome::UserNotFound {
                user_id: record.user_id,
            });
        };

        let now = self.clock.utc();
        if let Some(expired_at) = user.expiry_date.filter(|_| user.is_expired_at(now)) {
            return Ok(VerificationOutcome::Expired { expired_at });
        }

        let codes = self.companion_codes(user.id).await?;
        Ok(VerificationOutcome::Success(VerifiedAccess {
            role: record.role,
            until: self.valid_until(&user, now),
            tier: Tier::from_product(&user.product),
            codes,
            payload: IdentityClaims {
                user_id: user.id,
                name: user.name,
                email: user.email,
                product: user.product,
            },
        }))
    }

    /// Newest active code per role; listings come back oldest first.
    async fn companion_codes(&self, user_id: UserId) -> Result<CompanionCodes, LookupError> {
        let active = self
            .codes
            .list(&AccessCodeFilter::active_for_user(user_id))
            .await?;
        let mut companions = CompanionCodes::default();
        for code in active {
            match code.role {
                CodeRole::Admin => companions.admin = code.code,
                CodeRole::Viewer => companions.viewer = code.code,
            }
        }
        Ok(companions)
    }

    fn valid_until(&self, user: &User, now: DateTime<Utc>) -> DateTime<Utc> {
        user.expiry_date.unwrap_or_else(|| {
            now.checked_add_signed(self.config.default_validity)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        })
    }
}

#[async_trait]
impl<U, C> CodeVerificationQuery for CodeVerificationService<U, C>
where
    U: UserRepository,
    C: AccessCodeRepository,
{
    async fn verify(&self, code: &str) -> VerificationOutcome {
        let code = code.trim();
        if code.is_empty() {
            debug!("blank access code presented");
            return VerificationOutcome::invalid(InvalidReason::UnknownCode);
        }

        match self.evaluate(code).await {
            Ok(outcome) => {
                debug!(granted = outcome.is_success(), "access code verified");
                outcome
            }
            Err(error) => {
                warn!(%error, "access code lookup failed; denying access");
                VerificationOutcome::invalid(InvalidReason::LookupFailed)
            }
        }
    }
}

#[cfg(test)]
#[path = "code_verification_service_tests.rs"]
mod tests;
