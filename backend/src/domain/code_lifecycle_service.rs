//! Access code lifecycle service.
//!
//! Implements [`AccessCodeCommand`]: retire a user's active codes, generate a
//! unique candidate per role, persist the new pair, and read each record back
//! before reporting success.
//!
//! The sequence is not one transaction. Concurrent readers may observe the
//! user with no active codes between the retire and persist steps, and two
//! concurrent regenerations for the same user are not coordinated.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{AccessCodeCommand, AccessCodeRepository, AccessCodeRepositoryError};
use crate::domain::{
    AccessCodeFilter, AccessCodeId, CodeGenerator, CodeRole, Error, IssuedCodes, NewAccessCode,
    ReadBackPolicy, Sleeper, TokioSleeper, UserId, read_back,
};

/// What to do when every generated candidate collides with a stored code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CandidateExhaustion {
    /// Fail the regeneration with [`crate::domain::ErrorCode::CodeSpaceExhausted`].
    #[default]
    Fail,
    /// Persist the last (colliding) candidate anyway. The store's unique index
    /// then rejects the insert and the regeneration fails with a conflict
    /// after the old codes were already retired.
    ProceedWithLastCandidate,
}

/// Lifecycle tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLifecycleConfig {
    /// Candidates generated per role before giving up.
    pub max_generation_attempts: u32,
    /// Behaviour once `max_generation_attempts` is spent.
    pub exhaustion: CandidateExhaustion,
    /// Read-back confirmation policy for freshly written codes.
    pub read_back: ReadBackPolicy,
}

impl Default for CodeLifecycleConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: 10,
            exhaustion: CandidateExhaustion::default(),
            read_back: ReadBackPolicy::default(),
        }
    }
}

pub(crate) fn map_code_repository_error(error: AccessCodeRepositoryError) -> Error {
    match error {
        AccessCodeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("access code repository unavailable: {message}"))
        }
        AccessCodeRepositoryError::Query { message } => {
            Error::internal(format!("access code repository error: {message}"))
        }
        AccessCodeRepositoryError::DuplicateCode { code } => {
            Error::conflict(format!("access code already exists: {code}"))
        }
        AccessCodeRepositoryError::UnknownUser { user_id } => {
            Error::not_found(format!("user {user_id} not found"))
        }
        AccessCodeRepositoryError::NotFound { id } => {
            Error::not_found(format!("access code {id} not found"))
        }
    }
}

/// Access code lifecycle service implementing [`AccessCodeCommand`].
#[derive(Clone)]
pub struct CodeLifecycleService<C> {
    codes: Arc<C>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    config: CodeLifecycleConfig,
}

impl<C> CodeLifecycleService<C> {
    /// Create a service sleeping on the Tokio timer between read-back probes.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use access_codes::domain::{CodeLifecycleConfig, CodeLifecycleService, RandomCodeGenerator};
    /// # use access_codes::outbound::persistence::{SqliteStore, StoreConfig};
    /// # use mockable::DefaultClock;
    /// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = SqliteStore::open(StoreConfig::in_memory()).await?;
    /// let clock = Arc::new(DefaultClock);
    /// let _service = CodeLifecycleService::new(
    ///     Arc::new(store.access_codes()),
    ///     Arc::new(RandomCodeGenerator::new(clock.clone())),
    ///     clock,
    ///     CodeLifecycleConfig::default(),
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(
        codes: Arc<C>,
        generator: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
        config: CodeLifecycleConfig,
    ) -> Self {
        Self {
            codes,
            generator,
            clock,
            sleeper: Arc::new(TokioSleeper),
            config,
        }
    }

    /// Replace the sleeper used between read-back probes.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

impl<C> CodeLifecycleService<C>
where
    C: AccessCodeRepository,
{
    async fn retire_active_codes(&self, user_id: UserId) -> Result<usize, Error> {
        let active = self
            .codes
            .list(&AccessCodeFilter::active_for_user(user_id))
            .await
            .map_err(map_code_repository_error)?;
        for code in &active {
            self.codes
                .set_active(code.id, false)
                .await
                .map_err(map_code_repository_error)?;
        }
        Ok(active.len())
    }

    async fn unique_candidate(&self, role: CodeRole) -> Result<String, Error> {
        let attempts = self.config.max_generation_attempts.max(1);
        let mut last_candidate = None;

        for attempt in 1..=attempts {
            let candidate = self.generator.generate(role);
            let existing = self
                .codes
                .find_by_code(&candidate)
                .await
                .map_err(map_code_repository_error)?;
            if existing.is_none() {
                return Ok(candidate);
            }
            warn!(%role, attempt, "generated access code collides with a stored code");
            last_candidate = Some(candidate);
        }

        match (self.config.exhaustion, last_candidate) {
            (CandidateExhaustion::ProceedWithLastCandidate, Some(candidate)) => {
                warn!(
                    %role,
                    attempts,
                    "no unused access code found; proceeding with last candidate"
                );
                Ok(candidate)
            }
            _ => Err(
                Error::code_space_exhausted(format!(
                    "no unused {role} access code found after {attempts} attempts"
                ))
                .with_details(json!({ "role": role, "attempts": attempts })),
            ),
        }
    }

    async fn issue(&self, user_id: UserId, role: CodeRole, code: &str) -> Result<AccessCodeId, Error> {
        let record = NewAccessCode {
            user_id,
            code: code.to_owned(),
            role,
            is_active: true,
            created_at: self.clock.utc(),
            expires_at: None,
        };
        self.codes
            .add(&record)
            .await
            .map_err(map_code_repository_error)
    }

    async fn probe_persisted(
        &self,
        code: &str,
        id: AccessCodeId,
    ) -> Result<Option<AccessCodeId>, AccessCodeRepositoryError> {
        if let Some(found) = self.codes.find_by_code(code).await? {
            return Ok(Some(found.id));
        }
        Ok(self
            .codes
            .find_by_id(id)
            .await?
            .filter(|found| found.code == code)
            .map(|found| found.id))
    }

    async fn confirm_persisted(
        &self,
        role: CodeRole,
        code: &str,
        id: AccessCodeId,
    ) -> Result<(), Error> {
        let found = read_back(self.config.read_back, self.sleeper.as_ref(), || {
            self.probe_persisted(code, id)
        })
        .await
        .map_err(map_code_repository_error)?;

        match found {
            Some(_) => Ok(()),
            None => Err(Error::persistence_verification_failed(format!(
                "new {role} access code could not be read back"
            ))
            .with_details(json!({ "role": role, "code_id": id }))),
        }
    }
}

#[async_trait]
impl<C> AccessCodeCommand for CodeLifecycleService<C>
where
    C: AccessCodeRepository,
{
    async fn regenerate_codes(&self, user_id: UserId) -> Result<IssuedCodes, Error> {
        let retired = self.retire_active_codes(user_id).await?;

        let admin_code = self.unique_candidate(CodeRole::Admin).await?;
        let viewer_code = self.unique_candidate(CodeRole::Viewer).await?;

        let admin_id = self.issue(user_id, CodeRole::Admin, &admin_code).await?;
        let viewer_id = self.issue(user_id, CodeRole::Viewer, &viewer_code).await?;

        self.confirm_persisted(CodeRole::Admin, &admin_code, admin_id)
            .await?;
        self.confirm_persisted(CodeRole::Viewer, &viewer_code, viewer_id)
            .await?;

        info!(%user_id, retired, "issued new access codes");
        Ok(IssuedCodes {
            admin_code,
            viewer_code,
        })
    }
}

#[cfg(test)]
#[path = "code_lifecycle_service_tests.rs"]
mod tests;
