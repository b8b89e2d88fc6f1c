//! Port for the `codes` collection of the record store.
//!
//! The collection carries a unique index on the code string and secondary
//! indexes on owner, role and activity flag. Adapters enforce code uniqueness
//! as a hard constraint and report violations as
//! [`AccessCodeRepositoryError::DuplicateCode`].

use async_trait::async_trait;

use crate::domain::{AccessCode, AccessCodeFilter, AccessCodeId, NewAccessCode};

use super::define_port_error;

define_port_error! {
    /// Errors raised by access code repository adapters.
    pub enum AccessCodeRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "access code repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "access code repository query failed: {message}",
        /// The code string is already stored.
        DuplicateCode { code: String } => "access code already exists: {code}",
        /// The referenced owner does not exist.
        UnknownUser { user_id: i64 } => "access code owner {user_id} does not exist",
        /// No access code exists with the identifier.
        NotFound { id: i64 } => "access code {id} not found",
    }
}

/// Persistence port for access codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessCodeRepository: Send + Sync {
    /// Insert a code and return the identifier the store assigned.
    async fn add(&self, code: &NewAccessCode) -> Result<AccessCodeId, AccessCodeRepositoryError>;

    /// Fetch a code by identifier.
    async fn find_by_id(
        &self,
        id: AccessCodeId,
    ) -> Result<Option<AccessCode>, AccessCodeRepositoryError>;

    /// Fetch a code by its exact string, active or not.
    async fn find_by_code(&self, code: &str)
    -> Result<Option<AccessCode>, AccessCodeRepositoryError>;

    /// List codes matching `filter`, oldest first.
    async fn list(
        &self,
        filter: &AccessCodeFilter,
    ) -> Result<Vec<AccessCode>, AccessCodeRepositoryError>;

    /// Flip the activity flag of one code.
    async fn set_active(
        &self,
        id: AccessCodeId,
        is_active: bool,
    ) -> Result<(), AccessCodeRepositoryError>;

    /// Hard-delete one code.
    async fn delete(&self, id: AccessCodeId) -> Result<(), AccessCodeRepositoryError>;
}
