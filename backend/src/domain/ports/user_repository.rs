//! Port for the `users` collection of the record store.
//!
//! Every method is one implicit transaction in the adapter. Deleting a user
//! cascades to the user's access codes inside that same transaction.

use async_trait::async_trait;

use crate::domain::{NewUser, User, UserChanges, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another user already holds the email address.
        DuplicateEmail { email: String } => "email already registered: {email}",
        /// No user exists with the identifier.
        NotFound { id: i64 } => "user {id} not found",
    }
}

/// Persistence port for user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return the identifier the store assigned.
    async fn add(&self, user: &NewUser) -> Result<UserId, UserRepositoryError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Fetch a user by exact email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError>;

    /// List every user ordered by identifier.
    async fn list(&self) -> Result<Vec<User>, UserRepositoryError>;

    /// Load the user, merge `changes`, stamp `updated_at`, and store it.
    ///
    /// Returns the merged record.
    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<User, UserRepositoryError>;

    /// Delete the user and every access code it owns.
    async fn delete(&self, id: UserId) -> Result<(), UserRepositoryError>;
}
