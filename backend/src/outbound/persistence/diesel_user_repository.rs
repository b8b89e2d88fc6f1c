//! SQLite-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{NewUser, User, UserChanges, UserId};

use super::diesel_basic_error_mapping::{AdapterError, map_basic_adapter_error};
use super::models::{NewUserRow, UserRow, UserUpdate};
use super::schema::{access_codes, users};
use super::store::SqliteStore;

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    store: SqliteStore,
}

impl DieselUserRepository {
    /// Create a repository over an open store.
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn map_error(error: AdapterError) -> UserRepositoryError {
    map_basic_adapter_error(
        error,
        |message| UserRepositoryError::query(message),
        |message| UserRepositoryError::connection(message),
    )
}

/// Map a failed write, translating the unique email index.
fn map_write_error(error: AdapterError, email: &str) -> UserRepositoryError {
    match error.database_kind() {
        Some(DatabaseErrorKind::UniqueViolation) => UserRepositoryError::duplicate_email(email),
        _ => map_error(error),
    }
}

fn map_missing(error: AdapterError, id: UserId) -> UserRepositoryError {
    if error.is_not_found() {
        UserRepositoryError::not_found(id.get())
    } else {
        map_error(error)
    }
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn add(&self, user: &NewUser) -> Result<UserId, UserRepositoryError> {
        let now = self.store.clock().utc();
        let record = user.clone();
        self.store
            .transaction(move |conn| {
                let id = diesel::insert_into(users::table)
                    .values(&NewUserRow::new(&record, now))
                    .returning(users::id)
                    .get_result::<i64>(conn)?;
                Ok(UserId::new(id))
            })
            .await
            .map_err(|error| map_write_error(error, &user.email))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        self.store
            .transaction(move |conn| {
                let row: Option<UserRow> = users::table
                    .find(id.get())
                    .select(UserRow::as_select())
                    .first(conn)
                    .optional()?;
                Ok(row.map(User::try_from).transpose()?)
            })
            .await
            .map_err(map_error)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let email = email.to_owned();
        self.store
            .transaction(move |conn| {
                let row: Option<UserRow> = users::table
                    .filter(users::email.eq(&email))
                    .select(UserRow::as_select())
                    .first(conn)
                    .optional()?;
                Ok(row.map(User::try_from).transpose()?)
            })
            .await
            .map_err(map_error)
    }

    async fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        self.store
            .transaction(|conn| {
                let rows: Vec<UserRow> = users::table
                    .order(users::id.asc())
                    .select(UserRow::as_select())
                    .load(conn)?;
                rows.into_iter()
                    .map(|row| User::try_from(row).map_err(AdapterError::from))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_error)
    }

    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<User, UserRepositoryError> {
        let now = self.store.clock().utc();
        let changes = changes.clone();
        let email = changes.email.clone();
        self.store
            .transaction(move |conn| {
                let row: UserRow = users::table
                    .find(id.get())
                    .select(UserRow::as_select())
                    .first(conn)?;
                let mut user = User::try_from(row)?;
                changes.apply_to(&mut user, now);
                diesel::update(users::table.find(id.get()))
                    .set(&UserUpdate::from(&user))
                    .execute(conn)?;
                Ok(user)
            })
            .await
            .map_err(|error| match email.as_deref() {
                Some(email) if !error.is_not_found() => map_write_error(error, email),
                _ => map_missing(error, id),
            })
    }

    async fn delete(&self, id: UserId) -> Result<(), UserRepositoryError> {
        self.store
            .transaction(move |conn| {
                diesel::delete(access_codes::table.filter(access_codes::user_id.eq(id.get())))
                    .execute(conn)?;
                let deleted = diesel::delete(users::table.find(id.get())).execute(conn)?;
                if deleted == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }
                Ok(())
            })
            .await
            .map_err(|error| map_missing(error, id))
    }
}
