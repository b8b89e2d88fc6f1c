//! SQLite-backed `AccessCodeRepository` implementation using Diesel ORM.
//!
//! The `code` column carries a unique index and `user_id` a foreign key to
//! `users`; both constraints surface as typed port errors.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use crate::domain::ports::{AccessCodeRepository, AccessCodeRepositoryError};
use crate::domain::{AccessCode, AccessCodeFilter, AccessCodeId, NewAccessCode};

use super::diesel_basic_error_mapping::{AdapterError, map_basic_adapter_error};
use super::models::{AccessCodeRow, NewAccessCodeRow};
use super::schema::access_codes;
use super::store::SqliteStore;

/// Diesel-backed implementation of the `AccessCodeRepository` port.
#[derive(Clone)]
pub struct DieselAccessCodeRepository {
    store: SqliteStore,
}

impl DieselAccessCodeRepository {
    /// Create a repository over an open store.
    pub fn new(store: SqliteStore) -> Self {
        Self { store }
    }
}

fn map_error(error: AdapterError) -> AccessCodeRepositoryError {
    map_basic_adapter_error(
        error,
        |message| AccessCodeRepositoryError::query(message),
        |message| AccessCodeRepositoryError::connection(message),
    )
}

fn map_insert_error(error: AdapterError, code: &NewAccessCode) -> AccessCodeRepositoryError {
    match error.database_kind() {
        Some(DatabaseErrorKind::UniqueViolation) => {
            AccessCodeRepositoryError::duplicate_code(code.code.as_str())
        }
        Some(DatabaseErrorKind::ForeignKeyViolation) => {
            AccessCodeRepositoryError::unknown_user(code.user_id.get())
        }
        _ => map_error(error),
    }
}

fn map_missing(error: AdapterError, id: AccessCodeId) -> AccessCodeRepositoryError {
    if error.is_not_found() {
        AccessCodeRepositoryError::not_found(id.get())
    } else {
        map_error(error)
    }
}

fn decode(row: Option<AccessCodeRow>) -> Result<Option<AccessCode>, AdapterError> {
    Ok(row.map(AccessCode::try_from).transpose()?)
}

#[async_trait]
impl AccessCodeRepository for DieselAccessCodeRepository {
    async fn add(&self, code: &NewAccessCode) -> Result<AccessCodeId, AccessCodeRepositoryError> {
        let record = code.clone();
        self.store
            .transaction(move |conn| {
                let id = diesel::insert_into(access_codes::table)
                    .values(&NewAccessCodeRow::from(&record))
                    .returning(access_codes::id)
                    .get_result::<i64>(conn)?;
                Ok(AccessCodeId::new(id))
            })
            .await
            .map_err(|error| map_insert_error(error, code))
    }

    async fn find_by_id(
        &self,
        id: AccessCodeId,
    ) -> Result<Option<AccessCode>, AccessCodeRepositoryError> {
        self.store
            .transaction(move |conn| {
                let row: Option<AccessCodeRow> = access_codes::table
                    .find(id.get())
                    .select(AccessCodeRow::as_select())
                    .first(conn)
                    .optional()?;
                decode(row)
            })
            .await
            .map_err(map_error)
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AccessCode>, AccessCodeRepositoryError> {
        let code = code.to_owned();
        self.store
            .transaction(move |conn| {
                let row: Option<AccessCodeRow> = access_codes::table
                    .filter(access_codes::code.eq(&code))
                    .select(AccessCodeRow::as_select())
                    .first(conn)
                    .optional()?;
                decode(row)
            })
            .await
            .map_err(map_error)
    }

    async fn list(
        &self,
        filter: &AccessCodeFilter,
    ) -> Result<Vec<AccessCode>, AccessCodeRepositoryError> {
        let filter = *filter;
        self.store
            .transaction(move |conn| {
                let mut query = access_codes::table
                    .select(AccessCodeRow::as_select())
                    .order(access_codes::id.asc())
                    .into_boxed();
                if let Some(user_id) = filter.user_id {
                    query = query.filter(access_codes::user_id.eq(user_id.get()));
                }
                if let Some(role) = filter.role {
                    query = query.filter(access_codes::code_type.eq(role.as_str()));
                }
                if let Some(is_active) = filter.is_active {
                    query = query.filter(access_codes::is_active.eq(is_active));
                }
                let rows: Vec<AccessCodeRow> = query.load(conn)?;
                rows.into_iter()
                    .map(|row| AccessCode::try_from(row).map_err(AdapterError::from))
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_error)
    }

    async fn set_active(
        &self,
        id: AccessCodeId,
        is_active: bool,
    ) -> Result<(), AccessCodeRepositoryError> {
        self.store
            .transaction(move |conn| {
                let updated = diesel::update(access_codes::table.find(id.get()))
                    .set(access_codes::is_active.eq(is_active))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }
                Ok(())
            })
            .await
            .map_err(|error| map_missing(error, id))
    }

    async fn delete(&self, id: AccessCodeId) -> Result<(), AccessCodeRepositoryError> {
        self.store
            .transaction(move |conn| {
                let deleted = diesel::delete(access_codes::table.find(id.get())).execute(conn)?;
                if deleted == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }
                Ok(())
            })
            .await
            .map_err(|error| map_missing(error, id))
    }
}
