//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain records are
//! fallible because timestamps and roles are stored as plain scalars.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    AccessCode, AccessCodeId, CodeRole, NewAccessCode, NewUser, UnknownCodeRole, User, UserId,
};

use super::schema::{access_codes, users};

/// A stored value that does not decode into a domain record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum MalformedRow {
    #[error("column {column} holds an out-of-range timestamp: {millis}")]
    Timestamp { column: &'static str, millis: i64 },
    #[error(transparent)]
    Role(#[from] UnknownCodeRole),
}

pub(crate) fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

fn from_millis(column: &'static str, millis: i64) -> Result<DateTime<Utc>, MalformedRow> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(MalformedRow::Timestamp { column, millis })
}

fn from_optional_millis(
    column: &'static str,
    millis: Option<i64>,
) -> Result<Option<DateTime<Utc>>, MalformedRow> {
    millis.map(|value| from_millis(column, value)).transpose()
}

// ---------------------------------------------------------------------------
// User models
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub product: String,
    pub purchase_date: i64,
    pub expiry_date: Option<i64>,
    pub amount: i64,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = MalformedRow;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            purchase_date: from_millis("purchase_date", row.purchase_date)?,
            expiry_date: from_optional_millis("expiry_date", row.expiry_date)?,
            created_at: from_millis("created_at", row.created_at)?,
            updated_at: from_millis("updated_at", row.updated_at)?,
            name: row.name,
            email: row.email,
            phone: row.phone,
            product: row.product,
            amount: row.amount,
            status: row.status,
        })
    }
}

/// Insertable struct for creating new user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub product: &'a str,
    pub purchase_date: i64,
    pub expiry_date: Option<i64>,
    pub amount: i64,
    pub status: &'a str,
    pub created_at: i64,
    pub updated_at: i64,
}

impl<'a> NewUserRow<'a> {
    pub(crate) fn new(user: &'a NewUser, now: DateTime<Utc>) -> Self {
        Self {
            name: &user.name,
            email: &user.email,
            phone: &user.phone,
            product: &user.product,
            purchase_date: to_millis(user.purchase_date),
            expiry_date: user.expiry_date.map(to_millis),
            amount: user.amount,
            status: &user.status,
            created_at: to_millis(now),
            updated_at: to_millis(now),
        }
    }
}

/// Changeset writing every mutable user column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserUpdate<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub product: &'a str,
    pub purchase_date: i64,
    pub expiry_date: Option<i64>,
    pub amount: i64,
    pub status: &'a str,
    pub updated_at: i64,
}

impl<'a> From<&'a User> for UserUpdate<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            name: &user.name,
            email: &user.email,
            phone: &user.phone,
            product: &user.product,
            purchase_date: to_millis(user.purchase_date),
            expiry_date: user.expiry_date.map(to_millis),
            amount: user.amount,
            status: &user.status,
            updated_at: to_millis(user.updated_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Access code models
// ---------------------------------------------------------------------------

/// Row struct for reading from the access_codes table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = access_codes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct AccessCodeRow {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub code_type: String,
    pub is_active: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

impl TryFrom<AccessCodeRow> for AccessCode {
    type Error = MalformedRow;

    fn try_from(row: AccessCodeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AccessCodeId::new(row.id),
            user_id: UserId::new(row.user_id),
            role: row.code_type.parse::<CodeRole>()?,
            created_at: from_millis("created_at", row.created_at)?,
            expires_at: from_optional_millis("expires_at", row.expires_at)?,
            code: row.code,
            is_active: row.is_active,
        })
    }
}

/// Insertable struct for issuing access codes.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = access_codes)]
pub(crate) struct NewAccessCodeRow<'a> {
    pub user_id: i64,
    pub code: &'a str,
    pub code_type: &'static str,
    pub is_active: bool,
    pub created_at: i64,
    pub expires_at: Option<i64>,
}

impl<'a> From<&'a NewAccessCode> for NewAccessCodeRow<'a> {
    fn from(code: &'a NewAccessCode) -> Self {
        Self {
            user_id: code.user_id.get(),
            code: &code.code,
            code_type: code.role.as_str(),
            is_active: code.is_active,
            created_at: to_millis(code.created_at),
            expires_at: code.expires_at.map(to_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn code_row(code_type: &str, created_at: i64) -> AccessCodeRow {
        AccessCodeRow {
            id: 4,
            user_id: 2,
            code: "VWR-AB12CD34".to_owned(),
            code_type: code_type.to_owned(),
            is_active: true,
            created_at,
            expires_at: None,
        }
    }

    #[rstest]
    fn access_code_rows_decode() {
        let code = AccessCode::try_from(code_row("viewer", 1_772_355_600_000)).expect("decodes");
        assert_eq!(code.role, CodeRole::Viewer);
        assert_eq!(code.created_at.timestamp_millis(), 1_772_355_600_000);
    }

    #[rstest]
    fn unknown_roles_are_malformed() {
        let err = AccessCode::try_from(code_row("owner", 0)).expect_err("rejects role");
        assert!(matches!(err, MalformedRow::Role(_)));
    }

    #[rstest]
    fn out_of_range_timestamps_are_malformed() {
        let err = AccessCode::try_from(code_row("admin", i64::MAX)).expect_err("rejects millis");
        assert_eq!(
            err,
            MalformedRow::Timestamp {
                column: "created_at",
                millis: i64::MAX
            }
        );
    }
}
