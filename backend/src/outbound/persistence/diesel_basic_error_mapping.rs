//! Shared Diesel error mapping for the SQLite repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, warn};

use super::models::MalformedRow;
use super::store::StoreUnavailable;

/// Failure inside one unit of store work, before port-specific mapping.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AdapterError {
    #[error(transparent)]
    Unavailable(#[from] StoreUnavailable),
    #[error(transparent)]
    Diesel(#[from] DieselError),
    #[error(transparent)]
    Malformed(#[from] MalformedRow),
}

impl AdapterError {
    /// Database error kind, when the failure came from SQLite itself.
    pub(crate) fn database_kind(&self) -> Option<&DatabaseErrorKind> {
        match self {
            Self::Diesel(DieselError::DatabaseError(kind, _)) => Some(kind),
            _ => None,
        }
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, Self::Diesel(DieselError::NotFound))
    }
}

/// Emit debug context for a Diesel failure before it is mapped.
pub(crate) fn log_diesel_error(error: &DieselError) {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            "diesel operation failed"
        ),
    }
}

/// Map the failures every repository treats alike into query/connection
/// constructors.
///
/// Constraint violations a repository cares about must be matched before
/// calling this; anything left over becomes a query error.
pub(crate) fn map_basic_adapter_error<E, Q, C>(error: AdapterError, query: Q, connection: C) -> E
where
    Q: Fn(String) -> E,
    C: Fn(String) -> E,
{
    match error {
        AdapterError::Unavailable(unavailable) => connection(unavailable.to_string()),
        AdapterError::Malformed(malformed) => {
            warn!(error = %malformed, "stored row failed to decode");
            query(malformed.to_string())
        }
        AdapterError::Diesel(diesel) => {
            log_diesel_error(&diesel);
            match diesel {
                DieselError::NotFound => query("record not found".to_owned()),
                DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
                DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                    connection("database connection error".to_owned())
                }
                _ => query("database error".to_owned()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum Mapped {
        Query(String),
        Connection(String),
    }

    fn map(error: AdapterError) -> Mapped {
        map_basic_adapter_error(error, Mapped::Query, Mapped::Connection)
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        assert_eq!(
            map(AdapterError::Diesel(DieselError::NotFound)),
            Mapped::Query("record not found".to_owned())
        );
    }

    #[rstest]
    fn malformed_rows_keep_their_description() {
        let mapped = map(AdapterError::Malformed(MalformedRow::Timestamp {
            column: "expiry_date",
            millis: i64::MIN,
        }));
        assert!(matches!(mapped, Mapped::Query(message) if message.contains("expiry_date")));
    }

    #[rstest]
    fn rolled_back_transactions_are_query_errors() {
        assert_eq!(
            map(AdapterError::Diesel(DieselError::RollbackTransaction)),
            Mapped::Query("database error".to_owned())
        );
    }

    #[rstest]
    fn only_database_errors_expose_a_kind() {
        assert!(AdapterError::Diesel(DieselError::NotFound).database_kind().is_none());
        assert!(AdapterError::Diesel(DieselError::NotFound).is_not_found());
    }
}
