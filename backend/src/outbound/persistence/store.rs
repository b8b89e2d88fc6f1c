//! Embedded SQLite store handle shared by the Diesel repositories.
//!
//! Diesel's SQLite connection is synchronous, so the store keeps a single
//! connection behind a mutex and runs each unit of work on Tokio's blocking
//! pool. Every call through [`SqliteStore::transaction`] is one SQLite
//! transaction.
//!
//! # Lifecycle
//!
//! [`SqliteStore::open`] establishes the connection, enables foreign keys and
//! applies the embedded migrations. Clones share the connection; dropping the
//! last clone closes it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cap_std::ambient_authority;
use cap_std::fs::Dir;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use mockable::{Clock, DefaultClock};
use tracing::{debug, info};

use super::diesel_access_code_repository::DieselAccessCodeRepository;
use super::diesel_basic_error_mapping::AdapterError;
use super::diesel_user_repository::DieselUserRepository;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
const IN_MEMORY: &str = ":memory:";

/// Errors raised while opening the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The database file or its directory could not be opened.
    #[error("failed to open access code store: {message}")]
    Open { message: String },

    /// Connection pragmas or migrations failed.
    #[error("failed to prepare access code store schema: {message}")]
    Migration { message: String },
}

impl StoreError {
    /// Create an open error with the given message.
    pub fn open(message: impl Into<String>) -> Self {
        Self::Open {
            message: message.into(),
        }
    }

    /// Create a migration error with the given message.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

/// The shared connection could not be used for a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("store connection unavailable: {message}")]
pub struct StoreUnavailable {
    message: String,
}

impl StoreUnavailable {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Private in-memory database, discarded when the store closes.
    InMemory,
    /// Database file; missing parent directories are created.
    File(PathBuf),
}

/// Configuration for [`SqliteStore::open`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use access_codes::outbound::persistence::{StoreConfig, StoreLocation};
///
/// let config = StoreConfig::file("/var/lib/access-codes/codes.db")
///     .with_busy_timeout(Duration::from_secs(2));
/// assert!(matches!(config.location(), StoreLocation::File(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    location: StoreLocation,
    busy_timeout: Duration,
}

impl StoreConfig {
    /// Configuration for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Configuration for a database file at `path`.
    ///
    /// Uses a five second busy timeout.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            ..Self::in_memory()
        }
    }

    /// Set how long SQLite waits on a locked database before failing.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Get the configured location.
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }
}

/// Handle to the embedded record store.
#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<SqliteConnection>>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Open the store, enable foreign keys and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Open`] when the database cannot be opened and
    /// [`StoreError::Migration`] when the schema cannot be prepared.
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let connection = tokio::task::spawn_blocking(move || establish(&config))
            .await
            .map_err(|error| StoreError::open(format!("open task failed: {error}")))??;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            clock: Arc::new(DefaultClock),
        })
    }

    /// Replace the clock used to stamp `created_at`/`updated_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Repository over the `users` collection.
    pub fn users(&self) -> DieselUserRepository {
        DieselUserRepository::new(self.clone())
    }

    /// Repository over the `access_codes` collection.
    pub fn access_codes(&self) -> DieselAccessCodeRepository {
        DieselAccessCodeRepository::new(self.clone())
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Run `work` inside one SQLite transaction on the blocking pool.
    pub(crate) async fn transaction<T, F>(&self, work: F) -> Result<T, AdapterError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, AdapterError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| StoreUnavailable::new("connection mutex poisoned"))?;
            guard.transaction(work)
        })
        .await
        .map_err(|error| StoreUnavailable::new(format!("blocking task failed: {error}")))?
    }
}

fn establish(config: &StoreConfig) -> Result<SqliteConnection, StoreError> {
    let url = match &config.location {
        StoreLocation::InMemory => IN_MEMORY.to_owned(),
        StoreLocation::File(path) => {
            create_parent_dir(path)?;
            path.to_str()
                .ok_or_else(|| StoreError::open("database path is not valid UTF-8"))?
                .to_owned()
        }
    };

    let mut connection =
        SqliteConnection::establish(&url).map_err(|error| StoreError::open(error.to_string()))?;
    let busy_timeout_ms = u64::try_from(config.busy_timeout.as_millis()).unwrap_or(u64::MAX);
    diesel::sql_query(format!("PRAGMA busy_timeout = {busy_timeout_ms}"))
        .execute(&mut connection)
        .map_err(|error| StoreError::migration(error.to_string()))?;
    diesel::sql_query("PRAGMA foreign_keys = ON")
        .execute(&mut connection)
        .map_err(|error| StoreError::migration(error.to_string()))?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| StoreError::migration(error.to_string()))?;
    info!(database = %url, migrations = applied.len(), "access code store ready");
    Ok(connection)
}

fn create_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    debug!(directory = %parent.display(), "ensuring database directory exists");
    Dir::create_ambient_dir_all(parent, ambient_authority())
        .map_err(|error| StoreError::open(format!("{}: {error}", parent.display())))
}
