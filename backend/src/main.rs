//! `access-codes` command-line entry point.
//!
//! Manages users and their access codes in the embedded store and prints
//! JSON on stdout. Logs go to stderr as JSON lines, filtered by `RUST_LOG`.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use access_codes::AppSettings;
use access_codes::domain::ports::{
    AccessCodeCommand, AccessCodeRepository, CodeVerificationQuery, UserRepository,
};
use access_codes::domain::{
    AccessCodeFilter, CodeLifecycleService, CodeRole, CodeVerificationService, NewUser,
    RandomCodeGenerator, UserChanges, UserId,
};
use access_codes::outbound::persistence::{SqliteStore, StoreConfig};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use clap::{ArgGroup, Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use serde::Serialize;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `access-codes` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "access-codes",
    about = "Issue, rotate and verify admin/viewer access codes",
    version
)]
struct Cli {
    /// SQLite database file. Overrides `ACCESS_CODES_DATABASE_PATH`.
    #[arg(long = "database", value_name = "path", global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a user.
    AddUser(AddUserArgs),
    /// List every user.
    ListUsers,
    /// Move a user's expiry date.
    ExtendUser(ExtendUserArgs),
    /// Delete a user and all of their codes.
    DeleteUser {
        /// User identifier.
        user_id: i64,
    },
    /// Retire a user's codes and issue a fresh admin/viewer pair.
    Regenerate {
        /// User identifier.
        user_id: i64,
    },
    /// Check a presented code.
    Verify {
        /// Code as presented, e.g. `ADM-K3F9X2QZ`.
        code: String,
    },
    /// List stored codes, newest last.
    ListCodes(ListCodesArgs),
}

#[derive(Debug, Args)]
struct AddUserArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    /// Product label; drives the subscription tier.
    #[arg(long)]
    product: String,
    /// RFC 3339 instant or `YYYY-MM-DD`; defaults to now.
    #[arg(long, value_parser = parse_instant)]
    purchase_date: Option<DateTime<Utc>>,
    /// RFC 3339 instant or `YYYY-MM-DD`; omit for an open-ended plan.
    #[arg(long, value_parser = parse_instant)]
    expiry_date: Option<DateTime<Utc>>,
    /// Amount paid in minor currency units.
    #[arg(long, default_value_t = 0)]
    amount: i64,
    #[arg(long, default_value = "active")]
    status: String,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("extension")
        .required(true)
        .args(["days", "until", "clear"])
))]
struct ExtendUserArgs {
    /// User identifier.
    user_id: i64,
    /// Add days to the later of the current expiry and now.
    #[arg(long)]
    days: Option<u32>,
    /// Set the expiry to this RFC 3339 instant or `YYYY-MM-DD`.
    #[arg(long, value_parser = parse_instant)]
    until: Option<DateTime<Utc>>,
    /// Remove the expiry date.
    #[arg(long)]
    clear: bool,
}

#[derive(Debug, Args)]
struct ListCodesArgs {
    /// Only codes owned by this user.
    #[arg(long = "user")]
    user_id: Option<i64>,
    /// Only `admin` or `viewer` codes.
    #[arg(long)]
    role: Option<CodeRole>,
    /// Only active codes.
    #[arg(long, conflicts_with = "inactive")]
    active: bool,
    /// Only retired codes.
    #[arg(long)]
    inactive: bool,
}

impl ListCodesArgs {
    fn filter(&self) -> AccessCodeFilter {
        AccessCodeFilter {
            user_id: self.user_id.map(UserId::new),
            role: self.role,
            is_active: match (self.active, self.inactive) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build Tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let settings = load_settings()?;
    let store_config = cli
        .database
        .map_or_else(|| settings.store_config(), StoreConfig::file);
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = SqliteStore::open(store_config)
        .await
        .wrap_err("failed to open access code store")?
        .with_clock(Arc::clone(&clock));
    let users = store.users();

    match cli.command {
        Command::AddUser(args) => {
            let user = NewUser {
                name: args.name,
                email: args.email,
                phone: args.phone,
                product: args.product,
                purchase_date: args.purchase_date.unwrap_or_else(|| clock.utc()),
                expiry_date: args.expiry_date,
                amount: args.amount,
                status: args.status,
            };
            user.validate().wrap_err("invalid user")?;
            let id = users.add(&user).await.wrap_err("failed to add user")?;
            let created = users
                .find_by_id(id)
                .await
                .wrap_err("failed to reload user")?
                .ok_or_else(|| eyre!("user {id} vanished after insert"))?;
            print_json(&created)?;
        }
        Command::ListUsers => {
            print_json(&users.list().await.wrap_err("failed to list users")?)?;
        }
        Command::ExtendUser(args) => {
            let id = UserId::new(args.user_id);
            let user = users
                .find_by_id(id)
                .await
                .wrap_err("failed to load user")?
                .ok_or_else(|| eyre!("user {id} not found"))?;
            let expiry_date = if args.clear {
                None
            } else if let Some(days) = args.days {
                Some(extended_expiry(user.expiry_date, clock.utc(), days))
            } else {
                args.until
            };
            let changes = UserChanges {
                expiry_date: Some(expiry_date),
                ..UserChanges::default()
            };
            let updated = users
                .update(id, &changes)
                .await
                .wrap_err("failed to update user")?;
            print_json(&updated)?;
        }
        Command::DeleteUser { user_id } => {
            let id = UserId::new(user_id);
            users.delete(id).await.wrap_err("failed to delete user")?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        Command::Regenerate { user_id } => {
            let id = UserId::new(user_id);
            if users
                .find_by_id(id)
                .await
                .wrap_err("failed to load user")?
                .is_none()
            {
                return Err(eyre!("user {id} not found"));
            }
            let service = CodeLifecycleService::new(
                Arc::new(store.access_codes()),
                Arc::new(RandomCodeGenerator::new(Arc::clone(&clock))),
                Arc::clone(&clock),
                settings.lifecycle_config(),
            );
            match service.regenerate_codes(id).await {
                Ok(issued) => print_json(&issued)?,
                Err(error) => {
                    print_json(&error)?;
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Verify { code } => {
            let service = CodeVerificationService::new(
                Arc::new(users),
                Arc::new(store.access_codes()),
                Arc::clone(&clock),
                settings.verification_config(),
            );
            let outcome = service.verify(&code).await;
            print_json(&outcome)?;
            if !outcome.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::ListCodes(args) => {
            let codes = store
                .access_codes()
                .list(&args.filter())
                .await
                .wrap_err("failed to list access codes")?;
            print_json(&codes)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn load_settings() -> Result<AppSettings> {
    AppSettings::load_from_iter([OsString::from("access-codes")])
        .map_err(|error| eyre!("failed to load settings: {error}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).wrap_err("failed to encode output")?;
    println!("{rendered}");
    Ok(())
}

/// New expiry after adding `days` to the later of `current` and `now`.
fn extended_expiry(
    current: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    days: u32,
) -> DateTime<Utc> {
    let base = current.filter(|expiry| *expiry > now).unwrap_or(now);
    base.checked_add_signed(TimeDelta::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("expected an RFC 3339 instant or YYYY-MM-DD date, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    //! Unit tests for CLI parsing helpers.

    use chrono::TimeZone;
    use clap::CommandFactory;
    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
            .single()
            .expect("valid date")
    }

    #[rstest]
    fn settings_load_from_the_environment() {
        let _guard = lock_env([
            ("ACCESS_CODES_DATABASE_PATH", Some("/tmp/cli-codes.db".to_owned())),
            ("ACCESS_CODES_READ_BACK_RETRIES", Some("0".to_owned())),
        ]);

        let settings = load_settings().expect("settings load");

        assert_eq!(settings.database_path(), PathBuf::from("/tmp/cli-codes.db"));
        assert_eq!(settings.lifecycle_config().read_back.retries, 0);
    }

    #[rstest]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("2026-03-01", at(2026, 3, 1))]
    #[case("2026-03-01T00:00:00Z", at(2026, 3, 1))]
    #[case(" 2026-03-01T02:00:00+02:00 ", at(2026, 3, 1))]
    fn instants_parse(#[case] raw: &str, #[case] expected: DateTime<Utc>) {
        assert_eq!(parse_instant(raw), Ok(expected));
    }

    #[rstest]
    fn malformed_instants_are_rejected() {
        let error = parse_instant("next tuesday").expect_err("rejects text");
        assert!(error.contains("next tuesday"));
    }

    #[rstest]
    #[case(None, at(2026, 4, 1))]
    #[case(Some(at(2026, 1, 1)), at(2026, 4, 1))]
    #[case(Some(at(2026, 6, 1)), at(2026, 7, 1))]
    fn extension_starts_from_the_later_instant(
        #[case] current: Option<DateTime<Utc>>,
        #[case] expected: DateTime<Utc>,
    ) {
        assert_eq!(extended_expiry(current, at(2026, 3, 2), 30), expected);
    }

    #[rstest]
    fn code_listing_flags_map_to_filters() {
        let cli = Cli::try_parse_from([
            "access-codes",
            "list-codes",
            "--user",
            "4",
            "--role",
            "viewer",
            "--inactive",
        ])
        .expect("parses");
        let Command::ListCodes(args) = cli.command else {
            panic!("expected list-codes");
        };
        assert_eq!(
            args.filter(),
            AccessCodeFilter {
                user_id: Some(UserId::new(4)),
                role: Some(CodeRole::Viewer),
                is_active: Some(false),
            }
        );
    }

    #[rstest]
    fn extend_user_requires_a_mode() {
        assert!(Cli::try_parse_from(["access-codes", "extend-user", "3"]).is_err());
    }
}
