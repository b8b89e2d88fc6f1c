//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from configuration files and `ACCESS_CODES_*` environment
//! variables. Every field is optional; accessors fall back to the domain
//! defaults.

use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    CandidateExhaustion, CodeLifecycleConfig, CodeVerificationConfig, ReadBackPolicy,
};
use crate::outbound::persistence::StoreConfig;

const DEFAULT_DATABASE_PATH: &str = "access-codes.db";

/// Settings for the access code store and services.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ACCESS_CODES")]
pub struct AppSettings {
    /// SQLite database file.
    pub database_path: Option<PathBuf>,
    /// Candidates generated per role before giving up.
    pub max_generation_attempts: Option<u32>,
    /// Read-back re-probes after the first miss.
    pub read_back_retries: Option<u32>,
    /// Delay before each read-back re-probe, in milliseconds.
    pub read_back_delay_ms: Option<u64>,
    /// Validity granted to users without an expiry date, in days.
    pub default_validity_days: Option<u32>,
    /// Persist the last colliding candidate instead of failing.
    #[ortho_config(default = false)]
    pub proceed_on_exhaustion: bool,
}

impl AppSettings {
    /// Return the configured database path, falling back to the default.
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }

    /// Store configuration for the configured database file.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::file(self.database_path())
    }

    /// Lifecycle tuning with unset fields at their defaults.
    pub fn lifecycle_config(&self) -> CodeLifecycleConfig {
        let defaults = CodeLifecycleConfig::default();
        let read_back = ReadBackPolicy {
            retries: self
                .read_back_retries
                .unwrap_or(defaults.read_back.retries),
            delay: self
                .read_back_delay_ms
                .map_or(defaults.read_back.delay, Duration::from_millis),
        };
        CodeLifecycleConfig {
            max_generation_attempts: self
                .max_generation_attempts
                .unwrap_or(defaults.max_generation_attempts),
            exhaustion: if self.proceed_on_exhaustion {
                CandidateExhaustion::ProceedWithLastCandidate
            } else {
                CandidateExhaustion::Fail
            },
            read_back,
        }
    }

    /// Verification tuning with unset fields at their defaults.
    pub fn verification_config(&self) -> CodeVerificationConfig {
        self.default_validity_days
            .map_or_else(CodeVerificationConfig::default, |days| {
                CodeVerificationConfig {
                    default_validity: TimeDelta::days(i64::from(days)),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "ACCESS_CODES_DATABASE_PATH",
        "ACCESS_CODES_MAX_GENERATION_ATTEMPTS",
        "ACCESS_CODES_READ_BACK_RETRIES",
        "ACCESS_CODES_READ_BACK_DELAY_MS",
        "ACCESS_CODES_DEFAULT_VALIDITY_DAYS",
        "ACCESS_CODES_PROCEED_ON_EXHAUSTION",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("access-codes")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();

        assert_eq!(settings.database_path(), PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(settings.lifecycle_config(), CodeLifecycleConfig::default());
        assert_eq!(
            settings.verification_config(),
            CodeVerificationConfig::default()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("ACCESS_CODES_DATABASE_PATH", Some("/tmp/codes.db".to_owned())),
            ("ACCESS_CODES_MAX_GENERATION_ATTEMPTS", Some("3".to_owned())),
            ("ACCESS_CODES_READ_BACK_RETRIES", Some("0".to_owned())),
            ("ACCESS_CODES_READ_BACK_DELAY_MS", Some("25".to_owned())),
            ("ACCESS_CODES_DEFAULT_VALIDITY_DAYS", Some("30".to_owned())),
            ("ACCESS_CODES_PROCEED_ON_EXHAUSTION", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        let lifecycle = settings.lifecycle_config();

        assert_eq!(settings.database_path(), PathBuf::from("/tmp/codes.db"));
        assert_eq!(lifecycle.max_generation_attempts, 3);
        assert_eq!(lifecycle.read_back.retries, 0);
        assert_eq!(lifecycle.read_back.delay, Duration::from_millis(25));
        assert_eq!(
            lifecycle.exhaustion,
            CandidateExhaustion::ProceedWithLastCandidate
        );
        assert_eq!(
            settings.verification_config().default_validity,
            TimeDelta::days(30)
        );
    }
}
