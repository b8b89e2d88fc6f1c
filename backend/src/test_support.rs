//! Test utilities for the access code crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    AccessCodeRepository, AccessCodeRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::{
    AccessCode, AccessCodeFilter, AccessCodeId, CodeGenerator, CodeRole, NewAccessCode, NewUser,
    Sleeper, User, UserChanges, UserId,
};
use crate::outbound::persistence::StoreConfig;

/// Fixed instant used by fixtures: 2026-03-01T09:00:00Z.
pub fn fixture_timestamp() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single() {
        Some(now) => now,
        None => panic!("valid fixture timestamp"),
    }
}

/// Registration payload with sensible defaults and a unique-looking email.
pub fn new_user(email: &str, product: &str, expiry_date: Option<DateTime<Utc>>) -> NewUser {
    NewUser {
        name: "Ada Lovelace".to_owned(),
        email: email.to_owned(),
        phone: "+44 20 0000 0000".to_owned(),
        product: product.to_owned(),
        purchase_date: fixture_timestamp(),
        expiry_date,
        amount: 4_900,
        status: "active".to_owned(),
    }
}

/// Database file inside a fresh temporary directory.
///
/// Keep the returned directory alive for as long as the store is open.
pub fn temp_database() -> (tempfile::TempDir, StoreConfig) {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(error) => panic!("create temporary database directory: {error}"),
    };
    let config = StoreConfig::file(dir.path().join("access-codes.db"));
    (dir, config)
}

/// Clock whose time only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl Sleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records every requested delay and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper(Mutex<Vec<Duration>>);

impl RecordingSleeper {
    /// Delays requested so far.
    pub fn recorded(&self) -> Vec<Duration> {
        match self.0.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut entries = match self.0.lock() {
            Ok(entries) => entries,
            Err(_) => panic!("sleeper mutex"),
        };
        entries.push(duration);
    }
}

/// Generator that replays a fixed script of candidates per role.
///
/// Once a role's script runs dry the last candidate repeats.
#[derive(Default)]
pub struct ScriptedCodeGenerator {
    scripts: Mutex<HashMap<CodeRole, VecDeque<String>>>,
    last: Mutex<HashMap<CodeRole, String>>,
}

impl ScriptedCodeGenerator {
    /// Queue `candidates` for `role`.
    pub fn with_script<I, S>(self, role: CodeRole, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut scripts = match self.scripts.lock() {
                Ok(scripts) => scripts,
                Err(_) => panic!("script mutex"),
            };
            scripts
                .entry(role)
                .or_default()
                .extend(candidates.into_iter().map(Into::into));
        }
        self
    }
}

impl CodeGenerator for ScriptedCodeGenerator {
    fn generate(&self, role: CodeRole) -> String {
        let next = match self.scripts.lock() {
            Ok(mut scripts) => scripts.get_mut(&role).and_then(VecDeque::pop_front),
            Err(_) => panic!("script mutex"),
        };
        let mut last = match self.last.lock() {
            Ok(last) => last,
            Err(_) => panic!("last-candidate mutex"),
        };
        match next {
            Some(candidate) => {
                last.insert(role, candidate.clone());
                candidate
            }
            None => match last.get(&role) {
                Some(candidate) => candidate.clone(),
                None => panic!("no scripted candidate for {role}"),
            },
        }
    }
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<i64, User>,
    codes: BTreeMap<i64, AccessCode>,
    next_user_id: i64,
    next_code_id: i64,
    read_lag: u32,
    hidden_codes: HashMap<i64, u32>,
    code_store_offline: bool,
}

/// In-memory record store with the same constraints as the SQLite adapter.
///
/// Supports two fault injections: a read lag that hides freshly added codes
/// from the next point lookups, and an offline switch that fails every code
/// operation with a connection error.
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: Mutex<StoreState>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide each code added from now on for its next `reads` point lookups.
    pub fn lag_code_reads(&self, reads: u32) {
        self.lock_state().read_lag = reads;
    }

    /// Fail every code operation with a connection error while `offline`.
    pub fn set_code_store_offline(&self, offline: bool) {
        self.lock_state().code_store_offline = offline;
    }

    /// Snapshot every stored code, regardless of lag.
    pub fn all_codes(&self) -> Vec<AccessCode> {
        self.lock_state().codes.values().cloned().collect()
    }

    /// Insert a code record verbatim, bypassing uniqueness checks.
    pub fn insert_raw_code(&self, code: AccessCode) {
        let mut state = self.lock_state();
        state.next_code_id = state.next_code_id.max(code.id.get());
        state.codes.insert(code.id.get(), code);
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("store mutex"),
        }
    }

    fn code_state(&self) -> Result<MutexGuard<'_, StoreState>, AccessCodeRepositoryError> {
        let state = self
            .state
            .lock()
            .map_err(|_| AccessCodeRepositoryError::connection("store mutex poisoned"))?;
        if state.code_store_offline {
            return Err(AccessCodeRepositoryError::connection("store offline"));
        }
        Ok(state)
    }

    fn user_state(&self) -> Result<MutexGuard<'_, StoreState>, UserRepositoryError> {
        self.state
            .lock()
            .map_err(|_| UserRepositoryError::connection("store mutex poisoned"))
    }
}

fn visible(state: &mut StoreState, id: i64) -> bool {
    match state.hidden_codes.get_mut(&id) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            false
        }
        _ => true,
    }
}

#[async_trait]
impl UserRepository for InMemoryRecordStore {
    async fn add(&self, user: &NewUser) -> Result<UserId, UserRepositoryError> {
        let mut state = self.user_state()?;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(UserRepositoryError::duplicate_email(user.email.clone()));
        }
        state.next_user_id += 1;
        let id = UserId::new(state.next_user_id);
        let now = Utc::now();
        state.users.insert(
            id.get(),
            User {
                id,
                name: user.name.clone(),
                email: user.email.clone(),
                phone: user.phone.clone(),
                product: user.product.clone(),
                purchase_date: user.purchase_date,
                expiry_date: user.expiry_date,
                amount: user.amount,
                status: user.status.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.user_state()?.users.get(&id.get()).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .user_state()?
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, UserRepositoryError> {
        Ok(self.user_state()?.users.values().cloned().collect())
    }

    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<User, UserRepositoryError> {
        let mut state = self.user_state()?;
        if let Some(email) = &changes.email {
            if state
                .users
                .values()
                .any(|user| user.id != id && &user.email == email)
            {
                return Err(UserRepositoryError::duplicate_email(email.clone()));
            }
        }
        let user = state
            .users
            .get_mut(&id.get())
            .ok_or_else(|| UserRepositoryError::not_found(id.get()))?;
        changes.apply_to(user, Utc::now());
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<(), UserRepositoryError> {
        let mut state = self.user_state()?;
        if state.users.remove(&id.get()).is_none() {
            return Err(UserRepositoryError::not_found(id.get()));
        }
        state.codes.retain(|_, code| code.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl AccessCodeRepository for InMemoryRecordStore {
    async fn add(&self, code: &NewAccessCode) -> Result<AccessCodeId, AccessCodeRepositoryError> {
        let mut state = self.code_state()?;
        if !state.users.contains_key(&code.user_id.get()) {
            return Err(AccessCodeRepositoryError::unknown_user(code.user_id.get()));
        }
        if state.codes.values().any(|existing| existing.code == code.code) {
            return Err(AccessCodeRepositoryError::duplicate_code(code.code.clone()));
        }
        state.next_code_id += 1;
        let id = state.next_code_id;
        state.codes.insert(
            id,
            AccessCode {
                id: AccessCodeId::new(id),
                user_id: code.user_id,
                code: code.code.clone(),
                role: code.role,
                is_active: code.is_active,
                created_at: code.created_at,
                expires_at: code.expires_at,
            },
        );
        let lag = state.read_lag;
        if lag > 0 {
            state.hidden_codes.insert(id, lag);
        }
        Ok(AccessCodeId::new(id))
    }

    async fn find_by_id(
        &self,
        id: AccessCodeId,
    ) -> Result<Option<AccessCode>, AccessCodeRepositoryError> {
        let mut state = self.code_state()?;
        if !visible(&mut state, id.get()) {
            return Ok(None);
        }
        Ok(state.codes.get(&id.get()).cloned())
    }

    async fn find_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AccessCode>, AccessCodeRepositoryError> {
        let mut state = self.code_state()?;
        let Some(found) = state.codes.values().find(|stored| stored.code == code).cloned() else {
            return Ok(None);
        };
        if !visible(&mut state, found.id.get()) {
            return Ok(None);
        }
        Ok(Some(found))
    }

    async fn list(
        &self,
        filter: &AccessCodeFilter,
    ) -> Result<Vec<AccessCode>, AccessCodeRepositoryError> {
        Ok(self
            .code_state()?
            .codes
            .values()
            .filter(|code| filter.matches(code))
            .cloned()
            .collect())
    }

    async fn set_active(
        &self,
        id: AccessCodeId,
        is_active: bool,
    ) -> Result<(), AccessCodeRepositoryError> {
        let mut state = self.code_state()?;
        let code = state
            .codes
            .get_mut(&id.get())
            .ok_or_else(|| AccessCodeRepositoryError::not_found(id.get()))?;
        code.is_active = is_active;
        Ok(())
    }

    async fn delete(&self, id: AccessCodeId) -> Result<(), AccessCodeRepositoryError> {
        let mut state = self.code_state()?;
        state
            .codes
            .remove(&id.get())
            .map(|_| ())
            .ok_or_else(|| AccessCodeRepositoryError::not_found(id.get()))
    }
}
