//! User data model.
//!
//! Users are the owners of access codes. The code subsystem only reads them
//! to resolve expiry, tier and identity claims; registration and edits go
//! through [`crate::domain::ports::UserRepository`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Validation errors returned when checking [`NewUser`] or [`UserChanges`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// Name is empty after trimming.
    #[error("user name must not be empty")]
    EmptyName,
    /// Email is empty after trimming.
    #[error("email must not be empty")]
    EmptyEmail,
    /// Email lacks a local part, an `@`, or a domain.
    #[error("email must look like local@domain")]
    InvalidEmail,
    /// Amount is below zero.
    #[error("amount must not be negative, got {amount}")]
    NegativeAmount {
        /// Rejected amount in minor units.
        amount: i64,
    },
}

/// Store-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application user as held by the record store.
///
/// ## Invariants
/// - `email` is unique across users (enforced by the store).
/// - `updated_at` is never earlier than `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email, unique per user.
    pub email: String,
    /// Contact phone number, free text.
    pub phone: String,
    /// Free-text product label; drives tier derivation.
    pub product: String,
    /// When the product was purchased.
    pub purchase_date: DateTime<Utc>,
    /// End of the paid period; `None` means open-ended.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Amount paid, in minor currency units.
    pub amount: i64,
    /// Free-text account status.
    pub status: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user's paid period ended strictly before `now`.
    ///
    /// # Examples
    /// ```
    /// use access_codes::domain::{User, UserId};
    /// use chrono::{Duration, Utc};
    ///
    /// let now = Utc::now();
    /// let user = User {
    ///     id: UserId::new(1),
    ///     name: "Ada".into(),
    ///     email: "ada@example.com".into(),
    ///     phone: String::new(),
    ///     product: "Plan-3".into(),
    ///     purchase_date: now,
    ///     expiry_date: Some(now - Duration::days(1)),
    ///     amount: 0,
    ///     status: "active".into(),
    ///     created_at: now,
    ///     updated_at: now,
    /// };
    /// assert!(user.is_expired_at(now));
    /// ```
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expiry_date, Some(expiry) if expiry < now)
    }
}

/// Registration payload for a user not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Contact email, unique per user.
    pub email: String,
    /// Contact phone number.
    pub phone: String,
    /// Free-text product label.
    pub product: String,
    /// When the product was purchased.
    pub purchase_date: DateTime<Utc>,
    /// End of the paid period.
    pub expiry_date: Option<DateTime<Utc>>,
    /// Amount paid, in minor currency units.
    pub amount: i64,
    /// Free-text account status.
    pub status: String,
}

impl NewUser {
    /// Check field-level constraints before the payload reaches a store.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_amount(self.amount)
    }
}

/// Named-field change set applied to an existing [`User`].
///
/// Every field is optional; `None` leaves the stored value untouched. For
/// `expiry_date`, `Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement email.
    pub email: Option<String>,
    /// Replacement phone number.
    pub phone: Option<String>,
    /// Replacement product label.
    pub product: Option<String>,
    /// Replacement expiry; `Some(None)` clears it.
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    /// Replacement amount.
    pub amount: Option<i64>,
    /// Replacement status.
    pub status: Option<String>,
}

impl UserChanges {
    /// Whether the change set names no fields.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check the named fields using the same rules as [`NewUser::validate`].
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        Ok(())
    }

    /// Merge the named fields into `user` and stamp `updated_at`.
    pub fn apply_to(&self, user: &mut User, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            user.name.clone_from(name);
        }
        if let Some(email) = &self.email {
            user.email.clone_from(email);
        }
        if let Some(phone) = &self.phone {
            user.phone.clone_from(phone);
        }
        if let Some(product) = &self.product {
            user.product.clone_from(product);
        }
        if let Some(expiry_date) = self.expiry_date {
            user.expiry_date = expiry_date;
        }
        if let Some(amount) = self.amount {
            user.amount = amount;
        }
        if let Some(status) = &self.status {
            user.status.clone_from(status);
        }
        user.updated_at = now.max(user.created_at);
    }
}

fn validate_name(name: &str) -> Result<(), UserValidationError> {
    if name.trim().is_empty() {
        return Err(UserValidationError::EmptyName);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(UserValidationError::InvalidEmail),
    }
}

fn validate_amount(amount: i64) -> Result<(), UserValidationError> {
    if amount < 0 {
        return Err(UserValidationError::NegativeAmount { amount });
    }
    Ok(())
}

#[cfg(test)]
mod tests;
