//! Subscription tier derived from a user's free-text product label.
//!
//! The label is unstructured, so the tier is a heuristic: case-sensitive
//! substring checks applied in a fixed precedence order, first match wins.
//!
//! 1. contains `6` → [`Tier::Pro6`]
//! 2. contains a yearly marker (see [`YEARLY_MARKERS`]) → [`Tier::Pro12`]
//! 3. otherwise → [`Tier::Basic3`]
//!
//! A label such as `"Yearly 6 seats"` therefore resolves to `Pro-6`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Product label fragments that identify a twelve-month plan.
pub const YEARLY_MARKERS: &[&str] = &["Yearly"];

/// Subscription plan class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Six-month professional plan.
    #[serde(rename = "Pro-6")]
    Pro6,
    /// Twelve-month professional plan.
    #[serde(rename = "Pro-12")]
    Pro12,
    /// Three-month basic plan.
    #[serde(rename = "Basic-3")]
    Basic3,
}

impl Tier {
    /// Derive the tier from a product label.
    ///
    /// # Examples
    /// ```
    /// use access_codes::domain::Tier;
    ///
    /// assert_eq!(Tier::from_product("Plan-6-Premium"), Tier::Pro6);
    /// assert_eq!(Tier::from_product("Yearly Plan"), Tier::Pro12);
    /// assert_eq!(Tier::from_product("Plan-3"), Tier::Basic3);
    /// ```
    pub fn from_product(product: &str) -> Self {
        if product.contains('6') {
            Self::Pro6
        } else if YEARLY_MARKERS.iter().any(|marker| product.contains(marker)) {
            Self::Pro12
        } else {
            Self::Basic3
        }
    }

    /// Display label, e.g. `Pro-6`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pro6 => "Pro-6",
            Self::Pro12 => "Pro-12",
            Self::Basic3 => "Basic-3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
