//! Diesel table definitions for the SQLite schema.
//!
//! These definitions must match `migrations/` exactly. Timestamps are stored
//! as Unix epoch milliseconds in `BIGINT` columns.

diesel::table! {
    /// Registered users.
    users (id) {
        /// Store-assigned identifier.
        id -> BigInt,
        name -> Text,
        /// Unique login email.
        email -> Text,
        phone -> Text,
        /// Free-text product label; drives tier derivation.
        product -> Text,
        purchase_date -> BigInt,
        /// End of the paid period; `NULL` for open-ended plans.
        expiry_date -> Nullable<BigInt>,
        /// Amount paid in minor currency units.
        amount -> BigInt,
        status -> Text,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    /// Issued access codes, active and retired.
    ///
    /// Indexed on `user_id`, `code_type` and `is_active`; `code` is unique.
    access_codes (id) {
        id -> BigInt,
        /// Owning user; rows are removed with the user.
        user_id -> BigInt,
        code -> Text,
        /// `admin` or `viewer`.
        code_type -> Text,
        is_active -> Bool,
        created_at -> BigInt,
        expires_at -> Nullable<BigInt>,
    }
}

diesel::joinable!(access_codes -> users (user_id));
diesel::allow_tables_to_appear_in_same_query!(access_codes, users);
