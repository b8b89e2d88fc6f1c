//! Tests for the domain user model.

use super::*;
use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};

fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

#[fixture]
fn new_user() -> NewUser {
    NewUser {
        name: "Ada Lovelace".to_owned(),
        email: "ada@example.com".to_owned(),
        phone: "+44 20 0000 0000".to_owned(),
        product: "Plan-6-Premium".to_owned(),
        purchase_date: fixture_now(),
        expiry_date: None,
        amount: 4_900,
        status: "active".to_owned(),
    }
}

#[fixture]
fn stored_user(new_user: NewUser) -> User {
    let now = fixture_now();
    User {
        id: UserId::new(7),
        name: new_user.name,
        email: new_user.email,
        phone: new_user.phone,
        product: new_user.product,
        purchase_date: new_user.purchase_date,
        expiry_date: new_user.expiry_date,
        amount: new_user.amount,
        status: new_user.status,
        created_at: now,
        updated_at: now,
    }
}

#[rstest]
fn valid_registration_passes(new_user: NewUser) {
    assert_eq!(new_user.validate(), Ok(()));
}

#[rstest]
#[case("", UserValidationError::EmptyEmail)]
#[case("   ", UserValidationError::EmptyEmail)]
#[case("ada.example.com", UserValidationError::InvalidEmail)]
#[case("@example.com", UserValidationError::InvalidEmail)]
#[case("ada@", UserValidationError::InvalidEmail)]
#[case("ada@ex@ample.com", UserValidationError::InvalidEmail)]
fn malformed_emails_are_rejected(
    mut new_user: NewUser,
    #[case] email: &str,
    #[case] expected: UserValidationError,
) {
    new_user.email = email.to_owned();
    assert_eq!(new_user.validate(), Err(expected));
}

#[rstest]
fn blank_name_is_rejected(mut new_user: NewUser) {
    new_user.name = "  ".to_owned();
    assert_eq!(new_user.validate(), Err(UserValidationError::EmptyName));
}

#[rstest]
fn negative_amount_is_rejected(mut new_user: NewUser) {
    new_user.amount = -1;
    assert_eq!(
        new_user.validate(),
        Err(UserValidationError::NegativeAmount { amount: -1 })
    );
}

#[rstest]
fn expiry_in_the_past_is_expired(mut stored_user: User) {
    let now = fixture_now();
    stored_user.expiry_date = Some(now - Duration::seconds(1));
    assert!(stored_user.is_expired_at(now));
}

#[rstest]
fn expiry_equal_to_now_is_not_expired(mut stored_user: User) {
    let now = fixture_now();
    stored_user.expiry_date = Some(now);
    assert!(!stored_user.is_expired_at(now));
}

#[rstest]
fn open_ended_user_never_expires(stored_user: User) {
    assert!(!stored_user.is_expired_at(fixture_now() + Duration::days(10_000)));
}

#[rstest]
fn empty_changes_are_detected() {
    assert!(UserChanges::default().is_empty());
    let changes = UserChanges {
        status: Some("suspended".to_owned()),
        ..UserChanges::default()
    };
    assert!(!changes.is_empty());
}

#[rstest]
fn apply_merges_only_named_fields(mut stored_user: User) {
    let later = fixture_now() + Duration::hours(2);
    let expiry = fixture_now() + Duration::days(30);
    let changes = UserChanges {
        product: Some("Yearly Plan".to_owned()),
        expiry_date: Some(Some(expiry)),
        ..UserChanges::default()
    };

    changes.apply_to(&mut stored_user, later);

    assert_eq!(stored_user.product, "Yearly Plan");
    assert_eq!(stored_user.expiry_date, Some(expiry));
    assert_eq!(stored_user.email, "ada@example.com");
    assert_eq!(stored_user.amount, 4_900);
    assert_eq!(stored_user.updated_at, later);
}

#[rstest]
fn apply_can_clear_expiry(mut stored_user: User) {
    stored_user.expiry_date = Some(fixture_now());
    let changes = UserChanges {
        expiry_date: Some(None),
        ..UserChanges::default()
    };

    changes.apply_to(&mut stored_user, fixture_now());

    assert_eq!(stored_user.expiry_date, None);
}

#[rstest]
fn changes_validate_named_fields() {
    let changes = UserChanges {
        email: Some("nope".to_owned()),
        ..UserChanges::default()
    };
    assert_eq!(changes.validate(), Err(UserValidationError::InvalidEmail));
}

#[rstest]
fn user_serialises_camel_case(stored_user: User) {
    let value = serde_json::to_value(&stored_user).expect("serialise user");
    assert_eq!(value["id"], 7);
    assert!(value.get("purchaseDate").is_some());
    assert!(value.get("expiryDate").is_some());
}
