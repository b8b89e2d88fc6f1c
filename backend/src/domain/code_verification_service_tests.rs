//! Tests for the access code verification service.

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::domain::ports::{
    AccessCodeCommand, MockAccessCodeRepository, MockUserRepository,
};
use crate::domain::{
    AccessCode, AccessCodeId, CodeLifecycleConfig, CodeLifecycleService, RandomCodeGenerator,
};
use crate::test_support::{
    ImmediateSleeper, InMemoryRecordStore, MutableClock, fixture_timestamp, new_user,
};
use rstest::rstest;

struct Harness {
    store: Arc<InMemoryRecordStore>,
    clock: Arc<MutableClock>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryRecordStore::new()),
            clock: Arc::new(MutableClock::new(fixture_timestamp())),
        }
    }

    fn verifier(&self) -> CodeVerificationService<InMemoryRecordStore, InMemoryRecordStore> {
        CodeVerificationService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.store),
            self.clock.clone(),
            CodeVerificationConfig::default(),
        )
    }

    async fn user(&self, product: &str, expiry: Option<DateTime<Utc>>) -> UserId {
        UserRepository::add(
            self.store.as_ref(),
            &new_user("ada@example.com", product, expiry),
        )
        .await
        .expect("seed user")
    }

    async fn regenerate(&self, user_id: UserId) -> crate::domain::IssuedCodes {
        CodeLifecycleService::new(
            Arc::clone(&self.store),
            Arc::new(RandomCodeGenerator::new(self.clock.clone())),
            self.clock.clone(),
            CodeLifecycleConfig::default(),
        )
        .with_sleeper(Arc::new(ImmediateSleeper))
        .regenerate_codes(user_id)
        .await
        .expect("regeneration")
    }
}

fn success(outcome: VerificationOutcome) -> VerifiedAccess {
    match outcome {
        VerificationOutcome::Success(access) => access,
        other => panic!("expected success, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn freshly_issued_admin_code_verifies() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;

    let access = success(harness.verifier().verify(&issued.admin_code).await);

    assert_eq!(access.role, CodeRole::Admin);
    assert_eq!(access.codes.admin, issued.admin_code);
    assert_eq!(access.codes.viewer, issued.viewer_code);
    assert_eq!(access.payload.user_id, user_id);
    assert_eq!(access.payload.email, "ada@example.com");
    assert_eq!(access.tier, Tier::Basic3);
}

#[rstest]
#[tokio::test]
async fn viewer_code_grants_viewer_role() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;

    let access = success(harness.verifier().verify(&issued.viewer_code).await);

    assert_eq!(access.role, CodeRole::Viewer);
}

#[rstest]
#[tokio::test]
async fn surrounding_whitespace_is_ignored() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;

    let outcome = harness
        .verifier()
        .verify(&format!("  {}\n", issued.admin_code))
        .await;

    assert!(outcome.is_success());
}

#[rstest]
#[case("")]
#[case("   ")]
#[tokio::test]
async fn blank_codes_never_reach_the_store(#[case] presented: &str) {
    let mut codes = MockAccessCodeRepository::new();
    codes.expect_find_by_code().times(0);
    let verifier = CodeVerificationService::new(
        Arc::new(MockUserRepository::new()),
        Arc::new(codes),
        Arc::new(MutableClock::new(fixture_timestamp())),
        CodeVerificationConfig::default(),
    );

    let outcome = verifier.verify(presented).await;

    assert_eq!(outcome, VerificationOutcome::invalid(InvalidReason::UnknownCode));
}

#[rstest]
#[tokio::test]
async fn unknown_codes_are_invalid() {
    let harness = Harness::new();

    let outcome = harness.verifier().verify("ADM-NOPE0000").await;

    assert_eq!(outcome, VerificationOutcome::invalid(InvalidReason::UnknownCode));
}

#[rstest]
#[tokio::test]
async fn superseded_codes_are_invalid() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let first = harness.regenerate(user_id).await;
    let second = harness.regenerate(user_id).await;
    let verifier = harness.verifier();

    for stale in [&first.admin_code, &first.viewer_code] {
        assert_eq!(
            verifier.verify(stale).await,
            VerificationOutcome::invalid(InvalidReason::Inactive)
        );
    }
    assert!(verifier.verify(&second.admin_code).await.is_success());
}

#[rstest]
#[tokio::test]
async fn lapsed_users_are_expired() {
    let harness = Harness::new();
    let expiry = fixture_timestamp() + TimeDelta::days(30);
    let user_id = harness.user("Plan-6", Some(expiry)).await;
    let issued = harness.regenerate(user_id).await;
    harness.clock.advance(Duration::from_secs(31 * 24 * 60 * 60));

    let outcome = harness.verifier().verify(&issued.admin_code).await;

    assert_eq!(outcome, VerificationOutcome::Expired { expired_at: expiry });
}

#[rstest]
#[tokio::test]
async fn expiry_at_exactly_now_still_grants_access() {
    let harness = Harness::new();
    let expiry = fixture_timestamp();
    let user_id = harness.user("Plan-6", Some(expiry)).await;
    let issued = harness.regenerate(user_id).await;

    let access = success(harness.verifier().verify(&issued.viewer_code).await);

    assert_eq!(access.until, expiry);
}

#[rstest]
#[tokio::test]
async fn users_without_expiry_get_the_default_window() {
    let harness = Harness::new();
    let user_id = harness.user("Yearly Plan", None).await;
    let issued = harness.regenerate(user_id).await;

    let access = success(harness.verifier().verify(&issued.admin_code).await);

    assert_eq!(access.until, fixture_timestamp() + TimeDelta::days(180));
    assert_eq!(access.tier, Tier::Pro12);
}

#[rstest]
#[tokio::test]
async fn default_window_is_configurable() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;
    let verifier = CodeVerificationService::new(
        Arc::clone(&harness.store),
        Arc::clone(&harness.store),
        harness.clock.clone(),
        CodeVerificationConfig {
            default_validity: TimeDelta::days(7),
        },
    );

    let access = success(verifier.verify(&issued.admin_code).await);

    assert_eq!(access.until, fixture_timestamp() + TimeDelta::days(7));
}

#[rstest]
#[case("Plan-6-Premium", Tier::Pro6)]
#[case("Yearly Plan", Tier::Pro12)]
#[case("Plan-3", Tier::Basic3)]
#[tokio::test]
async fn tier_follows_the_product_label(#[case] product: &str, #[case] expected: Tier) {
    let harness = Harness::new();
    let user_id = harness.user(product, None).await;
    let issued = harness.regenerate(user_id).await;

    let access = success(harness.verifier().verify(&issued.admin_code).await);

    assert_eq!(access.tier, expected);
    assert_eq!(access.payload.product, product);
}

#[rstest]
#[tokio::test]
async fn dangling_owner_is_reported() {
    let harness = Harness::new();
    harness.store.insert_raw_code(AccessCode {
        id: AccessCodeId::new(12),
        user_id: UserId::new(404),
        code: "ADM-ORPHAN01".to_owned(),
        role: CodeRole::Admin,
        is_active: true,
        created_at: fixture_timestamp(),
        expires_at: None,
    });

    let outcome = harness.verifier().verify("ADM-ORPHAN01").await;

    assert_eq!(
        outcome,
        VerificationOutcome::UserNotFound {
            user_id: UserId::new(404)
        }
    );
}

#[rstest]
#[tokio::test]
async fn missing_companion_role_is_blank() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;
    let viewer = harness
        .store
        .find_by_code(&issued.viewer_code)
        .await
        .expect("lookup")
        .expect("viewer stored");
    harness
        .store
        .set_active(viewer.id, false)
        .await
        .expect("retire viewer");

    let access = success(harness.verifier().verify(&issued.admin_code).await);

    assert_eq!(access.codes.viewer, "");
    assert_eq!(access.codes.admin, issued.admin_code);
}

#[rstest]
#[tokio::test]
async fn store_outage_fails_closed() {
    let harness = Harness::new();
    let user_id = harness.user("Plan-3", None).await;
    let issued = harness.regenerate(user_id).await;
    harness.store.set_code_store_offline(true);

    let outcome = harness.verifier().verify(&issued.admin_code).await;

    assert_eq!(outcome, VerificationOutcome::invalid(InvalidReason::LookupFailed));
}

#[rstest]
#[tokio::test]
async fn user_lookup_failure_fails_closed() {
    let mut codes = MockAccessCodeRepository::new();
    codes.expect_find_by_code().return_once(|_| {
        Ok(Some(AccessCode {
            id: AccessCodeId::new(1),
            user_id: UserId::new(2),
            code: "VWR-AAAA0001".to_owned(),
            role: CodeRole::Viewer,
            is_active: true,
            created_at: fixture_timestamp(),
            expires_at: None,
        }))
    });
    codes.expect_list().times(0);
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(|_| Err(UserRepositoryError::query("malformed purchase_date")));
    let verifier = CodeVerificationService::new(
        Arc::new(users),
        Arc::new(codes),
        Arc::new(MutableClock::new(fixture_timestamp())),
        CodeVerificationConfig::default(),
    );

    let outcome = verifier.verify("VWR-AAAA0001").await;

    assert_eq!(outcome, VerificationOutcome::invalid(InvalidReason::LookupFailed));
}
