//! Authorization evaluator integration tests
//!
//! The rule: presented types ⊇ required types AND presented ⊆ authorized.

mod common;

use common::{Building, t0};
use doorkeeper::authorization::{AuthorizationDecision, DenialReason};
use doorkeeper::model::{Credential, CredentialId, DoorId};
use rstest::rstest;

// =============================================================================
// Required types × authorized credentials
// =============================================================================

/// Door requires badge + fingerprint; Alice's badge and fingerprint and
/// Bob's badge are authorized, Bob's fingerprint is not.
fn two_factor_door() -> (Building, [Credential; 4]) {
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.badge.id)
        .unwrap();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.fingerprint.id)
        .unwrap();

    let alice_badge = b.issue(&b.badge, "A-100", &b.alice);
    let alice_finger = b.issue(&b.fingerprint, "A-FP", &b.alice);
    let bob_badge = b.issue(&b.badge, "B-200", &b.bob);
    let bob_finger = b.issue(&b.fingerprint, "B-FP", &b.bob);

    b.service
        .policy()
        .grant_access(b.door.id, &[alice_badge.id, alice_finger.id, bob_badge.id])
        .unwrap();

    (b, [alice_badge, alice_finger, bob_badge, bob_finger])
}

#[rstest]
#[case::both_factors(&[0, 1], true)]
#[case::both_factors_reordered(&[1, 0], true)]
#[case::badge_only(&[0], false)]
#[case::fingerprint_only(&[1], false)]
#[case::nothing(&[], false)]
#[case::extra_authorized_credential(&[0, 1, 2], true)]
#[case::mixed_owners_all_authorized(&[2, 1], true)]
#[case::unauthorized_second_factor(&[2, 3], false)]
#[case::unauthorized_extra_credential(&[0, 1, 3], false)]
fn test_two_factor_door(#[case] presented: &[usize], #[case] expected: bool) {
    let (b, creds) = two_factor_door();
    let presented: Vec<CredentialId> = presented.iter().map(|i| creds[*i].id).collect();

    let authorized = b
        .service
        .evaluator()
        .is_authorized(b.door.id, &presented)
        .unwrap();
    assert_eq!(authorized, expected);
}

#[test]
fn test_authorized_credential_of_wrong_type_does_not_satisfy_requirement() {
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.fingerprint.id)
        .unwrap();
    let badge = b.issue(&b.badge, "A-1", &b.alice);
    b.service.policy().grant_access(b.door.id, &[badge.id]).unwrap();

    let decision = b.service.evaluator().evaluate(b.door.id, &[badge.id]).unwrap();
    assert_eq!(
        decision,
        AuthorizationDecision::Denied(DenialReason::MissingCredentialType {
            credential_type: b.fingerprint.id
        })
    );
}

#[test]
fn test_unauthorized_credential_is_named() {
    let b = Building::new();
    let code = b.shared_code("9999");

    let decision = b
        .service
        .evaluator()
        .evaluate(b.door.id, &[code.id])
        .unwrap();
    assert_eq!(
        decision,
        AuthorizationDecision::Denied(DenialReason::UnauthorizedCredential {
            credential: code.id
        })
    );
}

#[test]
fn test_credential_types_come_from_the_store() {
    // Only Alice's badge is authorized. Presenting it twice must not count
    // as the fingerprint factor.
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.badge.id)
        .unwrap();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.fingerprint.id)
        .unwrap();
    let badge = b.issue(&b.badge, "A-100", &b.alice);
    b.service.policy().grant_access(b.door.id, &[badge.id]).unwrap();

    let decision = b
        .service
        .evaluator()
        .evaluate(b.door.id, &[badge.id, badge.id])
        .unwrap();
    assert_eq!(
        decision,
        AuthorizationDecision::Denied(DenialReason::MissingCredentialType {
            credential_type: b.fingerprint.id
        })
    );
}

#[test]
fn test_evaluate_unknown_credential() {
    let b = Building::new();
    let err = b
        .service
        .evaluator()
        .evaluate(b.door.id, &[CredentialId::new(42)])
        .unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Empty presentations
// =============================================================================

#[test]
fn test_empty_presentation_passes_when_nothing_is_required() {
    let b = Building::new();
    assert!(b.service.evaluator().is_authorized(b.door.id, &[]).unwrap());
}

#[test]
fn test_empty_presentation_fails_when_a_type_is_required() {
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.key_code.id)
        .unwrap();
    assert!(!b.service.evaluator().is_authorized(b.door.id, &[]).unwrap());
}

#[test]
fn test_unrestricted_door_still_rejects_unauthorized_credentials() {
    // No requirements and no grants: any non-empty presentation fails
    let b = Building::new();
    let code = b.shared_code("0000");
    assert!(!b.service.evaluator().is_authorized(b.door.id, &[code.id]).unwrap());
}

// =============================================================================
// Evaluate-then-log flow
// =============================================================================

#[test]
fn test_attempt_access_logs_the_decision() {
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.key_code.id)
        .unwrap();
    let code = b.shared_code("1234");
    b.service.policy().grant_access(b.door.id, &[code.id]).unwrap();

    let granted = b.service.attempt_access(b.door.id, &[code.id], t0()).unwrap();
    assert!(granted.granted);

    let denied = b
        .service
        .attempt_access(b.door.id, &[], t0() + chrono::Duration::seconds(5))
        .unwrap();
    assert!(!denied.granted);
    assert!(denied.decision.is_denied());

    let history = b
        .service
        .logger()
        .activity(t0() - chrono::Duration::seconds(1), t0() + chrono::Duration::minutes(1))
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, granted.attempt);
    assert!(history[0].succeeded);
    assert_eq!(history[0].credentials, vec![code.id]);
    assert_eq!(history[1].id, denied.attempt);
    assert!(!history[1].succeeded);
    assert!(history[1].credentials.is_empty());
}

#[test]
fn test_attempt_access_with_unknown_credential() {
    let b = Building::new();
    let err = b
        .service
        .attempt_access(b.door.id, &[CredentialId::new(99)], t0())
        .unwrap_err();
    assert!(err.is_not_found());

    // Nothing was logged
    let history = b
        .service
        .logger()
        .activity(t0() - chrono::Duration::minutes(1), t0() + chrono::Duration::minutes(1))
        .unwrap();
    assert!(history.is_empty());
}

#[test]
fn test_evaluate_unknown_door() {
    let b = Building::new();
    let err = b
        .service
        .evaluator()
        .is_authorized(DoorId::new(404), &[])
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_outcome_serializes_with_decision() {
    let b = Building::new();
    let outcome = b.service.attempt_access(b.door.id, &[], t0()).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["granted"], true);
    assert_eq!(json["decision"], "granted");
    assert_eq!(json["door"], b.door.id.get());
}

#[test]
fn test_denied_outcome_serializes_with_reason() {
    let b = Building::new();
    b.service
        .policy()
        .require_credential_type(b.door.id, b.badge.id)
        .unwrap();
    let outcome = b.service.attempt_access(b.door.id, &[], t0()).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(
        json,
        serde_json::json!({
            "attempt": outcome.attempt.get(),
            "door": b.door.id.get(),
            "granted": false,
            "decision": "denied",
            "reason": "missing_credential_type",
            "credential_type": b.badge.id.get(),
        })
    );

    let code = b.shared_code("7777");
    let badge = b.issue(&b.badge, "A-1", &b.alice);
    b.service.policy().grant_access(b.door.id, &[badge.id]).unwrap();
    let outcome = b
        .service
        .attempt_access(b.door.id, &[badge.id, code.id], t0())
        .unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["decision"], "denied");
    assert_eq!(json["reason"], "unauthorized_credential");
    assert_eq!(json["credential"], code.id.get());
}
