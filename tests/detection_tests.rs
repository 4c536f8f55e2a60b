//! Suspicious activity detection and activity query tests

mod common;

use chrono::{DateTime, Duration, Utc};
use common::{Building, t0};
use doorkeeper::config::load_config_from_str;
use doorkeeper::model::DoorId;
use doorkeeper::{MemoryStore, SecurityService};
use rstest::rstest;
use std::sync::Arc;

fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// Log a history of (seconds after t0, succeeded) on the building's door
fn log_history(b: &Building, door: DoorId, history: &[(i64, bool)]) -> Vec<u64> {
    history
        .iter()
        .map(|(secs, succeeded)| {
            b.service
                .logger()
                .log_attempt(door, &[], *succeeded, at(*secs))
                .unwrap()
                .get()
        })
        .collect()
}

fn suspicious_offsets(b: &Building) -> Vec<i64> {
    b.service
        .find_suspicious(at(-60), at(3600))
        .unwrap()
        .iter()
        .map(|a| (a.timestamp - t0()).num_seconds())
        .collect()
}

// =============================================================================
// Detection scenarios
// =============================================================================

#[rstest]
// Success at +1m resolves both earlier failures in time, +4m resolves +3m
#[case::all_resolved_in_time(&[(0, false), (30, false), (60, true), (180, false), (240, true)], &[])]
#[case::late_success(&[(0, false), (300, true)], &[0])]
#[case::never_resolved(&[(0, false), (30, false)], &[])]
#[case::late_then_trailing(&[(0, false), (300, true), (310, false)], &[0])]
#[case::only_late_failures_reported(&[(0, false), (100, false), (150, true)], &[0])]
#[case::exactly_two_minutes(&[(0, false), (120, true)], &[])]
#[case::successes_only(&[(0, true), (500, true)], &[])]
fn test_suspicious_scenarios(#[case] history: &[(i64, bool)], #[case] expected: &[i64]) {
    let b = Building::new();
    log_history(&b, b.door.id, history);
    assert_eq!(suspicious_offsets(&b), expected);
}

#[test]
fn test_trailing_failure_is_never_reported() {
    // A failure with no later success anywhere in range stays unreported,
    // however old it is.
    let b = Building::new();
    log_history(&b, b.door.id, &[(0, true), (10, false)]);
    assert!(
        b.service
            .find_suspicious(at(-1), at(86_400))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_success_on_another_door_resolves_failure() {
    let b = Building::new();
    let lab = b.service.add_door("Lab", "Floor 2").unwrap();
    log_history(&b, b.door.id, &[(0, false)]);
    log_history(&b, lab.id, &[(30, true)]);

    assert!(suspicious_offsets(&b).is_empty());
}

#[test]
fn test_failures_are_reported_in_timestamp_order() {
    let b = Building::new();
    // Logged out of order
    log_history(&b, b.door.id, &[(400, true), (10, false), (0, false)]);
    assert_eq!(suspicious_offsets(&b), vec![0, 10]);
}

#[test]
fn test_window_bounds_are_exclusive() {
    let b = Building::new();
    log_history(&b, b.door.id, &[(0, false), (300, true)]);

    // The failure sits exactly on `from`, so it is outside the window
    assert!(b.service.find_suspicious(at(0), at(301)).unwrap().is_empty());
    // The success sits exactly on `to`, so the failure is never resolved
    assert!(b.service.find_suspicious(at(-1), at(300)).unwrap().is_empty());
    assert_eq!(b.service.find_suspicious(at(-1), at(301)).unwrap().len(), 1);
}

#[test]
fn test_configured_window() {
    let config = load_config_from_str(
        r#"
[storage]
backend = "memory"

[detection]
resolution_window_secs = 30
"#,
    )
    .unwrap();
    let service = SecurityService::from_config(Arc::new(MemoryStore::new()), &config).unwrap();
    let door = service.add_door("Lobby", "Ground").unwrap();
    service.logger().log_attempt(door.id, &[], false, at(0)).unwrap();
    service.logger().log_attempt(door.id, &[], true, at(45)).unwrap();

    assert_eq!(service.detector().window(), Duration::seconds(30));
    assert_eq!(service.find_suspicious(at(-1), at(60)).unwrap().len(), 1);
}

// =============================================================================
// Activity queries
// =============================================================================

#[test]
fn test_logged_attempt_is_returned_exactly_once() {
    let b = Building::new();
    let code = b.shared_code("8080");
    let id = b
        .service
        .logger()
        .log_attempt(b.door.id, &[code.id], false, at(42))
        .unwrap();

    let attempts = b.service.logger().activity(at(0), at(100)).unwrap();
    let matching: Vec<_> = attempts.iter().filter(|a| a.id == id).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].credentials, vec![code.id]);
    assert_eq!(matching[0].timestamp, at(42));
}

#[test]
fn test_door_activity_filters_by_door() {
    let b = Building::new();
    let lab = b.service.add_door("Lab", "Floor 2").unwrap();
    log_history(&b, b.door.id, &[(0, true), (20, false)]);
    let lab_ids = log_history(&b, lab.id, &[(10, false)]);

    let attempts = b
        .service
        .logger()
        .door_activity(at(-1), at(60), lab.id)
        .unwrap();
    let ids: Vec<u64> = attempts.iter().map(|a| a.id.get()).collect();
    assert_eq!(ids, lab_ids);

    assert_eq!(b.service.logger().activity(at(-1), at(60)).unwrap().len(), 3);
}

#[test]
fn test_door_activity_for_missing_door() {
    let b = Building::new();
    let err = b
        .service
        .logger()
        .door_activity(at(0), at(10), DoorId::new(12))
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_inverted_window_is_a_validation_error() {
    let b = Building::new();
    assert!(
        b.service
            .find_suspicious(at(10), at(0))
            .unwrap_err()
            .is_validation()
    );
}
