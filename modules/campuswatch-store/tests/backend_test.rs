//! In-memory backend behavior: atomic duplicate linkage on create,
//! insert fan-out, status authorization at the store, directory rules,
//! and the bounded-timeout wrapper.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use campuswatch_common::{
    AccountStatus, CampusError, IncidentKind, IncidentStatus, Location, NewUser, ReportDraft,
    Role, User,
};
use campuswatch_store::{
    with_deadline, DedupPolicy, Directory, IncidentRepository, MemoryBackend, RoleRequirement,
    UserFilter,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

fn draft(location: Location, description: &str, timestamp: DateTime<Utc>) -> ReportDraft {
    ReportDraft {
        location,
        kind: IncidentKind::Fire,
        description: description.to_string(),
        video_url: None,
        timestamp: Some(timestamp),
    }
}

fn actor(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Actor".to_string(),
        email: "actor@campus.local".to_string(),
        role,
        status: AccountStatus::Approved,
        phone: None,
    }
}

#[tokio::test]
async fn corroborating_report_escalates_the_original() {
    let backend = MemoryBackend::new(DedupPolicy::default());

    let first = backend
        .create_incident(
            draft(Location::GateA, "small fire near gate", t0()),
            "Student A".to_string(),
        )
        .await
        .unwrap();

    let second = backend
        .create_incident(
            draft(
                Location::GateA,
                "fire spotted near the gate",
                t0() + Duration::minutes(10),
            ),
            "Student B".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(second.priority, 2);
    assert_eq!(second.duplicate_count, 2);

    let all = backend.list_incidents().await.unwrap();
    let original = all.iter().find(|i| i.id == first.id).unwrap();
    assert_eq!(original.duplicate_count, 2);
    assert_eq!(original.priority, 2);
}

#[tokio::test]
async fn unrelated_report_starts_fresh() {
    let backend = MemoryBackend::new(DedupPolicy::default());

    backend
        .create_incident(
            draft(Location::GateA, "small fire near gate", t0()),
            "Student A".to_string(),
        )
        .await
        .unwrap();

    let unrelated = backend
        .create_incident(
            draft(
                Location::Playground,
                "broken glass on the field",
                t0() + Duration::minutes(5),
            ),
            "Student B".to_string(),
        )
        .await
        .unwrap();

    assert_eq!(unrelated.priority, 1);
    assert_eq!(unrelated.duplicate_count, 1);
}

#[tokio::test]
async fn empty_description_is_rejected_before_the_store_is_touched() {
    let backend = MemoryBackend::new(DedupPolicy::default());

    let result = backend
        .create_incident(draft(Location::GateA, "   ", t0()), "Student".to_string())
        .await;

    assert!(matches!(result, Err(CampusError::Validation(_))));
    assert!(backend.list_incidents().await.unwrap().is_empty());
}

#[tokio::test]
async fn inserts_fan_out_to_subscribers() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let mut rx = backend.subscribe_inserts();

    let created = backend
        .create_incident(
            draft(Location::Canteen, "spilled oil near the counter", t0()),
            "Student".to_string(),
        )
        .await
        .unwrap();

    let delivered = rx.recv().await.unwrap();
    assert_eq!(delivered.id, created.id);
}

#[tokio::test]
async fn status_change_requires_the_authority_group() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let incident = backend
        .create_incident(
            draft(Location::Parking, "car window smashed", t0()),
            "Student".to_string(),
        )
        .await
        .unwrap();

    let denied = backend
        .update_incident_status(incident.id, IncidentStatus::Resolved, &actor(Role::Student))
        .await;
    assert!(matches!(denied, Err(CampusError::Auth(_))));

    let all = backend.list_incidents().await.unwrap();
    assert_eq!(all[0].status, IncidentStatus::Reported);

    let updated = backend
        .update_incident_status(
            incident.id,
            IncidentStatus::Investigating,
            &actor(Role::SecurityHead),
        )
        .await
        .unwrap();
    assert_eq!(updated.status, IncidentStatus::Investigating);
}

#[tokio::test]
async fn status_change_on_a_missing_incident_is_not_found() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let result = backend
        .update_incident_status(
            Uuid::new_v4(),
            IncidentStatus::Resolved,
            &actor(Role::Admin),
        )
        .await;

    assert!(matches!(result, Err(CampusError::NotFound(_))));
}

#[tokio::test]
async fn pending_and_banned_accounts_never_authenticate() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let pending = backend
        .create_user(NewUser {
            name: "New Student".to_string(),
            email: "new@campus.local".to_string(),
            secret: "pw".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    assert_eq!(pending.status, AccountStatus::Pending);

    let denied = backend.authenticate("new@campus.local", "pw", None).await;
    assert!(matches!(denied, Err(CampusError::Auth(_))));

    backend
        .set_user_status(pending.id, AccountStatus::Approved)
        .await
        .unwrap();
    let ok = backend
        .authenticate("new@campus.local", "pw", None)
        .await
        .unwrap();
    assert_eq!(ok.id, pending.id);

    backend
        .set_user_status(pending.id, AccountStatus::Banned)
        .await
        .unwrap();
    let banned = backend.authenticate("new@campus.local", "pw", None).await;
    assert!(matches!(banned, Err(CampusError::Auth(_))));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let profile = NewUser {
        name: "Student".to_string(),
        email: "student@campus.local".to_string(),
        secret: "pw".to_string(),
        phone: None,
    };
    backend.create_user(profile.clone()).await.unwrap();

    let again = backend.create_user(profile).await;
    assert!(matches!(again, Err(CampusError::Conflict(_))));
}

#[tokio::test]
async fn admin_entry_point_rejects_students_with_valid_credentials() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    let student = backend
        .create_user(NewUser {
            name: "Student".to_string(),
            email: "student@campus.local".to_string(),
            secret: "pw".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    backend
        .set_user_status(student.id, AccountStatus::Approved)
        .await
        .unwrap();

    let denied = backend
        .authenticate(
            "student@campus.local",
            "pw",
            Some(RoleRequirement::AuthorityTier),
        )
        .await;
    assert!(matches!(denied, Err(CampusError::Auth(_))));

    backend.seed_admin("admin@campus.local", "root").await;
    let ok = backend
        .authenticate(
            "admin@campus.local",
            "root",
            Some(RoleRequirement::AuthorityTier),
        )
        .await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn user_listing_filters_by_role_and_status() {
    let backend = MemoryBackend::new(DedupPolicy::default());
    backend.seed_admin("admin@campus.local", "root").await;
    backend
        .create_user(NewUser {
            name: "Student".to_string(),
            email: "student@campus.local".to_string(),
            secret: "pw".to_string(),
            phone: None,
        })
        .await
        .unwrap();

    let pending_students = backend
        .list_users(UserFilter {
            role: Some(Role::Student),
            status: Some(AccountStatus::Pending),
        })
        .await
        .unwrap();
    assert_eq!(pending_students.len(), 1);

    let everyone = backend.list_users(UserFilter::default()).await.unwrap();
    assert_eq!(everyone.len(), 2);
}

#[tokio::test]
async fn slow_collaborator_surfaces_a_timeout_kind() {
    let limit = StdDuration::from_millis(10);
    let result: Result<(), CampusError> = with_deadline(limit, async {
        tokio::time::sleep(StdDuration::from_secs(5)).await;
        Ok(())
    })
    .await;

    match result {
        Err(CampusError::Timeout(d)) => assert_eq!(d, limit),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn fast_collaborator_passes_through_the_deadline() {
    let result = with_deadline(StdDuration::from_secs(1), async { Ok(42u32) }).await;
    assert_eq!(result.unwrap(), 42);
}
