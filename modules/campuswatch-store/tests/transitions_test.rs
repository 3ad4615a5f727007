//! Status transition authorization and the baseline transition graph.

use chrono::Utc;
use uuid::Uuid;

use campuswatch_common::{
    AccountStatus, CampusError, Incident, IncidentKind, IncidentStatus, Location, Role, User,
};
use campuswatch_store::transitions::apply_status_change;

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

fn reported_incident() -> Incident {
    Incident {
        id: Uuid::new_v4(),
        location: Location::Parking,
        kind: IncidentKind::Theft,
        description: "bike missing from the racks".to_string(),
        video_url: None,
        timestamp: Utc::now(),
        reported_by: "Anonymous".to_string(),
        status: IncidentStatus::Reported,
        priority: 1,
        duplicate_count: 1,
    }
}

#[test]
fn unauthorized_role_leaves_status_unchanged_and_reports_permission_error() {
    let mut incident = reported_incident();
    let result = apply_status_change(
        &mut incident,
        IncidentStatus::Resolved,
        &actor(Role::Student),
    );

    assert!(matches!(result, Err(CampusError::Auth(_))));
    assert_eq!(incident.status, IncidentStatus::Reported);
}

#[test]
fn direct_jump_from_reported_to_resolved_is_allowed() {
    let mut incident = reported_incident();
    apply_status_change(
        &mut incident,
        IncidentStatus::Resolved,
        &actor(Role::SecurityHead),
    )
    .unwrap();

    assert_eq!(incident.status, IncidentStatus::Resolved);
}

#[test]
fn only_the_status_authority_group_may_transition() {
    let allowed = [Role::Admin, Role::SecurityHead, Role::Principal];
    let denied = [Role::Student, Role::DepartmentHead, Role::ClassSupervisor];

    for role in allowed {
        let mut incident = reported_incident();
        assert!(
            apply_status_change(&mut incident, IncidentStatus::Investigating, &actor(role))
                .is_ok(),
            "{role} should be able to change status"
        );
    }
    for role in denied {
        let mut incident = reported_incident();
        assert!(
            apply_status_change(&mut incident, IncidentStatus::Investigating, &actor(role))
                .is_err(),
            "{role} should not be able to change status"
        );
        assert_eq!(incident.status, IncidentStatus::Reported);
    }
}

#[test]
fn transitions_walk_the_normal_lifecycle() {
    let mut incident = reported_incident();
    let head = actor(Role::SecurityHead);

    for next in [
        IncidentStatus::Investigating,
        IncidentStatus::ActionTaken,
        IncidentStatus::Resolved,
    ] {
        apply_status_change(&mut incident, next, &head).unwrap();
        assert_eq!(incident.status, next);
    }
}
