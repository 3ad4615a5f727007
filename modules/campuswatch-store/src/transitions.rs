use tracing::info;

use campuswatch_common::{CampusError, Incident, IncidentStatus, User};

/// Check the actor against the status-authority group. Denials surface as
/// a permission error, never silently ignored.
pub fn authorize_status_change(actor: &User) -> Result<(), CampusError> {
    if actor.role.can_change_status() {
        Ok(())
    } else {
        Err(CampusError::Auth(format!(
            "role {} may not change incident status",
            actor.role
        )))
    }
}

/// Move an incident to a new status on behalf of an actor.
///
/// Baseline transition graph: any status may move to any other, including
/// a direct reported -> resolved jump. What is enforced is *who* may move
/// it. On denial the incident is left untouched.
pub fn apply_status_change(
    incident: &mut Incident,
    next: IncidentStatus,
    actor: &User,
) -> Result<(), CampusError> {
    authorize_status_change(actor)?;
    let prev = incident.status;
    incident.status = next;
    info!(
        incident = %incident.id,
        from = %prev,
        to = %next,
        by = %actor.role,
        "incident status changed"
    );
    Ok(())
}
