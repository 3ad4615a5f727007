use tracing::warn;

use campuswatch_common::{Role, User};

/// Session resolution lifecycle for one client. `Unresolved` means the
/// async lookup (persisted token or login) has not finished yet.
#[derive(Debug, Clone)]
pub enum SessionState {
    Unresolved,
    Absent,
    Present(User),
}

/// Capability level a protected view demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any authenticated user.
    AnyAuthenticated,
    /// A specific role. `admin` always satisfies an exact requirement.
    Exact(Role),
    /// Any role in the admin-grade tier.
    AuthorityTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoSession,
    WrongRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still resolving: suspend, never redirect.
    Wait,
    Allow,
    Deny(DenyReason),
}

/// Decide whether a view may render for the current session.
///
/// Pure over already-resolved state: an unresolved session always yields
/// `Wait`. Treating unresolved as denied would kick out a legitimate,
/// still-loading session.
pub fn evaluate(session: &SessionState, required: RoleRequirement) -> GateDecision {
    match session {
        SessionState::Unresolved => GateDecision::Wait,
        SessionState::Absent => GateDecision::Deny(DenyReason::NoSession),
        SessionState::Present(user) => {
            let allowed = match required {
                RoleRequirement::AnyAuthenticated => true,
                RoleRequirement::Exact(role) => user.role == role || user.role == Role::Admin,
                RoleRequirement::AuthorityTier => user.role.is_authority(),
            };
            if allowed {
                GateDecision::Allow
            } else {
                GateDecision::Deny(DenyReason::WrongRole)
            }
        }
    }
}

/// Audit record for a denial, distinguishing a missing session from an
/// insufficient role.
pub fn log_denial(reason: DenyReason, view: &str) {
    match reason {
        DenyReason::NoSession => warn!(view, "access denied: no session"),
        DenyReason::WrongRole => warn!(view, "access denied: insufficient role"),
    }
}
