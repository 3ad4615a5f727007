use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use campuswatch_common::{
    AccountStatus, CampusError, Incident, IncidentStatus, NewUser, ReportDraft, Role, User,
};

use crate::gate::RoleRequirement;

/// Directory/session collaborator: who exists and who may log in.
/// Transport-agnostic: implementations decide where accounts live.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve credentials to a user. The optional requirement is an
    /// entry-point hint (e.g. the admin login form demands the authority
    /// tier). Pending and banned accounts never authenticate.
    async fn authenticate(
        &self,
        email: &str,
        secret: &str,
        required: Option<RoleRequirement>,
    ) -> Result<User, CampusError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, CampusError>;

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, CampusError>;

    async fn set_user_status(&self, id: Uuid, status: AccountStatus) -> Result<User, CampusError>;

    /// Register a new account. Lands `pending`; a duplicate identity is a
    /// `Conflict`, surfaced as its own error kind.
    async fn create_user(&self, profile: NewUser) -> Result<User, CampusError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

/// Incident repository collaborator.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Full fetch, newest first.
    async fn list_incidents(&self) -> Result<Vec<Incident>, CampusError>;

    /// Validate, run the duplicate engine against the current set, persist
    /// and broadcast. Returns the finalized incident.
    async fn create_incident(
        &self,
        draft: ReportDraft,
        reported_by: String,
    ) -> Result<Incident, CampusError>;

    /// Move an incident between statuses on behalf of an actor. The
    /// status-authority check happens here, at the canonical store.
    async fn update_incident_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        actor: &User,
    ) -> Result<Incident, CampusError>;

    /// Best-effort insert fan-out, at-least-once. Consumers de-duplicate
    /// by id; a lagged receiver should fall back to a full fetch.
    fn subscribe_inserts(&self) -> broadcast::Receiver<Incident>;
}

/// Bound an external call. Elapsed time surfaces as its own error kind so
/// callers can tell a slow collaborator from a failed one.
pub async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, CampusError>
where
    F: Future<Output = Result<T, CampusError>> + Send,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(CampusError::Timeout(limit)),
    }
}
