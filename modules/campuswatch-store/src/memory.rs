use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

use campuswatch_common::{
    AccountStatus, CampusError, Incident, IncidentStatus, NewUser, ReportDraft, Role, User,
};

use crate::backend::{Directory, IncidentRepository, UserFilter};
use crate::dedup::{link_report, DedupPolicy};
use crate::gate::{evaluate, GateDecision, RoleRequirement, SessionState};
use crate::transitions::apply_status_change;

/// Insert fan-out buffer. A receiver that falls this far behind gets a
/// `Lagged` error and refetches.
const INSERT_CHANNEL_CAPACITY: usize = 256;

struct StoredUser {
    user: User,
    secret: String,
}

/// In-memory backend implementing both collaborator traits. Stands in for
/// the hosted store in tests and single-node deployments; the duplicate
/// engine runs inside `create_incident` under the write lock, so linkage
/// is atomic with the insert.
pub struct MemoryBackend {
    incidents: RwLock<Vec<Incident>>,
    users: RwLock<Vec<StoredUser>>,
    inserts: broadcast::Sender<Incident>,
    policy: DedupPolicy,
}

impl MemoryBackend {
    pub fn new(policy: DedupPolicy) -> Self {
        let (inserts, _) = broadcast::channel(INSERT_CHANNEL_CAPACITY);
        Self {
            incidents: RwLock::new(Vec::new()),
            users: RwLock::new(Vec::new()),
            inserts,
            policy,
        }
    }

    /// Seed the directory with an approved admin account so a fresh
    /// deployment has a way in.
    pub async fn seed_admin(&self, email: &str, secret: &str) -> User {
        let admin = User {
            id: Uuid::new_v4(),
            name: "Administrator".to_string(),
            email: email.to_string(),
            role: Role::Admin,
            status: AccountStatus::Approved,
            phone: None,
        };
        self.users.write().await.push(StoredUser {
            user: admin.clone(),
            secret: secret.to_string(),
        });
        admin
    }

    /// Directly insert an approved user. Test and bootstrap helper.
    pub async fn insert_user(&self, user: User, secret: &str) {
        self.users.write().await.push(StoredUser {
            user,
            secret: secret.to_string(),
        });
    }
}

#[async_trait]
impl IncidentRepository for MemoryBackend {
    async fn list_incidents(&self) -> Result<Vec<Incident>, CampusError> {
        let mut all = self.incidents.read().await.clone();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(all)
    }

    async fn create_incident(
        &self,
        draft: ReportDraft,
        reported_by: String,
    ) -> Result<Incident, CampusError> {
        draft.validate()?;

        let mut incidents = self.incidents.write().await;
        let timestamp = draft.timestamp.unwrap_or_else(Utc::now);
        let outcome = link_report(
            draft.location,
            timestamp,
            &draft.description,
            &incidents,
            &self.policy,
        );
        for id in &outcome.corroborated {
            if let Some(e) = incidents.iter_mut().find(|e| e.id == *id) {
                e.duplicate_count += 1;
                e.priority += 1;
            }
        }

        let incident = Incident {
            id: Uuid::new_v4(),
            location: draft.location,
            kind: draft.kind,
            description: draft.description,
            video_url: draft.video_url,
            timestamp,
            reported_by,
            status: IncidentStatus::Reported,
            priority: outcome.priority,
            duplicate_count: outcome.duplicate_count,
        };
        incidents.push(incident.clone());
        drop(incidents);

        info!(
            incident = %incident.id,
            location = %incident.location,
            corroborated = outcome.corroborated.len(),
            priority = incident.priority,
            "incident recorded"
        );

        // Best-effort: no receivers is fine.
        let _ = self.inserts.send(incident.clone());
        Ok(incident)
    }

    async fn update_incident_status(
        &self,
        id: Uuid,
        status: IncidentStatus,
        actor: &User,
    ) -> Result<Incident, CampusError> {
        let mut incidents = self.incidents.write().await;
        let incident = incidents
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| CampusError::NotFound(format!("incident {id}")))?;
        apply_status_change(incident, status, actor)?;
        Ok(incident.clone())
    }

    fn subscribe_inserts(&self) -> broadcast::Receiver<Incident> {
        self.inserts.subscribe()
    }
}

#[async_trait]
impl Directory for MemoryBackend {
    async fn authenticate(
        &self,
        email: &str,
        secret: &str,
        required: Option<RoleRequirement>,
    ) -> Result<User, CampusError> {
        let users = self.users.read().await;
        let stored = users
            .iter()
            .find(|s| s.user.email.eq_ignore_ascii_case(email) && s.secret == secret)
            .ok_or_else(|| CampusError::Auth("invalid credentials".into()))?;

        if let Some(required) = required {
            let decision = evaluate(&SessionState::Present(stored.user.clone()), required);
            if decision != GateDecision::Allow {
                return Err(CampusError::Auth("unauthorized for this entry point".into()));
            }
        }

        match stored.user.status {
            AccountStatus::Pending => Err(CampusError::Auth("account pending approval".into())),
            AccountStatus::Banned => Err(CampusError::Auth("account banned".into())),
            AccountStatus::Approved => Ok(stored.user.clone()),
        }
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, CampusError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|s| s.user.id == id).map(|s| s.user.clone()))
    }

    async fn list_users(&self, filter: UserFilter) -> Result<Vec<User>, CampusError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .map(|s| &s.user)
            .filter(|u| filter.role.is_none_or(|r| u.role == r))
            .filter(|u| filter.status.is_none_or(|st| u.status == st))
            .cloned()
            .collect())
    }

    async fn set_user_status(&self, id: Uuid, status: AccountStatus) -> Result<User, CampusError> {
        let mut users = self.users.write().await;
        let stored = users
            .iter_mut()
            .find(|s| s.user.id == id)
            .ok_or_else(|| CampusError::NotFound(format!("user {id}")))?;
        stored.user.status = status;
        info!(user = %stored.user.id, status = %status, "account status changed");
        Ok(stored.user.clone())
    }

    async fn create_user(&self, profile: NewUser) -> Result<User, CampusError> {
        profile.validate()?;
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|s| s.user.email.eq_ignore_ascii_case(&profile.email))
        {
            return Err(CampusError::Conflict(format!(
                "an account for {} already exists",
                profile.email
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: profile.name,
            email: profile.email,
            role: Role::Student,
            status: AccountStatus::Pending,
            phone: profile.phone,
        };
        users.push(StoredUser {
            user: user.clone(),
            secret: profile.secret,
        });
        info!(user = %user.id, "account registered, pending approval");
        Ok(user)
    }
}
