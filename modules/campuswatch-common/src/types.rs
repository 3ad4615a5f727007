use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CampusError;

// --- Campus geography ---

/// Closed set of reportable campus locations. `ALL` is the canonical
/// iteration order: rollups zero-fill from it and use it to break ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Block A")]
    BlockA,
    #[serde(rename = "Block R9")]
    BlockR9,
    #[serde(rename = "Btech EM Main Block")]
    BtechEmMainBlock,
    #[serde(rename = "New Block")]
    NewBlock,
    #[serde(rename = "Playground")]
    Playground,
    #[serde(rename = "Pharmacy Block")]
    PharmacyBlock,
    #[serde(rename = "Parking")]
    Parking,
    #[serde(rename = "Boys Hostel")]
    BoysHostel,
    #[serde(rename = "RC Main Block")]
    RcMainBlock,
    #[serde(rename = "Girls Hostel")]
    GirlsHostel,
    #[serde(rename = "RC Diploma Block")]
    RcDiplomaBlock,
    #[serde(rename = "RC Civil Block")]
    RcCivilBlock,
    #[serde(rename = "Canteen")]
    Canteen,
    #[serde(rename = "Block T")]
    BlockT,
    #[serde(rename = "Gate C")]
    GateC,
    #[serde(rename = "Gate B")]
    GateB,
    #[serde(rename = "Gate A")]
    GateA,
}

impl Location {
    pub const ALL: [Location; 17] = [
        Location::BlockA,
        Location::BlockR9,
        Location::BtechEmMainBlock,
        Location::NewBlock,
        Location::Playground,
        Location::PharmacyBlock,
        Location::Parking,
        Location::BoysHostel,
        Location::RcMainBlock,
        Location::GirlsHostel,
        Location::RcDiplomaBlock,
        Location::RcCivilBlock,
        Location::Canteen,
        Location::BlockT,
        Location::GateC,
        Location::GateB,
        Location::GateA,
    ];

    /// Parse a display name back into a location (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        Location::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(s.trim()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Location::BlockA => "Block A",
            Location::BlockR9 => "Block R9",
            Location::BtechEmMainBlock => "Btech EM Main Block",
            Location::NewBlock => "New Block",
            Location::Playground => "Playground",
            Location::PharmacyBlock => "Pharmacy Block",
            Location::Parking => "Parking",
            Location::BoysHostel => "Boys Hostel",
            Location::RcMainBlock => "RC Main Block",
            Location::GirlsHostel => "Girls Hostel",
            Location::RcDiplomaBlock => "RC Diploma Block",
            Location::RcCivilBlock => "RC Civil Block",
            Location::Canteen => "Canteen",
            Location::BlockT => "Block T",
            Location::GateC => "Gate C",
            Location::GateB => "Gate B",
            Location::GateA => "Gate A",
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// --- Incidents ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Fire,
    Fight,
    Medical,
    Harassment,
    Theft,
    SuspiciousActivity,
    Vandalism,
    Other,
}

impl std::fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentKind::Fire => write!(f, "fire"),
            IncidentKind::Fight => write!(f, "fight"),
            IncidentKind::Medical => write!(f, "medical"),
            IncidentKind::Harassment => write!(f, "harassment"),
            IncidentKind::Theft => write!(f, "theft"),
            IncidentKind::SuspiciousActivity => write!(f, "suspicious_activity"),
            IncidentKind::Vandalism => write!(f, "vandalism"),
            IncidentKind::Other => write!(f, "other"),
        }
    }
}

/// Canonical status vocabulary. `under_review` is accepted on input as a
/// legacy label for `investigating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Reported,
    #[serde(alias = "under_review")]
    Investigating,
    ActionTaken,
    Resolved,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Reported => write!(f, "reported"),
            IncidentStatus::Investigating => write!(f, "investigating"),
            IncidentStatus::ActionTaken => write!(f, "action_taken"),
            IncidentStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// A single submitted safety report.
///
/// `priority` and `duplicate_count` start at 1 and only ever increase, and
/// only the duplicate engine increases them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub location: Location,
    pub kind: IncidentKind,
    pub description: String,
    pub video_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub reported_by: String,
    pub status: IncidentStatus,
    pub priority: u32,
    pub duplicate_count: u32,
}

/// Maximum accepted length for an evidence link.
pub const MAX_VIDEO_URL_LEN: usize = 2048;

/// Creation-time fields for a report, before the duplicate engine has run.
/// `timestamp` defaults to now when unset; tests supply synthetic clocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDraft {
    pub location: Location,
    pub kind: IncidentKind,
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReportDraft {
    /// Field-level validation, run before anything reaches a collaborator.
    pub fn validate(&self) -> Result<(), CampusError> {
        if self.description.trim().is_empty() {
            return Err(CampusError::Validation(
                "description must not be empty".into(),
            ));
        }
        if let Some(raw) = &self.video_url {
            if raw.len() > MAX_VIDEO_URL_LEN {
                return Err(CampusError::Validation(format!(
                    "video_url too long (max {MAX_VIDEO_URL_LEN} characters)"
                )));
            }
            let parsed = url::Url::parse(raw)
                .map_err(|_| CampusError::Validation("video_url is not a valid URL".into()))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(CampusError::Validation(
                    "video_url must use http or https".into(),
                ));
            }
        }
        Ok(())
    }
}

// --- Severity rollup ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// How a per-location count maps to a severity tier.
///
/// `Relative` grades against the busiest location in the current set;
/// `Absolute` uses fixed thresholds. Selected by config, never implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityPolicy {
    Relative,
    Absolute,
}

impl SeverityPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relative" => Some(SeverityPolicy::Relative),
            "absolute" => Some(SeverityPolicy::Absolute),
            _ => None,
        }
    }
}

/// Derived per-location rollup. Recomputed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStats {
    pub location: Location,
    pub count: usize,
    pub severity: Severity,
}

// --- Users and roles ---

/// Closed role set with a flat capability lookup. The authority tier is
/// the whole group of admin-grade roles; route gating must check the
/// group, never a single role standing in for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
    SecurityHead,
    Principal,
    DepartmentHead,
    ClassSupervisor,
}

impl Role {
    pub const AUTHORITY: [Role; 5] = [
        Role::Admin,
        Role::SecurityHead,
        Role::Principal,
        Role::DepartmentHead,
        Role::ClassSupervisor,
    ];

    /// Member of the admin-grade tier (may open admin views).
    pub fn is_authority(self) -> bool {
        Role::AUTHORITY.contains(&self)
    }

    /// May move an incident between statuses.
    pub fn can_change_status(self) -> bool {
        matches!(self, Role::Admin | Role::SecurityHead | Role::Principal)
    }

    /// May approve or ban accounts.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin | Role::Principal)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
            Role::SecurityHead => write!(f, "security_head"),
            Role::Principal => write!(f, "principal"),
            Role::DepartmentHead => write!(f, "department_head"),
            Role::ClassSupervisor => write!(f, "class_supervisor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Pending,
    Approved,
    Banned,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountStatus::Pending => write!(f, "pending"),
            AccountStatus::Approved => write!(f, "approved"),
            AccountStatus::Banned => write!(f, "banned"),
        }
    }
}

/// The one canonical user shape. Email doubles as the login identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Registration payload. New accounts always land `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), CampusError> {
        if self.name.trim().is_empty() {
            return Err(CampusError::Validation("name must not be empty".into()));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(CampusError::Validation(
                "email must be a valid address".into(),
            ));
        }
        if self.secret.is_empty() {
            return Err(CampusError::Validation("password must not be empty".into()));
        }
        Ok(())
    }
}
