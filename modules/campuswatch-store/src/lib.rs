pub mod backend;
pub mod cache;
pub mod dedup;
pub mod feed;
pub mod gate;
pub mod memory;
pub mod severity;
pub mod transitions;

pub use backend::{with_deadline, Directory, IncidentRepository, UserFilter};
pub use cache::IncidentCache;
pub use dedup::{description_similarity, link_report, DedupPolicy, LinkOutcome};
pub use feed::{start_feed, FeedHandle};
pub use gate::{evaluate, log_denial, DenyReason, GateDecision, RoleRequirement, SessionState};
pub use memory::MemoryBackend;
pub use severity::location_rollup;
pub use transitions::{apply_status_change, authorize_status_change};
