use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use campuswatch_common::{Incident, Location};

/// Tunables for duplicate linkage. The window is configurable so tests can
/// run against synthetic clocks.
#[derive(Debug, Clone)]
pub struct DedupPolicy {
    /// Maximum distance between report timestamps for corroboration.
    pub window: Duration,
    /// Description similarity must strictly exceed this to link.
    pub similarity_threshold: f64,
}

impl DedupPolicy {
    pub fn new(window_minutes: i64, similarity_threshold: f64) -> Self {
        Self {
            window: Duration::minutes(window_minutes),
            similarity_threshold,
        }
    }
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::new(30, 0.3)
    }
}

/// Bag-of-words overlap ratio between two descriptions.
///
/// Lowercase, split on whitespace, count the words present in both, divide
/// by the longer sequence's word count. Symmetric, bounded [0, 1]. Word
/// order and stemming are irrelevant; this is not semantic similarity.
pub fn description_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let a_words: Vec<&str> = a_lower.split_whitespace().collect();
    let b_words: Vec<&str> = b_lower.split_whitespace().collect();
    if a_words.is_empty() || b_words.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<&str> = a_words.iter().copied().collect();
    let b_set: HashSet<&str> = b_words.iter().copied().collect();
    let common = a_set.intersection(&b_set).count();
    common as f64 / a_words.len().max(b_words.len()) as f64
}

/// Result of linking one new report against the existing set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Corroborated incident ids in store order. Each one's
    /// `duplicate_count` and `priority` must be incremented by exactly 1.
    pub corroborated: Vec<Uuid>,
    /// Finalized counters for the new incident. With multiple matches the
    /// last match in store order wins: the new report inherits that
    /// incident's post-increment counters.
    pub priority: u32,
    pub duplicate_count: u32,
}

impl LinkOutcome {
    pub fn is_duplicate(&self) -> bool {
        !self.corroborated.is_empty()
    }
}

/// Decide whether a new report corroborates existing incidents.
///
/// A report corroborates incident `e` iff the location matches exactly,
/// the timestamps are within the policy window, and the description
/// similarity exceeds the policy threshold. Pure; callers apply the
/// increments to their store.
pub fn link_report(
    location: Location,
    timestamp: DateTime<Utc>,
    description: &str,
    existing: &[Incident],
    policy: &DedupPolicy,
) -> LinkOutcome {
    let mut outcome = LinkOutcome {
        corroborated: Vec::new(),
        priority: 1,
        duplicate_count: 1,
    };

    for e in existing {
        if e.location != location {
            continue;
        }
        if (e.timestamp - timestamp).abs() > policy.window {
            continue;
        }
        if description_similarity(&e.description, description) <= policy.similarity_threshold {
            continue;
        }
        outcome.priority = e.priority + 1;
        outcome.duplicate_count = e.duplicate_count + 1;
        outcome.corroborated.push(e.id);
    }

    outcome
}
