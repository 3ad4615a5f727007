use campuswatch_common::{Incident, Location, LocationStats, Severity, SeverityPolicy};

/// Per-location rollup feeding both the block grid and the ranked list.
///
/// Every enumerated location appears exactly once, absent ones at count 0.
/// Count policy: one raw count per stored incident, all statuses included,
/// not weighted by `duplicate_count`. Output is sorted count-descending
/// with ties kept in `Location::ALL` order, so the result is deterministic
/// for a given incident set.
pub fn location_rollup(incidents: &[Incident], policy: SeverityPolicy) -> Vec<LocationStats> {
    let mut stats: Vec<LocationStats> = Location::ALL
        .into_iter()
        .map(|location| LocationStats {
            location,
            count: incidents.iter().filter(|i| i.location == location).count(),
            severity: Severity::Low,
        })
        .collect();

    // Clamped to 1 so the relative thresholds never divide by zero.
    let max = stats.iter().map(|s| s.count).max().unwrap_or(0).max(1);
    for s in &mut stats {
        s.severity = tier_for(s.count, max, policy);
    }

    // Stable sort preserves Location::ALL order among equal counts.
    stats.sort_by(|a, b| b.count.cmp(&a.count));
    stats
}

/// Map a count to a severity tier under the given policy.
pub fn tier_for(count: usize, max: usize, policy: SeverityPolicy) -> Severity {
    match policy {
        SeverityPolicy::Absolute => {
            if count >= 10 {
                Severity::Critical
            } else if count >= 6 {
                Severity::High
            } else if count >= 3 {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
        SeverityPolicy::Relative => {
            if count == max && count > 0 {
                Severity::Critical
            } else if count as f64 >= 0.5 * max as f64 {
                Severity::High
            } else if count as f64 >= 0.25 * max as f64 {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
    }
}
