use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Enumerates supported `Staleness` values.
pub enum Staleness {
    Stale,
    Fresh,
}

/// Whole days elapsed between `last_activity` and `now`, truncated toward zero.
/// Activity stamped in the future (clock skew) counts as zero days.
pub fn inactivity_days(now: DateTime<Utc>, last_activity: DateTime<Utc>) -> i64 {
    now.signed_duration_since(last_activity).num_days().max(0)
}

/// An issue is stale once its age reaches the threshold; the boundary is inclusive.
pub fn classify_staleness(age_days: i64, threshold_days: u64) -> Staleness {
    let threshold = i64::try_from(threshold_days).unwrap_or(i64::MAX);
    if age_days >= threshold {
        Staleness::Stale
    } else {
        Staleness::Fresh
    }
}
