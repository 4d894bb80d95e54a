use crate::models::ActionRecord;

pub const SECONDS_PER_DAY: i64 = 86_400;
/// Months are approximated as 30 days throughout the pipeline.
pub const DAYS_PER_MONTH: i64 = 30;
pub const SECONDS_PER_MONTH: i64 = SECONDS_PER_DAY * DAYS_PER_MONTH;

/// Whole 30-day months between two Unix timestamps, in either order.
pub fn months_between(a: i64, b: i64) -> i64 {
    let (later, earlier) = if a >= b { (a, b) } else { (b, a) };
    later.saturating_sub(earlier) / SECONDS_PER_DAY / DAYS_PER_MONTH
}

/// Whether the gap after a user's most recent action reaches `month_threshold`.
///
/// `actions` are newest first. With a single action (or a second one without a
/// timestamp) the gap is measured against `now`; otherwise it is the gap
/// between the two most recent actions. A zero threshold always classifies.
pub fn is_inactive(actions: &[ActionRecord], month_threshold: u32, now: i64) -> bool {
    let Some(first) = actions.first() else {
        return false;
    };
    let anchor = first.created_at();
    if anchor == 0 {
        return false;
    }

    let compare = match actions.get(1).map(ActionRecord::created_at) {
        Some(second) if second != 0 => second,
        _ => now,
    };

    months_between(anchor, compare) >= i64::from(month_threshold)
}
