//! Check-in admission policy: the daily-limit decision and the UTC day
//! window every daily count is measured against.

use chrono::{DateTime, Days, Utc};

/// Outcome of the daily-limit decision for one checkpoint check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow { points_awarded: i64 },
    Deny { reason: DenyReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    DailyLimitReached,
}

/// Pure count comparison: a player who has already recorded
/// `max_per_day` checkpoint check-ins today gets nothing more until the
/// next UTC day.
pub fn decide(checkins_today: i64, max_per_day: i64, points_value: i64) -> Decision {
    if checkins_today >= max_per_day {
        Decision::Deny {
            reason: DenyReason::DailyLimitReached,
        }
    } else {
        Decision::Allow {
            points_awarded: points_value,
        }
    }
}

/// Half-open `[start_of_day, start_of_next_day)` bounds of the UTC
/// calendar day containing `now`. All "today" counting uses this window.
pub fn utc_day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .expect("tomorrow is representable");
    (start, end)
}
