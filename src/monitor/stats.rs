//! Cumulative uptime/downtime accounting.

use crate::db::{ConnectivityState, StatsRecord};

/// Charge the time since the last update to `old` and record any transition.
///
/// The elapsed interval belongs to the state that was active during it, so
/// the accumulator is picked from `old`, not `new`. A clock that went
/// backwards contributes nothing and never moves `last_updated` back.
pub fn apply_transition(
    stats: &StatsRecord,
    old: ConnectivityState,
    new: ConnectivityState,
    now: i64,
) -> StatsRecord {
    let mut next = stats.clone();

    let delta = now - stats.last_updated;
    if delta < 0 {
        tracing::warn!("Clock moved back by {}ms, charging nothing", -delta);
    }
    let delta = delta.max(0);

    if old.is_online() {
        next.total_uptime_millis += delta;
    } else {
        next.total_downtime_millis += delta;
    }

    match (old.is_online(), new.is_online()) {
        (false, true) => next.last_online_start = Some(now),
        (true, false) => {
            next.disconnects += 1;
            next.last_offline_start = Some(now);
        }
        _ => {}
    }

    next.last_updated = stats.last_updated.max(now);
    next
}
