//! Window status classification and status board rendering.
//!
//! Everything here is a pure function of a group record and "now", so the same
//! code serves the `status` command and the periodic board refresher.

use chrono::Duration;

use crate::tracker::types::{GroupRecord, MobRecord, RespawnWindow, Timestamp};

/// Where a tracked mob currently sits relative to its respawn window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    TrackingOff,
    NoWindow,
    NoReference,
    /// Window not open yet; time until it opens.
    Closed { opens_in: Duration },
    /// Inside the window (both edges inclusive); time until the late bound.
    Open { closes_in: Duration },
    /// Past the late bound; time elapsed since it.
    Overdue { overdue_by: Duration },
}

/// Convert fractional hours to a duration with microsecond precision.
pub fn hours_to_duration(hours: f64) -> Duration {
    Duration::microseconds((hours * 3_600_000_000.0).round() as i64)
}

/// Classify a window anchored at `reference` against `now`.
pub fn classify(window: RespawnWindow, reference: Timestamp, now: Timestamp) -> WindowStatus {
    // Compared as offsets from `reference`; `reference + hours` may leave chrono's date range.
    let elapsed = now - reference;
    let earliest = hours_to_duration(window.min_hours);
    let latest = hours_to_duration(window.max_hours);
    if elapsed < earliest {
        WindowStatus::Closed {
            opens_in: earliest.checked_sub(&elapsed).unwrap_or(Duration::MAX),
        }
    } else if elapsed <= latest {
        WindowStatus::Open {
            closes_in: latest.checked_sub(&elapsed).unwrap_or(Duration::MAX),
        }
    } else {
        WindowStatus::Overdue {
            overdue_by: elapsed.checked_sub(&latest).unwrap_or(Duration::MAX),
        }
    }
}

/// Evaluate a mob's status at `now`.
pub fn evaluate(mob: &MobRecord, now: Timestamp) -> WindowStatus {
    if !mob.tracking {
        return WindowStatus::TrackingOff;
    }
    let Some(window) = mob.window() else {
        return WindowStatus::NoWindow;
    };
    let Some(reference) = mob.reference_time() else {
        return WindowStatus::NoReference;
    };
    classify(window, reference, now)
}

/// Render a duration as `45m`, `2h 5m` or `2h 0m`. The sign is dropped.
pub fn format_timedelta(delta: Duration) -> String {
    let total = delta.num_seconds().unsigned_abs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Presentation knobs for board text.
#[derive(Debug, Clone)]
pub struct BoardFormat {
    pub title: String,
    /// Command prefix shown in hints (`!setwindow ...`).
    pub prefix: String,
}

pub const DEFAULT_BOARD_TITLE: &str = "__**Contested Mob Spawn Windows**__";

impl Default for BoardFormat {
    fn default() -> Self {
        Self {
            title: DEFAULT_BOARD_TITLE.to_string(),
            prefix: "!".to_string(),
        }
    }
}

/// One board line for a mob.
pub fn status_line(key: &str, mob: &MobRecord, now: Timestamp, fmt: &BoardFormat) -> String {
    let name = if mob.display_name.is_empty() {
        key
    } else {
        mob.display_name.as_str()
    };
    let conf = mob.learned_confidence;
    match evaluate(mob, now) {
        WindowStatus::TrackingOff => format!("❌ {} — tracking OFF", name),
        WindowStatus::NoWindow => format!(
            "⚠️ {} — no spawn window (`{}setwindow {} min max`)",
            name, fmt.prefix, name
        ),
        WindowStatus::NoReference => format!(
            "ℹ️ {} — no TOD or spawn recorded yet. (confidence: {})",
            name, conf
        ),
        WindowStatus::Closed { opens_in } => format!(
            "⏳ {} — window CLOSED, opens in **{}** (confidence: {})",
            name,
            format_timedelta(opens_in),
            conf
        ),
        WindowStatus::Open { closes_in } => format!(
            "✅ {} — **WINDOW OPEN**, ~{} left (confidence: {})",
            name,
            format_timedelta(closes_in),
            conf
        ),
        WindowStatus::Overdue { overdue_by } => format!(
            "🔥 {} — window OVERDUE by **{}** (confidence: {})",
            name,
            format_timedelta(overdue_by),
            conf
        ),
    }
}

fn tracked_lines(group: &GroupRecord, now: Timestamp, fmt: &BoardFormat) -> Vec<String> {
    group
        .tracked()
        .map(|(key, mob)| status_line(key, mob, now, fmt))
        .collect()
}

/// Text for the self-updating status board message.
pub fn render_board(group: &GroupRecord, now: Timestamp, fmt: &BoardFormat) -> String {
    if group.mobs.is_empty() {
        return format!("No mobs tracked. Use `{}track MobName`.", fmt.prefix);
    }
    let lines = tracked_lines(group, now, fmt);
    if lines.is_empty() {
        return "No mobs with tracking ON.".to_string();
    }
    format!("{}\n{}", fmt.title, lines.join("\n"))
}

/// Reply to an on-demand `status` command.
pub fn render_status_reply(group: &GroupRecord, now: Timestamp, fmt: &BoardFormat) -> String {
    if group.mobs.is_empty() {
        return "No mobs tracked.".to_string();
    }
    let lines = tracked_lines(group, now, fmt);
    if lines.is_empty() {
        return "No mobs have tracking enabled.".to_string();
    }
    format!("{}\n{}", fmt.title, lines.join("\n"))
}
