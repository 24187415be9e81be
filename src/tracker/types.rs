//! Persisted record types for tracked mobs and their owning group.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Absolute timestamp carrying the canonical zone's offset at that instant.
pub type Timestamp = DateTime<FixedOffset>;

/// Platform channel reference (status board destination).
pub type ChannelId = u64;

/// Platform message reference (status board message edited in place).
pub type MessageId = u64;

/// Maximum number of TOD entries retained per mob.
pub const TOD_HISTORY_CAP: usize = 10;

/// How much observed history backs a learned window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `[min, max]` respawn interval in hours after the reference timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RespawnWindow {
    pub min_hours: f64,
    pub max_hours: f64,
}

/// One tracked mob. The map key it is stored under is its canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobRecord {
    #[serde(default)]
    pub display_name: String,
    /// Records written without the flag load as not tracked.
    #[serde(default)]
    pub tracking: bool,
    #[serde(default)]
    pub min_respawn_hours: Option<f64>,
    #[serde(default)]
    pub max_respawn_hours: Option<f64>,
    #[serde(default)]
    pub last_death: Option<Timestamp>,
    #[serde(default)]
    pub last_spawn: Option<Timestamp>,
    #[serde(default)]
    pub tod_history: Vec<Timestamp>,
    #[serde(default)]
    pub learned_confidence: Confidence,
}

impl MobRecord {
    /// Fresh record: tracking on, no window, no references, empty history.
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            tracking: true,
            min_respawn_hours: None,
            max_respawn_hours: None,
            last_death: None,
            last_spawn: None,
            tod_history: Vec::new(),
            learned_confidence: Confidence::Low,
        }
    }

    /// The current window, present only when both bounds are set.
    pub fn window(&self) -> Option<RespawnWindow> {
        match (self.min_respawn_hours, self.max_respawn_hours) {
            (Some(min_hours), Some(max_hours)) => Some(RespawnWindow {
                min_hours,
                max_hours,
            }),
            _ => None,
        }
    }

    pub fn set_window(&mut self, window: Option<RespawnWindow>) {
        self.min_respawn_hours = window.map(|w| w.min_hours);
        self.max_respawn_hours = window.map(|w| w.max_hours);
    }

    /// Reference point for window math: last death, else last sighting.
    pub fn reference_time(&self) -> Option<Timestamp> {
        self.last_death.or(self.last_spawn)
    }
}

/// Everything persisted for one community group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(default)]
    pub status_channel_id: Option<ChannelId>,
    #[serde(default)]
    pub status_message_id: Option<MessageId>,
    #[serde(default)]
    pub mobs: BTreeMap<String, MobRecord>,
}

impl GroupRecord {
    /// Display name for a key, falling back to the key itself.
    pub fn display_name(&self, key: &str) -> String {
        self.mobs
            .get(key)
            .map(|m| m.display_name.clone())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn tracked(&self) -> impl Iterator<Item = (&String, &MobRecord)> {
        self.mobs.iter().filter(|(_, m)| m.tracking)
    }
}
