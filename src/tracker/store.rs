//! Mutation protocol for a group's tracked mobs.
//!
//! Every operation resolves the supplied name first. Ambiguous names abort with
//! the candidates' display names and leave the record untouched. Unknown names
//! either create a fresh mob under the normalized input (death, sighting,
//! track, setwindow) or fail with `NotFound` (untrack, delete, rename, undo).
//!
//! Callers run these inside [`crate::storage::Storage::update_group`], which
//! only persists the record when the operation returns `Ok`.

use log::debug;

use crate::tracker::errors::TrackerError;
use crate::tracker::learner::{learn_window, Learned};
use crate::tracker::resolver::{normalize_name, resolve_mob_name, ResolveResult};
use crate::tracker::types::{
    ChannelId, Confidence, GroupRecord, MobRecord, RespawnWindow, Timestamp, TOD_HISTORY_CAP,
};

/// Result of recording a time of death.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecorded {
    pub key: String,
    pub created: bool,
    pub learned: Learned,
}

/// Result of undoing the latest TOD.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoOutcome {
    pub key: String,
    pub removed: Timestamp,
    /// `Some` when enough history remained to re-learn.
    pub relearned: Option<Learned>,
}

/// Keys before and after a rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub old_key: String,
    pub new_key: String,
}

fn require_name(name: &str, usage: &'static str) -> Result<(), TrackerError> {
    if name.trim().is_empty() {
        return Err(TrackerError::MissingArgument(usage));
    }
    Ok(())
}

/// Largest window bound `setwindow` accepts, in hours.
pub const MAX_WINDOW_HOURS: f64 = 10_000.0;

/// Check operator-supplied window bounds.
pub fn validate_window(min_h: f64, max_h: f64) -> Result<RespawnWindow, TrackerError> {
    if !min_h.is_finite() || !max_h.is_finite() {
        return Err(TrackerError::InvalidWindow(
            "min and max must be numbers.".to_string(),
        ));
    }
    if min_h <= 0.0 || max_h <= 0.0 {
        return Err(TrackerError::InvalidWindow(
            "min and max must be greater than zero.".to_string(),
        ));
    }
    if min_h > max_h {
        return Err(TrackerError::InvalidWindow(
            "min must not exceed max.".to_string(),
        ));
    }
    if max_h > MAX_WINDOW_HOURS {
        return Err(TrackerError::InvalidWindow(format!(
            "max must be at most {} hours.",
            MAX_WINDOW_HOURS
        )));
    }
    Ok(RespawnWindow {
        min_hours: min_h,
        max_hours: max_h,
    })
}

/// Store learner output: confidence always, window bounds only when learned.
fn apply_learned(mob: &mut MobRecord, learned: &Learned) {
    if let Some(window) = learned.window {
        mob.set_window(Some(window));
    }
    mob.learned_confidence = learned.confidence;
}

impl GroupRecord {
    /// Resolve a name against this group's keys.
    pub fn resolve(&self, name: &str) -> ResolveResult {
        resolve_mob_name(name, self.mobs.keys())
    }

    fn ambiguous(&self, keys: Vec<String>) -> TrackerError {
        TrackerError::Ambiguous {
            candidates: keys.iter().map(|k| self.display_name(k)).collect(),
        }
    }

    /// Resolve to an existing key, failing on ambiguity or absence.
    pub fn resolve_existing(&self, name: &str) -> Result<String, TrackerError> {
        match self.resolve(name) {
            ResolveResult::Found(key) if self.mobs.contains_key(&key) => Ok(key),
            ResolveResult::Ambiguous(keys) => Err(self.ambiguous(keys)),
            _ => Err(TrackerError::NotFound(name.trim().to_string())),
        }
    }

    /// Resolve to a key, creating a default mob when nothing matches.
    /// Returns the key and whether it was created.
    fn resolve_or_create(&mut self, name: &str) -> Result<(String, bool), TrackerError> {
        match self.resolve(name) {
            ResolveResult::Found(key) => Ok((key, false)),
            ResolveResult::Ambiguous(keys) => Err(self.ambiguous(keys)),
            ResolveResult::NotFound => {
                let key = normalize_name(name);
                debug!("creating mob '{}'", key);
                self.mobs.insert(key.clone(), MobRecord::new(name.trim()));
                Ok((key, true))
            }
        }
    }

    fn mob_mut(&mut self, key: &str) -> Result<&mut MobRecord, TrackerError> {
        self.mobs
            .get_mut(key)
            .ok_or_else(|| TrackerError::Internal(format!("resolved key '{}' vanished", key)))
    }

    /// Record a time of death, append it to history and re-learn the window.
    pub fn record_death(&mut self, name: &str, at: Timestamp) -> Result<DeathRecorded, TrackerError> {
        require_name(name, "tod MobName [date] [HHMM]")?;
        let (key, created) = self.resolve_or_create(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        mob.last_death = Some(at);

        mob.tod_history.push(at);
        mob.tod_history.sort();
        if mob.tod_history.len() > TOD_HISTORY_CAP {
            let excess = mob.tod_history.len() - TOD_HISTORY_CAP;
            mob.tod_history.drain(..excess);
        }

        let learned = learn_window(&mob.tod_history);
        apply_learned(mob, &learned);
        Ok(DeathRecorded {
            key,
            created,
            learned,
        })
    }

    /// Record a sighting (spawn). Touches only `last_spawn` and the display name.
    pub fn record_sighting(&mut self, name: &str, at: Timestamp) -> Result<String, TrackerError> {
        require_name(name, "spawn MobName [HHMM]")?;
        let (key, _) = self.resolve_or_create(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        mob.last_spawn = Some(at);
        Ok(key)
    }

    /// Turn tracking on, creating the mob if needed.
    pub fn enable_tracking(&mut self, name: &str) -> Result<String, TrackerError> {
        require_name(name, "track MobName")?;
        let (key, _) = self.resolve_or_create(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        mob.tracking = true;
        Ok(key)
    }

    /// Turn tracking off for an existing mob; its data is kept.
    pub fn disable_tracking(&mut self, name: &str) -> Result<String, TrackerError> {
        require_name(name, "untrack MobName")?;
        let key = self.resolve_existing(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        mob.tracking = false;
        Ok(key)
    }

    /// Overwrite the window with operator values. History and confidence stay.
    pub fn set_window(&mut self, name: &str, min_h: f64, max_h: f64) -> Result<String, TrackerError> {
        require_name(name, "setwindow MobName min max")?;
        let window = validate_window(min_h, max_h)?;
        let (key, _) = self.resolve_or_create(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        mob.set_window(Some(window));
        Ok(key)
    }

    /// Remove a mob and all of its history.
    pub fn delete_mob(&mut self, name: &str) -> Result<MobRecord, TrackerError> {
        require_name(name, "deletemob MobName")?;
        let key = self.resolve_existing(name)?;
        self.mobs
            .remove(&key)
            .ok_or_else(|| TrackerError::NotFound(name.trim().to_string()))
    }

    /// Move a mob to the key derived from `new_name`.
    ///
    /// Fails with `NameTaken` if that key already belongs to a different mob.
    /// Renaming onto the same key only refreshes the display name.
    pub fn rename_mob(&mut self, old_name: &str, new_name: &str) -> Result<Renamed, TrackerError> {
        require_name(old_name, "renamemob Old Name | New Name")?;
        require_name(new_name, "renamemob Old Name | New Name")?;
        let old_key = self.resolve_existing(old_name)?;
        let new_key = normalize_name(new_name);
        if new_key != old_key && self.mobs.contains_key(&new_key) {
            return Err(TrackerError::NameTaken(new_name.trim().to_string()));
        }
        let mut mob = self
            .mobs
            .remove(&old_key)
            .ok_or_else(|| TrackerError::NotFound(old_name.trim().to_string()))?;
        mob.display_name = new_name.trim().to_string();
        self.mobs.insert(new_key.clone(), mob);
        Ok(Renamed { old_key, new_key })
    }

    /// Drop the most recent TOD.
    ///
    /// With two or more entries left the window is re-learned. With fewer, the
    /// window is cleared and confidence reset, including any window that was
    /// set by hand.
    pub fn undo_last_death(&mut self, name: &str) -> Result<UndoOutcome, TrackerError> {
        require_name(name, "undo MobName")?;
        let key = self.resolve_existing(name)?;
        let mob = self.mob_mut(&key)?;
        mob.display_name = name.trim().to_string();
        let removed = mob
            .tod_history
            .pop()
            .ok_or_else(|| TrackerError::NoHistory(mob.display_name.clone()))?;

        let relearned = if mob.tod_history.len() >= 2 {
            let learned = learn_window(&mob.tod_history);
            apply_learned(mob, &learned);
            Some(learned)
        } else {
            mob.set_window(None);
            mob.learned_confidence = Confidence::Low;
            None
        };
        Ok(UndoOutcome {
            key,
            removed,
            relearned,
        })
    }

    /// Point the status board at `channel`; the old board message is forgotten.
    pub fn set_status_channel(&mut self, channel: ChannelId) {
        self.status_channel_id = Some(channel);
        self.status_message_id = None;
    }
}
