//! Executes parsed commands against a group's persisted record.
//!
//! Every mutating command runs inside [`Storage::update_group`], so it sees the
//! latest state on disk and is serialized with the board refresher and other
//! commands for the same group. Replies are plain chat text.

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use log::{debug, info, warn};

use crate::bot::commands::{BotCommand, CommandParser};
use crate::logutil::escape_log;
use crate::metrics;
use crate::storage::Storage;
use crate::tracker::errors::{ErrorKind, TrackerError};
use crate::tracker::learner::Learned;
use crate::tracker::resolver::format_disambiguation_prompt;
use crate::tracker::status::{render_status_reply, BoardFormat};
use crate::tracker::timeparse::{format_when, now_in, parse_date, parse_time};
use crate::tracker::types::{ChannelId, Timestamp};

/// Where a command came from and what the caller may do.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub group_id: String,
    pub channel_id: ChannelId,
    /// Platform "manage channels" capability of the caller.
    pub can_manage_channels: bool,
}

impl CommandContext {
    pub fn new(group_id: &str, channel_id: ChannelId) -> Self {
        Self {
            group_id: group_id.to_string(),
            channel_id,
            can_manage_channels: false,
        }
    }

    pub fn with_manage_channels(mut self, allowed: bool) -> Self {
        self.can_manage_channels = allowed;
        self
    }
}

/// Hours as chat text: whole numbers keep one decimal (`8.0`), others print as-is.
pub fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{:.1}", hours)
    } else {
        format!("{}", hours)
    }
}

fn learned_line(learned: &Learned) -> Option<String> {
    learned.window.map(|w| {
        format!(
            "🧠 Auto-learned window: **{}–{} hours** (confidence: {}).",
            format_hours(w.min_hours),
            format_hours(w.max_hours),
            learned.confidence
        )
    })
}

/// Chat reply for a failed command.
pub fn error_reply(err: &TrackerError) -> String {
    match err {
        TrackerError::Ambiguous { candidates } => format_disambiguation_prompt(candidates),
        TrackerError::PermissionDenied(_) => {
            "You need the Manage Channels permission to do that.".to_string()
        }
        e if e.is_user_facing() => e.to_string(),
        _ => "⚠️ Could not save that change, please try again.".to_string(),
    }
}

pub struct CommandProcessor {
    storage: Arc<Storage>,
    parser: CommandParser,
    tz: Tz,
    format: BoardFormat,
}

impl CommandProcessor {
    pub fn new(storage: Arc<Storage>, tz: Tz, format: BoardFormat) -> Self {
        let parser = CommandParser::new(&format.prefix);
        Self {
            storage,
            parser,
            tz,
            format,
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Handle one incoming chat line. `None` means the line was not a command.
    pub async fn handle(&self, ctx: &CommandContext, raw: &str) -> Option<String> {
        self.handle_at(ctx, raw, now_in(&self.tz)).await
    }

    /// [`handle`](Self::handle) with an explicit "now".
    pub async fn handle_at(
        &self,
        ctx: &CommandContext,
        raw: &str,
        now: DateTime<Tz>,
    ) -> Option<String> {
        let cmd = self.parser.parse(raw);
        if cmd == BotCommand::Unknown {
            return None;
        }
        info!(
            "group {} channel {}: {} ({})",
            escape_log(&ctx.group_id),
            ctx.channel_id,
            cmd.verb(),
            escape_log(raw)
        );
        metrics::inc_commands_handled();
        match self.execute(ctx, cmd, now).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                let kind = e.kind();
                metrics::inc_command_failed(kind);
                match kind {
                    ErrorKind::Persistence => {
                        warn!("group {}: command failed: {}", escape_log(&ctx.group_id), e)
                    }
                    ErrorKind::Permission => warn!(
                        target: "security",
                        "group {} channel {}: denied: {}",
                        escape_log(&ctx.group_id),
                        ctx.channel_id,
                        e
                    ),
                    _ => debug!("group {}: rejected: {}", escape_log(&ctx.group_id), e),
                }
                Some(error_reply(&e))
            }
        }
    }

    /// Run a parsed command.
    pub async fn execute(
        &self,
        ctx: &CommandContext,
        cmd: BotCommand,
        now: DateTime<Tz>,
    ) -> Result<String, TrackerError> {
        let gid = ctx.group_id.as_str();
        match cmd {
            BotCommand::Tod { name, date, time } => {
                let at = resolve_tod_time(date.as_deref(), time.as_deref(), now)?;
                let out = self
                    .storage
                    .update_group(gid, |g| g.record_death(&name, at))
                    .await?;
                let mut msg = format!(
                    "☠️ Recorded TOD for **{}** at `{}`.",
                    name.trim(),
                    format_when(&at)
                );
                if let Some(line) = learned_line(&out.learned) {
                    msg.push('\n');
                    msg.push_str(&line);
                }
                Ok(msg)
            }
            BotCommand::Spawn { name, time } => {
                let at = match time {
                    Some(tok) => parse_time(&tok, None, now)?,
                    None => now.fixed_offset(),
                };
                self.storage
                    .update_group(gid, |g| g.record_sighting(&name, at))
                    .await?;
                Ok(format!(
                    "🌱 Recorded spawn for **{}** at `{}`.",
                    name.trim(),
                    format_when(&at)
                ))
            }
            BotCommand::Track(name) => {
                self.storage
                    .update_group(gid, |g| g.enable_tracking(&name))
                    .await?;
                Ok(format!("🟢 Tracking **{}** enabled.", name.trim()))
            }
            BotCommand::Untrack(name) => {
                self.storage
                    .update_group(gid, |g| g.disable_tracking(&name))
                    .await?;
                Ok(format!("🔴 Tracking **{}** disabled.", name.trim()))
            }
            BotCommand::DeleteMob(name) => {
                let removed = self
                    .storage
                    .update_group(gid, |g| g.delete_mob(&name))
                    .await?;
                info!(
                    "group {}: deleted mob '{}' ({} TOD entries)",
                    escape_log(gid),
                    escape_log(&removed.display_name),
                    removed.tod_history.len()
                );
                Ok(format!("🗑️ Deleted mob **{}**.", name.trim()))
            }
            BotCommand::RenameMob { old, new } => {
                let renamed = self
                    .storage
                    .update_group(gid, |g| g.rename_mob(&old, &new))
                    .await?;
                debug!(
                    "group {}: '{}' -> '{}'",
                    escape_log(gid),
                    renamed.old_key,
                    renamed.new_key
                );
                Ok(format!("✏️ Renamed **{}** → **{}**.", old.trim(), new.trim()))
            }
            BotCommand::Undo(name) => {
                let out = self
                    .storage
                    .update_group(gid, |g| g.undo_last_death(&name))
                    .await?;
                let removed = out.removed.to_rfc3339();
                Ok(match out.relearned.as_ref().and_then(|l| l.window.map(|w| (w, l.confidence))) {
                    Some((w, conf)) => format!(
                        "↩️ Removed last TOD (`{}`).\nNew window: **{}–{} hours** (confidence: {}).",
                        removed,
                        format_hours(w.min_hours),
                        format_hours(w.max_hours),
                        conf
                    ),
                    None if out.relearned.is_some() => format!(
                        "↩️ Removed last TOD (`{}`).\nRemaining TODs are too close together to learn a window.",
                        removed
                    ),
                    None => format!(
                        "↩️ Removed last TOD (`{}`).\nNot enough TOD data to compute a window.",
                        removed
                    ),
                })
            }
            BotCommand::SetWindow { name, min, max } => {
                self.storage
                    .update_group(gid, |g| g.set_window(&name, min, max))
                    .await?;
                Ok(format!(
                    "⏱️ Window for **{}** set to **{}-{} hours**.",
                    name.trim(),
                    format_hours(min),
                    format_hours(max)
                ))
            }
            BotCommand::SetStatusChannel(target) => {
                if !ctx.can_manage_channels {
                    return Err(TrackerError::PermissionDenied(
                        "setstatuschannel requires manage channels".to_string(),
                    ));
                }
                let channel = target.unwrap_or(ctx.channel_id);
                self.storage
                    .update_group(gid, |g| {
                        g.set_status_channel(channel);
                        Ok(())
                    })
                    .await?;
                info!(
                    "group {}: status board moved to channel {}",
                    escape_log(gid),
                    channel
                );
                Ok(format!("📡 Status updates will now appear in <#{}>.", channel))
            }
            BotCommand::Status => {
                let group = self.storage.load_group(gid).await?;
                Ok(render_status_reply(&group, now.fixed_offset(), &self.format))
            }
            BotCommand::Help => Ok(self.parser.help_text()),
            BotCommand::Invalid(reply) => Err(TrackerError::InvalidInput(reply)),
            BotCommand::Unknown => Err(TrackerError::Internal(
                "unknown command reached execute".to_string(),
            )),
        }
    }
}

/// Timestamp for a `tod` from its optional date and time tokens.
///
/// No tokens means "now". A date alone is rejected.
pub fn resolve_tod_time(
    date: Option<&str>,
    time: Option<&str>,
    now: DateTime<Tz>,
) -> Result<Timestamp, TrackerError> {
    let date = date.map(parse_date).transpose()?;
    match (date, time) {
        (Some(_), None) => Err(TrackerError::DateWithoutTime),
        (date, Some(tok)) => parse_time(tok, date, now),
        (None, None) => Ok(now.fixed_offset()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn now() -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2025, 12, 5, 10, 0, 0).unwrap()
    }

    #[test]
    fn tod_time_composition() {
        assert_eq!(resolve_tod_time(None, None, now()).unwrap(), now().fixed_offset());
        assert!(matches!(
            resolve_tod_time(Some("2025-12-05"), None, now()),
            Err(TrackerError::DateWithoutTime)
        ));
        let at = resolve_tod_time(Some("12/04/2025"), Some("2330"), now()).unwrap();
        assert_eq!(format_when(&at), "2025-12-04 23:30");
        let rolled = resolve_tod_time(None, Some("1100"), now()).unwrap();
        assert_eq!(format_when(&rolled), "2025-12-04 11:00");
    }

    #[test]
    fn hours_formatting() {
        assert_eq!(format_hours(8.0), "8.0");
        assert_eq!(format_hours(11.4), "11.4");
        assert_eq!(format_hours(12.6), "12.6");
    }

    #[test]
    fn error_replies() {
        let amb = TrackerError::Ambiguous {
            candidates: vec!["Drake One".into(), "Drake Two".into()],
        };
        assert_eq!(
            error_reply(&amb),
            "Mob name ambiguous. Did you mean:\n • Drake One\n • Drake Two"
        );
        assert_eq!(
            error_reply(&TrackerError::NotFound("Ghost".into())),
            "Mob **Ghost** not found."
        );
        assert!(error_reply(&TrackerError::Internal("disk".into())).starts_with("⚠️"));
    }
}
