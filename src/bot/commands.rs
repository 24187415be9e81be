//! Chat command parser.
//!
//! Recognizes prefixed commands (`!tod Pumpkinhead 0200`, `!status`, ...) and
//! splits their arguments into a [`BotCommand`]. Verbs are case-insensitive.
//! Text without the prefix, or with an unknown verb, parses as
//! [`BotCommand::Unknown`] and is ignored by the handler.
//!
//! Only the shape of the arguments is checked here. Time and date tokens are
//! kept as text because turning them into timestamps needs "now" and the
//! canonical zone, which the handler owns.
use log::trace;

use crate::tracker::timeparse::{looks_like_time, parse_date};
use crate::tracker::types::ChannelId;

#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    /// `tod <name> [date] [time]`
    Tod {
        name: String,
        date: Option<String>,
        time: Option<String>,
    },
    /// `spawn <name> [time]`
    Spawn { name: String, time: Option<String> },
    Track(String),
    Untrack(String),
    DeleteMob(String),
    RenameMob { old: String, new: String },
    Undo(String),
    SetWindow { name: String, min: f64, max: f64 },
    /// `None` targets the channel the command came from.
    SetStatusChannel(Option<ChannelId>),
    Status,
    Help,
    Unknown,
    /// Recognized verb with unusable arguments; carries the reply text.
    Invalid(String),
}

impl BotCommand {
    /// Verb name for logs.
    pub fn verb(&self) -> &'static str {
        match self {
            BotCommand::Tod { .. } => "tod",
            BotCommand::Spawn { .. } => "spawn",
            BotCommand::Track(_) => "track",
            BotCommand::Untrack(_) => "untrack",
            BotCommand::DeleteMob(_) => "deletemob",
            BotCommand::RenameMob { .. } => "renamemob",
            BotCommand::Undo(_) => "undo",
            BotCommand::SetWindow { .. } => "setwindow",
            BotCommand::SetStatusChannel(_) => "setstatuschannel",
            BotCommand::Status => "status",
            BotCommand::Help => "help",
            BotCommand::Unknown => "unknown",
            BotCommand::Invalid(_) => "invalid",
        }
    }
}

/// Prefix-aware command parser
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn usage(&self, form: &str) -> BotCommand {
        BotCommand::Invalid(format!("Usage: `{}{}`", self.prefix, form))
    }

    pub fn parse(&self, raw: &str) -> BotCommand {
        let trimmed = raw.trim();
        let Some(body) = trimmed.strip_prefix(self.prefix.as_str()) else {
            return BotCommand::Unknown;
        };
        let (verb, args) = match body.find(char::is_whitespace) {
            Some(idx) => (&body[..idx], body[idx..].trim()),
            None => (body, ""),
        };
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "tod" => self.parse_tod(args),
            "spawn" => self.parse_spawn(args),
            "track" => self.name_arg(args, "track MobName", BotCommand::Track),
            "untrack" => self.name_arg(args, "untrack MobName", BotCommand::Untrack),
            "deletemob" => self.name_arg(args, "deletemob MobName", BotCommand::DeleteMob),
            "undo" => self.name_arg(args, "undo MobName", BotCommand::Undo),
            "renamemob" => self.parse_rename(args),
            "setwindow" => self.parse_setwindow(args),
            "setstatuschannel" => self.parse_status_channel(args),
            "status" => BotCommand::Status,
            "help" | "?" => BotCommand::Help,
            _ => BotCommand::Unknown,
        };
        trace!("Parsed {:?} from '{}'", cmd, crate::logutil::escape_log(raw));
        cmd
    }

    fn name_arg(&self, args: &str, form: &str, make: fn(String) -> BotCommand) -> BotCommand {
        if args.is_empty() {
            return self.usage(form);
        }
        make(args.to_string())
    }

    fn parse_tod(&self, args: &str) -> BotCommand {
        let mut parts: Vec<&str> = args.split_whitespace().collect();

        let mut time = None;
        if parts.last().is_some_and(|t| looks_like_time(t)) {
            time = parts.pop().map(str::to_string);
        }
        let mut date = None;
        if parts.last().is_some_and(|t| parse_date(t).is_ok()) {
            date = parts.pop().map(str::to_string);
        }

        let name = parts.join(" ");
        if name.is_empty() {
            return BotCommand::Invalid("You must specify a mob name.".to_string());
        }
        BotCommand::Tod { name, date, time }
    }

    fn parse_spawn(&self, args: &str) -> BotCommand {
        let mut parts: Vec<&str> = args.split_whitespace().collect();
        let mut time = None;
        if parts.last().is_some_and(|t| looks_like_time(t)) {
            time = parts.pop().map(str::to_string);
        }
        let name = parts.join(" ");
        if name.is_empty() {
            return self.usage("spawn MobName [HHMM]");
        }
        BotCommand::Spawn { name, time }
    }

    fn parse_rename(&self, args: &str) -> BotCommand {
        let Some((old, new)) = args.split_once('|') else {
            return self.usage("renamemob Old Name | New Name");
        };
        let (old, new) = (old.trim(), new.trim());
        if old.is_empty() || new.is_empty() {
            return self.usage("renamemob Old Name | New Name");
        }
        BotCommand::RenameMob {
            old: old.to_string(),
            new: new.to_string(),
        }
    }

    fn parse_setwindow(&self, args: &str) -> BotCommand {
        let parts: Vec<&str> = args.split_whitespace().collect();
        if parts.len() < 3 {
            return self.usage("setwindow MobName min max");
        }
        let n = parts.len();
        let (Ok(min), Ok(max)) = (parts[n - 2].parse::<f64>(), parts[n - 1].parse::<f64>()) else {
            return BotCommand::Invalid("min and max must be numbers.".to_string());
        };
        BotCommand::SetWindow {
            name: parts[..n - 2].join(" "),
            min,
            max,
        }
    }

    /// Accepts a bare id or a `<#id>` mention.
    fn parse_status_channel(&self, args: &str) -> BotCommand {
        if args.is_empty() {
            return BotCommand::SetStatusChannel(None);
        }
        let id = args
            .strip_prefix("<#")
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(args);
        match id.parse::<ChannelId>() {
            Ok(channel) => BotCommand::SetStatusChannel(Some(channel)),
            Err(_) => self.usage("setstatuschannel [#channel]"),
        }
    }

    /// One line per command, using this parser's prefix.
    pub fn help_text(&self) -> String {
        let p = &self.prefix;
        [
            "**Mob spawn tracker commands**".to_string(),
            format!("`{p}tod MobName [YYYY-MM-DD|MM/DD/YYYY] [HHMM]` record a time of death"),
            format!("`{p}spawn MobName [HHMM]` record a spawn sighting"),
            format!("`{p}track MobName` / `{p}untrack MobName` toggle the board line"),
            format!("`{p}setwindow MobName min max` set the respawn window in hours"),
            format!("`{p}renamemob Old Name | New Name` rename a mob"),
            format!("`{p}deletemob MobName` delete a mob and its history"),
            format!("`{p}undo MobName` remove the latest time of death"),
            format!("`{p}setstatuschannel [#channel]` choose the status board channel"),
            format!("`{p}status` show current spawn windows"),
        ]
        .join("\n")
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new("!")
    }
}
