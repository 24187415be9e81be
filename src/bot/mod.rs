//! Chat-facing plumbing: command parsing and execution, the periodic status
//! board refresher, and the terminal adapter used by the CLI.

pub mod board;
pub mod commands;
pub mod console;
pub mod handler;

pub use board::{BoardRefresher, BoardSink, RefreshOutcome, SinkError, TickSummary};
pub use commands::{BotCommand, CommandParser};
pub use console::ConsoleSink;
pub use handler::{CommandContext, CommandProcessor};
