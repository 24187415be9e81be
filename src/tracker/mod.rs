//! Spawn tracking core: time parsing, name resolution, window learning,
//! status classification and the per-group mutation protocol.
//!
//! Nothing in here performs I/O; persistence lives in [`crate::storage`] and
//! chat-facing plumbing in [`crate::bot`].

pub mod errors;
pub mod learner;
pub mod resolver;
pub mod status;
pub mod store;
pub mod timeparse;
pub mod types;

pub use errors::{ErrorKind, TrackerError};
pub use learner::{learn_window, Learned};
pub use resolver::{normalize_name, resolve_mob_name, ResolveResult};
pub use status::{
    evaluate, format_timedelta, render_board, render_status_reply, status_line, BoardFormat,
    WindowStatus,
};
pub use store::{validate_window, DeathRecorded, Renamed, UndoOutcome};
pub use timeparse::{format_when, looks_like_time, now_in, parse_date, parse_time};
pub use types::*;
