use thiserror::Error;

/// Errors raised while parsing tracker input or mutating a group's mobs.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Time token was not HMM/HHMM or decoded outside 00:00-23:59.
    #[error("Invalid time: {0}")]
    InvalidTimeFormat(String),

    /// Date token did not match any accepted calendar format.
    #[error("Invalid date: {0}")]
    InvalidDateFormat(String),

    /// A date was supplied without a time to go with it.
    #[error("You must provide both date AND time. Example: `tod Pumpkinhead 2025-12-05 0200`")]
    DateWithoutTime,

    /// Window bounds failed validation.
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Command arguments had the wrong shape; carries the reply text.
    #[error("{0}")]
    InvalidInput(String),

    /// A required argument was missing; carries the usage line.
    #[error("Usage: `{0}`")]
    MissingArgument(&'static str),

    /// The name matched several mobs; carries their display names, best first.
    #[error("Mob name ambiguous, candidates: {}", candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },

    /// Operation requires an existing mob and none matched.
    #[error("Mob **{0}** not found.")]
    NotFound(String),

    /// Rename destination already names a different mob.
    #[error("A mob named **{0}** already exists.")]
    NameTaken(String),

    /// Undo requested on a mob without any TOD history.
    #[error("No TOD history for **{0}**.")]
    NoHistory(String),

    /// Group identifier rejected before touching the filesystem.
    #[error("invalid group: {0}")]
    InvalidGroup(String),

    /// Caller lacks the capability the command requires.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Wrapper around IO errors (directory creation, file writes).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error classes used for replies, logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputFormat,
    AmbiguousName,
    NotFound,
    Conflict,
    Permission,
    Persistence,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::InputFormat => "input",
            ErrorKind::AmbiguousName => "ambiguous",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Permission => "permission",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::InvalidTimeFormat(_)
            | TrackerError::InvalidDateFormat(_)
            | TrackerError::DateWithoutTime
            | TrackerError::InvalidWindow(_)
            | TrackerError::InvalidInput(_)
            | TrackerError::MissingArgument(_)
            | TrackerError::InvalidGroup(_) => ErrorKind::InputFormat,
            TrackerError::Ambiguous { .. } => ErrorKind::AmbiguousName,
            TrackerError::NotFound(_) | TrackerError::NoHistory(_) => ErrorKind::NotFound,
            TrackerError::NameTaken(_) => ErrorKind::Conflict,
            TrackerError::PermissionDenied(_) => ErrorKind::Permission,
            TrackerError::Io(_) | TrackerError::Json(_) | TrackerError::Internal(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// True when the error should be shown to the caller verbatim.
    pub fn is_user_facing(&self) -> bool {
        self.kind() != ErrorKind::Persistence
    }
}
