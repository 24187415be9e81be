//! Process-wide runtime counters for command handling and board refreshes.
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tracker::errors::ErrorKind;

static COMMANDS_HANDLED: AtomicU64 = AtomicU64::new(0);
static FAILED_INPUT: AtomicU64 = AtomicU64::new(0);
static FAILED_AMBIGUOUS: AtomicU64 = AtomicU64::new(0);
static FAILED_NOT_FOUND: AtomicU64 = AtomicU64::new(0);
static FAILED_CONFLICT: AtomicU64 = AtomicU64::new(0);
static FAILED_PERMISSION: AtomicU64 = AtomicU64::new(0);
static FAILED_PERSISTENCE: AtomicU64 = AtomicU64::new(0);
static BOARD_EDITS: AtomicU64 = AtomicU64::new(0);
static BOARD_SENDS: AtomicU64 = AtomicU64::new(0);
static BOARD_FAILURES: AtomicU64 = AtomicU64::new(0);

pub fn inc_commands_handled() {
    COMMANDS_HANDLED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_command_failed(kind: ErrorKind) {
    let counter = match kind {
        ErrorKind::InputFormat => &FAILED_INPUT,
        ErrorKind::AmbiguousName => &FAILED_AMBIGUOUS,
        ErrorKind::NotFound => &FAILED_NOT_FOUND,
        ErrorKind::Conflict => &FAILED_CONFLICT,
        ErrorKind::Permission => &FAILED_PERMISSION,
        ErrorKind::Persistence => &FAILED_PERSISTENCE,
    };
    counter.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_board_edits() {
    BOARD_EDITS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_board_sends() {
    BOARD_SENDS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_board_failures() {
    BOARD_FAILURES.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub commands_handled: u64,
    pub failed_input: u64,
    pub failed_ambiguous: u64,
    pub failed_not_found: u64,
    pub failed_conflict: u64,
    pub failed_permission: u64,
    pub failed_persistence: u64,
    pub board_edits: u64,
    pub board_sends: u64,
    pub board_failures: u64,
}

impl Snapshot {
    pub fn commands_failed(&self) -> u64 {
        self.failed_input
            + self.failed_ambiguous
            + self.failed_not_found
            + self.failed_conflict
            + self.failed_permission
            + self.failed_persistence
    }
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        commands_handled: COMMANDS_HANDLED.load(Ordering::Relaxed),
        failed_input: FAILED_INPUT.load(Ordering::Relaxed),
        failed_ambiguous: FAILED_AMBIGUOUS.load(Ordering::Relaxed),
        failed_not_found: FAILED_NOT_FOUND.load(Ordering::Relaxed),
        failed_conflict: FAILED_CONFLICT.load(Ordering::Relaxed),
        failed_permission: FAILED_PERMISSION.load(Ordering::Relaxed),
        failed_persistence: FAILED_PERSISTENCE.load(Ordering::Relaxed),
        board_edits: BOARD_EDITS.load(Ordering::Relaxed),
        board_sends: BOARD_SENDS.load(Ordering::Relaxed),
        board_failures: BOARD_FAILURES.load(Ordering::Relaxed),
    }
}
