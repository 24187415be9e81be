//! # Mobwatch - Respawn Window Tracker for Contested Mob Spawns
//!
//! Mobwatch records observed times of death for recurring game spawns, learns a
//! respawn window from that history, and keeps a per-group status board up to date
//! with whether each window is closed, open or overdue.
//!
//! ## Features
//!
//! - **Window Learning**: `[min, max]` respawn hours from the last ten deaths, with
//!   noise filtering, outlier trimming and a LOW/MEDIUM/HIGH confidence rating.
//! - **Fuzzy Names**: typos resolve to the closest known mob; near-ties are
//!   reported back instead of guessed.
//! - **Local Time Entry**: `HHMM` tokens resolve to the most recent occurrence in
//!   one canonical, DST-aware time zone.
//! - **Per-Group Storage**: one JSON record per group, updated under a per-group
//!   lock with atomic file replacement.
//! - **Self-Updating Board**: edit-in-place with resend fallback, refreshed
//!   concurrently per group with a bounded send timeout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mobwatch::bot::{CommandContext, CommandProcessor};
//! use mobwatch::config::Config;
//! use mobwatch::storage::Storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let storage = Arc::new(Storage::new(&config.storage.data_dir).await?);
//!     let processor = CommandProcessor::new(storage, config.timezone()?, config.board_format());
//!
//!     let ctx = CommandContext::new("guild-1", 42);
//!     if let Some(reply) = processor.handle(&ctx, "!tod Pumpkinhead 0200").await {
//!         println!("{}", reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`tracker`] - Time parsing, name resolution, window learning, status engine
//!   and the mutation protocol (no I/O)
//! - [`storage`] - Per-group JSON persistence and legacy import
//! - [`bot`] - Command parser and executor, board refresher, console adapter
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Group id and file checks before touching the filesystem
//! - [`logutil`] / [`metrics`] - Log sanitizing and runtime counters
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐      ┌─────────────────┐
//! │ CommandProcessor│      │ BoardRefresher  │ ← periodic tick
//! └─────────────────┘      └─────────────────┘
//!          │                        │
//! ┌──────────────────────────────────────────┐
//! │ tracker (pure)                           │
//! └──────────────────────────────────────────┘
//!          │                        │
//! ┌─────────────────┐      ┌─────────────────┐
//! │ Storage         │      │ BoardSink       │ ← platform adapter
//! └─────────────────┘      └─────────────────┘
//! ```

pub mod bot;
pub mod config;
pub mod logutil;
pub mod metrics;
pub mod storage;
pub mod tracker;
pub mod validation;
