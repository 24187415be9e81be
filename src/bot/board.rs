//! Periodic status board refresh.
//!
//! Each tick renders every group's board from the persisted record and pushes it
//! to the group's status channel through a [`BoardSink`]. The stored message is
//! edited in place; when it is gone (or was never sent) a new message is sent and
//! its id persisted. Permission and transport failures only affect that group and
//! are retried on the next tick.
//!
//! Groups refresh concurrently and every sink call is bounded by a timeout, so
//! one unreachable channel cannot hold up the others.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use log::{debug, error, info, trace, warn};
use tokio::task::JoinSet;

use crate::logutil::{escape_log, first_line};
use crate::metrics;
use crate::storage::Storage;
use crate::tracker::errors::TrackerError;
use crate::tracker::status::{render_board, BoardFormat};
use crate::tracker::timeparse::now_in;
use crate::tracker::types::{ChannelId, MessageId, Timestamp};

/// Outbound failure reported by a platform adapter.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Channel or message no longer exists.
    #[error("not found")]
    NotFound,
    /// The bot may not post or edit there.
    #[error("forbidden")]
    Forbidden,
    #[error("{0}")]
    Other(String),
}

/// Platform adapter used to publish status boards.
pub trait BoardSink: Send + Sync + 'static {
    /// Post a new message; returns its id.
    fn send_message(
        &self,
        channel: ChannelId,
        content: &str,
    ) -> impl Future<Output = Result<MessageId, SinkError>> + Send;

    /// Replace the content of an existing message.
    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// What happened to one group during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No status channel configured.
    Skipped,
    Edited,
    /// A new board message was posted.
    Sent(MessageId),
    Failed(String),
}

/// Per-tick totals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickSummary {
    pub groups: usize,
    pub edited: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: &RefreshOutcome) {
        match outcome {
            RefreshOutcome::Skipped => self.skipped += 1,
            RefreshOutcome::Edited => self.edited += 1,
            RefreshOutcome::Sent(_) => self.sent += 1,
            RefreshOutcome::Failed(_) => self.failed += 1,
        }
    }
}

pub struct BoardRefresher<S: BoardSink> {
    storage: Arc<Storage>,
    sink: Arc<S>,
    format: Arc<BoardFormat>,
    tz: Tz,
    interval: Duration,
    send_timeout: Duration,
}

impl<S: BoardSink> BoardRefresher<S> {
    pub fn new(storage: Arc<Storage>, sink: Arc<S>, format: BoardFormat, tz: Tz) -> Self {
        Self {
            storage,
            sink,
            format: Arc::new(format),
            tz,
            interval: Duration::from_secs(60),
            send_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Refresh every persisted group once.
    pub async fn tick(&self, now: Timestamp) -> Result<TickSummary, TrackerError> {
        let groups = self.storage.list_groups().await?;
        let mut summary = TickSummary {
            groups: groups.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for group_id in groups {
            let storage = self.storage.clone();
            let sink = self.sink.clone();
            let format = self.format.clone();
            let limit = self.send_timeout;
            tasks.spawn(async move {
                let outcome =
                    match refresh_group(&storage, sink.as_ref(), &group_id, now, &format, limit)
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => RefreshOutcome::Failed(e.to_string()),
                    };
                (group_id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((group_id, outcome)) => {
                    if let RefreshOutcome::Failed(reason) = &outcome {
                        metrics::inc_board_failures();
                        warn!("Board refresh for group {} failed: {}", escape_log(&group_id), reason);
                    }
                    summary.record(&outcome);
                }
                Err(e) => {
                    metrics::inc_board_failures();
                    error!("Board refresh task panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }

        debug!("Board tick: {:?}; metrics {:?}", summary, metrics::snapshot());
        Ok(summary)
    }

    /// Tick on the configured interval until ctrl-c.
    pub async fn run(&self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Tick on the configured interval until `shutdown` resolves.
    pub async fn run_until<F: Future<Output = ()>>(&self, shutdown: F) {
        info!(
            "Board refresher started (every {:?}, timeout {:?})",
            self.interval, self.send_timeout
        );
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = now_in(&self.tz).fixed_offset();
                    if let Err(e) = self.tick(now).await {
                        warn!("Board tick failed: {}", e);
                    }
                }
                _ = &mut shutdown => {
                    info!("Board refresher stopping");
                    break;
                }
            }
        }
    }
}

/// Edit-or-send one group's board.
///
/// `send_timeout` bounds each sink call; persisting a newly sent message id
/// runs outside it.
pub async fn refresh_group<S: BoardSink>(
    storage: &Storage,
    sink: &S,
    group_id: &str,
    now: Timestamp,
    format: &BoardFormat,
    send_timeout: Duration,
) -> Result<RefreshOutcome, TrackerError> {
    let group = storage.load_group(group_id).await?;
    let Some(channel) = group.status_channel_id else {
        return Ok(RefreshOutcome::Skipped);
    };
    let content = render_board(&group, now, format);
    trace!(
        "group {} board: {}",
        escape_log(group_id),
        first_line(&content)
    );

    if let Some(message) = group.status_message_id {
        match tokio::time::timeout(send_timeout, sink.edit_message(channel, message, &content))
            .await
        {
            Ok(Ok(())) => {
                metrics::inc_board_edits();
                return Ok(RefreshOutcome::Edited);
            }
            Ok(Err(SinkError::NotFound)) => {
                debug!(
                    "group {}: board message {} gone, sending a new one",
                    escape_log(group_id),
                    message
                );
            }
            Ok(Err(e)) => return Ok(RefreshOutcome::Failed(format!("edit: {}", e))),
            Err(_) => {
                return Ok(RefreshOutcome::Failed(format!(
                    "edit timed out after {:?}",
                    send_timeout
                )))
            }
        }
    }

    let message = match tokio::time::timeout(send_timeout, sink.send_message(channel, &content)).await
    {
        Ok(Ok(id)) => id,
        Ok(Err(e)) => return Ok(RefreshOutcome::Failed(format!("send: {}", e))),
        Err(_) => {
            return Ok(RefreshOutcome::Failed(format!(
                "send timed out after {:?}",
                send_timeout
            )))
        }
    };
    metrics::inc_board_sends();

    // The channel may have been changed by a command while we were sending.
    let stored = storage
        .update_group(group_id, |g| {
            if g.status_channel_id == Some(channel) {
                g.status_message_id = Some(message);
                Ok(true)
            } else {
                Ok(false)
            }
        })
        .await?;
    if !stored {
        debug!(
            "group {}: status channel changed during send; message {} not stored",
            escape_log(group_id),
            message
        );
    }
    Ok(RefreshOutcome::Sent(message))
}
