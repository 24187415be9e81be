//! Terminal adapter: boards are printed to stdout.
//!
//! Message ids are only known for the lifetime of the process, so a board id
//! stored by an earlier run reports [`SinkError::NotFound`] and the refresher
//! posts a fresh copy.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::bot::board::{BoardSink, SinkError};
use crate::tracker::types::{ChannelId, MessageId};

pub struct ConsoleSink {
    next_id: AtomicU64,
    known: Mutex<HashSet<MessageId>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let seed = chrono::Utc::now().timestamp_millis().unsigned_abs();
        Self {
            next_id: AtomicU64::new(seed),
            known: Mutex::new(HashSet::new()),
        }
    }

    fn is_known(&self, message: MessageId) -> Result<bool, SinkError> {
        self.known
            .lock()
            .map(|k| k.contains(&message))
            .map_err(|_| SinkError::Other("console state poisoned".to_string()))
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardSink for ConsoleSink {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<MessageId, SinkError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.known
            .lock()
            .map_err(|_| SinkError::Other("console state poisoned".to_string()))?
            .insert(id);
        println!("── board #{} (message {}) ──\n{}", channel, id, content);
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), SinkError> {
        if !self.is_known(message)? {
            return Err(SinkError::NotFound);
        }
        println!("── board #{} (message {}, edited) ──\n{}", channel, message, content);
        Ok(())
    }
}
