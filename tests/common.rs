//! Test utilities & fixtures.
//! Builds storage-backed processors over throwaway temp directories.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use chrono_tz::America::New_York;
use chrono_tz::Tz;

use mobwatch::bot::{CommandContext, CommandProcessor};
use mobwatch::storage::Storage;
use mobwatch::tracker::BoardFormat;

pub const GROUP: &str = "guild-1";
pub const CHANNEL: u64 = 100;

/// Wall-clock time in the canonical zone.
pub fn ny(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
    New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub async fn storage_in(tmp: &tempfile::TempDir) -> Arc<Storage> {
    Arc::new(
        Storage::new(tmp.path().to_str().expect("utf-8 temp path"))
            .await
            .expect("storage"),
    )
}

/// A processor over a fresh temp dir. Keep the `TempDir` alive for the test.
#[allow(dead_code)]
pub async fn processor() -> (tempfile::TempDir, CommandProcessor) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let storage = storage_in(&tmp).await;
    let processor = CommandProcessor::new(storage, New_York, BoardFormat::default());
    (tmp, processor)
}

#[allow(dead_code)]
pub fn member() -> CommandContext {
    CommandContext::new(GROUP, CHANNEL)
}

#[allow(dead_code)]
pub fn moderator() -> CommandContext {
    CommandContext::new(GROUP, CHANNEL).with_manage_channels(true)
}
