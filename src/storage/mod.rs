//! # Storage Module - Group Registry Persistence
//!
//! Each community group is persisted as its own JSON document:
//!
//! ```text
//! data/
//! └── groups/
//!     ├── 123456789.json     ← { status_channel_id, status_message_id, mobs }
//!     └── 987654321.json
//! ```
//!
//! ## Consistency
//!
//! - **Single source of truth**: nothing is cached; every read goes to disk.
//! - **Per-group transactions**: [`Storage::update_group`] holds a per-group async
//!   mutex around load → mutate → save, so the board refresher and command
//!   handlers never lose each other's updates. Different groups never contend.
//! - **Atomic writes**: an exclusive `fs2` lock on the destination plus a
//!   temp-file-and-rename, so readers never observe a half-written record.
//! - **Retry, don't patch**: a failed save re-runs the whole cycle from a fresh load.
//!
//! ## Tolerance
//!
//! Missing records load as empty groups and absent top-level fields take their
//! defaults. A corrupt record also loads as empty; inside a transaction it is
//! first moved aside (`.<name>.corrupt-<unix-ts>`) so the next save cannot
//! destroy it.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mobwatch::storage::Storage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Storage::new("./data").await?;
//!     let key = storage
//!         .update_group("123", |g| g.enable_tracking("Pumpkinhead"))
//!         .await?;
//!     println!("tracking {key}");
//!     Ok(())
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;
use log::{debug, info, warn};
use tokio::fs;

use crate::tracker::errors::TrackerError;
use crate::tracker::types::GroupRecord;
use crate::validation::{
    decode_filename, secure_group_path, secure_json_parse, validate_file_size,
    MAX_GROUP_FILE_BYTES,
};

/// Default number of extra load-modify-save attempts after a failed save.
pub const DEFAULT_SAVE_RETRIES: u32 = 3;

type GroupGuard = tokio::sync::OwnedMutexGuard<()>;

/// How a record read from disk turned out.
enum LoadedRecord {
    Present(GroupRecord),
    Missing,
    Corrupt(String),
}

/// Main storage interface
pub struct Storage {
    data_dir: String,
    save_retries: u32,
    /// One entry per group ever touched; bounded by the set of valid group ids.
    group_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Storage {
    /// Initialize storage with the given data directory
    pub async fn new(data_dir: &str) -> Result<Self, TrackerError> {
        fs::create_dir_all(Path::new(data_dir).join("groups")).await?;
        Ok(Storage {
            data_dir: data_dir.to_string(),
            save_retries: DEFAULT_SAVE_RETRIES,
            group_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_save_retries(mut self, retries: u32) -> Self {
        self.save_retries = retries;
        self
    }

    /// Return the base data directory path used by this storage instance
    pub fn base_dir(&self) -> &str {
        &self.data_dir
    }

    fn group_path(&self, group_id: &str) -> Result<PathBuf, TrackerError> {
        secure_group_path(&self.data_dir, group_id)
            .map_err(|e| TrackerError::InvalidGroup(e.to_string()))
    }

    fn group_lock(&self, group_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, TrackerError> {
        let mut locks = self
            .group_locks
            .lock()
            .map_err(|_| TrackerError::Internal("group lock table poisoned".to_string()))?;
        Ok(locks
            .entry(group_id.trim().to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }

    async fn read_record(path: &Path) -> Result<LoadedRecord, TrackerError> {
        let metadata = match fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadedRecord::Missing),
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = validate_file_size(metadata.len(), MAX_GROUP_FILE_BYTES) {
            return Ok(LoadedRecord::Corrupt(e.to_string()));
        }
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadedRecord::Missing),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Ok(LoadedRecord::Corrupt(e.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim_matches(|c: char| c == '\0' || c.is_whitespace()).is_empty() {
            return Ok(LoadedRecord::Missing);
        }
        match secure_json_parse::<GroupRecord>(&content, MAX_GROUP_FILE_BYTES as usize) {
            Ok(record) => Ok(LoadedRecord::Present(record)),
            Err(e) => Ok(LoadedRecord::Corrupt(e.to_string())),
        }
    }

    /// Load a group's record. Missing or corrupt records yield an empty group.
    pub async fn load_group(&self, group_id: &str) -> Result<GroupRecord, TrackerError> {
        let path = self.group_path(group_id)?;
        match Self::read_record(&path).await? {
            LoadedRecord::Present(record) => Ok(record),
            LoadedRecord::Missing => Ok(GroupRecord::default()),
            LoadedRecord::Corrupt(reason) => {
                warn!(
                    "Group record {} unreadable ({}); treating as empty",
                    path.display(),
                    reason
                );
                Ok(GroupRecord::default())
            }
        }
    }

    /// Move a corrupt record aside so a later save cannot overwrite it.
    async fn quarantine(path: &Path) -> Result<(), TrackerError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("group.json");
        let aside = dir.join(format!(
            ".{}.corrupt-{}",
            base,
            chrono::Utc::now().timestamp()
        ));
        fs::rename(path, &aside).await?;
        warn!("Moved corrupt group record aside to {}", aside.display());
        Ok(())
    }

    /// Write `record` on the blocking pool. The group guard moves into the
    /// write and comes back with its result, so the group stays locked until
    /// the rename lands even if the caller is dropped mid-save.
    async fn save_record(
        path: &Path,
        record: &GroupRecord,
        guard: GroupGuard,
    ) -> Result<(GroupGuard, Result<(), TrackerError>), TrackerError> {
        let content = serde_json::to_string_pretty(record)?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let written = write_file_locked(&path, &content);
            (guard, written)
        })
        .await
        .map_err(|e| TrackerError::Internal(format!("save task failed: {}", e)))
    }

    /// Run `f` against the freshly loaded record and persist the result.
    ///
    /// The record is saved only when `f` returns `Ok`. If the save fails, the
    /// whole cycle (load, `f`, save) is retried up to `save_retries` more times,
    /// which is why `f` must be safe to call again on a fresh record.
    pub async fn update_group<T, F>(&self, group_id: &str, mut f: F) -> Result<T, TrackerError>
    where
        F: FnMut(&mut GroupRecord) -> Result<T, TrackerError>,
    {
        let path = self.group_path(group_id)?;
        let mut guard = self.group_lock(group_id)?.lock_owned().await;

        let mut attempt = 0u32;
        loop {
            let mut record = match Self::read_record(&path).await? {
                LoadedRecord::Present(record) => record,
                LoadedRecord::Missing => GroupRecord::default(),
                LoadedRecord::Corrupt(reason) => {
                    warn!("Group record {} corrupt: {}", path.display(), reason);
                    Self::quarantine(&path).await?;
                    GroupRecord::default()
                }
            };

            let value = f(&mut record)?;

            let (returned, saved) = Self::save_record(&path, &record, guard).await?;
            guard = returned;
            match saved {
                Ok(()) => {
                    debug!("Saved group {} (attempt {})", group_id, attempt + 1);
                    return Ok(value);
                }
                Err(e) if attempt < self.save_retries => {
                    attempt += 1;
                    warn!(
                        "Saving group {} failed ({}); retrying full update ({}/{})",
                        group_id, e, attempt, self.save_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Identifiers of every persisted group.
    pub async fn list_groups(&self) -> Result<Vec<String>, TrackerError> {
        let dir = Path::new(&self.data_dir).join("groups");
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut groups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                if let Some(id) = decode_filename(stem) {
                    groups.push(id);
                }
            }
        }
        groups.sort();
        Ok(groups)
    }

    /// Split a legacy combined data file (`{ "<group>": { ... } }`) into
    /// per-group records. Mobs and status references already present are kept.
    /// Returns the number of groups imported.
    pub async fn import_legacy(&self, path: &Path) -> Result<usize, TrackerError> {
        let content = fs::read_to_string(path).await?;
        let legacy: BTreeMap<String, GroupRecord> =
            secure_json_parse(&content, (MAX_GROUP_FILE_BYTES * 16) as usize)
                .map_err(|e| TrackerError::Internal(format!("legacy file: {}", e)))?;

        let mut imported = 0usize;
        for (group_id, incoming) in legacy {
            let added = self
                .update_group(&group_id, |g| {
                    if g.status_channel_id.is_none() {
                        g.status_channel_id = incoming.status_channel_id;
                        g.status_message_id = incoming.status_message_id;
                    }
                    let mut added = 0usize;
                    for (key, mob) in &incoming.mobs {
                        if !g.mobs.contains_key(key) {
                            g.mobs.insert(key.clone(), mob.clone());
                            added += 1;
                        }
                    }
                    Ok(added)
                })
                .await?;
            info!("Imported group {} ({} new mobs)", group_id, added);
            imported += 1;
        }
        Ok(imported)
    }
}

/// Write content to a file with exclusive locking and an atomic rename.
fn write_file_locked(path: &Path, content: &str) -> Result<(), TrackerError> {
    use std::fs::{File, OpenOptions};
    use std::io::Write;

    // Step 1: Open (or create) the destination file to acquire an exclusive lock
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;

    lock_file.lock_exclusive()?;

    // Step 2: Create a unique temp file in the same directory
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("group.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut tmp) => {
                tmp.write_all(content.as_bytes())?;
                tmp.flush()?;
                let _ = tmp.sync_all();
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    };

    // Step 3: Atomically replace the destination with the temp file
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    // Step 4: Fsync the directory to persist the rename (best-effort)
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    // Step 5: Unlock by dropping the lock file
    drop(lock_file);
    Ok(())
}
