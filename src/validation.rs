//! Input validation for identifiers that reach the filesystem.

use std::path::{Path, PathBuf};

/// Maximum accepted length of a group identifier, in bytes.
pub const MAX_GROUP_ID_LEN: usize = 64;

/// Maximum size of a single group record file.
pub const MAX_GROUP_FILE_BYTES: u64 = 2_000_000;

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Invalid group id: {reason}")]
    InvalidGroupId { reason: String },

    #[error("File size exceeds limit ({limit} bytes)")]
    FileSizeExceeded { limit: u64 },

    #[error("Invalid path or path traversal attempt")]
    InvalidPath,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Generate safe filename from an identifier using URL encoding
pub fn safe_filename(id: &str) -> String {
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    utf8_percent_encode(id, NON_ALPHANUMERIC).to_string()
}

/// Inverse of [`safe_filename`]; `None` when the name is not valid UTF-8 after decoding.
pub fn decode_filename(name: &str) -> Option<String> {
    percent_encoding::percent_decode_str(name)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Validate a group identifier
pub fn validate_group_id(id: &str) -> Result<String, SecurityError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(SecurityError::InvalidGroupId {
            reason: "empty".to_string(),
        });
    }
    if trimmed.len() > MAX_GROUP_ID_LEN {
        return Err(SecurityError::InvalidGroupId {
            reason: format!("longer than {} bytes", MAX_GROUP_ID_LEN),
        });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(SecurityError::InvalidGroupId {
            reason: "contains control characters".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Validate file size before reading
pub fn validate_file_size(size: u64, max_size: u64) -> Result<(), SecurityError> {
    if size > max_size {
        return Err(SecurityError::FileSizeExceeded { limit: max_size });
    }
    Ok(())
}

/// Secure path construction for a group record file
pub fn secure_group_path(data_dir: &str, group_id: &str) -> Result<PathBuf, SecurityError> {
    let validated = validate_group_id(group_id)?;
    let groups_dir = Path::new(data_dir).join("groups");
    let path = groups_dir.join(format!("{}.json", safe_filename(&validated)));

    // Ensure the path is still within our data directory
    if path.parent() != Some(groups_dir.as_path()) {
        return Err(SecurityError::InvalidPath);
    }
    Ok(path)
}

/// Securely parse JSON with size limits and error handling
pub fn secure_json_parse<T>(content: &str, max_bytes: usize) -> Result<T, SecurityError>
where
    T: serde::de::DeserializeOwned,
{
    if content.len() > max_bytes {
        return Err(SecurityError::FileSizeExceeded {
            limit: max_bytes as u64,
        });
    }

    // Interrupted writes have been seen to leave leading NULs; valid JSON never starts with one.
    let normalized = content.trim_start_matches('\0');

    serde_json::from_str(normalized).map_err(|e| SecurityError::InvalidFormat(e.to_string()))
}
