//! Shared key generation for storage backends.
//!
//! Key format: `{bucket}/{filename}`.

use crate::traits::{StorageError, StorageResult};

/// Build the storage key for a file in a bucket.
///
/// Neither part may be empty, contain `..`, or start with `/`; the filename may not
/// contain `/` either, so each upload maps to exactly one object directly under its bucket.
pub fn storage_key(bucket: &str, filename: &str) -> StorageResult<String> {
    let bucket = bucket.trim_matches('/');
    if bucket.is_empty() || bucket.contains("..") {
        return Err(StorageError::InvalidKey(format!("invalid bucket: {:?}", bucket)));
    }
    if filename.is_empty() || filename.contains("..") || filename.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "invalid filename: {:?}",
            filename
        )));
    }
    Ok(format!("{}/{}", bucket, filename))
}

/// Public URL for a key under the given base URL.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

/// Map a public URL back to its storage key.
///
/// Returns `None` when the URL does not start with `base_url`, when nothing follows the
/// base, or when the remainder would not be a valid key. Query strings and fragments are
/// dropped.
pub fn key_from_url(base_url: &str, url: &str) -> Option<String> {
    let base = base_url.trim_end_matches('/');
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();

    if rest.is_empty() || rest.contains("..") || rest.ends_with('/') {
        return None;
    }
    Some(rest.to_string())
}
