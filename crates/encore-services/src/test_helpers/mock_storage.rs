use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use encore_storage::keys::{public_url, storage_key};
use encore_storage::{Storage, StorageError, StorageResult};

use super::lock;

const BASE_URL: &str = "https://storage.test";

#[derive(Default)]
struct State {
    files: HashMap<String, Vec<u8>>,
    uploads: usize,
    deletes: Vec<String>,
    fail_size: Option<usize>,
    fail_deletes: bool,
}

/// Object storage kept in memory, serving URLs under `https://storage.test`.
#[derive(Default)]
pub struct MockStorage {
    state: Mutex<State>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly and return its public URL.
    pub fn seed(&self, bucket: &str, filename: &str, data: Vec<u8>) -> String {
        let key = format!("{}/{}", bucket, filename);
        lock(&self.state).files.insert(key.clone(), data);
        public_url(BASE_URL, &key)
    }

    /// Uploads whose payload is exactly `size` bytes fail.
    pub fn fail_uploads_of_size(&self, size: usize) {
        lock(&self.state).fail_size = Some(size);
    }

    pub fn fail_deletes(&self) {
        lock(&self.state).fail_deletes = true;
    }

    /// Successful uploads so far
    pub fn upload_count(&self) -> usize {
        lock(&self.state).uploads
    }

    /// Every key a delete was attempted for, in call order
    pub fn delete_calls(&self) -> Vec<String> {
        lock(&self.state).deletes.clone()
    }

    pub fn has_object(&self, key: &str) -> bool {
        lock(&self.state).files.contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        lock(&self.state).files.len()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)> {
        let key = storage_key(bucket, filename)?;
        let mut state = lock(&self.state);
        if state.fail_size == Some(data.len()) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {}",
                key
            )));
        }
        state.files.insert(key.clone(), data);
        state.uploads += 1;
        Ok((key.clone(), public_url(BASE_URL, &key)))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let mut state = lock(&self.state);
        state.deletes.push(storage_key.to_string());
        if state.fail_deletes {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }
        state.files.remove(storage_key);
        Ok(())
    }

    fn public_base_url(&self) -> String {
        BASE_URL.to_string()
    }
}
