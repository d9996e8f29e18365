use std::sync::Arc;
use std::time::Instant;

use encore_core::constants::REVIEW_IMAGES_BUCKET;
use encore_core::{log_error, AppError, ErrorMetadata, MediaConfig};
use encore_processing::{file_extension, MediaValidator};
use encore_storage::Storage;
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use super::preview::{PreviewHandle, PreviewRegistry};
use super::stage::{ImageStage, LocalFile, StageSource};

/// Result of `select_files`: accepted stages in input order plus one warning per
/// rejected file.
#[derive(Debug, Default)]
pub struct Selection {
    pub stages: Vec<ImageStage>,
    pub warnings: Vec<String>,
}

/// Result of `upload_staged`. `urls` follows staging order with failed uploads left out.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub urls: Vec<String>,
    /// `AppError::Upload` for every file that was dropped
    pub warnings: Vec<AppError>,
}

impl UploadOutcome {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    /// One user-facing line per dropped image.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ErrorMetadata::client_message).collect()
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    /// URLs this storage did not produce
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Turns locally selected files into stored, URL-addressable images.
#[derive(Clone)]
pub struct MediaStagingPipeline {
    storage: Arc<dyn Storage>,
    previews: Arc<dyn PreviewRegistry>,
    validator: MediaValidator,
    bucket: String,
}

impl MediaStagingPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        previews: Arc<dyn PreviewRegistry>,
        config: &MediaConfig,
    ) -> Self {
        Self {
            storage,
            previews,
            validator: MediaValidator::from_config(config),
            bucket: REVIEW_IMAGES_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn validator(&self) -> &MediaValidator {
        &self.validator
    }

    /// Validate each file on its own and create a preview for every accepted one.
    /// A rejected file never aborts the batch.
    pub fn select_files(&self, files: Vec<LocalFile>) -> Selection {
        let mut selection = Selection::default();

        for file in files {
            match self
                .validator
                .validate_all(&file.name, &file.content_type, file.size())
            {
                Ok(()) => {
                    let preview = PreviewHandle::new(self.previews.clone(), &file);
                    selection.stages.push(ImageStage::new_file(file, preview));
                }
                Err(e) => {
                    tracing::debug!(filename = %file.name, error = %e, "Staged file rejected");
                    selection.warnings.push(e.user_message(&file.name));
                }
            }
        }

        selection
    }

    pub fn existing_stage(&self, url: impl Into<String>) -> ImageStage {
        ImageStage::existing(url)
    }

    /// Resolve every stage to its final URL, uploading new files concurrently.
    ///
    /// Existing images and files uploaded by an earlier call pass through without a new
    /// upload. A failed upload drops that file and adds a warning; the rest proceed.
    #[tracing::instrument(skip(self, stages), fields(stage_count = stages.len()))]
    pub async fn upload_staged(&self, stages: &mut [ImageStage]) -> UploadOutcome {
        let start = Instant::now();

        let pending: Vec<(usize, LocalFile)> = stages
            .iter()
            .enumerate()
            .filter_map(|(index, stage)| match stage.source() {
                StageSource::NewFile {
                    file,
                    remote_url: None,
                    ..
                } => Some((index, file.clone())),
                _ => None,
            })
            .collect();

        let uploads = pending.into_iter().map(|(index, file)| async move {
            let result = self.upload_file(&file).await;
            (index, file.name, result)
        });

        let mut failed = vec![false; stages.len()];
        let mut warnings = Vec::new();
        let mut uploaded = 0usize;

        for (index, filename, result) in join_all(uploads).await {
            match result {
                Ok(url) => {
                    uploaded += 1;
                    if let StageSource::NewFile { remote_url, .. } = stages[index].source_mut() {
                        *remote_url = Some(url);
                    }
                }
                Err(message) => {
                    let err = AppError::Upload { filename, message };
                    log_error(&err);
                    failed[index] = true;
                    warnings.push(err);
                }
            }
        }

        let urls = stages
            .iter()
            .zip(failed)
            .filter(|(_, failed)| !failed)
            .filter_map(|(stage, _)| stage.remote_url().map(str::to_string))
            .collect::<Vec<_>>();

        tracing::info!(
            uploaded,
            failed = warnings.len(),
            url_count = urls.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged images resolved"
        );

        UploadOutcome { urls, warnings }
    }

    async fn upload_file(&self, file: &LocalFile) -> Result<String, String> {
        let filename = match file_extension(&file.name, &file.content_type) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        self.storage
            .upload(&self.bucket, &filename, &file.content_type, file.data.to_vec())
            .await
            .map(|(_, url)| url)
            .map_err(|e| e.to_string())
    }

    /// Best-effort removal of stored images no longer referenced. Never fails.
    #[tracing::instrument(skip(self, urls), fields(url_count = urls.len()))]
    pub async fn delete_remote(&self, urls: &[String]) -> DeleteReport {
        let mut report = DeleteReport::default();
        let mut keys = Vec::new();

        for url in urls {
            match self.storage.key_for_url(url) {
                Some(key) => keys.push((key, url.clone())),
                None => {
                    tracing::warn!(url = %url, "Not a URL of this storage, skipping delete");
                    report.skipped.push(url.clone());
                }
            }
        }

        if keys.is_empty() {
            return report;
        }

        let key_list: Vec<String> = keys.iter().map(|(key, _)| key.clone()).collect();
        let failures = self.storage.delete_many(&key_list).await;

        for (key, url) in keys {
            match failures.iter().find(|(failed, _)| *failed == key) {
                Some((_, e)) => {
                    tracing::warn!(key = %key, error = %e, "Failed to delete removed image");
                    report.failed.push(url);
                }
                None => report.deleted.push(url),
            }
        }

        report
    }

    /// Free the preview of a new-file stage. Existing images hold no local preview.
    pub fn release_preview(&self, stage: ImageStage) {
        stage.release();
    }

    /// Validate, optimise and store a concert poster, returning its public URL.
    #[cfg(feature = "image")]
    #[tracing::instrument(skip(self, file), fields(filename = %file.name))]
    pub async fn upload_poster(&self, file: LocalFile) -> Result<String, AppError> {
        use encore_core::constants::POSTERS_BUCKET;
        use encore_processing::{ImageOptimizer, OptimizePreset};

        self.validator
            .validate_all(&file.name, &file.content_type, file.size())
            .map_err(|e| AppError::validation("poster", e.user_message(&file.name)))?;

        let optimized = ImageOptimizer::optimize(file.data.to_vec(), OptimizePreset::Poster)
            .await
            .map_err(|e| AppError::Upload {
                filename: file.name.clone(),
                message: e.to_string(),
            })?;

        let filename = format!("{}.{}", Uuid::new_v4(), optimized.extension);
        let (_, url) = self
            .storage
            .upload(
                POSTERS_BUCKET,
                &filename,
                optimized.content_type,
                optimized.data.to_vec(),
            )
            .await
            .map_err(|e| AppError::Upload {
                filename: file.name.clone(),
                message: e.to_string(),
            })?;

        Ok(url)
    }
}
