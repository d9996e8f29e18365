use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use super::preview::PreviewHandle;

/// A file picked on the client, not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl LocalFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Session-unique identifier of a staged image
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageId(String);

impl StageId {
    pub(crate) fn generate() -> Self {
        StageId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub enum StageSource {
    /// Picked locally; owns its preview handle until the stage goes away.
    NewFile {
        file: LocalFile,
        preview: PreviewHandle,
        /// Set once the file has been uploaded
        remote_url: Option<String>,
    },
    /// Already stored, e.g. an image of the review being edited
    ExistingRemote { url: String },
}

#[derive(Debug)]
pub struct ImageStage {
    id: StageId,
    source: StageSource,
}

impl ImageStage {
    pub(crate) fn new_file(file: LocalFile, preview: PreviewHandle) -> Self {
        Self {
            id: StageId::generate(),
            source: StageSource::NewFile {
                file,
                preview,
                remote_url: None,
            },
        }
    }

    pub fn existing(url: impl Into<String>) -> Self {
        Self {
            id: StageId::generate(),
            source: StageSource::ExistingRemote { url: url.into() },
        }
    }

    pub fn id(&self) -> &StageId {
        &self.id
    }

    pub fn source(&self) -> &StageSource {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut StageSource {
        &mut self.source
    }

    pub fn is_existing(&self) -> bool {
        matches!(self.source, StageSource::ExistingRemote { .. })
    }

    /// Local preview for new files, the stored URL for existing images
    pub fn preview_url(&self) -> &str {
        match &self.source {
            StageSource::NewFile { preview, .. } => preview.url(),
            StageSource::ExistingRemote { url } => url,
        }
    }

    pub fn remote_url(&self) -> Option<&str> {
        match &self.source {
            StageSource::NewFile { remote_url, .. } => remote_url.as_deref(),
            StageSource::ExistingRemote { url } => Some(url),
        }
    }

    /// Drop the stage, freeing its preview when it has one.
    pub fn release(self) {
        if let StageSource::NewFile { preview, .. } = self.source {
            preview.release();
        }
    }
}

/// Ordered images of one draft plus the stored images removed from it.
///
/// Removing an existing image only records its URL; deletion happens on submit. Removing
/// a new file that an earlier failed submission already uploaded records that upload as
/// unreferenced, so it can be deleted with the rest.
#[derive(Debug, Default)]
pub struct StagedImages {
    stages: Vec<ImageStage>,
    removed_remote: Vec<String>,
    unreferenced_uploads: Vec<String>,
}

impl StagedImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the stored images of a review, keeping their order.
    pub fn from_existing<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stages: urls.into_iter().map(ImageStage::existing).collect(),
            removed_remote: Vec::new(),
            unreferenced_uploads: Vec::new(),
        }
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = ImageStage>) {
        self.stages.extend(stages);
    }

    /// Remove one image. Returns false when no stage has this id.
    pub fn remove(&mut self, id: &StageId) -> bool {
        let Some(index) = self.stages.iter().position(|s| s.id() == id) else {
            return false;
        };
        let stage = self.stages.remove(index);
        match stage.source() {
            StageSource::ExistingRemote { url } => self.removed_remote.push(url.clone()),
            StageSource::NewFile {
                remote_url: Some(url),
                ..
            } => self.unreferenced_uploads.push(url.clone()),
            StageSource::NewFile { .. } => {}
        }
        stage.release();
        true
    }

    /// Move a stage to `index` (clamped to the end). Returns false for an unknown id.
    pub fn move_to(&mut self, id: &StageId, index: usize) -> bool {
        let Some(from) = self.stages.iter().position(|s| s.id() == id) else {
            return false;
        };
        let stage = self.stages.remove(from);
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
        true
    }

    pub fn stages(&self) -> &[ImageStage] {
        &self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [ImageStage] {
        &mut self.stages
    }

    pub fn removed_remote(&self) -> &[String] {
        &self.removed_remote
    }

    /// Uploads of removed new files that no review references.
    pub fn unreferenced_uploads(&self) -> &[String] {
        &self.unreferenced_uploads
    }

    /// Everything a successful submission should delete: removed stored images and
    /// unreferenced uploads.
    pub fn obsolete_urls(&self) -> Vec<String> {
        self.removed_remote
            .iter()
            .chain(&self.unreferenced_uploads)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Release every preview and forget both removal lists. Use once the staged URLs
    /// are referenced by a saved review.
    pub fn clear(&mut self) {
        for stage in self.stages.drain(..) {
            stage.release();
        }
        self.removed_remote.clear();
        self.unreferenced_uploads.clear();
    }

    /// Abandon the draft: release every preview and return the URLs this draft uploaded
    /// that no saved review references. Stored images of an edited review are not
    /// included, so they are never deleted by a cancel.
    pub fn discard(&mut self) -> Vec<String> {
        let mut uploads = std::mem::take(&mut self.unreferenced_uploads);
        for stage in self.stages.drain(..) {
            if let StageSource::NewFile {
                remote_url: Some(url),
                ..
            } = stage.source()
            {
                uploads.push(url.clone());
            }
            stage.release();
        }
        self.removed_remote.clear();
        uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::InMemoryPreviewRegistry;
    use std::sync::Arc;

    #[test]
    fn removing_existing_records_url_without_releasing_anything() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let mut images = StagedImages::from_existing(["https://cdn/reviews/a.jpg"]);
        let file = LocalFile::new("b.png", "image/png", vec![9]);
        images.extend([ImageStage::new_file(
            file.clone(),
            PreviewHandle::new(registry.clone(), &file),
        )]);

        let existing_id = images.stages()[0].id().clone();
        assert!(images.remove(&existing_id));
        assert_eq!(images.removed_remote(), ["https://cdn/reviews/a.jpg"]);
        assert_eq!(registry.live_count(), 1);

        let new_id = images.stages()[0].id().clone();
        assert!(images.remove(&new_id));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(images.removed_remote().len(), 1);
        assert!(!images.remove(&new_id));
    }

    fn uploaded_stage(registry: &Arc<InMemoryPreviewRegistry>, url: &str) -> ImageStage {
        let file = LocalFile::new("c.jpg", "image/jpeg", vec![3]);
        let mut stage =
            ImageStage::new_file(file.clone(), PreviewHandle::new(registry.clone(), &file));
        if let StageSource::NewFile { remote_url, .. } = stage.source_mut() {
            *remote_url = Some(url.to_string());
        }
        stage
    }

    #[test]
    fn removing_uploaded_new_file_records_unreferenced_upload() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let mut images = StagedImages::from_existing(["https://cdn/reviews/a.jpg"]);
        images.extend([uploaded_stage(&registry, "https://cdn/reviews/c.jpg")]);

        let id = images.stages()[1].id().clone();
        assert!(images.remove(&id));
        assert!(images.removed_remote().is_empty());
        assert_eq!(images.unreferenced_uploads(), ["https://cdn/reviews/c.jpg"]);
        assert_eq!(images.obsolete_urls(), ["https://cdn/reviews/c.jpg"]);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn discard_returns_only_uploads_of_this_draft() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let mut images = StagedImages::from_existing([
            "https://cdn/reviews/a.jpg",
            "https://cdn/reviews/b.jpg",
        ]);
        images.extend([
            uploaded_stage(&registry, "https://cdn/reviews/c.jpg"),
            uploaded_stage(&registry, "https://cdn/reviews/d.jpg"),
        ]);
        let file = LocalFile::new("e.jpg", "image/jpeg", vec![5]);
        images.extend([ImageStage::new_file(
            file.clone(),
            PreviewHandle::new(registry.clone(), &file),
        )]);

        let existing = images.stages()[0].id().clone();
        let uploaded = images.stages()[2].id().clone();
        images.remove(&existing);
        images.remove(&uploaded);

        let discarded = images.discard();
        assert_eq!(
            discarded,
            ["https://cdn/reviews/c.jpg", "https://cdn/reviews/d.jpg"]
        );
        assert!(images.is_empty());
        assert!(images.removed_remote().is_empty());
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.excess_releases(), 0);
    }

    #[test]
    fn move_to_reorders_without_touching_previews() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let mut images = StagedImages::from_existing(["https://cdn/reviews/a.jpg"]);
        let file = LocalFile::new("b.png", "image/png", vec![9]);
        images.extend([ImageStage::new_file(
            file.clone(),
            PreviewHandle::new(registry.clone(), &file),
        )]);

        let new_id = images.stages()[1].id().clone();
        assert!(images.move_to(&new_id, 0));
        assert!(!images.stages()[0].is_existing());
        assert!(images.stages()[1].is_existing());
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn clear_releases_every_preview_once() {
        let registry = Arc::new(InMemoryPreviewRegistry::new());
        let mut images = StagedImages::new();
        for name in ["a.jpg", "b.jpg"] {
            let file = LocalFile::new(name, "image/jpeg", vec![1]);
            images.extend([ImageStage::new_file(
                file.clone(),
                PreviewHandle::new(registry.clone(), &file),
            )]);
        }

        images.clear();
        drop(images);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.excess_releases(), 0);
    }
}
