//! Review wizard state
//!
//! Single source of truth for an in-progress review across the search, create-concert
//! and write-review steps. The concert reference, draft text and current step are
//! persisted after every change; staged images live only as long as the wizard.

mod persistence;

use std::fmt;
use std::sync::Arc;

use encore_core::constants::WIZARD_STORAGE_KEY;
use encore_core::{AppError, ConcertRef};
use serde::{Deserialize, Serialize};

use crate::media::{LocalFile, MediaStagingPipeline, StageId, StagedImages};

pub use persistence::{
    decode, encode, FileWizardStorage, MemoryWizardStorage, PersistedWizard, WizardStorage,
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum WizardStep {
    #[default]
    Search = 1,
    CreateConcert = 2,
    WriteReview = 3,
}

impl WizardStep {
    /// Whether this step can only be shown once a concert has been chosen.
    pub fn requires_concert(&self) -> bool {
        matches!(self, WizardStep::WriteReview)
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WizardStep::Search),
            2 => Ok(WizardStep::CreateConcert),
            3 => Ok(WizardStep::WriteReview),
            other => Err(format!("unknown wizard step {}", other)),
        }
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step as u8
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardStep::Search => write!(f, "search"),
            WizardStep::CreateConcert => write!(f, "create-concert"),
            WizardStep::WriteReview => write!(f, "write-review"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGuard {
    Allow,
    RedirectToSearch,
}

#[derive(Debug, Default)]
pub struct WizardState {
    pub concert_ref: Option<ConcertRef>,
    pub content: String,
    pub current_step: WizardStep,
    pub images: StagedImages,
}

impl WizardState {
    fn snapshot(&self) -> PersistedWizard {
        PersistedWizard {
            concert_ref: self.concert_ref,
            content: self.content.clone(),
            current_step: self.current_step,
        }
    }

    fn from_persisted(persisted: PersistedWizard) -> Self {
        let mut state = WizardState {
            concert_ref: persisted.concert_ref,
            content: persisted.content,
            current_step: persisted.current_step,
            images: StagedImages::new(),
        };
        if state.current_step.requires_concert() && state.concert_ref.is_none() {
            state.current_step = WizardStep::Search;
        }
        state
    }
}

pub struct ReviewWizard {
    state: WizardState,
    storage: Arc<dyn WizardStorage>,
    key: String,
}

impl ReviewWizard {
    /// Load the wizard from storage. Missing, unreadable or corrupt state yields defaults.
    pub fn load(storage: Arc<dyn WizardStorage>) -> Self {
        Self::load_with_key(storage, WIZARD_STORAGE_KEY)
    }

    pub fn load_with_key(storage: Arc<dyn WizardStorage>, key: &str) -> Self {
        let state = match storage.load(key) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(persisted) => WizardState::from_persisted(persisted),
                Err(reason) => {
                    tracing::warn!(key = %key, reason = %reason, "Discarding unreadable wizard state");
                    WizardState::default()
                }
            },
            Ok(None) => WizardState::default(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Could not read wizard state");
                WizardState::default()
            }
        };

        Self {
            state,
            storage,
            key: key.to_string(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn concert_ref(&self) -> Option<ConcertRef> {
        self.state.concert_ref
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn current_step(&self) -> WizardStep {
        self.state.current_step
    }

    pub fn images(&self) -> &StagedImages {
        &self.state.images
    }

    pub(crate) fn images_mut(&mut self) -> &mut StagedImages {
        &mut self.state.images
    }

    /// Select the concert the review is about and move on to writing it.
    pub fn set_concert_ref(&mut self, concert: ConcertRef) -> Result<(), AppError> {
        if concert.is_empty() {
            return Err(AppError::validation("concert", "Select a concert"));
        }
        self.state.concert_ref = Some(concert);
        self.state.current_step = WizardStep::WriteReview;
        self.persist();
        Ok(())
    }

    /// Update the draft text. Length is checked at submit time.
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.state.content = text.into();
        self.persist();
    }

    /// Search found nothing; switch to registering a new concert.
    pub fn begin_create_concert(&mut self) {
        self.state.current_step = WizardStep::CreateConcert;
        self.persist();
    }

    pub fn guard(&self, step: WizardStep) -> StepGuard {
        if step.requires_concert() && self.state.concert_ref.is_none() {
            StepGuard::RedirectToSearch
        } else {
            StepGuard::Allow
        }
    }

    /// Move to `step`, or back to search when it needs a concert that is not selected.
    pub fn enter(&mut self, step: WizardStep) -> StepGuard {
        let guard = self.guard(step);
        self.state.current_step = match guard {
            StepGuard::Allow => step,
            StepGuard::RedirectToSearch => WizardStep::Search,
        };
        self.persist();
        guard
    }

    /// Stage the valid files and return one warning per rejected file.
    pub fn stage_images(
        &mut self,
        pipeline: &MediaStagingPipeline,
        files: Vec<LocalFile>,
    ) -> Vec<String> {
        let selection = pipeline.select_files(files);
        self.state.images.extend(selection.stages);
        selection.warnings
    }

    pub fn remove_image(&mut self, id: &StageId) -> bool {
        self.state.images.remove(id)
    }

    pub fn move_image(&mut self, id: &StageId, index: usize) -> bool {
        self.state.images.move_to(id, index)
    }

    /// Abandon the draft: release staged previews, delete images this draft already
    /// uploaded (best effort) and clear the persisted copy.
    pub async fn reset(&mut self, pipeline: &MediaStagingPipeline) {
        let uploaded = self.state.images.discard();
        if !uploaded.is_empty() {
            pipeline.delete_remote(&uploaded).await;
        }
        self.clear_state();
    }

    /// Start over after the draft was published; its uploads now belong to the review.
    pub(crate) fn finish_submitted(&mut self) {
        self.state.images.clear();
        self.clear_state();
    }

    fn clear_state(&mut self) {
        self.state = WizardState::default();
        if let Err(e) = self.storage.clear(&self.key) {
            tracing::warn!(key = %self.key, error = %e, "Could not clear wizard state");
        }
    }

    fn persist(&self) {
        let result = encode(&self.state.snapshot())
            .and_then(|raw| self.storage.save(&self.key, &raw));
        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, "Could not persist wizard state");
        }
    }
}

impl fmt::Debug for ReviewWizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewWizard")
            .field("key", &self.key)
            .field("state", &self.state)
            .finish()
    }
}
