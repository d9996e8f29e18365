//! Encore Services Layer
//!
//! The review core: the persisted review wizard, concert resolution across the verified
//! and pending catalog tables, and the media staging pipeline that turns locally staged
//! images into stored URLs at submission time. Review submission and editing, the feed,
//! and profiles are orchestrated here on top of those three.

pub mod feed;
pub mod identity;
pub mod media;
pub mod profile;
pub mod resolution;
pub mod submission;
pub mod wizard;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use feed::FeedService;
pub use identity::IdentityProvider;
pub use media::{
    DeleteReport, ImageStage, InMemoryPreviewRegistry, LocalFile, MediaStagingPipeline,
    PreviewHandle, PreviewRegistry, Selection, StageId, StagedImages, UploadOutcome,
};
pub use profile::{ProfileCache, ProfileService};
pub use resolution::{ConcertResolutionService, ResolutionFlow, ResolutionState};
pub use submission::{ReviewEditSession, ReviewSubmissionService, SubmitGate, SubmittedReview};
pub use wizard::{
    FileWizardStorage, MemoryWizardStorage, ReviewWizard, StepGuard, WizardState, WizardStep,
    WizardStorage,
};

pub use encore_db::db::{CatalogStore, ReviewStore, UserStore};
pub use encore_processing::{MediaValidator, ValidationError};
pub use encore_storage::{create_storage, Storage, StorageBackend, StorageError, StorageResult};
