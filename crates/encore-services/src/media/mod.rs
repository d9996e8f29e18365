//! Media staging
//!
//! Images attached to a review draft are staged locally (with a preview handle) and only
//! uploaded when the review is submitted. Existing images of a review being edited are
//! staged as remote URLs and pass through unchanged.

mod pipeline;
mod preview;
mod stage;

pub use pipeline::{DeleteReport, MediaStagingPipeline, Selection, UploadOutcome};
pub use preview::{InMemoryPreviewRegistry, PreviewHandle, PreviewRegistry};
pub use stage::{ImageStage, LocalFile, StageId, StageSource, StagedImages};
