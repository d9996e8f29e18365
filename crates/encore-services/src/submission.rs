//! Review submission and editing
//!
//! Order within one submission: confirm the concert, upload new images, write the review
//! row with the final URLs, then remove stored images the user took out. Removals are
//! best effort and never fail the submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use encore_core::models::{ConcertRef, EntityKind, NewReview, Review, ReviewUpdate};
use encore_core::validation::validate_review_content;
use encore_core::{AppError, ErrorMetadata, ReviewConfig};
use encore_db::db::{CatalogStore, ReviewStore};
use uuid::Uuid;

use crate::identity::{require_user, IdentityProvider};
use crate::media::{LocalFile, MediaStagingPipeline, StageId, StagedImages};
use crate::wizard::ReviewWizard;

/// Blocks re-entrant submission while one is in flight.
#[derive(Debug, Default)]
pub struct SubmitGate {
    in_flight: AtomicBool,
}

/// Held for the duration of one submission; opens the gate again on drop.
#[derive(Debug)]
pub struct SubmitPermit<'a> {
    gate: &'a SubmitGate,
}

impl SubmitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<SubmitPermit<'_>, AppError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Conflict("A submission is already in progress".to_string()))?;
        Ok(SubmitPermit { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct SubmittedReview {
    pub review: Review,
    /// One `AppError::Upload` per image that was left out
    pub warnings: Vec<AppError>,
}

impl SubmittedReview {
    /// Toast lines for the images that were left out.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ErrorMetadata::client_message).collect()
    }
}

/// An existing review opened for editing. Its stored images are staged in stored order.
#[derive(Debug)]
pub struct ReviewEditSession {
    review: Review,
    content: String,
    images: StagedImages,
}

impl ReviewEditSession {
    fn open(review: Review) -> Self {
        Self {
            content: review.content.clone(),
            images: StagedImages::from_existing(review.image_urls.clone()),
            review,
        }
    }

    pub fn review(&self) -> &Review {
        &self.review
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
    }

    pub fn images(&self) -> &StagedImages {
        &self.images
    }

    pub fn stage_images(
        &mut self,
        pipeline: &MediaStagingPipeline,
        files: Vec<LocalFile>,
    ) -> Vec<String> {
        let selection = pipeline.select_files(files);
        self.images.extend(selection.stages);
        selection.warnings
    }

    /// Stored images are only deleted once the edit is submitted.
    pub fn remove_image(&mut self, id: &StageId) -> bool {
        self.images.remove(id)
    }

    pub fn move_image(&mut self, id: &StageId, index: usize) -> bool {
        self.images.move_to(id, index)
    }

    /// Abandon the edit. Previews are freed and the review's stored images are left
    /// alone; only files uploaded by a failed save of this session are deleted.
    pub async fn cancel(mut self, pipeline: &MediaStagingPipeline) {
        let uploaded = self.images.discard();
        if !uploaded.is_empty() {
            pipeline.delete_remote(&uploaded).await;
        }
    }
}

pub struct ReviewSubmissionService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
    identity: Arc<dyn IdentityProvider>,
    pipeline: MediaStagingPipeline,
    config: ReviewConfig,
    gate: Arc<SubmitGate>,
}

impl ReviewSubmissionService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        catalog: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityProvider>,
        pipeline: MediaStagingPipeline,
        config: ReviewConfig,
    ) -> Self {
        Self {
            reviews,
            catalog,
            identity,
            pipeline,
            config,
            gate: Arc::new(SubmitGate::new()),
        }
    }

    pub fn gate(&self) -> &Arc<SubmitGate> {
        &self.gate
    }

    pub fn pipeline(&self) -> &MediaStagingPipeline {
        &self.pipeline
    }

    /// Publish the wizard's review and reset the wizard.
    ///
    /// Images that fail to upload are left out and reported in `warnings`. When the
    /// review row cannot be written the wizard keeps its state, and images uploaded so
    /// far are reused by the next attempt.
    #[tracing::instrument(skip(self, wizard), fields(image_count = wizard.images().len()))]
    pub async fn submit(&self, wizard: &mut ReviewWizard) -> Result<SubmittedReview, AppError> {
        let _permit = self.gate.try_acquire()?;

        validate_review_content(wizard.content(), self.config.min_content_chars)?;
        let concert = wizard
            .concert_ref()
            .ok_or_else(|| AppError::validation("concert", "Select a concert"))?;
        let user = require_user(self.identity.as_ref()).await?;
        self.confirm_concert(concert).await?;

        let outcome = self
            .pipeline
            .upload_staged(wizard.images_mut().stages_mut())
            .await;

        let review = self
            .reviews
            .insert_review(&NewReview {
                concert,
                content: wizard.content().trim().to_string(),
                image_urls: outcome.urls,
                author_id: user.id,
            })
            .await?;

        let obsolete = wizard.images().obsolete_urls();
        if !obsolete.is_empty() {
            self.pipeline.delete_remote(&obsolete).await;
        }

        tracing::info!(
            review_id = %review.id,
            concert = %concert,
            image_count = review.image_urls.len(),
            dropped_images = outcome.warnings.len(),
            "Review submitted"
        );

        wizard.finish_submitted();
        Ok(SubmittedReview {
            review,
            warnings: outcome.warnings,
        })
    }

    async fn confirm_concert(&self, concert: ConcertRef) -> Result<(), AppError> {
        let exists = self
            .catalog
            .entity_exists(EntityKind::Concert, concert)
            .await
            .map_err(AppError::resolution)?;
        if !exists {
            return Err(AppError::validation(
                "concert",
                "The selected concert no longer exists",
            ));
        }
        Ok(())
    }

    /// Open one of the signed-in user's reviews for editing.
    pub async fn open_edit(&self, review_id: Uuid) -> Result<ReviewEditSession, AppError> {
        let user = require_user(self.identity.as_ref()).await?;
        let review = self.load_own_review(review_id, user.id).await?;
        Ok(ReviewEditSession::open(review))
    }

    async fn load_own_review(&self, review_id: Uuid, user_id: Uuid) -> Result<Review, AppError> {
        let review = self
            .reviews
            .get_review(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {}", review_id)))?;
        if review.author_id != user_id {
            return Err(AppError::Unauthorized(
                "Only the author can edit this review".to_string(),
            ));
        }
        Ok(review)
    }

    /// Save an edit: upload new images, store the final ordered list, then delete the
    /// stored images that were removed.
    #[tracing::instrument(skip(self, session), fields(review_id = %session.review.id))]
    pub async fn submit_edit(
        &self,
        session: &mut ReviewEditSession,
    ) -> Result<SubmittedReview, AppError> {
        let _permit = self.gate.try_acquire()?;

        validate_review_content(&session.content, self.config.min_content_chars)?;
        let user = require_user(self.identity.as_ref()).await?;
        self.load_own_review(session.review.id, user.id).await?;

        let outcome = self
            .pipeline
            .upload_staged(session.images.stages_mut())
            .await;

        let review = self
            .reviews
            .update_review(
                session.review.id,
                &ReviewUpdate {
                    content: session.content.trim().to_string(),
                    image_urls: outcome.urls,
                },
            )
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {}", session.review.id)))?;

        let obsolete = session.images.obsolete_urls();
        if !obsolete.is_empty() {
            self.pipeline.delete_remote(&obsolete).await;
        }

        tracing::info!(
            review_id = %review.id,
            image_count = review.image_urls.len(),
            removed_images = obsolete.len(),
            "Review updated"
        );

        session.images.clear();
        session.images = StagedImages::from_existing(review.image_urls.clone());
        session.review = review.clone();
        Ok(SubmittedReview {
            review,
            warnings: outcome.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_rejects_second_holder_until_released() {
        let gate = SubmitGate::new();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_in_flight());
        assert!(matches!(gate.try_acquire(), Err(AppError::Conflict(_))));

        drop(permit);
        assert!(!gate.is_in_flight());
        assert!(gate.try_acquire().is_ok());
    }
}
