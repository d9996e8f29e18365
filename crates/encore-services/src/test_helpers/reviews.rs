use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use encore_core::models::{NewReview, Review, ReviewUpdate};
use encore_core::AppError;
use encore_db::db::ReviewStore;
use uuid::Uuid;

use super::lock;

#[derive(Default)]
struct State {
    reviews: Vec<Review>,
    fail_writes: bool,
}

/// `reviews` table kept in memory, in insertion order.
#[derive(Default)]
pub struct InMemoryReviews {
    state: Mutex<State>,
}

impl InMemoryReviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a review as if it had been written earlier.
    pub fn seed(&self, review: Review) {
        lock(&self.state).reviews.push(review);
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn count(&self) -> usize {
        lock(&self.state).reviews.len()
    }

    pub fn all(&self) -> Vec<Review> {
        lock(&self.state).reviews.clone()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviews {
    async fn insert_review(&self, review: &NewReview) -> Result<Review, AppError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(AppError::Internal("review insert rejected".to_string()));
        }
        let stored = Review {
            id: Uuid::new_v4(),
            concert: review.concert,
            content: review.content.clone(),
            image_urls: review.image_urls.clone(),
            author_id: review.author_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        state.reviews.push(stored.clone());
        Ok(stored)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        update: &ReviewUpdate,
    ) -> Result<Option<Review>, AppError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(AppError::Internal("review update rejected".to_string()));
        }
        Ok(state
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .map(|review| {
                review.content = update.content.clone();
                review.image_urls = update.image_urls.clone();
                review.updated_at = Some(Utc::now());
                review.clone()
            }))
    }

    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, AppError> {
        Ok(lock(&self.state)
            .reviews
            .iter()
            .find(|r| r.id == review_id)
            .cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Review>, AppError> {
        Ok(lock(&self.state)
            .reviews
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Review>, AppError> {
        Ok(lock(&self.state)
            .reviews
            .iter()
            .rev()
            .filter(|r| r.author_id == author_id)
            .cloned()
            .collect())
    }
}
