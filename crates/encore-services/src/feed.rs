//! Read side: the review feed, single reviews and the signed-in user's reviews.

use std::sync::Arc;

use encore_core::models::{FeedEntry, Review};
use encore_core::{AppError, ReviewConfig};
use encore_db::db::{CatalogStore, ReviewStore, UserStore};
use futures::future::try_join_all;
use uuid::Uuid;

use crate::identity::{require_user, IdentityProvider};

pub struct FeedService {
    reviews: Arc<dyn ReviewStore>,
    catalog: Arc<dyn CatalogStore>,
    users: Arc<dyn UserStore>,
    identity: Arc<dyn IdentityProvider>,
    config: ReviewConfig,
}

impl FeedService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        catalog: Arc<dyn CatalogStore>,
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ReviewConfig,
    ) -> Self {
        Self {
            reviews,
            catalog,
            users,
            identity,
            config,
        }
    }

    /// Newest reviews first, `limit` defaulting to the feed page size.
    #[tracing::instrument(skip(self))]
    pub async fn feed(&self, limit: Option<usize>) -> Result<Vec<FeedEntry>, AppError> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.config.feed_page_size);
        let reviews = self.reviews.list_recent(limit).await?;
        self.entries(reviews).await
    }

    pub async fn review_detail(&self, review_id: Uuid) -> Result<FeedEntry, AppError> {
        let review = self
            .reviews
            .get_review(review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {}", review_id)))?;
        self.entry(review).await
    }

    pub async fn my_reviews(&self) -> Result<Vec<FeedEntry>, AppError> {
        let user = require_user(self.identity.as_ref()).await?;
        let reviews = self.reviews.list_by_author(user.id).await?;
        self.entries(reviews).await
    }

    async fn entries(&self, reviews: Vec<Review>) -> Result<Vec<FeedEntry>, AppError> {
        try_join_all(reviews.into_iter().map(|review| self.entry(review))).await
    }

    async fn entry(&self, review: Review) -> Result<FeedEntry, AppError> {
        let (concert, author) = futures::try_join!(
            self.catalog.get_concert(review.concert),
            self.users.get_author(review.author_id),
        )?;

        Ok(FeedEntry {
            concert: concert.map(|detail| detail.summary),
            author,
            review,
        })
    }
}
