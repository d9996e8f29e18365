use async_trait::async_trait;
use chrono::{DateTime, Utc};
use encore_core::models::{EntityRef, NewReview, Review, ReviewUpdate};
use encore_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::traits::ReviewStore;

const REVIEW_COLUMNS: &str =
    "id, user_id, concert_id, concert_pending_id, content, images, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: Uuid,
    concert_id: Option<Uuid>,
    concert_pending_id: Option<Uuid>,
    content: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = AppError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let concert = match (row.concert_id, row.concert_pending_id) {
            (Some(id), _) => EntityRef::Verified(id),
            (None, Some(id)) => EntityRef::Pending(id),
            (None, None) => {
                return Err(AppError::Internal(format!(
                    "Review {} references no concert",
                    row.id
                )))
            }
        };

        Ok(Review {
            id: row.id,
            concert,
            content: row.content,
            image_urls: row.images,
            author_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_reviews(rows: Vec<ReviewRow>) -> Result<Vec<Review>, AppError> {
    rows.into_iter().map(Review::try_from).collect()
}

/// PostgreSQL `reviews` repository
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for ReviewRepository {
    #[tracing::instrument(skip(self, review), fields(db.table = "reviews", db.operation = "insert", concert = %review.concert))]
    async fn insert_review(&self, review: &NewReview) -> Result<Review, AppError> {
        let (concert_id, concert_pending_id) = match review.concert {
            EntityRef::Verified(id) => (Some(id), None),
            EntityRef::Pending(id) => (None, Some(id)),
        };

        let row = sqlx::query_as::<Postgres, ReviewRow>(&format!(
            r#"
            INSERT INTO reviews (user_id, concert_id, concert_pending_id, content, images)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(review.author_id)
        .bind(concert_id)
        .bind(concert_pending_id)
        .bind(&review.content)
        .bind(&review.image_urls)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[tracing::instrument(skip(self, update), fields(db.table = "reviews", db.operation = "update", db.record_id = %review_id))]
    async fn update_review(
        &self,
        review_id: Uuid,
        update: &ReviewUpdate,
    ) -> Result<Option<Review>, AppError> {
        let row = sqlx::query_as::<Postgres, ReviewRow>(&format!(
            r#"
            UPDATE reviews SET content = $2, images = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(review_id)
        .bind(&update.content)
        .bind(&update.image_urls)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "reviews", db.operation = "select", db.record_id = %review_id))]
    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, AppError> {
        let row = sqlx::query_as::<Postgres, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE id = $1",
            REVIEW_COLUMNS
        ))
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "reviews", db.operation = "select"))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query_as::<Postgres, ReviewRow>(&format!(
            "SELECT {} FROM reviews ORDER BY created_at DESC LIMIT $1",
            REVIEW_COLUMNS
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "reviews", db.operation = "select", user_id = %author_id))]
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Review>, AppError> {
        let rows = sqlx::query_as::<Postgres, ReviewRow>(&format!(
            "SELECT {} FROM reviews WHERE user_id = $1 ORDER BY created_at DESC",
            REVIEW_COLUMNS
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }
}
