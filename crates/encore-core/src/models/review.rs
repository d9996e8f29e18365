use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::ConcertSummary;
use super::entity_ref::ConcertRef;

/// Persisted review. Image order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub concert: ConcertRef,
    pub content: String,
    pub image_urls: Vec<String>,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub concert: ConcertRef,
    pub content: String,
    pub image_urls: Vec<String>,
    pub author_id: Uuid,
}

/// Replacement content and image list for an existing review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub content: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuthorSummary {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Review joined with what a feed card shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub review: Review,
    pub concert: Option<ConcertSummary>,
    pub author: Option<AuthorSummary>,
}
