//! Store traits
//!
//! Narrow, table-scoped operations the services need from the relational store.
//! Implemented by the Postgres repositories and by in-memory doubles in tests.

use async_trait::async_trait;
use encore_core::models::{
    Artist, ArtistRef, AuthorSummary, ConcertDetail, ConcertRef, ConcertSummary, CurrentUser,
    EntityKind, EntityRef, NewReview, ProfileInput, Review, ReviewUpdate, ScheduleInput,
    UserProfile, Venue, VenueRef,
};
use encore_core::AppError;
use uuid::Uuid;

/// Row written to `concerts_pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConcertInput {
    pub title: String,
    pub poster_url: Option<String>,
    pub venue: VenueRef,
    pub created_by: Uuid,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Verified concerts whose title contains `term`, case-insensitively.
    async fn search_concerts_by_title(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError>;

    /// Verified concerts linked to an artist whose official, Korean or English name
    /// contains `term`, case-insensitively.
    async fn search_concerts_by_artist(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError>;

    async fn get_concert(&self, concert: ConcertRef) -> Result<Option<ConcertDetail>, AppError>;

    /// Verified artists ordered by official name
    async fn list_artists(&self) -> Result<Vec<Artist>, AppError>;

    /// Verified venues ordered by name
    async fn list_venues(&self) -> Result<Vec<Venue>, AppError>;

    /// Whether the row named by `entity` exists in the table its tag selects.
    async fn entity_exists(&self, kind: EntityKind, entity: EntityRef) -> Result<bool, AppError>;

    /// Artists or venues, verified and pending, whose name equals `name` ignoring case.
    async fn find_by_name(&self, kind: EntityKind, name: &str)
        -> Result<Vec<EntityRef>, AppError>;

    async fn insert_pending_artist(&self, name: &str, created_by: Uuid) -> Result<Uuid, AppError>;

    /// Inserts with an empty address.
    async fn insert_pending_venue(&self, name: &str, created_by: Uuid) -> Result<Uuid, AppError>;

    async fn insert_pending_concert(&self, concert: &PendingConcertInput)
        -> Result<Uuid, AppError>;

    async fn insert_pending_schedule(
        &self,
        concert_id: Uuid,
        schedule: &ScheduleInput,
        created_by: Uuid,
    ) -> Result<(), AppError>;

    async fn insert_pending_artist_link(
        &self,
        concert_id: Uuid,
        artist: ArtistRef,
        created_by: Uuid,
    ) -> Result<(), AppError>;

    /// Remove a pending concert together with its schedules and artist links.
    async fn delete_pending_concert(&self, concert_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert_review(&self, review: &NewReview) -> Result<Review, AppError>;

    /// Replace content and image list; `None` when the review does not exist.
    async fn update_review(
        &self,
        review_id: Uuid,
        update: &ReviewUpdate,
    ) -> Result<Option<Review>, AppError>;

    async fn get_review(&self, review_id: Uuid) -> Result<Option<Review>, AppError>;

    /// Newest first
    async fn list_recent(&self, limit: usize) -> Result<Vec<Review>, AppError>;

    /// Newest first
    async fn list_by_author(&self, author_id: Uuid) -> Result<Vec<Review>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError>;

    /// Create or fill in the profile row for a freshly signed-in user.
    async fn complete_profile(
        &self,
        user: &CurrentUser,
        input: &ProfileInput,
    ) -> Result<UserProfile, AppError>;

    /// `None` when the user has no profile row.
    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<Option<UserProfile>, AppError>;

    async fn set_avatar_url(
        &self,
        user_id: Uuid,
        avatar_url: &str,
    ) -> Result<Option<UserProfile>, AppError>;

    async fn get_author(&self, user_id: Uuid) -> Result<Option<AuthorSummary>, AppError>;
}
