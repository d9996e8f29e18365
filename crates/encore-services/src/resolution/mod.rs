//! Concert resolution
//!
//! Turns a search or a "create new" action into a `ConcertRef`, choosing between the
//! verified and pending tables. New artists, venues and concerts always land in the
//! pending tables.

mod flow;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use encore_core::models::{
    Artist, ArtistRef, ConcertDetail, ConcertDraft, ConcertRef, ConcertSummary, EntityKind,
    EntityRef, NewConcert, SearchMode, Venue, VenueRef,
};
use encore_core::validation::{validate_concert_draft, validate_entity_name};
use encore_core::{AppError, SearchConfig, WriteStep};
use encore_db::db::{CatalogStore, PendingConcertInput};
use uuid::Uuid;

use crate::identity::{require_user, IdentityProvider};

pub use flow::{ResolutionFlow, ResolutionState};

#[derive(Clone)]
pub struct ConcertResolutionService {
    catalog: Arc<dyn CatalogStore>,
    identity: Arc<dyn IdentityProvider>,
    config: SearchConfig,
}

impl ConcertResolutionService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityProvider>,
        config: SearchConfig,
    ) -> Self {
        Self {
            catalog,
            identity,
            config,
        }
    }

    /// Whether `term` is long enough to be sent to the catalog.
    pub fn accepts_term(&self, term: &str) -> bool {
        term.trim().chars().count() >= self.config.min_term_chars
    }

    /// Case-insensitive partial match on concert title or artist names.
    ///
    /// Terms shorter than the configured minimum return nothing without a store call.
    #[tracing::instrument(skip(self), fields(term_chars = term.trim().chars().count()))]
    pub async fn search(
        &self,
        term: &str,
        mode: SearchMode,
    ) -> Result<Vec<ConcertSummary>, AppError> {
        if !self.accepts_term(term) {
            return Ok(Vec::new());
        }
        let term = term.trim();

        let start = Instant::now();
        let limit = self.config.page_size;
        let results = match mode {
            SearchMode::ByTitle => self.catalog.search_concerts_by_title(term, limit).await,
            SearchMode::ByArtist => self.catalog.search_concerts_by_artist(term, limit).await,
        }
        .map_err(AppError::resolution)?;

        let mut seen = HashSet::new();
        let results: Vec<ConcertSummary> = results
            .into_iter()
            .filter(|summary| seen.insert(summary.concert))
            .take(limit)
            .collect();

        tracing::debug!(
            result_count = results.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Concert search finished"
        );

        Ok(results)
    }

    pub async fn get_concert(&self, concert: ConcertRef) -> Result<ConcertDetail, AppError> {
        self.catalog
            .get_concert(concert)
            .await
            .map_err(AppError::resolution)?
            .ok_or_else(|| AppError::NotFound(format!("Concert {}", concert)))
    }

    pub async fn list_artists(&self) -> Result<Vec<Artist>, AppError> {
        self.catalog.list_artists().await.map_err(AppError::resolution)
    }

    pub async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        self.catalog.list_venues().await.map_err(AppError::resolution)
    }

    /// Propose a new artist. Names are not deduplicated.
    pub async fn create_pending_artist(&self, name: &str) -> Result<ArtistRef, AppError> {
        let name = validate_entity_name("artist", name)?;
        let user = require_user(self.identity.as_ref()).await?;

        self.warn_on_duplicates(EntityKind::Artist, &name).await;
        let id = self
            .catalog
            .insert_pending_artist(&name, user.id)
            .await
            .map_err(AppError::resolution)?;

        tracing::info!(artist_id = %id, name = %name, "Pending artist created");
        Ok(EntityRef::Pending(id))
    }

    /// Propose a new venue with an empty address. Names are not deduplicated.
    pub async fn create_pending_venue(&self, name: &str) -> Result<VenueRef, AppError> {
        let name = validate_entity_name("venue", name)?;
        let user = require_user(self.identity.as_ref()).await?;

        self.warn_on_duplicates(EntityKind::Venue, &name).await;
        let id = self
            .catalog
            .insert_pending_venue(&name, user.id)
            .await
            .map_err(AppError::resolution)?;

        tracing::info!(venue_id = %id, name = %name, "Pending venue created");
        Ok(EntityRef::Pending(id))
    }

    async fn warn_on_duplicates(&self, kind: EntityKind, name: &str) {
        match self.catalog.find_by_name(kind, name).await {
            Ok(matches) if !matches.is_empty() => {
                let refs: Vec<String> = matches.iter().map(ToString::to_string).collect();
                tracing::warn!(
                    kind = %kind,
                    name = %name,
                    matches = ?refs,
                    "Creating pending entry with a name that already exists"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(kind = %kind, error = %e, "Duplicate name lookup failed");
            }
        }
    }

    /// Write a pending concert, its schedules and its artist link.
    ///
    /// The artist and venue must exist in the table their tag names. When a schedule or
    /// link row fails, the concert is deleted again and `PartialWrite` is returned; no
    /// reference escapes in that case.
    #[tracing::instrument(skip(self, concert), fields(title = %concert.title, schedule_count = concert.schedules.len()))]
    pub async fn create_concert(&self, concert: &NewConcert) -> Result<ConcertRef, AppError> {
        let concert = validate_concert_draft(&ConcertDraft {
            title: concert.title.clone(),
            schedules: concert.schedules.clone(),
            artist: Some(concert.artist),
            venue: Some(concert.venue),
            poster_url: concert.poster_url.clone(),
        })?;
        let user = require_user(self.identity.as_ref()).await?;

        self.ensure_exists(EntityKind::Artist, concert.artist, "artist")
            .await?;
        self.ensure_exists(EntityKind::Venue, concert.venue, "venue")
            .await?;

        let concert_id = self
            .catalog
            .insert_pending_concert(&PendingConcertInput {
                title: concert.title.clone(),
                poster_url: concert.poster_url.clone(),
                venue: concert.venue,
                created_by: user.id,
            })
            .await
            .map_err(AppError::resolution)?;

        let mut schedules_written = 0;
        for schedule in &concert.schedules {
            if let Err(e) = self
                .catalog
                .insert_pending_schedule(concert_id, schedule, user.id)
                .await
            {
                return Err(self
                    .compensate(concert_id, schedules_written, WriteStep::Schedule, e)
                    .await);
            }
            schedules_written += 1;
        }

        if let Err(e) = self
            .catalog
            .insert_pending_artist_link(concert_id, concert.artist, user.id)
            .await
        {
            return Err(self
                .compensate(concert_id, schedules_written, WriteStep::ArtistLink, e)
                .await);
        }

        tracing::info!(
            concert_id = %concert_id,
            artist = %concert.artist,
            venue = %concert.venue,
            schedules_written,
            "Pending concert created"
        );
        Ok(EntityRef::Pending(concert_id))
    }

    async fn ensure_exists(
        &self,
        kind: EntityKind,
        entity: EntityRef,
        field: &str,
    ) -> Result<(), AppError> {
        let exists = self
            .catalog
            .entity_exists(kind, entity)
            .await
            .map_err(AppError::resolution)?;
        if !exists {
            return Err(AppError::validation(
                field,
                format!("The selected {} no longer exists", kind),
            ));
        }
        Ok(())
    }

    async fn compensate(
        &self,
        concert_id: Uuid,
        schedules_written: usize,
        failed_step: WriteStep,
        cause: AppError,
    ) -> AppError {
        let compensated = match self.catalog.delete_pending_concert(concert_id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(concert_id = %concert_id, error = %e, "Could not remove partially written concert");
                false
            }
        };

        tracing::error!(
            concert_id = %concert_id,
            schedules_written,
            failed_step = %failed_step,
            compensated,
            error = %cause,
            "Concert write incomplete"
        );

        AppError::PartialWrite {
            concert_id,
            schedules_written,
            failed_step,
            compensated,
            message: cause.to_string(),
        }
    }
}
