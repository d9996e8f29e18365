use std::sync::Mutex;

use async_trait::async_trait;
use encore_core::models::{
    Artist, ArtistRef, ConcertDetail, ConcertRef, ConcertSummary, EntityKind, EntityRef,
    ScheduleInput, Venue, VenueRef,
};
use encore_core::AppError;
use encore_db::db::{CatalogStore, PendingConcertInput};
use uuid::Uuid;

use super::lock;

#[derive(Clone)]
struct NamedRow {
    id: Uuid,
    name: String,
}

#[derive(Clone)]
struct ConcertRow {
    id: Uuid,
    title: String,
    poster_url: Option<String>,
    venue: VenueRef,
}

#[derive(Default)]
struct Tables {
    artists: Vec<Artist>,
    artists_pending: Vec<NamedRow>,
    venues: Vec<Venue>,
    venues_pending: Vec<NamedRow>,
    concerts: Vec<ConcertRow>,
    concerts_pending: Vec<ConcertRow>,
    schedules: Vec<(EntityRef, ScheduleInput)>,
    artist_links: Vec<(EntityRef, ArtistRef)>,

    queries: usize,
    fail_searches: bool,
    fail_schedule_after: Option<usize>,
    fail_artist_links: bool,
    fail_deletes: bool,
}

impl Tables {
    fn artist_names(&self, concert: EntityRef) -> Vec<String> {
        self.artist_links
            .iter()
            .filter(|(c, _)| *c == concert)
            .filter_map(|(_, artist)| match artist {
                EntityRef::Verified(id) => self
                    .artists
                    .iter()
                    .find(|a| a.id == *id)
                    .map(|a| a.name_official.clone()),
                EntityRef::Pending(id) => self
                    .artists_pending
                    .iter()
                    .find(|a| a.id == *id)
                    .map(|a| a.name.clone()),
            })
            .collect()
    }

    fn venue_name(&self, venue: VenueRef) -> Option<String> {
        match venue {
            EntityRef::Verified(id) => self.venues.iter().find(|v| v.id == id).map(|v| v.name.clone()),
            EntityRef::Pending(id) => self
                .venues_pending
                .iter()
                .find(|v| v.id == id)
                .map(|v| v.name.clone()),
        }
    }

    fn schedules_of(&self, concert: EntityRef) -> Vec<ScheduleInput> {
        self.schedules
            .iter()
            .filter(|(c, _)| *c == concert)
            .map(|(_, s)| s.clone())
            .collect()
    }

    fn summary(&self, concert: EntityRef, row: &ConcertRow) -> ConcertSummary {
        ConcertSummary {
            concert,
            title: row.title.clone(),
            poster_url: row.poster_url.clone(),
            venue_name: self.venue_name(row.venue),
            artist_names: self.artist_names(concert),
            first_date: self.schedules_of(concert).iter().map(|s| s.date).min(),
        }
    }

    fn concert_row(&self, concert: ConcertRef) -> Option<&ConcertRow> {
        match concert {
            EntityRef::Verified(id) => self.concerts.iter().find(|c| c.id == id),
            EntityRef::Pending(id) => self.concerts_pending.iter().find(|c| c.id == id),
        }
    }

    fn verified_summaries<F>(&self, limit: usize, matches: F) -> Vec<ConcertSummary>
    where
        F: Fn(&ConcertRow) -> bool,
    {
        self.concerts
            .iter()
            .filter(|row| matches(*row))
            .take(limit)
            .map(|row| self.summary(EntityRef::Verified(row.id), row))
            .collect()
    }
}

/// Verified and pending catalog tables kept in memory.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: Mutex<Tables>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_artist(&self, name_official: &str, name_ko: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.tables).artists.push(Artist {
            id,
            name_official: name_official.to_string(),
            name_ko: name_ko.map(str::to_string),
            name_en: None,
            profile_image_url: None,
            debut_date: None,
        });
        id
    }

    pub fn add_venue(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        lock(&self.tables).venues.push(Venue {
            id,
            name: name.to_string(),
            address: String::new(),
        });
        id
    }

    /// Add a verified concert linked to a verified artist and venue.
    pub fn add_concert(
        &self,
        title: &str,
        artist_id: Uuid,
        venue_id: Uuid,
        schedules: Vec<ScheduleInput>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let concert = EntityRef::Verified(id);
        let mut tables = lock(&self.tables);
        tables.concerts.push(ConcertRow {
            id,
            title: title.to_string(),
            poster_url: None,
            venue: EntityRef::Verified(venue_id),
        });
        tables
            .artist_links
            .push((concert, EntityRef::Verified(artist_id)));
        tables
            .schedules
            .extend(schedules.into_iter().map(|s| (concert, s)));
        id
    }

    pub fn fail_searches(&self) {
        lock(&self.tables).fail_searches = true;
    }

    /// Schedule inserts fail once `count` of them have succeeded.
    pub fn fail_schedule_inserts_after(&self, count: usize) {
        lock(&self.tables).fail_schedule_after = Some(count);
    }

    pub fn fail_artist_links(&self) {
        lock(&self.tables).fail_artist_links = true;
    }

    pub fn fail_deletes(&self) {
        lock(&self.tables).fail_deletes = true;
    }

    /// Search calls that reached the store
    pub fn query_count(&self) -> usize {
        lock(&self.tables).queries
    }

    pub fn pending_artist_count(&self) -> usize {
        lock(&self.tables).artists_pending.len()
    }

    pub fn pending_venue_count(&self) -> usize {
        lock(&self.tables).venues_pending.len()
    }

    pub fn pending_concert_count(&self) -> usize {
        lock(&self.tables).concerts_pending.len()
    }

    pub fn pending_schedule_count(&self) -> usize {
        lock(&self.tables)
            .schedules
            .iter()
            .filter(|(c, _)| c.is_pending())
            .count()
    }

    pub fn pending_link_count(&self) -> usize {
        lock(&self.tables)
            .artist_links
            .iter()
            .filter(|(c, _)| c.is_pending())
            .count()
    }

    /// Artist linked to a pending concert
    pub fn pending_link_of(&self, concert_id: Uuid) -> Option<ArtistRef> {
        lock(&self.tables)
            .artist_links
            .iter()
            .find(|(c, _)| *c == EntityRef::Pending(concert_id))
            .map(|(_, a)| *a)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn unavailable() -> AppError {
    AppError::Internal("catalog unavailable".to_string())
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn search_concerts_by_title(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError> {
        let mut tables = lock(&self.tables);
        tables.queries += 1;
        if tables.fail_searches {
            return Err(unavailable());
        }
        Ok(tables.verified_summaries(limit, |row| contains_ci(&row.title, term)))
    }

    async fn search_concerts_by_artist(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError> {
        let mut tables = lock(&self.tables);
        tables.queries += 1;
        if tables.fail_searches {
            return Err(unavailable());
        }

        let matching: Vec<Uuid> = tables
            .artists
            .iter()
            .filter(|a| {
                contains_ci(&a.name_official, term)
                    || a.name_ko.as_deref().is_some_and(|n| contains_ci(n, term))
                    || a.name_en.as_deref().is_some_and(|n| contains_ci(n, term))
            })
            .map(|a| a.id)
            .collect();

        let links = tables.artist_links.clone();
        Ok(tables.verified_summaries(limit, |row| {
            links.iter().any(|(c, a)| {
                *c == EntityRef::Verified(row.id)
                    && matches!(a, EntityRef::Verified(id) if matching.contains(id))
            })
        }))
    }

    async fn get_concert(&self, concert: ConcertRef) -> Result<Option<ConcertDetail>, AppError> {
        let tables = lock(&self.tables);
        Ok(tables.concert_row(concert).map(|row| ConcertDetail {
            summary: tables.summary(concert, row),
            venue: Some(row.venue),
            artists: tables
                .artist_links
                .iter()
                .filter(|(c, _)| *c == concert)
                .map(|(_, a)| *a)
                .collect(),
            schedules: tables.schedules_of(concert),
        }))
    }

    async fn list_artists(&self) -> Result<Vec<Artist>, AppError> {
        let mut artists = lock(&self.tables).artists.clone();
        artists.sort_by(|a, b| a.name_official.cmp(&b.name_official));
        Ok(artists)
    }

    async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        let mut venues = lock(&self.tables).venues.clone();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn entity_exists(&self, kind: EntityKind, entity: EntityRef) -> Result<bool, AppError> {
        let tables = lock(&self.tables);
        let id = entity.id();
        Ok(match (kind, entity.is_pending()) {
            (EntityKind::Concert, _) => tables.concert_row(entity).is_some(),
            (EntityKind::Artist, false) => tables.artists.iter().any(|a| a.id == id),
            (EntityKind::Artist, true) => tables.artists_pending.iter().any(|a| a.id == id),
            (EntityKind::Venue, false) => tables.venues.iter().any(|v| v.id == id),
            (EntityKind::Venue, true) => tables.venues_pending.iter().any(|v| v.id == id),
        })
    }

    async fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        let tables = lock(&self.tables);
        let name = name.to_lowercase();
        let same = |candidate: &str| candidate.to_lowercase() == name;

        let found = match kind {
            EntityKind::Artist => tables
                .artists
                .iter()
                .filter(|a| same(&a.name_official))
                .map(|a| EntityRef::Verified(a.id))
                .chain(
                    tables
                        .artists_pending
                        .iter()
                        .filter(|a| same(&a.name))
                        .map(|a| EntityRef::Pending(a.id)),
                )
                .collect(),
            EntityKind::Venue => tables
                .venues
                .iter()
                .filter(|v| same(&v.name))
                .map(|v| EntityRef::Verified(v.id))
                .chain(
                    tables
                        .venues_pending
                        .iter()
                        .filter(|v| same(&v.name))
                        .map(|v| EntityRef::Pending(v.id)),
                )
                .collect(),
            EntityKind::Concert => tables
                .concerts
                .iter()
                .filter(|c| same(&c.title))
                .map(|c| EntityRef::Verified(c.id))
                .chain(
                    tables
                        .concerts_pending
                        .iter()
                        .filter(|c| same(&c.title))
                        .map(|c| EntityRef::Pending(c.id)),
                )
                .collect(),
        };
        Ok(found)
    }

    async fn insert_pending_artist(&self, name: &str, _created_by: Uuid) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        lock(&self.tables).artists_pending.push(NamedRow {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn insert_pending_venue(&self, name: &str, _created_by: Uuid) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        lock(&self.tables).venues_pending.push(NamedRow {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn insert_pending_concert(
        &self,
        concert: &PendingConcertInput,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();
        lock(&self.tables).concerts_pending.push(ConcertRow {
            id,
            title: concert.title.clone(),
            poster_url: concert.poster_url.clone(),
            venue: concert.venue,
        });
        Ok(id)
    }

    async fn insert_pending_schedule(
        &self,
        concert_id: Uuid,
        schedule: &ScheduleInput,
        _created_by: Uuid,
    ) -> Result<(), AppError> {
        let mut tables = lock(&self.tables);
        if let Some(remaining) = tables.fail_schedule_after {
            if remaining == 0 {
                return Err(AppError::Internal("schedule insert rejected".to_string()));
            }
            tables.fail_schedule_after = Some(remaining - 1);
        }
        tables
            .schedules
            .push((EntityRef::Pending(concert_id), schedule.clone()));
        Ok(())
    }

    async fn insert_pending_artist_link(
        &self,
        concert_id: Uuid,
        artist: ArtistRef,
        _created_by: Uuid,
    ) -> Result<(), AppError> {
        let mut tables = lock(&self.tables);
        if tables.fail_artist_links {
            return Err(AppError::Internal("artist link insert rejected".to_string()));
        }
        tables
            .artist_links
            .push((EntityRef::Pending(concert_id), artist));
        Ok(())
    }

    async fn delete_pending_concert(&self, concert_id: Uuid) -> Result<(), AppError> {
        let mut tables = lock(&self.tables);
        if tables.fail_deletes {
            return Err(AppError::Internal("delete rejected".to_string()));
        }
        let concert = EntityRef::Pending(concert_id);
        tables.artist_links.retain(|(c, _)| *c != concert);
        tables.schedules.retain(|(c, _)| *c != concert);
        tables.concerts_pending.retain(|c| c.id != concert_id);
        Ok(())
    }
}
