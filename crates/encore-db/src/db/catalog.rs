use async_trait::async_trait;
use chrono::NaiveDate;
use encore_core::models::{
    Artist, ArtistRef, ConcertDetail, ConcertRef, ConcertSummary, EntityKind, EntityRef,
    ScheduleInput, Venue,
};
use encore_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::contains_pattern;
use super::traits::{CatalogStore, PendingConcertInput};
use super::transaction::TransactionGuard;

const VERIFIED_SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.title, c.poster_url, c.venue_id, NULL::uuid AS venue_pending_id,
           v.name AS venue_name,
           ARRAY(
               SELECT a.name_official
               FROM concerts_artists ca
               JOIN artists a ON a.id = ca.artist_id
               WHERE ca.concert_id = c.id
               ORDER BY a.name_official
           ) AS artist_names,
           (SELECT MIN(s.schedule_date) FROM concert_schedules s WHERE s.concert_id = c.id) AS first_date
    FROM concerts c
    LEFT JOIN venues v ON v.id = c.venue_id
"#;

const PENDING_SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.title, c.poster_url, c.venue_id, c.venue_pending_id,
           COALESCE(v.name, vp.name) AS venue_name,
           ARRAY(
               SELECT COALESCE(a.name_official, ap.name_official, '')
               FROM concerts_artists_pending l
               LEFT JOIN artists a ON a.id = l.artist_id
               LEFT JOIN artists_pending ap ON ap.id = l.artist_pending_id
               WHERE l.concert_pending_id = c.id
               ORDER BY 1
           ) AS artist_names,
           (SELECT MIN(s.schedule_date) FROM concert_schedules_pending s WHERE s.concert_id = c.id) AS first_date
    FROM concerts_pending c
    LEFT JOIN venues v ON v.id = c.venue_id
    LEFT JOIN venues_pending vp ON vp.id = c.venue_pending_id
"#;

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    poster_url: Option<String>,
    venue_id: Option<Uuid>,
    venue_pending_id: Option<Uuid>,
    venue_name: Option<String>,
    artist_names: Vec<String>,
    first_date: Option<NaiveDate>,
}

impl SummaryRow {
    fn venue(&self) -> Option<EntityRef> {
        match (self.venue_id, self.venue_pending_id) {
            (Some(id), _) => Some(EntityRef::Verified(id)),
            (None, Some(id)) => Some(EntityRef::Pending(id)),
            (None, None) => None,
        }
    }

    fn into_summary(self, is_pending: bool) -> ConcertSummary {
        ConcertSummary {
            concert: EntityRef::new(self.id, is_pending),
            title: self.title,
            poster_url: self.poster_url,
            venue_name: self.venue_name,
            artist_names: self.artist_names,
            first_date: self.first_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ScheduleRow {
    schedule_date: NaiveDate,
    start_time: String,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    artist_id: Option<Uuid>,
    artist_pending_id: Option<Uuid>,
}

fn name_column(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Concert => "title",
        EntityKind::Artist => "name_official",
        EntityKind::Venue => "name",
    }
}

fn limit_param(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// PostgreSQL catalog repository over the verified and pending tables
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn schedules(&self, concert: ConcertRef) -> Result<Vec<ScheduleInput>, AppError> {
        let table = if concert.is_pending() {
            "concert_schedules_pending"
        } else {
            "concert_schedules"
        };
        let rows = sqlx::query_as::<Postgres, ScheduleRow>(&format!(
            "SELECT schedule_date, start_time FROM {} WHERE concert_id = $1 ORDER BY schedule_date, start_time",
            table
        ))
        .bind(concert.id())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ScheduleInput::new(r.schedule_date, r.start_time))
            .collect())
    }

    async fn artist_refs(&self, concert: ConcertRef) -> Result<Vec<ArtistRef>, AppError> {
        let rows = match concert {
            EntityRef::Verified(id) => {
                sqlx::query_as::<Postgres, LinkRow>(
                    "SELECT artist_id, NULL::uuid AS artist_pending_id FROM concerts_artists WHERE concert_id = $1",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            EntityRef::Pending(id) => {
                sqlx::query_as::<Postgres, LinkRow>(
                    "SELECT artist_id, artist_pending_id FROM concerts_artists_pending WHERE concert_pending_id = $1 ORDER BY created_at",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .filter_map(|r| match (r.artist_id, r.artist_pending_id) {
                (Some(id), _) => Some(EntityRef::Verified(id)),
                (None, Some(id)) => Some(EntityRef::Pending(id)),
                (None, None) => None,
            })
            .collect())
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    #[tracing::instrument(skip(self), fields(db.table = "concerts", db.operation = "select"))]
    async fn search_concerts_by_title(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError> {
        let rows = sqlx::query_as::<Postgres, SummaryRow>(&format!(
            r#"{} WHERE c.title ILIKE $1 ESCAPE '\' ORDER BY c.created_at LIMIT $2"#,
            VERIFIED_SUMMARY_SELECT
        ))
        .bind(contains_pattern(term))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_summary(false)).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "concerts", db.operation = "select"))]
    async fn search_concerts_by_artist(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ConcertSummary>, AppError> {
        let rows = sqlx::query_as::<Postgres, SummaryRow>(&format!(
            r#"{}
            WHERE EXISTS (
                SELECT 1 FROM concerts_artists ca
                JOIN artists a ON a.id = ca.artist_id
                WHERE ca.concert_id = c.id
                  AND (a.name_official ILIKE $1 ESCAPE '\'
                       OR a.name_ko ILIKE $1 ESCAPE '\'
                       OR a.name_en ILIKE $1 ESCAPE '\')
            )
            ORDER BY c.created_at
            LIMIT $2"#,
            VERIFIED_SUMMARY_SELECT
        ))
        .bind(contains_pattern(term))
        .bind(limit_param(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_summary(false)).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "concerts", db.operation = "select", db.record_id = %concert))]
    async fn get_concert(&self, concert: ConcertRef) -> Result<Option<ConcertDetail>, AppError> {
        let select = if concert.is_pending() {
            PENDING_SUMMARY_SELECT
        } else {
            VERIFIED_SUMMARY_SELECT
        };
        let row = sqlx::query_as::<Postgres, SummaryRow>(&format!("{} WHERE c.id = $1", select))
            .bind(concert.id())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let venue = row.venue();
        let summary = row.into_summary(concert.is_pending());
        let artists = self.artist_refs(concert).await?;
        let schedules = self.schedules(concert).await?;

        Ok(Some(ConcertDetail {
            summary,
            venue,
            artists,
            schedules,
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "artists", db.operation = "select"))]
    async fn list_artists(&self) -> Result<Vec<Artist>, AppError> {
        let artists = sqlx::query_as::<Postgres, Artist>(
            "SELECT id, name_official, name_ko, name_en, profile_image_url, debut_date FROM artists ORDER BY name_official ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(artists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "venues", db.operation = "select"))]
    async fn list_venues(&self) -> Result<Vec<Venue>, AppError> {
        let venues = sqlx::query_as::<Postgres, Venue>(
            "SELECT id, name, address FROM venues ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(venues)
    }

    #[tracing::instrument(skip(self), fields(db.operation = "select", db.record_id = %entity))]
    async fn entity_exists(&self, kind: EntityKind, entity: EntityRef) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            kind.table_for(&entity)
        ))
        .bind(entity.id())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.operation = "select"))]
    async fn find_by_name(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> Result<Vec<EntityRef>, AppError> {
        let column = name_column(kind);
        let mut matches = Vec::new();

        for (table, is_pending) in [(kind.verified_table(), false), (kind.pending_table(), true)] {
            let ids = sqlx::query_scalar::<Postgres, Uuid>(&format!(
                "SELECT id FROM {} WHERE LOWER({}) = LOWER($1) ORDER BY created_at",
                table, column
            ))
            .bind(name.trim())
            .fetch_all(&self.pool)
            .await?;
            matches.extend(ids.into_iter().map(|id| EntityRef::new(id, is_pending)));
        }

        Ok(matches)
    }

    #[tracing::instrument(skip(self), fields(db.table = "artists_pending", db.operation = "insert"))]
    async fn insert_pending_artist(&self, name: &str, created_by: Uuid) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            "INSERT INTO artists_pending (name_official, created_by) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(db.table = "venues_pending", db.operation = "insert"))]
    async fn insert_pending_venue(&self, name: &str, created_by: Uuid) -> Result<Uuid, AppError> {
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            "INSERT INTO venues_pending (name, address, created_by) VALUES ($1, '', $2) RETURNING id",
        )
        .bind(name)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self, concert), fields(db.table = "concerts_pending", db.operation = "insert"))]
    async fn insert_pending_concert(
        &self,
        concert: &PendingConcertInput,
    ) -> Result<Uuid, AppError> {
        let (venue_id, venue_pending_id) = match concert.venue {
            EntityRef::Verified(id) => (Some(id), None),
            EntityRef::Pending(id) => (None, Some(id)),
        };

        let id = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO concerts_pending (title, poster_url, venue_id, venue_pending_id, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&concert.title)
        .bind(&concert.poster_url)
        .bind(venue_id)
        .bind(venue_pending_id)
        .bind(concert.created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    #[tracing::instrument(skip(self, schedule), fields(db.table = "concert_schedules_pending", db.operation = "insert", db.record_id = %concert_id))]
    async fn insert_pending_schedule(
        &self,
        concert_id: Uuid,
        schedule: &ScheduleInput,
        created_by: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO concert_schedules_pending (concert_id, schedule_date, start_time, created_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(concert_id)
        .bind(schedule.date)
        .bind(&schedule.start_time)
        .bind(created_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "concerts_artists_pending", db.operation = "insert", db.record_id = %concert_id))]
    async fn insert_pending_artist_link(
        &self,
        concert_id: Uuid,
        artist: ArtistRef,
        created_by: Uuid,
    ) -> Result<(), AppError> {
        let (artist_id, artist_pending_id) = match artist {
            EntityRef::Verified(id) => (Some(id), None),
            EntityRef::Pending(id) => (None, Some(id)),
        };

        sqlx::query(
            r#"
            INSERT INTO concerts_artists_pending (concert_pending_id, artist_id, artist_pending_id, created_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(concert_id)
        .bind(artist_id)
        .bind(artist_pending_id)
        .bind(created_by)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "concerts_pending", db.operation = "delete", db.record_id = %concert_id))]
    async fn delete_pending_concert(&self, concert_id: Uuid) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query("DELETE FROM concerts_artists_pending WHERE concert_pending_id = $1")
            .bind(concert_id)
            .execute(tx.conn()?)
            .await?;
        sqlx::query("DELETE FROM concert_schedules_pending WHERE concert_id = $1")
            .bind(concert_id)
            .execute(tx.conn()?)
            .await?;
        sqlx::query("DELETE FROM concerts_pending WHERE id = $1")
            .bind(concert_id)
            .execute(tx.conn()?)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
