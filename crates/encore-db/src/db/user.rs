use async_trait::async_trait;
use encore_core::models::{AuthorSummary, CurrentUser, ProfileInput, UserProfile};
use encore_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::traits::UserStore;

const PROFILE_COLUMNS: &str = "id, name, email, avatar_url, favorites, created_at";

/// PostgreSQL `users` repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %user_id))]
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        let profile = sqlx::query_as::<Postgres, UserProfile>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self, user, input), fields(db.table = "users", db.operation = "upsert", db.record_id = %user.id))]
    async fn complete_profile(
        &self,
        user: &CurrentUser,
        input: &ProfileInput,
    ) -> Result<UserProfile, AppError> {
        let profile = sqlx::query_as::<Postgres, UserProfile>(&format!(
            r#"
            INSERT INTO users (id, name, email, avatar_url, favorites)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                email = COALESCE(EXCLUDED.email, users.email),
                avatar_url = COALESCE(users.avatar_url, EXCLUDED.avatar_url),
                favorites = EXCLUDED.favorites
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user.id)
        .bind(input.name.trim())
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(&input.favorites)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self, input), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<Option<UserProfile>, AppError> {
        let profile = sqlx::query_as::<Postgres, UserProfile>(&format!(
            "UPDATE users SET name = $2, favorites = $3 WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.favorites)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    async fn set_avatar_url(
        &self,
        user_id: Uuid,
        avatar_url: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let profile = sqlx::query_as::<Postgres, UserProfile>(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {}",
            PROFILE_COLUMNS
        ))
        .bind(user_id)
        .bind(avatar_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %user_id))]
    async fn get_author(&self, user_id: Uuid) -> Result<Option<AuthorSummary>, AppError> {
        let author = sqlx::query_as::<Postgres, AuthorSummary>(
            "SELECT id, name, avatar_url FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }
}
