//! Profiles
//!
//! First-time profile completion, later edits and avatar uploads for the signed-in
//! user, with the profile kept in an explicit `ProfileCache`.

mod cache;

use std::sync::Arc;

use encore_core::models::{ProfileInput, UserProfile};
use encore_core::validation::validate_profile;
use encore_core::{AppError, MediaConfig};
use encore_db::db::UserStore;
use encore_processing::MediaValidator;
use encore_storage::Storage;

use crate::identity::{require_user, IdentityProvider};

pub use cache::ProfileCache;

pub struct ProfileService {
    users: Arc<dyn UserStore>,
    identity: Arc<dyn IdentityProvider>,
    #[cfg_attr(not(feature = "image"), allow(dead_code))]
    storage: Arc<dyn Storage>,
    #[cfg_attr(not(feature = "image"), allow(dead_code))]
    validator: MediaValidator,
    cache: Arc<ProfileCache>,
}

impl ProfileService {
    pub fn new(
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn Storage>,
        media: &MediaConfig,
    ) -> Self {
        Self {
            users,
            identity,
            storage,
            validator: MediaValidator::from_config(media),
            cache: Arc::new(ProfileCache::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ProfileCache> {
        &self.cache
    }

    /// The signed-in user's profile; `None` until it has been completed once.
    pub async fn current_profile(&self) -> Result<Option<UserProfile>, AppError> {
        let user = require_user(self.identity.as_ref()).await?;
        if let Some(profile) = self.cache.get(user.id).await {
            return Ok(Some(profile));
        }

        let profile = self.users.get_profile(user.id).await?;
        if let Some(profile) = &profile {
            self.cache.put(profile.clone()).await;
        }
        Ok(profile)
    }

    pub async fn complete_profile(&self, input: &ProfileInput) -> Result<UserProfile, AppError> {
        validate_profile(input)?;
        let user = require_user(self.identity.as_ref()).await?;

        let input = ProfileInput {
            name: input.name.trim().to_string(),
            favorites: input.favorites.clone(),
        };
        let profile = self.users.complete_profile(&user, &input).await?;
        tracing::info!(user_id = %user.id, favorites = input.favorites.len(), "Profile completed");

        self.cache.put(profile.clone()).await;
        Ok(profile)
    }

    pub async fn update_profile(&self, input: &ProfileInput) -> Result<UserProfile, AppError> {
        validate_profile(input)?;
        let user = require_user(self.identity.as_ref()).await?;

        let input = ProfileInput {
            name: input.name.trim().to_string(),
            favorites: input.favorites.clone(),
        };
        let profile = self
            .users
            .update_profile(user.id, &input)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", user.id)))?;

        self.cache.invalidate().await;
        Ok(profile)
    }

    /// Resize the picture to a square WebP avatar, store it and point the profile at it.
    #[cfg(feature = "image")]
    #[tracing::instrument(skip(self, file), fields(filename = %file.name))]
    pub async fn upload_avatar(
        &self,
        file: crate::media::LocalFile,
    ) -> Result<UserProfile, AppError> {
        use encore_core::constants::AVATARS_BUCKET;
        use encore_processing::{ImageOptimizer, OptimizePreset};

        self.validator
            .validate_all(&file.name, &file.content_type, file.size())
            .map_err(|e| AppError::validation("avatar", e.user_message(&file.name)))?;
        let user = require_user(self.identity.as_ref()).await?;

        let optimized = ImageOptimizer::optimize(file.data.to_vec(), OptimizePreset::Avatar)
            .await
            .map_err(|e| AppError::Upload {
                filename: file.name.clone(),
                message: e.to_string(),
            })?;

        let filename = format!("{}.{}", uuid::Uuid::new_v4(), optimized.extension);
        let (_, url) = self
            .storage
            .upload(
                AVATARS_BUCKET,
                &filename,
                optimized.content_type,
                optimized.data.to_vec(),
            )
            .await
            .map_err(|e| AppError::Upload {
                filename: file.name.clone(),
                message: e.to_string(),
            })?;

        let profile = self
            .users
            .set_avatar_url(user.id, &url)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", user.id)))?;

        self.cache.invalidate().await;
        Ok(profile)
    }

    pub async fn logout(&self) {
        self.cache.invalidate().await;
    }
}
