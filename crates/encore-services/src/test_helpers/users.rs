use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use encore_core::models::{AuthorSummary, CurrentUser, ProfileInput, UserProfile};
use encore_core::AppError;
use encore_db::db::UserStore;
use uuid::Uuid;

use super::lock;

/// `users` table kept in memory. Counts profile reads.
#[derive(Default)]
pub struct InMemoryUsers {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
    reads: Mutex<usize>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, profile: UserProfile) {
        lock(&self.profiles).insert(profile.id, profile);
    }

    pub fn profile_reads(&self) -> usize {
        *lock(&self.reads)
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn get_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, AppError> {
        *lock(&self.reads) += 1;
        Ok(lock(&self.profiles).get(&user_id).cloned())
    }

    async fn complete_profile(
        &self,
        user: &CurrentUser,
        input: &ProfileInput,
    ) -> Result<UserProfile, AppError> {
        let mut profiles = lock(&self.profiles);
        let profile = profiles.entry(user.id).or_insert_with(|| UserProfile {
            id: user.id,
            name: None,
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
            favorites: Vec::new(),
            created_at: Utc::now(),
        });
        profile.name = Some(input.name.clone());
        profile.favorites = input.favorites.clone();
        Ok(profile.clone())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        input: &ProfileInput,
    ) -> Result<Option<UserProfile>, AppError> {
        Ok(lock(&self.profiles).get_mut(&user_id).map(|profile| {
            profile.name = Some(input.name.clone());
            profile.favorites = input.favorites.clone();
            profile.clone()
        }))
    }

    async fn set_avatar_url(
        &self,
        user_id: Uuid,
        avatar_url: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        Ok(lock(&self.profiles).get_mut(&user_id).map(|profile| {
            profile.avatar_url = Some(avatar_url.to_string());
            profile.clone()
        }))
    }

    async fn get_author(&self, user_id: Uuid) -> Result<Option<AuthorSummary>, AppError> {
        Ok(lock(&self.profiles)
            .get(&user_id)
            .map(|profile| AuthorSummary {
                id: profile.id,
                name: profile.name.clone(),
                avatar_url: profile.avatar_url.clone(),
            }))
    }
}
