use encore_core::models::UserProfile;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Holds the signed-in user's profile.
///
/// Emptied on logout and whenever the profile or avatar changes.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entry: RwLock<Option<UserProfile>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached profile, only when it belongs to `user_id`.
    pub async fn get(&self, user_id: Uuid) -> Option<UserProfile> {
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|profile| profile.id == user_id)
            .cloned()
    }

    pub async fn put(&self, profile: UserProfile) {
        *self.entry.write().await = Some(profile);
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    pub async fn is_empty(&self) -> bool {
        self.entry.read().await.is_none()
    }
}
