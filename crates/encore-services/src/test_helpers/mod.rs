//! Test helpers
//!
//! In-memory stand-ins for the relational store, object storage and identity provider,
//! with call counters and failure switches. No database or network is needed.

mod catalog;
mod mock_storage;
mod reviews;
mod users;

pub use catalog::InMemoryCatalog;
pub use mock_storage::MockStorage;
pub use reviews::InMemoryReviews;
pub use users::InMemoryUsers;

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use encore_core::models::CurrentUser;
use encore_core::AppError;
use uuid::Uuid;

use crate::identity::IdentityProvider;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Signed-in user with only an id
pub fn user(id: Uuid) -> CurrentUser {
    CurrentUser {
        id,
        email: Some(format!("{}@encore.test", id.simple())),
        display_name: None,
        avatar_url: None,
    }
}

/// Identity provider that always reports the same user (or nobody).
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user: Mutex<Option<CurrentUser>>,
}

impl StaticIdentity {
    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: Mutex::new(Some(user)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *lock(&self.user) = Some(user);
    }

    pub fn sign_out(&self) {
        *lock(&self.user) = None;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<Option<CurrentUser>, AppError> {
        Ok(lock(&self.user).clone())
    }
}
