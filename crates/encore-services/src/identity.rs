//! Identity collaborator
//!
//! Sign-in itself lives with the identity provider; the core only reads who is signed in
//! to stamp authorship.

use async_trait::async_trait;
use encore_core::models::CurrentUser;
use encore_core::AppError;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<CurrentUser>, AppError>;
}

pub(crate) async fn require_user(identity: &dyn IdentityProvider) -> Result<CurrentUser, AppError> {
    identity
        .current_user()
        .await?
        .ok_or_else(|| AppError::Unauthorized("No signed-in user".to_string()))
}
