use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_not_blank;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// A profile counts as complete once a name has been chosen.
    pub fn is_complete(&self) -> bool {
        self.name
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Profile form used both for first-time completion and later edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProfileInput {
    #[validate(custom(function = "validate_not_blank", message = "Enter a name"))]
    pub name: String,
    /// Favorite artist ids, verified artists only
    pub favorites: Vec<Uuid>,
}
