use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::entity_ref::{ArtistRef, ConcertRef, VenueRef};
use crate::validation::{validate_not_blank, validate_start_time};

/// Verified artist row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Artist {
    pub id: Uuid,
    pub name_official: String,
    pub name_ko: Option<String>,
    pub name_en: Option<String>,
    pub profile_image_url: Option<String>,
    pub debut_date: Option<NaiveDate>,
}

/// Verified venue row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Venue {
    pub id: Uuid,
    pub name: String,
    pub address: String,
}

/// One performance date entered in the create-concert form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInput {
    pub date: NaiveDate,
    #[validate(custom(function = "validate_start_time", message = "Enter the start time as HH:MM"))]
    pub start_time: String,
}

impl ScheduleInput {
    pub fn new(date: NaiveDate, start_time: impl Into<String>) -> Self {
        Self {
            date,
            start_time: start_time.into(),
        }
    }
}

/// Row shown in search results and feed cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcertSummary {
    pub concert: ConcertRef,
    pub title: String,
    pub poster_url: Option<String>,
    pub venue_name: Option<String>,
    pub artist_names: Vec<String>,
    pub first_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcertDetail {
    pub summary: ConcertSummary,
    pub venue: Option<VenueRef>,
    pub artists: Vec<ArtistRef>,
    pub schedules: Vec<ScheduleInput>,
}

/// Create-concert form as the user filled it in. Artist and venue stay optional here so
/// an unselected picker surfaces as a field error instead of a missing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConcertDraft {
    #[validate(custom(function = "validate_not_blank", message = "Enter a concert title"))]
    pub title: String,
    #[validate(length(min = 1, message = "Add at least one schedule"), nested)]
    pub schedules: Vec<ScheduleInput>,
    #[validate(required(message = "Select an artist"))]
    pub artist: Option<ArtistRef>,
    #[validate(required(message = "Select a venue"))]
    pub venue: Option<VenueRef>,
    pub poster_url: Option<String>,
}

/// Validated input for `create_concert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConcert {
    pub title: String,
    pub schedules: Vec<ScheduleInput>,
    pub artist: ArtistRef,
    pub venue: VenueRef,
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    ByArtist,
    ByTitle,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "artist" | "by_artist" => Ok(SearchMode::ByArtist),
            "title" | "by_title" => Ok(SearchMode::ByTitle),
            other => Err(format!("unknown search mode: {}", other)),
        }
    }
}
