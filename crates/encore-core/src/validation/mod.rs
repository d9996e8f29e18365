//! Form validation
//!
//! Checks run synchronously before any collaborator is called. Failures come back as
//! `AppError::Validation` keyed by form field.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use validator::{Validate, ValidationError};

use crate::error::{AppError, FieldErrors};
use crate::models::{ConcertDraft, NewConcert, ProfileInput};

/// 24-hour `H:MM` or `HH:MM`
static START_TIME_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$"));

pub fn is_valid_start_time(value: &str) -> bool {
    match START_TIME_PATTERN.as_ref() {
        Ok(pattern) => pattern.is_match(value),
        Err(_) => false,
    }
}

pub fn validate_start_time(value: &str) -> Result<(), ValidationError> {
    if !is_valid_start_time(value) {
        return Err(ValidationError::new("start_time"));
    }
    Ok(())
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Validate the create-concert form and produce the input for `create_concert`.
pub fn validate_concert_draft(draft: &ConcertDraft) -> Result<NewConcert, AppError> {
    draft.validate()?;

    match (draft.artist, draft.venue) {
        (Some(artist), Some(venue)) => {
            let mut errors = FieldErrors::new();
            if artist.is_empty() {
                errors.add("artist", "Select an artist");
            }
            if venue.is_empty() {
                errors.add("venue", "Select a venue");
            }
            errors.into_result()?;

            Ok(NewConcert {
                title: draft.title.trim().to_string(),
                schedules: draft.schedules.clone(),
                artist,
                venue,
                poster_url: draft
                    .poster_url
                    .clone()
                    .filter(|url| !url.trim().is_empty()),
            })
        }
        // `required` above already rejected a missing picker
        _ => Err(AppError::validation("artist", "Select an artist and a venue")),
    }
}

/// Review text must reach `min_chars` characters once surrounding whitespace is dropped.
pub fn validate_review_content(content: &str, min_chars: usize) -> Result<(), AppError> {
    let len = content.trim().chars().count();
    if len == 0 || len < min_chars {
        let message: Cow<'static, str> = if min_chars <= 1 {
            "Write your review".into()
        } else {
            format!("Write at least {} characters", min_chars).into()
        };
        return Err(AppError::validation("content", message));
    }
    Ok(())
}

pub fn validate_profile(input: &ProfileInput) -> Result<(), AppError> {
    input.validate()?;
    Ok(())
}

/// Pending artist and venue names follow the same rule as the concert title.
pub fn validate_entity_name(field: &str, name: &str) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(field, "Enter a name"));
    }
    Ok(trimmed.to_string())
}
