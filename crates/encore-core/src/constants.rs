//! Application-wide constants and defaults.

/// Largest image accepted for staging, in bytes (5 MB).
pub const MAX_IMAGE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Search terms shorter than this (in characters) never reach the store.
pub const SEARCH_MIN_TERM_CHARS: usize = 2;

/// Upper bound on concert search results.
pub const SEARCH_PAGE_SIZE: usize = 10;

/// Number of reviews shown on the feed.
pub const FEED_PAGE_SIZE: usize = 20;

/// Minimum review content length, in characters.
pub const MIN_REVIEW_CONTENT_CHARS: usize = 1;

/// Storage key under which the in-progress review wizard is persisted.
pub const WIZARD_STORAGE_KEY: &str = "review-form-storage";

/// Schema version of the persisted wizard envelope.
pub const WIZARD_STATE_VERSION: u32 = 1;

/// Bucket holding review images.
pub const REVIEW_IMAGES_BUCKET: &str = "reviews";

/// Bucket holding concert posters.
pub const POSTERS_BUCKET: &str = "posters";

/// Bucket holding profile avatars.
pub const AVATARS_BUCKET: &str = "avatars";

/// Poster output dimensions (width, height); cover-fit.
pub const POSTER_DIMENSIONS: (u32, u32) = (800, 1067);

/// Avatar output dimensions (width, height); cover-fit.
pub const AVATAR_DIMENSIONS: (u32, u32) = (256, 256);

/// WebP quality used for posters and avatars.
pub const OPTIMIZED_WEBP_QUALITY: f32 = 80.0;
