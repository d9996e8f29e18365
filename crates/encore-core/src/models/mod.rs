//! Data models shared by the review core
//!
//! Each sub-module covers one feature area: entity references into the verified/pending
//! tables, the concert catalog, reviews and the feed, and user profiles.

mod catalog;
mod entity_ref;
mod review;
mod user;

pub use catalog::*;
pub use entity_ref::*;
pub use review::*;
pub use user::*;
