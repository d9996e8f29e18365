//! Database repositories for data access layer
//!
//! Services depend on the store traits in `traits`; the Postgres repositories here are
//! the production implementations. Verified and pending catalog tables are handled by
//! the same repository, branching on the `EntityRef` tag.
//
// Store traits
pub mod traits;
//
// PostgreSQL repositories
pub mod catalog;
pub mod review;
pub mod user;
//
// Pool setup and migrations
pub mod pool;
//
// Transaction utilities
pub mod transaction;

pub use catalog::CatalogRepository;
pub use pool::setup_database;
pub use review::ReviewRepository;
pub use traits::{CatalogStore, PendingConcertInput, ReviewStore, UserStore};
pub use user::UserRepository;

/// Build an `ILIKE` pattern matching `term` anywhere, with LIKE wildcards escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
