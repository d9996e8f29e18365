use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a row in either the verified table or its pending (awaiting moderation)
/// counterpart. Consumers must branch on the tag; the two tables share no id space.
///
/// Serialised as `{ "id": "...", "isPending": bool }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RefRepr", into = "RefRepr")]
pub enum EntityRef {
    Verified(Uuid),
    Pending(Uuid),
}

pub type ConcertRef = EntityRef;
pub type ArtistRef = EntityRef;
pub type VenueRef = EntityRef;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefRepr {
    id: Uuid,
    is_pending: bool,
}

impl From<RefRepr> for EntityRef {
    fn from(repr: RefRepr) -> Self {
        EntityRef::new(repr.id, repr.is_pending)
    }
}

impl From<EntityRef> for RefRepr {
    fn from(entity: EntityRef) -> Self {
        RefRepr {
            id: entity.id(),
            is_pending: entity.is_pending(),
        }
    }
}

impl EntityRef {
    pub fn new(id: Uuid, is_pending: bool) -> Self {
        if is_pending {
            EntityRef::Pending(id)
        } else {
            EntityRef::Verified(id)
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            EntityRef::Verified(id) | EntityRef::Pending(id) => *id,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntityRef::Pending(_))
    }

    /// The nil id is what an empty form field decodes to; it never names a row.
    pub fn is_empty(&self) -> bool {
        self.id().is_nil()
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Verified(id) => write!(f, "verified:{}", id),
            EntityRef::Pending(id) => write!(f, "pending:{}", id),
        }
    }
}

/// Catalog entity kinds that exist as a verified/pending table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Concert,
    Artist,
    Venue,
}

impl EntityKind {
    pub fn verified_table(&self) -> &'static str {
        match self {
            EntityKind::Concert => "concerts",
            EntityKind::Artist => "artists",
            EntityKind::Venue => "venues",
        }
    }

    pub fn pending_table(&self) -> &'static str {
        match self {
            EntityKind::Concert => "concerts_pending",
            EntityKind::Artist => "artists_pending",
            EntityKind::Venue => "venues_pending",
        }
    }

    /// Table holding the row a reference of this kind points at.
    pub fn table_for(&self, entity: &EntityRef) -> &'static str {
        if entity.is_pending() {
            self.pending_table()
        } else {
            self.verified_table()
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Concert => write!(f, "concert"),
            EntityKind::Artist => write!(f, "artist"),
            EntityKind::Venue => write!(f, "venue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_is_pending_flag() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(EntityRef::Pending(id)).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["isPending"], true);

        let back: EntityRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, EntityRef::Pending(id));
    }

    #[test]
    fn rejects_malformed_id() {
        let parsed = serde_json::from_str::<EntityRef>(r#"{"id":"","isPending":false}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn table_follows_tag() {
        let id = Uuid::new_v4();
        assert_eq!(
            EntityKind::Artist.table_for(&EntityRef::Pending(id)),
            "artists_pending"
        );
        assert_eq!(EntityKind::Venue.table_for(&EntityRef::Verified(id)), "venues");
    }
}
