//! # Domain Types
//!
//! Identities and records stored by the Todoey store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐    items (ordered)    ┌─────────────────┐         │
//! │  │    Category     │ ────────────────────► │      Item       │         │
//! │  │  ─────────────  │                       │  ─────────────  │         │
//! │  │  id (UUID)      │ ◄──────────────────── │  id (UUID)      │         │
//! │  │  name           │   owner (derived,     │  title          │         │
//! │  │  colour_tag     │    read-only)         │  done           │         │
//! │  └─────────────────┘                       │  date_created   │         │
//! │                                            └─────────────────┘         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An `Item` has no owner field. The owning category is looked up through
//! the relationship index in `todoey-db`, so it can't be set on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Identities
// =============================================================================

/// Opaque identity of a [`Category`].
///
/// UUID v4 text. Never reused after the category is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Allocates a fresh identity.
    pub fn new() -> Self {
        CategoryId(Uuid::new_v4().to_string())
    }

    /// Returns the identity as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CategoryId {
    fn from(id: String) -> Self {
        CategoryId(id)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        CategoryId(id.to_string())
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity of an [`Item`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Allocates a fresh identity.
    pub fn new() -> Self {
        ItemId(Uuid::new_v4().to_string())
    }

    /// Returns the identity as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Category
// =============================================================================

/// A named list of items.
///
/// The ordered `items` collection is not carried here; it lives in the
/// relationship index and is read with `EntityStore::items_of`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: CategoryId,

    /// Display name. Not unique.
    pub name: String,

    /// Colour as `#RRGGBB`, or empty when untagged.
    pub colour_tag: String,
}

impl Category {
    /// Returns true if a colour has been assigned.
    #[inline]
    pub fn has_colour(&self) -> bool {
        !self.colour_tag.is_empty()
    }
}

// =============================================================================
// Item
// =============================================================================

/// A to-do entry owned by exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Item {
    /// Unique identifier (UUID v4).
    pub id: ItemId,

    /// Text shown in the list.
    pub title: String,

    /// Completion flag.
    pub done: bool,

    /// When the item was created. Never changes.
    pub date_created: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_are_unique() {
        let a = CategoryId::new();
        let b = CategoryId::new();
        assert_ne!(a, b);

        let x = ItemId::new();
        let y = ItemId::new();
        assert_ne!(x, y);
    }

    #[test]
    fn test_identity_is_uuid_text() {
        let id = ItemId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_eq!(id.to_string(), id.as_str());
    }

    #[test]
    fn test_category_serializes_id_as_plain_string() {
        let category = Category {
            id: CategoryId::from("c-1"),
            name: "Groceries".to_string(),
            colour_tag: String::new(),
        };
        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json["id"], "c-1");
        assert!(!category.has_colour());
    }
}
