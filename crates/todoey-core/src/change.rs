//! # Change Events
//!
//! What a committed write transaction did, as published to subscribers.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WriteTxn ──commit──► ChangeEvent { revision: 7, changes: [...] }       │
//! │                               │                                         │
//! │               ┌───────────────┼───────────────────┐                     │
//! │               ▼               ▼                   ▼                     │
//! │        raw subscriber   handle(AllCategories)  handle(ItemsOf(c))       │
//! │        (every event)    touched by category    touched by item          │
//! │                         changes                changes in c, or c gone  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::query::Scope;
use crate::types::{CategoryId, ItemId};

/// One record-level effect of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityChange {
    CategoryInserted { id: CategoryId },
    CategoryUpdated { id: CategoryId },
    /// `items` lists the items removed by cascade, in insertion order.
    CategoryDeleted { id: CategoryId, items: Vec<ItemId> },
    ItemInserted { id: ItemId, category: CategoryId },
    ItemUpdated { id: ItemId, category: CategoryId },
    ItemDeleted { id: ItemId, category: CategoryId },
}

impl EntityChange {
    /// Returns true if this change can alter the rows visible in `scope`.
    pub fn touches(&self, scope: &Scope) -> bool {
        match (self, scope) {
            (
                EntityChange::CategoryInserted { .. }
                | EntityChange::CategoryUpdated { .. }
                | EntityChange::CategoryDeleted { .. },
                Scope::AllCategories,
            ) => true,
            (EntityChange::CategoryDeleted { id, .. }, Scope::ItemsOf(owner)) => id == owner,
            (
                EntityChange::ItemInserted { category, .. }
                | EntityChange::ItemUpdated { category, .. }
                | EntityChange::ItemDeleted { category, .. },
                Scope::ItemsOf(owner),
            ) => category == owner,
            _ => false,
        }
    }
}

/// Everything one commit changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Store revision after the commit. Strictly increasing.
    pub revision: u64,
    pub changes: Vec<EntityChange>,
}

impl ChangeEvent {
    /// Returns true if any change in the event touches `scope`.
    pub fn touches(&self, scope: &Scope) -> bool {
        self.changes.iter().any(|c| c.touches(scope))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
