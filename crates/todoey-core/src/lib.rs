//! # todoey-core: Pure Domain Logic for the Todoey Store
//!
//! This crate holds the domain model shared by the store and its callers.
//! It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Todoey Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI layer (not in this workspace)             │   │
//! │  │    Category list ──► Item list ──► Search box ──► Swipe delete  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ todoey-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   query   │  │   text    │  │ validation│  │   │
//! │  │   │ Category  │  │ QuerySpec │  │  folding  │  │   rules   │  │   │
//! │  │   │   Item    │  │  Filter   │  │  search   │  │  colours  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                         ┌───────────┐                          │   │
//! │  │                         │  change   │                          │   │
//! │  │                         │ChangeEvent│                          │   │
//! │  │                         └───────────┘                          │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    todoey-db (Storage Layer)                    │   │
//! │  │     SQLite entity store, live queries, change notifier          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Identities and records (Category, Item)
//! - [`query`] - Live query specifications (scope, filter, sort)
//! - [`text`] - Case- and diacritic-insensitive text folding
//! - [`change`] - Commit events published by the store
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use todoey_core::query::{Filter, QuerySpec};
//! use todoey_core::types::CategoryId;
//!
//! let groceries = CategoryId::new();
//! let spec = QuerySpec::item_search(groceries, "eggo");
//!
//! assert_eq!(spec.filter, Some(Filter::TitleContains("eggo".to_string())));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod change;
pub mod error;
pub mod query;
pub mod text;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use change::{ChangeEvent, EntityChange};
pub use error::{CoreError, ValidationError};
pub use query::{Filter, QuerySpec, Scope, SortField, SortSpec};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a category name, in characters.
pub const MAX_CATEGORY_NAME_LEN: usize = 200;

/// Maximum length of an item title, in characters.
pub const MAX_ITEM_TITLE_LEN: usize = 500;

/// Maximum length of a search query, in characters.
pub const MAX_SEARCH_LEN: usize = 100;
