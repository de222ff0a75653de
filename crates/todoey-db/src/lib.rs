//! # todoey-db: Storage Layer for the Todoey Store
//!
//! This crate persists categories and items in SQLite (via sqlx) and keeps
//! live views of them up to date as writes commit.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Todoey Data Flow                                 │
//! │                                                                         │
//! │  UI: add item, toggle checkmark, swipe delete, search box              │
//! │       │ writes                              ▲ ViewChange               │
//! │       ▼                                     │                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     todoey-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  EntityStore  │───►│ChangeNotifier │───►│ LiveQuery    │  │   │
//! │  │   │  (store.rs)   │    │  (notify.rs)  │    │ Engine       │  │   │
//! │  │   │  WriteTxn     │    │ ordered queue │    │ (live.rs)    │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────┬───────┘  │   │
//! │  │           │                                        │          │   │
//! │  │   ┌───────▼────────────────────────────────────────▼───────┐  │   │
//! │  │   │  Repositories + query compiler    Database (pool.rs)   │  │   │
//! │  │   └────────────────────────────────────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/todoey/todoey.db                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML settings file with environment overrides
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table SQL and the relationship index
//! - [`store`] - Write transactions and the change stream
//! - [`notify`] - Ordered, re-entrant change delivery
//! - [`live`] - Live filtered and sorted views
//!
//! ## Usage
//!
//! ```rust,ignore
//! use todoey_db::{DbConfig, EntityStore, LiveQueryEngine};
//! use todoey_core::QuerySpec;
//!
//! let store = EntityStore::open(DbConfig::new("todoey.db")).await?;
//! let engine = LiveQueryEngine::new(store.clone());
//!
//! let home = store.create_category("Home", "#1ABC9C").await?;
//! let items = engine.observe(QuerySpec::item_list(home.clone())).await?;
//! items.subscribe(|change| println!("{} items", change.count));
//!
//! store.create_item(&home, "Buy Eggos").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod live;
pub mod migrations;
pub mod notify;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{StoreConfig, SynchronousMode};
pub use error::{DbError, DbResult};
pub use live::{LiveQueryEngine, LiveRow, ResultHandle, ViewChange};
pub use notify::{ChangeNotifier, SubscriptionId};
pub use pool::{Database, DbConfig};
pub use store::{EntityStore, WriteTxn};

// Repository re-exports for convenience
pub use repository::{CategoryRepository, ItemRepository, RelationshipIndex};
