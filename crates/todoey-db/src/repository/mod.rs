//! # Repository Module
//!
//! SQL for each table, kept out of the store and the live query engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reads vs Writes                                      │
//! │                                                                         │
//! │  Reads                               Writes                            │
//! │  ─────                               ──────                            │
//! │  db.categories().list()              category::insert(&mut conn, ..)   │
//! │  db.items().get(&id)                 item::update_done(&mut conn, ..)  │
//! │  db.relationships().owner_of(&id)    relationship::append(&mut conn,..)│
//! │       │                                   │                             │
//! │       │ pool                              │ WriteTxn connection only    │
//! │       ▼                                   ▼                             │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write functions are crate-private and take a connection, so the only way
//! to change the store from outside is through a
//! [`WriteTxn`](crate::store::WriteTxn).
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`] - Category lookups and listing
//! - [`ItemRepository`] - Item lookups
//! - [`RelationshipIndex`] - Category ⇄ item links

pub mod category;
pub mod item;
pub(crate) mod query;
pub mod relationship;

pub use category::CategoryRepository;
pub use item::ItemRepository;
pub use relationship::RelationshipIndex;
