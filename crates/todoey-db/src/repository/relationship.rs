//! # Relationship Index
//!
//! The one-to-many link from a category to its items, and the inverse
//! lookup from an item back to its owner.
//!
//! ## One Table, Both Directions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       category_items                                    │
//! │                                                                         │
//! │   item_id (PK)   category_id   position                                │
//! │   ───────────    ───────────   ────────                                │
//! │   i-17           home          1          ◄── items_of(home), by        │
//! │   i-42           home          2              position                  │
//! │   i-08           work          1                                       │
//! │                                                                         │
//! │   owner_of(i-42) = home      (primary key lookup)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no second copy of the link, so the forward list and the inverse
//! lookup can't disagree. A row is written by [`append`] and removed by
//! [`detach`], [`detach_all`], or the `ON DELETE CASCADE` of either end.
//! Nothing else sets an item's owner.

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use todoey_core::{CategoryId, Item, ItemId};

/// Read access to the relationship index.
#[derive(Debug, Clone)]
pub struct RelationshipIndex {
    pool: SqlitePool,
}

impl RelationshipIndex {
    /// Creates a new RelationshipIndex.
    pub fn new(pool: SqlitePool) -> Self {
        RelationshipIndex { pool }
    }

    /// Items of `category` in insertion order.
    pub async fn items_of(&self, category: &CategoryId) -> DbResult<Vec<Item>> {
        items_of(&self.pool, category).await
    }

    /// The category that owns `item`, if the item exists.
    pub async fn owner_of(&self, item: &ItemId) -> DbResult<Option<CategoryId>> {
        owner_of(&self.pool, item).await
    }
}

pub(crate) async fn items_of<'e, E>(executor: E, category: &CategoryId) -> DbResult<Vec<Item>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, Item>(
        r#"
        SELECT i.id, i.title, i.done, i.date_created
        FROM category_items ci
        JOIN items i ON i.id = ci.item_id
        WHERE ci.category_id = ?1
        ORDER BY ci.position
        "#,
    )
    .bind(category.as_str())
    .fetch_all(executor)
    .await?;
    Ok(items)
}

pub(crate) async fn owner_of<'e, E>(executor: E, item: &ItemId) -> DbResult<Option<CategoryId>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let owner: Option<CategoryId> =
        sqlx::query_scalar("SELECT category_id FROM category_items WHERE item_id = ?1")
            .bind(item.as_str())
            .fetch_optional(executor)
            .await?;
    Ok(owner)
}

/// Appends `item` to the end of `category`'s list. Returns its position.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    category: &CategoryId,
    item: &ItemId,
) -> DbResult<i64> {
    let position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM category_items WHERE category_id = ?1",
    )
    .bind(category.as_str())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("INSERT INTO category_items (item_id, category_id, position) VALUES (?1, ?2, ?3)")
        .bind(item.as_str())
        .bind(category.as_str())
        .bind(position)
        .execute(&mut *conn)
        .await?;

    debug!(category = %category, item = %item, position, "Linked item");
    Ok(position)
}

/// Removes `item` from its owner's list. Returns the former owner.
pub(crate) async fn detach(conn: &mut SqliteConnection, item: &ItemId) -> DbResult<Option<CategoryId>> {
    let owner = owner_of(&mut *conn, item).await?;

    if owner.is_some() {
        sqlx::query("DELETE FROM category_items WHERE item_id = ?1")
            .bind(item.as_str())
            .execute(&mut *conn)
            .await?;
    }

    Ok(owner)
}

/// Empties `category`'s list. Returns the detached items in insertion order.
pub(crate) async fn detach_all(conn: &mut SqliteConnection, category: &CategoryId) -> DbResult<Vec<ItemId>> {
    let ids: Vec<ItemId> = sqlx::query_scalar(
        "SELECT item_id FROM category_items WHERE category_id = ?1 ORDER BY position",
    )
    .bind(category.as_str())
    .fetch_all(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM category_items WHERE category_id = ?1")
        .bind(category.as_str())
        .execute(&mut *conn)
        .await?;

    debug!(category = %category, count = ids.len(), "Detached all items");
    Ok(ids)
}
