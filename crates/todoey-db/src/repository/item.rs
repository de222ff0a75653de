//! # Item Repository
//!
//! Reads and writes for the `items` table. Ownership lives in
//! [`super::relationship`]; nothing here knows which category an item
//! belongs to.

use sqlx::{Executor, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use todoey_core::text::fold;
use todoey_core::{Item, ItemId};

const SELECT_ITEM: &str = "SELECT id, title, done, date_created FROM items";

/// Read access to items.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by its ID.
    pub async fn get(&self, id: &ItemId) -> DbResult<Option<Item>> {
        fetch(&self.pool, id).await
    }

    /// Counts all items across every category.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub(crate) async fn fetch<'e, E>(executor: E, id: &ItemId) -> DbResult<Option<Item>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let item = sqlx::query_as::<_, Item>(&format!("{} WHERE id = ?1", SELECT_ITEM))
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(item)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, item: &Item) -> DbResult<()> {
    debug!(id = %item.id, "Inserting item");

    sqlx::query(
        r#"
        INSERT INTO items (id, title, title_folded, done, date_created)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(item.id.as_str())
    .bind(&item.title)
    .bind(fold(&item.title))
    .bind(item.done)
    .bind(item.date_created)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_done(conn: &mut SqliteConnection, id: &ItemId, done: bool) -> DbResult<()> {
    debug!(id = %id, done, "Updating item done flag");

    sqlx::query("UPDATE items SET done = ?1 WHERE id = ?2")
        .bind(done)
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(())
}

pub(crate) async fn update_title(conn: &mut SqliteConnection, id: &ItemId, title: &str) -> DbResult<()> {
    sqlx::query("UPDATE items SET title = ?1, title_folded = ?2 WHERE id = ?3")
        .bind(title)
        .bind(fold(title))
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(())
}

pub(crate) async fn delete(conn: &mut SqliteConnection, id: &ItemId) -> DbResult<bool> {
    debug!(id = %id, "Deleting item");

    let result = sqlx::query("DELETE FROM items WHERE id = ?1")
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Upper bound on bound parameters per `DELETE`, well under SQLite's
/// variable limit (999 on older builds).
const DELETE_CHUNK: usize = 500;

/// Deletes every listed item. Returns the number removed.
///
/// Large lists are split across statements; all of them run on `conn`, so
/// inside a transaction the delete is still all-or-nothing.
pub(crate) async fn delete_many(conn: &mut SqliteConnection, ids: &[ItemId]) -> DbResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    debug!(count = ids.len(), "Deleting items");

    let mut removed = 0;
    for chunk in ids.chunks(DELETE_CHUNK) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM items WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        removed += builder.build().execute(&mut *conn).await?.rows_affected();
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn item(title: &str) -> Item {
        Item {
            id: ItemId::new(),
            title: title.to_string(),
            done: false,
            date_created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_round_trips_timestamp() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let eggos = item("Buy Eggos");
        insert(&mut conn, &eggos).await.unwrap();
        drop(conn);

        let stored = db.items().get(&eggos.id).await.unwrap().unwrap();
        assert_eq!(stored, eggos);
    }

    #[tokio::test]
    async fn test_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let mike = item("find mike");
        insert(&mut conn, &mike).await.unwrap();
        update_done(&mut conn, &mike.id, true).await.unwrap();
        update_title(&mut conn, &mike.id, "Find Mike").await.unwrap();

        let stored = fetch(&mut *conn, &mike.id).await.unwrap().unwrap();
        assert!(stored.done);
        assert_eq!(stored.title, "Find Mike");
    }

    #[tokio::test]
    async fn test_delete_many() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let items: Vec<Item> = ["a", "b", "c"].iter().map(|t| item(t)).collect();
        for i in &items {
            insert(&mut conn, i).await.unwrap();
        }

        let ids: Vec<ItemId> = items[..2].iter().map(|i| i.id.clone()).collect();
        assert_eq!(delete_many(&mut conn, &ids).await.unwrap(), 2);
        assert_eq!(delete_many(&mut conn, &[]).await.unwrap(), 0);
        assert!(delete(&mut conn, &items[2].id).await.unwrap());
        drop(conn);

        assert_eq!(db.items().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_many_beyond_one_statement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.pool().begin().await.unwrap();

        let mut ids = Vec::new();
        for n in 0..(DELETE_CHUNK * 2 + 17) {
            let i = item(&format!("item {}", n));
            insert(&mut tx, &i).await.unwrap();
            ids.push(i.id);
        }

        let removed = delete_many(&mut tx, &ids).await.unwrap();
        assert_eq!(removed, ids.len() as u64);
        tx.commit().await.unwrap();

        assert_eq!(db.items().count().await.unwrap(), 0);
    }
}
