//! # Category Repository
//!
//! Reads and writes for the `categories` table.
//!
//! Writes take a `&mut SqliteConnection` so they only ever run inside a
//! [`crate::store::WriteTxn`]. Reads are available on the pool through
//! [`CategoryRepository`] and on any executor through the crate-level
//! helpers.

use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use todoey_core::text::fold;
use todoey_core::{Category, CategoryId};

const SELECT_CATEGORY: &str = "SELECT id, name, colour_tag FROM categories";

/// Read access to categories.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.categories();
/// let all = repo.list().await?;
/// let home = repo.get(&id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Gets a category by its ID.
    pub async fn get(&self, id: &CategoryId) -> DbResult<Option<Category>> {
        fetch(&self.pool, id).await
    }

    /// Lists all categories in creation order.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!("{} ORDER BY seq", SELECT_CATEGORY))
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Counts all categories.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Returns true if the category exists.
    pub async fn exists(&self, id: &CategoryId) -> DbResult<bool> {
        exists(&self.pool, id).await
    }
}

// =============================================================================
// Executor-generic reads
// =============================================================================

pub(crate) async fn fetch<'e, E>(executor: E, id: &CategoryId) -> DbResult<Option<Category>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let category = sqlx::query_as::<_, Category>(&format!("{} WHERE id = ?1", SELECT_CATEGORY))
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(category)
}

pub(crate) async fn exists<'e, E>(executor: E, id: &CategoryId) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM categories WHERE id = ?1")
        .bind(id.as_str())
        .fetch_optional(executor)
        .await?;
    Ok(found.is_some())
}

// =============================================================================
// Writes (transaction only)
// =============================================================================

pub(crate) async fn insert(conn: &mut SqliteConnection, category: &Category) -> DbResult<()> {
    debug!(id = %category.id, "Inserting category");

    sqlx::query(
        "INSERT INTO categories (id, name, name_folded, colour_tag) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(category.id.as_str())
    .bind(&category.name)
    .bind(fold(&category.name))
    .bind(&category.colour_tag)
    .execute(conn)
    .await?;

    Ok(())
}

pub(crate) async fn update_name(
    conn: &mut SqliteConnection,
    id: &CategoryId,
    name: &str,
) -> DbResult<()> {
    debug!(id = %id, "Renaming category");

    sqlx::query("UPDATE categories SET name = ?1, name_folded = ?2 WHERE id = ?3")
        .bind(name)
        .bind(fold(name))
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(())
}

pub(crate) async fn update_colour_tag(
    conn: &mut SqliteConnection,
    id: &CategoryId,
    colour_tag: &str,
) -> DbResult<()> {
    sqlx::query("UPDATE categories SET colour_tag = ?1 WHERE id = ?2")
        .bind(colour_tag)
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(())
}

/// Deletes the category row. Returns false if it didn't exist.
///
/// Link rows go with it (`ON DELETE CASCADE`); the items themselves are
/// removed by the caller first.
pub(crate) async fn delete(conn: &mut SqliteConnection, id: &CategoryId) -> DbResult<bool> {
    debug!(id = %id, "Deleting category");

    let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
        .bind(id.as_str())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn category(name: &str) -> Category {
        Category {
            id: CategoryId::new(),
            name: name.to_string(),
            colour_tag: String::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_in_creation_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let work = category("Work");
        let home = category("Home");
        insert(&mut conn, &work).await.unwrap();
        insert(&mut conn, &home).await.unwrap();
        drop(conn);

        let repo = db.categories();
        let names: Vec<_> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Work", "Home"]);
        assert_eq!(repo.count().await.unwrap(), 2);
        assert_eq!(repo.get(&home.id).await.unwrap(), Some(home));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let c = category("Hom");
        insert(&mut conn, &c).await.unwrap();
        update_name(&mut conn, &c.id, "Home").await.unwrap();
        update_colour_tag(&mut conn, &c.id, "#1ABC9C").await.unwrap();

        let stored = fetch(&mut *conn, &c.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Home");
        assert_eq!(stored.colour_tag, "#1ABC9C");

        assert!(delete(&mut conn, &c.id).await.unwrap());
        assert!(!delete(&mut conn, &c.id).await.unwrap());
        assert!(!exists(&mut *conn, &c.id).await.unwrap());
    }
}
