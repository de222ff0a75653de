//! # Entity Store
//!
//! The only way to change the store: scoped write transactions that commit
//! all-or-nothing and publish one [`ChangeEvent`] each.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  store.begin_write().await        ── waits for the writer lock         │
//! │       │                              (try_begin_write: Conflict)       │
//! │       ▼                                                                 │
//! │  WriteTxn { writer lock, sqlx::Transaction, changes }                  │
//! │       │  txn.create_item(&home, "Buy Eggos")                           │
//! │       │  txn.set_done(&id, true)                                       │
//! │       ▼                                                                 │
//! │  store.commit(txn).await                                               │
//! │       ├── changes empty? ──► commit, revision unchanged, no event      │
//! │       ├── revision += 1, SQL COMMIT                                    │
//! │       ├── notifier.stage(event)     (still under the writer lock:      │
//! │       │                              views re-evaluated, event queued) │
//! │       ├── release writer lock                                          │
//! │       └── notifier.flush()          (view changes, then subscribers)   │
//! │                                                                         │
//! │  drop(txn) without commit ──► ROLLBACK, lock released, no event        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The one-shot methods on [`EntityStore`] (`create_category`, `set_done`,
//! ...) each run a single-operation transaction. Input is validated before
//! the transaction opens.

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::notify::{ChangeNotifier, SubscriptionId};
use crate::pool::{Database, DbConfig};
use crate::repository::{category, item, relationship};
use todoey_core::validation::{normalize_colour_tag, validate_category_name, validate_item_title};
use todoey_core::{Category, CategoryId, ChangeEvent, EntityChange, Item, ItemId};

// =============================================================================
// Entity Store
// =============================================================================

/// Owner of the store file's writes and its change stream.
///
/// Cheap to clone; clones share the pool, the writer lock and the notifier.
#[derive(Clone)]
pub struct EntityStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Database,
    writer: Arc<Mutex<()>>,
    notifier: ChangeNotifier,
}

impl EntityStore {
    /// Opens the store file described by `config`.
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        let db = Database::new(config).await?;
        Ok(Self::new(db))
    }

    /// Wraps an already-open database.
    pub fn new(db: Database) -> Self {
        EntityStore {
            inner: Arc::new(StoreInner {
                db,
                writer: Arc::new(Mutex::new(())),
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Waits for the writer lock without opening a transaction.
    ///
    /// Live queries take it while computing their first view, so no commit
    /// can slip in between that evaluation and their registration.
    pub(crate) async fn lock_writer(&self) -> OwnedMutexGuard<()> {
        self.inner.writer.clone().lock_owned().await
    }

    /// Starts a write transaction, waiting for any other writer to finish.
    pub async fn begin_write(&self) -> DbResult<WriteTxn> {
        let writer = self.lock_writer().await;
        self.start(writer).await
    }

    /// Starts a write transaction, or fails with `TransactionConflict` if
    /// another writer holds the lock.
    pub async fn try_begin_write(&self) -> DbResult<WriteTxn> {
        let writer = self
            .inner
            .writer
            .clone()
            .try_lock_owned()
            .map_err(|_| DbError::TransactionConflict)?;
        self.start(writer).await
    }

    async fn start(&self, writer: OwnedMutexGuard<()>) -> DbResult<WriteTxn> {
        let tx = self.inner.db.pool().begin().await?;
        debug!("Write transaction started");
        Ok(WriteTxn {
            writer,
            tx,
            changes: Vec::new(),
        })
    }

    /// Commits `txn` and delivers its change event.
    ///
    /// Returns the store revision after the commit. A transaction that
    /// changed nothing commits without bumping the revision or emitting an
    /// event.
    pub async fn commit(&self, txn: WriteTxn) -> DbResult<u64> {
        let WriteTxn {
            writer,
            mut tx,
            changes,
        } = txn;

        if changes.is_empty() {
            let revision = read_revision(&mut tx).await?;
            tx.commit().await?;
            debug!(revision, "Committed empty write transaction");
            return Ok(revision);
        }

        let revision = bump_revision(&mut tx).await?;
        tx.commit().await?;
        info!(revision, changes = changes.len(), "Committed write transaction");

        // Staged before releasing the lock: events queue in revision order
        // and each view is evaluated at this revision
        self.inner.notifier.stage(ChangeEvent { revision, changes }).await;
        drop(writer);

        self.inner.notifier.flush();
        Ok(revision)
    }

    // =========================================================================
    // One-shot writes
    // =========================================================================

    /// Creates a category. `colour_tag` may be empty.
    pub async fn create_category(&self, name: &str, colour_tag: &str) -> DbResult<CategoryId> {
        validate_category_name(name)?;
        let colour_tag = normalize_colour_tag(colour_tag)?;

        let mut txn = self.begin_write().await?;
        let id = txn.create_category(name, &colour_tag).await?;
        self.commit(txn).await?;
        Ok(id)
    }

    /// Creates an item at the end of `owner`'s list.
    pub async fn create_item(&self, owner: &CategoryId, title: &str) -> DbResult<ItemId> {
        validate_item_title(title)?;

        let mut txn = self.begin_write().await?;
        let id = txn.create_item(owner, title).await?;
        self.commit(txn).await?;
        Ok(id)
    }

    /// Sets the done flag. Setting the current value is a no-op.
    pub async fn set_done(&self, id: &ItemId, done: bool) -> DbResult<()> {
        let mut txn = self.begin_write().await?;
        txn.set_done(id, done).await?;
        self.commit(txn).await?;
        Ok(())
    }

    /// Flips the done flag. Returns the new value.
    pub async fn toggle_done(&self, id: &ItemId) -> DbResult<bool> {
        let mut txn = self.begin_write().await?;
        let done = txn.toggle_done(id).await?;
        self.commit(txn).await?;
        Ok(done)
    }

    pub async fn rename_item(&self, id: &ItemId, title: &str) -> DbResult<()> {
        validate_item_title(title)?;

        let mut txn = self.begin_write().await?;
        txn.rename_item(id, title).await?;
        self.commit(txn).await?;
        Ok(())
    }

    pub async fn rename_category(&self, id: &CategoryId, name: &str) -> DbResult<()> {
        validate_category_name(name)?;

        let mut txn = self.begin_write().await?;
        txn.rename_category(id, name).await?;
        self.commit(txn).await?;
        Ok(())
    }

    /// Sets or clears (empty string) a category's colour.
    pub async fn set_colour_tag(&self, id: &CategoryId, colour_tag: &str) -> DbResult<()> {
        let colour_tag = normalize_colour_tag(colour_tag)?;

        let mut txn = self.begin_write().await?;
        txn.set_colour_tag(id, &colour_tag).await?;
        self.commit(txn).await?;
        Ok(())
    }

    /// Deletes a category and every item it owns.
    pub async fn delete_category(&self, id: &CategoryId) -> DbResult<()> {
        let mut txn = self.begin_write().await?;
        txn.delete_category(id).await?;
        self.commit(txn).await?;
        Ok(())
    }

    pub async fn delete_item(&self, id: &ItemId) -> DbResult<()> {
        let mut txn = self.begin_write().await?;
        txn.delete_item(id).await?;
        self.commit(txn).await?;
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn category(&self, id: &CategoryId) -> DbResult<Option<Category>> {
        self.inner.db.categories().get(id).await
    }

    pub async fn item(&self, id: &ItemId) -> DbResult<Option<Item>> {
        self.inner.db.items().get(id).await
    }

    /// All categories in creation order.
    pub async fn categories(&self) -> DbResult<Vec<Category>> {
        self.inner.db.categories().list().await
    }

    /// The `items` collection of a category, in insertion order.
    pub async fn items_of(&self, category: &CategoryId) -> DbResult<Vec<Item>> {
        if !self.inner.db.categories().exists(category).await? {
            return Err(DbError::OwnerNotFound {
                category: category.clone(),
            });
        }
        self.inner.db.relationships().items_of(category).await
    }

    /// The category that owns `item`.
    pub async fn owner_of(&self, item: &ItemId) -> DbResult<Option<CategoryId>> {
        self.inner.db.relationships().owner_of(item).await
    }

    /// The revision of the last commit that changed something.
    pub async fn revision(&self) -> DbResult<u64> {
        let mut conn = self.inner.db.pool().acquire().await?;
        read_revision(&mut conn).await
    }

    // =========================================================================
    // Change stream
    // =========================================================================

    /// Subscribes to every committed change event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }
}

async fn read_revision(conn: &mut SqliteConnection) -> DbResult<u64> {
    let revision: i64 = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = 'revision'")
        .fetch_one(conn)
        .await?;
    Ok(revision as u64)
}

async fn bump_revision(conn: &mut SqliteConnection) -> DbResult<u64> {
    sqlx::query("UPDATE store_meta SET value = value + 1 WHERE key = 'revision'")
        .execute(&mut *conn)
        .await?;
    read_revision(conn).await
}

// =============================================================================
// Write Transaction
// =============================================================================

/// An open write transaction.
///
/// Holds the store's writer lock until committed or dropped. Dropping it
/// without [`EntityStore::commit`] rolls everything back.
pub struct WriteTxn {
    writer: OwnedMutexGuard<()>,
    tx: Transaction<'static, Sqlite>,
    changes: Vec<EntityChange>,
}

impl WriteTxn {
    /// Changes recorded so far.
    pub fn changes(&self) -> &[EntityChange] {
        &self.changes
    }

    /// Discards the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!("Write transaction rolled back");
        Ok(())
    }

    pub async fn create_category(&mut self, name: &str, colour_tag: &str) -> DbResult<CategoryId> {
        validate_category_name(name)?;
        let category = Category {
            id: CategoryId::new(),
            name: name.to_string(),
            colour_tag: normalize_colour_tag(colour_tag)?,
        };

        category::insert(&mut self.tx, &category).await?;
        self.changes.push(EntityChange::CategoryInserted {
            id: category.id.clone(),
        });
        Ok(category.id)
    }

    /// Fails with `OwnerNotFound` if `owner` doesn't exist.
    pub async fn create_item(&mut self, owner: &CategoryId, title: &str) -> DbResult<ItemId> {
        validate_item_title(title)?;
        if !category::exists(&mut *self.tx, owner).await? {
            return Err(DbError::OwnerNotFound {
                category: owner.clone(),
            });
        }

        let item = Item {
            id: ItemId::new(),
            title: title.to_string(),
            done: false,
            date_created: Utc::now(),
        };
        item::insert(&mut self.tx, &item).await?;
        relationship::append(&mut self.tx, owner, &item.id).await?;

        self.changes.push(EntityChange::ItemInserted {
            id: item.id.clone(),
            category: owner.clone(),
        });
        Ok(item.id)
    }

    pub async fn set_done(&mut self, id: &ItemId, done: bool) -> DbResult<()> {
        let current = self.load_item(id).await?;
        if current.done == done {
            return Ok(());
        }
        self.write_done(id, done).await
    }

    pub async fn toggle_done(&mut self, id: &ItemId) -> DbResult<bool> {
        let done = !self.load_item(id).await?.done;
        self.write_done(id, done).await?;
        Ok(done)
    }

    pub async fn rename_item(&mut self, id: &ItemId, title: &str) -> DbResult<()> {
        validate_item_title(title)?;
        if self.load_item(id).await?.title == title {
            return Ok(());
        }

        let owner = self.owner(id).await?;
        item::update_title(&mut self.tx, id, title).await?;
        self.changes.push(EntityChange::ItemUpdated {
            id: id.clone(),
            category: owner,
        });
        Ok(())
    }

    pub async fn rename_category(&mut self, id: &CategoryId, name: &str) -> DbResult<()> {
        validate_category_name(name)?;
        if self.load_category(id).await?.name == name {
            return Ok(());
        }

        category::update_name(&mut self.tx, id, name).await?;
        self.changes
            .push(EntityChange::CategoryUpdated { id: id.clone() });
        Ok(())
    }

    pub async fn set_colour_tag(&mut self, id: &CategoryId, colour_tag: &str) -> DbResult<()> {
        let colour_tag = normalize_colour_tag(colour_tag)?;
        if self.load_category(id).await?.colour_tag == colour_tag {
            return Ok(());
        }

        category::update_colour_tag(&mut self.tx, id, &colour_tag).await?;
        self.changes
            .push(EntityChange::CategoryUpdated { id: id.clone() });
        Ok(())
    }

    /// Removes the category and, in the same transaction, every item it owns.
    pub async fn delete_category(&mut self, id: &CategoryId) -> DbResult<()> {
        if !category::exists(&mut *self.tx, id).await? {
            return Err(DbError::not_found("Category", id));
        }

        let items = relationship::detach_all(&mut self.tx, id).await?;
        item::delete_many(&mut self.tx, &items).await?;
        category::delete(&mut self.tx, id).await?;

        debug!(id = %id, items = items.len(), "Category deleted with its items");
        self.changes.push(EntityChange::CategoryDeleted {
            id: id.clone(),
            items,
        });
        Ok(())
    }

    pub async fn delete_item(&mut self, id: &ItemId) -> DbResult<()> {
        let owner = relationship::detach(&mut self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;
        item::delete(&mut self.tx, id).await?;

        self.changes.push(EntityChange::ItemDeleted {
            id: id.clone(),
            category: owner,
        });
        Ok(())
    }

    async fn write_done(&mut self, id: &ItemId, done: bool) -> DbResult<()> {
        let owner = self.owner(id).await?;
        item::update_done(&mut self.tx, id, done).await?;
        self.changes.push(EntityChange::ItemUpdated {
            id: id.clone(),
            category: owner,
        });
        Ok(())
    }

    async fn load_item(&mut self, id: &ItemId) -> DbResult<Item> {
        item::fetch(&mut *self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }

    async fn load_category(&mut self, id: &CategoryId) -> DbResult<Category> {
        category::fetch(&mut *self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))
    }

    async fn owner(&mut self, id: &ItemId) -> DbResult<CategoryId> {
        relationship::owner_of(&mut *self.tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
