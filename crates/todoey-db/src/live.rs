//! # Live Query Engine
//!
//! Filtered, sorted views over the store that re-evaluate themselves after
//! every commit touching their scope.
//!
//! ## Handle Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  engine.observe_items(&home, filter, sort)                             │
//! │       │  validate spec ──► InvalidQuery / Validation                   │
//! │       │  home exists?  ──► OwnerNotFound                               │
//! │       │  initial digest of the visible rows                            │
//! │       ▼                                                                 │
//! │  ResultHandle<Item> ── Arc<LiveState> ──weak──► ChangeNotifier         │
//! │       │                                                                 │
//! │       │  commit r touching ItemsOf(home), writer lock still held       │
//! │       ▼                                                                 │
//! │  refresh: SELECT rows, hash, compare with last digest                  │
//! │       ├── same  ──► nothing                                            │
//! │       └── other ──► ViewChange { r, count } staged with event r        │
//! │                                                                         │
//! │  flush (after the lock is released) ──► announce to subscribers        │
//! │                                                                         │
//! │  drop(last handle clone) ──► weak ref dies, notifier forgets it        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A handle keeps the spec, the pool and a 64-bit digest of the last view.
//! `count`, `at` and `rows` always query the store, so they reflect the
//! latest commit even before its notification arrives. A `ViewChange` is
//! computed at its own revision, so its `count` is the count as of that
//! commit even if later commits are delivered right behind it.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::notify::{BoxFuture, LiveView, SubscriptionId, SubscriptionManager};
use crate::repository::{category, query};
use crate::store::EntityStore;
use todoey_core::{Category, CategoryId, Filter, Item, QuerySpec, Scope, SortSpec};

// =============================================================================
// Row Types
// =============================================================================

/// A record type a live query can yield.
pub trait LiveRow: for<'r> FromRow<'r, SqliteRow> + Hash + Send + Sync + Unpin + 'static {
    /// Whether rows of this type live in `scope`.
    fn accepts(scope: &Scope) -> bool;
}

impl LiveRow for Category {
    fn accepts(scope: &Scope) -> bool {
        matches!(scope, Scope::AllCategories)
    }
}

impl LiveRow for Item {
    fn accepts(scope: &Scope) -> bool {
        scope.is_items()
    }
}

/// Sent to handle subscribers when the visible rows change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewChange {
    /// Revision of the commit that changed the view.
    pub revision: u64,
    /// Row count after the change.
    pub count: usize,
}

// =============================================================================
// Engine
// =============================================================================

/// Creates result handles bound to one store.
#[derive(Clone)]
pub struct LiveQueryEngine {
    store: EntityStore,
}

impl LiveQueryEngine {
    pub fn new(store: EntityStore) -> Self {
        LiveQueryEngine { store }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Observes `spec`, yielding rows of type `T`.
    ///
    /// Waits for any open write transaction to finish, so don't call it
    /// while holding a [`WriteTxn`](crate::store::WriteTxn) on the same task.
    pub async fn observe<T: LiveRow>(&self, spec: QuerySpec) -> DbResult<ResultHandle<T>> {
        spec.validate()?;
        if !T::accepts(&spec.scope) {
            return Err(DbError::InvalidQuery(format!(
                "row type does not match scope {}",
                spec.scope
            )));
        }

        // No commit may land between the first evaluation and registration
        let _writer = self.store.lock_writer().await;

        let pool = self.store.database().pool().clone();
        if let Scope::ItemsOf(owner) = &spec.scope {
            if !category::exists(&pool, owner).await? {
                return Err(DbError::OwnerNotFound {
                    category: owner.clone(),
                });
            }
        }

        let state = Arc::new(LiveState::<T> {
            spec,
            pool,
            digest: AtomicU64::new(0),
            subscribers: SubscriptionManager::new(),
            rows: PhantomData,
        });
        let initial = state.evaluate().await?;
        state.digest.store(initial.0, Ordering::SeqCst);

        let weak: Weak<LiveState<T>> = Arc::downgrade(&state);
        let view: Weak<dyn LiveView> = weak;
        self.store.notifier().register(view);

        debug!(scope = %state.spec.scope, count = initial.1, "Live query registered");
        Ok(ResultHandle { state })
    }

    /// Observes every category.
    pub async fn observe_categories(
        &self,
        filter: Option<Filter>,
        sort: Option<SortSpec>,
    ) -> DbResult<ResultHandle<Category>> {
        self.observe(QuerySpec {
            scope: Scope::AllCategories,
            filter,
            sort,
        })
        .await
    }

    /// Observes the items owned by `owner`.
    pub async fn observe_items(
        &self,
        owner: &CategoryId,
        filter: Option<Filter>,
        sort: Option<SortSpec>,
    ) -> DbResult<ResultHandle<Item>> {
        self.observe(QuerySpec {
            scope: Scope::ItemsOf(owner.clone()),
            filter,
            sort,
        })
        .await
    }
}

// =============================================================================
// Result Handle
// =============================================================================

/// A live view. Clones share one registration and one subscriber list.
pub struct ResultHandle<T: LiveRow> {
    state: Arc<LiveState<T>>,
}

impl<T: LiveRow> Clone for ResultHandle<T> {
    fn clone(&self) -> Self {
        ResultHandle {
            state: self.state.clone(),
        }
    }
}

impl<T: LiveRow> ResultHandle<T> {
    pub fn spec(&self) -> &QuerySpec {
        &self.state.spec
    }

    /// Number of visible rows.
    pub async fn count(&self) -> DbResult<usize> {
        let count: i64 = query::select_count(&self.state.spec)
            .build_query_scalar()
            .fetch_one(&self.state.pool)
            .await?;
        Ok(count as usize)
    }

    /// The row at `index`, or `None` if the view is shorter.
    pub async fn at(&self, index: usize) -> DbResult<Option<T>> {
        let row = query::select_at(&self.state.spec, index)
            .build_query_as::<T>()
            .fetch_optional(&self.state.pool)
            .await?;
        Ok(row)
    }

    /// Every visible row in view order.
    pub async fn rows(&self) -> DbResult<Vec<T>> {
        self.state.fetch_rows().await
    }

    /// Called once per commit that changes the visible rows.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ViewChange) + Send + Sync + 'static,
    {
        self.state.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.subscribers.unsubscribe(id)
    }
}

struct LiveState<T> {
    spec: QuerySpec,
    pool: SqlitePool,
    digest: AtomicU64,
    subscribers: SubscriptionManager<ViewChange>,
    rows: PhantomData<fn() -> T>,
}

impl<T: LiveRow> LiveState<T> {
    async fn fetch_rows(&self) -> DbResult<Vec<T>> {
        let rows = query::select_rows(&self.spec)
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Digest and length of the current view.
    async fn evaluate(&self) -> DbResult<(u64, usize)> {
        let rows = self.fetch_rows().await?;
        let mut hasher = DefaultHasher::new();
        rows.hash(&mut hasher);
        Ok((hasher.finish(), rows.len()))
    }
}

impl<T: LiveRow> LiveView for LiveState<T> {
    fn scope(&self) -> &Scope {
        &self.spec.scope
    }

    fn refresh(&self, revision: u64) -> BoxFuture<'_, DbResult<Option<ViewChange>>> {
        Box::pin(async move {
            let (digest, count) = self.evaluate().await?;
            if self.digest.swap(digest, Ordering::SeqCst) == digest {
                return Ok(None);
            }
            Ok(Some(ViewChange { revision, count }))
        })
    }

    fn announce(&self, change: &ViewChange) {
        self.subscribers.notify_all(change);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use std::sync::Mutex;
    use todoey_core::SortField;

    async fn engine() -> LiveQueryEngine {
        let store = EntityStore::open(DbConfig::in_memory()).await.unwrap();
        LiveQueryEngine::new(store)
    }

    fn record<T: LiveRow>(handle: &ResultHandle<T>) -> Arc<Mutex<Vec<ViewChange>>> {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = changes.clone();
        handle.subscribe(move |c| changes_clone.lock().unwrap().push(*c));
        changes
    }

    async fn titles(handle: &ResultHandle<Item>) -> Vec<String> {
        handle
            .rows()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect()
    }

    #[tokio::test]
    async fn test_one_notification_per_relevant_commit() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);

        store.create_item(&home, "Milk").await.unwrap();
        store.create_item(&home, "Eggs").await.unwrap();

        let changes = changes.lock().unwrap().clone();
        assert_eq!(
            changes,
            vec![
                ViewChange { revision: 2, count: 1 },
                ViewChange { revision: 3, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_commits_queued_behind_a_delivery_each_notify() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);

        // Another task is mid-delivery; both commits wait in the queue
        let delivering = store.notifier().hold_delivery().unwrap();
        store.create_item(&home, "Milk").await.unwrap();
        store.create_item(&home, "Eggs").await.unwrap();
        assert!(changes.lock().unwrap().is_empty());

        drop(delivering);
        store.notifier().flush();

        assert_eq!(
            changes.lock().unwrap().clone(),
            vec![
                ViewChange { revision: 2, count: 1 },
                ViewChange { revision: 3, count: 2 },
            ]
        );
    }

    #[tokio::test]
    async fn test_writes_from_a_callback_each_notify() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

        let writer = store.clone();
        let owner = home.clone();
        store.subscribe(move |e| {
            if e.revision == 2 {
                let writer = writer.clone();
                let owner = owner.clone();
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    writer.create_item(&owner, "Eggs").await.unwrap();
                    writer.create_item(&owner, "Bread").await.unwrap();
                    let _ = done_tx.send(());
                });
            }
        });

        store.create_item(&home, "Milk").await.unwrap();
        done_rx.recv().await.unwrap();

        let revisions: Vec<_> = changes
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.revision, c.count))
            .collect();
        assert_eq!(revisions, vec![(2, 1), (3, 2), (4, 3)]);
    }

    #[tokio::test]
    async fn test_batch_commit_notifies_once() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);

        let mut txn = store.begin_write().await.unwrap();
        for title in ["a", "b", "c"] {
            txn.create_item(&home, title).await.unwrap();
        }
        store.commit(txn).await.unwrap();

        assert_eq!(changes.lock().unwrap().len(), 1);
        assert_eq!(handle.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_unrelated_category_is_silent() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let work = store.create_category("Work", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);

        store.create_item(&work, "Report").await.unwrap();
        store.rename_category(&work, "Office").await.unwrap();

        assert!(changes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_change_outside_filter_is_silent() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let spec = QuerySpec::item_search(home.clone(), "eggo");
        let handle: ResultHandle<Item> = engine.observe(spec).await.unwrap();
        let changes = record(&handle);

        store.create_item(&home, "find mike").await.unwrap();
        assert!(changes.lock().unwrap().is_empty());

        store.create_item(&home, "Buy Eggos").await.unwrap();
        assert_eq!(changes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_matches_case_and_diacritic_insensitively() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        for title in ["Buy Eggos", "find mike", "EGGO run", "Café"] {
            store.create_item(&home, title).await.unwrap();
        }

        let eggo: ResultHandle<Item> = engine
            .observe(QuerySpec::item_search(home.clone(), "eggo"))
            .await
            .unwrap();
        assert_eq!(titles(&eggo).await, vec!["Buy Eggos", "EGGO run"]);

        let cafe: ResultHandle<Item> = engine
            .observe(QuerySpec::item_search(home.clone(), "cafe"))
            .await
            .unwrap();
        assert_eq!(titles(&cafe).await, vec!["Café"]);

        let trimmed: ResultHandle<Item> = engine
            .observe_items(&home, Some(Filter::TitleContains("  MIKE ".to_string())), None)
            .await
            .unwrap();
        assert_eq!(titles(&trimmed).await, vec!["find mike"]);
    }

    #[tokio::test]
    async fn test_sort_matches_reference_ordering() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        for (title, done) in [("Pear", true), ("Apple", false), ("Pear", false), ("Fig", true)] {
            let id = store.create_item(&home, title).await.unwrap();
            store.set_done(&id, done).await.unwrap();
        }
        let all = store.items_of(&home).await.unwrap();

        for sort in [
            SortSpec::ascending(SortField::Title),
            SortSpec::descending(SortField::Title),
            SortSpec::ascending(SortField::Done),
            SortSpec::descending(SortField::Done),
            SortSpec::ascending(SortField::DateCreated),
        ] {
            let spec = QuerySpec::items_of(home.clone()).sorted_by(sort);
            let handle: ResultHandle<Item> = engine.observe(spec.clone()).await.unwrap();
            let expected: Vec<_> = spec.apply_to_items(&all).into_iter().map(|i| i.id).collect();
            let actual: Vec<_> = handle.rows().await.unwrap().into_iter().map(|i| i.id).collect();
            assert_eq!(actual, expected, "sort {:?}", sort);
        }
    }

    #[tokio::test]
    async fn test_list_preset_sorts_by_title() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        for title in ["Zebra", "Apple", "Mango"] {
            store.create_item(&home, title).await.unwrap();
        }

        let handle: ResultHandle<Item> = engine.observe(QuerySpec::item_list(home)).await.unwrap();
        assert_eq!(titles(&handle).await, vec!["Apple", "Mango", "Zebra"]);
        assert_eq!(handle.at(0).await.unwrap().unwrap().title, "Apple");
        assert!(handle.at(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_categories_view() {
        let engine = engine().await;
        let store = engine.store().clone();
        let handle = engine
            .observe_categories(None, Some(SortSpec::ascending(SortField::Name)))
            .await
            .unwrap();
        let changes = record(&handle);

        store.create_category("Work", "").await.unwrap();
        store.create_category("Home", "").await.unwrap();

        let names: Vec<_> = handle.rows().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Home", "Work"]);
        assert_eq!(changes.lock().unwrap().len(), 2);

        let filtered = engine
            .observe_categories(Some(Filter::NameContains("WOR".to_string())), None)
            .await
            .unwrap();
        assert_eq!(filtered.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_scope_counts_zero() {
        let engine = engine().await;
        let home = engine.store().create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();

        assert_eq!(handle.count().await.unwrap(), 0);
        assert!(handle.at(0).await.unwrap().is_none());
        assert!(handle.rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_observe_missing_owner() {
        let engine = engine().await;
        let err = engine
            .observe_items(&CategoryId::new(), None, None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::OwnerNotFound { .. }));
    }

    #[tokio::test]
    async fn test_deleted_owner_empties_view() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        store.create_item(&home, "Milk").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let changes = record(&handle);

        store.delete_category(&home).await.unwrap();

        assert_eq!(handle.count().await.unwrap(), 0);
        assert_eq!(
            changes.lock().unwrap().clone(),
            vec![ViewChange { revision: 3, count: 0 }]
        );
    }

    #[tokio::test]
    async fn test_malformed_specs_are_rejected() {
        let engine = engine().await;
        let home = engine.store().create_category("Home", "").await.unwrap();

        let err = engine
            .observe_items(&home, None, Some(SortSpec::ascending(SortField::Name)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::InvalidQuery(_)));

        let err = engine
            .observe_categories(Some(Filter::Done(true)), None)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::InvalidQuery(_)));

        let err = engine
            .observe::<Category>(QuerySpec::items_of(home.clone()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::InvalidQuery(_)));

        let err = engine
            .observe::<Item>(QuerySpec::item_search(home, &"x".repeat(101)))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_dropped_handle_is_unregistered() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();

        let handle = engine.observe_items(&home, None, None).await.unwrap();
        let clone = handle.clone();
        assert_eq!(store.notifier().live_view_count(), 1);

        drop(handle);
        assert_eq!(store.notifier().live_view_count(), 1);
        drop(clone);
        assert_eq!(store.notifier().live_view_count(), 0);

        store.create_item(&home, "Milk").await.unwrap();
    }

    #[tokio::test]
    async fn test_unsubscribe_inside_callback() {
        let engine = engine().await;
        let store = engine.store().clone();
        let home = store.create_category("Home", "").await.unwrap();
        let handle = engine.observe_items(&home, None, None).await.unwrap();

        let calls = Arc::new(Mutex::new(0));
        let id_slot = Arc::new(Mutex::new(None));
        let id = {
            let calls = calls.clone();
            let id_slot = id_slot.clone();
            let handle_clone = handle.clone();
            handle.subscribe(move |_| {
                *calls.lock().unwrap() += 1;
                if let Some(id) = id_slot.lock().unwrap().take() {
                    handle_clone.unsubscribe(id);
                }
            })
        };
        *id_slot.lock().unwrap() = Some(id);

        store.create_item(&home, "Milk").await.unwrap();
        store.create_item(&home, "Eggs").await.unwrap();

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
