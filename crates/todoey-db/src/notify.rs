//! # Change Notifier
//!
//! Carries committed [`ChangeEvent`]s to live result handles and to raw
//! subscribers, in revision order.
//!
//! ## Delivery Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  commit r (writer lock held)                                           │
//! │     └── stage(event r)                                                  │
//! │           ├── live views touched by r: re-run query, compare digest    │
//! │           └── queue: [r + its ViewChanges]                              │
//! │  writer lock released                                                   │
//! │     └── flush()                                                         │
//! │           ├── delivering flag free?  no ──► return (the task holding   │
//! │           │                                 it will deliver r)          │
//! │           │                          yes                                │
//! │           ▼                                                             │
//! │         pop r ──► staged ViewChanges to handle subscribers             │
//! │               ──► raw subscribers: callback(&r)                         │
//! │           │        (a write started from a callback stages r+1;        │
//! │           │         it is popped after r finishes)                      │
//! │           ▼                                                             │
//! │         queue empty ──► release flag ──► re-check queue                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Views are evaluated while the commit still holds the writer lock, so a
//! `ViewChange` always describes the store as of its own revision, however
//! long the event waits in the queue. Delivery itself only runs callbacks.
//!
//! Callbacks run with no notifier lock held, so they may subscribe,
//! unsubscribe or start new writes. Live views are held weakly; dropping
//! the last [`crate::live::ResultHandle`] clone unregisters it.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::live::ViewChange;
use todoey_core::{ChangeEvent, Scope};

/// Handle returned by `subscribe`, used to unsubscribe.
pub type SubscriptionId = u64;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

// =============================================================================
// Subscription Manager
// =============================================================================

/// A set of callbacks for one kind of event.
pub struct SubscriptionManager<E> {
    subscriptions: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
    next_id: AtomicU64,
}

impl<E> Default for SubscriptionManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SubscriptionManager<E> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        SubscriptionManager {
            subscriptions: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a callback. Returns its ID.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns true if it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.lock();
        let before = subscriptions.len();
        subscriptions.retain(|(sub_id, _)| *sub_id != id);
        subscriptions.len() != before
    }

    /// Invokes every callback registered right now, in registration order.
    pub fn notify_all(&self, event: &E) {
        // Snapshot so callbacks can (un)subscribe without deadlocking
        let callbacks: Vec<Callback<E>> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Callback<E>)>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Live Views
// =============================================================================

/// A query result that re-evaluates itself when its scope changes.
pub(crate) trait LiveView: Send + Sync {
    fn scope(&self) -> &Scope;

    /// Re-evaluates against the store as of the commit at `revision`.
    /// Returns the change to announce if the visible rows differ from the
    /// last evaluation.
    fn refresh(&self, revision: u64) -> BoxFuture<'_, DbResult<Option<ViewChange>>>;

    /// Hands a staged change to the view's subscribers.
    fn announce(&self, change: &ViewChange);
}

// =============================================================================
// Change Notifier
// =============================================================================

/// One committed event with the view changes computed for it.
struct Delivery {
    event: ChangeEvent,
    views: Vec<(Weak<dyn LiveView>, ViewChange)>,
}

/// Ordered, re-entrant delivery of change events.
pub struct ChangeNotifier {
    queue: Mutex<VecDeque<Delivery>>,
    delivering: AtomicBool,
    subscribers: SubscriptionManager<ChangeEvent>,
    views: Mutex<Vec<Weak<dyn LiveView>>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        ChangeNotifier {
            queue: Mutex::new(VecDeque::new()),
            delivering: AtomicBool::new(false),
            subscribers: SubscriptionManager::new(),
            views: Mutex::new(Vec::new()),
        }
    }

    /// Registers a raw subscriber; it sees every event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of live views still alive.
    pub fn live_view_count(&self) -> usize {
        self.live_views().len()
    }

    pub(crate) fn register(&self, view: Weak<dyn LiveView>) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view);
    }

    /// Refreshes the views `event` touches and queues the event with their
    /// changes.
    ///
    /// Must run under the store's writer lock, right after the commit, so
    /// each view is evaluated against exactly that revision. If this future
    /// is dropped part way, the event is still queued with the view changes
    /// found so far; the skipped views catch up at the next commit.
    pub(crate) async fn stage(&self, event: ChangeEvent) {
        let revision = event.revision;
        let touched: Vec<Arc<dyn LiveView>> = self
            .live_views()
            .into_iter()
            .filter(|view| event.touches(view.scope()))
            .collect();

        let mut staged = Staged {
            queue: &self.queue,
            delivery: Some(Delivery {
                event,
                views: Vec::with_capacity(touched.len()),
            }),
        };

        for view in touched {
            match view.refresh(revision).await {
                Ok(Some(change)) => staged.add(Arc::downgrade(&view), change),
                Ok(None) => {}
                Err(e) => warn!(revision, error = %e, "Live view refresh failed"),
            }
        }
    }

    /// Runs the callbacks for queued events, unless another task already is.
    ///
    /// Nothing here awaits, so delivery can't be cut short by cancellation.
    pub fn flush(&self) {
        loop {
            let Some(guard) = DeliveryGuard::acquire(&self.delivering) else {
                return;
            };

            while let Some(delivery) = self.pop() {
                self.deliver(&delivery);
            }

            drop(guard);

            // An event queued between the last pop and the release would
            // otherwise sit until the next commit
            if self.is_queue_empty() {
                return;
            }
        }
    }

    fn pop(&self) -> Option<Delivery> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn is_queue_empty(&self) -> bool {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn deliver(&self, delivery: &Delivery) {
        let mut announced = 0usize;
        for (view, change) in &delivery.views {
            if let Some(view) = view.upgrade() {
                view.announce(change);
                announced += 1;
            }
        }

        self.subscribers.notify_all(&delivery.event);

        debug!(
            revision = delivery.event.revision,
            changes = delivery.event.changes.len(),
            announced,
            "Delivered change event"
        );
    }

    /// Upgrades every registered view, dropping the dead ones.
    fn live_views(&self) -> Vec<Arc<dyn LiveView>> {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let mut alive = Vec::with_capacity(views.len());
        views.retain(|weak| match weak.upgrade() {
            Some(view) => {
                alive.push(view);
                true
            }
            None => false,
        });
        alive
    }

    /// Takes the delivering flag, as a flush in progress on another task would.
    #[cfg(test)]
    pub(crate) fn hold_delivery(&self) -> Option<DeliveryGuard<'_>> {
        DeliveryGuard::acquire(&self.delivering)
    }
}

/// A delivery being built; queued when dropped.
struct Staged<'a> {
    queue: &'a Mutex<VecDeque<Delivery>>,
    delivery: Option<Delivery>,
}

impl Staged<'_> {
    fn add(&mut self, view: Weak<dyn LiveView>, change: ViewChange) {
        if let Some(delivery) = self.delivery.as_mut() {
            delivery.views.push((view, change));
        }
    }
}

impl Drop for Staged<'_> {
    fn drop(&mut self) {
        if let Some(delivery) = self.delivery.take() {
            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(delivery);
        }
    }
}

/// Holds the delivering flag; releases it on drop.
pub(crate) struct DeliveryGuard<'a>(&'a AtomicBool);

impl<'a> DeliveryGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DeliveryGuard(flag))
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
