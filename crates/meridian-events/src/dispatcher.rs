//! # Event Dispatcher
//!
//! In-process publish/subscribe for domain events.
//!
//! ## Fan-Out Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dispatcher.publish(DomainEvent::SaleCompleted(..))                     │
//! │       │  returns immediately with a FanOut                              │
//! │       │                                                                 │
//! │       ├── tokio::spawn ─► InventoryCompletionHandler   ─► Delivered     │
//! │       ├── tokio::spawn ─► RecommendationPatternHandler ─► Failed(..)    │
//! │       └── tokio::spawn ─► (any other subscriber)       ─► Panicked      │
//! │                                                                         │
//! │  • one task per subscriber, no ordering between them                    │
//! │  • an error or panic stays inside its task and is logged                │
//! │  • nothing is stored: no subscribers means the event is dropped         │
//! │  • FanOut::wait() joins the tasks; dropping FanOut detaches them        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subscriptions are typed: an `EventHandler<SaleCompletedEvent>` can only
//! be registered under [`EventKind::SaleCompleted`], so a handler never sees
//! a payload of the wrong shape.

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use meridian_core::SaleCompletedEvent;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::HandlerResult;

// =============================================================================
// Events
// =============================================================================

/// Discriminant of [`DomainEvent`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SaleCompleted,
}

impl EventKind {
    /// Stable topic name, as seen by external consumers and in logs.
    pub fn topic(&self) -> &'static str {
        match self {
            EventKind::SaleCompleted => "sale_completed",
        }
    }
}

/// Every event the dispatcher can carry. Payloads are shared, not copied,
/// between subscribers.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    SaleCompleted(Arc<SaleCompletedEvent>),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::SaleCompleted(_) => EventKind::SaleCompleted,
        }
    }
}

impl From<SaleCompletedEvent> for DomainEvent {
    fn from(event: SaleCompletedEvent) -> Self {
        DomainEvent::SaleCompleted(Arc::new(event))
    }
}

/// A payload type that maps to exactly one [`DomainEvent`] variant.
pub trait Event: Send + Sync + 'static {
    const KIND: EventKind;

    /// The payload if `event` is this type's variant.
    fn extract(event: &DomainEvent) -> Option<Arc<Self>>;
}

impl Event for SaleCompletedEvent {
    const KIND: EventKind = EventKind::SaleCompleted;

    fn extract(event: &DomainEvent) -> Option<Arc<Self>> {
        match event {
            DomainEvent::SaleCompleted(payload) => Some(Arc::clone(payload)),
        }
    }
}

/// A subscriber for events of type `E`.
///
/// Returns a boxed future so handlers can be stored as trait objects.
pub trait EventHandler<E: Event>: Send + Sync {
    /// Short name used in logs and delivery reports.
    fn name(&self) -> &str;

    fn handle(&self, event: Arc<E>) -> BoxFuture<'_, HandlerResult>;
}

// =============================================================================
// Delivery Reports
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
    Panicked,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub handler: String,
    pub outcome: DeliveryOutcome,
}

/// Handle on the tasks spawned by one `publish` call.
#[derive(Debug)]
pub struct FanOut {
    topic: &'static str,
    tasks: Vec<(String, JoinHandle<DeliveryOutcome>)>,
}

impl FanOut {
    fn empty(topic: &'static str) -> Self {
        FanOut {
            topic,
            tasks: Vec::new(),
        }
    }

    pub fn topic(&self) -> &'static str {
        self.topic
    }

    /// Number of subscribers the event was handed to.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every handler task and reports how each one ended,
    /// in subscription order.
    pub async fn wait(self) -> Vec<DeliveryReport> {
        let (names, handles): (Vec<String>, Vec<_>) = self.tasks.into_iter().unzip();
        let results = join_all(handles).await;

        names
            .into_iter()
            .zip(results)
            .map(|(handler, joined)| DeliveryReport {
                handler,
                outcome: match joined {
                    Ok(outcome) => outcome,
                    Err(join_err) if join_err.is_panic() => DeliveryOutcome::Panicked,
                    Err(join_err) => DeliveryOutcome::Failed(join_err.to_string()),
                },
            })
            .collect()
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Type-erased subscriber, so handlers for different payloads share a map.
trait ErasedHandler: Send + Sync {
    fn name(&self) -> &str;
    fn dispatch<'a>(&'a self, event: &DomainEvent) -> Option<BoxFuture<'a, HandlerResult>>;
}

struct Typed<E: Event> {
    handler: Arc<dyn EventHandler<E>>,
}

impl<E: Event> ErasedHandler for Typed<E> {
    fn name(&self) -> &str {
        self.handler.name()
    }

    fn dispatch<'a>(&'a self, event: &DomainEvent) -> Option<BoxFuture<'a, HandlerResult>> {
        E::extract(event).map(|payload| self.handler.handle(payload))
    }
}

struct Subscriber {
    id: SubscriptionId,
    handler: Arc<dyn ErasedHandler>,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
}

impl Registry {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<EventKind, Vec<Subscriber>>> {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<EventKind, Vec<Subscriber>>> {
        self.subscribers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Event dispatcher. Clones share one subscriber registry.
///
/// ## Example
/// ```rust,ignore
/// let dispatcher = Dispatcher::new();
/// dispatcher.subscribe::<SaleCompletedEvent>(Arc::new(InventoryCompletionHandler::new(db)));
///
/// // Fire and forget:
/// dispatcher.publish(event);
///
/// // Or observe every handler's outcome:
/// let reports = dispatcher.publish(event).wait().await;
/// ```
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.read();
        let counts: HashMap<&'static str, usize> = registry
            .iter()
            .map(|(kind, subs)| (kind.topic(), subs.len()))
            .collect();
        f.debug_struct("Dispatcher").field("subscribers", &counts).finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events of type `E`.
    pub fn subscribe<E: Event>(&self, handler: Arc<dyn EventHandler<E>>) -> SubscriptionId {
        let id = SubscriptionId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let name = handler.name().to_string();

        self.registry
            .write()
            .entry(E::KIND)
            .or_default()
            .push(Subscriber {
                id,
                handler: Arc::new(Typed { handler }),
            });

        info!(handler = %name, topic = E::KIND.topic(), subscription = id.0, "Handler subscribed");
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    /// Deliveries already spawned still run to completion.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.write();
        let mut removed = false;
        for subscribers in registry.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|s| s.id != id);
            removed |= subscribers.len() != before;
        }

        if removed {
            info!(subscription = id.0, "Handler unsubscribed");
        }
        removed
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.registry.read().get(&kind).map_or(0, Vec::len)
    }

    /// Hands `event` to every current subscriber of its kind, each on its
    /// own task, and returns without waiting.
    ///
    /// Called outside a tokio runtime, the event is dropped with a warning.
    pub fn publish(&self, event: impl Into<DomainEvent>) -> FanOut {
        let event = event.into();
        let topic = event.kind().topic();

        let targets: Vec<Arc<dyn ErasedHandler>> = self
            .registry
            .read()
            .get(&event.kind())
            .map(|subs| subs.iter().map(|s| Arc::clone(&s.handler)).collect())
            .unwrap_or_default();

        if targets.is_empty() {
            debug!(topic, "No subscribers, event dropped");
            return FanOut::empty(topic);
        }

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(topic, subscribers = targets.len(), "No async runtime, event dropped");
                return FanOut::empty(topic);
            }
        };

        let tasks = targets
            .into_iter()
            .map(|handler| {
                let name = handler.name().to_string();
                let join = runtime.spawn(deliver(handler, event.clone()));
                (name, join)
            })
            .collect::<Vec<_>>();

        debug!(topic, subscribers = tasks.len(), "Event published");
        FanOut { topic, tasks }
    }
}

async fn deliver(handler: Arc<dyn ErasedHandler>, event: DomainEvent) -> DeliveryOutcome {
    let topic = event.kind().topic();
    let Some(future) = handler.dispatch(&event) else {
        return DeliveryOutcome::Delivered;
    };

    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(())) => {
            debug!(handler = handler.name(), topic, "Event handled");
            DeliveryOutcome::Delivered
        }
        Ok(Err(err)) => {
            warn!(handler = handler.name(), topic, error = %err, "Event handler failed");
            DeliveryOutcome::Failed(err.to_string())
        }
        Err(_) => {
            error!(handler = handler.name(), topic, "Event handler panicked");
            DeliveryOutcome::Panicked
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
