//! Deferred change notification.
//!
//! Subsystems push [`GameEvent`]s into an [`EventQueue`] while they mutate
//! state. Nothing is delivered at that point. Once the mutation is complete
//! the owner calls [`EventBus::dispatch`], which drains the queue and runs
//! handlers in subscription order.
//!
//! Handlers only ever see `&GameEvent`. They cannot reach into the collection
//! that produced the event, so mutate-while-iterating is ruled out by
//! construction rather than by convention.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::ItemId;

/// Everything observers can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Account balance changed.
    MoneyChanged {
        /// Balance before the change.
        old: i64,
        /// Balance after the change.
        new: i64,
    },
    /// Something in the player's possession was added, removed or spent.
    PlayerItemOperation,
    /// A crafting formula produced an item.
    ItemCrafted {
        /// Formula identifier.
        formula: String,
        /// The generated item.
        item: ItemId,
    },
    /// A formula was unlocked for the first time.
    FormulaUnlocked {
        /// Formula identifier.
        id: String,
    },
    /// An item was destroyed.
    ItemDestroyed {
        /// The destroyed item.
        item: ItemId,
    },
    /// The contents of an inventory changed.
    InventoryChanged {
        /// Item owning the inventory.
        holder: ItemId,
    },
    /// A slot was plugged or emptied.
    SlotChanged {
        /// Item owning the slot.
        owner: ItemId,
        /// Slot key.
        slot: String,
    },
    /// An item's durability reached zero.
    ItemBroken {
        /// The broken item.
        item: ItemId,
    },
    /// A construction site finished building.
    ConstructionCompleted {
        /// Site identifier.
        site: String,
    },
}

/// Pending events, in the order they were raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQueue {
    pending: Vec<GameEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event.
    pub fn push(&mut self, event: GameEvent) {
        self.pending.push(event);
    }

    /// Take every pending event, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.pending.iter()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GameEvent)>;

/// Subscriber registry.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(SubscriptionId, Handler)>,
    next_id: u64,
}

impl EventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in subscription order.
    pub fn subscribe(&mut self, handler: impl FnMut(&GameEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != self.handlers.len()
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }

    /// Deliver every queued event to every handler.
    ///
    /// Returns the number of events delivered.
    pub fn dispatch(&mut self, queue: &mut EventQueue) -> usize {
        let events = queue.drain();
        for event in &events {
            for (_, handler) in &mut self.handlers {
                handler(event);
            }
        }
        events.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
