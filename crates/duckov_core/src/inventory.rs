//! Item containers.
//!
//! An [`Inventory`] is an ordered, capacity-bounded list of entries, each
//! entry being one item (possibly a stack). The inventory caches the summed
//! weight of its contents; [`ItemWorld`] keeps that cache in step with every
//! mutation, up to the root of the tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ItemTypeId;
use crate::events::{EventQueue, GameEvent};
use crate::item::{ItemId, ItemParent, ItemWorld};
use crate::math::{fixed_serde, Fixed};

/// Ordered container owned by an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    capacity: usize,
    contents: Vec<ItemId>,
    #[serde(with = "fixed_serde")]
    pub(crate) cached_weight: Fixed,
}

impl Inventory {
    /// Create an empty inventory with room for `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            contents: Vec::new(),
            cached_weight: Fixed::ZERO,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries in order.
    #[must_use]
    pub fn contents(&self) -> &[ItemId] {
        &self.contents
    }

    /// Whether an item is a direct entry.
    #[must_use]
    pub fn contains(&self, item: ItemId) -> bool {
        self.contents.contains(&item)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contents.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Whether no further entry fits.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.contents.len() >= self.capacity
    }

    /// Summed weight of the contents as of the last recalculation.
    #[must_use]
    pub fn cached_weight(&self) -> Fixed {
        self.cached_weight
    }

    pub(crate) fn remove(&mut self, item: ItemId) -> bool {
        match self.contents.iter().position(|entry| *entry == item) {
            Some(index) => {
                self.contents.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Why an inventory operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// The holder does not exist.
    #[error("Inventory holder not found: {0}")]
    HolderNotFound(ItemId),
    /// The holder has no inventory.
    #[error("{0} has no inventory")]
    NoInventory(ItemId),
    /// The item to add does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// Capacity is exhausted; the item stays where it was.
    #[error("Inventory full, {leftover} was not placed")]
    Full {
        /// The item that did not fit.
        leftover: ItemId,
    },
    /// The item is the holder or one of its ancestors.
    #[error("Adding would create a cycle")]
    WouldCreateCycle,
}

/// Result of [`ItemWorld::add_and_merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Existing stacks that were topped up.
    pub absorbed_into: Vec<ItemId>,
    /// New entries created in the inventory.
    pub placed: Vec<ItemId>,
    /// Units that did not fit. The item keeps its previous parent, so a
    /// root stays a root and a carried item stays where it was carried.
    pub leftover: Option<ItemId>,
}

impl MergeOutcome {
    /// Whether every unit ended up in the inventory.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.leftover.is_none()
    }
}

impl ItemWorld {
    /// The holder's inventory.
    ///
    /// # Errors
    ///
    /// Fails if the holder is unknown or carries no inventory.
    pub fn inventory_of(&self, holder: ItemId) -> Result<&Inventory, InventoryError> {
        self.get(holder)
            .ok_or(InventoryError::HolderNotFound(holder))?
            .inventory()
            .ok_or(InventoryError::NoInventory(holder))
    }

    fn check_insert(&self, holder: ItemId, item: ItemId) -> Result<&Inventory, InventoryError> {
        let inventory = self.inventory_of(holder)?;
        if !self.contains(item) {
            return Err(InventoryError::ItemNotFound(item));
        }
        if self.is_ancestor_or_self(item, holder) {
            return Err(InventoryError::WouldCreateCycle);
        }
        Ok(inventory)
    }

    fn push_entry(&mut self, holder: ItemId, item: ItemId, events: &mut EventQueue) {
        self.detach(item, events);
        if let Some(inventory) = self.get_mut(holder).and_then(|h| h.inventory.as_mut()) {
            inventory.contents.push(item);
        }
        if let Some(entry) = self.get_mut(item) {
            entry.parent = Some(ItemParent::Inventory { owner: holder });
        }
        self.refresh_weights(holder);
        events.push(GameEvent::InventoryChanged { holder });
    }

    /// Place `item` as a new entry, without merging.
    ///
    /// The item is detached from its previous parent. Adding an item that is
    /// already a direct entry is a no-op.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Full`] when capacity is exhausted; nothing moves.
    pub fn add_item(
        &mut self,
        holder: ItemId,
        item: ItemId,
        events: &mut EventQueue,
    ) -> Result<(), InventoryError> {
        let inventory = self.check_insert(holder, item)?;
        if inventory.contains(item) {
            return Ok(());
        }
        if inventory.is_full() {
            return Err(InventoryError::Full { leftover: item });
        }
        self.push_entry(holder, item, events);
        Ok(())
    }

    /// Add `item`, topping up existing stacks of the same type first.
    ///
    /// Existing entries are filled in order, never above the max stack. If
    /// that absorbs every unit the source item is destroyed. Otherwise the
    /// rest becomes a new entry. An item instance never holds more than its
    /// max stack, so the rest always fits in a single entry. When there is no
    /// room for it, it is reported as `leftover` and keeps its previous
    /// parent; callers decide where it goes next.
    ///
    /// # Errors
    ///
    /// Fails without changes if the holder or item is unknown, the holder has
    /// no inventory, or the item is an ancestor of the holder.
    pub fn add_and_merge(
        &mut self,
        holder: ItemId,
        item: ItemId,
        events: &mut EventQueue,
    ) -> Result<MergeOutcome, InventoryError> {
        let inventory = self.check_insert(holder, item)?;
        let mut outcome = MergeOutcome::default();
        if inventory.contains(item) {
            return Ok(outcome);
        }

        let Some(source) = self.get(item) else {
            return Err(InventoryError::ItemNotFound(item));
        };
        let type_id = source.type_id();
        let max_stack = source.max_stack_count();
        let mut remaining = source.stack_count();

        // Plan the top-ups before touching anything.
        let mut top_ups = Vec::new();
        if source.is_stackable() {
            for entry in inventory.contents() {
                if remaining == 0 {
                    break;
                }
                let Some(existing) = self.get(*entry) else {
                    continue;
                };
                if existing.type_id() != type_id || existing.stack_count() >= max_stack {
                    continue;
                }
                let moved = remaining.min(max_stack - existing.stack_count());
                top_ups.push((*entry, moved));
                remaining -= moved;
            }
        }
        let room = !inventory.is_full();

        for (entry, moved) in &top_ups {
            if let Some(existing) = self.get_mut(*entry) {
                existing.stack_count += moved;
            }
            outcome.absorbed_into.push(*entry);
        }
        if !top_ups.is_empty() {
            self.refresh_weights(holder);
            events.push(GameEvent::InventoryChanged { holder });
        }

        if remaining == 0 {
            self.destroy_tree(item, events);
        } else {
            if let Some(source) = self.get_mut(item) {
                source.stack_count = remaining;
            }
            if room {
                self.push_entry(holder, item, events);
                outcome.placed.push(item);
            } else {
                // The rest stays wherever it was.
                if !top_ups.is_empty() {
                    self.refresh_weights(item);
                    if let Some(ItemParent::Inventory { owner }) = self.parent_of(item).cloned() {
                        events.push(GameEvent::InventoryChanged { holder: owner });
                    }
                }
                outcome.leftover = Some(item);
                tracing::debug!(holder = %holder, item = %item, units = remaining, "Inventory full");
            }
        }

        Ok(outcome)
    }

    /// Take a direct entry out of the holder's inventory, making it a root.
    pub fn remove_from_inventory(
        &mut self,
        holder: ItemId,
        item: ItemId,
        events: &mut EventQueue,
    ) -> bool {
        match self.parent_of(item) {
            Some(ItemParent::Inventory { owner }) if *owner == holder => self.detach(item, events),
            _ => false,
        }
    }

    /// Units of a type in the holder's inventory, including nested
    /// inventories of carried items. Plugged items are not counted.
    #[must_use]
    pub fn item_count(&self, holder: ItemId, type_id: ItemTypeId) -> u32 {
        let Some(inventory) = self.get(holder).and_then(|h| h.inventory()) else {
            return 0;
        };
        inventory.contents().iter().fold(0u32, |total, entry| {
            let own = self
                .get(*entry)
                .filter(|item| item.type_id() == type_id)
                .map_or(0, |item| item.stack_count());
            total
                .saturating_add(own)
                .saturating_add(self.item_count(*entry, type_id))
        })
    }

    /// First stack of a type, searching entries in order and descending into
    /// each entry's inventory before moving on.
    #[must_use]
    pub fn find_first(&self, holder: ItemId, type_id: ItemTypeId) -> Option<ItemId> {
        let inventory = self.get(holder)?.inventory()?;
        inventory.contents().iter().find_map(|entry| {
            self.get(*entry)
                .filter(|item| item.type_id() == type_id)
                .map(|item| item.id())
                .or_else(|| self.find_first(*entry, type_id))
        })
    }

    fn collect_stacks(&self, holder: ItemId, type_id: ItemTypeId, out: &mut Vec<ItemId>) {
        let Some(inventory) = self.get(holder).and_then(|h| h.inventory()) else {
            return;
        };
        for entry in inventory.contents() {
            if self.get(*entry).is_some_and(|item| item.type_id() == type_id) {
                out.push(*entry);
            }
            self.collect_stacks(*entry, type_id, out);
        }
    }

    /// Remove `amount` units of a type from the holder.
    ///
    /// Stacks are drained in [`Self::find_first`] order; emptied stacks are
    /// destroyed. If fewer than `amount` units are present nothing changes and
    /// `false` is returned.
    pub fn consume(
        &mut self,
        holder: ItemId,
        type_id: ItemTypeId,
        amount: u32,
        events: &mut EventQueue,
    ) -> bool {
        if amount == 0 {
            return true;
        }
        if self.item_count(holder, type_id) < amount {
            return false;
        }

        let mut stacks = Vec::new();
        self.collect_stacks(holder, type_id, &mut stacks);

        let mut remaining = amount;
        for stack in stacks {
            if remaining == 0 {
                break;
            }
            let Some(count) = self.get(stack).map(|item| item.stack_count()) else {
                continue;
            };
            if count <= remaining {
                remaining -= count;
                self.destroy_tree(stack, events);
            } else {
                self.set_stack_count(stack, count - remaining, events);
                remaining = 0;
            }
        }
        true
    }

    /// Reorder entries by type id, then by larger stacks first.
    ///
    /// Returns `false` if the holder has no inventory.
    pub fn sort_inventory(&mut self, holder: ItemId, events: &mut EventQueue) -> bool {
        let Ok(inventory) = self.inventory_of(holder) else {
            return false;
        };
        let mut keyed: Vec<(ItemTypeId, std::cmp::Reverse<u32>, ItemId)> = inventory
            .contents()
            .iter()
            .filter_map(|entry| self.get(*entry))
            .map(|item| (item.type_id(), std::cmp::Reverse(item.stack_count()), item.id()))
            .collect();
        keyed.sort_unstable();

        if let Some(inventory) = self.get_mut(holder).and_then(|h| h.inventory.as_mut()) {
            inventory.contents = keyed.into_iter().map(|(_, _, id)| id).collect();
        }
        events.push(GameEvent::InventoryChanged { holder });
        true
    }
}
