//! Item arena and ownership tree.
//!
//! Every item lives in an [`ItemWorld`] and is addressed by an [`ItemId`]
//! handle. Ownership is a tree: an item is either a root, plugged into exactly
//! one slot of another item, or contained in exactly one inventory. The
//! world enforces this on every move:
//!
//! - moving an item always detaches it from its previous parent first;
//! - an item can never be moved underneath itself.
//!
//! Slot operations live in [`crate::slot`], inventory operations in
//! [`crate::inventory`]. This module holds the arena itself plus lifecycle
//! (spawn, split, destroy), weight bookkeeping and durability.
//!
//! # Determinism
//!
//! Items are stored in a `BTreeMap` and ids are assigned sequentially, so
//! iteration order and id assignment depend only on the sequence of calls.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemCatalog, ItemDefinition, ItemTypeId, Tag};
use crate::error::{GameError, Result};
use crate::events::{EventQueue, GameEvent};
use crate::inventory::Inventory;
use crate::math::{fixed_serde, scale, Fixed};
use crate::slot::SlotCollection;
use crate::stat::{StatCollection, StatKey};

/// Handle of a live item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Where an item currently sits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemParent {
    /// Plugged into a slot.
    Slot {
        /// Item owning the slot.
        owner: ItemId,
        /// Slot key.
        slot: String,
    },
    /// Contained in an inventory.
    Inventory {
        /// Item owning the inventory.
        owner: ItemId,
    },
}

impl ItemParent {
    /// The item that owns the container.
    #[must_use]
    pub fn owner(&self) -> ItemId {
        match self {
            Self::Slot { owner, .. } | Self::Inventory { owner } => *owner,
        }
    }
}

/// A single item instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: ItemId,
    type_id: ItemTypeId,
    name: String,
    pub(crate) stack_count: u32,
    max_stack_count: u32,
    #[serde(with = "fixed_serde")]
    durability: Fixed,
    #[serde(with = "fixed_serde")]
    max_durability: Fixed,
    #[serde(with = "fixed_serde")]
    unit_weight: Fixed,
    tags: BTreeSet<Tag>,
    pub(crate) slots: SlotCollection,
    pub(crate) inventory: Option<Inventory>,
    stats: StatCollection,
    pub(crate) parent: Option<ItemParent>,
}

impl Item {
    fn from_definition(id: ItemId, definition: &ItemDefinition, count: u32) -> Self {
        let max_stack_count = definition.max_stack_count.max(1);
        let mut stats = StatCollection::new();
        for stat in &definition.stats {
            stats.insert(stat.key.clone(), stat.base);
        }
        Self {
            id,
            type_id: definition.type_id,
            name: definition.name.clone(),
            stack_count: count.clamp(1, max_stack_count),
            max_stack_count,
            durability: definition.max_durability,
            max_durability: definition.max_durability,
            unit_weight: definition.unit_weight,
            tags: definition.tags.iter().cloned().collect(),
            slots: SlotCollection::from_definitions(&definition.slots),
            inventory: definition.inventory_capacity.map(Inventory::new),
            stats,
            parent: None,
        }
    }

    /// A fresh instance of the same type: same static data, unmodified
    /// stats, empty containers, no parent.
    fn fresh_copy(&self, id: ItemId, count: u32) -> Self {
        Self {
            id,
            type_id: self.type_id,
            name: self.name.clone(),
            stack_count: count,
            max_stack_count: self.max_stack_count,
            durability: self.durability,
            max_durability: self.max_durability,
            unit_weight: self.unit_weight,
            tags: self.tags.clone(),
            slots: self.slots.empty_copy(),
            inventory: self
                .inventory
                .as_ref()
                .map(|inventory| Inventory::new(inventory.capacity())),
            stats: self.stats.without_modifiers(),
            parent: None,
        }
    }

    /// Item handle.
    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Type id.
    #[must_use]
    pub fn type_id(&self) -> ItemTypeId {
        self.type_id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units in this stack.
    #[must_use]
    pub fn stack_count(&self) -> u32 {
        self.stack_count
    }

    /// Maximum units per stack for this type.
    #[must_use]
    pub fn max_stack_count(&self) -> u32 {
        self.max_stack_count
    }

    /// Whether this type stacks.
    #[must_use]
    pub fn is_stackable(&self) -> bool {
        self.max_stack_count > 1
    }

    /// Current durability.
    #[must_use]
    pub fn durability(&self) -> Fixed {
        self.durability
    }

    /// Durability when fully repaired.
    #[must_use]
    pub fn max_durability(&self) -> Fixed {
        self.max_durability
    }

    /// Whether the item wears and has worn out.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.max_durability > Fixed::ZERO && self.durability <= Fixed::ZERO
    }

    /// Weight of a single unit.
    #[must_use]
    pub fn unit_weight(&self) -> Fixed {
        self.unit_weight
    }

    /// Weight of this stack, excluding anything plugged in or carried.
    #[must_use]
    pub fn self_weight(&self) -> Fixed {
        scale(self.unit_weight, self.stack_count)
    }

    /// Tags.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    /// Whether the item carries a tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.as_str() == tag)
    }

    /// Add a tag at runtime.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(Tag::new(tag))
    }

    /// Sockets.
    #[must_use]
    pub fn slots(&self) -> &SlotCollection {
        &self.slots
    }

    /// Inventory, if this type carries one.
    #[must_use]
    pub fn inventory(&self) -> Option<&Inventory> {
        self.inventory.as_ref()
    }

    /// Stat table.
    #[must_use]
    pub fn stats(&self) -> &StatCollection {
        &self.stats
    }

    /// Stat table, for adding and removing modifiers.
    pub fn stats_mut(&mut self) -> &mut StatCollection {
        &mut self.stats
    }

    /// Computed value of a stat.
    #[must_use]
    pub fn stat_value(&self, key: &str) -> Option<Fixed> {
        self.stats.get_value(&StatKey::from(key))
    }

    /// Current parent.
    #[must_use]
    pub fn parent(&self) -> Option<&ItemParent> {
        self.parent.as_ref()
    }

    /// Whether the item has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Arena owning every item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWorld {
    items: BTreeMap<ItemId, Item>,
    next_id: u64,
}

impl Default for ItemWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemWorld {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create a root item from a definition.
    ///
    /// `count` is clamped to `1..=max_stack_count`.
    pub fn spawn(&mut self, definition: &ItemDefinition, count: u32) -> ItemId {
        let id = self.allocate_id();
        let item = Item::from_definition(id, definition, count);
        tracing::trace!(item = %id, type_id = definition.type_id.0, count = item.stack_count, "Spawned item");
        self.items.insert(id, item);
        id
    }

    /// Create a root item by type id.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`] if the catalog has no such type.
    pub fn instantiate(
        &mut self,
        catalog: &ItemCatalog,
        type_id: ItemTypeId,
        count: u32,
    ) -> Result<ItemId> {
        let definition = catalog
            .get(type_id)
            .ok_or(GameError::UnknownItemType(type_id))?;
        Ok(self.spawn(definition, count))
    }

    /// Create `units` units of a type as max-sized stacks.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`] if the catalog has no such type.
    pub fn instantiate_units(
        &mut self,
        catalog: &ItemCatalog,
        type_id: ItemTypeId,
        units: u32,
    ) -> Result<Vec<ItemId>> {
        let definition = catalog
            .get(type_id)
            .ok_or(GameError::UnknownItemType(type_id))?;
        Ok(stack_sizes(units, definition.max_stack_count)
            .into_iter()
            .map(|count| self.spawn(definition, count))
            .collect())
    }

    /// Look up an item.
    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Look up an item mutably.
    ///
    /// Only data that does not affect ownership or weight is reachable this
    /// way (stats, tags); moves and stack changes go through the world.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// Whether an item is alive.
    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of live items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live items in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Parent of an item.
    #[must_use]
    pub fn parent_of(&self, id: ItemId) -> Option<&ItemParent> {
        self.items.get(&id).and_then(|item| item.parent.as_ref())
    }

    /// Topmost ancestor (the item itself if it is a root).
    #[must_use]
    pub fn root_of(&self, id: ItemId) -> ItemId {
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            current = parent.owner();
        }
        current
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent_of(cur).map(ItemParent::owner);
        }
        false
    }

    /// Every live item under `id` (excluding `id`), depth first in slot then
    /// inventory order.
    #[must_use]
    pub fn descendants(&self, id: ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: ItemId, out: &mut Vec<ItemId>) {
        for child in self.children(id) {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Direct children: plugged items in slot order, then inventory contents.
    #[must_use]
    pub fn children(&self, id: ItemId) -> Vec<ItemId> {
        let Some(item) = self.items.get(&id) else {
            return Vec::new();
        };
        let mut children: Vec<ItemId> = item.slots.contents().collect();
        if let Some(inventory) = &item.inventory {
            children.extend_from_slice(inventory.contents());
        }
        children
    }

    /// Remove an item from its slot or inventory, making it a root.
    ///
    /// Returns `false` if the item is unknown or already a root.
    pub fn detach(&mut self, id: ItemId, events: &mut EventQueue) -> bool {
        let Some(parent) = self.items.get_mut(&id).and_then(|item| item.parent.take()) else {
            return false;
        };

        match &parent {
            ItemParent::Slot { owner, slot } => {
                if let Some(entry) = self
                    .items
                    .get_mut(owner)
                    .and_then(|item| item.slots.get_mut(slot))
                {
                    entry.content = None;
                }
                events.push(GameEvent::SlotChanged {
                    owner: *owner,
                    slot: slot.clone(),
                });
            }
            ItemParent::Inventory { owner } => {
                if let Some(inventory) = self
                    .items
                    .get_mut(owner)
                    .and_then(|item| item.inventory.as_mut())
                {
                    inventory.remove(id);
                }
                events.push(GameEvent::InventoryChanged { holder: *owner });
            }
        }

        self.refresh_weights(parent.owner());
        true
    }

    /// Destroy an item and everything it owns.
    ///
    /// Plugged children go first (slot order, each recursively), then
    /// inventory contents, then the item itself. One `ItemDestroyed` event is
    /// raised per item in that order. Returns the destroyed ids in the same
    /// order; an unknown id destroys nothing.
    pub fn destroy_tree(&mut self, id: ItemId, events: &mut EventQueue) -> Vec<ItemId> {
        if !self.items.contains_key(&id) {
            return Vec::new();
        }
        self.detach(id, events);

        let mut destroyed = Vec::new();
        self.destroy_recursive(id, &mut destroyed, events);
        tracing::debug!(root = %id, count = destroyed.len(), "Destroyed item tree");
        destroyed
    }

    fn destroy_recursive(&mut self, id: ItemId, destroyed: &mut Vec<ItemId>, events: &mut EventQueue) {
        for child in self.children(id) {
            self.destroy_recursive(child, destroyed, events);
        }
        if self.items.remove(&id).is_some() {
            destroyed.push(id);
            events.push(GameEvent::ItemDestroyed { item: id });
        }
    }

    /// Take `count` units off a stack into a new root item.
    ///
    /// Requires `0 < count < stack_count`; anything else returns `None` and
    /// changes nothing.
    pub fn split(&mut self, id: ItemId, count: u32, events: &mut EventQueue) -> Option<ItemId> {
        let item = self.items.get(&id)?;
        if count == 0 || count >= item.stack_count {
            return None;
        }

        let mut copy = item.fresh_copy(id, count);
        let parent = item.parent.clone();
        let new_id = self.allocate_id();
        copy.id = new_id;
        self.items.insert(new_id, copy);
        if let Some(source) = self.items.get_mut(&id) {
            source.stack_count -= count;
        }

        self.refresh_weights(id);
        if let Some(ItemParent::Inventory { owner }) = parent {
            events.push(GameEvent::InventoryChanged { holder: owner });
        }
        Some(new_id)
    }

    /// Change a stack's count, clamped to the type's max stack.
    ///
    /// Returns `false` for unknown items or `count == 0` (destroy instead).
    pub fn set_stack_count(&mut self, id: ItemId, count: u32, events: &mut EventQueue) -> bool {
        if count == 0 {
            return false;
        }
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        item.stack_count = count.min(item.max_stack_count);
        let parent = item.parent.clone();

        self.refresh_weights(id);
        if let Some(ItemParent::Inventory { owner }) = parent {
            events.push(GameEvent::InventoryChanged { holder: owner });
        }
        true
    }

    /// Weight of an item including plugged children and carried items.
    ///
    /// Carried items are counted through the inventory's cached weight.
    #[must_use]
    pub fn total_weight(&self, id: ItemId) -> Fixed {
        let Some(item) = self.items.get(&id) else {
            return Fixed::ZERO;
        };
        let plugged = item
            .slots
            .contents()
            .fold(Fixed::ZERO, |acc, child| acc.saturating_add(self.total_weight(child)));
        let carried = item
            .inventory
            .as_ref()
            .map_or(Fixed::ZERO, Inventory::cached_weight);
        item.self_weight().saturating_add(plugged).saturating_add(carried)
    }

    /// Re-derive an inventory's cached weight from its contents.
    ///
    /// Returns the new weight, or `None` if the item has no inventory.
    pub fn recalculate_weight(&mut self, holder: ItemId) -> Option<Fixed> {
        let contents = self.items.get(&holder)?.inventory.as_ref()?.contents().to_vec();
        let weight = contents
            .iter()
            .fold(Fixed::ZERO, |acc, child| acc.saturating_add(self.total_weight(*child)));
        let inventory = self.items.get_mut(&holder)?.inventory.as_mut()?;
        inventory.cached_weight = weight;
        Some(weight)
    }

    /// Recalculate cached weights from `start` up to its root.
    pub(crate) fn refresh_weights(&mut self, start: ItemId) {
        let mut current = Some(start);
        while let Some(id) = current {
            self.recalculate_weight(id);
            current = self.parent_of(id).map(ItemParent::owner);
        }
    }

    /// Wear an item down.
    ///
    /// Durability is clamped at zero. Returns `Some(true)` if this call broke
    /// the item, `Some(false)` otherwise, `None` for unknown items.
    pub fn use_durability(&mut self, id: ItemId, amount: Fixed, events: &mut EventQueue) -> Option<bool> {
        let item = self.items.get_mut(&id)?;
        if item.max_durability <= Fixed::ZERO || amount <= Fixed::ZERO {
            return Some(false);
        }
        let was_broken = item.is_broken();
        item.durability = item.durability.saturating_sub(amount).max(Fixed::ZERO);
        let broke = !was_broken && item.is_broken();
        if broke {
            events.push(GameEvent::ItemBroken { item: id });
        }
        Some(broke)
    }

    /// Restore full durability. Returns `false` for unknown items.
    pub fn repair(&mut self, id: ItemId) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.durability = item.max_durability;
                true
            }
            None => false,
        }
    }
}

/// Split `units` into stacks of at most `max_stack`.
#[must_use]
pub fn stack_sizes(units: u32, max_stack: u32) -> Vec<u32> {
    let max_stack = max_stack.max(1);
    let mut sizes = Vec::with_capacity((units / max_stack + 1) as usize);
    let mut remaining = units;
    while remaining > 0 {
        let size = remaining.min(max_stack);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SlotDefinition;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn rifle() -> ItemDefinition {
        ItemDefinition::new(ItemTypeId(4), "Rifle")
            .with_weight(fx(3))
            .with_durability(fx(100))
            .with_tag("Weapon")
            .with_slot(SlotDefinition::new("Scope").requiring("Scope"))
            .with_slot(SlotDefinition::new("Muzzle"))
            .with_stat("Damage", fx(28))
    }

    fn bullets() -> ItemDefinition {
        ItemDefinition::new(ItemTypeId(7), "Bullet")
            .with_max_stack(60)
            .with_weight(Fixed::from_num(0.5))
    }

    fn backpack() -> ItemDefinition {
        ItemDefinition::new(ItemTypeId(20), "Backpack")
            .with_weight(fx(1))
            .with_inventory(4)
    }

    #[test]
    fn test_spawn_copies_definition() {
        let mut world = ItemWorld::new();
        let id = world.spawn(&rifle(), 1);
        let item = world.get(id).expect("spawned");

        assert_eq!(item.type_id(), ItemTypeId(4));
        assert_eq!(item.durability(), fx(100));
        assert_eq!(item.slots().len(), 2);
        assert_eq!(item.stat_value("Damage"), Some(fx(28)));
        assert!(item.has_tag("Weapon"));
        assert!(item.is_root());
    }

    #[test]
    fn test_spawn_clamps_stack() {
        let mut world = ItemWorld::new();
        let id = world.spawn(&bullets(), 500);
        assert_eq!(world.get(id).map(Item::stack_count), Some(60));

        let id = world.spawn(&bullets(), 0);
        assert_eq!(world.get(id).map(Item::stack_count), Some(1));
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let mut world = ItemWorld::new();
        let catalog = ItemCatalog::new();
        let result = world.instantiate(&catalog, ItemTypeId(99), 1);
        assert!(matches!(result, Err(GameError::UnknownItemType(ItemTypeId(99)))));
        assert!(world.is_empty());
    }

    #[test]
    fn test_instantiate_units_splits_into_stacks() {
        let mut world = ItemWorld::new();
        let catalog: ItemCatalog = [bullets()].into_iter().collect();
        let ids = world
            .instantiate_units(&catalog, ItemTypeId(7), 130)
            .expect("known type");

        let counts: Vec<u32> = ids
            .iter()
            .filter_map(|id| world.get(*id).map(Item::stack_count))
            .collect();
        assert_eq!(counts, vec![60, 60, 10]);
    }

    #[test]
    fn test_split() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let stack = world.spawn(&bullets(), 40);

        let part = world.split(stack, 15, &mut events).expect("valid split");
        assert_eq!(world.get(stack).map(Item::stack_count), Some(25));
        assert_eq!(world.get(part).map(Item::stack_count), Some(15));
        assert!(world.get(part).is_some_and(Item::is_root));
    }

    #[test]
    fn test_split_all_but_one_inside_holder() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let pack = world.spawn(&backpack(), 1);
        let stack = world.spawn(&bullets(), 10);
        world.add_item(pack, stack, &mut events).expect("room");
        events.drain();

        let part = world.split(stack, 9, &mut events).expect("valid split");

        assert_ne!(part, stack);
        assert_eq!(world.get(stack).map(Item::stack_count), Some(1));
        assert_eq!(world.get(part).map(Item::stack_count), Some(9));
        assert!(world.get(part).is_some_and(Item::is_root));
        assert!(world.get(stack).is_some_and(|item| !item.is_root()));
        // Backpack 1 + one bullet 0.5
        assert_eq!(world.total_weight(pack), Fixed::from_num(1.5));
        assert!(events
            .iter()
            .any(|event| matches!(event, GameEvent::InventoryChanged { holder } if *holder == pack)));
    }

    #[test]
    fn test_split_rejects_out_of_range() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let stack = world.spawn(&bullets(), 10);

        assert!(world.split(stack, 0, &mut events).is_none());
        assert!(world.split(stack, 10, &mut events).is_none());
        assert!(world.split(stack, 11, &mut events).is_none());
        assert_eq!(world.get(stack).map(Item::stack_count), Some(10));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn test_destroy_tree_order() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let pack = world.spawn(&backpack(), 1);
        let gun = world.spawn(&rifle(), 1);
        let muzzle = world.spawn(&ItemDefinition::new(ItemTypeId(30), "Silencer"), 1);
        let ammo = world.spawn(&bullets(), 20);

        world
            .plug(gun, "Muzzle", muzzle, false, &mut events)
            .expect("muzzle accepts anything");
        world.add_item(pack, gun, &mut events).expect("room");
        world.add_item(pack, ammo, &mut events).expect("room");
        events.drain();

        let destroyed = world.destroy_tree(pack, &mut events);
        assert_eq!(destroyed, vec![muzzle, gun, ammo, pack]);
        assert!(world.is_empty());

        let destroyed_events: Vec<ItemId> = events
            .iter()
            .filter_map(|event| match event {
                GameEvent::ItemDestroyed { item } => Some(*item),
                _ => None,
            })
            .collect();
        assert_eq!(destroyed_events, destroyed);
    }

    #[test]
    fn test_destroy_unknown_is_noop() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        assert!(world.destroy_tree(ItemId(42), &mut events).is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_destroy_child_detaches_from_parent() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let pack = world.spawn(&backpack(), 1);
        let ammo = world.spawn(&bullets(), 20);
        world.add_item(pack, ammo, &mut events).expect("room");

        world.destroy_tree(ammo, &mut events);
        assert!(world.get(pack).and_then(Item::inventory).is_some_and(Inventory::is_empty));
        assert_eq!(world.total_weight(pack), fx(1));
    }

    #[test]
    fn test_weight_includes_slots_and_inventory() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let pack = world.spawn(&backpack(), 1);
        let gun = world.spawn(&rifle(), 1);
        let muzzle = world.spawn(
            &ItemDefinition::new(ItemTypeId(30), "Silencer").with_weight(fx(1)),
            1,
        );
        let ammo = world.spawn(&bullets(), 20);

        world.plug(gun, "Muzzle", muzzle, false, &mut events).expect("fits");
        world.add_item(pack, gun, &mut events).expect("room");
        world.add_item(pack, ammo, &mut events).expect("room");

        // pack 1 + gun 3 + muzzle 1 + ammo 20 * 0.5
        assert_eq!(world.total_weight(pack), fx(15));
        assert_eq!(
            world.get(pack).and_then(Item::inventory).map(Inventory::cached_weight),
            Some(fx(14))
        );
    }

    #[test]
    fn test_nested_weight_propagates_up() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let outer = world.spawn(&backpack(), 1);
        let inner = world.spawn(&backpack(), 1);
        let ammo = world.spawn(&bullets(), 10);

        world.add_item(outer, inner, &mut events).expect("room");
        world.add_item(inner, ammo, &mut events).expect("room");
        assert_eq!(world.total_weight(outer), fx(7));

        world.set_stack_count(ammo, 30, &mut events);
        assert_eq!(world.total_weight(outer), fx(17));
    }

    #[test]
    fn test_durability() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let gun = world.spawn(&rifle(), 1);

        assert_eq!(world.use_durability(gun, fx(60), &mut events), Some(false));
        assert_eq!(world.use_durability(gun, fx(60), &mut events), Some(true));
        assert_eq!(world.get(gun).map(Item::durability), Some(Fixed::ZERO));
        // Already broken: no second break.
        assert_eq!(world.use_durability(gun, fx(1), &mut events), Some(false));
        assert_eq!(events.len(), 1);

        assert!(world.repair(gun));
        assert_eq!(world.get(gun).map(Item::durability), Some(fx(100)));
    }

    #[test]
    fn test_non_wearing_item_ignores_durability() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let ammo = world.spawn(&bullets(), 5);
        assert_eq!(world.use_durability(ammo, fx(5), &mut events), Some(false));
        assert!(!world.get(ammo).is_some_and(Item::is_broken));
    }

    #[test]
    fn test_stack_sizes() {
        assert_eq!(stack_sizes(0, 10), Vec::<u32>::new());
        assert_eq!(stack_sizes(25, 10), vec![10, 10, 5]);
        assert_eq!(stack_sizes(3, 0), vec![1, 1, 1]);
    }
}
