//! Named sockets on items.
//!
//! A slot holds zero or one child item. Compatibility is tag based: the
//! candidate must carry every required tag and none of the excluded ones.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{SlotDefinition, Tag};
use crate::events::{EventQueue, GameEvent};
use crate::item::{Item, ItemId, ItemParent, ItemWorld};

/// A single socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    key: String,
    required_tags: Vec<Tag>,
    excluded_tags: Vec<Tag>,
    pub(crate) content: Option<ItemId>,
}

impl Slot {
    fn from_definition(definition: &SlotDefinition) -> Self {
        Self {
            key: definition.key.clone(),
            required_tags: definition.required_tags.clone(),
            excluded_tags: definition.excluded_tags.clone(),
            content: None,
        }
    }

    /// Slot key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Plugged item, if any.
    #[must_use]
    pub fn content(&self) -> Option<ItemId> {
        self.content
    }

    /// Whether nothing is plugged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    /// Whether `item` satisfies the tag filter.
    #[must_use]
    pub fn accepts(&self, item: &Item) -> bool {
        self.required_tags.iter().all(|tag| item.tags().contains(tag))
            && !self.excluded_tags.iter().any(|tag| item.tags().contains(tag))
    }
}

/// The ordered sockets of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCollection {
    slots: Vec<Slot>,
}

impl SlotCollection {
    pub(crate) fn from_definitions(definitions: &[SlotDefinition]) -> Self {
        Self {
            slots: definitions.iter().map(Slot::from_definition).collect(),
        }
    }

    pub(crate) fn empty_copy(&self) -> Self {
        Self {
            slots: self
                .slots
                .iter()
                .map(|slot| Slot {
                    content: None,
                    ..slot.clone()
                })
                .collect(),
        }
    }

    /// Look up a slot by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.key == key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.key == key)
    }

    /// Slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Plugged items in slot order.
    pub fn contents(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.slots.iter().filter_map(|slot| slot.content)
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the item has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Why an item could not be plugged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlugError {
    /// The item to plug does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// The slot owner does not exist.
    #[error("Slot owner not found: {0}")]
    OwnerNotFound(ItemId),
    /// The owner has no slot with that key.
    #[error("No slot '{0}'")]
    SlotNotFound(String),
    /// The slot's tag filter rejects the item.
    #[error("Slot '{0}' does not accept the item")]
    Incompatible(String),
    /// The slot is taken and replacing was not allowed.
    #[error("Slot '{0}' is occupied")]
    Occupied(String),
    /// The item is the owner or one of its ancestors.
    #[error("Plugging would create a cycle")]
    WouldCreateCycle,
    /// No slot on the owner can take the item.
    #[error("No compatible slot")]
    NoCompatibleSlot,
}

/// Result of a successful plug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlugOutcome {
    /// Slot the item went into.
    pub slot: String,
    /// Previous occupant, now a root.
    pub displaced: Option<ItemId>,
}

impl ItemWorld {
    fn check_plug_endpoints(&self, owner: ItemId, item: ItemId) -> Result<(), PlugError> {
        if !self.contains(owner) {
            return Err(PlugError::OwnerNotFound(owner));
        }
        if !self.contains(item) {
            return Err(PlugError::ItemNotFound(item));
        }
        if self.is_ancestor_or_self(item, owner) {
            return Err(PlugError::WouldCreateCycle);
        }
        Ok(())
    }

    /// Plug `item` into the first compatible slot of `owner`.
    ///
    /// Empty compatible slots are preferred. When `empty_only` is false and
    /// every compatible slot is taken, the first one is used and its occupant
    /// becomes a root. A slot already holding `item` counts as empty.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if either item is unknown, if `item`
    /// is `owner` or one of its ancestors, or if no slot fits.
    pub fn try_plug(
        &mut self,
        owner: ItemId,
        item: ItemId,
        empty_only: bool,
        events: &mut EventQueue,
    ) -> Result<PlugOutcome, PlugError> {
        self.check_plug_endpoints(owner, item)?;
        let (Some(owner_ref), Some(item_ref)) = (self.get(owner), self.get(item)) else {
            return Err(PlugError::ItemNotFound(item));
        };

        let compatible = || owner_ref.slots().iter().filter(|slot| slot.accepts(item_ref));
        let target = compatible()
            .find(|slot| slot.content.is_none() || slot.content == Some(item))
            .or_else(|| if empty_only { None } else { compatible().next() })
            .map(|slot| slot.key().to_string())
            .ok_or(PlugError::NoCompatibleSlot)?;

        let displaced = self.plug(owner, &target, item, true, events)?;
        Ok(PlugOutcome {
            slot: target,
            displaced,
        })
    }

    /// Plug `item` into the named slot of `owner`.
    ///
    /// With `replace`, an occupant is detached and returned; otherwise an
    /// occupied slot is an error. `item` is detached from its previous parent
    /// first.
    ///
    /// # Errors
    ///
    /// See [`PlugError`]; on error nothing changes.
    pub fn plug(
        &mut self,
        owner: ItemId,
        key: &str,
        item: ItemId,
        replace: bool,
        events: &mut EventQueue,
    ) -> Result<Option<ItemId>, PlugError> {
        self.check_plug_endpoints(owner, item)?;
        let (Some(owner_ref), Some(item_ref)) = (self.get(owner), self.get(item)) else {
            return Err(PlugError::ItemNotFound(item));
        };
        let slot = owner_ref
            .slots()
            .get(key)
            .ok_or_else(|| PlugError::SlotNotFound(key.to_string()))?;
        if !slot.accepts(item_ref) {
            return Err(PlugError::Incompatible(key.to_string()));
        }

        let occupant = slot.content.filter(|current| *current != item);
        if occupant.is_some() && !replace {
            return Err(PlugError::Occupied(key.to_string()));
        }

        if let Some(previous) = occupant {
            self.detach(previous, events);
        }
        self.detach(item, events);

        if let Some(slot) = self.get_mut(owner).and_then(|o| o.slots.get_mut(key)) {
            slot.content = Some(item);
        }
        if let Some(plugged) = self.get_mut(item) {
            plugged.parent = Some(ItemParent::Slot {
                owner,
                slot: key.to_string(),
            });
        }

        self.refresh_weights(owner);
        events.push(GameEvent::SlotChanged {
            owner,
            slot: key.to_string(),
        });
        tracing::debug!(owner = %owner, item = %item, slot = key, "Plugged item");
        Ok(occupant)
    }

    /// Empty the named slot, returning the item that was in it (now a root).
    pub fn unplug(&mut self, owner: ItemId, key: &str, events: &mut EventQueue) -> Option<ItemId> {
        let content = self.get(owner)?.slots().get(key)?.content?;
        self.detach(content, events);
        Some(content)
    }
}
