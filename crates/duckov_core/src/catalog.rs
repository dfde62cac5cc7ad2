//! Item type registry.
//!
//! Every item type is described by an [`ItemDefinition`], keyed by its
//! integer [`ItemTypeId`]. The type id is the stable cross-session identifier
//! for item definitions: saves, costs and formulas refer to types only through
//! it.
//!
//! Definitions are plain data, designed to be deserialized from RON content
//! packs (see [`crate::data`]).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};
use crate::stat::StatKey;

/// Stable identifier of an item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTypeId(pub i32);

impl ItemTypeId {
    /// Create a new item type ID.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

/// Item tag (e.g. `"Weapon"`, `"Scope"`, `"Bullet"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    /// Create a tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Socket declared by an item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    /// Slot key, unique within the item type.
    pub key: String,
    /// Tags an item must carry to be plugged here.
    #[serde(default)]
    pub required_tags: Vec<Tag>,
    /// Tags that forbid an item from being plugged here.
    #[serde(default)]
    pub excluded_tags: Vec<Tag>,
}

impl SlotDefinition {
    /// Slot accepting anything.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required_tags: Vec::new(),
            excluded_tags: Vec::new(),
        }
    }

    /// Require a tag.
    #[must_use]
    pub fn requiring(mut self, tag: impl Into<String>) -> Self {
        self.required_tags.push(Tag::new(tag));
        self
    }

    /// Forbid a tag.
    #[must_use]
    pub fn excluding(mut self, tag: impl Into<String>) -> Self {
        self.excluded_tags.push(Tag::new(tag));
        self
    }
}

/// Base stat declared by an item type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDefinition {
    /// Stat key.
    pub key: StatKey,
    /// Base value.
    #[serde(with = "fixed_decimal")]
    pub base: Fixed,
}

const fn default_max_stack() -> u32 {
    1
}

/// Data-driven item type definition.
///
/// # Example RON
///
/// ```ron
/// ItemDefinition(
///     type_id: 4,
///     name: "Rifle",
///     unit_weight: 3.5,
///     max_durability: 100.0,
///     tags: ["Weapon", "Gun"],
///     slots: [
///         SlotDefinition(key: "Scope", required_tags: ["Scope"]),
///     ],
///     stats: [
///         StatDefinition(key: "Damage", base: 28.0),
///     ],
///     price: 2400,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Type identifier.
    pub type_id: ItemTypeId,
    /// Display name.
    pub name: String,
    /// Largest stack a single item instance may hold.
    #[serde(default = "default_max_stack")]
    pub max_stack_count: u32,
    /// Weight of one unit.
    #[serde(default, with = "fixed_decimal")]
    pub unit_weight: Fixed,
    /// Durability of a fresh instance; zero means the type does not wear.
    #[serde(default, with = "fixed_decimal")]
    pub max_durability: Fixed,
    /// Tags carried by every instance.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Sockets.
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,
    /// Inventory entry capacity, if instances carry an inventory.
    #[serde(default)]
    pub inventory_capacity: Option<usize>,
    /// Base stats.
    #[serde(default)]
    pub stats: Vec<StatDefinition>,
    /// Shop price per unit.
    #[serde(default)]
    pub price: i64,
}

impl ItemDefinition {
    /// Minimal definition: not stackable, weightless, no slots.
    #[must_use]
    pub fn new(type_id: ItemTypeId, name: impl Into<String>) -> Self {
        Self {
            type_id,
            name: name.into(),
            max_stack_count: 1,
            unit_weight: Fixed::ZERO,
            max_durability: Fixed::ZERO,
            tags: Vec::new(),
            slots: Vec::new(),
            inventory_capacity: None,
            stats: Vec::new(),
            price: 0,
        }
    }

    /// Set the max stack size.
    #[must_use]
    pub fn with_max_stack(mut self, max_stack_count: u32) -> Self {
        self.max_stack_count = max_stack_count;
        self
    }

    /// Set the unit weight.
    #[must_use]
    pub fn with_weight(mut self, unit_weight: Fixed) -> Self {
        self.unit_weight = unit_weight;
        self
    }

    /// Set max durability.
    #[must_use]
    pub fn with_durability(mut self, max_durability: Fixed) -> Self {
        self.max_durability = max_durability;
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(Tag::new(tag));
        self
    }

    /// Add a slot.
    #[must_use]
    pub fn with_slot(mut self, slot: SlotDefinition) -> Self {
        self.slots.push(slot);
        self
    }

    /// Give instances an inventory.
    #[must_use]
    pub fn with_inventory(mut self, capacity: usize) -> Self {
        self.inventory_capacity = Some(capacity);
        self
    }

    /// Add a base stat.
    #[must_use]
    pub fn with_stat(mut self, key: impl Into<StatKey>, base: Fixed) -> Self {
        self.stats.push(StatDefinition {
            key: key.into(),
            base,
        });
        self
    }

    /// Set the price.
    #[must_use]
    pub fn with_price(mut self, price: i64) -> Self {
        self.price = price;
        self
    }

    /// Whether instances can hold more than one unit.
    #[must_use]
    pub fn is_stackable(&self) -> bool {
        self.max_stack_count > 1
    }

    /// Check the definition for authoring mistakes.
    ///
    /// Returns a list of human-readable problems (empty if valid).
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_stack_count == 0 {
            errors.push(format!("{} '{}': max_stack_count is 0", self.type_id, self.name));
        }
        if self.unit_weight < Fixed::ZERO {
            errors.push(format!("{} '{}': negative unit_weight", self.type_id, self.name));
        }
        if self.max_durability < Fixed::ZERO {
            errors.push(format!("{} '{}': negative max_durability", self.type_id, self.name));
        }
        if self.inventory_capacity == Some(0) {
            errors.push(format!("{} '{}': inventory capacity is 0", self.type_id, self.name));
        }

        let mut slot_keys = BTreeSet::new();
        for slot in &self.slots {
            if !slot_keys.insert(slot.key.as_str()) {
                errors.push(format!(
                    "{} '{}': duplicate slot key '{}'",
                    self.type_id, self.name, slot.key
                ));
            }
        }

        let mut stat_keys = BTreeSet::new();
        for stat in &self.stats {
            if !stat_keys.insert(&stat.key) {
                errors.push(format!(
                    "{} '{}': duplicate stat '{}'",
                    self.type_id, self.name, stat.key
                ));
            }
        }

        errors
    }
}

/// Registry of item definitions indexed by type id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemCatalog {
    definitions: BTreeMap<ItemTypeId, ItemDefinition>,
}

impl ItemCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// A second registration for the same type id is a content error: it is
    /// logged and the first definition is kept. Returns whether it was added.
    pub fn register(&mut self, definition: ItemDefinition) -> bool {
        if let Some(existing) = self.definitions.get(&definition.type_id) {
            tracing::error!(
                type_id = definition.type_id.0,
                kept = %existing.name,
                ignored = %definition.name,
                "Duplicate item type registration"
            );
            return false;
        }
        self.definitions.insert(definition.type_id, definition);
        true
    }

    /// Get a definition.
    #[must_use]
    pub fn get(&self, type_id: ItemTypeId) -> Option<&ItemDefinition> {
        self.definitions.get(&type_id)
    }

    /// Whether a type is registered.
    #[must_use]
    pub fn contains(&self, type_id: ItemTypeId) -> bool {
        self.definitions.contains_key(&type_id)
    }

    /// All definitions in type id order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.definitions.values()
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Validate every definition.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.definitions
            .values()
            .flat_map(ItemDefinition::validate)
            .collect()
    }
}

impl FromIterator<ItemDefinition> for ItemCatalog {
    fn from_iter<I: IntoIterator<Item = ItemDefinition>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for definition in iter {
            catalog.register(definition);
        }
        catalog
    }
}
