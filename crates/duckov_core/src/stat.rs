//! Stats and ordered modifiers.
//!
//! A [`Stat`] is a base value plus an ordered list of [`Modifier`]s. The
//! computed value is a left fold over the modifiers in order, so it is fully
//! determined by the base and the current modifier set.
//!
//! # Ordering
//!
//! Every modifier has an *effective order*: its explicit `order` when set,
//! otherwise the default for its kind (additive before multiplicative before
//! override). Modifiers with equal order keep insertion order.
//!
//! # Removal
//!
//! [`Stat::add_modifier`] returns a [`ModifierHandle`]. Removal goes through
//! that handle, never through value comparison, and removing a handle that is
//! already gone is a no-op. Owners (buffs, equipped items) can therefore tear
//! down unconditionally even if something else already did.
//!
//! ```
//! use duckov_core::math::Fixed;
//! use duckov_core::stat::{Modifier, ModifierSource, Stat};
//!
//! let mut damage = Stat::new("Damage", Fixed::from_num(10));
//! let bonus = damage.add_modifier(Modifier::additive(Fixed::from_num(5), ModifierSource::None));
//! damage.add_modifier(Modifier::multiplicative(Fixed::from_num(2), ModifierSource::None));
//! assert_eq!(damage.value(), Fixed::from_num(30));
//!
//! assert!(damage.remove_modifier(&bonus));
//! assert!(!damage.remove_modifier(&bonus));
//! assert_eq!(damage.value(), Fixed::from_num(20));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buff::BuffId;
use crate::item::ItemId;
use crate::math::{fixed_serde, Fixed};

/// Name of a stat (e.g. `"MaxHealth"`, `"MoveSpeed"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatKey(String);

impl StatKey {
    /// Create a stat key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StatKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for StatKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a modifier combines with the running value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// `value += amount`
    Additive,
    /// `value *= amount`
    Multiplicative,
    /// `value = amount`
    Override,
}

impl ModifierKind {
    /// Order used when a modifier does not specify one.
    #[must_use]
    pub const fn default_order(self) -> i32 {
        match self {
            Self::Additive => 0,
            Self::Multiplicative => 100,
            Self::Override => 1000,
        }
    }
}

/// What created a modifier.
///
/// This is a reference only. The stat never keeps the source alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierSource {
    /// No tracked source.
    #[default]
    None,
    /// An item (usually an equipped or plugged one).
    Item(ItemId),
    /// A buff instance.
    Buff(BuffId),
    /// Anything else, identified by caller-defined id.
    Custom(u64),
}

/// A single adjustment to a stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Combination rule.
    pub kind: ModifierKind,
    /// Operand.
    #[serde(with = "fixed_serde")]
    pub value: Fixed,
    /// Explicit order; overrides the kind default when set.
    pub order: Option<i32>,
    /// Who owns this modifier.
    pub source: ModifierSource,
}

impl Modifier {
    /// Create a modifier with the kind's default order.
    #[must_use]
    pub const fn new(kind: ModifierKind, value: Fixed, source: ModifierSource) -> Self {
        Self {
            kind,
            value,
            order: None,
            source,
        }
    }

    /// Additive modifier.
    #[must_use]
    pub const fn additive(value: Fixed, source: ModifierSource) -> Self {
        Self::new(ModifierKind::Additive, value, source)
    }

    /// Multiplicative modifier (`value` is the factor, e.g. 1.5).
    #[must_use]
    pub const fn multiplicative(value: Fixed, source: ModifierSource) -> Self {
        Self::new(ModifierKind::Multiplicative, value, source)
    }

    /// Override modifier.
    #[must_use]
    pub const fn overriding(value: Fixed, source: ModifierSource) -> Self {
        Self::new(ModifierKind::Override, value, source)
    }

    /// Set an explicit order.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    /// Replace the source.
    #[must_use]
    pub const fn with_source(mut self, source: ModifierSource) -> Self {
        self.source = source;
        self
    }

    /// Order this modifier is applied at.
    #[must_use]
    pub const fn effective_order(&self) -> i32 {
        match self.order {
            Some(order) => order,
            None => self.kind.default_order(),
        }
    }

    /// Apply this modifier to a running value.
    #[must_use]
    pub fn apply(&self, current: Fixed) -> Fixed {
        match self.kind {
            ModifierKind::Additive => current.saturating_add(self.value),
            ModifierKind::Multiplicative => current.saturating_mul(self.value),
            ModifierKind::Override => self.value,
        }
    }
}

/// Handle returned by `add_modifier`, used to remove exactly that modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierHandle {
    stat: StatKey,
    id: u64,
}

impl ModifierHandle {
    /// Stat this handle belongs to.
    #[must_use]
    pub fn stat(&self) -> &StatKey {
        &self.stat
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ModifierEntry {
    id: u64,
    modifier: Modifier,
}

/// A named numeric value with ordered modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    key: StatKey,
    #[serde(with = "fixed_serde")]
    base_value: Fixed,
    /// Sorted by (effective order, insertion id).
    modifiers: Vec<ModifierEntry>,
    next_id: u64,
}

impl Stat {
    /// Create a stat with no modifiers.
    #[must_use]
    pub fn new(key: impl Into<StatKey>, base_value: Fixed) -> Self {
        Self {
            key: key.into(),
            base_value,
            modifiers: Vec::new(),
            next_id: 1,
        }
    }

    /// Stat key.
    #[must_use]
    pub fn key(&self) -> &StatKey {
        &self.key
    }

    /// Base value before modifiers.
    #[must_use]
    pub fn base_value(&self) -> Fixed {
        self.base_value
    }

    /// Change the base value.
    pub fn set_base_value(&mut self, value: Fixed) {
        self.base_value = value;
    }

    /// Computed value: the base folded through every modifier in order.
    #[must_use]
    pub fn value(&self) -> Fixed {
        self.modifiers
            .iter()
            .fold(self.base_value, |acc, entry| entry.modifier.apply(acc))
    }

    /// Insert a modifier, keeping the list ordered.
    pub fn add_modifier(&mut self, modifier: Modifier) -> ModifierHandle {
        let id = self.next_id;
        self.next_id += 1;

        let order = modifier.effective_order();
        // Ids grow monotonically, so the new entry goes after every equal order.
        let index = self
            .modifiers
            .partition_point(|entry| entry.modifier.effective_order() <= order);
        self.modifiers.insert(index, ModifierEntry { id, modifier });

        ModifierHandle {
            stat: self.key.clone(),
            id,
        }
    }

    /// Remove the modifier behind `handle`.
    ///
    /// Returns `false` (and does nothing) if it is not present: already
    /// removed, never added, or issued by another stat.
    pub fn remove_modifier(&mut self, handle: &ModifierHandle) -> bool {
        if handle.stat != self.key {
            return false;
        }
        match self.modifiers.iter().position(|entry| entry.id == handle.id) {
            Some(index) => {
                self.modifiers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every modifier that came from `source`.
    pub fn remove_all_from_source(&mut self, source: ModifierSource) -> usize {
        let before = self.modifiers.len();
        self.modifiers
            .retain(|entry| entry.modifier.source != source);
        before - self.modifiers.len()
    }

    /// Whether the modifier behind `handle` is still applied.
    #[must_use]
    pub fn contains(&self, handle: &ModifierHandle) -> bool {
        handle.stat == self.key && self.modifiers.iter().any(|entry| entry.id == handle.id)
    }

    /// Modifiers in application order.
    pub fn modifiers(&self) -> impl Iterator<Item = &Modifier> {
        self.modifiers.iter().map(|entry| &entry.modifier)
    }

    /// Number of applied modifiers.
    #[must_use]
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Same key and base value, no modifiers.
    #[must_use]
    pub fn without_modifiers(&self) -> Self {
        self.without_modifiers_at(self.base_value)
    }

    fn without_modifiers_at(&self, base_value: Fixed) -> Self {
        Self {
            key: self.key.clone(),
            base_value,
            modifiers: Vec::new(),
            next_id: self.next_id,
        }
    }
}

/// Per-item stat table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatCollection {
    stats: BTreeMap<StatKey, Stat>,
}

impl StatCollection {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or reset a stat with the given base value.
    ///
    /// Resetting drops the old modifiers but keeps handing out fresh handle
    /// ids, so handles issued before the reset stay stale. Returns the
    /// previous stat if one existed under this key.
    pub fn insert(&mut self, key: impl Into<StatKey>, base_value: Fixed) -> Option<Stat> {
        let key = key.into();
        let stat = match self.stats.get(&key) {
            Some(previous) => previous.without_modifiers_at(base_value),
            None => Stat::new(key.clone(), base_value),
        };
        self.stats.insert(key, stat)
    }

    /// Look up a stat.
    #[must_use]
    pub fn get(&self, key: &StatKey) -> Option<&Stat> {
        self.stats.get(key)
    }

    /// Look up a stat mutably.
    pub fn get_mut(&mut self, key: &StatKey) -> Option<&mut Stat> {
        self.stats.get_mut(key)
    }

    /// Computed value of a stat, if it exists.
    #[must_use]
    pub fn get_value(&self, key: &StatKey) -> Option<Fixed> {
        self.stats.get(key).map(Stat::value)
    }

    /// Add a modifier to a stat. Returns `None` if the stat does not exist.
    pub fn add_modifier(&mut self, key: &StatKey, modifier: Modifier) -> Option<ModifierHandle> {
        self.stats
            .get_mut(key)
            .map(|stat| stat.add_modifier(modifier))
    }

    /// Remove a modifier by handle. No-op if it is already gone.
    pub fn remove_modifier(&mut self, handle: &ModifierHandle) -> bool {
        self.stats
            .get_mut(&handle.stat)
            .is_some_and(|stat| stat.remove_modifier(handle))
    }

    /// Remove every modifier from `source` across all stats.
    pub fn remove_all_from_source(&mut self, source: ModifierSource) -> usize {
        self.stats
            .values_mut()
            .map(|stat| stat.remove_all_from_source(source))
            .sum()
    }

    /// Whether a stat exists.
    #[must_use]
    pub fn contains_key(&self, key: &StatKey) -> bool {
        self.stats.contains_key(key)
    }

    /// Stats in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Stat> {
        self.stats.values()
    }

    /// Number of stats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Copy of this table with every modifier stripped.
    #[must_use]
    pub fn without_modifiers(&self) -> Self {
        Self {
            stats: self
                .stats
                .iter()
                .map(|(key, stat)| (key.clone(), stat.without_modifiers()))
                .collect(),
        }
    }
}
