//! Timed stat effects.
//!
//! A buff attaches a set of modifiers to one item's stats for a number of
//! ticks. The controller owns the [`ModifierHandle`]s it created and removes
//! exactly those on expiry, so other modifiers on the same stat are never
//! touched.

use serde::{Deserialize, Serialize};

use crate::item::{ItemId, ItemWorld};
use crate::stat::{Modifier, ModifierHandle, ModifierSource, StatKey};

/// Handle of an active buff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuffId(pub u64);

/// One stat adjustment granted by a buff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffEffect {
    /// Stat to modify.
    pub stat: StatKey,
    /// Modifier template; its source is replaced on application.
    pub modifier: Modifier,
}

/// Static description of a buff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuffDefinition {
    /// Identifier; re-applying the same id refreshes rather than stacks.
    pub id: String,
    /// Lifetime in ticks, `None` for permanent.
    pub duration: Option<u32>,
    /// Adjustments.
    pub effects: Vec<BuffEffect>,
}

impl BuffDefinition {
    /// Create a buff with no effects.
    #[must_use]
    pub fn new(id: impl Into<String>, duration: Option<u32>) -> Self {
        Self {
            id: id.into(),
            duration,
            effects: Vec::new(),
        }
    }

    /// Add an effect.
    #[must_use]
    pub fn with_effect(mut self, stat: impl Into<StatKey>, modifier: Modifier) -> Self {
        self.effects.push(BuffEffect {
            stat: stat.into(),
            modifier,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ActiveBuff {
    id: BuffId,
    definition: String,
    target: ItemId,
    remaining: Option<u32>,
    handles: Vec<ModifierHandle>,
}

/// Active buffs across all items.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuffController {
    active: Vec<ActiveBuff>,
    next_id: u64,
}

impl BuffController {
    /// Create a controller with no active buffs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a buff to `target`.
    ///
    /// If the same definition is already active on the target its duration
    /// is refreshed and the existing id returned. Effects on stats the target
    /// does not have are skipped. Returns `None` if the target is unknown.
    pub fn add(
        &mut self,
        world: &mut ItemWorld,
        target: ItemId,
        definition: &BuffDefinition,
    ) -> Option<BuffId> {
        if let Some(existing) = self
            .active
            .iter_mut()
            .find(|buff| buff.target == target && buff.definition == definition.id)
        {
            existing.remaining = definition.duration;
            return Some(existing.id);
        }

        let item = world.get_mut(target)?;
        let id = BuffId(self.next_id);
        self.next_id += 1;

        let handles = definition
            .effects
            .iter()
            .filter_map(|effect| {
                let modifier = effect.modifier.with_source(ModifierSource::Buff(id));
                let handle = item.stats_mut().add_modifier(&effect.stat, modifier);
                if handle.is_none() {
                    tracing::debug!(buff = %definition.id, stat = %effect.stat, "Buff targets missing stat");
                }
                handle
            })
            .collect();

        self.active.push(ActiveBuff {
            id,
            definition: definition.id.clone(),
            target,
            remaining: definition.duration,
            handles,
        });
        Some(id)
    }

    /// Advance one tick, removing buffs whose duration ran out.
    ///
    /// Returns the expired ids.
    pub fn tick(&mut self, world: &mut ItemWorld) -> Vec<BuffId> {
        for buff in &mut self.active {
            if let Some(remaining) = buff.remaining.as_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }

        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|buff| buff.remaining == Some(0));
        self.active = kept;

        expired
            .into_iter()
            .map(|buff| {
                teardown(world, &buff);
                buff.id
            })
            .collect()
    }

    /// Remove a buff now. Returns `false` if it was not active.
    pub fn remove(&mut self, world: &mut ItemWorld, id: BuffId) -> bool {
        let Some(index) = self.active.iter().position(|buff| buff.id == id) else {
            return false;
        };
        let buff = self.active.remove(index);
        teardown(world, &buff);
        true
    }

    /// Remove every buff on `target`.
    pub fn clear_target(&mut self, world: &mut ItemWorld, target: ItemId) -> usize {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|buff| buff.target == target);
        self.active = kept;
        for buff in &removed {
            teardown(world, buff);
        }
        removed.len()
    }

    /// Whether a buff is active.
    #[must_use]
    pub fn is_active(&self, id: BuffId) -> bool {
        self.active.iter().any(|buff| buff.id == id)
    }

    /// Ticks left, `None` if unknown or permanent.
    #[must_use]
    pub fn remaining(&self, id: BuffId) -> Option<u32> {
        self.active
            .iter()
            .find(|buff| buff.id == id)
            .and_then(|buff| buff.remaining)
    }

    /// Number of active buffs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no buff is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// The target may already be gone; that is not an error.
fn teardown(world: &mut ItemWorld, buff: &ActiveBuff) {
    let Some(item) = world.get_mut(buff.target) else {
        tracing::trace!(buff = buff.id.0, "Buff target already destroyed");
        return;
    };
    for handle in &buff.handles {
        item.stats_mut().remove_modifier(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ItemDefinition, ItemTypeId};
    use crate::events::EventQueue;
    use crate::math::Fixed;

    fn fx(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn character(world: &mut ItemWorld) -> ItemId {
        let def = ItemDefinition::new(ItemTypeId(1), "Duck")
            .with_stat("MoveSpeed", fx(10))
            .with_stat("MaxHealth", fx(100));
        world.spawn(&def, 1)
    }

    fn haste(duration: Option<u32>) -> BuffDefinition {
        BuffDefinition::new("Haste", duration)
            .with_effect("MoveSpeed", Modifier::multiplicative(fx(2), ModifierSource::None))
            .with_effect("Stealth", Modifier::additive(fx(1), ModifierSource::None))
    }

    #[test]
    fn test_buff_applies_and_expires() {
        let mut world = ItemWorld::new();
        let duck = character(&mut world);
        let mut buffs = BuffController::new();

        let id = buffs.add(&mut world, duck, &haste(Some(2))).expect("target exists");
        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(20)));

        assert!(buffs.tick(&mut world).is_empty());
        assert_eq!(buffs.tick(&mut world), vec![id]);
        assert!(!buffs.is_active(id));
        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(10)));
    }

    #[test]
    fn test_reapply_refreshes_duration() {
        let mut world = ItemWorld::new();
        let duck = character(&mut world);
        let mut buffs = BuffController::new();

        let first = buffs.add(&mut world, duck, &haste(Some(3))).expect("target exists");
        buffs.tick(&mut world);
        let second = buffs.add(&mut world, duck, &haste(Some(3))).expect("target exists");

        assert_eq!(first, second);
        assert_eq!(buffs.remaining(first), Some(3));
        assert_eq!(buffs.len(), 1);
        // Not doubled.
        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(20)));
    }

    #[test]
    fn test_remove_leaves_other_modifiers() {
        let mut world = ItemWorld::new();
        let duck = character(&mut world);
        let mut buffs = BuffController::new();

        if let Some(item) = world.get_mut(duck) {
            item.stats_mut()
                .add_modifier(&"MoveSpeed".into(), Modifier::additive(fx(5), ModifierSource::None));
        }
        let id = buffs.add(&mut world, duck, &haste(None)).expect("target exists");
        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(30)));

        assert!(buffs.remove(&mut world, id));
        assert!(!buffs.remove(&mut world, id));
        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(15)));
    }

    #[test]
    fn test_clear_target_only_touches_that_item() {
        let mut world = ItemWorld::new();
        let duck = character(&mut world);
        let other = character(&mut world);
        let mut buffs = BuffController::new();
        buffs.add(&mut world, duck, &haste(None)).expect("target exists");
        let kept = buffs.add(&mut world, other, &haste(None)).expect("target exists");

        assert_eq!(buffs.clear_target(&mut world, duck), 1);

        assert_eq!(world.get(duck).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(10)));
        assert_eq!(world.get(other).and_then(|d| d.stat_value("MoveSpeed")), Some(fx(20)));
        assert!(buffs.is_active(kept));
        assert_eq!(buffs.clear_target(&mut world, duck), 0);
    }

    #[test]
    fn test_teardown_after_target_destroyed() {
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let duck = character(&mut world);
        let mut buffs = BuffController::new();

        let id = buffs.add(&mut world, duck, &haste(Some(1))).expect("target exists");
        world.destroy_tree(duck, &mut events);

        assert_eq!(buffs.tick(&mut world), vec![id]);
        assert!(buffs.is_empty());
    }

    #[test]
    fn test_unknown_target() {
        let mut world = ItemWorld::new();
        let mut buffs = BuffController::new();
        assert_eq!(buffs.add(&mut world, ItemId(9), &haste(None)), None);
    }
}
