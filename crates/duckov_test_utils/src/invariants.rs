//! Structural checks for an [`ItemWorld`].
//!
//! Each check returns `Err(description)` on the first violation so property
//! tests can report something readable.

use std::collections::BTreeMap;

use duckov_core::item::{ItemId, ItemParent, ItemWorld};
use duckov_core::math::Fixed;

/// Run every check.
///
/// # Errors
///
/// Returns the first violation found.
pub fn check_world(world: &ItemWorld) -> Result<(), String> {
    check_single_parent(world)?;
    check_acyclic(world)?;
    check_stack_bounds(world)?;
    check_weight_caches(world)
}

/// Every item is referenced by at most one container, and that container is
/// the one its parent link names.
///
/// # Errors
///
/// Returns the first item referenced twice or with a mismatched link.
pub fn check_single_parent(world: &ItemWorld) -> Result<(), String> {
    let mut referenced: BTreeMap<ItemId, ItemParent> = BTreeMap::new();

    for item in world.iter() {
        for slot in item.slots().iter() {
            if let Some(child) = slot.content() {
                let link = ItemParent::Slot {
                    owner: item.id(),
                    slot: slot.key().to_string(),
                };
                if let Some(previous) = referenced.insert(child, link) {
                    return Err(format!("{child} held twice (also by {previous:?})"));
                }
            }
        }
        if let Some(inventory) = item.inventory() {
            for child in inventory.contents() {
                let link = ItemParent::Inventory { owner: item.id() };
                if let Some(previous) = referenced.insert(*child, link) {
                    return Err(format!("{child} held twice (also by {previous:?})"));
                }
            }
        }
    }

    for item in world.iter() {
        let expected = referenced.get(&item.id());
        if item.parent() != expected {
            return Err(format!(
                "{} has parent {:?} but is held by {:?}",
                item.id(),
                item.parent(),
                expected
            ));
        }
    }
    for child in referenced.keys() {
        if !world.contains(*child) {
            return Err(format!("{child} is held but does not exist"));
        }
    }
    Ok(())
}

/// No item is its own ancestor.
///
/// # Errors
///
/// Returns the first item whose parent chain loops.
pub fn check_acyclic(world: &ItemWorld) -> Result<(), String> {
    for item in world.iter() {
        let mut current = item.parent().map(ItemParent::owner);
        let mut steps = 0;
        while let Some(owner) = current {
            if owner == item.id() || steps > world.len() {
                return Err(format!("{} is its own ancestor", item.id()));
            }
            steps += 1;
            current = world.parent_of(owner).map(ItemParent::owner);
        }
    }
    Ok(())
}

/// Stack counts stay within `1..=max_stack_count`.
///
/// # Errors
///
/// Returns the first out-of-range stack.
pub fn check_stack_bounds(world: &ItemWorld) -> Result<(), String> {
    for item in world.iter() {
        if item.stack_count() == 0 || item.stack_count() > item.max_stack_count() {
            return Err(format!(
                "{} has stack {} (max {})",
                item.id(),
                item.stack_count(),
                item.max_stack_count()
            ));
        }
    }
    Ok(())
}

/// Weight of an item computed from scratch, without any cache.
#[must_use]
pub fn deep_weight(world: &ItemWorld, id: ItemId) -> Fixed {
    let Some(item) = world.get(id) else {
        return Fixed::ZERO;
    };
    let plugged = item
        .slots()
        .contents()
        .fold(Fixed::ZERO, |acc, child| acc + deep_weight(world, child));
    let carried = item.inventory().map_or(Fixed::ZERO, |inventory| {
        inventory
            .contents()
            .iter()
            .fold(Fixed::ZERO, |acc, child| acc + deep_weight(world, *child))
    });
    item.self_weight() + plugged + carried
}

/// Every inventory's cached weight equals the recomputed sum.
///
/// # Errors
///
/// Returns the first stale cache.
pub fn check_weight_caches(world: &ItemWorld) -> Result<(), String> {
    for item in world.iter() {
        let Some(inventory) = item.inventory() else {
            continue;
        };
        let expected = inventory
            .contents()
            .iter()
            .fold(Fixed::ZERO, |acc, child| acc + deep_weight(world, *child));
        if inventory.cached_weight() != expected {
            return Err(format!(
                "{} caches weight {} but carries {}",
                item.id(),
                inventory.cached_weight(),
                expected
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{new_game, scoped_rifle, BACKPACK, AMMO};

    #[test]
    fn test_fresh_game_is_consistent() {
        let state = new_game(0);
        assert_eq!(check_world(state.world()), Ok(()));
    }

    #[test]
    fn test_nested_weights_are_consistent() {
        let mut state = new_game(0);
        let (rifle, _) = scoped_rifle(&mut state);
        let player = state.player();
        let catalog = state.catalog().clone();
        let (world, events) = state.world_and_events();
        let backpack = world.instantiate(&catalog, BACKPACK, 1).expect("registered");
        let ammo = world.instantiate(&catalog, AMMO, 30).expect("registered");
        world.add_item(backpack, ammo, events).expect("room");
        world.add_item(player, backpack, events).expect("room");
        world.add_item(player, rifle, events).expect("room");

        assert_eq!(check_world(state.world()), Ok(()));
        // 15 ammo + 2 backpack + 4 rifle + 1 scope
        assert_eq!(deep_weight(state.world(), player), Fixed::from_num(22));
    }
}
