//! Test fixtures and helpers.
//!
//! A small sample catalog (a player, cash, ammo, a rifle with attachments,
//! a backpack) plus formulas and ready-made games for consistent testing.

use duckov_core::catalog::{ItemCatalog, ItemDefinition, ItemTypeId, SlotDefinition};
use duckov_core::cost::Cost;
use duckov_core::crafting::{CraftingFormula, FormulaCollection};
use duckov_core::data::GameConfig;
use duckov_core::item::ItemId;
use duckov_core::state::GameState;
use fixed::types::I32F32;

/// The player character.
pub const PLAYER: ItemTypeId = ItemTypeId::new(1);
/// Physical money.
pub const CASH: ItemTypeId = ItemTypeId::new(451);
/// Generic crafting material.
pub const ITEM_A: ItemTypeId = ItemTypeId::new(100);
/// What the sample formula produces.
pub const RESULT: ItemTypeId = ItemTypeId::new(101);
/// Stackable ammunition (max stack 60, half a unit of weight each).
pub const AMMO: ItemTypeId = ItemTypeId::new(200);
/// Weapon with `Scope` and `Grip` slots.
pub const RIFLE: ItemTypeId = ItemTypeId::new(300);
/// Fits a rifle's `Scope` slot.
pub const SCOPE: ItemTypeId = ItemTypeId::new(301);
/// Fits a rifle's `Grip` slot.
pub const GRIP: ItemTypeId = ItemTypeId::new(302);
/// Container with its own inventory.
pub const BACKPACK: ItemTypeId = ItemTypeId::new(400);

/// Inventory capacity of [`PLAYER`].
pub const PLAYER_CAPACITY: usize = 16;
/// Inventory capacity of [`BACKPACK`].
pub const BACKPACK_CAPACITY: usize = 4;
/// Id of the sample formula: `Cost(100, [(ITEM_A, 2)])` → one [`RESULT`].
pub const SAMPLE_FORMULA: &str = "SampleResult";
/// Id of a formula that starts locked.
pub const LOCKED_FORMULA: &str = "LockedAmmo";

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In engine code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Item types used across the test suites.
#[must_use]
pub fn sample_catalog() -> ItemCatalog {
    [
        ItemDefinition::new(PLAYER, "Duck")
            .with_inventory(PLAYER_CAPACITY)
            .with_stat("MoveSpeed", fixed(5))
            .with_stat("MaxWeight", fixed(40)),
        ItemDefinition::new(CASH, "Cash").with_max_stack(1_000_000),
        ItemDefinition::new(ITEM_A, "Scrap")
            .with_max_stack(20)
            .with_weight(fixed(1))
            .with_price(5),
        ItemDefinition::new(RESULT, "Gadget")
            .with_weight(fixed(2))
            .with_price(150),
        ItemDefinition::new(AMMO, "Ammo")
            .with_max_stack(60)
            .with_weight(fixed_f(0.5)),
        ItemDefinition::new(RIFLE, "Rifle")
            .with_tag("Weapon")
            .with_weight(fixed(4))
            .with_durability(fixed(100))
            .with_stat("Damage", fixed(10))
            .with_slot(SlotDefinition::new("Scope").requiring("Scope"))
            .with_slot(SlotDefinition::new("Grip").requiring("Grip")),
        ItemDefinition::new(SCOPE, "Red Dot")
            .with_tag("Scope")
            .with_weight(fixed(1)),
        ItemDefinition::new(GRIP, "Foregrip")
            .with_tag("Grip")
            .with_weight(fixed(1)),
        ItemDefinition::new(BACKPACK, "Backpack")
            .with_weight(fixed(2))
            .with_inventory(BACKPACK_CAPACITY),
    ]
    .into_iter()
    .collect()
}

/// Formulas matching [`sample_catalog`].
///
/// # Panics
///
/// Never; the ids are distinct.
#[must_use]
pub fn sample_formulas() -> FormulaCollection {
    FormulaCollection::from_formulas([
        CraftingFormula::new(
            SAMPLE_FORMULA,
            Cost::money(100).with_item(ITEM_A, 2),
            RESULT,
            1,
        )
        .unlocked_by_default(),
        CraftingFormula::new(LOCKED_FORMULA, Cost::money(10).with_item(ITEM_A, 1), AMMO, 30)
            .with_tag("Ammo"),
    ])
    .expect("sample formula ids are unique")
}

/// Configuration for a game with `money` in the bank and [`CASH`] as cash.
#[must_use]
pub fn sample_config(money: i64) -> GameConfig {
    GameConfig {
        starting_money: money,
        cash_type: Some(CASH),
        player_type: PLAYER,
        ..GameConfig::default()
    }
}

/// A fresh game on the sample content.
///
/// # Panics
///
/// Panics if the sample content is inconsistent.
#[must_use]
pub fn new_game(money: i64) -> GameState {
    GameState::new(sample_config(money), sample_catalog(), sample_formulas())
        .expect("sample content is valid")
}

/// A fresh game where the player already carries `units` of [`ITEM_A`].
///
/// # Panics
///
/// Panics if the sample content is inconsistent.
#[must_use]
pub fn game_with_material(money: i64, units: u32) -> GameState {
    let mut state = new_game(money);
    if units > 0 {
        state.give_new(ITEM_A, units).expect("ITEM_A is registered");
    }
    state
}

/// A rifle with a scope plugged in, as a root item.
///
/// # Panics
///
/// Panics if the sample content is inconsistent.
pub fn scoped_rifle(state: &mut GameState) -> (ItemId, ItemId) {
    let catalog = state.catalog().clone();
    let (world, events) = state.world_and_events();
    let rifle = world.instantiate(&catalog, RIFLE, 1).expect("registered");
    let scope = world.instantiate(&catalog, SCOPE, 1).expect("registered");
    world
        .plug(rifle, "Scope", scope, false, events)
        .expect("scope fits");
    (rifle, scope)
}
