//! Crafting formulas, unlock state and the craft/decompose operations.
//!
//! A formula maps a [`Cost`] to a result item. Formulas are either unlocked
//! by default or unlocked explicitly through [`CraftingManager::unlock_formula`];
//! the unlocked set only ever grows and is persisted under
//! [`keys::UNLOCKED_FORMULAS`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ItemCatalog, ItemTypeId};
use crate::cost::{Cost, PaymentSources, ReturnOptions, ReturnReport};
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::events::{EventQueue, GameEvent};
use crate::item::{ItemId, ItemWorld};
use crate::saves::{keys, SaveStore};

/// Item produced by a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingResult {
    /// Result type.
    pub type_id: ItemTypeId,
    /// Units produced per craft.
    pub amount: u32,
}

/// A recipe.
///
/// # Example RON
///
/// ```ron
/// CraftingFormula(
///     id: "Bandage",
///     cost: Cost(money: 100, items: [CostEntry(type_id: 10, amount: 2)]),
///     result: CraftingResult(type_id: 40, amount: 1),
///     unlock_by_default: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftingFormula {
    /// Unique formula id.
    pub id: String,
    /// What crafting consumes.
    pub cost: Cost,
    /// What crafting produces.
    pub result: CraftingResult,
    /// Available without an explicit unlock.
    #[serde(default)]
    pub unlock_by_default: bool,
    /// Workbench tags this formula shows up under.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CraftingFormula {
    /// Create a formula that needs unlocking.
    #[must_use]
    pub fn new(id: impl Into<String>, cost: Cost, type_id: ItemTypeId, amount: u32) -> Self {
        Self {
            id: id.into(),
            cost,
            result: CraftingResult { type_id, amount },
            unlock_by_default: false,
            tags: Vec::new(),
        }
    }

    /// Mark as unlocked from the start.
    #[must_use]
    pub fn unlocked_by_default(mut self) -> Self {
        self.unlock_by_default = true;
        self
    }

    /// Add a workbench tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Every known formula, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct FormulaCollection {
    formulas: BTreeMap<String, CraftingFormula>,
}

impl FormulaCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection, rejecting duplicate ids.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateFormula`] on the first repeated id.
    pub fn from_formulas(formulas: impl IntoIterator<Item = CraftingFormula>) -> Result<Self> {
        let mut collection = Self::new();
        for formula in formulas {
            collection.insert(formula)?;
        }
        Ok(collection)
    }

    /// Add a formula.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateFormula`] if the id is taken.
    pub fn insert(&mut self, formula: CraftingFormula) -> Result<()> {
        if self.formulas.contains_key(&formula.id) {
            return Err(GameError::DuplicateFormula(formula.id));
        }
        self.formulas.insert(formula.id.clone(), formula);
        Ok(())
    }

    /// Look up a formula.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CraftingFormula> {
        self.formulas.get(id)
    }

    /// Formulas in id order.
    pub fn iter(&self) -> impl Iterator<Item = &CraftingFormula> {
        self.formulas.values()
    }

    /// Formulas carrying a workbench tag.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a CraftingFormula> + 'a {
        self.formulas
            .values()
            .filter(move |formula| formula.tags.iter().any(|t| t == tag))
    }

    /// First formula (by id) producing a type; used for decomposition.
    #[must_use]
    pub fn producing(&self, type_id: ItemTypeId) -> Option<&CraftingFormula> {
        self.formulas
            .values()
            .find(|formula| formula.result.type_id == type_id)
    }

    /// Number of formulas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    /// Whether there are no formulas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Check formulas against a catalog.
    ///
    /// Returns human-readable problems (empty if valid).
    #[must_use]
    pub fn validate(&self, catalog: &ItemCatalog) -> Vec<String> {
        let mut errors = Vec::new();
        for formula in self.formulas.values() {
            if !catalog.contains(formula.result.type_id) {
                errors.push(format!(
                    "Formula '{}': result {} is not a registered item",
                    formula.id, formula.result.type_id
                ));
            }
            if formula.result.amount == 0 {
                errors.push(format!("Formula '{}': result amount is 0", formula.id));
            }
            for entry in &formula.cost.items {
                if !catalog.contains(entry.type_id) {
                    errors.push(format!(
                        "Formula '{}': cost references unknown {}",
                        formula.id, entry.type_id
                    ));
                }
            }
        }
        errors
    }
}

/// Why a craft or decompose did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CraftError {
    /// No formula with this id.
    #[error("Unknown formula: {0}")]
    FormulaNotFound(String),
    /// The formula has not been unlocked.
    #[error("Formula '{0}' is locked")]
    Locked(String),
    /// The player cannot pay.
    #[error("Cannot afford formula '{0}'")]
    InsufficientCost(String),
    /// The result type is not in the catalog.
    #[error("Formula result {0} is not a registered item")]
    UnknownResult(ItemTypeId),
    /// The item to decompose does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// No formula produces this item type.
    #[error("Nothing decomposes {0}")]
    NotDecomposable(ItemTypeId),
    /// The stack is smaller than one craft's output.
    #[error("Stack too small to decompose")]
    StackTooSmall,
}

/// Unlock state plus the craft and decompose operations.
#[derive(Debug, Clone, Default)]
pub struct CraftingManager {
    formulas: FormulaCollection,
    unlocked: BTreeSet<String>,
}

impl CraftingManager {
    /// Create a manager with nothing explicitly unlocked.
    #[must_use]
    pub fn new(formulas: FormulaCollection) -> Self {
        Self {
            formulas,
            unlocked: BTreeSet::new(),
        }
    }

    /// Known formulas.
    #[must_use]
    pub fn formulas(&self) -> &FormulaCollection {
        &self.formulas
    }

    /// Explicitly unlocked ids, sorted.
    pub fn unlocked_ids(&self) -> impl Iterator<Item = &str> {
        self.unlocked.iter().map(String::as_str)
    }

    /// Whether a formula can be crafted.
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.formulas
            .get(id)
            .is_some_and(|formula| formula.unlock_by_default || self.unlocked.contains(id))
    }

    /// Unlock a formula.
    ///
    /// Returns `true` only when the formula was newly unlocked, in which case
    /// [`GameEvent::FormulaUnlocked`] is raised. Repeating an unlock is a
    /// silent no-op. Unknown ids and formulas that are unlocked by default are
    /// refused with a log line.
    pub fn unlock_formula(&mut self, id: &str, events: &mut EventQueue) -> bool {
        let Some(formula) = self.formulas.get(id) else {
            tracing::warn!(formula = id, "Cannot unlock unknown formula");
            return false;
        };
        if formula.unlock_by_default {
            tracing::error!(formula = id, "Formula is unlocked by default and cannot be unlocked");
            return false;
        }
        if !self.unlocked.insert(id.to_string()) {
            return false;
        }
        tracing::info!(formula = id, "Unlocked formula");
        events.push(GameEvent::FormulaUnlocked { id: id.to_string() });
        true
    }

    /// Run every check a craft needs without paying.
    ///
    /// Returns the result the craft would produce.
    ///
    /// # Errors
    ///
    /// See [`CraftError`].
    pub fn check_craft(
        &self,
        id: &str,
        economy: &Economy,
        world: &ItemWorld,
        catalog: &ItemCatalog,
        holder: ItemId,
    ) -> std::result::Result<CraftingResult, CraftError> {
        let formula = self
            .formulas
            .get(id)
            .ok_or_else(|| CraftError::FormulaNotFound(id.to_string()))?;
        if !self.is_unlocked(id) {
            return Err(CraftError::Locked(id.to_string()));
        }
        if !catalog.contains(formula.result.type_id) {
            return Err(CraftError::UnknownResult(formula.result.type_id));
        }
        if !formula.cost.is_enough(economy, world, holder) {
            return Err(CraftError::InsufficientCost(id.to_string()));
        }
        Ok(formula.result)
    }

    /// Run every check a craft needs, then pay.
    ///
    /// On success the cost has been debited and the caller must generate the
    /// returned result. On error nothing changed.
    ///
    /// # Errors
    ///
    /// See [`CraftError`].
    pub fn prepare_craft(
        &self,
        id: &str,
        economy: &mut Economy,
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        holder: ItemId,
        events: &mut EventQueue,
    ) -> std::result::Result<CraftingResult, CraftError> {
        let result = self.check_craft(id, economy, world, catalog, holder)?;
        let paid = self
            .formulas
            .get(id)
            .is_some_and(|formula| formula.cost.pay(economy, world, holder, PaymentSources::ALL, events));
        if !paid {
            return Err(CraftError::InsufficientCost(id.to_string()));
        }
        Ok(result)
    }

    /// Craft a formula.
    ///
    /// Pays the cost, creates the result as root items and raises one
    /// [`GameEvent::ItemCrafted`] per created item. The caller decides where
    /// the items go.
    ///
    /// # Errors
    ///
    /// See [`CraftError`]. Any error leaves money, items and events as they
    /// were.
    pub fn craft(
        &self,
        id: &str,
        economy: &mut Economy,
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        holder: ItemId,
        events: &mut EventQueue,
    ) -> std::result::Result<Vec<ItemId>, CraftError> {
        let result = self.prepare_craft(id, economy, world, catalog, holder, events)?;
        let items = world
            .instantiate_units(catalog, result.type_id, result.amount)
            .map_err(|_| CraftError::UnknownResult(result.type_id))?;
        record_crafted(id, &items, events);
        Ok(items)
    }

    /// Break an item back into its formula's cost.
    ///
    /// Whole multiples of the formula's output are consumed from the stack;
    /// the remainder (if any) stays. The refund goes wherever `options`
    /// says, with its multiplier applied on top of the number of multiples.
    ///
    /// # Errors
    ///
    /// See [`CraftError`]; on error nothing changed.
    pub fn decompose(
        &self,
        item: ItemId,
        economy: &mut Economy,
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        options: ReturnOptions,
        events: &mut EventQueue,
    ) -> std::result::Result<ReturnReport, CraftError> {
        let source = world.get(item).ok_or(CraftError::ItemNotFound(item))?;
        let type_id = source.type_id();
        let stack = source.stack_count();
        let formula = self
            .formulas
            .producing(type_id)
            .ok_or(CraftError::NotDecomposable(type_id))?;
        let per_craft = formula.result.amount.max(1);
        let multiples = stack / per_craft;
        if multiples == 0 {
            return Err(CraftError::StackTooSmall);
        }
        if let Some(missing) = formula.cost.items.iter().find(|e| !catalog.contains(e.type_id)) {
            return Err(CraftError::UnknownResult(missing.type_id));
        }

        let used = multiples * per_craft;
        if used == stack {
            world.destroy_tree(item, events);
        } else {
            world.set_stack_count(item, stack - used, events);
        }

        let refund = ReturnOptions {
            multiplier: options.multiplier.saturating_mul(multiples),
            ..options
        };
        let report = formula
            .cost
            .return_items(economy, world, catalog, refund, events)
            .map_err(|_| CraftError::UnknownResult(type_id))?;
        tracing::debug!(formula = %formula.id, multiples, "Decomposed item");
        Ok(report)
    }

    /// Persist the unlocked set.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails.
    pub fn save(&self, store: &mut SaveStore) -> Result<()> {
        let ids: Vec<&str> = self.unlocked_ids().collect();
        store.save(keys::UNLOCKED_FORMULAS, &ids)
    }

    /// Replace the unlocked set with the saved one. Returns `false` if
    /// nothing was saved. Ids without a formula are kept so that content
    /// removed and later restored keeps its unlock.
    ///
    /// # Errors
    ///
    /// Fails if the stored value is corrupt.
    pub fn load(&mut self, store: &SaveStore) -> Result<bool> {
        let Some(ids) = store.load::<Vec<String>>(keys::UNLOCKED_FORMULAS)? else {
            return Ok(false);
        };
        for id in ids.iter().filter(|id| self.formulas.get(id).is_none()) {
            tracing::warn!(formula = %id, "Saved unlock refers to unknown formula");
        }
        self.unlocked = ids.into_iter().collect();
        Ok(true)
    }
}

/// Raise one [`GameEvent::ItemCrafted`] per generated item.
pub fn record_crafted(formula: &str, items: &[ItemId], events: &mut EventQueue) {
    for item in items {
        events.push(GameEvent::ItemCrafted {
            formula: formula.to_string(),
            item: *item,
        });
    }
    tracing::info!(formula, count = items.len(), "Crafted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemDefinition;
    use crate::cost::ReturnTarget;

    const ORE: ItemTypeId = ItemTypeId(10);
    const BANDAGE: ItemTypeId = ItemTypeId(40);
    const PLAYER: ItemTypeId = ItemTypeId(1);

    fn catalog() -> ItemCatalog {
        [
            ItemDefinition::new(PLAYER, "Player").with_inventory(8),
            ItemDefinition::new(ORE, "Ore").with_max_stack(20),
            ItemDefinition::new(BANDAGE, "Bandage").with_max_stack(5),
        ]
        .into_iter()
        .collect()
    }

    fn manager() -> CraftingManager {
        let formulas = FormulaCollection::from_formulas([
            CraftingFormula::new("Bandage", Cost::money(100).with_item(ORE, 2), BANDAGE, 1)
                .unlocked_by_default(),
            CraftingFormula::new("BandagePack", Cost::money(10), BANDAGE, 3),
        ])
        .expect("unique ids");
        CraftingManager::new(formulas)
    }

    fn setup(ore: u32) -> (ItemWorld, ItemCatalog, ItemId) {
        let catalog = catalog();
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let player = world.instantiate(&catalog, PLAYER, 1).expect("registered");
        if ore > 0 {
            let stack = world.instantiate(&catalog, ORE, ore).expect("registered");
            world.add_item(player, stack, &mut events).expect("room");
        }
        (world, catalog, player)
    }

    #[test]
    fn test_duplicate_formula_rejected() {
        let result = FormulaCollection::from_formulas([
            CraftingFormula::new("A", Cost::default(), ORE, 1),
            CraftingFormula::new("A", Cost::default(), ORE, 2),
        ]);
        assert!(matches!(result, Err(GameError::DuplicateFormula(id)) if id == "A"));
    }

    #[test]
    fn test_formulas_by_workbench_tag() {
        let formulas = FormulaCollection::from_formulas([
            CraftingFormula::new("Bandage", Cost::money(100), BANDAGE, 1).with_tag("MedicalStation"),
            CraftingFormula::new("Ingot", Cost::money(5).with_item(ORE, 4), ORE, 1).with_tag("Forge"),
            CraftingFormula::new("BandagePack", Cost::money(10), BANDAGE, 3)
                .with_tag("MedicalStation")
                .with_tag("Forge"),
        ])
        .expect("unique ids");

        let medical: Vec<&str> = formulas
            .with_tag("MedicalStation")
            .map(|formula| formula.id.as_str())
            .collect();
        assert_eq!(medical, vec!["Bandage", "BandagePack"]);
        assert_eq!(formulas.with_tag("Forge").count(), 2);
        assert_eq!(formulas.with_tag("Kitchen").count(), 0);
    }

    #[test]
    fn test_unlock_is_idempotent() {
        let mut crafting = manager();
        let mut events = EventQueue::new();

        assert!(!crafting.is_unlocked("BandagePack"));
        assert!(crafting.unlock_formula("BandagePack", &mut events));
        assert!(!crafting.unlock_formula("BandagePack", &mut events));

        assert!(crafting.is_unlocked("BandagePack"));
        assert_eq!(crafting.unlocked_ids().count(), 1);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unlock_refusals() {
        let mut crafting = manager();
        let mut events = EventQueue::new();

        assert!(!crafting.unlock_formula("Nope", &mut events));
        assert!(!crafting.unlock_formula("Bandage", &mut events));
        assert!(events.is_empty());
        // Default formulas are craftable without being in the set.
        assert!(crafting.is_unlocked("Bandage"));
    }

    #[test]
    fn test_craft_success() {
        let crafting = manager();
        let (mut world, catalog, player) = setup(3);
        let mut economy = Economy::new(150, None);
        let mut events = EventQueue::new();

        let items = crafting
            .craft("Bandage", &mut economy, &mut world, &catalog, player, &mut events)
            .expect("affordable");

        assert_eq!(items.len(), 1);
        assert_eq!(economy.money(), 50);
        assert_eq!(world.item_count(player, ORE), 1);
        let crafted: Vec<&GameEvent> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::ItemCrafted { .. }))
            .collect();
        assert_eq!(crafted.len(), 1);
    }

    #[test]
    fn test_craft_insufficient_funds_changes_nothing() {
        let crafting = manager();
        let (mut world, catalog, player) = setup(3);
        let mut economy = Economy::new(50, None);
        let mut events = EventQueue::new();
        let before = world.len();

        let result = crafting.craft("Bandage", &mut economy, &mut world, &catalog, player, &mut events);

        assert_eq!(result, Err(CraftError::InsufficientCost("Bandage".into())));
        assert_eq!(economy.money(), 50);
        assert_eq!(world.item_count(player, ORE), 3);
        assert_eq!(world.len(), before);
        assert!(events.is_empty());
    }

    #[test]
    fn test_craft_locked_and_unknown() {
        let crafting = manager();
        let (mut world, catalog, player) = setup(0);
        let mut economy = Economy::new(1000, None);
        let mut events = EventQueue::new();

        assert_eq!(
            crafting.craft("BandagePack", &mut economy, &mut world, &catalog, player, &mut events),
            Err(CraftError::Locked("BandagePack".into()))
        );
        assert_eq!(
            crafting.craft("Nope", &mut economy, &mut world, &catalog, player, &mut events),
            Err(CraftError::FormulaNotFound("Nope".into()))
        );
        assert_eq!(economy.money(), 1000);
    }

    #[test]
    fn test_decompose_refunds_cost() {
        let crafting = manager();
        let (mut world, catalog, player) = setup(0);
        let mut economy = Economy::new(0, None);
        let mut events = EventQueue::new();
        let bandages = world.instantiate(&catalog, BANDAGE, 2).expect("registered");

        let report = crafting
            .decompose(
                bandages,
                &mut economy,
                &mut world,
                &catalog,
                ReturnOptions {
                    target: ReturnTarget::PlayerInventory(player),
                    multiplier: 1,
                },
                &mut events,
            )
            .expect("decomposable");

        assert!(!world.contains(bandages));
        assert_eq!(report.money, 200);
        assert_eq!(economy.money(), 200);
        assert_eq!(world.item_count(player, ORE), 4);
    }

    #[test]
    fn test_unlock_state_persists() {
        let mut crafting = manager();
        let mut events = EventQueue::new();
        let mut store = SaveStore::new();
        crafting.unlock_formula("BandagePack", &mut events);
        crafting.save(&mut store).expect("encodable");

        let mut restored = manager();
        assert!(restored.load(&store).expect("decodable"));
        assert!(restored.is_unlocked("BandagePack"));
    }
}
