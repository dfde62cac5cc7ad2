//! The explicit game context.
//!
//! [`GameState`] owns every subsystem that used to be process-wide: the
//! item world, the bank account, crafting unlocks, buffs, construction sites,
//! the save store and the pending event queue. Callers pass it (or the parts
//! they need) explicitly; nothing in this crate is global.
//!
//! Wrapper operations here are the ones that involve "the player": they pick
//! the player character as the holder, route generated items into its
//! inventory, fall back to dropping on the ground, and raise
//! [`GameEvent::PlayerItemOperation`].

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::atm::{Atm, AtmError};
use crate::buff::{BuffController, BuffDefinition, BuffId};
use crate::catalog::{ItemCatalog, ItemDefinition, ItemTypeId};
use crate::construction::ConstructionSite;
use crate::cost::{deliver, Cost, PaymentSources, ReturnOptions, ReturnReport, ReturnTarget};
use crate::crafting::{
    record_crafted, CraftError, CraftingManager, CraftingResult, FormulaCollection,
};
use crate::data::{ContentPack, GameConfig};
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::events::{EventBus, EventQueue, GameEvent};
use crate::item::{stack_sizes, ItemId, ItemParent, ItemWorld};
use crate::saves::SaveStore;

/// Where a handed-over item ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// In the player's inventory (possibly merged into existing stacks).
    Stored,
    /// Did not fit; lies on the ground as this root item.
    Dropped(ItemId),
}

/// Everything a running game owns.
#[derive(Debug)]
pub struct GameState {
    config: GameConfig,
    catalog: ItemCatalog,
    world: ItemWorld,
    economy: Economy,
    crafting: CraftingManager,
    buffs: BuffController,
    atm: Atm,
    sites: BTreeMap<String, ConstructionSite>,
    saves: SaveStore,
    events: EventQueue,
    player: ItemId,
    ground: Vec<ItemId>,
}

impl GameState {
    /// Start a new game.
    ///
    /// # Errors
    ///
    /// Fails if the configured player type is not in the catalog or carries
    /// no inventory.
    pub fn new(config: GameConfig, catalog: ItemCatalog, formulas: FormulaCollection) -> Result<Self> {
        let mut world = ItemWorld::new();
        let player = world.instantiate(&catalog, config.player_type, 1)?;
        if world.inventory_of(player).is_err() {
            return Err(GameError::InvalidState(format!(
                "Player type {} has no inventory",
                config.player_type
            )));
        }
        if let Some(cash) = config.cash_type.filter(|cash| !catalog.contains(*cash)) {
            tracing::warn!(cash_type = cash.0, "Configured cash type is not in the catalog");
        }

        tracing::info!(
            items = catalog.len(),
            formulas = formulas.len(),
            starting_money = config.starting_money,
            "New game"
        );
        Ok(Self {
            economy: Economy::new(config.starting_money, config.cash_type),
            atm: Atm::new(config.atm_max_draw),
            crafting: CraftingManager::new(formulas),
            buffs: BuffController::new(),
            sites: BTreeMap::new(),
            saves: SaveStore::new(),
            events: EventQueue::new(),
            ground: Vec::new(),
            config,
            catalog,
            world,
            player,
        })
    }

    /// Start a new game from a content pack.
    ///
    /// # Errors
    ///
    /// Fails on duplicate formulas or an invalid player type.
    pub fn from_content(config: GameConfig, pack: ContentPack) -> Result<Self> {
        let (catalog, formulas) = pack.into_registries()?;
        Self::new(config, catalog, formulas)
    }

    /// Settings this game was started with.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Item definitions.
    #[must_use]
    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    /// Item arena.
    #[must_use]
    pub fn world(&self) -> &ItemWorld {
        &self.world
    }

    /// Item arena, for direct slot and inventory operations.
    pub fn world_mut(&mut self) -> &mut ItemWorld {
        &mut self.world
    }

    /// Arena and event queue together, so callers can run world operations
    /// that raise events.
    pub fn world_and_events(&mut self) -> (&mut ItemWorld, &mut EventQueue) {
        (&mut self.world, &mut self.events)
    }

    /// Bank account.
    #[must_use]
    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Crafting unlock state.
    #[must_use]
    pub fn crafting(&self) -> &CraftingManager {
        &self.crafting
    }

    /// Active buffs.
    #[must_use]
    pub fn buffs(&self) -> &BuffController {
        &self.buffs
    }

    /// ATM settings.
    #[must_use]
    pub fn atm(&self) -> &Atm {
        &self.atm
    }

    /// Save store.
    #[must_use]
    pub fn saves(&self) -> &SaveStore {
        &self.saves
    }

    /// Replace the save store (e.g. after reading one from disk).
    pub fn set_saves(&mut self, saves: SaveStore) {
        self.saves = saves;
    }

    /// Pending events.
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Pending events, mutably.
    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Deliver pending events to subscribers.
    pub fn dispatch(&mut self, bus: &mut EventBus) -> usize {
        bus.dispatch(&mut self.events)
    }

    /// The player character item.
    #[must_use]
    pub fn player(&self) -> ItemId {
        self.player
    }

    /// Items lying on the ground, oldest first.
    pub fn ground(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ground
            .iter()
            .copied()
            .filter(|id| self.world.get(*id).is_some_and(|item| item.is_root()))
    }

    /// Units of a type the player carries.
    #[must_use]
    pub fn player_item_count(&self, type_id: ItemTypeId) -> u32 {
        self.world.item_count(self.player, type_id)
    }

    /// Pick up an item, or drop it on the ground if there is no room.
    ///
    /// The item is merged into the player's inventory. Whatever does not fit
    /// is detached and placed on the ground.
    pub fn give_or_drop(&mut self, item: ItemId) -> Delivery {
        self.ground.retain(|id| *id != item);
        let delivery = match self.world.add_and_merge(self.player, item, &mut self.events) {
            Ok(outcome) => match outcome.leftover {
                Some(leftover) => {
                    self.world.detach(leftover, &mut self.events);
                    Delivery::Dropped(leftover)
                }
                None => Delivery::Stored,
            },
            Err(err) => {
                tracing::debug!(item = %item, error = %err, "Cannot pick up, dropping");
                self.world.detach(item, &mut self.events);
                Delivery::Dropped(item)
            }
        };
        if let Delivery::Dropped(dropped) = delivery {
            if self.world.contains(dropped) {
                self.ground.push(dropped);
            }
        }
        self.events.push(GameEvent::PlayerItemOperation);
        delivery
    }

    /// Create `units` of a type and hand them to the player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`] for unregistered types.
    pub fn give_new(&mut self, type_id: ItemTypeId, units: u32) -> Result<Vec<Delivery>> {
        let items = self.world.instantiate_units(&self.catalog, type_id, units)?;
        Ok(items.into_iter().map(|item| self.give_or_drop(item)).collect())
    }

    /// Take an item out of the player's possession and put it on the ground.
    ///
    /// Returns `false` unless the item is somewhere under the player.
    pub fn drop_item(&mut self, item: ItemId) -> bool {
        if item == self.player || !self.world.is_ancestor_or_self(self.player, item) {
            return false;
        }
        self.world.detach(item, &mut self.events);
        self.ground.push(item);
        self.events.push(GameEvent::PlayerItemOperation);
        true
    }

    /// Destroy an item tree and forget its ground entries and buffs.
    pub fn destroy(&mut self, item: ItemId) -> Vec<ItemId> {
        let destroyed = self.world.destroy_tree(item, &mut self.events);
        self.ground.retain(|id| !destroyed.contains(id));
        for id in &destroyed {
            self.buffs.clear_target(&mut self.world, *id);
        }
        destroyed
    }

    /// Whether the player can pay a cost (account plus cash).
    #[must_use]
    pub fn is_enough(&self, cost: &Cost) -> bool {
        cost.is_enough(&self.economy, &self.world, self.player)
    }

    /// Pay a cost from the player's pools.
    pub fn pay(&mut self, cost: &Cost, sources: PaymentSources) -> bool {
        let paid = cost.pay(
            &mut self.economy,
            &mut self.world,
            self.player,
            sources,
            &mut self.events,
        );
        if paid && !cost.items.is_empty() {
            self.events.push(GameEvent::PlayerItemOperation);
        }
        paid
    }

    /// Refund or generate a cost.
    ///
    /// With [`ReturnTarget::PlayerInventory`] leftovers are dropped on the
    /// ground.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`]; nothing changes in that case.
    pub fn return_cost(&mut self, cost: &Cost, options: ReturnOptions) -> Result<ReturnReport> {
        let report = cost.return_items(
            &mut self.economy,
            &mut self.world,
            &self.catalog,
            options,
            &mut self.events,
        )?;
        self.ground.extend(report.leftovers.iter().copied());
        if matches!(options.target, ReturnTarget::PlayerInventory(_)) {
            self.events.push(GameEvent::PlayerItemOperation);
        }
        Ok(report)
    }

    /// Unlock a crafting formula.
    pub fn unlock_formula(&mut self, id: &str) -> bool {
        self.crafting.unlock_formula(id, &mut self.events)
    }

    /// Craft a formula and hand the results to the player.
    ///
    /// # Errors
    ///
    /// See [`CraftError`]; on error nothing changed.
    pub fn craft(&mut self, id: &str) -> std::result::Result<Vec<ItemId>, CraftError> {
        let items = self.crafting.craft(
            id,
            &mut self.economy,
            &mut self.world,
            &self.catalog,
            self.player,
            &mut self.events,
        )?;
        for item in &items {
            self.give_or_drop(*item);
        }
        Ok(items)
    }

    /// Check that a craft would go through, without paying.
    ///
    /// # Errors
    ///
    /// See [`CraftError`].
    pub fn check_craft(&self, id: &str) -> std::result::Result<CraftingResult, CraftError> {
        self.crafting
            .check_craft(id, &self.economy, &self.world, &self.catalog, self.player)
    }

    /// First half of a split craft: check and pay, without creating anything.
    ///
    /// Used by flows that load the result asynchronously; finish with
    /// [`GameState::complete_craft`].
    ///
    /// # Errors
    ///
    /// See [`CraftError`]; on error nothing changed.
    pub fn prepare_craft(&mut self, id: &str) -> std::result::Result<CraftingResult, CraftError> {
        self.crafting.prepare_craft(
            id,
            &mut self.economy,
            &mut self.world,
            &self.catalog,
            self.player,
            &mut self.events,
        )
    }

    /// Second half of a split craft: create `amount` units from an already
    /// loaded definition and hand them to the player.
    pub fn complete_craft(
        &mut self,
        formula: &str,
        definition: &ItemDefinition,
        amount: u32,
    ) -> Vec<ItemId> {
        let items: Vec<ItemId> = stack_sizes(amount, definition.max_stack_count)
            .into_iter()
            .map(|count| self.world.spawn(definition, count))
            .collect();
        record_crafted(formula, &items, &mut self.events);
        for item in &items {
            self.give_or_drop(*item);
        }
        items
    }

    /// Credit the bank account. Non-positive amounts are ignored.
    pub fn credit(&mut self, amount: i64) -> bool {
        self.economy.add(amount, &mut self.events)
    }

    /// Route generated root items; leftovers end up on the ground.
    pub fn deliver(&mut self, generated: Vec<ItemId>, target: ReturnTarget) -> ReturnReport {
        let report = deliver(&mut self.world, generated, target, &mut self.events);
        self.ground.extend(report.leftovers.iter().copied());
        report
    }

    /// Decompose an item, refunding into the player's inventory.
    ///
    /// # Errors
    ///
    /// See [`CraftError`]; on error nothing changed.
    pub fn decompose(&mut self, item: ItemId) -> std::result::Result<ReturnReport, CraftError> {
        let options = ReturnOptions {
            target: ReturnTarget::PlayerInventory(self.player),
            multiplier: 1,
        };
        let report = self.crafting.decompose(
            item,
            &mut self.economy,
            &mut self.world,
            &self.catalog,
            options,
            &mut self.events,
        )?;
        self.ground.retain(|id| self.world.contains(*id));
        self.ground.extend(report.leftovers.iter().copied());
        self.events.push(GameEvent::PlayerItemOperation);
        Ok(report)
    }

    /// Withdraw cash at the ATM. Returns the amount processed.
    ///
    /// # Errors
    ///
    /// See [`AtmError`]; on error nothing changed.
    pub fn atm_draw(&mut self, amount: i64) -> std::result::Result<i64, AtmError> {
        let withdrawal = self.atm.draw(
            amount,
            &mut self.economy,
            &mut self.world,
            &self.catalog,
            &mut self.events,
        )?;
        for cash in withdrawal.cash {
            self.give_or_drop(cash);
        }
        Ok(withdrawal.amount)
    }

    /// Deposit carried cash at the ATM.
    ///
    /// # Errors
    ///
    /// See [`AtmError`]; on error nothing changed.
    pub fn atm_save(&mut self, amount: i64) -> std::result::Result<i64, AtmError> {
        let saved = self.atm.save(
            amount,
            &mut self.economy,
            &mut self.world,
            self.player,
            &mut self.events,
        )?;
        self.events.push(GameEvent::PlayerItemOperation);
        Ok(saved)
    }

    /// Register a construction site, restoring its saved state if any.
    ///
    /// # Errors
    ///
    /// Fails if the saved state is corrupt.
    pub fn register_site(&mut self, mut site: ConstructionSite) -> Result<()> {
        site.load(&self.saves)?;
        self.sites.insert(site.id().to_string(), site);
        Ok(())
    }

    /// A construction site.
    #[must_use]
    pub fn site(&self, id: &str) -> Option<&ConstructionSite> {
        self.sites.get(id)
    }

    /// Build a site with the player's money and items.
    pub fn build_site(&mut self, id: &str) -> bool {
        let Some(site) = self.sites.get_mut(id) else {
            tracing::warn!(site = id, "Unknown construction site");
            return false;
        };
        site.try_build(
            &mut self.economy,
            &mut self.world,
            self.player,
            &mut self.events,
        )
    }

    /// Apply a buff to an item.
    pub fn add_buff(&mut self, target: ItemId, definition: &BuffDefinition) -> Option<BuffId> {
        self.buffs.add(&mut self.world, target, definition)
    }

    /// Remove a buff.
    pub fn remove_buff(&mut self, id: BuffId) -> bool {
        self.buffs.remove(&mut self.world, id)
    }

    /// Advance buff timers by one tick.
    pub fn tick_buffs(&mut self) -> Vec<BuffId> {
        self.buffs.tick(&mut self.world)
    }

    /// Write every subsystem's state into the save store.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be encoded.
    pub fn save_all(&mut self) -> Result<()> {
        self.economy.save(&mut self.saves)?;
        self.crafting.save(&mut self.saves)?;
        for site in self.sites.values() {
            site.save(&mut self.saves)?;
        }
        Ok(())
    }

    /// Restore every subsystem's state from the save store.
    ///
    /// # Errors
    ///
    /// Fails if a stored value is corrupt.
    pub fn load_all(&mut self) -> Result<()> {
        self.economy.load(&self.saves, &mut self.events)?;
        self.crafting.load(&self.saves)?;
        for site in self.sites.values_mut() {
            site.load(&self.saves)?;
        }
        Ok(())
    }

    /// Hash of the observable state.
    ///
    /// Two games driven by the same calls produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.economy.money().hash(&mut hasher);
        self.world.len().hash(&mut hasher);
        for item in self.world.iter() {
            item.id().hash(&mut hasher);
            item.type_id().hash(&mut hasher);
            item.stack_count().hash(&mut hasher);
            item.durability().to_bits().hash(&mut hasher);
            match item.parent() {
                None => 0u8.hash(&mut hasher),
                Some(ItemParent::Slot { owner, slot }) => {
                    1u8.hash(&mut hasher);
                    owner.hash(&mut hasher);
                    slot.hash(&mut hasher);
                }
                Some(ItemParent::Inventory { owner }) => {
                    2u8.hash(&mut hasher);
                    owner.hash(&mut hasher);
                }
            }
            if let Some(inventory) = item.inventory() {
                inventory.contents().hash(&mut hasher);
                inventory.cached_weight().to_bits().hash(&mut hasher);
            }
            for stat in item.stats().iter() {
                stat.value().to_bits().hash(&mut hasher);
            }
        }
        for id in self.crafting.unlocked_ids() {
            id.hash(&mut hasher);
        }
        self.ground.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crafting::CraftingFormula;
    use crate::events::EventBus;
    use std::cell::RefCell;
    use std::rc::Rc;

    const PLAYER: ItemTypeId = ItemTypeId(1);
    const CASH: ItemTypeId = ItemTypeId(451);
    const ORE: ItemTypeId = ItemTypeId(10);
    const BRICK: ItemTypeId = ItemTypeId(11);

    fn game(capacity: usize) -> GameState {
        let catalog: ItemCatalog = [
            ItemDefinition::new(PLAYER, "Duck").with_inventory(capacity),
            ItemDefinition::new(CASH, "Cash").with_max_stack(100_000),
            ItemDefinition::new(ORE, "Ore").with_max_stack(10),
            ItemDefinition::new(BRICK, "Brick"),
        ]
        .into_iter()
        .collect();
        let formulas = FormulaCollection::from_formulas([CraftingFormula::new(
            "Brick",
            Cost::money(10).with_item(ORE, 5),
            BRICK,
            1,
        )
        .unlocked_by_default()])
        .expect("unique");
        let config = GameConfig {
            starting_money: 100,
            cash_type: Some(CASH),
            player_type: PLAYER,
            ..GameConfig::default()
        };
        GameState::new(config, catalog, formulas).expect("valid setup")
    }

    #[test]
    fn test_player_without_inventory_rejected() {
        let catalog: ItemCatalog = [ItemDefinition::new(PLAYER, "Ghost")].into_iter().collect();
        let result = GameState::new(GameConfig::default(), catalog, FormulaCollection::new());
        assert!(matches!(result, Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_give_or_drop_falls_back_to_ground() {
        let mut state = game(1);
        let deliveries = state.give_new(ORE, 15).expect("registered");

        assert_eq!(deliveries[0], Delivery::Stored);
        assert!(matches!(deliveries[1], Delivery::Dropped(_)));
        assert_eq!(state.player_item_count(ORE), 10);
        assert_eq!(state.ground().count(), 1);
    }

    #[test]
    fn test_destroy_clears_buffs_on_the_tree() {
        let mut state = game(4);
        state.give_new(ORE, 3).expect("registered");
        let ore = state
            .world()
            .find_first(state.player(), ORE)
            .expect("carried");
        let player = state.player();
        let shine = BuffDefinition::new("Shine", None);
        let on_ore = state.add_buff(ore, &shine).expect("target exists");
        let on_player = state.add_buff(player, &shine).expect("target exists");

        state.destroy(ore);

        assert!(!state.buffs().is_active(on_ore));
        assert!(state.buffs().is_active(on_player));
        assert_eq!(state.buffs().len(), 1);
    }

    #[test]
    fn test_craft_hands_result_to_player() {
        let mut state = game(4);
        state.give_new(ORE, 6).expect("registered");

        let items = state.craft("Brick").expect("affordable");
        assert_eq!(items.len(), 1);
        assert_eq!(state.player_item_count(BRICK), 1);
        assert_eq!(state.player_item_count(ORE), 1);
        assert_eq!(state.economy().money(), 90);
    }

    #[test]
    fn test_events_reach_subscribers_after_mutation() {
        let mut state = game(4);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Rc::clone(&seen);
        bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        state.atm_draw(40).expect("covered");
        assert!(seen.borrow().is_empty());

        state.dispatch(&mut bus);
        let seen = seen.borrow();
        assert!(seen.contains(&GameEvent::MoneyChanged { old: 100, new: 60 }));
        assert!(seen.contains(&GameEvent::PlayerItemOperation));
        assert!(state.events().is_empty());
    }

    #[test]
    fn test_atm_round_trip() {
        let mut state = game(4);
        assert_eq!(state.atm_draw(70), Ok(70));
        assert_eq!(state.player_item_count(CASH), 70);
        assert_eq!(state.atm_save(30), Ok(30));
        assert_eq!(state.economy().money(), 60);
        assert_eq!(state.player_item_count(CASH), 40);
    }

    #[test]
    fn test_drop_item() {
        let mut state = game(4);
        state.give_new(ORE, 3).expect("registered");
        let ore = state.world().find_first(state.player(), ORE).expect("carried");

        assert!(state.drop_item(ore));
        assert!(!state.drop_item(ore));
        assert_eq!(state.ground().collect::<Vec<_>>(), vec![ore]);
        assert!(!state.drop_item(state.player()));
    }

    #[test]
    fn test_save_and_load_all() {
        let mut state = game(4);
        state
            .register_site(ConstructionSite::new("Workbench", Cost::money(50)))
            .expect("fresh store");
        assert!(state.build_site("Workbench"));
        state.save_all().expect("encodable");
        let saves = state.saves().clone();

        let mut fresh = game(4);
        fresh.set_saves(saves);
        fresh
            .register_site(ConstructionSite::new("Workbench", Cost::money(50)))
            .expect("decodable");
        fresh.load_all().expect("decodable");

        assert_eq!(fresh.economy().money(), 50);
        assert!(fresh.site("Workbench").is_some_and(ConstructionSite::is_built));
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut a = game(4);
        let mut b = game(4);
        assert_eq!(a.state_hash(), b.state_hash());

        a.give_new(ORE, 3).expect("registered");
        assert_ne!(a.state_hash(), b.state_hash());

        b.give_new(ORE, 3).expect("registered");
        assert_eq!(a.state_hash(), b.state_hash());
    }
}
