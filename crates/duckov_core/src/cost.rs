//! Prices: money plus item quantities.
//!
//! A [`Cost`] can be tested ([`Cost::is_enough`]), paid ([`Cost::pay`]) and
//! refunded or generated ([`Cost::return_items`]). Payment is atomic: every
//! requirement is checked before anything is debited.
//!
//! Money can come from two pools, the bank account ([`Economy`]) and
//! physical cash items carried by the holder. Cash is spent first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ItemCatalog, ItemTypeId};
use crate::economy::Economy;
use crate::error::{GameError, Result};
use crate::events::EventQueue;
use crate::item::{ItemId, ItemWorld};

/// One item line of a cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    /// Item type.
    pub type_id: ItemTypeId,
    /// Units required.
    pub amount: u32,
}

/// Money plus item requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    /// Money required.
    #[serde(default)]
    pub money: i64,
    /// Item lines.
    #[serde(default)]
    pub items: Vec<CostEntry>,
}

/// Which money pools a payment may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSources {
    /// Bank account balance.
    pub account: bool,
    /// Cash items in the holder's inventory.
    pub cash: bool,
}

impl PaymentSources {
    /// Account and cash.
    pub const ALL: Self = Self {
        account: true,
        cash: true,
    };
    /// Account only.
    pub const ACCOUNT: Self = Self {
        account: true,
        cash: false,
    };
    /// Cash only.
    pub const CASH: Self = Self {
        account: false,
        cash: true,
    };
}

impl Default for PaymentSources {
    fn default() -> Self {
        Self::ALL
    }
}

/// Where generated items go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnTarget {
    /// Hand the new root items back to the caller.
    #[default]
    Buffer,
    /// Merge into this holder's inventory.
    PlayerInventory(ItemId),
}

/// Options for [`Cost::return_items`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnOptions {
    /// Destination of generated items.
    pub target: ReturnTarget,
    /// Scales money and every item line.
    pub multiplier: u32,
}

impl Default for ReturnOptions {
    fn default() -> Self {
        Self {
            target: ReturnTarget::Buffer,
            multiplier: 1,
        }
    }
}

/// What a return produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnReport {
    /// Money credited to the account.
    pub money: i64,
    /// New root items (buffer target).
    pub generated: Vec<ItemId>,
    /// Items that did not fit in the inventory and remain roots.
    pub leftovers: Vec<ItemId>,
}

/// Split of a money amount across the two pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MoneySplit {
    cash: u32,
    account: i64,
}

impl Cost {
    /// Money-only cost.
    #[must_use]
    pub fn money(money: i64) -> Self {
        Self {
            money,
            items: Vec::new(),
        }
    }

    /// Add an item line.
    #[must_use]
    pub fn with_item(mut self, type_id: ItemTypeId, amount: u32) -> Self {
        self.items.push(CostEntry { type_id, amount });
        self
    }

    /// Whether the cost requires nothing.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.money <= 0 && self.items.iter().all(|entry| entry.amount == 0)
    }

    fn cash_held(economy: &Economy, world: &ItemWorld, holder: ItemId) -> u32 {
        economy
            .cash_type()
            .map_or(0, |cash| world.item_count(holder, cash))
    }

    fn split_money(
        &self,
        economy: &Economy,
        world: &ItemWorld,
        holder: ItemId,
        sources: PaymentSources,
    ) -> Option<MoneySplit> {
        let needed = self.money.max(0);
        // Cash named by an item line is not available as money.
        let cash_available = match economy.cash_type() {
            Some(cash) if sources.cash => {
                Self::cash_held(economy, world, holder).saturating_sub(self.units_of(cash))
            }
            _ => 0,
        };
        let cash = i64::from(cash_available).min(needed);
        let account = needed - cash;
        if account > 0 && (!sources.account || !economy.can_afford(account)) {
            return None;
        }
        Some(MoneySplit {
            cash: u32::try_from(cash).unwrap_or(cash_available),
            account,
        })
    }

    /// Units needed per type, including cash spent as money.
    fn item_requirements(&self, cash_type: Option<ItemTypeId>, cash: u32) -> BTreeMap<ItemTypeId, u32> {
        let mut required = BTreeMap::new();
        for entry in &self.items {
            let total = required.entry(entry.type_id).or_insert(0u32);
            *total = total.saturating_add(entry.amount);
        }
        if let Some(cash_type) = cash_type.filter(|_| cash > 0) {
            let total = required.entry(cash_type).or_insert(0u32);
            *total = total.saturating_add(cash);
        }
        required
    }

    /// Units of one type across every item line.
    fn units_of(&self, type_id: ItemTypeId) -> u32 {
        self.items
            .iter()
            .filter(|entry| entry.type_id == type_id)
            .fold(0u32, |total, entry| total.saturating_add(entry.amount))
    }

    /// Whether every item line is carried, on top of `cash_spent` cash units
    /// used as money.
    fn items_available(&self, economy: &Economy, world: &ItemWorld, holder: ItemId, cash_spent: u32) -> bool {
        let cash_type = economy.cash_type();
        self.items.iter().all(|entry| {
            let mut needed = self.units_of(entry.type_id);
            if cash_type == Some(entry.type_id) {
                needed = needed.saturating_add(cash_spent);
            }
            world.item_count(holder, entry.type_id) >= needed
        })
    }

    /// Whether [`Cost::pay`] from both the account and cash would succeed.
    ///
    /// Pure: nothing is modified.
    #[must_use]
    pub fn is_enough(&self, economy: &Economy, world: &ItemWorld, holder: ItemId) -> bool {
        self.split_money(economy, world, holder, PaymentSources::ALL)
            .is_some_and(|split| self.items_available(economy, world, holder, split.cash))
    }

    /// Debit the cost from the selected pools.
    ///
    /// Cash is used before the account. If the selected pools cannot cover
    /// the money, or any item line is short, nothing is debited and `false`
    /// is returned.
    pub fn pay(
        &self,
        economy: &mut Economy,
        world: &mut ItemWorld,
        holder: ItemId,
        sources: PaymentSources,
        events: &mut EventQueue,
    ) -> bool {
        let Some(split) = self.split_money(economy, world, holder, sources) else {
            tracing::debug!(money = self.money, "Payment refused, not enough money");
            return false;
        };

        if !self.items_available(economy, world, holder, split.cash) {
            tracing::debug!(holder = %holder, "Payment refused, missing items");
            return false;
        }

        let required = self.item_requirements(economy.cash_type(), split.cash);

        for (type_id, amount) in &required {
            world.consume(holder, *type_id, *amount, events);
        }
        economy.pay(split.account, events);
        true
    }

    /// Units generated per type for a given multiplier.
    #[must_use]
    pub fn plan_return(&self, multiplier: u32) -> Vec<(ItemTypeId, u32)> {
        self.items
            .iter()
            .map(|entry| (entry.type_id, entry.amount.saturating_mul(multiplier)))
            .filter(|(_, units)| *units > 0)
            .collect()
    }

    /// Refund or generate the cost.
    ///
    /// Credits `money × multiplier` to the account and creates exactly
    /// `amount × multiplier` units per item line, as max-size stacks.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownItemType`] if a line refers to an
    /// unregistered type. This is checked up front; nothing is credited or
    /// created in that case.
    pub fn return_items(
        &self,
        economy: &mut Economy,
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        options: ReturnOptions,
        events: &mut EventQueue,
    ) -> Result<ReturnReport> {
        if let Some(missing) = self.items.iter().find(|entry| !catalog.contains(entry.type_id)) {
            return Err(GameError::UnknownItemType(missing.type_id));
        }

        let mut generated = Vec::new();
        for (type_id, units) in self.plan_return(options.multiplier) {
            generated.extend(world.instantiate_units(catalog, type_id, units)?);
        }

        let money = self.money.max(0).saturating_mul(i64::from(options.multiplier));
        economy.add(money, events);

        let mut report = deliver(world, generated, options.target, events);
        report.money = money;
        Ok(report)
    }
}

/// Route freshly generated roots to their destination.
///
/// With [`ReturnTarget::PlayerInventory`] each item is merged into the
/// holder's inventory and anything that does not fit is reported as a
/// leftover.
pub fn deliver(
    world: &mut ItemWorld,
    generated: Vec<ItemId>,
    target: ReturnTarget,
    events: &mut EventQueue,
) -> ReturnReport {
    let mut report = ReturnReport::default();
    match target {
        ReturnTarget::Buffer => report.generated = generated,
        ReturnTarget::PlayerInventory(holder) => {
            for item in generated {
                match world.add_and_merge(holder, item, events) {
                    Ok(outcome) => report.leftovers.extend(outcome.leftover),
                    Err(err) => {
                        tracing::warn!(holder = %holder, item = %item, error = %err, "Could not store returned item");
                        report.leftovers.push(item);
                    }
                }
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemDefinition;
    use crate::item::Item;

    const CASH: ItemTypeId = ItemTypeId(451);
    const ORE: ItemTypeId = ItemTypeId(10);

    struct Fixture {
        world: ItemWorld,
        catalog: ItemCatalog,
        economy: Economy,
        player: ItemId,
        events: EventQueue,
    }

    fn fixture(money: i64, cash: u32, ore: u32) -> Fixture {
        let catalog: ItemCatalog = [
            ItemDefinition::new(CASH, "Cash").with_max_stack(1000),
            ItemDefinition::new(ORE, "Ore").with_max_stack(10),
            ItemDefinition::new(ItemTypeId(1), "Player").with_inventory(16),
        ]
        .into_iter()
        .collect();
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let player = world.instantiate(&catalog, ItemTypeId(1), 1).expect("registered");
        for (type_id, units) in [(CASH, cash), (ORE, ore)] {
            for stack in world.instantiate_units(&catalog, type_id, units).expect("registered") {
                world.add_item(player, stack, &mut events).expect("room");
            }
        }
        events.drain();
        Fixture {
            world,
            catalog,
            economy: Economy::new(money, Some(CASH)),
            player,
            events,
        }
    }

    #[test]
    fn test_is_enough_counts_account_and_cash() {
        let f = fixture(60, 50, 3);
        assert!(Cost::money(110).is_enough(&f.economy, &f.world, f.player));
        assert!(!Cost::money(111).is_enough(&f.economy, &f.world, f.player));
        assert!(Cost::money(0).with_item(ORE, 3).is_enough(&f.economy, &f.world, f.player));
        assert!(!Cost::money(0).with_item(ORE, 4).is_enough(&f.economy, &f.world, f.player));
    }

    #[test]
    fn test_cash_item_line_is_not_spent_twice() {
        let mut f = fixture(0, 50, 0);
        let cost = Cost::money(40).with_item(CASH, 20);

        assert!(!cost.is_enough(&f.economy, &f.world, f.player));
        assert!(!cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ALL, &mut f.events));
        assert_eq!(f.world.item_count(f.player, CASH), 50);

        let mut f = fixture(10, 50, 0);
        assert!(cost.is_enough(&f.economy, &f.world, f.player));
        assert!(cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ALL, &mut f.events));
        assert_eq!(f.world.item_count(f.player, CASH), 0);
        assert_eq!(f.economy.money(), 0);
    }

    #[test]
    fn test_pay_spends_cash_first() {
        let mut f = fixture(100, 30, 0);
        let cost = Cost::money(50);

        assert!(cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ALL, &mut f.events));
        assert_eq!(f.world.item_count(f.player, CASH), 0);
        assert_eq!(f.economy.money(), 80);
    }

    #[test]
    fn test_pay_respects_sources() {
        let mut f = fixture(100, 30, 0);
        let cost = Cost::money(50);

        assert!(!cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::CASH, &mut f.events));
        assert!(cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ACCOUNT, &mut f.events));
        assert_eq!(f.world.item_count(f.player, CASH), 30);
        assert_eq!(f.economy.money(), 50);
    }

    #[test]
    fn test_failed_pay_changes_nothing() {
        let mut f = fixture(150, 0, 1);
        let cost = Cost::money(100).with_item(ORE, 2);

        assert!(!cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ALL, &mut f.events));
        assert_eq!(f.economy.money(), 150);
        assert_eq!(f.world.item_count(f.player, ORE), 1);
        assert!(f.events.is_empty());
    }

    #[test]
    fn test_pay_items_and_money() {
        let mut f = fixture(150, 0, 13);
        let cost = Cost::money(100).with_item(ORE, 12);

        assert!(cost.pay(&mut f.economy, &mut f.world, f.player, PaymentSources::ALL, &mut f.events));
        assert_eq!(f.economy.money(), 50);
        assert_eq!(f.world.item_count(f.player, ORE), 1);
    }

    #[test]
    fn test_return_to_buffer() {
        let mut f = fixture(0, 0, 0);
        let cost = Cost::money(10).with_item(ORE, 7);
        let options = ReturnOptions {
            target: ReturnTarget::Buffer,
            multiplier: 3,
        };

        let report = cost
            .return_items(&mut f.economy, &mut f.world, &f.catalog, options, &mut f.events)
            .expect("known types");

        assert_eq!(report.money, 30);
        assert_eq!(f.economy.money(), 30);
        let stacks: Vec<u32> = report
            .generated
            .iter()
            .filter_map(|id| f.world.get(*id).map(Item::stack_count))
            .collect();
        assert_eq!(stacks, vec![10, 10, 1]);
        assert!(report.generated.iter().all(|id| f.world.get(*id).is_some_and(Item::is_root)));
    }

    #[test]
    fn test_return_to_inventory_merges() {
        let mut f = fixture(0, 0, 5);
        let cost = Cost::money(0).with_item(ORE, 8);
        let options = ReturnOptions {
            target: ReturnTarget::PlayerInventory(f.player),
            multiplier: 1,
        };

        let report = cost
            .return_items(&mut f.economy, &mut f.world, &f.catalog, options, &mut f.events)
            .expect("known types");

        assert!(report.leftovers.is_empty());
        assert_eq!(f.world.item_count(f.player, ORE), 13);
    }

    #[test]
    fn test_return_unknown_type_is_atomic() {
        let mut f = fixture(0, 0, 0);
        let cost = Cost::money(10).with_item(ORE, 1).with_item(ItemTypeId(999), 1);
        let before = f.world.len();

        let result = cost.return_items(
            &mut f.economy,
            &mut f.world,
            &f.catalog,
            ReturnOptions::default(),
            &mut f.events,
        );
        assert!(matches!(result, Err(GameError::UnknownItemType(ItemTypeId(999)))));
        assert_eq!(f.world.len(), before);
        assert_eq!(f.economy.money(), 0);
    }
}
