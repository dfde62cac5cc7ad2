//! Bank terminal: move money between the account and physical cash.

use thiserror::Error;

use crate::catalog::{ItemCatalog, ItemTypeId};
use crate::economy::Economy;
use crate::events::EventQueue;
use crate::item::{ItemId, ItemWorld};

/// Largest amount a single draw processes.
pub const MAX_DRAW_AMOUNT: i64 = 10_000_000;

/// Why an ATM transaction was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtmError {
    /// Zero or negative amount.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),
    /// The account cannot cover the draw.
    #[error("Insufficient funds: requested {requested}, balance {balance}")]
    InsufficientFunds {
        /// Clamped amount requested.
        requested: i64,
        /// Account balance.
        balance: i64,
    },
    /// The holder does not carry enough cash to deposit.
    #[error("Insufficient cash: requested {requested}, carried {carried}")]
    InsufficientCash {
        /// Amount requested.
        requested: i64,
        /// Cash carried.
        carried: u32,
    },
    /// No cash item type is configured or registered.
    #[error("Cash item type is not available")]
    NoCashType,
}

/// Result of a successful draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Amount actually processed after clamping.
    pub amount: i64,
    /// Freshly created cash stacks, as roots.
    pub cash: Vec<ItemId>,
}

/// Clamp a requested draw to `max`.
#[must_use]
pub fn clamp_draw(amount: i64, max: i64) -> i64 {
    amount.min(max)
}

/// Terminal settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atm {
    max_draw: i64,
}

impl Default for Atm {
    fn default() -> Self {
        Self::new(MAX_DRAW_AMOUNT)
    }
}

impl Atm {
    /// Create a terminal with a per-draw cap.
    #[must_use]
    pub const fn new(max_draw: i64) -> Self {
        Self { max_draw }
    }

    /// Per-draw cap.
    #[must_use]
    pub const fn max_draw(&self) -> i64 {
        self.max_draw
    }

    fn cash_type(economy: &Economy, catalog: &ItemCatalog) -> Result<ItemTypeId, AtmError> {
        economy
            .cash_type()
            .filter(|cash| catalog.contains(*cash))
            .ok_or(AtmError::NoCashType)
    }

    /// Withdraw from the account as cash items.
    ///
    /// The amount is clamped to the per-draw cap first. The account is
    /// debited and the cash is created as root stacks; the caller decides
    /// where they go.
    ///
    /// # Errors
    ///
    /// Refuses non-positive amounts, amounts the account cannot cover, and
    /// setups without a registered cash type. Nothing changes on error.
    pub fn draw(
        &self,
        amount: i64,
        economy: &mut Economy,
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        events: &mut EventQueue,
    ) -> Result<Withdrawal, AtmError> {
        let amount = clamp_draw(amount, self.max_draw);
        if amount <= 0 {
            return Err(AtmError::InvalidAmount(amount));
        }
        let cash_type = Self::cash_type(economy, catalog)?;
        if !economy.can_afford(amount) {
            return Err(AtmError::InsufficientFunds {
                requested: amount,
                balance: economy.money(),
            });
        }
        let units = u32::try_from(amount).map_err(|_| AtmError::InvalidAmount(amount))?;
        let cash = world
            .instantiate_units(catalog, cash_type, units)
            .map_err(|_| AtmError::NoCashType)?;

        economy.pay(amount, events);
        tracing::info!(amount, stacks = cash.len(), "ATM draw");
        Ok(Withdrawal { amount, cash })
    }

    /// Deposit cash carried by `holder` into the account.
    ///
    /// # Errors
    ///
    /// Refuses non-positive amounts and amounts above what the holder
    /// carries. Nothing changes on error.
    pub fn save(
        &self,
        amount: i64,
        economy: &mut Economy,
        world: &mut ItemWorld,
        holder: ItemId,
        events: &mut EventQueue,
    ) -> Result<i64, AtmError> {
        if amount <= 0 {
            return Err(AtmError::InvalidAmount(amount));
        }
        let cash_type = economy.cash_type().ok_or(AtmError::NoCashType)?;
        let carried = world.item_count(holder, cash_type);
        let units = u32::try_from(amount)
            .ok()
            .filter(|units| *units <= carried)
            .ok_or(AtmError::InsufficientCash {
                requested: amount,
                carried,
            })?;

        world.consume(holder, cash_type, units, events);
        economy.add(amount, events);
        tracing::info!(amount, "ATM save");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemDefinition;
    use crate::item::Item;

    const CASH: ItemTypeId = ItemTypeId(451);

    fn catalog() -> ItemCatalog {
        [
            ItemDefinition::new(CASH, "Cash").with_max_stack(1_000_000),
            ItemDefinition::new(ItemTypeId(1), "Player").with_inventory(32),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_clamp_draw() {
        assert_eq!(clamp_draw(20_000_000, MAX_DRAW_AMOUNT), 10_000_000);
        assert_eq!(clamp_draw(500, MAX_DRAW_AMOUNT), 500);
    }

    #[test]
    fn test_draw_clamps_to_max() {
        let catalog = catalog();
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let mut economy = Economy::new(25_000_000, Some(CASH));

        let withdrawal = Atm::default()
            .draw(20_000_000, &mut economy, &mut world, &catalog, &mut events)
            .expect("covered");

        assert_eq!(withdrawal.amount, 10_000_000);
        assert_eq!(economy.money(), 15_000_000);
        let units: u32 = withdrawal
            .cash
            .iter()
            .filter_map(|id| world.get(*id).map(Item::stack_count))
            .sum();
        assert_eq!(units, 10_000_000);
    }

    #[test]
    fn test_draw_refusals() {
        let catalog = catalog();
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let mut economy = Economy::new(100, Some(CASH));
        let atm = Atm::default();

        assert_eq!(
            atm.draw(0, &mut economy, &mut world, &catalog, &mut events),
            Err(AtmError::InvalidAmount(0))
        );
        assert_eq!(
            atm.draw(101, &mut economy, &mut world, &catalog, &mut events),
            Err(AtmError::InsufficientFunds {
                requested: 101,
                balance: 100
            })
        );
        let mut no_cash = Economy::new(100, None);
        assert_eq!(
            atm.draw(10, &mut no_cash, &mut world, &catalog, &mut events),
            Err(AtmError::NoCashType)
        );
        assert!(world.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_save_moves_cash_to_account() {
        let catalog = catalog();
        let mut world = ItemWorld::new();
        let mut events = EventQueue::new();
        let mut economy = Economy::new(0, Some(CASH));
        let player = world.instantiate(&catalog, ItemTypeId(1), 1).expect("registered");
        let cash = world.instantiate(&catalog, CASH, 500).expect("registered");
        world.add_item(player, cash, &mut events).expect("room");
        let atm = Atm::default();

        assert_eq!(
            atm.save(501, &mut economy, &mut world, player, &mut events),
            Err(AtmError::InsufficientCash {
                requested: 501,
                carried: 500
            })
        );
        assert_eq!(atm.save(200, &mut economy, &mut world, player, &mut events), Ok(200));
        assert_eq!(economy.money(), 200);
        assert_eq!(world.item_count(player, CASH), 300);
    }
}
