//! Player money.
//!
//! The account balance is a plain integer ledger. Physical cash is an item
//! type (see [`Economy::cash_type`]); counting and spending it is the job of
//! [`crate::cost`], which combines both pools.

use serde::{Deserialize, Serialize};

use crate::catalog::ItemTypeId;
use crate::error::Result;
use crate::events::{EventQueue, GameEvent};
use crate::saves::{keys, SaveStore};

/// Persisted form of the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EconomyData {
    /// Account balance.
    pub money: i64,
}

/// The player's bank account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Economy {
    money: i64,
    cash_type: Option<ItemTypeId>,
}

impl Economy {
    /// Create an account with a starting balance.
    #[must_use]
    pub const fn new(money: i64, cash_type: Option<ItemTypeId>) -> Self {
        Self { money, cash_type }
    }

    /// Current balance.
    #[must_use]
    pub const fn money(&self) -> i64 {
        self.money
    }

    /// Item type whose stack count represents physical money.
    #[must_use]
    pub const fn cash_type(&self) -> Option<ItemTypeId> {
        self.cash_type
    }

    /// Check if the balance covers `amount`.
    #[must_use]
    pub const fn can_afford(&self, amount: i64) -> bool {
        self.money >= amount
    }

    fn change(&mut self, new: i64, events: &mut EventQueue) {
        let old = self.money;
        if old == new {
            return;
        }
        self.money = new;
        events.push(GameEvent::MoneyChanged { old, new });
    }

    /// Deposit money.
    ///
    /// Returns false (and does nothing) for non-positive amounts.
    pub fn add(&mut self, amount: i64, events: &mut EventQueue) -> bool {
        if amount <= 0 {
            return false;
        }
        self.change(self.money.saturating_add(amount), events);
        true
    }

    /// Withdraw money if the balance covers it.
    ///
    /// Returns true if the transaction succeeded. Paying zero always
    /// succeeds; negative amounts are refused.
    pub fn pay(&mut self, amount: i64, events: &mut EventQueue) -> bool {
        if amount < 0 || !self.can_afford(amount) {
            return false;
        }
        self.change(self.money - amount, events);
        true
    }

    /// Set the balance directly. Negative values are clamped to zero.
    pub fn set_money(&mut self, money: i64, events: &mut EventQueue) {
        if money < 0 {
            tracing::warn!(money, "Refusing negative balance, clamping to 0");
        }
        self.change(money.max(0), events);
    }

    /// Persist the balance.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails.
    pub fn save(&self, store: &mut SaveStore) -> Result<()> {
        store.save(keys::ECONOMY, &EconomyData { money: self.money })
    }

    /// Restore the balance. Returns `false` if nothing was saved.
    ///
    /// # Errors
    ///
    /// Fails if the stored value is corrupt.
    pub fn load(&mut self, store: &SaveStore, events: &mut EventQueue) -> Result<bool> {
        match store.load::<EconomyData>(keys::ECONOMY)? {
            Some(data) => {
                self.set_money(data.money, events);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_economy_add_and_pay() {
        let mut economy = Economy::new(100, None);
        let mut events = EventQueue::new();

        assert!(economy.add(50, &mut events));
        assert!(economy.pay(120, &mut events));
        assert_eq!(economy.money(), 30);

        // Can't overspend
        assert!(!economy.pay(31, &mut events));
        assert_eq!(economy.money(), 30);

        assert_eq!(
            events.drain(),
            vec![
                GameEvent::MoneyChanged { old: 100, new: 150 },
                GameEvent::MoneyChanged { old: 150, new: 30 },
            ]
        );
    }

    #[test]
    fn test_economy_rejects_non_positive_add() {
        let mut economy = Economy::new(10, None);
        let mut events = EventQueue::new();

        assert!(!economy.add(0, &mut events));
        assert!(!economy.add(-5, &mut events));
        assert!(!economy.pay(-5, &mut events));
        assert_eq!(economy.money(), 10);
        assert!(events.is_empty());
    }

    #[test]
    fn test_set_money_clamps() {
        let mut economy = Economy::new(10, None);
        let mut events = EventQueue::new();
        economy.set_money(-3, &mut events);
        assert_eq!(economy.money(), 0);
    }

    #[test]
    fn test_economy_save_load() {
        let mut store = SaveStore::new();
        let mut events = EventQueue::new();
        Economy::new(777, None).save(&mut store).expect("encodable");

        let mut restored = Economy::new(0, None);
        assert!(restored.load(&store, &mut events).expect("decodable"));
        assert_eq!(restored.money(), 777);
        assert_eq!(events.len(), 1);

        let mut untouched = Economy::new(5, None);
        assert!(!untouched.load(&SaveStore::new(), &mut events).expect("empty store"));
        assert_eq!(untouched.money(), 5);
    }
}
