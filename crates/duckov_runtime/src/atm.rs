//! ATM panel flows.
//!
//! A panel runs one transaction at a time. The busy flag is set for the whole
//! flow and cleared by a drop guard, so a failed or cancelled transaction
//! never leaves the panel stuck.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::flow::{self, FlowToken, FlowTokens};
use crate::{Result, RuntimeError, SharedState};

/// Clears the busy flag when dropped.
struct BusyGuard {
    busy: Rc<Cell<bool>>,
}

impl BusyGuard {
    fn acquire(busy: &Rc<Cell<bool>>) -> Result<Self> {
        if busy.replace(true) {
            return Err(RuntimeError::Busy);
        }
        Ok(Self {
            busy: Rc::clone(busy),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

/// An ATM screen bound to a game.
#[derive(Debug, Clone)]
pub struct AtmPanel {
    state: SharedState,
    busy: Rc<Cell<bool>>,
    tokens: FlowTokens,
    delay: Duration,
}

impl AtmPanel {
    /// Create a panel whose transactions take `delay` to commit.
    #[must_use]
    pub fn new(state: SharedState, delay: Duration) -> Self {
        Self {
            state,
            busy: Rc::new(Cell::new(false)),
            tokens: FlowTokens::new(),
            delay,
        }
    }

    /// Whether a transaction is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Abort the running transaction before it commits.
    pub fn close(&self) {
        self.tokens.cancel_all();
    }

    /// Withdraw cash into the player's inventory. Returns the amount
    /// processed after clamping.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Busy`] while another transaction runs,
    /// [`RuntimeError::Cancelled`] if the panel was closed first, or the
    /// ATM's own refusal.
    pub async fn draw(&self, amount: i64) -> Result<i64> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let token = self.tokens.begin();
        self.commit(&token).await?;

        let result = self.state.borrow_mut().atm_draw(amount);
        result.map_err(|err| {
            tracing::error!(amount, error = %err, "ATM draw failed");
            err.into()
        })
    }

    /// Deposit carried cash. Returns the amount deposited.
    ///
    /// # Errors
    ///
    /// Same as [`AtmPanel::draw`].
    pub async fn save(&self, amount: i64) -> Result<i64> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let token = self.tokens.begin();
        self.commit(&token).await?;

        let result = self.state.borrow_mut().atm_save(amount);
        result.map_err(|err| {
            tracing::error!(amount, error = %err, "ATM save failed");
            err.into()
        })
    }

    async fn commit(&self, token: &FlowToken) -> Result<()> {
        flow::delay(self.delay, token).await.map_err(|err| {
            tracing::debug!("ATM transaction cancelled");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share;
    use duckov_core::atm::AtmError;
    use duckov_test_utils::fixtures::{new_game, CASH};

    fn panel(money: i64) -> AtmPanel {
        AtmPanel::new(share(new_game(money)), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_draw_and_save() {
        let panel = panel(1_000);

        assert_eq!(panel.draw(300).await.expect("covered"), 300);
        assert_eq!(panel.save(100).await.expect("carried"), 100);

        let state = panel.state.borrow();
        assert_eq!(state.economy().money(), 800);
        assert_eq!(state.player_item_count(CASH), 200);
        assert!(!panel.is_busy());
    }

    #[tokio::test]
    async fn test_second_transaction_is_refused_while_busy() {
        let panel = panel(1_000);

        let (first, second) = tokio::join!(panel.draw(100), panel.draw(100));

        assert_eq!(first.expect("first runs"), 100);
        assert!(matches!(second, Err(RuntimeError::Busy)));
        assert_eq!(panel.state.borrow().economy().money(), 900);
    }

    #[tokio::test]
    async fn test_failure_clears_busy_flag() {
        let panel = panel(50);

        let result = panel.draw(100).await;

        assert!(matches!(
            result,
            Err(RuntimeError::Atm(AtmError::InsufficientFunds { .. }))
        ));
        assert!(!panel.is_busy());
        assert_eq!(panel.draw(50).await.expect("covered"), 50);
    }

    #[tokio::test]
    async fn test_close_cancels_pending_transaction() {
        let panel = panel(1_000);

        let (result, ()) = tokio::join!(panel.draw(100), async { panel.close() });

        assert!(matches!(result, Err(RuntimeError::Cancelled)));
        assert!(!panel.is_busy());
        assert_eq!(panel.state.borrow().economy().money(), 1_000);
    }
}
