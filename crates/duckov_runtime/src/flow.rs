//! Cancellation and waiting for UI flows.
//!
//! A [`FlowTokens`] counter hands out tokens. Starting a new flow with
//! [`FlowTokens::begin`] makes every earlier token stale; flows call
//! [`FlowToken::checkpoint`] after each suspension point and bail out with
//! [`RuntimeError::Cancelled`] once they are superseded.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::{Result, RuntimeError};

/// Generation counter shared by all tokens of one flow family.
#[derive(Debug, Clone, Default)]
pub struct FlowTokens {
    generation: Rc<Cell<u64>>,
}

impl FlowTokens {
    /// Create a counter at generation zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new flow, invalidating every earlier token.
    pub fn begin(&self) -> FlowToken {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        FlowToken {
            generation: Rc::clone(&self.generation),
            issued: generation,
        }
    }

    /// Invalidate every outstanding token without starting a flow.
    pub fn cancel_all(&self) {
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }
}

/// Proof that a flow is still the latest one.
#[derive(Debug, Clone)]
pub struct FlowToken {
    generation: Rc<Cell<u64>>,
    issued: u64,
}

impl FlowToken {
    /// Whether no newer flow has started.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.generation.get() == self.issued
    }

    /// `Err(Cancelled)` once superseded.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Cancelled`] if the token is stale.
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(RuntimeError::Cancelled)
        }
    }
}

/// Sleep, then check the token.
///
/// # Errors
///
/// Returns [`RuntimeError::Cancelled`] if the flow was superseded meanwhile.
pub async fn delay(duration: Duration, token: &FlowToken) -> Result<()> {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
    token.checkpoint()
}

/// Poll `condition` every `poll_interval` until it holds.
///
/// # Errors
///
/// Returns [`RuntimeError::Cancelled`] as soon as the flow is superseded.
pub async fn wait_until(
    mut condition: impl FnMut() -> bool,
    poll_interval: Duration,
    token: &FlowToken,
) -> Result<()> {
    loop {
        token.checkpoint()?;
        if condition() {
            return Ok(());
        }
        tokio::time::sleep(poll_interval).await;
    }
}
