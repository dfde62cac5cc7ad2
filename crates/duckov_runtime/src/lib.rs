//! # Duckov Runtime
//!
//! Single-threaded async layer over `duckov_core`.
//!
//! Everything runs on a tokio current-thread runtime. The game lives in a
//! [`SharedState`] (`Rc<RefCell<GameState>>`); flows borrow it only between
//! suspension points, never across an `.await`.
//!
//! - [`assets`] - Async item definition loading
//! - [`crafting`] / [`cost`] - Crafting and refunds with awaited loads
//! - [`atm`] - ATM panel flows guarded by a busy flag
//! - [`flow`] - Cancellation tokens, delays and polling

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod assets;
pub mod atm;
pub mod cost;
pub mod crafting;
pub mod flow;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use duckov_core::atm::AtmError;
use duckov_core::crafting::CraftError;
use duckov_core::error::GameError;
use duckov_core::state::GameState;
use thiserror::Error;

/// The game as seen by async flows.
pub type SharedState = Rc<RefCell<GameState>>;

/// Wrap a game for use by flows.
#[must_use]
pub fn share(state: GameState) -> SharedState {
    Rc::new(RefCell::new(state))
}

/// Why an async flow stopped.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A newer flow superseded this one.
    #[error("Flow cancelled")]
    Cancelled,
    /// Another flow of the same panel is still running.
    #[error("Busy")]
    Busy,
    /// Engine or content failure.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Crafting refused.
    #[error(transparent)]
    Craft(#[from] CraftError),
    /// ATM refused.
    #[error(transparent)]
    Atm(#[from] AtmError),
}

/// Result type alias using [`RuntimeError`].
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Timing for runtime flows.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Time a craft takes between paying and receiving the result.
    pub craft_delay: Duration,
    /// Time an ATM transaction takes before it is committed.
    pub atm_delay: Duration,
    /// Poll interval for [`flow::wait_until`].
    pub poll_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            craft_delay: Duration::from_millis(500),
            atm_delay: Duration::from_millis(200),
            poll_interval: Duration::from_millis(16),
        }
    }
}

/// Build the current-thread runtime flows are meant to run on.
///
/// # Errors
///
/// Fails if the OS refuses to create the runtime's timer or IO driver.
pub fn build_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
}
