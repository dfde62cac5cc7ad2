//! # Duckov Core
//!
//! Deterministic item composition engine: items that nest through slots and
//! inventories, stats with ordered modifiers, costs, crafting and the bank.
//!
//! This crate contains **only** synchronous, deterministic logic:
//! - No rendering or UI
//! - No global state (everything lives in [`state::GameState`] or is passed in)
//! - No floating-point math (uses fixed-point)
//! - Events are queued and delivered explicitly
//!
//! Async flows (loading, timed crafting, ATM panels) live in `duckov_runtime`.
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Item type definitions and tags
//! - [`item`] - Item instances and the ownership arena
//! - [`slot`] / [`inventory`] - The two ways items hold other items
//! - [`stat`] / [`buff`] - Stats, modifiers and timed buffs
//! - [`cost`] / [`economy`] / [`atm`] - Money and paying for things
//! - [`crafting`] / [`construction`] - What costs buy
//! - [`saves`] - Keyed binary save store
//! - [`data`] - RON content and configuration

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod atm;
pub mod buff;
pub mod catalog;
pub mod construction;
pub mod cost;
pub mod crafting;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod inventory;
pub mod item;
pub mod math;
pub mod saves;
pub mod slot;
pub mod stat;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::atm::{Atm, AtmError, Withdrawal, MAX_DRAW_AMOUNT};
    pub use crate::buff::{BuffController, BuffDefinition, BuffId};
    pub use crate::catalog::{ItemCatalog, ItemDefinition, ItemTypeId, SlotDefinition, Tag};
    pub use crate::construction::ConstructionSite;
    pub use crate::cost::{
        Cost, CostEntry, PaymentSources, ReturnOptions, ReturnReport, ReturnTarget,
    };
    pub use crate::crafting::{
        CraftError, CraftingFormula, CraftingManager, CraftingResult, FormulaCollection,
    };
    pub use crate::data::{ContentPack, GameConfig};
    pub use crate::economy::Economy;
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventBus, EventQueue, GameEvent};
    pub use crate::inventory::{Inventory, InventoryError, MergeOutcome};
    pub use crate::item::{Item, ItemId, ItemParent, ItemWorld};
    pub use crate::math::Fixed;
    pub use crate::saves::SaveStore;
    pub use crate::slot::{PlugError, PlugOutcome, Slot};
    pub use crate::stat::{Modifier, ModifierKind, ModifierSource, Stat, StatCollection, StatKey};
    pub use crate::state::{Delivery, GameState};
}
