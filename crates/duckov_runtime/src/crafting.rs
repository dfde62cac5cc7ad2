//! Timed crafting.
//!
//! The result definition is loaded before anything is paid. The cost is then
//! paid, the craft takes `craft_delay`, and the items are handed to the
//! player at the end.

use std::time::Duration;

use duckov_core::item::ItemId;

use crate::assets::AssetLoader;
use crate::{Result, SharedState};

/// Craft `formula` for the player.
///
/// # Errors
///
/// Any [`duckov_core::crafting::CraftError`] or loader failure is returned
/// before anything is paid.
pub async fn craft<L: AssetLoader>(
    state: &SharedState,
    loader: &L,
    formula: &str,
    delay: Duration,
) -> Result<Vec<ItemId>> {
    let planned = state.borrow().check_craft(formula)?;
    let definition = match loader.load(planned.type_id).await {
        Ok(definition) => definition,
        Err(err) => {
            tracing::error!(formula, error = %err, "Crafted item failed to load");
            return Err(err);
        }
    };

    // Re-checked: the game may have changed while the definition loaded.
    let result = state.borrow_mut().prepare_craft(formula)?;
    tracing::debug!(formula, type_id = result.type_id.0, "Craft started");

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let items = state
        .borrow_mut()
        .complete_craft(formula, &definition, result.amount);
    tracing::debug!(formula, count = items.len(), "Craft finished");
    Ok(items)
}
