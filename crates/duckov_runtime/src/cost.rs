//! Refunds and rewards with awaited definition loads.

use duckov_core::cost::{Cost, ReturnOptions, ReturnReport};
use duckov_core::item::stack_sizes;

use crate::assets::AssetLoader;
use crate::{Result, SharedState};

/// Async counterpart of [`Cost::return_items`].
///
/// Every definition is loaded before anything is credited or created, so a
/// failed load leaves the game untouched.
///
/// # Errors
///
/// Fails if the loader does not know one of the cost's item types.
pub async fn return_items<L: AssetLoader>(
    state: &SharedState,
    loader: &L,
    cost: &Cost,
    options: ReturnOptions,
) -> Result<ReturnReport> {
    let mut planned = Vec::new();
    for (type_id, units) in cost.plan_return(options.multiplier) {
        planned.push((loader.load(type_id).await?, units));
    }

    let mut state = state.borrow_mut();
    let mut generated = Vec::new();
    for (definition, units) in &planned {
        for count in stack_sizes(*units, definition.max_stack_count) {
            generated.push(state.world_mut().spawn(definition, count));
        }
    }
    let money = cost.money.max(0).saturating_mul(i64::from(options.multiplier));
    state.credit(money);

    let mut report = state.deliver(generated, options.target);
    report.money = money;
    tracing::debug!(money, items = planned.len(), "Returned cost");
    Ok(report)
}
