//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the same sequence of item, cost and
//! crafting calls always produces the same game state.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism the engine guards against:
//!
//! - **Floating-point math**: stat folds and weights use
//!   [`duckov_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: the item arena and every registry are
//!   ordered maps, and ids are handed out sequentially.
//!
//! - **Event reentrancy**: handlers run after mutation, from a queue, so the
//!   order of side effects never depends on who subscribed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run ended in the same state.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Game state is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to apply step `n` to the state
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use duckov_test_utils::determinism::verify_determinism;
/// use duckov_test_utils::fixtures::{new_game, CASH};
///
/// let result = verify_determinism(
///     3,
///     50,
///     || new_game(1_000),
///     |state, _| { let _ = state.atm_draw(10); },
///     |state| state.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for n in 0..steps {
            step(&mut state, n);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Compute a hash of any hashable value.
#[must_use]
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for item world and stat testing.
///
/// Ops address items by index into a caller-kept list of spawned ids, so a
/// generated sequence stays meaningful whatever ids the world hands out.
pub mod strategies {
    use duckov_core::catalog::{ItemCatalog, ItemTypeId};
    use duckov_core::events::EventQueue;
    use duckov_core::item::{ItemId, ItemWorld};
    use duckov_core::math::Fixed;
    use duckov_core::stat::{Modifier, ModifierKind, ModifierSource};
    use proptest::prelude::*;

    use crate::fixtures::{AMMO, BACKPACK, GRIP, ITEM_A, PLAYER, RIFLE, SCOPE};

    /// One mutation of the item world.
    #[derive(Debug, Clone)]
    pub enum WorldOp {
        /// Create `count` units of a type.
        Spawn {
            /// Item type.
            type_id: ItemTypeId,
            /// Requested stack size (clamped by the world).
            count: u32,
        },
        /// `add_and_merge(holder, item)`.
        Merge {
            /// Index of the holder.
            holder: usize,
            /// Index of the item.
            item: usize,
        },
        /// `try_plug(owner, item, empty_only)`.
        Plug {
            /// Index of the owner.
            owner: usize,
            /// Index of the item.
            item: usize,
            /// Only consider empty slots.
            empty_only: bool,
        },
        /// `detach(item)`.
        Detach {
            /// Index of the item.
            item: usize,
        },
        /// `split(item, count)`.
        Split {
            /// Index of the item.
            item: usize,
            /// Units to split off.
            count: u32,
        },
        /// `destroy_tree(item)`.
        Destroy {
            /// Index of the item.
            item: usize,
        },
    }

    /// Types the world ops spawn from.
    pub fn arb_type_id() -> impl Strategy<Value = ItemTypeId> {
        prop_oneof![
            Just(PLAYER),
            Just(ITEM_A),
            Just(AMMO),
            Just(RIFLE),
            Just(SCOPE),
            Just(GRIP),
            Just(BACKPACK),
        ]
    }

    /// Stack sizes, including out-of-range requests.
    pub fn arb_stack_count() -> impl Strategy<Value = u32> {
        0u32..80u32
    }

    /// Generate any world op.
    pub fn arb_world_op() -> impl Strategy<Value = WorldOp> {
        prop_oneof![
            3 => (arb_type_id(), arb_stack_count())
                .prop_map(|(type_id, count)| WorldOp::Spawn { type_id, count }),
            3 => (any::<usize>(), any::<usize>())
                .prop_map(|(holder, item)| WorldOp::Merge { holder, item }),
            2 => (any::<usize>(), any::<usize>(), any::<bool>())
                .prop_map(|(owner, item, empty_only)| WorldOp::Plug { owner, item, empty_only }),
            1 => any::<usize>().prop_map(|item| WorldOp::Detach { item }),
            1 => (any::<usize>(), 1u32..40u32)
                .prop_map(|(item, count)| WorldOp::Split { item, count }),
            1 => any::<usize>().prop_map(|item| WorldOp::Destroy { item }),
        ]
    }

    /// Generate a sequence of world ops.
    pub fn arb_world_ops(max_len: usize) -> impl Strategy<Value = Vec<WorldOp>> {
        proptest::collection::vec(arb_world_op(), 1..max_len)
    }

    /// Apply an op. `ids` holds every item spawned so far (dead ones included).
    pub fn apply_world_op(
        world: &mut ItemWorld,
        catalog: &ItemCatalog,
        ids: &mut Vec<ItemId>,
        op: &WorldOp,
        events: &mut EventQueue,
    ) {
        match *op {
            WorldOp::Spawn { type_id, count } => {
                if let Ok(id) = world.instantiate(catalog, type_id, count) {
                    ids.push(id);
                }
            }
            WorldOp::Merge { holder, item } => {
                if let (Some(holder), Some(item)) = (pick(ids, holder), pick(ids, item)) {
                    let _ = world.add_and_merge(holder, item, events);
                }
            }
            WorldOp::Plug {
                owner,
                item,
                empty_only,
            } => {
                if let (Some(owner), Some(item)) = (pick(ids, owner), pick(ids, item)) {
                    let _ = world.try_plug(owner, item, empty_only, events);
                }
            }
            WorldOp::Detach { item } => {
                if let Some(item) = pick(ids, item) {
                    world.detach(item, events);
                }
            }
            WorldOp::Split { item, count } => {
                if let Some(item) = pick(ids, item) {
                    if let Some(new) = world.split(item, count, events) {
                        ids.push(new);
                    }
                }
            }
            WorldOp::Destroy { item } => {
                if let Some(item) = pick(ids, item) {
                    world.destroy_tree(item, events);
                }
            }
        }
    }

    fn pick(ids: &[ItemId], index: usize) -> Option<ItemId> {
        (!ids.is_empty()).then(|| ids[index % ids.len()])
    }

    /// Generate a modifier with small operands.
    pub fn arb_modifier() -> impl Strategy<Value = Modifier> {
        (
            prop_oneof![
                Just(ModifierKind::Additive),
                Just(ModifierKind::Multiplicative),
                Just(ModifierKind::Override),
            ],
            -20i32..20i32,
            proptest::option::of(-5i32..5i32),
            0u64..4u64,
        )
            .prop_map(|(kind, value, order, source)| {
                let modifier = Modifier::new(kind, Fixed::from_num(value), ModifierSource::Custom(source));
                match order {
                    Some(order) => modifier.with_order(order),
                    None => modifier,
                }
            })
    }

    /// Generate a list of modifiers.
    pub fn arb_modifiers(max_len: usize) -> impl Strategy<Value = Vec<Modifier>> {
        proptest::collection::vec(arb_modifier(), 0..max_len)
    }
}
