//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the kernel produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Peers only exchange action responses, so every peer must reach the
//! same map from the same responses. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`tac_core::math::Fixed`] for every modifier.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Positional layers are `BTreeMap`s and iterate in position order.
//!
//! - **System randomness**: The rules never roll dice.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual rule determinism (movement, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full sessions are reproducible from their log
//! 4. **Parallel tests**: Running N sessions in parallel all match

use std::thread;

use tracing::warn;

use tac_core::action::{apply, apply_all, Action};
use tac_core::map::MapState;
use tac_core::session::Game;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps per run.
    pub steps: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic kernel).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Kernel is non-deterministic!\n\
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

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use tac_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,
///     20,
///     || started_game(duel_map()),
///     |game| { let _ = game.act(&Action::EndTurn); },
///     |game| game.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: usize,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
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

/// Play the same script on two sessions and compare the final hashes.
/// Rejected actions are skipped in both.
pub fn verify_game_determinism<F>(setup_fn: F, script: &[Action]) -> bool
where
    F: Fn() -> Game,
{
    let result = verify_determinism(
        2,
        1,
        &setup_fn,
        |game| {
            for action in script {
                let _ = game.act(action);
            }
        },
        Game::state_hash,
    );
    result.is_deterministic
}

/// Play a script in `num_games` scoped threads and collect final hashes.
pub fn run_parallel_games<F>(setup_fn: F, script: &[Action], num_games: usize) -> Vec<u64>
where
    F: Fn() -> Game + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_games)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    for action in script {
                        let _ = game.act(action);
                    }
                    game.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("game thread panicked"))
            .collect()
    })
}

/// Compare two sessions action by action, finding the first divergence.
///
/// # Returns
///
/// `None` if the sessions stay identical, `Some(n)` if they differ after
/// `n` actions (0 meaning the initial states already differ).
pub fn find_first_divergence<F>(setup_fn: F, script: &[Action]) -> Option<usize>
where
    F: Fn() -> Game,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        warn!("initial sessions differ");
        return Some(0);
    }

    for (index, action) in script.iter().enumerate() {
        let a = first.act(action);
        let b = second.act(action);
        if a != b || first.state_hash() != second.state_hash() {
            warn!(index, action = action.name(), "sessions diverged");
            return Some(index + 1);
        }
    }

    None
}

/// Verify that the JSON round trip preserves the map exactly.
///
/// This is critical for save/load and network synchronization.
pub fn verify_serialization_determinism(map: &MapState) -> bool {
    let Ok(json) = map.to_json() else {
        return false;
    };
    let Ok(restored) = MapState::from_json(&json) else {
        return false;
    };
    restored == *map && restored.state_hash() == map.state_hash()
}

/// Verify that a session's log replayed onto its initial map reproduces
/// the current map, both in one batch and response by response.
pub fn verify_replay_equivalence(game: &Game) -> bool {
    let Ok(batch) = apply_all(game.initial(), game.log()) else {
        return false;
    };
    let mut stepped = game.initial().clone();
    for response in game.log() {
        match apply(&stepped, response) {
            Ok(next) => stepped = next,
            Err(_) => return false,
        }
    }
    batch == *game.map() && stepped == batch
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible maps and actions.
pub mod strategies {
    use proptest::prelude::*;
    use tac_core::action::Action;
    use tac_core::map::{MapState, Player, PlayerId, Unit};
    use tac_core::registry::tile::{FOREST, PLAIN, STREET};
    use tac_core::registry::unit::{INFANTRY, JEEP, SMALL_TANK};
    use tac_core::registry::{TileId, UnitId};
    use tac_core::vector::{SizeVector, Vector};

    /// Largest edge generated maps use.
    pub const MAX_EDGE: i32 = 12;

    /// A map size from 3x3 to `MAX_EDGE` x `MAX_EDGE`.
    pub fn arb_size() -> impl Strategy<Value = SizeVector> {
        (3..=MAX_EDGE, 3..=MAX_EDGE).prop_map(|(width, height)| SizeVector::new(width, height))
    }

    /// A position on a map of up to `MAX_EDGE` fields per side. May be out
    /// of bounds for smaller maps.
    pub fn arb_vector() -> impl Strategy<Value = Vector> {
        (1..=MAX_EDGE, 1..=MAX_EDGE).prop_map(|(x, y)| Vector::new(x, y))
    }

    /// A land tile every generated unit can stand on.
    pub fn arb_tile() -> impl Strategy<Value = TileId> {
        prop_oneof![Just(PLAIN), Just(STREET), Just(FOREST)]
    }

    /// A ground unit type.
    pub fn arb_unit_id() -> impl Strategy<Value = UnitId> {
        prop_oneof![Just(INFANTRY), Just(JEEP), Just(SMALL_TANK)]
    }

    /// A valid two-player map with random tiles and units. Placements that
    /// break an invariant are skipped.
    pub fn arb_map() -> impl Strategy<Value = MapState> {
        arb_size().prop_flat_map(|size| {
            let area = size.area();
            (
                Just(size),
                proptest::collection::vec(arb_tile(), area),
                proptest::collection::vec((arb_vector(), arb_unit_id(), 1u8..=2), 2..12),
                0u32..1000,
            )
                .prop_map(|(size, tiles, units, funds)| {
                    let players = vec![
                        Player::new(PlayerId(1), 1, funds),
                        Player::new(PlayerId(2), 2, funds),
                    ];
                    let Ok(mut map) = MapState::new(size, PLAIN, players) else {
                        unreachable!("generated sizes are valid")
                    };
                    for (position, tile) in size.positions().zip(tiles) {
                        map = map.set_tile(position, tile).unwrap_or(map);
                    }
                    for (position, id, player) in units {
                        if let Ok(unit) = Unit::create(id, PlayerId(player)) {
                            map = map.place_unit(position, unit).unwrap_or(map);
                        }
                    }
                    map
                })
        })
    }

    /// A single action with random coordinates. Most are rejected by the
    /// executor, which is fine for determinism checks.
    pub fn arb_action() -> impl Strategy<Value = Action> {
        prop_oneof![
            3 => (arb_vector(), arb_vector(), any::<bool>())
                .prop_map(|(from, to, complete)| Action::Move { from, to, complete }),
            2 => (arb_vector(), arb_vector())
                .prop_map(|(from, to)| Action::AttackUnit { from, to }),
            1 => arb_vector().prop_map(|from| Action::Capture { from }),
            1 => arb_vector().prop_map(|from| Action::CompleteUnit { from }),
            1 => (arb_vector(), arb_vector(), arb_unit_id())
                .prop_map(|(from, to, id)| Action::CreateUnit { from, to, id }),
            2 => Just(Action::EndTurn),
        ]
    }

    /// A sequence of actions.
    pub fn arb_action_sequence(max_len: usize) -> impl Strategy<Value = Vec<Action>> {
        proptest::collection::vec(arb_action(), 0..max_len)
    }
}
