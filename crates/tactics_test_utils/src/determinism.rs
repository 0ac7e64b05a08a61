//! Determinism test harness.
//!
//! Two battles started from the same setup and fed the same actions must end
//! in the same state. This is the core guarantee that makes replays and
//! remote play possible.
//!
//! # Common Sources of Non-Determinism
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   Movement budgets and traversal progress use [`tactics_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The registry and scheduler always iterate in sorted unit id order.
//!
//! - **Search tie-breaks**: equal-cost routes must resolve the same way every
//!   run. The pathfinder breaks ties by discovery order.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual components (pathfinding, combat, turns)
//! 2. **Property tests**: Random layouts must still replay identically
//! 3. **Integration tests**: Full scripted battles are reproducible
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::thread;

use tactics_core::prelude::*;

use crate::balance::{play_turn, run_battle};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps each run took.
    pub steps: u64,
}

impl DeterminismResult {
    fn from_hashes(hashes: Vec<u64>, steps: u64) -> Self {
        Self {
            is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
            hashes,
            steps,
        }
    }

    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
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

/// Hash of a session, panicking if it cannot be encoded.
///
/// # Panics
///
/// Panics if the state fails to encode.
#[must_use]
pub fn hash_of(session: &BattleSession) -> u64 {
    session
        .state_hash()
        .unwrap_or_else(|e| panic!("failed to hash battle state: {e}"))
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the battle
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::{hash_of, verify_determinism};
/// use tactics_test_utils::fixtures::duel_session;
/// use tactics_core::prelude::*;
///
/// let result = verify_determinism(
///     3,
///     4,
///     || {
///         let (mut session, _, _) = duel_session(Box::new(NullGateway));
///         session.start().unwrap();
///         session
///     },
///     |session| {
///         let _ = session.end_turn();
///     },
///     hash_of,
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

    DeterminismResult::from_hashes(hashes, steps)
}

/// Play a scripted battle `runs` times and compare the final hashes.
///
/// # Panics
///
/// Panics if a scripted battle returns an error.
pub fn verify_battle_determinism<F>(setup_fn: F, runs: usize, max_rounds: u32) -> DeterminismResult
where
    F: Fn() -> BattleSession,
{
    verify_determinism(
        runs,
        u64::from(max_rounds),
        &setup_fn,
        |session| {
            if let Err(e) = run_battle(session, max_rounds) {
                panic!("scripted battle failed: {e}");
            }
        },
        hash_of,
    )
}

/// Play N scripted battles on N scoped threads and compare final hashes.
///
/// Each thread builds its own session, so the session itself never crosses
/// a thread boundary.
///
/// # Panics
///
/// Panics if a thread panics or a scripted battle fails.
pub fn run_parallel_battles<F>(setup_fn: F, num_battles: usize, max_rounds: u32) -> DeterminismResult
where
    F: Fn() -> BattleSession + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    if let Err(e) = run_battle(&mut session, max_rounds) {
                        panic!("scripted battle failed: {e}");
                    }
                    hash_of(&session)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("battle thread panicked")))
            .collect()
    });

    DeterminismResult::from_hashes(hashes, u64::from(max_rounds))
}

/// Play two battles turn by turn, finding the first turn after which their
/// hashes differ.
///
/// # Returns
///
/// `None` if the battles stay identical, `Some(turn)` if they diverge after
/// that many turns (0 means the initial states already differ).
///
/// # Panics
///
/// Panics if a scripted turn fails.
pub fn find_first_divergence<F>(setup_fn: F, max_turns: u64) -> Option<u64>
where
    F: Fn() -> BattleSession,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    for session in [&mut first, &mut second] {
        if session.state() == TurnState::NotStarted {
            if let Err(e) = session.start() {
                panic!("failed to start battle: {e}");
            }
        }
    }
    if hash_of(&first) != hash_of(&second) {
        return Some(0);
    }

    for turn in 1..=max_turns {
        for session in [&mut first, &mut second] {
            if matches!(session.state(), TurnState::Active(_)) {
                if let Err(e) = play_turn(session) {
                    panic!("scripted turn failed: {e}");
                }
            }
        }

        if hash_of(&first) != hash_of(&second) {
            return Some(turn);
        }
    }

    None
}

/// Proptest strategies for battle testing.
///
/// These strategies generate random but reproducible layouts and stats for
/// property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::prelude::*;

    /// Generate any unit type.
    pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
        proptest::sample::select(UnitType::ALL.to_vec())
    }

    /// Generate a unit meta type.
    pub fn arb_meta_type() -> impl Strategy<Value = UnitMetaType> {
        prop_oneof![
            Just(UnitMetaType::Infantry),
            Just(UnitMetaType::Vehicle),
            Just(UnitMetaType::Air),
        ]
    }

    /// Generate health values (1-100).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..100u32
    }

    /// Generate damage values (1-50).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..50u32
    }

    /// Generate a valid balancing entry.
    pub fn arb_balancing() -> impl Strategy<Value = UnitBalancing> {
        (
            arb_health(),
            arb_damage(),
            0u32..5u32,
            1i32..8i32,
            arb_meta_type(),
            proptest::collection::btree_set(arb_meta_type(), 0..=3),
        )
            .prop_map(|(health, damage, attack_range, movement, unit_meta_type, targets)| {
                UnitBalancing {
                    health,
                    damage,
                    attack_range,
                    movement: Fixed::from_num(movement),
                    unit_meta_type,
                    attackable_unit_meta_types: targets,
                }
            })
    }

    /// Generate a balancing table covering every unit type.
    pub fn arb_balancing_table() -> impl Strategy<Value = UnitBalancingTable> {
        proptest::collection::vec(arb_balancing(), UnitType::ALL.len()).prop_filter_map(
            "invalid balancing table",
            |entries| UnitBalancingTable::from_entries(UnitType::ALL.into_iter().zip(entries)).ok(),
        )
    }

    /// Generate a tile kind, mostly plain.
    pub fn arb_tile_kind() -> impl Strategy<Value = TileKind> {
        prop_oneof![
            6 => Just(TileKind::Plain),
            2 => Just(TileKind::Rough),
            1 => Just(TileKind::Blocked),
        ]
    }

    /// Generate a `width` x `height` map with random terrain.
    pub fn arb_tile_map(width: u32, height: u32) -> impl Strategy<Value = TileMap> {
        let len = (width * height) as usize;
        proptest::collection::vec(arb_tile_kind(), len).prop_map(move |kinds| {
            let mut map = TileMap::new(width, height);
            for (i, kind) in kinds.into_iter().enumerate() {
                let i = i as u32;
                map.set_tile(GridCoord::new((i % width) as i32, (i / width) as i32), kind);
            }
            map
        })
    }

    /// Generate a coordinate inside a `width` x `height` map.
    pub fn arb_coord(width: u32, height: u32) -> impl Strategy<Value = GridCoord> {
        (0..width as i32, 0..height as i32).prop_map(|(x, y)| GridCoord::new(x, y))
    }

    /// Parameters for spawning a test unit.
    #[derive(Debug, Clone, Copy)]
    pub struct TestUnitParams {
        /// Owning team.
        pub team: TeamColor,
        /// Unit type.
        pub unit_type: UnitType,
        /// Requested tile.
        pub position: GridCoord,
    }

    /// Generate spawn parameters for a Red or Blue unit.
    pub fn arb_unit_params(width: u32, height: u32) -> impl Strategy<Value = TestUnitParams> {
        (
            prop_oneof![Just(TeamColor::Red), Just(TeamColor::Blue)],
            arb_unit_type(),
            arb_coord(width, height),
        )
            .prop_map(|(team, unit_type, position)| TestUnitParams {
                team,
                unit_type,
                position,
            })
    }

    /// Generate a list of unit spawn parameters.
    pub fn arb_unit_list(width: u32, height: u32, max_units: usize) -> impl Strategy<Value = Vec<TestUnitParams>> {
        proptest::collection::vec(arb_unit_params(width, height), 1..max_units)
    }
}
