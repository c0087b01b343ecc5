//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism to watch for:
//!
//! - **Unseeded randomness**: every random draw must come from the
//!   simulation's seeded [`SimRng`](drone_core::random::SimRng).
//!
//! - **HashMap iteration order**: the default hasher is randomized. Rosters,
//!   active ores and contact pairs are kept in ordered collections.
//!
//! - **Order-dependent steering**: forces are computed from a frozen snapshot
//!   before any drone moves.

use std::thread;

use drone_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of frames simulated.
    pub frames: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Frames: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.frames,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `frames` - Number of frames to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one frame
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    frames: u64,
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

        for frame in 0..frames {
            step(&mut state, frame);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Run a [`Simulation`] `runs` times at a constant frame delta.
///
/// # Example
///
/// ```
/// use drone_core::prelude::*;
/// use drone_test_utils::determinism::verify_simulation_determinism;
///
/// let result = verify_simulation_determinism(
///     || Simulation::new(SimConfig::default(), 7).unwrap(),
///     3,
///     60,
///     1.0 / 60.0,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_simulation_determinism<F>(
    setup_fn: F,
    runs: usize,
    frames: u64,
    dt: f32,
) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        runs,
        frames,
        setup_fn,
        |sim, _| {
            sim.step(dt);
        },
        Simulation::state_hash,
    )
}

/// Run simulations on scoped threads and collect their final hashes.
///
/// Catches state that leaks between instances, such as anything global or
/// thread-local.
pub fn run_parallel_simulations<F>(
    setup_fn: F,
    num_sims: usize,
    frames: u64,
    dt: f32,
) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..frames {
                        sim.step(dt);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    DeterminismResult {
        is_deterministic,
        hashes,
        frames,
    }
}

/// Compare two runs frame by frame.
///
/// Returns `None` if they never diverge, `Some(frame)` for the first frame
/// whose hashes differ (0 means the initial states already differ).
pub fn find_first_divergence<F>(setup_fn: F, frames: u64, dt: f32) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for frame in 1..=frames {
        a.step(dt);
        b.step(dt);

        if a.state_hash() != b.state_hash() {
            return Some(frame);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::busy_config;

    #[test]
    fn test_verify_determinism_counter() {
        let result = verify_determinism(
            3,
            10,
            || 0u64,
            |s, frame| *s = s.wrapping_mul(31).wrapping_add(frame),
            |s| *s,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_detects_nondeterminism() {
        use std::cell::Cell;
        let calls = Cell::new(0u64);
        let result = verify_determinism(
            2,
            1,
            || {
                calls.set(calls.get() + 1);
                calls.get()
            },
            |_, _| {},
            |s| *s,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 2);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let result = verify_simulation_determinism(
            || Simulation::new(busy_config(), 1234).unwrap(),
            3,
            300,
            1.0 / 50.0,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_parallel_runs_match() {
        let result = run_parallel_simulations(
            || Simulation::new(busy_config(), 99).unwrap(),
            4,
            200,
            1.0 / 30.0,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        let divergence = find_first_divergence(
            || Simulation::new(busy_config(), 5).unwrap(),
            150,
            1.0 / 60.0,
        );
        assert_eq!(divergence, None);
    }
}
