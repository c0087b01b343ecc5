//! Random source abstraction.
//!
//! Everything random in the simulation goes through [`RandomSource`], which is
//! implemented for every [`rand::Rng`]. The simulation itself always uses a
//! seeded [`SimRng`], so identical seeds give identical runs.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Seeded generator used by the simulation.
pub type SimRng = ChaCha8Rng;

/// Uniform sampling used by spawning and target selection.
pub trait RandomSource {
    /// Uniform float in `[min, max]`. Returns `min` when the range is empty.
    fn uniform(&mut self, min: f32, max: f32) -> f32;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.gen_range(min..=max)
        } else {
            min
        }
    }

    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "pick_index called with an empty range");
        self.gen_range(0..len.max(1))
    }
}
