//! Debug-sampling of executed queries
//!
//! A sampled query is sent with the `debug ` prefix, which makes the server
//! return an execution trace alongside the result.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

pub const DEBUG_PREFIX: &str = "debug ";

/// Decides per query whether to prefix it with [`DEBUG_PREFIX`]
pub struct DebugSampler {
    ratio: f64,
    rng: Box<dyn RngCore + Send>,
}

impl DebugSampler {
    /// Sampler drawing from a [`StdRng`] seeded with `seed`
    pub fn seeded(ratio: f64, seed: u64) -> Self {
        Self::with_rng(ratio, Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn with_rng(ratio: f64, rng: Box<dyn RngCore + Send>) -> Self {
        Self { ratio, rng }
    }

    /// Text to execute for `sql`. Ratio 0 never samples and ratio 1 always
    /// does, without consuming randomness.
    pub fn apply(&mut self, sql: &str) -> String {
        if self.sample() {
            format!("{}{}", DEBUG_PREFIX, sql)
        } else {
            sql.to_string()
        }
    }

    fn sample(&mut self) -> bool {
        if self.ratio <= 0.0 {
            return false;
        }
        if self.ratio >= 1.0 {
            return true;
        }
        self.rng.gen::<f64>() < self.ratio
    }
}

impl std::fmt::Debug for DebugSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugSampler")
            .field("ratio", &self.ratio)
            .finish_non_exhaustive()
    }
}
