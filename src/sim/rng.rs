//! Deterministic xorshift32 generator
//!
//! Every stochastic decision in the simulation draws from one of these.

use rand::rand_core::impls;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Replacement state when a seed (or the shift sequence) yields zero
const NONZERO_STATE: u32 = 0x9E37_79B9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { NONZERO_STATE } else { seed },
        }
    }

    /// Seed from the high-resolution clock (never zero)
    pub fn seed_from_clock() -> u32 {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0);
        nanos | 1
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        if x == 0 {
            x = NONZERO_STATE;
        }
        self.state = x;
        x
    }

    /// Uniform float in [0, 1) built from the top 24 bits
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Uniform float in [min, max)
    #[inline]
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// Uniform integer in [lo, hi]
    pub fn range_int(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        let span = (hi - lo + 1) as u32;
        lo + (self.next_u32() % span) as i32
    }

    #[inline]
    pub fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    /// -1.0 or 1.0
    #[inline]
    pub fn sign(&mut self) -> f32 {
        if self.next_u32() & 1 == 0 { -1.0 } else { 1.0 }
    }
}

impl Default for Xorshift32 {
    fn default() -> Self {
        Self::new(NONZERO_STATE)
    }
}

impl RngCore for Xorshift32 {
    fn next_u32(&mut self) -> u32 {
        Xorshift32::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst)
    }
}

impl SeedableRng for Xorshift32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}
