//! Deterministic jitter used to break exact coincidences.
//!
//! The generator is a 32-bit linear congruential generator owned by each
//! simulation instance. Its output sequence is fixed by the seed alone, so
//! two simulations built with the same seed perturb coincident nodes in the
//! same way and produce identical trajectories.

use rand::{RngCore, SeedableRng};

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;
/// 2^32, the modulus of the generator.
const MODULUS: f64 = 4_294_967_296.0;
/// Magnitude of a single jiggle.
const JIGGLE_SCALE: f64 = 1e-6;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u32 = 1;

/// Seeded linear congruential generator.
///
/// `state' = (1664525 * state + 1013904223) mod 2^32`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advances the generator and returns a sample in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / MODULUS
    }

    /// Returns a tiny offset in `[-5e-7, 5e-7)`.
    ///
    /// Used wherever a separation component is exactly zero and a
    /// direction is still needed.
    #[inline]
    pub fn jiggle(&mut self) -> f64 {
        (self.next_f64() - 0.5) * JIGGLE_SCALE
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RngCore for Lcg {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        self.state
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for Lcg {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    /// Uses the low 32 bits of `state` directly as the generator state.
    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}
