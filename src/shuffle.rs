//! Seeded byte permutation applied to every input byte before hashing.
//!
//! The permutation decorrelates the hash family from the raw input alphabet.
//! Scatter and gather must apply the identical permutation, so the table is
//! never persisted directly: only the PRNG seed travels (in the map file
//! header) and both sides regenerate the table from it.

use crate::errors::ConfigError;
use crate::rng::XorShift64;

/// A bijection on `[0, 256)` generated from a seeded PRNG.
#[derive(Clone)]
pub struct ByteShuffle {
    table: [u8; 256],
}

impl ByteShuffle {
    /// Generates the permutation by draw-and-probe assignment: draw a byte,
    /// linear-probe forward (wrapping) to the next unassigned value, assign.
    ///
    /// The bijection post-condition is verified before returning; a violation
    /// fails the run rather than silently desynchronizing the two phases.
    pub fn generate(rng: &mut XorShift64) -> Result<Self, ConfigError> {
        let mut taken = [false; 256];
        let mut table = [0u8; 256];
        for slot in table.iter_mut() {
            let mut r = rng.next_byte();
            while taken[r as usize] {
                r = r.wrapping_add(1);
            }
            taken[r as usize] = true;
            *slot = r;
        }

        let mut seen = [false; 256];
        for &v in &table {
            if seen[v as usize] {
                return Err(ConfigError::ShuffleNotBijective);
            }
            seen[v as usize] = true;
        }
        Ok(Self { table })
    }

    /// Generates the permutation directly from a seed.
    pub fn from_seed(seed: u64) -> Result<Self, ConfigError> {
        Self::generate(&mut XorShift64::new(seed))
    }

    /// Maps a single byte.
    #[inline]
    pub fn map(&self, b: u8) -> u8 {
        self.table[b as usize]
    }

    /// Applies the permutation in place.
    #[inline]
    pub fn apply_in_place(&self, bytes: &mut [u8]) {
        for b in bytes {
            *b = self.table[*b as usize];
        }
    }
}
