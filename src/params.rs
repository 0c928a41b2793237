//! Filter parameters and derived rolling-hash constants.
//!
//! Scatter and gather must agree bit-exactly on every value here: the shingle
//! and prefix lengths, the batch size, both moduli, and the hash bases. The
//! moduli and shingle length are additionally baked into the map file name so
//! an incompatible map is caught at open time rather than producing garbage.

use crate::errors::ConfigError;

/// Number of diversified co-filters. Fixed: the map byte-packs exactly one
/// bit per co-filter into each slot.
pub const DV: usize = 8;

/// Base of the common hash (first prime above 255, so the no-underflow bias
/// of the rolling update holds for any byte).
pub const B_COM: u64 = 257;

/// Per-co-filter bases of the diversified hashes, one cache line's worth.
pub const B_DIV: [u64; DV] = [257, 263, 269, 271, 277, 281, 283, 293];

/// Default shingle length.
pub const L: usize = 5;

/// Default prefix length: a surviving run must span at least this many bytes
/// to count toward the residue.
pub const LP: usize = 10;

/// Default modulus of the common hashes.
pub const M_COM: u64 = 1_000_000_007;

/// Default modulus of the diversified hashes.
pub const M_DIV: u64 = 67;

/// Default batch size of the pipeline buffers.
pub const BATCH_SIZE: usize = 8 * 1024;

/// `base^exp mod m` by repeated multiplication; `exp` is tiny (the shingle
/// length), so no need for fast exponentiation.
fn pow_mod(base: u64, exp: usize, m: u64) -> u64 {
    let mut result = 1u64;
    for _ in 0..exp {
        result = result * (base % m) % m;
    }
    result
}

/// Validated parameter set shared by both phases.
///
/// Constructed through [`Params::custom`] so the derived roll-out constants
/// (`C_COM`, `C_DIV`) can never drift from the primary values.
#[derive(Clone, Debug)]
pub struct Params {
    l: usize,
    lp: usize,
    bs: usize,
    m_com: u64,
    m_div: u64,
    c_com: u64,
    c_div: [u64; DV],
}

impl Params {
    /// Builds a parameter set, validating the rolling-hash preconditions.
    pub fn custom(
        l: usize,
        lp: usize,
        m_com: u64,
        m_div: u64,
        bs: usize,
    ) -> Result<Self, ConfigError> {
        let invalid = |reason| Err(ConfigError::InvalidParams { reason });
        if l < 2 {
            return invalid("shingle length must be at least 2");
        }
        if lp < l {
            return invalid("prefix length must be at least the shingle length");
        }
        if bs <= l - 1 {
            return invalid("batch size must exceed the carry length");
        }
        if m_com < 2 {
            return invalid("common modulus must be at least 2");
        }
        // Keeps (com + m_com) * B_COM and the m_com * m_com intermediate of
        // the derived-constant computation inside u64.
        if m_com > u64::from(u32::MAX) {
            return invalid("common modulus must fit 32 bits");
        }
        if !(2..=255).contains(&m_div) {
            return invalid("diversity modulus must fit a byte");
        }

        let c_com = pow_mod(B_COM, l, m_com);
        let mut c_div = [0u64; DV];
        for (id, c) in c_div.iter_mut().enumerate() {
            *c = pow_mod(B_DIV[id], l, m_div);
        }
        Ok(Self {
            l,
            lp,
            bs,
            m_com,
            m_div,
            c_com,
            c_div,
        })
    }

    /// The production parameter set from the module constants.
    pub fn production() -> Self {
        Self::custom(L, LP, M_COM, M_DIV, BATCH_SIZE).expect("default parameters are valid")
    }

    /// Shingle length `L`.
    #[inline]
    pub fn l(&self) -> usize {
        self.l
    }

    /// Carry length `L - 1`: bytes shared between adjacent buffers so
    /// boundary-straddling shingles stay contiguous.
    #[inline]
    pub fn lc(&self) -> usize {
        self.l - 1
    }

    /// Prefix length `LP`.
    #[inline]
    pub fn lp(&self) -> usize {
        self.lp
    }

    /// Batch size `BS`.
    #[inline]
    pub fn bs(&self) -> usize {
        self.bs
    }

    /// Common-hash modulus `M_COM`.
    #[inline]
    pub fn m_com(&self) -> u64 {
        self.m_com
    }

    /// Diversified-hash modulus `M_DIV`.
    #[inline]
    pub fn m_div(&self) -> u64 {
        self.m_div
    }

    /// `B_COM^L mod M_COM`, the roll-out factor of the common hash.
    #[inline]
    pub fn c_com(&self) -> u64 {
        self.c_com
    }

    /// `B_DIV[id]^L mod M_DIV`, the roll-out factor of co-filter `id`.
    #[inline]
    pub fn c_div(&self, id: usize) -> u64 {
        self.c_div[id]
    }

    /// Map slot count: every address `com + div` lies in `[0, M_COM + M_DIV)`.
    #[inline]
    pub fn map_slots(&self) -> usize {
        (self.m_com + self.m_div) as usize
    }

    /// Run-length threshold `LP - L`: a run must exceed this many surviving
    /// shingles before it spans `LP` bytes.
    #[inline]
    pub fn run_threshold(&self) -> u64 {
        (self.lp - self.l) as u64
    }

    /// Canonical map file name. Embeds `M_DIV` and `L` so scatter and gather
    /// cannot silently pair incompatible maps.
    pub fn map_file_name(&self) -> String {
        format!("v1_map_{}_{}.txt", self.m_div, self.l)
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::production()
    }
}
