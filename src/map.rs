//! Bit-packed co-filter map: one byte per slot, one presence bit per
//! co-filter.
//!
//! # Layout
//!
//! The map is a flat array of `M_COM + M_DIV` byte slots. Shingle `i` and
//! co-filter `id` address slot `com(i) + div_id(i)`; bit `id` of that byte is
//! the co-filter's presence bit. The array starts all-ones ("unmarked") and
//! scatter *clears* bits, so gather's aggregate check returns zero exactly
//! when all eight co-filters vote "present". The double negation is the
//! on-disk convention and must not be inverted without versioning the file.
//!
//! # Disk format
//!
//! `[seed: u64 little-endian][slots: M_COM + M_DIV bytes]`. The seed is the
//! PRNG seed of the byte shuffle; gather regenerates the identical
//! permutation from it. Gather opens the file as a read-only memory map and
//! touches the slot array essentially at random.
//!
//! # Concurrency
//!
//! Single writer (scatter's consume worker), then read-only. No interior
//! synchronization.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::errors::MapFileError;
use crate::params::{Params, DV};

// Slot addresses index a byte array of up to M_COM + M_DIV entries; the
// production map is ~1 GB, so a 64-bit address space is required.
const _: () = assert!(
    std::mem::size_of::<usize>() >= 8,
    "production map exceeds 32-bit addressing"
);

/// Byte value of a slot with no co-filter marks.
const UNMARKED: u8 = 0xFF;

/// Length of the seed header preceding the slot array on disk.
pub const MAP_HEADER_LEN: usize = 8;

/// Shingle lookahead for the optional slot prefetch in the consume loops.
pub(crate) const PREFETCH_SHINGLES: usize = 8;

/// Prefetch hint for an upcoming slot address. A no-op off x86_64; never
/// required for correctness.
#[inline(always)]
fn prefetch_slot(bytes: &[u8], addr: usize) {
    #[cfg(target_arch = "x86_64")]
    // SAFETY: the address is clamped into the slice; _mm_prefetch has no
    // architectural effect beyond cache state.
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        let addr = addr.min(bytes.len() - 1);
        _mm_prefetch(bytes.as_ptr().add(addr).cast(), _MM_HINT_T0);
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        let _ = (bytes, addr);
    }
}

/// Aggregate co-filter check: OR of bit `id` of slot `com + div[id]` over all
/// eight co-filters. Zero means every co-filter voted "present".
#[inline]
fn check_slots(bytes: &[u8], com: u64, div: &[u8]) -> u8 {
    debug_assert!(div.len() >= DV);
    let mut w = 0u8;
    for id in 0..DV {
        w |= bytes[(com + u64::from(div[id])) as usize] & (1 << id);
    }
    w
}

/// Owned, writable co-filter map. Built by scatter, persisted with
/// [`CoFilterMap::store`].
pub struct CoFilterMap {
    bytes: Vec<u8>,
    seed: u64,
}

impl CoFilterMap {
    /// Allocates an all-unmarked map of `M_COM + M_DIV` slots.
    ///
    /// The production map is ~1 GB; allocation failure is reported rather
    /// than aborting, carrying its own exit code.
    pub fn allocate(params: &Params, seed: u64) -> Result<Self, MapFileError> {
        let slots = params.map_slots();
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(slots)
            .map_err(|_| MapFileError::Alloc { slots })?;
        bytes.resize(slots, UNMARKED);
        Ok(Self { bytes, seed })
    }

    /// The shuffle seed recorded in the file header.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Clears bit `id` of slot `com + div[id]` for each co-filter.
    /// Idempotent; `div` holds the shingle's `DV` diversified hashes.
    #[inline]
    pub fn mark(&mut self, com: u64, div: &[u8]) {
        debug_assert!(div.len() >= DV);
        for id in 0..DV {
            self.bytes[(com + u64::from(div[id])) as usize] &= !(1 << id);
        }
    }

    /// Aggregate check against the in-memory map (see [`MapFile::check`]).
    #[inline]
    pub fn check(&self, com: u64, div: &[u8]) -> u8 {
        check_slots(&self.bytes, com, div)
    }

    /// Prefetch hint for the slot window of a later shingle.
    #[inline]
    pub fn prefetch(&self, com: u64) {
        prefetch_slot(&self.bytes, com as usize);
    }

    /// Persists the map as `[seed u64 LE][slots]`.
    pub fn store(&self, path: &Path) -> Result<(), MapFileError> {
        let file = File::create(path).map_err(MapFileError::Create)?;
        let mut out = BufWriter::new(file);
        out.write_all(&self.seed.to_le_bytes())
            .map_err(MapFileError::Write)?;
        out.write_all(&self.bytes).map_err(MapFileError::Write)?;
        out.flush().map_err(MapFileError::Write)
    }
}

/// Read-only co-filter map loaded from disk. Used by gather.
pub struct MapFile {
    mmap: Mmap,
    seed: u64,
    slots: usize,
}

impl MapFile {
    /// Opens and memory-maps a stored map, validating its length against the
    /// parameter set.
    pub fn load(path: &Path, params: &Params) -> Result<Self, MapFileError> {
        let slots = params.map_slots();
        let need = (MAP_HEADER_LEN + slots) as u64;
        let file = File::open(path).map_err(MapFileError::Open)?;
        let len = file.metadata().map_err(MapFileError::Open)?.len();
        if len < need {
            return Err(MapFileError::TooShort { len, need });
        }
        // SAFETY: the mapping is read-only and lives as long as `self`; the
        // file is treated as immutable for the duration of the run.
        let mmap = unsafe { Mmap::map(&file) }.map_err(MapFileError::Mmap)?;
        let seed = u64::from_le_bytes(
            mmap[..MAP_HEADER_LEN]
                .try_into()
                .expect("header length is fixed"),
        );
        Ok(Self { mmap, seed, slots })
    }

    /// The shuffle seed from the file header.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn slot_bytes(&self) -> &[u8] {
        &self.mmap[MAP_HEADER_LEN..MAP_HEADER_LEN + self.slots]
    }

    /// Aggregate co-filter check; zero means the shingle passes the filter.
    #[inline]
    pub fn check(&self, com: u64, div: &[u8]) -> u8 {
        check_slots(self.slot_bytes(), com, div)
    }

    /// Prefetch hint for the slot window of a later shingle.
    #[inline]
    pub fn prefetch(&self, com: u64) {
        prefetch_slot(self.slot_bytes(), com as usize);
    }
}
