//! Synthetic master-file generator.
//!
//! Writes a seed-reproducible IID byte sequence of `len` bytes: the reference
//! data set (`ns` bytes) concatenated with the test data set (`NS` bytes).
//! Seamless shingling requires the two sets to overlap by `L - 1` bytes, so
//! `len >= ns + NS` covers both phases.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::rng::XorShift64;

/// Generation buffer size.
pub const MASTER_BUFFER_LEN: usize = 32 * 1024;

/// Generates `len` pseudo-random bytes at `path`, reproducible from `seed`.
pub fn write_master(path: &Path, len: u64, seed: u64) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let mut rng = XorShift64::new(seed);
    let mut buf = [0u8; MASTER_BUFFER_LEN];

    let mut remaining = len;
    while remaining > 0 {
        let take = remaining.min(MASTER_BUFFER_LEN as u64) as usize;
        for b in &mut buf[..take] {
            *b = rng.next_byte();
        }
        out.write_all(&buf[..take])?;
        remaining -= take as u64;
    }
    out.flush()
}
