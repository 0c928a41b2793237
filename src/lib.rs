//! Approximate common-substring detection on large byte streams via a
//! two-phase scatter/gather shingle filter.
//!
//! The system avoids pairwise comparison by filtering through a compact,
//! lossy fingerprint index:
//! - **scatter** streams the reference data and clears one presence bit per
//!   co-filter for every reference shingle in a bit-packed map (~1 GB at
//!   production parameters), then persists the map.
//! - **gather** streams the test data through the map and reports how many
//!   shingles survive all eight co-filters as part of a long run (`residue`)
//!   and the longest such run (`max_count`).
//!
//! Both phases share one engine:
//! 1. A seeded byte permutation applied to all input ([`shuffle`]).
//! 2. A rolling double-hash family: one common hash and eight diversified
//!    hashes per shingle, each O(1) per byte ([`hash`]).
//! 3. A three-buffer, three-worker batched pipeline (read → hash → consume)
//!    driven by a central scheduler barrier ([`pipeline`]).
//!
//! The filter has no false negatives: a shingle present in the reference set
//! always passes. False positives are governed by map density and the
//! eight-way co-filter AND.

pub mod affinity;
pub mod detect;
pub mod errors;
pub mod gather;
pub mod hash;
pub mod map;
pub mod master;
pub mod params;
pub mod pipeline;
pub mod rng;
pub mod scatter;
pub mod shuffle;

pub use errors::{ConfigError, MapFileError, MasterFileError, RunError};
pub use gather::{run_gather, GatherConfig, GatherReport};
pub use params::{Params, DV};
pub use scatter::{run_scatter, ScatterConfig, ScatterReport};
