//! Property-based soundness tests.
//!
//! Run with: `cargo test --test property`

mod filter_soundness;
mod rolling_hash;
mod shuffle_bijection;
