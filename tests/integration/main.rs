//! End-to-end scatter/gather scenarios over temp files.
//!
//! Run with: `cargo test --test integration`

mod failure_modes;
mod support;
