//! Rolling double-hash engine: one common hash plus `DV` diversified hashes
//! per shingle, all updatable in O(1) per byte.
//!
//! The common hash (`u64 mod M_COM`) selects the map's base slot; the eight
//! diversified hashes (`u8 mod M_DIV`) offset into the co-filter window. Both
//! families are plain polynomial hashes over the (shuffled) bytes:
//!
//! ```text
//! h(i) = (s[i] * B^(L-1) + s[i+1] * B^(L-2) + ... + s[i+L-1]) mod M
//! h(i+1) = (h(i) * B - (B^L mod M) * s[i] + s[i+L]) mod M
//! ```
//!
//! The subtraction is biased (`+M_COM` for the common roll, `+256*M_DIV` for
//! the diversified rolls) so the u64 expression stays nonnegative for any
//! byte values; [`Params`] validation guarantees the bias bounds hold.

use crate::params::{Params, B_COM, B_DIV, DV};

/// Fills `com[0..n]` and `div[0..n*DV]` with the hashes of the `n` shingles
/// at offsets `0..n` of `s`.
///
/// `s` must hold `n + L - 1` bytes; the pipeline's buffer layout (carry +
/// fresh input) provides exactly that. Pure and allocation-free.
pub fn hash_batch(s: &[u8], n: usize, com: &mut [u64], div: &mut [u8], params: &Params) {
    let l = params.l();
    let m_com = params.m_com();
    let m_div = params.m_div();
    let c_com = params.c_com();
    assert!(n >= 1 && s.len() >= n + l - 1, "buffer shorter than the shingle span");
    assert!(com.len() >= n && div.len() >= n * DV);

    // Leftmost shingle by Horner.
    let mut h = 0u64;
    for &b in &s[..l] {
        h = (h * B_COM + u64::from(b)) % m_com;
    }
    com[0] = h;
    for id in 0..DV {
        let mut h = 0u64;
        for &b in &s[..l] {
            h = (h * B_DIV[id] + u64::from(b)) % m_div;
        }
        div[id] = h as u8;
    }

    // Remaining shingles by rolling forward.
    let div_bias = 256 * m_div;
    for j in 1..n {
        let out = u64::from(s[j - 1]);
        let inc = u64::from(s[j + l - 1]);
        com[j] = ((com[j - 1] + m_com) * B_COM - c_com * out + inc) % m_com;
        let row = j * DV;
        let prev = row - DV;
        for id in 0..DV {
            let h = u64::from(div[prev + id]);
            div[row + id] =
                ((div_bias + inc + h * B_DIV[id] - params.c_div(id) * out) % m_div) as u8;
        }
    }
}

/// Common hash of a single shingle, computed from scratch. `window` must be
/// exactly `L` bytes.
pub fn com_scratch(window: &[u8], params: &Params) -> u64 {
    debug_assert_eq!(window.len(), params.l());
    let mut h = 0u64;
    for &b in window {
        h = (h * B_COM + u64::from(b)) % params.m_com();
    }
    h
}

/// Diversified hash of co-filter `id` for a single shingle, from scratch.
pub fn div_scratch(window: &[u8], id: usize, params: &Params) -> u8 {
    debug_assert_eq!(window.len(), params.l());
    let mut h = 0u64;
    for &b in window {
        h = (h * B_DIV[id] + u64::from(b)) % params.m_div();
    }
    h as u8
}
