//! Quantified rolling-hash properties: for every position of every input,
//! the rolled hashes equal the from-scratch hashes, and every hash stays in
//! its modulus range.

use proptest::prelude::*;

use crossrep_rs::hash::{com_scratch, div_scratch, hash_batch};
use crossrep_rs::params::{Params, DV};

fn hash_all(s: &[u8], params: &Params) -> (Vec<u64>, Vec<u8>) {
    let n = s.len() - params.lc();
    let mut com = vec![0u64; n];
    let mut div = vec![0u8; n * DV];
    hash_batch(s, n, &mut com, &mut div, params);
    (com, div)
}

proptest! {
    #[test]
    fn roll_matches_scratch_production(s in proptest::collection::vec(any::<u8>(), 6..512)) {
        let params = Params::production();
        let (com, div) = hash_all(&s, &params);
        for j in 0..s.len() - params.lc() {
            let window = &s[j..j + params.l()];
            prop_assert_eq!(com[j], com_scratch(window, &params));
            for id in 0..DV {
                prop_assert_eq!(div[j * DV + id], div_scratch(window, id, &params));
            }
        }
    }

    #[test]
    fn roll_matches_scratch_small_moduli(
        s in proptest::collection::vec(any::<u8>(), 4..256),
        m_com in 2u64..5000,
        m_div in 2u64..=255,
    ) {
        let params = Params::custom(3, 6, m_com, m_div, 64).unwrap();
        let (com, div) = hash_all(&s, &params);
        for j in 0..s.len() - params.lc() {
            let window = &s[j..j + params.l()];
            prop_assert_eq!(com[j], com_scratch(window, &params));
            for id in 0..DV {
                prop_assert_eq!(div[j * DV + id], div_scratch(window, id, &params));
            }
        }
    }

    #[test]
    fn slot_addresses_stay_in_range(s in proptest::collection::vec(any::<u8>(), 6..512)) {
        let params = Params::production();
        let (com, div) = hash_all(&s, &params);
        for j in 0..s.len() - params.lc() {
            prop_assert!(com[j] < params.m_com());
            for id in 0..DV {
                let d = u64::from(div[j * DV + id]);
                prop_assert!(d < params.m_div());
                prop_assert!(com[j] + d < params.m_com() + params.m_div());
            }
        }
    }
}
