//! Filter soundness: the map never produces a false negative. After every
//! reference shingle is marked, re-checking any reference shingle passes all
//! eight co-filters.

use proptest::prelude::*;

use crossrep_rs::hash::{com_scratch, div_scratch};
use crossrep_rs::map::CoFilterMap;
use crossrep_rs::params::{Params, DV};

fn shingle_hashes(window: &[u8], params: &Params) -> (u64, [u8; DV]) {
    let com = com_scratch(window, params);
    let mut div = [0u8; DV];
    for (id, d) in div.iter_mut().enumerate() {
        *d = div_scratch(window, id, params);
    }
    (com, div)
}

proptest! {
    #[test]
    fn every_reference_shingle_survives(r in proptest::collection::vec(any::<u8>(), 5..300)) {
        let params = Params::custom(5, 10, 1009, 67, 64).unwrap();
        let mut map = CoFilterMap::allocate(&params, 0).unwrap();

        for i in 0..=r.len() - params.l() {
            let (com, div) = shingle_hashes(&r[i..i + params.l()], &params);
            map.mark(com, &div);
        }
        for i in 0..=r.len() - params.l() {
            let (com, div) = shingle_hashes(&r[i..i + params.l()], &params);
            prop_assert_eq!(map.check(com, &div), 0, "shingle {} lost", i);
        }
    }

    #[test]
    fn marking_more_never_unmarks(
        r in proptest::collection::vec(any::<u8>(), 5..200),
        extra in proptest::collection::vec(any::<u8>(), 5..200),
    ) {
        let params = Params::custom(5, 10, 1009, 67, 64).unwrap();
        let mut map = CoFilterMap::allocate(&params, 0).unwrap();

        let (com, div) = shingle_hashes(&r[..params.l()], &params);
        map.mark(com, &div);
        for i in 0..=extra.len() - params.l() {
            let (c, d) = shingle_hashes(&extra[i..i + params.l()], &params);
            map.mark(c, &d);
        }
        prop_assert_eq!(map.check(com, &div), 0);
    }
}
