//! Property tests for q-value estimation.

use lsa_stats::{QValueEstimator, StoreyQValue};
use proptest::prelude::*;

fn p_values() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::weighted(0.9, 0.0f64..=1.0), 0..120)
}

proptest! {
    #[test]
    fn q_values_keep_positions(p in p_values(), robust in any::<bool>()) {
        let q = StoreyQValue { robust, seed: 1 }.q_values(&p);
        prop_assert_eq!(q.len(), p.len());
        let valid = p.iter().flatten().count();
        for (pv, qv) in p.iter().zip(&q) {
            if pv.is_none() || valid < 2 {
                prop_assert!(qv.is_none());
            } else {
                prop_assert!(qv.is_some());
            }
        }
    }

    #[test]
    fn q_values_bounded_and_monotone(p in p_values(), robust in any::<bool>()) {
        let q = StoreyQValue { robust, seed: 1 }.q_values(&p);
        let mut pairs: Vec<(f64, f64)> = p
            .iter()
            .zip(&q)
            .filter_map(|(pv, qv)| Some(((*pv)?, (*qv)?)))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for &(_, qv) in &pairs {
            prop_assert!((0.0..=1.0).contains(&qv));
        }
        for w in pairs.windows(2) {
            prop_assert!(w[0].1 <= w[1].1 + 1e-12);
        }
    }
}
