//! Property-based tests for model construction and precision reweighting.

use proptest::prelude::*;
use ts_common::{Action, Position, NUM_CONTEXTS, NUM_OBSERVATIONS, NUM_POSITIONS};
use ts_core::model::{reweight, GenerativeModel, Precision};
use ts_math::is_distribution;

const TOL: f64 = 1e-9;

fn precision_strategy() -> impl Strategy<Value = Precision> {
    (0.01f64..20.0, 0.01f64..20.0, 0.01f64..20.0).prop_map(|(zeta, omega, rho)| Precision {
        zeta,
        omega,
        rho,
    })
}

fn habit_strategy() -> impl Strategy<Value = [f64; 2]> {
    (0.01f64..0.99).prop_map(|h| [h, 1.0 - h])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn reweighted_columns_stay_distributions(
        precision in precision_strategy(),
        habit in habit_strategy(),
        start in 0usize..NUM_POSITIONS,
    ) {
        let base = GenerativeModel::build(start, &habit).unwrap();
        let m = reweight(&base, &precision).unwrap();
        prop_assert!(m.validate().is_ok());

        for c in 0..NUM_CONTEXTS {
            for p in 0..NUM_POSITIONS {
                let col: Vec<f64> = (0..NUM_OBSERVATIONS).map(|o| m.a[o][c][p]).collect();
                prop_assert!(is_distribution(&col, TOL), "A[:, {c}, {p}] = {col:?}");
            }
        }
        prop_assert!(is_distribution(&m.e, TOL));
    }

    #[test]
    fn untouched_tables_are_preserved(precision in precision_strategy()) {
        let base = GenerativeModel::default();
        let m = reweight(&base, &precision).unwrap();
        for p in 0..NUM_POSITIONS {
            prop_assert_eq!(m.a[0][0][p], 0.5);
            prop_assert_eq!(m.a[1][0][p], 0.5);
        }
        prop_assert_eq!(m.b_position, base.b_position);
        prop_assert_eq!(m.d_context, base.d_context);
        prop_assert_eq!(m.d_position, base.d_position);
    }

    #[test]
    fn higher_zeta_sharpens_the_likelihood(z1 in 0.05f64..5.0, dz in 0.01f64..5.0) {
        let base = GenerativeModel::default();
        let soft = reweight(&base, &Precision { zeta: z1, ..Precision::default() }).unwrap();
        let sharp = reweight(&base, &Precision { zeta: z1 + dz, ..Precision::default() }).unwrap();
        for c in 1..NUM_CONTEXTS {
            // context c predicts contact at positions c and 8 - c
            prop_assert!(sharp.a[0][c][c] >= soft.a[0][c][c] - 1e-12);
            prop_assert!(sharp.a[0][c][0] <= soft.a[0][c][0] + 1e-12);
        }
    }

    #[test]
    fn position_transitions_are_deterministic(start in 0usize..NUM_POSITIONS) {
        let m = GenerativeModel::default();
        let from = Position::new(start).unwrap();
        for action in Action::ALL {
            prop_assert!(m.successor(from, action).is_some());
        }
        // the large action walks one step forward
        prop_assert_eq!(
            m.successor(from, Action::LargeAmplitude),
            Position::new((start + 1) % NUM_POSITIONS)
        );
    }
}

#[test]
fn context_likelihood_is_mirror_symmetric() {
    let m = GenerativeModel::default();
    for c in 1..NUM_CONTEXTS {
        for p in Position::all() {
            assert_eq!(m.a[0][c][p.index()], m.a[0][c][p.mirror().index()]);
        }
        assert_eq!(m.a[0][c][c], 1.0);
        assert_eq!(m.a[0][c][NUM_POSITIONS - c], 1.0);
    }
}

#[test]
fn small_action_table_matches_the_arm_geometry() {
    let m = GenerativeModel::default();
    let expected = [1, 2, 7, 6, 5, 4, 3, 2];
    for (from, &to) in expected.iter().enumerate() {
        assert_eq!(
            m.successor(Position::new(from).unwrap(), Action::SmallAmplitude),
            Position::new(to)
        );
    }
}

#[test]
fn build_rejects_bad_inputs() {
    assert!(GenerativeModel::build(NUM_POSITIONS, &[0.75, 0.25]).is_err());
    assert!(GenerativeModel::build(0, &[1.0]).is_err());
    assert!(reweight(
        &GenerativeModel::default(),
        &Precision {
            zeta: 0.0,
            ..Precision::default()
        }
    )
    .is_err());
}
