// Property tests for the lookup tables, the classifier and the status fold.

use chrono::NaiveDate;
use kpi_engine::kpi::spt::{spt_by_applied_load, spt_by_labor_hours};
use kpi_engine::*;
use proptest::prelude::*;

mod strategies {
    use super::*;

    // Magnitudes clustered around the table bounds
    pub fn magnitude_strategy() -> impl Strategy<Value = f64> {
        prop_oneof![
            0.0f64..3000.0,
            prop::sample::select(vec![
                50.0, 100.0, 200.0, 300.0, 400.0, 500.0, 1000.0, 1500.0, 2000.0,
            ])
            .prop_flat_map(|b| prop_oneof![Just(b), Just(b + 0.001), Just(b - 0.001)]),
            Just(0.0),
            Just(1e12),
        ]
    }

    pub fn status_strategy() -> impl Strategy<Value = KpiStatus> {
        prop_oneof![
            Just(KpiStatus::Good),
            Just(KpiStatus::Warning),
            Just(KpiStatus::Bad),
            Just(KpiStatus::Neutral),
        ]
    }

    pub fn target_strategy() -> impl Strategy<Value = KpiTarget> {
        (
            0.5f64..200.0,
            prop::option::of(0.0f64..1.0),
            prop::option::of(0.0f64..1.0),
        )
            .prop_map(|(value, green_frac, yellow_frac)| {
                let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
                // keep yellow <= green so the bands are ordered
                let green = green_frac.map(|f| value * (0.5 + f));
                let yellow = yellow_frac.map(|f| green.unwrap_or(value) * f);
                KpiTarget::new(KpiType::QualityIndex, d, d, value).with_thresholds(green, yellow)
            })
    }
}

fn rank(status: KpiStatus) -> u8 {
    match status {
        KpiStatus::Bad => 0,
        KpiStatus::Warning => 1,
        KpiStatus::Good => 2,
        KpiStatus::Neutral => 3,
    }
}

proptest! {
    #[test]
    fn spt_load_is_non_increasing(a in strategies::magnitude_strategy(), b in strategies::magnitude_strategy()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(spt_by_applied_load(lo) >= spt_by_applied_load(hi));
    }

    #[test]
    fn spt_hours_is_non_decreasing(a in strategies::magnitude_strategy(), b in strategies::magnitude_strategy()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(spt_by_labor_hours(lo) <= spt_by_labor_hours(hi));
    }

    #[test]
    fn spt_values_stay_in_table_range(x in strategies::magnitude_strategy()) {
        let load = spt_by_applied_load(x);
        let hours = spt_by_labor_hours(x);
        prop_assert!((20.0..=36.0).contains(&load));
        prop_assert!((20.0..=50.0).contains(&hours));
    }

    #[test]
    fn classify_is_monotonic_in_value(
        target in strategies::target_strategy(),
        a in -50.0f64..400.0,
        b in -50.0f64..400.0,
    ) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(classify(lo, Some(&target))) <= rank(classify(hi, Some(&target))));
    }

    #[test]
    fn classify_never_neutral_with_target(target in strategies::target_strategy(), v in -50.0f64..400.0) {
        prop_assert_ne!(classify(v, Some(&target)), KpiStatus::Neutral);
    }

    #[test]
    fn classify_without_target_is_neutral(v in proptest::num::f64::ANY) {
        prop_assert_eq!(classify(v, None), KpiStatus::Neutral);
    }

    #[test]
    fn overall_follows_bad_and_warning_counts(statuses in prop::collection::vec(strategies::status_strategy(), 4)) {
        let bad = statuses.iter().filter(|s| **s == KpiStatus::Bad).count();
        let warning = statuses.iter().filter(|s| **s == KpiStatus::Warning).count();
        let overall = resolve_overall(statuses.iter().copied());
        let expected = if bad >= 2 {
            OverallStatus::Critical
        } else if bad == 1 || warning >= 2 {
            OverallStatus::Warning
        } else {
            OverallStatus::Good
        };
        prop_assert_eq!(overall, expected);
    }
}
