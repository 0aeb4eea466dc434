//! Tests for outperformance period detection.

mod common;

use common::{d, daily, series};
use perfcompare::detect::{detect, outperformance_runs};
use perfcompare::models::PeriodLength;
use perfcompare::normalize::{normalize, rebase_series};
use perfcompare::{NormalizedSeries, Rebase, TimeSeries};
use proptest::prelude::*;

fn percent(s: &TimeSeries) -> NormalizedSeries {
    rebase_series(s, Rebase::Percent).unwrap()
}

// ---------------------------------------------------------------------------
// outperformance_runs
// ---------------------------------------------------------------------------

#[test]
fn runs_are_maximal_and_ordered() {
    let a = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    let b = [1.0, 2.0, -1.0, 0.5, 0.5, 0.5];
    assert_eq!(outperformance_runs(&a, &b), vec![(0, 1), (3, 5)]);
}

#[test]
fn ties_do_not_count() {
    let a = [1.0, 2.0, 3.0];
    let b = [1.0, 2.0, 3.0];
    assert!(outperformance_runs(&a, &b).is_empty());

    let b = [1.0, 2.5, 3.0];
    assert_eq!(outperformance_runs(&a, &b), vec![(1, 1)]);
}

#[test]
fn empty_input_has_no_runs() {
    assert!(outperformance_runs(&[], &[]).is_empty());
}

// ---------------------------------------------------------------------------
// detect
// ---------------------------------------------------------------------------

#[test]
fn identical_series_have_no_periods() {
    let s = percent(&daily(d(2024, 1, 1), &[100.0, 101.0, 99.0, 104.0]));
    assert!(detect(&s, &s).is_empty());
}

#[test]
fn period_length_is_inclusive_calendar_days() {
    let a = daily(d(2024, 1, 1), &[100.0, 100.0, 100.0, 100.0, 100.0, 100.0]);
    let b = daily(d(2024, 1, 1), &[100.0, 101.0, 102.0, 103.0, 99.0, 99.0]);
    let (na, nb) = normalize(&a, &b, Rebase::Percent).unwrap();

    let periods = detect(&na, &nb);
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].start_date, d(2024, 1, 2));
    assert_eq!(periods[0].end_date, d(2024, 1, 4));
    assert_eq!(periods[0].length, PeriodLength::Days(3));
    assert!((periods[0].return_delta - 3.0).abs() < 1e-9);
}

#[test]
fn single_step_period_lasts_one_day() {
    let a = daily(d(2024, 1, 1), &[100.0, 100.0, 100.0]);
    let b = daily(d(2024, 1, 1), &[100.0, 100.0, 102.0]);
    let periods = detect(&percent(&a), &percent(&b));
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].start_date, d(2024, 1, 3));
    assert_eq!(periods[0].end_date, d(2024, 1, 3));
    assert_eq!(periods[0].length, PeriodLength::Days(1));
}

#[test]
fn period_spanning_weekend_counts_calendar_days() {
    // Friday to Monday with no weekend observations.
    let a = series(&[(d(2024, 1, 4), 100.0), (d(2024, 1, 5), 100.0), (d(2024, 1, 8), 100.0)]);
    let b = series(&[(d(2024, 1, 4), 100.0), (d(2024, 1, 5), 101.0), (d(2024, 1, 8), 102.0)]);
    let periods = detect(&percent(&a), &percent(&b));
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].length, PeriodLength::Days(4));
}

#[test]
fn return_delta_is_measured_at_period_end() {
    let a = daily(d(2024, 1, 1), &[100.0, 100.0, 110.0, 100.0]);
    let b = daily(d(2024, 1, 1), &[100.0, 105.0, 115.0, 100.0]);
    let periods = detect(&percent(&a), &percent(&b));
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].end_date, d(2024, 1, 3));
    assert!((periods[0].return_delta - 5.0).abs() < 1e-9);
}

#[test]
fn monetary_return_delta_is_in_percentage_points() {
    let a = daily(d(2024, 1, 1), &[100.0, 110.0]);
    let b = daily(d(2024, 1, 1), &[100.0, 120.0]);
    let rebase = Rebase::Monetary(100_000.0);
    let periods = detect(
        &rebase_series(&a, rebase).unwrap(),
        &rebase_series(&b, rebase).unwrap(),
    );
    assert_eq!(periods.len(), 1);
    assert!((periods[0].return_delta - 10.0).abs() < 1e-9);
}

#[test]
fn separate_runs_become_separate_periods() {
    let a = daily(d(2024, 1, 1), &[100.0, 100.0, 100.0, 100.0, 100.0]);
    let b = daily(d(2024, 1, 1), &[100.0, 101.0, 100.0, 101.0, 101.0]);
    let periods = detect(&percent(&a), &percent(&b));
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[0].length, PeriodLength::Days(1));
    assert_eq!(periods[1].start_date, d(2024, 1, 4));
    assert_eq!(periods[1].end_date, d(2024, 1, 5));
}

#[test]
fn detection_uses_common_dates_only() {
    // b leads on Jan 2, which a does not observe.
    let a = series(&[(d(2024, 1, 1), 100.0), (d(2024, 1, 3), 100.0)]);
    let b = daily(d(2024, 1, 1), &[100.0, 150.0, 100.0]);
    assert!(detect(&percent(&a), &percent(&b)).is_empty());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn runs_partition_the_outperforming_steps(
        pairs in prop::collection::vec((-5i8..5, -5i8..5), 0..80),
    ) {
        let a: Vec<f64> = pairs.iter().map(|(x, _)| f64::from(*x)).collect();
        let b: Vec<f64> = pairs.iter().map(|(_, y)| f64::from(*y)).collect();
        let runs = outperformance_runs(&a, &b);

        for pair in runs.windows(2) {
            // Sorted, disjoint, and not adjacent (otherwise they would merge).
            prop_assert!(pair[0].1 + 1 < pair[1].0);
        }
        let mut inside = vec![false; a.len()];
        for (start, end) in &runs {
            prop_assert!(start <= end);
            for flag in &mut inside[*start..=*end] {
                *flag = true;
            }
        }
        for i in 0..a.len() {
            prop_assert_eq!(inside[i], b[i] > a[i]);
        }
    }

    #[test]
    fn a_series_never_outperforms_itself(
        values in prop::collection::vec(1.0f64..1_000.0, 2..60),
    ) {
        let s = percent(&daily(d(2020, 1, 1), &values));
        prop_assert!(detect(&s, &s).is_empty());
    }
}
