//! Tests for series construction, alignment, rebasing, and currency conversion.

mod common;

use chrono::NaiveDate;
use common::{d, daily, series};
use perfcompare::models::{DatedValue, NormalizedSeries};
use perfcompare::normalize::{align, convert_currency, normalize, rebase_series};
use perfcompare::{CompareError, Rebase, TimeSeries};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// TimeSeries invariants
// ---------------------------------------------------------------------------

#[test]
fn time_series_rejects_empty() {
    assert!(matches!(TimeSeries::new(vec![]), Err(CompareError::InvalidArgument(_))));
}

#[test]
fn time_series_rejects_unsorted_and_duplicate_dates() {
    let unsorted = vec![DatedValue::new(d(2024, 1, 3), 1.0), DatedValue::new(d(2024, 1, 2), 1.0)];
    assert!(TimeSeries::new(unsorted).is_err());

    let duplicated = vec![DatedValue::new(d(2024, 1, 2), 1.0), DatedValue::new(d(2024, 1, 2), 2.0)];
    assert!(TimeSeries::new(duplicated).is_err());
}

#[test]
fn time_series_rejects_non_finite_values() {
    let points = vec![DatedValue::new(d(2024, 1, 2), f64::INFINITY)];
    assert!(TimeSeries::new(points).is_err());
}

#[test]
fn time_series_deserialization_validates() {
    let ok: TimeSeries =
        serde_json::from_str(r#"[{"date": "2024-01-02", "value": 1.0}, {"date": "2024-01-03", "value": 2.0}]"#)
            .unwrap();
    assert_eq!(ok.len(), 2);

    let bad = serde_json::from_str::<TimeSeries>(
        r#"[{"date": "2024-01-03", "value": 1.0}, {"date": "2024-01-02", "value": 2.0}]"#,
    );
    assert!(bad.is_err());
}

#[test]
fn value_as_of_uses_nearest_prior_observation() {
    let s = series(&[(d(2024, 1, 2), 1.0), (d(2024, 1, 5), 2.0)]);
    assert_eq!(s.value_as_of(d(2024, 1, 1)), None);
    assert_eq!(s.value_as_of(d(2024, 1, 4)), Some(DatedValue::new(d(2024, 1, 2), 1.0)));
    assert_eq!(s.value_as_of(d(2024, 1, 5)), Some(DatedValue::new(d(2024, 1, 5), 2.0)));
    assert_eq!(s.value_as_of(d(2024, 2, 1)), Some(DatedValue::new(d(2024, 1, 5), 2.0)));
    assert_eq!(s.value_on(d(2024, 1, 4)), None);
}

#[test]
fn slice_is_inclusive_and_none_when_empty() {
    let s = daily(d(2024, 1, 1), &[1.0, 2.0, 3.0, 4.0]);
    let sliced = s.slice(d(2024, 1, 2), d(2024, 1, 3)).unwrap();
    assert_eq!(sliced.values().collect::<Vec<_>>(), vec![2.0, 3.0]);
    assert!(s.slice(d(2024, 2, 1), d(2024, 2, 5)).is_none());
}

// ---------------------------------------------------------------------------
// Alignment and rebasing
// ---------------------------------------------------------------------------

#[test]
fn align_keeps_common_dates_only() {
    let a = series(&[(d(2024, 1, 1), 1.0), (d(2024, 1, 2), 2.0), (d(2024, 1, 4), 4.0)]);
    let b = series(&[(d(2024, 1, 2), 20.0), (d(2024, 1, 3), 30.0), (d(2024, 1, 4), 40.0)]);
    let (dates, va, vb) = align(&a, &b);
    assert_eq!(dates, vec![d(2024, 1, 2), d(2024, 1, 4)]);
    assert_eq!(va, vec![2.0, 4.0]);
    assert_eq!(vb, vec![20.0, 40.0]);
}

#[test]
fn percent_rebase_starts_at_zero() {
    let a = daily(d(2024, 1, 1), &[50.0, 55.0, 45.0]);
    let b = daily(d(2024, 1, 1), &[200.0, 200.0, 260.0]);
    let (na, nb) = normalize(&a, &b, Rebase::Percent).unwrap();

    let va: Vec<f64> = na.series.values().collect();
    let vb: Vec<f64> = nb.series.values().collect();
    assert_eq!(va[0], 0.0);
    assert_eq!(vb[0], 0.0);
    assert!((va[1] - 10.0).abs() < 1e-9);
    assert!((va[2] + 10.0).abs() < 1e-9);
    assert!((vb[2] - 30.0).abs() < 1e-9);
    assert!((nb.total_return_pct() - 30.0).abs() < 1e-9);
}

#[test]
fn monetary_rebase_starts_at_base() {
    let a = daily(d(2024, 1, 1), &[50.0, 75.0]);
    let b = daily(d(2024, 1, 1), &[10.0, 9.0]);
    let (na, nb) = normalize(&a, &b, Rebase::Monetary(1000.0)).unwrap();
    assert_eq!(na.series.first().value, 1000.0);
    assert_eq!(nb.series.first().value, 1000.0);
    assert!((na.final_value() - 1500.0).abs() < 1e-9);
    assert!((na.total_return_pct() - 50.0).abs() < 1e-9);
    assert!((nb.total_return_pct() + 10.0).abs() < 1e-9);
}

#[test]
fn rebase_starts_at_first_common_date() {
    let a = series(&[(d(2024, 1, 1), 10.0), (d(2024, 1, 2), 20.0), (d(2024, 1, 3), 30.0)]);
    let b = series(&[(d(2024, 1, 2), 5.0), (d(2024, 1, 3), 6.0)]);
    let (na, nb) = normalize(&a, &b, Rebase::Percent).unwrap();
    assert_eq!(na.series.first().date, d(2024, 1, 2));
    assert!((na.final_value() - 50.0).abs() < 1e-9);
    assert!((nb.final_value() - 20.0).abs() < 1e-9);
}

#[test]
fn disjoint_series_have_no_overlap() {
    let a = daily(d(2024, 1, 1), &[1.0, 2.0]);
    let b = daily(d(2024, 2, 1), &[1.0, 2.0]);
    assert!(matches!(
        normalize(&a, &b, Rebase::Percent),
        Err(CompareError::NoOverlap(_))
    ));
}

#[test]
fn single_common_date_is_no_overlap() {
    let a = daily(d(2024, 1, 1), &[1.0, 2.0]);
    let b = daily(d(2024, 1, 2), &[1.0, 2.0]);
    assert!(matches!(
        normalize(&a, &b, Rebase::Percent),
        Err(CompareError::NoOverlap(_))
    ));
}

#[test]
fn zero_first_value_cannot_be_rebased() {
    let s = daily(d(2024, 1, 1), &[0.0, 2.0]);
    assert!(matches!(
        rebase_series(&s, Rebase::Percent),
        Err(CompareError::InvalidArgument(_))
    ));
}

// ---------------------------------------------------------------------------
// Currency conversion
// ---------------------------------------------------------------------------

#[test]
fn convert_currency_multiplies_by_same_day_rate() {
    let prices = daily(d(2024, 1, 1), &[10.0, 11.0]);
    let fx = daily(d(2024, 1, 1), &[5.0, 4.0]);
    let converted = convert_currency(&prices, &fx).unwrap();
    assert_eq!(converted.values().collect::<Vec<_>>(), vec![50.0, 44.0]);
}

#[test]
fn convert_currency_fills_missing_quotes() {
    // Crypto trades on weekends; FX does not.
    let prices = daily(d(2024, 1, 5), &[1.0, 1.0, 1.0, 1.0]);
    let fx = series(&[(d(2024, 1, 6), 5.0), (d(2024, 1, 8), 6.0)]);
    let converted = convert_currency(&prices, &fx).unwrap();
    // Jan 5 precedes the first quote and takes it; Jan 7 carries Jan 6 forward.
    assert_eq!(converted.values().collect::<Vec<_>>(), vec![5.0, 5.0, 5.0, 6.0]);
    assert_eq!(converted.dates().collect::<Vec<_>>(), prices.dates().collect::<Vec<_>>());
}

#[test]
fn convert_currency_requires_overlapping_spans() {
    let prices = daily(d(2024, 3, 1), &[1.0, 2.0]);
    let fx = daily(d(2024, 1, 1), &[5.0, 5.0]);
    assert!(matches!(
        convert_currency(&prices, &fx),
        Err(CompareError::NoOverlap(_))
    ));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn positive_series(offsets: Vec<(u8, f64)>) -> Option<TimeSeries> {
    let origin = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut points: Vec<(NaiveDate, f64)> = offsets
        .into_iter()
        .map(|(day, v)| (origin + chrono::Duration::days(i64::from(day)), v))
        .collect();
    points.sort_by_key(|(date, _)| *date);
    points.dedup_by_key(|(date, _)| *date);
    TimeSeries::from_pairs(points).ok()
}

fn first_and_dates(n: &NormalizedSeries) -> (f64, Vec<NaiveDate>) {
    (n.series.first().value, n.series.dates().collect())
}

proptest! {
    #[test]
    fn normalized_series_share_dates_and_origin(
        a in prop::collection::vec((0u8..60, 0.01f64..1_000.0), 1..40),
        b in prop::collection::vec((0u8..60, 0.01f64..1_000.0), 1..40),
        base in 1.0f64..1_000_000.0,
    ) {
        let (a, b) = (positive_series(a).unwrap(), positive_series(b).unwrap());
        let (common_dates, _, _) = align(&a, &b);

        for rebase in [Rebase::Percent, Rebase::Monetary(base)] {
            match normalize(&a, &b, rebase) {
                Ok((na, nb)) => {
                    let (fa, da) = first_and_dates(&na);
                    let (fb, db) = first_and_dates(&nb);
                    prop_assert!((fa - rebase.origin()).abs() < 1e-9 * base.max(1.0));
                    prop_assert!((fb - rebase.origin()).abs() < 1e-9 * base.max(1.0));
                    prop_assert_eq!(&da, &db);
                    prop_assert_eq!(&da, &common_dates);
                }
                Err(CompareError::NoOverlap(_)) => prop_assert!(common_dates.len() < 2),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
