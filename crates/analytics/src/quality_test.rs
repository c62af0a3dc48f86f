//! Tests for trailing-week missing-data and noise detection

use crate::axis::{AXIS_DAYS, DateAxis};
use crate::divergence::DateEntry;
use crate::quality::{CHECK_DAYS, History, NoiseKind, assess};
use crate::testkit::today;

/// Axis-length sequence: zeros, then `history`, then the judged `week`
fn sequence(history: &[i64], week: &[i64]) -> Vec<DateEntry> {
    assert_eq!(week.len(), CHECK_DAYS);
    let padding = AXIS_DAYS - CHECK_DAYS - history.len();
    let values = std::iter::repeat_n(0, padding)
        .chain(history.iter().copied())
        .chain(week.iter().copied());

    DateAxis::ending(today())
        .days()
        .iter()
        .zip(values)
        .map(|(date, value)| DateEntry {
            date: *date,
            api_value: value,
            warehouse_value: value,
            remove_data: None,
            is_missing: false,
            is_noise: false,
            noise_type: None,
        })
        .collect()
}

/// `n` values alternating between `low` and `high`
fn alternating(n: usize, low: i64, high: i64) -> Vec<i64> {
    (0..n).map(|i| if i % 2 == 0 { low } else { high }).collect()
}

fn week_flags(sequence: &[DateEntry]) -> Vec<(bool, Option<NoiseKind>)> {
    sequence[AXIS_DAYS - CHECK_DAYS..]
        .iter()
        .map(|e| (e.is_missing, e.noise_type))
        .collect()
}

// =============================================================================
// History
// =============================================================================

#[test]
fn test_history_ignores_zero_and_negative_days() {
    let history = History::of([0, 90, -5, 110, 0].into_iter());
    assert_eq!(history.count, 2);
    assert_eq!(history.avg, 100.0);
    assert_eq!(history.std_dev, 10.0);
}

#[test]
fn test_history_empty() {
    let history = History::of(std::iter::empty());
    assert_eq!(history.count, 0);
    assert_eq!(history.avg, 0.0);
}

// =============================================================================
// Sparse history
// =============================================================================

#[test]
fn test_sparse_history_flags_zeros_as_missing() {
    let mut seq = sequence(&[40, 40], &[40, 0, 0, 40, 0, 40, 40]);
    let summary = assess(&mut seq);

    assert_eq!(summary.missing_days, 3);
    assert!(summary.has_missing_data());
    assert_eq!(summary.noise_days, 0);
    assert!(seq[AXIS_DAYS - 6].is_missing);
    assert!(!seq[AXIS_DAYS - 7].is_missing);
}

#[test]
fn test_sparse_history_single_gap_is_not_missing_data() {
    let mut seq = sequence(&[40], &[40, 40, 40, 0, 40, 40, 40]);
    let summary = assess(&mut seq);
    assert_eq!(summary.missing_days, 1);
    assert!(!summary.has_missing_data());
}

#[test]
fn test_days_before_first_activity_are_not_missing() {
    let mut seq = sequence(&[], &[0, 0, 0, 0, 0, 500, 700]);
    let summary = assess(&mut seq);
    assert_eq!(summary.missing_days, 0);
    assert!(seq.iter().all(|e| !e.is_missing));

    let mut seq = sequence(&[], &[0, 0, 0, 5, 0, 0, 0]);
    assert_eq!(assess(&mut seq).missing_days, 3);
}

#[test]
fn test_no_activity_has_nothing_missing() {
    let mut seq = sequence(&[], &[0; CHECK_DAYS]);
    let summary = assess(&mut seq);
    assert_eq!(summary.missing_days, 0);
    assert!(!summary.has_noise_data());
}

// =============================================================================
// Statistical judgement
// =============================================================================

#[test]
fn test_stable_history_judges_each_tail_day() {
    // Mean 100, standard deviation 10
    let history = alternating(82, 90, 110);
    let mut seq = sequence(&history, &[100, 0, 0, 105, 125, 400, 5]);
    let summary = assess(&mut seq);

    assert_eq!(
        week_flags(&seq),
        vec![
            (false, None),
            (true, None),
            (true, None),
            (false, None),
            (false, Some(NoiseKind::MinorDeviation)),
            (false, Some(NoiseKind::OutlierHigh)),
            (false, Some(NoiseKind::OutlierLow)),
        ]
    );
    assert_eq!(summary.missing_days, 2);
    assert!(summary.has_missing_data());
    assert_eq!(summary.noise_days, 3);
    assert!(summary.has_noise_data());
    assert!(seq[AXIS_DAYS - 1].is_noise);
}

#[test]
fn test_zero_in_volatile_history_is_noise() {
    // Mean 100, standard deviation 50
    let history = alternating(20, 50, 150);
    let mut seq = sequence(&history, &[100, 0, 0, 100, 100, 100, 100]);
    let summary = assess(&mut seq);

    assert_eq!(summary.missing_days, 0);
    assert!(!summary.has_missing_data());
    assert_eq!(summary.noise_days, 2);
    assert_eq!(seq[AXIS_DAYS - 6].noise_type, Some(NoiseKind::ZeroInHighVariance));
}

#[test]
fn test_zero_in_small_history_is_noise() {
    let history = vec![5; 10];
    let mut seq = sequence(&history, &[5, 5, 0, 5, 5, 0, 5]);
    let summary = assess(&mut seq);

    assert_eq!(summary.missing_days, 0);
    assert_eq!(seq[AXIS_DAYS - 5].noise_type, Some(NoiseKind::ZeroInLowAverage));
}

#[test]
fn test_unusually_low_value_is_noise() {
    // Mean 1000, standard deviation 400: 50 stays inside three deviations
    let history = alternating(10, 600, 1400);
    let mut seq = sequence(&history, &[1000, 1000, 1000, 1000, 1000, 1000, 50]);
    assess(&mut seq);
    assert_eq!(seq[AXIS_DAYS - 1].noise_type, Some(NoiseKind::UnusuallyLow));
}

#[test]
fn test_noise_type_serializes_snake_case() {
    let history = alternating(10, 600, 1400);
    let mut seq = sequence(&history, &[1000, 1000, 1000, 1000, 1000, 1000, 50]);
    assess(&mut seq);

    let last = serde_json::to_value(&seq[AXIS_DAYS - 1]).unwrap();
    assert_eq!(last["is_noise"], true);
    assert_eq!(last["is_missing"], false);
    assert_eq!(last["noise_type"], "unusually_low");

    let first = serde_json::to_value(&seq[0]).unwrap();
    assert!(first.get("noise_type").is_none());
}
