//! Missing-data and noise detection over the trailing week
//!
//! Each of the last seven pipeline values is judged against the tenant's own
//! history: the axis before that week, zero days excluded. With fewer than
//! five history points only zeros are flagged, as missing, and days before
//! the tenant's first pipeline activity are not counted.
//!
//! With enough history a zero is missing unless the history is too volatile
//! or too small for a zero to stand out, in which case it is noise. Nonzero
//! values outside three standard deviations, or off the mean by 10% or more,
//! are noise.

use serde::Serialize;

use crate::divergence::DateEntry;

/// Trailing entries judged
pub const CHECK_DAYS: usize = 7;

/// History points below which only zeros are judged
pub const MIN_HISTORY: usize = 5;

/// Missing days within the week that raise the missing-data tag
pub const MISSING_DAYS_THRESHOLD: usize = 2;

/// Why a tail value was classed as noise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Zero while the history swings more than half its mean
    ZeroInHighVariance,
    /// Zero while the history averages under 10
    ZeroInLowAverage,
    OutlierLow,
    OutlierHigh,
    /// Within 10%..30% of the mean
    MinorDeviation,
    /// Under a tenth of a mean above 100
    UnusuallyLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Normal,
    Missing,
    Noise(NoiseKind),
}

/// Mean and population standard deviation of the nonzero history
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct History {
    pub avg: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl History {
    pub(crate) fn of(values: impl Iterator<Item = i64>) -> Self {
        let valid: Vec<f64> = values.filter(|v| *v > 0).map(|v| v as f64).collect();
        if valid.is_empty() {
            return Self {
                avg: 0.0,
                std_dev: 0.0,
                count: 0,
            };
        }

        let n = valid.len() as f64;
        let avg = valid.iter().sum::<f64>() / n;
        let variance = valid.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / n;
        Self {
            avg,
            std_dev: variance.sqrt(),
            count: valid.len(),
        }
    }

    fn judge(&self, value: i64) -> Verdict {
        if value == 0 {
            return if self.avg <= self.std_dev * 2.0 {
                Verdict::Noise(NoiseKind::ZeroInHighVariance)
            } else if self.avg > 0.0 && self.avg < 10.0 {
                Verdict::Noise(NoiseKind::ZeroInLowAverage)
            } else {
                Verdict::Missing
            };
        }

        let value = value as f64;
        if value < self.avg - 3.0 * self.std_dev {
            return Verdict::Noise(NoiseKind::OutlierLow);
        }
        if value > self.avg + 3.0 * self.std_dev {
            return Verdict::Noise(NoiseKind::OutlierHigh);
        }

        if self.avg > 0.0 {
            let relative = (value - self.avg).abs() / self.avg;
            if relative < 0.1 {
                return Verdict::Normal;
            }
            if relative < 0.3 {
                return Verdict::Noise(NoiseKind::MinorDeviation);
            }
        }

        if self.avg > 100.0 && value < self.avg * 0.1 {
            Verdict::Noise(NoiseKind::UnusuallyLow)
        } else {
            Verdict::Normal
        }
    }
}

/// Counts from one assessed week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualitySummary {
    pub missing_days: usize,
    pub noise_days: usize,
}

impl QualitySummary {
    pub fn has_missing_data(&self) -> bool {
        self.missing_days >= MISSING_DAYS_THRESHOLD
    }

    pub fn has_noise_data(&self) -> bool {
        self.noise_days > 0
    }
}

/// Mark the trailing week of `sequence` and count what was found
pub fn assess(sequence: &mut [DateEntry]) -> QualitySummary {
    let start = sequence.len().saturating_sub(CHECK_DAYS);
    let history = History::of(sequence[..start].iter().map(|e| e.warehouse_value));
    let first_active = sequence.iter().position(|e| e.warehouse_value != 0);

    let mut summary = QualitySummary::default();
    for (i, entry) in sequence.iter_mut().enumerate().skip(start) {
        let verdict = if history.count >= MIN_HISTORY {
            history.judge(entry.warehouse_value)
        } else if entry.warehouse_value == 0 && first_active.is_some_and(|first| first < i) {
            Verdict::Missing
        } else {
            Verdict::Normal
        };

        match verdict {
            Verdict::Normal => {}
            Verdict::Missing => {
                entry.is_missing = true;
                summary.missing_days += 1;
            }
            Verdict::Noise(kind) => {
                entry.is_noise = true;
                entry.noise_type = Some(kind);
                summary.noise_days += 1;
            }
        }
    }
    summary
}
