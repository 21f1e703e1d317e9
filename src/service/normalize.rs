//! Signal normalisation strategies.
//!
//! Each strategy computes a statistic along one axis (or over the whole
//! array when no axis is given) and subtracts it from, or divides it into,
//! the data:
//!
//! | name             | operation                                         |
//! |------------------|---------------------------------------------------|
//! | `zscore`         | `(x − mean) / std` (ddof = 0)                     |
//! | `mean`           | `x − mean`                                        |
//! | `min`            | `x − min`                                         |
//! | `max`            | `x / max`                                         |
//! | `std`            | `x / std`                                         |
//! | `baseline`       | `x − percentile(x, low)`                          |
//! | `amplitude`      | `x / (percentile(x, high) − percentile(x, low))`  |
//! | `maxamplitude`   | as `amplitude`, divisor = max over lanes          |
//! | `meanamplitude`  | as `amplitude`, divisor = mean over lanes         |
//! | `minmax`         | `min`, then `max`                                 |
//! | `baseline-std`   | `baseline`, then `std`                            |
//! | `baseline-*amplitude` | `baseline`, then the amplitude variant       |
use std::fmt;
use std::str::FromStr;

use ndarray::{Array4, Axis};

use crate::error::{Error, Result};

/// Names accepted by [`Normalization::from_str`].
pub const NORMALIZATION_METHODS: [&str; 14] = [
    "zscore",
    "mean",
    "min",
    "max",
    "std",
    "baseline",
    "baseline-amplitude",
    "baseline-maxamplitude",
    "baseline-meanamplitude",
    "baseline-std",
    "minmax",
    "amplitude",
    "maxamplitude",
    "meanamplitude",
];

/// How per-lane amplitudes are combined into the divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudeReduction {
    PerLane,
    Max,
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Zscore,
    Mean,
    Min,
    Max,
    Std,
    Baseline,
    Amplitude(AmplitudeReduction),
    MinMax,
    BaselineStd,
    BaselineAmplitude(AmplitudeReduction),
}

impl Normalization {
    /// The base strategies a composite applies, in order. A base strategy
    /// returns itself.
    pub fn steps(self) -> Vec<Normalization> {
        match self {
            Normalization::MinMax => vec![Normalization::Min, Normalization::Max],
            Normalization::BaselineStd => vec![Normalization::Baseline, Normalization::Std],
            Normalization::BaselineAmplitude(r) => {
                vec![Normalization::Baseline, Normalization::Amplitude(r)]
            }
            base => vec![base],
        }
    }

    pub fn is_composite(self) -> bool {
        self.steps().len() > 1
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let amplitude = |prefix: &str| match prefix {
            "" => Some(AmplitudeReduction::PerLane),
            "max" => Some(AmplitudeReduction::Max),
            "mean" => Some(AmplitudeReduction::Mean),
            _ => None,
        };
        let name = s.trim().to_ascii_lowercase();
        let parsed = match name.as_str() {
            "zscore" => Some(Normalization::Zscore),
            "mean" => Some(Normalization::Mean),
            "min" => Some(Normalization::Min),
            "max" => Some(Normalization::Max),
            "std" => Some(Normalization::Std),
            "baseline" => Some(Normalization::Baseline),
            "minmax" => Some(Normalization::MinMax),
            "baseline-std" => Some(Normalization::BaselineStd),
            n => match n.strip_prefix("baseline-") {
                Some(rest) => rest
                    .strip_suffix("amplitude")
                    .and_then(amplitude)
                    .map(Normalization::BaselineAmplitude),
                None => n
                    .strip_suffix("amplitude")
                    .and_then(amplitude)
                    .map(Normalization::Amplitude),
            },
        };
        parsed.ok_or_else(|| Error::UnknownNormalization {
            name: s.to_string(),
            valid: NORMALIZATION_METHODS.to_vec(),
        })
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amp = |r: &AmplitudeReduction| match r {
            AmplitudeReduction::PerLane => "amplitude",
            AmplitudeReduction::Max => "maxamplitude",
            AmplitudeReduction::Mean => "meanamplitude",
        };
        match self {
            Normalization::Zscore => f.write_str("zscore"),
            Normalization::Mean => f.write_str("mean"),
            Normalization::Min => f.write_str("min"),
            Normalization::Max => f.write_str("max"),
            Normalization::Std => f.write_str("std"),
            Normalization::Baseline => f.write_str("baseline"),
            Normalization::MinMax => f.write_str("minmax"),
            Normalization::BaselineStd => f.write_str("baseline-std"),
            Normalization::Amplitude(r) => f.write_str(amp(r)),
            Normalization::BaselineAmplitude(r) => write!(f, "baseline-{}", amp(r)),
        }
    }
}

/// Lower and upper percentile (0–100) used by `baseline` (lower only) and
/// the amplitude strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentiles {
    pub low: f64,
    pub high: f64,
}

impl Default for Percentiles {
    /// `1` and `99`.
    fn default() -> Self {
        Self { low: 1.0, high: 99.0 }
    }
}

/// Apply `normalization` along `axis` (whole array when `None`).
///
/// Composite strategies recurse into their steps. Zero-spread lanes are
/// left centred rather than divided by zero in `zscore`; `max`, `std` and
/// the amplitude strategies divide unguarded.
pub fn normalize_signals(
    data: &Array4<f64>,
    normalization: Normalization,
    axis: Option<usize>,
    percent: Percentiles,
) -> Result<Array4<f64>> {
    if let Some(ax) = axis.filter(|&ax| ax >= 4) {
        return Err(Error::InvalidParameter(format!("normalization axis {ax} out of range 0..4")));
    }
    if normalization.is_composite() {
        return normalization
            .steps()
            .into_iter()
            .try_fold(data.clone(), |acc, step| normalize_signals(&acc, step, axis, percent));
    }
    let out = match normalization {
        Normalization::Zscore => {
            let mean = reduce(data, axis, mean);
            let std = reduce(data, axis, std).mapv(|s| if s > 0.0 { s } else { 1.0 });
            (data - &mean) / &std
        }
        Normalization::Mean => data - &reduce(data, axis, mean),
        Normalization::Min => data - &reduce(data, axis, |v| v.iter().copied().fold(f64::INFINITY, f64::min)),
        Normalization::Max => data / &reduce(data, axis, |v| v.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        Normalization::Std => data / &reduce(data, axis, std),
        Normalization::Baseline => data - &reduce(data, axis, |v| percentile(v, percent.low)),
        Normalization::Amplitude(reduction) => {
            let amp = reduce(data, axis, |v| percentile(v, percent.high) - percentile(v, percent.low));
            match reduction {
                AmplitudeReduction::PerLane => data / &amp,
                AmplitudeReduction::Max => {
                    let m = amp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    data / m
                }
                AmplitudeReduction::Mean => {
                    let m = amp.iter().sum::<f64>() / amp.len() as f64;
                    data / m
                }
            }
        }
        Normalization::MinMax | Normalization::BaselineStd | Normalization::BaselineAmplitude(_) => {
            unreachable!("composite strategies are handled above")
        }
    };
    Ok(out)
}

/// Statistic `f` along `axis`, kept as a length-1 axis so it broadcasts back
/// over `data`. With no axis the statistic covers every element.
fn reduce<F: Fn(&[f64]) -> f64>(data: &Array4<f64>, axis: Option<usize>, f: F) -> Array4<f64> {
    match axis {
        Some(ax) => data
            .map_axis(Axis(ax), |lane| f(&lane.to_vec()))
            .insert_axis(Axis(ax)),
        None => {
            let all: Vec<f64> = data.iter().copied().collect();
            Array4::from_elem((1, 1, 1, 1), f(&all))
        }
    }
}

pub(crate) fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

pub(crate) fn std(v: &[f64]) -> f64 {
    let m = mean(v);
    (v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / v.len() as f64).sqrt()
}

/// `q`-th percentile (0–100) with linear interpolation between order
/// statistics.
pub fn percentile(v: &[f64], q: f64) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
