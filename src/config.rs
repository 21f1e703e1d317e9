//! Construction options.
//!
//! [`TimeSeriesOptions`] is both the argument of
//! [`TimeSeries::new`](crate::TimeSeries::new) and the override set of
//! [`TimeSeries::duplicate`](crate::TimeSeries::duplicate): every field is
//! optional, and an unset field falls back to the documented default (or, when
//! duplicating, to the parent's value).
use std::collections::BTreeMap;

use crate::labels::AxisRole;
use crate::logging::Logger;
use crate::sensors::{Sensors, Surface};
use crate::timeseries::TsType;

/// Sample period used when neither `sample_period` nor `time` is given.
pub const DEFAULT_SAMPLE_PERIOD: f64 = 1.0;

/// Time unit used when none is given.
pub const DEFAULT_TIME_UNIT: &str = "ms";

/// Options recognised when building a time series.
///
/// Construct one with struct-update syntax:
///
/// ```
/// use neuro_ts::{AxisRole, TimeSeriesOptions};
///
/// let opts = TimeSeriesOptions {
///     start_time:    Some(0.0),
///     sample_period: Some(0.01),
///     time_unit:     Some("s".into()),
///     ..TimeSeriesOptions::default()
/// }
/// .with_labels(AxisRole::Space, &["r1", "r2", "r3"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesOptions {
    /// Time of the first sample.
    ///
    /// Default: `0.0`, or `time[0]` when `time` is given.
    pub start_time: Option<f64>,

    /// Distance between two samples, in `time_unit`. Must be `> 0`.
    ///
    /// Default: [`DEFAULT_SAMPLE_PERIOD`], or `mean(diff(time))` when `time`
    /// is given.
    pub sample_period: Option<f64>,

    /// Explicit timestamps, used to derive `start_time` and `sample_period`
    /// when those are unset.
    ///
    /// Only the first value and the mean step survive: non-uniform sampling
    /// is not representable and is silently averaged.
    pub time: Option<Vec<f64>>,

    /// `"ms"` or `"s"`; any unit starting with `m` is treated as milliseconds
    /// when computing the sample rate.
    ///
    /// Default: [`DEFAULT_TIME_UNIT`].
    pub time_unit: Option<String>,

    /// Per-axis labels. Roles absent from the map keep their current labels
    /// (none, for a fresh series).
    pub labels: BTreeMap<AxisRole, Vec<String>>,

    /// Display names of the four axes, overriding the variant defaults.
    pub axis_names: Option<[String; 4]>,

    /// Variant tag. Ignored when `sensors` or `surface` is given, whose
    /// type decides the variant instead.
    ///
    /// Default: [`TsType::Region`].
    pub ts_type: Option<TsType>,

    pub sensors: Option<Sensors>,

    pub surface: Option<Surface>,

    /// Default: `"<variant> Time Series"`.
    pub title: Option<String>,

    /// Diagnostics sink; inherited by every derived series.
    pub logger: Option<Logger>,
}

impl TimeSeriesOptions {
    /// Set the labels of one axis.
    pub fn with_labels<S: AsRef<str>>(mut self, role: AxisRole, labels: &[S]) -> Self {
        self.labels
            .insert(role, labels.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn with_ts_type(mut self, ts_type: TsType) -> Self {
        self.ts_type = Some(ts_type);
        self
    }

    /// Fill every unset field of `self` from `base`.
    ///
    /// Explicit timestamps in `self` take precedence over the base's
    /// `start_time`/`sample_period`.
    pub(crate) fn or(mut self, base: TimeSeriesOptions) -> Self {
        if self.time.is_none() {
            self.start_time = self.start_time.or(base.start_time);
            self.sample_period = self.sample_period.or(base.sample_period);
            self.time = base.time;
        }
        self.time_unit = self.time_unit.or(base.time_unit);
        for (role, labels) in base.labels {
            self.labels.entry(role).or_insert(labels);
        }
        self.axis_names = self.axis_names.or(base.axis_names);
        self.ts_type = self.ts_type.or(base.ts_type);
        self.sensors = self.sensors.or(base.sensors);
        self.surface = self.surface.or(base.surface);
        self.title = self.title.or(base.title);
        self.logger = self.logger.or(base.logger);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_base() {
        let base = TimeSeriesOptions {
            start_time: Some(1.0),
            sample_period: Some(0.5),
            ..TimeSeriesOptions::default()
        }
        .with_labels(AxisRole::Space, &["a", "b"]);
        let merged = TimeSeriesOptions {
            start_time: Some(2.0),
            ..TimeSeriesOptions::default()
        }
        .or(base);
        assert_eq!(merged.start_time, Some(2.0));
        assert_eq!(merged.sample_period, Some(0.5));
        assert_eq!(merged.labels[&AxisRole::Space], vec!["a", "b"]);
    }

    #[test]
    fn explicit_time_replaces_base_timing() {
        let base = TimeSeriesOptions {
            start_time: Some(1.0),
            sample_period: Some(0.5),
            ..TimeSeriesOptions::default()
        };
        let merged = TimeSeriesOptions {
            time: Some(vec![3.0, 4.0]),
            ..TimeSeriesOptions::default()
        }
        .or(base);
        assert_eq!(merged.start_time, None);
        assert_eq!(merged.sample_period, None);
    }
}
