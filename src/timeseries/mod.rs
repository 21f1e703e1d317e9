//! Labelled 4-D time series.
//!
//! [`TimeSeries`] owns a `[time, variables, space, samples]` array together
//! with its time axis (`start_time`, `sample_period`, `time_unit`), one label
//! set per axis and a variant tag. It is immutable: every selection or
//! transform builds a new instance through the same constructor path
//! ([`TimeSeries::duplicate`] / [`TimeSeries::with_data`]), with the parent's
//! metadata as defaults.
//!
//! ```text
//! axis 0  Time             start_time + i · sample_period
//! axis 1  State Variables  e.g. ["x", "y", "source"]
//! axis 2  Space            "Region" | "Vertex" | "<type> sensor" | "Y"
//! axis 3  Samples          e.g. stochastic realisations
//! ```
//!
//! - [`select`]: index/label/time sub-selection, windows, decimation,
//!   bipolar montage and named access ([`TimeSeries::get`]).
//! - [`index`]: mixed slice/label indexing returning raw arrays.

pub mod index;
pub mod select;
pub mod variant;

pub use index::{Bound, Selector};
pub use select::Key;
pub use variant::TsType;

use ndarray::{Array, Array1, Array4, ArrayD, Axis, Dimension, Ix4};

use crate::config::{TimeSeriesOptions, DEFAULT_SAMPLE_PERIOD, DEFAULT_TIME_UNIT};
use crate::error::{Error, Result};
use crate::labels::{AxisLabelRegistry, AxisRole};
use crate::logging::Logger;
use crate::sensors::{Sensors, Surface};

/// Promote a 2-D or 3-D array to 4-D with singleton axes.
///
/// `[T, S]` → `[T, 1, S, 1]`, `[T, V, S]` → `[T, V, S, 1]`. Rank 1 (no axis
/// besides time) and rank > 4 are rejected.
pub fn prepare_4d(data: ArrayD<f64>) -> Result<Array4<f64>> {
    let ndim = data.ndim();
    let data = match ndim {
        2 => data.insert_axis(Axis(1)).insert_axis(Axis(3)),
        3 => data.insert_axis(Axis(3)),
        4 => data,
        _ => return Err(Error::Shape { ndim }),
    };
    data.into_dimensionality::<Ix4>()
        .map_err(|_| Error::Shape { ndim })
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    data: Array4<f64>,
    start_time: f64,
    sample_period: f64,
    time_unit: String,
    registry: AxisLabelRegistry,
    ts_type: TsType,
    sensors: Option<Sensors>,
    surface: Option<Surface>,
    title: String,
    logger: Logger,
}

impl TimeSeries {
    /// Build a time series from a 2-D to 4-D array.
    ///
    /// # Errors
    ///
    /// * [`Error::Shape`] for rank 1 or rank > 4 input.
    /// * [`Error::LabelMismatch`] if a non-empty label set does not match the
    ///   length of its axis.
    /// * [`Error::InvalidParameter`] for a non-positive sample period.
    ///
    /// # Examples
    ///
    /// ```
    /// use neuro_ts::{AxisRole, TimeSeries, TimeSeriesOptions};
    /// use ndarray::Array2;
    ///
    /// let opts = TimeSeriesOptions {
    ///     sample_period: Some(0.01),
    ///     ..TimeSeriesOptions::default()
    /// }
    /// .with_labels(AxisRole::Space, &["r1", "r2", "r3"]);
    /// let ts = TimeSeries::new(Array2::<f64>::zeros((3, 3)), opts).unwrap();
    /// assert_eq!(ts.shape(), [3, 1, 3, 1]);
    /// ```
    pub fn new<D: Dimension>(data: Array<f64, D>, options: TimeSeriesOptions) -> Result<Self> {
        let logger = options
            .logger
            .clone()
            .unwrap_or_else(|| Logger::new("neuro_ts::timeseries"));
        let data = prepare_4d(data.into_dyn()).map_err(|e| {
            logger.error(format_args!("{e}"));
            e
        })?;
        Self::build(data, TimeSeriesOptions { logger: Some(logger), ..options })
    }

    /// Deep copy of `source`, with `overrides` applied.
    pub fn from_series(source: &TimeSeries, overrides: TimeSeriesOptions) -> Result<Self> {
        source.duplicate(overrides)
    }

    /// Copy of `self` with `overrides` applied.
    pub fn duplicate(&self, overrides: TimeSeriesOptions) -> Result<Self> {
        self.derive(self.data.clone(), overrides)
    }

    /// New series holding `data`, with `self`'s metadata as defaults.
    pub fn with_data<D: Dimension>(&self, data: Array<f64, D>, overrides: TimeSeriesOptions) -> Result<Self> {
        self.derive(prepare_4d(data.into_dyn())?, overrides)
    }

    pub(crate) fn derive(&self, data: Array4<f64>, overrides: TimeSeriesOptions) -> Result<Self> {
        let mut base = self.options();
        if overrides.ts_type.is_some() || overrides.sensors.is_some() || overrides.surface.is_some() {
            // A new variant brings its own axis names, title and collaborators.
            base.axis_names = None;
            base.title = None;
            base.sensors = None;
            base.surface = None;
            base.ts_type = None;
        }
        Self::build(data, overrides.or(base))
    }

    /// Metadata of `self` as a fully populated option set.
    fn options(&self) -> TimeSeriesOptions {
        TimeSeriesOptions {
            start_time: Some(self.start_time),
            sample_period: Some(self.sample_period),
            time: None,
            time_unit: Some(self.time_unit.clone()),
            labels: AxisRole::ALL
                .iter()
                .map(|&r| (r, self.registry.labels(r).to_vec()))
                .collect(),
            axis_names: Some(self.registry.ordering().clone()),
            ts_type: Some(self.ts_type),
            sensors: self.sensors.clone(),
            surface: self.surface.clone(),
            title: Some(self.title.clone()),
            logger: Some(self.logger.clone()),
        }
    }

    fn build(data: Array4<f64>, opts: TimeSeriesOptions) -> Result<Self> {
        let logger = opts.logger.unwrap_or_else(|| Logger::new("neuro_ts::timeseries"));

        let (mut start_time, mut sample_period) = (opts.start_time, opts.sample_period);
        if let Some(time) = opts.time.as_deref().filter(|t| !t.is_empty()) {
            start_time = start_time.or(Some(time[0]));
            if time.len() > 1 {
                let mean_step = (time[time.len() - 1] - time[0]) / (time.len() - 1) as f64;
                sample_period = sample_period.or(Some(mean_step));
                let uneven = time
                    .windows(2)
                    .any(|w| ((w[1] - w[0]) - mean_step).abs() > 1e-6 * mean_step.abs());
                if uneven {
                    logger.warn(format_args!(
                        "timestamps are not evenly spaced, using the mean step {mean_step}"
                    ));
                }
            }
            logger.debug(format_args!(
                "derived start_time={:?} sample_period={:?} from {} timestamps",
                start_time,
                sample_period,
                time.len()
            ));
        }
        let start_time = start_time.unwrap_or(0.0);
        let sample_period = sample_period.unwrap_or(DEFAULT_SAMPLE_PERIOD);
        if !(sample_period.is_finite() && sample_period > 0.0) {
            let e = Error::InvalidParameter(format!("sample period must be > 0, got {sample_period}"));
            logger.error(format_args!("{e}"));
            return Err(e);
        }

        let ts_type = match (&opts.sensors, &opts.surface) {
            (Some(s), _) => TsType::from_sensors(s.sensors_type),
            (None, Some(_)) => TsType::Surface,
            (None, None) => opts.ts_type.unwrap_or_default(),
        };

        let mut registry = AxisLabelRegistry::new(opts.axis_names.unwrap_or_else(|| ts_type.axis_names()));
        for (role, labels) in opts.labels {
            registry.set_labels(role, labels);
        }

        let n_space = data.len_of(Axis(AxisRole::Space.axis()));
        if let Some(sensors) = &opts.sensors {
            if !registry.is_labelled(AxisRole::Space) && sensors.labels.len() == n_space {
                registry.set_labels(AxisRole::Space, sensors.labels.clone());
            }
        }
        if let Some(surface) = &opts.surface {
            if surface.number_of_vertices() != n_space {
                let e = Error::Configuration(format!(
                    "surface has {} vertices but the space axis has length {n_space}",
                    surface.number_of_vertices()
                ));
                logger.error(format_args!("{e}"));
                return Err(e);
            }
        }

        if let Err(e) = registry.validate(data.shape()) {
            logger.error(format_args!("{e}"));
            return Err(e);
        }

        Ok(Self {
            data,
            start_time,
            sample_period,
            time_unit: opts.time_unit.unwrap_or_else(|| DEFAULT_TIME_UNIT.to_string()),
            registry,
            ts_type,
            sensors: opts.sensors,
            surface: opts.surface,
            title: opts.title.unwrap_or_else(|| ts_type.default_title()),
            logger,
        })
    }

    // ── Array ──────────────────────────────────────────────────────────────

    #[inline]
    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    /// Consume the series, keeping only its array.
    pub fn into_data(self) -> Array4<f64> {
        self.data
    }

    pub fn shape(&self) -> [usize; 4] {
        let (t, v, s, n) = self.data.dim();
        [t, v, s, n]
    }

    /// Always 4.
    pub fn number_of_dimensions(&self) -> usize {
        self.data.ndim()
    }

    pub fn time_length(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn number_of_variables(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Length of the space axis.
    pub fn number_of_labels(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn number_of_samples(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// The array with every length-1 axis removed.
    pub fn squeezed(&self) -> ArrayD<f64> {
        let mut view = self.data.view().into_dyn();
        for ax in (0..view.ndim()).rev() {
            if view.len_of(Axis(ax)) == 1 {
                view = view.index_axis_move(Axis(ax), 0);
            }
        }
        view.to_owned()
    }

    // ── Time axis ──────────────────────────────────────────────────────────

    #[inline]
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    #[inline]
    pub fn sample_period(&self) -> f64 {
        self.sample_period
    }

    pub fn time_unit(&self) -> &str {
        &self.time_unit
    }

    /// Alias of [`time_unit`](Self::time_unit).
    pub fn sample_period_unit(&self) -> &str {
        &self.time_unit
    }

    pub fn end_time(&self) -> f64 {
        self.time_for_index(self.time_length().saturating_sub(1))
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time
    }

    /// Timestamps of every sample: `start_time + i · sample_period`.
    pub fn time(&self) -> Array1<f64> {
        Array1::from_shape_fn(self.time_length(), |i| self.time_for_index(i))
    }

    /// Samples per second (the period is read as milliseconds when the unit
    /// starts with `m`).
    pub fn sample_rate(&self) -> f64 {
        if self.time_unit.starts_with('m') {
            1000.0 / self.sample_period
        } else {
            1.0 / self.sample_period
        }
    }

    #[inline]
    pub(crate) fn time_for_index(&self, index: usize) -> f64 {
        self.start_time + index as f64 * self.sample_period
    }

    /// Index of the last sample at or before `t`.
    ///
    /// Values within 1e-9 of an integer index snap to it, so `t` taken from
    /// [`time`](Self::time) maps back to its own index.
    pub(crate) fn index_for_time(&self, t: f64) -> isize {
        let x = (t - self.start_time) / self.sample_period;
        let r = x.round();
        if (x - r).abs() < 1e-9 {
            r as isize
        } else {
            x.floor() as isize
        }
    }

    // ── Labels and metadata ────────────────────────────────────────────────

    pub fn registry(&self) -> &AxisLabelRegistry {
        &self.registry
    }

    pub fn labels(&self, role: AxisRole) -> &[String] {
        self.registry.labels(role)
    }

    /// Axis display names in physical order.
    pub fn labels_ordering(&self) -> &[String; 4] {
        self.registry.ordering()
    }

    pub fn time_labels(&self) -> &[String] {
        self.registry.labels(AxisRole::Time)
    }

    pub fn variables_labels(&self) -> &[String] {
        self.registry.labels(AxisRole::Variables)
    }

    pub fn space_labels(&self) -> &[String] {
        self.registry.labels(AxisRole::Space)
    }

    pub fn samples_labels(&self) -> &[String] {
        self.registry.labels(AxisRole::Samples)
    }

    pub fn ts_type(&self) -> TsType {
        self.ts_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn sensors(&self) -> Option<&Sensors> {
        self.sensors.as_ref()
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}
