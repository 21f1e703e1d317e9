//! Stateless operations over [`TimeSeries`].
//!
//! [`TimeseriesService`] holds nothing but a logger. Every operation takes
//! its input series by reference and returns a new one (or plain arrays for
//! the statistics), so calls chain freely:
//!
//! ```text
//! raw ──filter──▶ band ──hilbert_envelope──▶ env ──normalize("zscore")──▶ z
//!                                                  │
//!                                 select_by_power ◀┘
//! ```
//!
//! - [`normalize`]: normalisation strategies and percentiles.
//! - [`transform`]: per-lane envelope, detrend, convolution and spectrogram kernels.
//! - [`select`]: metric thresholds, elbow detection, average-linkage clustering.
//! - [`seeg`]: source-to-sensor projection.
pub mod normalize;
pub mod select;
pub mod seeg;
pub mod transform;

pub use normalize::{normalize_signals, AmplitudeReduction, Normalization, Percentiles, NORMALIZATION_METHODS};
pub use select::{GroupClustering, MetricThreshold};
pub use seeg::SumMode;
pub use transform::DetrendType;

use std::collections::BTreeMap;

use ndarray::{concatenate, s, Array1, Array2, Array4, ArrayView1, ArrayView4, Axis};

use crate::config::TimeSeriesOptions;
use crate::error::{Error, Result};
use crate::filter::{apply_fir_zero_phase, design, firwin, FilterBand};
use crate::labels::AxisRole;
use crate::logging::Logger;
use crate::sensors::Sensors;
use crate::timeseries::{Key, TimeSeries};

/// Default segment length of [`TimeseriesService::spectrogram_envelope`].
pub const DEFAULT_NPERSEG: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct TimeseriesService {
    logger: Logger,
}

impl TimeseriesService {
    pub fn new() -> Self {
        Self::with_logger(Logger::new("neuro_ts::service"))
    }

    pub fn with_logger(logger: Logger) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    fn fail<T>(&self, e: Error) -> Result<T> {
        self.logger.error(format_args!("{e}"));
        Err(e)
    }

    // ── Resampling ─────────────────────────────────────────────────────────

    /// Keep every `ratio`-th sample; the sample period grows by `ratio`.
    pub fn decimate(&self, ts: &TimeSeries, ratio: usize) -> Result<TimeSeries> {
        match ratio {
            0 => self.fail(Error::InvalidParameter("decimation ratio must be ≥ 1".into())),
            1 => ts.duplicate(TimeSeriesOptions::default()),
            _ => {
                self.logger.debug(format_args!("decimating {} samples by {ratio}", ts.time_length()));
                ts.decimate_time(ts.sample_period() * ratio as f64)
            }
        }
    }

    /// Anti-alias lowpass at `sample_rate / (2 · ratio)` (Hamming FIR,
    /// `20 · ratio + 1` taps, zero phase), then [`decimate`](Self::decimate).
    pub fn decimate_by_filtering(&self, ts: &TimeSeries, ratio: usize) -> Result<TimeSeries> {
        if ratio <= 1 {
            return self.decimate(ts, ratio);
        }
        let sfreq = ts.sample_rate();
        let h = firwin(20 * ratio + 1, sfreq / (2.0 * ratio as f64), sfreq, true);
        let mut data = ts.data().clone();
        apply_fir_zero_phase(&mut data, &h, Axis(0))?;
        let filtered = ts.derive(data, TimeSeriesOptions::default())?;
        self.decimate(&filtered, ratio)
    }

    // ── Filtering and envelopes ────────────────────────────────────────────

    /// Zero-phase FIR filter along time. Cutoffs are in Hz; `mode` is one of
    /// `"bandpass"`, `"bandstop"`, `"lowpass"`, `"highpass"`.
    pub fn filter(
        &self,
        ts: &TimeSeries,
        lowcut: Option<f64>,
        highcut: Option<f64>,
        mode: &str,
    ) -> Result<TimeSeries> {
        let band = FilterBand::from_cutoffs(lowcut, highcut, mode).or_else(|e| self.fail(e))?;
        let h = design(band, ts.sample_rate()).or_else(|e| self.fail(e))?;
        self.logger.debug(format_args!(
            "{band:?} at {} Hz: {} taps over {} samples",
            ts.sample_rate(),
            h.len(),
            ts.time_length()
        ));
        let mut data = ts.data().clone();
        apply_fir_zero_phase(&mut data, &h, Axis(0))?;
        ts.derive(data, TimeSeriesOptions::default())
    }

    /// Sliding-window smoothing along time ('same' length).
    ///
    /// The window has `round(win_len)` samples. Without a kernel it is a
    /// moving average. A given kernel is multiplied by a window of ones, so
    /// it must have that length or be a single weight.
    pub fn convolve(&self, ts: &TimeSeries, win_len: f64, kernel: Option<&[f64]>) -> Result<TimeSeries> {
        let n = win_len.round();
        if !(n >= 1.0) {
            return self.fail(Error::InvalidParameter(format!("window length {win_len} < 1")));
        }
        let n = n as usize;
        let kernel = match kernel {
            Some(k) if k.len() == n => k.to_vec(),
            Some(&[w]) => vec![w; n],
            Some(k) => {
                return self.fail(Error::InvalidParameter(format!(
                    "kernel has {} taps, window needs {n}",
                    k.len()
                )))
            }
            None => vec![1.0 / n as f64; n],
        };
        let data = map_lanes(ts.data(), |x| transform::convolve_same(x, &kernel));
        ts.derive(data, TimeSeriesOptions::default())
    }

    /// Amplitude of the analytic signal of every lane.
    pub fn hilbert_envelope(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        let hilbert = transform::Hilbert::new(ts.time_length());
        let data = try_map_lanes(ts.data(), |x| hilbert.amplitude(x)).or_else(|e| self.fail(e))?;
        ts.derive(data, TimeSeriesOptions::default())
    }

    /// `|x − mean| + mean`, mean taken over time per lane.
    pub fn abs_envelope(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        let data = map_lanes(ts.data(), |x| {
            let m = normalize::mean(x);
            x.iter().map(|v| (v - m).abs() + m).collect()
        });
        ts.derive(data, TimeSeriesOptions::default())
    }

    /// Band power over short Hann segments (see
    /// [`transform::spectrogram_band_power`]).
    ///
    /// The result has one sample per segment. Its start is the input start
    /// plus the first segment centre, its period the segment step; both are
    /// expressed in the input's time unit.
    pub fn spectrogram_envelope(
        &self,
        ts: &TimeSeries,
        lpf: Option<f64>,
        hpf: Option<f64>,
        nperseg: Option<usize>,
    ) -> Result<TimeSeries> {
        let fs = ts.sample_rate();
        let nperseg = nperseg.unwrap_or_else(|| DEFAULT_NPERSEG.min(ts.time_length()));
        let spectrogram = transform::Spectrogram::new(fs, nperseg, lpf, hpf).or_else(|e| self.fail(e))?;
        let mut bands = Vec::new();
        for lane in ts.data().lanes(Axis(0)) {
            bands.push(spectrogram.band_power(&lane.to_vec()).or_else(|e| self.fail(e))?);
        }
        let Some(first) = bands.first() else {
            return self.fail(Error::InvalidParameter("spectrogram of an empty series".into()));
        };
        let times = first.times.clone();
        let (_, v, s, n) = ts.data().dim();
        let mut data = Array4::<f64>::zeros((times.len(), v, s, n));
        for (mut out, band) in data.lanes_mut(Axis(0)).into_iter().zip(&bands) {
            out.assign(&ArrayView1::from(&band.power));
        }

        let to_unit = if ts.time_unit().starts_with('m') { 1000.0 } else { 1.0 };
        let step = (nperseg - nperseg / 8) as f64 / fs;
        let mut overrides = TimeSeriesOptions {
            start_time: Some(ts.start_time() + times[0] * to_unit),
            sample_period: Some(step * to_unit),
            ..TimeSeriesOptions::default()
        };
        overrides.labels.insert(AxisRole::Time, vec![]);
        self.logger.debug(format_args!(
            "spectrogram: {} segments of {nperseg} samples",
            times.len()
        ));
        ts.derive(data, overrides)
    }

    /// Remove a linear or constant trend from every lane.
    pub fn detrend(&self, ts: &TimeSeries, kind: DetrendType) -> Result<TimeSeries> {
        let data = map_lanes(ts.data(), |x| {
            let mut y = x.to_vec();
            transform::detrend(&mut y, kind);
            y
        });
        ts.derive(data, TimeSeriesOptions::default())
    }

    // ── Elementwise ────────────────────────────────────────────────────────

    pub fn log(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        ts.derive(ts.data().mapv(f64::ln), TimeSeriesOptions::default())
    }

    pub fn exp(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        ts.derive(ts.data().mapv(f64::exp), TimeSeriesOptions::default())
    }

    pub fn abs(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        ts.derive(ts.data().mapv(f64::abs), TimeSeriesOptions::default())
    }

    pub fn square(&self, ts: &TimeSeries) -> Result<TimeSeries> {
        ts.derive(ts.data().mapv(|v| v * v), TimeSeriesOptions::default())
    }

    /// Apply a named normalisation (see [`NORMALIZATION_METHODS`]) along
    /// `axis`, or over the whole array when `axis` is `None`.
    ///
    /// `percent` defaults to [`Percentiles::default`].
    pub fn normalize(
        &self,
        ts: &TimeSeries,
        normalization: &str,
        axis: Option<usize>,
        percent: Option<Percentiles>,
    ) -> Result<TimeSeries> {
        let strategy: Normalization = normalization.parse().or_else(|e| self.fail(e))?;
        self.logger.debug(format_args!("normalizing with {strategy} along {axis:?}"));
        let data = normalize_signals(ts.data(), strategy, axis, percent.unwrap_or_default())
            .or_else(|e| self.fail(e))?;
        ts.derive(data, TimeSeriesOptions::default())
    }

    // ── Statistics ─────────────────────────────────────────────────────────

    /// Energy of every space element after removing the temporal mean:
    /// `Σ_{t,v,n} (x − mean_t x)²`.
    pub fn power(&self, ts: &TimeSeries) -> Array1<f64> {
        let data = ts.data();
        let mean = data.mean_axis(Axis(0));
        let mut power = Array1::<f64>::zeros(ts.number_of_labels());
        if let Some(mean) = mean {
            let centred = data - &mean.insert_axis(Axis(0));
            for (s, p) in power.iter_mut().enumerate() {
                *p = centred.index_axis(Axis(2), s).mapv(|v| v * v).sum();
            }
        }
        power
    }

    /// Pearson correlation between space elements, each flattened over
    /// time, variables and samples.
    pub fn correlation(&self, ts: &TimeSeries) -> Array2<f64> {
        select::corrcoef(&space_signals(ts.data().view()))
    }

    // ── Concatenation ──────────────────────────────────────────────────────

    /// Join series along time.
    ///
    /// The space axis of every series is restricted to `labels` (default: the
    /// first series' space labels, if any), so channels line up by label.
    /// Sample periods must agree to single precision.
    pub fn concatenate_in_time<S: AsRef<str>>(
        &self,
        series: &[TimeSeries],
        labels: Option<&[S]>,
    ) -> Result<TimeSeries> {
        let Some(head) = series.first() else {
            return self.fail(Error::InvalidParameter("nothing to concatenate".into()));
        };
        let labels: Vec<String> = match labels {
            Some(l) => l.iter().map(|s| s.as_ref().to_string()).collect(),
            None => head.space_labels().to_vec(),
        };
        let expected = head.sample_period() as f32;
        let mut parts = Vec::with_capacity(series.len());
        for (index, ts) in series.iter().enumerate() {
            let period = ts.sample_period() as f32;
            if period != expected {
                return self.fail(Error::IncompatibleSamplePeriod { index, period, expected });
            }
            parts.push(if labels.is_empty() {
                ts.clone()
            } else {
                ts.get_subspace_by_label(&labels)?
            });
        }

        let views: Vec<ArrayView4<'_, f64>> = parts.iter().map(|p| p.data().view()).collect();
        let data = concatenate(Axis(0), &views).or_else(|e| {
            self.fail(Error::InvalidParameter(format!("cannot concatenate in time: {e}")))
        })?;
        let mut overrides = TimeSeriesOptions::default();
        let time_labels = if parts.iter().all(|p| !p.time_labels().is_empty()) {
            parts.iter().flat_map(|p| p.time_labels().iter().cloned()).collect()
        } else {
            vec![]
        };
        overrides.labels.insert(AxisRole::Time, time_labels);
        self.logger.debug(format_args!(
            "concatenated {} series into {} samples",
            parts.len(),
            data.len_of(Axis(0))
        ));
        parts[0].derive(data, overrides)
    }

    // ── Channel selection ──────────────────────────────────────────────────

    fn subspace(&self, ts: &TimeSeries, indices: Vec<usize>) -> Result<(TimeSeries, Vec<usize>)> {
        self.logger.debug(format_args!("selected space indices {indices:?}"));
        let sub = ts.get_subspace_by_index(&indices)?;
        Ok((sub, indices))
    }

    /// Space elements whose `metric` passes `criterion`.
    pub fn select_by_metric(
        &self,
        ts: &TimeSeries,
        metric: &[f64],
        criterion: MetricThreshold,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        if metric.len() != ts.number_of_labels() {
            return self.fail(Error::InvalidParameter(format!(
                "metric has {} values for {} space elements",
                metric.len(),
                ts.number_of_labels()
            )));
        }
        self.subspace(ts, select::select_greater_values(metric, criterion))
    }

    /// [`select_by_metric`](Self::select_by_metric) on power; `power` is
    /// recomputed when absent or of the wrong length.
    pub fn select_by_power(
        &self,
        ts: &TimeSeries,
        power: Option<&[f64]>,
        criterion: MetricThreshold,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        let power = self.power_or_recompute(ts, power);
        self.select_by_metric(ts, &power, criterion)
    }

    fn power_or_recompute(&self, ts: &TimeSeries, power: Option<&[f64]>) -> Vec<f64> {
        match power {
            Some(p) if p.len() == ts.number_of_labels() => p.to_vec(),
            _ => self.power(ts).to_vec(),
        }
    }

    /// Cluster space elements by `distance` and keep the best of each
    /// cluster (see
    /// [`select::select_by_hierarchical_group_metric_clustering`]).
    pub fn select_by_hierarchical_group_metric_clustering(
        &self,
        ts: &TimeSeries,
        distance: &Array2<f64>,
        disconnectivity: Option<&Array2<f64>>,
        metric: Option<&[f64]>,
        groups: GroupClustering,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        if distance.nrows() != ts.number_of_labels() {
            return self.fail(Error::InvalidParameter(format!(
                "distance matrix is {:?} for {} space elements",
                distance.shape(),
                ts.number_of_labels()
            )));
        }
        let indices =
            select::select_by_hierarchical_group_metric_clustering(distance, disconnectivity, metric, groups)
                .or_else(|e| self.fail(e))?;
        self.subspace(ts, indices)
    }

    /// Group selection with distance `1 − correlation`, ranked by power.
    /// Missing (or mis-sized) correlation and power are computed from `ts`.
    pub fn select_by_correlation_power(
        &self,
        ts: &TimeSeries,
        correlation: Option<&Array2<f64>>,
        disconnectivity: Option<&Array2<f64>>,
        power: Option<&[f64]>,
        groups: GroupClustering,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        let n = ts.number_of_labels();
        let correlation = match correlation {
            Some(c) if c.dim() == (n, n) => c.clone(),
            _ => self.correlation(ts),
        };
        let distance = correlation.mapv(|c| 1.0 - c);
        let power = self.power_or_recompute(ts, power);
        self.select_by_hierarchical_group_metric_clustering(ts, &distance, disconnectivity, Some(power.as_slice()), groups)
    }

    /// Group selection with distance `1 − corrcoef(gain rows)`, ranked by
    /// power. The gain matrix has one row per space element.
    pub fn select_by_gain_matrix_power(
        &self,
        ts: &TimeSeries,
        gain_matrix: &Array2<f64>,
        disconnectivity: Option<&Array2<f64>>,
        power: Option<&[f64]>,
        groups: GroupClustering,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        if gain_matrix.nrows() != ts.number_of_labels() {
            return self.fail(Error::InvalidParameter(format!(
                "gain matrix has {} rows for {} space elements",
                gain_matrix.nrows(),
                ts.number_of_labels()
            )));
        }
        let distance = select::corrcoef(gain_matrix).mapv(|c| 1.0 - c);
        let power = self.power_or_recompute(ts, power);
        self.select_by_hierarchical_group_metric_clustering(ts, &distance, disconnectivity, Some(power.as_slice()), groups)
    }

    /// Union, over regions of interest, of the space elements whose proximity
    /// passes `criterion`. `proximity` has one row per region and one column
    /// per space element.
    pub fn select_by_rois_proximity(
        &self,
        ts: &TimeSeries,
        proximity: &Array2<f64>,
        criterion: MetricThreshold,
    ) -> Result<(TimeSeries, Vec<usize>)> {
        if proximity.ncols() != ts.number_of_labels() {
            return self.fail(Error::InvalidParameter(format!(
                "proximity has {} columns for {} space elements",
                proximity.ncols(),
                ts.number_of_labels()
            )));
        }
        let mut indices: Vec<usize> = proximity
            .rows()
            .into_iter()
            .flat_map(|row| select::select_greater_values(&row.to_vec(), criterion))
            .collect();
        indices.sort_unstable();
        indices.dedup();
        self.subspace(ts, indices)
    }

    /// Space elements named by `rois`: labels directly, integers through
    /// `all_labels`.
    pub fn select_by_rois<S: AsRef<str>>(
        &self,
        ts: &TimeSeries,
        rois: &[Key],
        all_labels: &[S],
    ) -> Result<(TimeSeries, Vec<usize>)> {
        let mut indices = Vec::with_capacity(rois.len());
        for roi in rois {
            let label = match roi {
                Key::Label(l) => l.as_str(),
                Key::Index(i) => match usize::try_from(*i).ok().and_then(|i| all_labels.get(i)) {
                    Some(l) => l.as_ref(),
                    None => {
                        return self.fail(Error::IndexOutOfRange {
                            index: *i,
                            axis: AxisRole::Space.axis(),
                            len: all_labels.len(),
                        })
                    }
                },
                Key::Time(t) => {
                    return self.fail(Error::InvalidSelector(format!("{t} is not a region of interest")))
                }
            };
            indices.push(ts.registry().index_of_label(AxisRole::Space, label).or_else(|e| self.fail(e))?);
        }
        indices.sort_unstable();
        indices.dedup();
        self.subspace(ts, indices)
    }

    // ── Sensor projection ──────────────────────────────────────────────────

    /// Project source activity onto `sensors` through their gain matrix.
    ///
    /// The result carries the sensors (so its variant is the sensors' type)
    /// and their labels on the space axis. A single state variable is
    /// relabelled with the sensors' name.
    pub fn compute_seeg(&self, source: &TimeSeries, sensors: &Sensors, sum_mode: SumMode) -> Result<TimeSeries> {
        let data = seeg::project_lanes(source.data(), &sensors.gain_matrix, sum_mode)
            .or_else(|e| self.fail(e))?;
        self.logger.debug(format_args!(
            "{sum_mode} projection onto {} {} sensors",
            sensors.number_of_sensors(),
            sensors.sensors_type
        ));
        let mut overrides = TimeSeriesOptions {
            sensors: Some(sensors.clone()),
            ..TimeSeriesOptions::default()
        };
        overrides.labels.insert(AxisRole::Space, sensors.labels.clone());
        if source.number_of_variables() == 1 {
            overrides.labels.insert(AxisRole::Variables, vec![sensors.name.clone()]);
        }
        source.derive(data, overrides)
    }

    /// [`compute_seeg`](Self::compute_seeg) for every named sensor set.
    pub fn compute_seeg_map(
        &self,
        source: &TimeSeries,
        sensors: &BTreeMap<String, Sensors>,
        sum_mode: SumMode,
    ) -> Result<BTreeMap<String, TimeSeries>> {
        sensors
            .iter()
            .map(|(name, s)| Ok((name.clone(), self.compute_seeg(source, s, sum_mode)?)))
            .collect()
    }
}

/// Apply `f` to every time lane, writing results back in place of a copy.
fn map_lanes<F>(data: &Array4<f64>, f: F) -> Array4<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let mut out = data.clone();
    for mut lane in out.lanes_mut(Axis(0)) {
        let y = f(&lane.to_vec());
        lane.assign(&ArrayView1::from(&y));
    }
    out
}

/// [`map_lanes`] for a fallible `f`; stops at the first error.
fn try_map_lanes<F>(data: &Array4<f64>, f: F) -> Result<Array4<f64>>
where
    F: Fn(&[f64]) -> Result<Vec<f64>>,
{
    let mut out = data.clone();
    out.lanes_mut(Axis(0)).into_iter().try_for_each(|mut lane| {
        let y = f(&lane.to_vec())?;
        lane.assign(&ArrayView1::from(&y));
        Ok::<_, Error>(())
    })?;
    Ok(out)
}

/// One row per space element: its `[T, V, N]` block flattened.
fn space_signals(data: ArrayView4<'_, f64>) -> Array2<f64> {
    let (t, v, s, n) = data.dim();
    let mut out = Array2::<f64>::zeros((s, t * v * n));
    for (i, mut row) in out.rows_mut().into_iter().enumerate() {
        let block = data.slice(s![.., .., i, ..]);
        row.iter_mut().zip(block.iter()).for_each(|(r, &x)| *r = x);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn series() -> TimeSeries {
        let data = Array3::from_shape_fn((100, 1, 4), |(t, _, s)| ((t as f64) * 0.1 * (s + 1) as f64).sin() * (s + 1) as f64);
        let opts = TimeSeriesOptions { sample_period: Some(1.0), ..TimeSeriesOptions::default() }
            .with_labels(AxisRole::Space, &["a", "b", "c", "d"]);
        TimeSeries::new(data, opts).unwrap()
    }

    #[test]
    fn map_lanes_touches_time_only() {
        let data = Array4::from_shape_fn((3, 2, 2, 1), |(t, v, s, _)| (t + 10 * v + 100 * s) as f64);
        let out = map_lanes(&data, |x| x.iter().rev().copied().collect());
        assert_eq!(out[[0, 1, 1, 0]], data[[2, 1, 1, 0]]);
    }

    #[test]
    fn power_grows_with_amplitude() {
        let svc = TimeseriesService::new();
        let p = svc.power(&series());
        assert_eq!(p.len(), 4);
        assert!(p[3] > p[0]);
    }

    #[test]
    fn select_by_power_takes_the_strongest() {
        let svc = TimeseriesService::new();
        let (sub, idx) = svc.select_by_power(&series(), None, MetricThreshold::count(2)).unwrap();
        assert_eq!(idx, vec![2, 3]);
        assert_eq!(sub.space_labels(), &["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn space_signals_flatten_each_element() {
        let data = Array4::from_shape_fn((2, 1, 3, 1), |(t, _, s, _)| (t * 10 + s) as f64);
        let rows = space_signals(data.view());
        assert_eq!(rows.row(2).to_vec(), vec![2.0, 12.0]);
    }
}
