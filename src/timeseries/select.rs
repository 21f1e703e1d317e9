//! Sub-selection of a time series.
//!
//! Every method returns a new [`TimeSeries`]; the receiver is never touched.
//! Selected axes keep their rank (a single index still yields a length-1
//! axis) and their labels are restricted to the selection.
use ndarray::{s, Array4, Axis};

use super::TimeSeries;
use crate::config::TimeSeriesOptions;
use crate::error::{Error, Result};
use crate::labels::AxisRole;
use crate::sensors::monopolar_to_bipolar;

/// Label of the variable returned by [`TimeSeries::get_source`].
pub const SOURCE_VARIABLE: &str = "source";

/// One element of a [`TimeSeries::get_subset`] request.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// Position on the axis; negative values are out of range.
    Index(isize),
    /// A point in time (time axis only), mapped to the sample at or before it.
    Time(f64),
    Label(String),
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i as isize)
    }
}

impl From<isize> for Key {
    fn from(i: isize) -> Self {
        Key::Index(i)
    }
}

impl From<f64> for Key {
    fn from(t: f64) -> Self {
        Key::Time(t)
    }
}

impl From<&str> for Key {
    fn from(l: &str) -> Self {
        Key::Label(l.to_string())
    }
}

impl From<String> for Key {
    fn from(l: String) -> Self {
        Key::Label(l)
    }
}

impl TimeSeries {
    fn check_indices(&self, indices: &[isize], axis: usize) -> Result<Vec<usize>> {
        let len = self.data.len_of(Axis(axis));
        indices
            .iter()
            .map(|&i| {
                if i < 0 || i as usize >= len {
                    self.logger.error(format_args!(
                        "some of the given indices are out of range [0, {len}) on axis {axis}"
                    ));
                    Err(Error::IndexOutOfRange { index: i, axis, len })
                } else {
                    Ok(i as usize)
                }
            })
            .collect()
    }

    /// Keep the elements at `indices` (in that order) along `axis`.
    ///
    /// Selecting on the time axis moves `start_time` to the first selected
    /// sample.
    ///
    /// # Errors
    ///
    /// * [`Error::Configuration`] if `axis > 3`.
    /// * [`Error::IndexOutOfRange`] if any index is `>= shape[axis]`.
    /// * [`Error::InvalidSelector`] for an empty selection.
    pub fn get_subset_by_index(&self, indices: &[usize], axis: usize) -> Result<Self> {
        let signed: Vec<isize> = indices.iter().map(|&i| i as isize).collect();
        self.subset_by_signed_index(&signed, axis)
    }

    fn subset_by_signed_index(&self, indices: &[isize], axis: usize) -> Result<Self> {
        let role = self.registry.role_of(axis)?;
        if indices.is_empty() {
            return Err(Error::InvalidSelector(format!("empty selection on axis {axis}")));
        }
        let indices = self.check_indices(indices, axis)?;
        let data = self.data.select(Axis(axis), &indices);
        let mut overrides = TimeSeriesOptions::default();
        if self.registry.is_labelled(role) {
            let sub = self.registry.select(role, &indices);
            overrides.labels.insert(role, sub.labels(role).to_vec());
        }
        if role == AxisRole::Time {
            overrides.start_time = Some(self.time_for_index(indices[0]));
        }
        self.derive(data, overrides)
    }

    /// Keep the elements labelled `labels` along `axis`.
    ///
    /// Fails with [`Error::LabelNotFound`] or [`Error::AmbiguousLabel`] when a
    /// label does not resolve to exactly one position.
    pub fn get_subset_by_label<S: AsRef<str>>(&self, labels: &[S], axis: usize) -> Result<Self> {
        let role = self.registry.role_of(axis)?;
        let indices = self.registry.indices_for_labels(role, labels).map_err(|e| {
            self.logger.error(format_args!(
                "failed to access indices of {}: {e}",
                self.registry.name(role)
            ));
            e
        })?;
        self.get_subset_by_index(&indices, axis)
    }

    /// Dispatch on the key types: all indices → by index; on the time axis,
    /// all numeric → by time; all labels → by label. Anything else is an
    /// [`Error::InvalidSelector`].
    pub fn get_subset(&self, keys: &[Key], axis: usize) -> Result<Self> {
        let indices: Option<Vec<isize>> = keys
            .iter()
            .map(|k| match k {
                Key::Index(i) => Some(*i),
                _ => None,
            })
            .collect();
        if let Some(indices) = indices {
            return self.subset_by_signed_index(&indices, axis);
        }
        if axis == AxisRole::Time.axis() {
            let times: Option<Vec<isize>> = keys
                .iter()
                .map(|k| match k {
                    Key::Index(i) => Some(*i),
                    Key::Time(t) => Some(self.index_for_time(*t)),
                    Key::Label(_) => None,
                })
                .collect();
            if let Some(indices) = times {
                return self.subset_by_signed_index(&indices, axis);
            }
        }
        let labels: Option<Vec<&str>> = keys
            .iter()
            .map(|k| match k {
                Key::Label(l) => Some(l.as_str()),
                _ => None,
            })
            .collect();
        match labels {
            Some(labels) => self.get_subset_by_label(&labels, axis),
            None => {
                let e = Error::InvalidSelector(format!(
                    "keys for axis {axis} are neither all indices, all points in time nor all labels: {keys:?}"
                ));
                self.logger.error(format_args!("{e}"));
                Err(e)
            }
        }
    }

    pub fn get_times_by_index(&self, indices: &[usize]) -> Result<Self> {
        self.get_subset_by_index(indices, AxisRole::Time.axis())
    }

    pub fn get_times(&self, keys: &[Key]) -> Result<Self> {
        self.get_subset(keys, AxisRole::Time.axis())
    }

    pub fn get_variables_by_index(&self, indices: &[usize]) -> Result<Self> {
        self.get_subset_by_index(indices, AxisRole::Variables.axis())
    }

    pub fn get_variables_by_label<S: AsRef<str>>(&self, labels: &[S]) -> Result<Self> {
        self.get_subset_by_label(labels, AxisRole::Variables.axis())
    }

    pub fn get_variables(&self, keys: &[Key]) -> Result<Self> {
        self.get_subset(keys, AxisRole::Variables.axis())
    }

    pub fn get_subspace_by_index(&self, indices: &[usize]) -> Result<Self> {
        self.get_subset_by_index(indices, AxisRole::Space.axis())
    }

    pub fn get_subspace_by_label<S: AsRef<str>>(&self, labels: &[S]) -> Result<Self> {
        self.get_subset_by_label(labels, AxisRole::Space.axis())
    }

    pub fn get_subspace(&self, keys: &[Key]) -> Result<Self> {
        self.get_subset(keys, AxisRole::Space.axis())
    }

    pub fn get_samples_by_index(&self, indices: &[usize]) -> Result<Self> {
        self.get_subset_by_index(indices, AxisRole::Samples.axis())
    }

    pub fn get_samples_by_label<S: AsRef<str>>(&self, labels: &[S]) -> Result<Self> {
        self.get_subset_by_label(labels, AxisRole::Samples.axis())
    }

    pub fn get_samples(&self, keys: &[Key]) -> Result<Self> {
        self.get_subset(keys, AxisRole::Samples.axis())
    }

    // ── Windows ────────────────────────────────────────────────────────────

    /// Samples `index_start..index_end` of the time axis.
    pub fn get_time_window(&self, index_start: usize, index_end: usize) -> Result<Self> {
        let len = self.time_length();
        if index_end > len {
            self.logger.error(format_args!(
                "the time indices are outside time series interval: [0, {len}]"
            ));
            return Err(Error::IndexOutOfRange { index: index_end as isize, axis: 0, len });
        }
        if index_start >= index_end {
            return Err(Error::InvalidSelector(format!(
                "empty time window {index_start}..{index_end}"
            )));
        }
        let data = self.data.slice(s![index_start..index_end, .., .., ..]).to_owned();
        let mut overrides = TimeSeriesOptions {
            start_time: Some(self.time_for_index(index_start)),
            ..TimeSeriesOptions::default()
        };
        if self.registry.is_labelled(AxisRole::Time) {
            overrides
                .labels
                .insert(AxisRole::Time, self.time_labels()[index_start..index_end].to_vec());
        }
        self.derive(data, overrides)
    }

    /// Window `[t_start, t_end)` in time units.
    ///
    /// Bounds outside `[start_time, end_time]` are an [`Error::TimeOutOfRange`]
    /// (a value error, unlike the index error of
    /// [`get_time_window`](Self::get_time_window)).
    pub fn get_time_window_by_units(&self, t_start: f64, t_end: f64) -> Result<Self> {
        let end_time = self.end_time();
        if t_start < self.start_time || t_end > end_time {
            let e = Error::TimeOutOfRange {
                start: t_start,
                end: t_end,
                min: self.start_time,
                max: end_time,
            };
            self.logger.error(format_args!("{e}"));
            return Err(e);
        }
        let i_start = self.index_for_time(t_start).max(0) as usize;
        let i_end = self.index_for_time(t_end).max(0) as usize;
        self.get_time_window(i_start, i_end)
    }

    /// Elements `index_start..index_end` of the samples axis.
    pub fn get_sample_window(&self, index_start: usize, index_end: usize) -> Result<Self> {
        let len = self.number_of_samples();
        if index_end > len {
            return Err(Error::IndexOutOfRange { index: index_end as isize, axis: 3, len });
        }
        if index_start >= index_end {
            return Err(Error::InvalidSelector(format!(
                "empty sample window {index_start}..{index_end}"
            )));
        }
        let data = self.data.slice(s![.., .., .., index_start..index_end]).to_owned();
        let role = AxisRole::Samples;
        let mut overrides = TimeSeriesOptions::default();
        if self.registry.is_labelled(role) {
            overrides
                .labels
                .insert(role, self.registry.labels(role)[index_start..index_end].to_vec());
        }
        self.derive(data, overrides)
    }

    /// Keep every k-th sample, where `k = new_sample_period / sample_period`.
    ///
    /// `k` must be a positive integer (to within 1e-9).
    pub fn decimate_time(&self, new_sample_period: f64) -> Result<Self> {
        let ratio = new_sample_period / self.sample_period;
        let step = ratio.round();
        if !(step >= 1.0 && (ratio - step).abs() < 1e-9) {
            self.logger.error(format_args!(
                "cannot decimate time if new time step is not a multiple of the old time step"
            ));
            return Err(Error::DecimationRatio {
                new_period: new_sample_period,
                sample_period: self.sample_period,
            });
        }
        let step = step as usize;
        let data = self.data.slice(s![..;step, .., .., ..]).to_owned();
        let mut overrides = TimeSeriesOptions {
            sample_period: Some(new_sample_period),
            ..TimeSeriesOptions::default()
        };
        if self.registry.is_labelled(AxisRole::Time) {
            let kept = self.time_labels().iter().step_by(step).cloned().collect();
            overrides.labels.insert(AxisRole::Time, kept);
        }
        self.derive(data, overrides)
    }

    // ── Derived channels ───────────────────────────────────────────────────

    /// Bipolar montage of the space axis (see
    /// [`monopolar_to_bipolar`](crate::sensors::monopolar_to_bipolar)).
    pub fn get_bipolar(&self) -> Result<Self> {
        let (labels, pairs) = monopolar_to_bipolar(self.space_labels());
        if pairs.is_empty() {
            return Err(Error::InvalidParameter(format!(
                "no bipolar pairs among space labels {:?}",
                self.space_labels()
            )));
        }
        let (t, v, _, n) = self.data.dim();
        let mut data = Array4::<f64>::zeros((t, v, pairs.len(), n));
        for (k, &(a, b)) in pairs.iter().enumerate() {
            let diff = &self.data.index_axis(Axis(2), a) - &self.data.index_axis(Axis(2), b);
            data.index_axis_mut(Axis(2), k).assign(&diff);
        }
        let mut overrides = TimeSeriesOptions::default();
        overrides.labels.insert(AxisRole::Space, labels);
        self.derive(data, overrides)
    }

    /// The `"source"` state variable.
    pub fn get_source(&self) -> Result<Self> {
        if !self.registry.is_labelled(AxisRole::Variables) {
            self.logger.error(format_args!("no state variables are defined for this instance"));
            return Err(Error::InvalidParameter(
                "no state variables are defined for this time series".into(),
            ));
        }
        self.get_variables_by_label(&[SOURCE_VARIABLE])
    }

    /// Named access: the single-label sub-series whose state variable or, if
    /// none matches, space label equals `name`.
    ///
    /// Names containing `"__"` are never resolved and are not logged.
    pub fn get(&self, name: &str) -> Result<Self> {
        if !name.contains("__") {
            for role in [AxisRole::Variables, AxisRole::Space] {
                if self.registry.labels(role).iter().any(|l| l == name) {
                    return self.get_subset_by_label(&[name], role.axis());
                }
            }
        }
        let e = Error::AttributeNotFound {
            name: name.to_string(),
            variables_role: self.registry.name(AxisRole::Variables).to_string(),
            variables: self.variables_labels().to_vec(),
            space_role: self.registry.name(AxisRole::Space).to_string(),
            space: self.space_labels().to_vec(),
        };
        if !name.contains("__") {
            self.logger.error(format_args!("{e}"));
        }
        Err(e)
    }
}
