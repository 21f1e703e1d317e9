//! Mixed slice/label indexing.
//!
//! [`TimeSeries::index`] takes up to four [`Selector`]s (missing trailing
//! ones mean "whole axis"), each an integer, a label, or a range whose bounds
//! may themselves be labels. The selectors are first normalised into concrete
//! per-axis positions ([`TimeSeries::normalize_selectors`]); only then is the
//! array sliced. The result is the raw array, not a wrapped series: integer
//! and label selectors drop their axis, exactly like numpy indexing.
//!
//! ```text
//! ts[:, :, "r2":, :]        [Selector::All, Selector::All, Selector::from_bound("r2"), Selector::All]
//! ts[1, "sv3", "r1":"r3"]   [1.into(), "sv3".into(), Selector::span("r1", "r3")]
//! ```
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use ndarray::{ArrayD, Axis, Slice};

use super::TimeSeries;
use crate::error::{Error, Result};

/// A range bound: a position (negative counts from the end) or a label.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Index(isize),
    Label(String),
}

impl From<isize> for Bound {
    fn from(i: isize) -> Self {
        Bound::Index(i)
    }
}

impl From<usize> for Bound {
    fn from(i: usize) -> Self {
        Bound::Index(i as isize)
    }
}

impl From<&str> for Bound {
    fn from(l: &str) -> Self {
        Bound::Label(l.to_string())
    }
}

impl From<String> for Bound {
    fn from(l: String) -> Self {
        Bound::Label(l)
    }
}

/// Selector for one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Whole axis (`:`).
    All,
    /// A single element; the axis is dropped from the result.
    At(Bound),
    /// `start:stop:step`, stop exclusive.
    Range {
        start: Option<Bound>,
        stop: Option<Bound>,
        step: Option<isize>,
    },
}

impl Selector {
    /// `start:stop` where either bound may be a label.
    pub fn span(start: impl Into<Bound>, stop: impl Into<Bound>) -> Self {
        Selector::Range {
            start: Some(start.into()),
            stop: Some(stop.into()),
            step: None,
        }
    }

    /// `start:`.
    pub fn from_bound(start: impl Into<Bound>) -> Self {
        Selector::Range {
            start: Some(start.into()),
            stop: None,
            step: None,
        }
    }

    /// `:stop`.
    pub fn to_bound(stop: impl Into<Bound>) -> Self {
        Selector::Range {
            start: None,
            stop: Some(stop.into()),
            step: None,
        }
    }

    /// Same range, every `step`-th element.
    pub fn step_by(self, step: isize) -> Self {
        match self {
            Selector::All => Selector::Range { start: None, stop: None, step: Some(step) },
            Selector::Range { start, stop, .. } => Selector::Range { start, stop, step: Some(step) },
            at => at,
        }
    }
}

impl From<usize> for Selector {
    fn from(i: usize) -> Self {
        Selector::At(Bound::from(i))
    }
}

impl From<isize> for Selector {
    fn from(i: isize) -> Self {
        Selector::At(Bound::Index(i))
    }
}

impl From<&str> for Selector {
    fn from(l: &str) -> Self {
        Selector::At(Bound::from(l))
    }
}

impl From<RangeFull> for Selector {
    fn from(_: RangeFull) -> Self {
        Selector::All
    }
}

impl From<Range<usize>> for Selector {
    fn from(r: Range<usize>) -> Self {
        Selector::span(r.start, r.end)
    }
}

impl From<RangeFrom<usize>> for Selector {
    fn from(r: RangeFrom<usize>) -> Self {
        Selector::from_bound(r.start)
    }
}

impl From<RangeTo<usize>> for Selector {
    fn from(r: RangeTo<usize>) -> Self {
        Selector::to_bound(r.end)
    }
}

/// A selector reduced to concrete positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    At(usize),
    /// `start..end` every `step`, already clamped to the axis.
    Range { start: usize, end: usize, step: usize },
}

impl TimeSeries {
    /// Raw sub-array selected by up to four selectors.
    ///
    /// # Errors
    ///
    /// * [`Error::IndexOutOfRange`] for an integer selector outside the axis.
    /// * [`Error::LabelNotFound`] / [`Error::AmbiguousLabel`] for labels.
    /// * [`Error::InvalidSelector`] for more than four selectors or a
    ///   non-positive step.
    pub fn index(&self, selectors: &[Selector]) -> Result<ArrayD<f64>> {
        let resolved = self.normalize_selectors(selectors)?;
        let mut view = self.data.view().into_dyn();
        // Back to front, so dropping an axis never renumbers one still to do.
        for (axis, sel) in resolved.iter().enumerate().rev() {
            match *sel {
                Resolved::At(i) => view = view.index_axis_move(Axis(axis), i),
                Resolved::Range { start, end, step } => view.slice_axis_inplace(
                    Axis(axis),
                    Slice::new(start as isize, Some(end as isize), step as isize),
                ),
            }
        }
        Ok(view.to_owned())
    }

    /// Resolve labels and Python-style bounds into one concrete selection
    /// per axis.
    pub fn normalize_selectors(&self, selectors: &[Selector]) -> Result<[Resolved; 4]> {
        if selectors.len() > 4 {
            return Err(Error::InvalidSelector(format!(
                "{} selectors for a 4-D time series",
                selectors.len()
            )));
        }
        let mut out = [Resolved::Range { start: 0, end: 0, step: 1 }; 4];
        for (axis, slot) in out.iter_mut().enumerate() {
            let len = self.data.len_of(Axis(axis));
            *slot = match selectors.get(axis).unwrap_or(&Selector::All) {
                Selector::All => Resolved::Range { start: 0, end: len, step: 1 },
                Selector::At(bound) => {
                    let i = self.bound_position(bound, axis)?;
                    let wrapped = if i < 0 { i + len as isize } else { i };
                    if wrapped < 0 || wrapped as usize >= len {
                        return Err(Error::IndexOutOfRange { index: i, axis, len });
                    }
                    Resolved::At(wrapped as usize)
                }
                Selector::Range { start, stop, step } => {
                    let step = step.unwrap_or(1);
                    if step <= 0 {
                        return Err(Error::InvalidSelector(format!(
                            "slice step must be positive, got {step}"
                        )));
                    }
                    let start = match start {
                        Some(b) => clamp_bound(self.bound_position(b, axis)?, len),
                        None => 0,
                    };
                    let end = match stop {
                        Some(b) => clamp_bound(self.bound_position(b, axis)?, len),
                        None => len,
                    };
                    Resolved::Range {
                        start,
                        end: end.max(start),
                        step: step as usize,
                    }
                }
            };
        }
        Ok(out)
    }

    fn bound_position(&self, bound: &Bound, axis: usize) -> Result<isize> {
        match bound {
            Bound::Index(i) => Ok(*i),
            Bound::Label(label) => {
                let role = self.registry.role_of(axis)?;
                self.registry
                    .index_of_label(role, label)
                    .map(|i| i as isize)
                    .map_err(|e| {
                        self.logger.error(format_args!("{e}"));
                        e
                    })
            }
        }
    }
}

/// Python slice-bound semantics: negative counts from the end, then clamp.
fn clamp_bound(i: isize, len: usize) -> usize {
    let len = len as isize;
    let i = if i < 0 { i + len } else { i };
    i.clamp(0, len) as usize
}
