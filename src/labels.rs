//! Axis roles and per-axis label sets.
//!
//! A time series always has four physical axes in the fixed order
//! `time × variables × space × samples`. [`AxisRole`] names the semantic role
//! of each axis, [`AxisLabelRegistry`] stores a display name per role (the
//! space axis is called "Region", "Vertex", "SEEG sensor", … depending on the
//! variant) and the ordered labels of each axis.
//!
//! An empty label list means "unlabelled axis"; a non-empty one must have
//! exactly one label per element of the axis (checked by
//! [`AxisLabelRegistry::validate`]).
use std::fmt;

use crate::error::{Error, Result};

/// Semantic role of one of the four physical axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AxisRole {
    Time,
    Variables,
    Space,
    Samples,
}

impl AxisRole {
    pub const ALL: [AxisRole; 4] = [
        AxisRole::Time,
        AxisRole::Variables,
        AxisRole::Space,
        AxisRole::Samples,
    ];

    /// Physical axis index of this role.
    #[inline]
    pub fn axis(self) -> usize {
        self as usize
    }

    /// Role stored on physical axis `axis`.
    pub fn from_axis(axis: usize) -> Result<Self> {
        Self::ALL
            .get(axis)
            .copied()
            .ok_or_else(|| Error::Configuration(format!("no axis role for axis {axis} (expected 0..=3)")))
    }

    /// Name used when a variant does not rename the axis.
    pub fn default_name(self) -> &'static str {
        match self {
            AxisRole::Time => "Time",
            AxisRole::Variables => "State Variables",
            AxisRole::Space => "Space",
            AxisRole::Samples => "Samples",
        }
    }
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// Bijective role ↔ axis mapping plus the label set of every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLabelRegistry {
    names: [String; 4],
    labels: [Vec<String>; 4],
}

impl Default for AxisLabelRegistry {
    fn default() -> Self {
        Self::new(AxisRole::ALL.map(|r| r.default_name().to_string()))
    }
}

impl AxisLabelRegistry {
    /// Registry with the given per-axis names and no labels.
    pub fn new(names: [String; 4]) -> Self {
        Self {
            names,
            labels: Default::default(),
        }
    }

    /// Replace the labels of `role`.
    pub fn with_labels<S: AsRef<str>>(mut self, role: AxisRole, labels: &[S]) -> Self {
        self.set_labels(role, labels.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub(crate) fn set_labels(&mut self, role: AxisRole, labels: Vec<String>) {
        self.labels[role.axis()] = labels;
    }

    pub(crate) fn set_name(&mut self, role: AxisRole, name: String) {
        self.names[role.axis()] = name;
    }

    #[inline]
    pub fn axis_of(&self, role: AxisRole) -> usize {
        role.axis()
    }

    #[inline]
    pub fn role_of(&self, axis: usize) -> Result<AxisRole> {
        AxisRole::from_axis(axis)
    }

    /// Physical axis carrying the display name `name` (e.g. `"Region"`).
    pub fn axis_of_name(&self, name: &str) -> Result<usize> {
        self.names.iter().position(|n| n == name).ok_or_else(|| {
            Error::Configuration(format!("no axis named {name:?}; axes are {:?}", self.names))
        })
    }

    /// Display name of `role` in this registry.
    pub fn name(&self, role: AxisRole) -> &str {
        &self.names[role.axis()]
    }

    /// Display names in physical axis order.
    pub fn ordering(&self) -> &[String; 4] {
        &self.names
    }

    pub fn labels(&self, role: AxisRole) -> &[String] {
        &self.labels[role.axis()]
    }

    pub fn is_labelled(&self, role: AxisRole) -> bool {
        !self.labels[role.axis()].is_empty()
    }

    /// Position of `label` on the axis of `role`.
    ///
    /// Exact, case-sensitive match. A label that occurs twice is an
    /// [`Error::AmbiguousLabel`], never resolved to the first hit.
    pub fn index_of_label(&self, role: AxisRole, label: &str) -> Result<usize> {
        let labels = self.labels(role);
        let mut hits = labels.iter().enumerate().filter(|(_, l)| l.as_str() == label);
        let first = hits.next().map(|(i, _)| i);
        let extra = hits.count();
        match first {
            None => Err(Error::LabelNotFound {
                label: label.to_string(),
                role: self.name(role).to_string(),
                available: labels.to_vec(),
            }),
            Some(_) if extra > 0 => Err(Error::AmbiguousLabel {
                label: label.to_string(),
                role: self.name(role).to_string(),
                count: extra + 1,
            }),
            Some(i) => Ok(i),
        }
    }

    /// Resolve every label to its position, preserving the request order.
    pub fn indices_for_labels<S: AsRef<str>>(&self, role: AxisRole, labels: &[S]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|l| self.index_of_label(role, l.as_ref()))
            .collect()
    }

    /// Check every labelled axis against the array shape.
    pub fn validate(&self, shape: &[usize]) -> Result<()> {
        for role in AxisRole::ALL {
            let n = self.labels(role).len();
            let len = shape.get(role.axis()).copied().unwrap_or(0);
            if n > 0 && n != len {
                return Err(Error::LabelMismatch {
                    role: self.name(role).to_string(),
                    labels: n,
                    len,
                });
            }
        }
        Ok(())
    }

    /// Copy of this registry with the labels of `role` restricted to `indices`.
    ///
    /// Unlabelled axes stay unlabelled. Indices must already be in range.
    pub fn select(&self, role: AxisRole, indices: &[usize]) -> Self {
        let mut out = self.clone();
        if self.is_labelled(role) {
            let src = self.labels(role);
            out.set_labels(role, indices.iter().map(|&i| src[i].clone()).collect());
        }
        out
    }
}
