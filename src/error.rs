//! Error type shared by the container and the service layer.
//!
//! Every variant belongs to one [`ErrorKind`], so callers can tell an absent
//! label from an ambiguous one, or an out-of-range index from an
//! out-of-range time, without matching on message text.
use thiserror::Error;

/// Coarse failure category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input array has an unusable rank.
    Shape,
    /// Integer selector outside `[0, len)`.
    Index,
    /// Label not present on the addressed axis.
    Lookup,
    /// Label present more than once on the addressed axis.
    Ambiguity,
    /// Malformed argument (selector types, strategy names, ratios, steps).
    Value,
    /// Axis roles or label sets inconsistent with the array.
    Configuration,
    /// Named sub-series access found nothing.
    Attribute,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("time series data must be 2-D to 4-D (time × something), got {ndim}-D")]
    Shape { ndim: usize },

    #[error("index {index} out of range [0, {len}) on axis {axis}")]
    IndexOutOfRange { index: isize, axis: usize, len: usize },

    #[error("label {label:?} not found in {role}: {available:?}")]
    LabelNotFound {
        label: String,
        role: String,
        available: Vec<String>,
    },

    #[error("label {label:?} occurs {count} times in {role}")]
    AmbiguousLabel {
        label: String,
        role: String,
        count: usize,
    },

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("unknown normalization {name:?}, expected one of {valid:?}")]
    UnknownNormalization {
        name: String,
        valid: Vec<&'static str>,
    },

    #[error("cannot decimate: new sample period {new_period} is not a multiple of {sample_period}")]
    DecimationRatio { new_period: f64, sample_period: f64 },

    #[error(
        "time series {index} has a different sample period ({period}) than the ones before ({expected})"
    )]
    IncompatibleSamplePeriod {
        index: usize,
        period: f32,
        expected: f32,
    },

    #[error("time window [{start}, {end}] outside time series interval [{min}, {max}]")]
    TimeOutOfRange {
        start: f64,
        end: f64,
        min: f64,
        max: f64,
    },

    #[error("{0}")]
    Configuration(String),

    #[error("{role} has {labels} labels but the array axis has length {len}")]
    LabelMismatch {
        role: String,
        labels: usize,
        len: usize,
    },

    #[error(
        "attribute {name:?} is not defined; valid labels are {variables_role} = {variables:?} and {space_role} = {space:?}"
    )]
    AttributeNotFound {
        name: String,
        variables_role: String,
        variables: Vec<String>,
        space_role: String,
        space: Vec<String>,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Shape { .. } => ErrorKind::Shape,
            Error::IndexOutOfRange { .. } => ErrorKind::Index,
            Error::LabelNotFound { .. } => ErrorKind::Lookup,
            Error::AmbiguousLabel { .. } => ErrorKind::Ambiguity,
            Error::InvalidSelector(_)
            | Error::UnknownNormalization { .. }
            | Error::DecimationRatio { .. }
            | Error::IncompatibleSamplePeriod { .. }
            | Error::TimeOutOfRange { .. }
            | Error::InvalidParameter(_) => ErrorKind::Value,
            Error::Configuration(_) | Error::LabelMismatch { .. } => ErrorKind::Configuration,
            Error::AttributeNotFound { .. } => ErrorKind::Attribute,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_ambiguity_are_distinct_kinds() {
        let absent = Error::LabelNotFound {
            label: "r9".into(),
            role: "Region".into(),
            available: vec!["r1".into()],
        };
        let twice = Error::AmbiguousLabel {
            label: "r1".into(),
            role: "Region".into(),
            count: 2,
        };
        assert_eq!(absent.kind(), ErrorKind::Lookup);
        assert_eq!(twice.kind(), ErrorKind::Ambiguity);
    }

    #[test]
    fn time_range_is_a_value_error() {
        let e = Error::TimeOutOfRange { start: 0.0, end: 1.0, min: 0.0, max: 0.5 };
        assert_eq!(e.kind(), ErrorKind::Value);
        assert!(e.to_string().contains("[0, 0.5]"));
    }
}
