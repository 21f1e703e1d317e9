//! Head-model collaborators consumed by the container and the service.
//!
//! These are read-only inputs: sensor sets carry the forward gain matrix used
//! by [`TimeseriesService::compute_seeg`](crate::TimeseriesService::compute_seeg),
//! and both sensors and surfaces drive the variant inference of
//! [`TimeSeries::new`](crate::TimeSeries::new).
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorsType {
    Eeg,
    Meg,
    /// Depth electrodes (SEEG / "internal" sensors).
    Seeg,
}

impl fmt::Display for SensorsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorsType::Eeg => "EEG",
            SensorsType::Meg => "MEG",
            SensorsType::Seeg => "SEEG",
        })
    }
}

impl FromStr for SensorsType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eeg" => Ok(SensorsType::Eeg),
            "meg" => Ok(SensorsType::Meg),
            "seeg" | "internal" => Ok(SensorsType::Seeg),
            _ => Err(Error::InvalidParameter(format!("unknown sensors type {s:?}"))),
        }
    }
}

/// A named sensor set with its forward model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensors {
    pub name: String,
    pub labels: Vec<String>,
    /// `[n_sensors, n_sources]`.
    pub gain_matrix: Array2<f64>,
    pub sensors_type: SensorsType,
}

impl Sensors {
    pub fn new(
        name: impl Into<String>,
        labels: Vec<String>,
        gain_matrix: Array2<f64>,
        sensors_type: SensorsType,
    ) -> Result<Self> {
        if !labels.is_empty() && labels.len() != gain_matrix.nrows() {
            return Err(Error::Configuration(format!(
                "{} sensor labels for a gain matrix with {} rows",
                labels.len(),
                gain_matrix.nrows()
            )));
        }
        Ok(Self {
            name: name.into(),
            labels,
            gain_matrix,
            sensors_type,
        })
    }

    #[inline]
    pub fn number_of_sensors(&self) -> usize {
        self.gain_matrix.nrows()
    }
}

/// A cortical surface; only its vertex count matters to the time series.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    /// `[n_vertices, 3]`.
    pub vertices: Array2<f64>,
}

impl Surface {
    pub fn new(vertices: Array2<f64>) -> Self {
        Self { vertices }
    }

    #[inline]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.nrows()
    }
}

/// Pair adjacent contacts of the same electrode into bipolar channels.
///
/// Two consecutive labels `A3`, `A4` (same alphabetic prefix, contact numbers
/// differing by one) give the bipolar label `"A3-A4"`. Returns the bipolar
/// labels and, for each, the indices of its first and second monopolar
/// channel.
pub fn monopolar_to_bipolar<S: AsRef<str>>(labels: &[S]) -> (Vec<String>, Vec<(usize, usize)>) {
    let mut bipolar = Vec::new();
    let mut pairs = Vec::new();
    for i in 1..labels.len() {
        let (a, b) = (labels[i - 1].as_ref(), labels[i].as_ref());
        if let (Some((pa, na)), Some((pb, nb))) = (split_contact(a), split_contact(b)) {
            if pa == pb && na.checked_add(1) == Some(nb) {
                bipolar.push(format!("{a}-{b}"));
                pairs.push((i - 1, i));
            }
        }
    }
    (bipolar, pairs)
}

/// `"GPH'12"` → `("GPH'", 12)`.
fn split_contact(label: &str) -> Option<(&str, u32)> {
    let digits = label.len() - label.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 || digits == label.len() {
        return None;
    }
    let (prefix, number) = label.split_at(label.len() - digits);
    number.parse().ok().map(|n| (prefix.trim(), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bipolar_pairs_consecutive_contacts() {
        let (labels, pairs) = monopolar_to_bipolar(&["A1", "A2", "A3", "B1", "B2", "C5"]);
        assert_eq!(labels, vec!["A1-A2", "A2-A3", "B1-B2"]);
        assert_eq!(pairs, vec![(0, 1), (1, 2), (3, 4)]);
    }

    #[test]
    fn bipolar_skips_gaps_and_unnumbered() {
        let (labels, _) = monopolar_to_bipolar(&["A1", "A3", "ref", "B'1", "B'2"]);
        assert_eq!(labels, vec!["B'1-B'2"]);
    }

    #[test]
    fn bipolar_largest_contact_number_has_no_successor() {
        let (labels, _) = monopolar_to_bipolar(&["A4294967294", "A4294967295", "A0"]);
        assert_eq!(labels, vec!["A4294967294-A4294967295"]);
    }

    #[test]
    fn sensors_type_parses_internal_as_seeg() {
        assert_eq!("Internal".parse::<SensorsType>().unwrap(), SensorsType::Seeg);
        assert!("ecog".parse::<SensorsType>().is_err());
    }

    #[test]
    fn sensors_reject_label_gain_mismatch() {
        let g = Array2::zeros((2, 5));
        assert!(Sensors::new("s", vec!["a".into()], g, SensorsType::Seeg).is_err());
    }
}
