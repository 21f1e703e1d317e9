//! Source-to-sensor projection through a gain matrix.
//!
//! For a source block `S` of shape `[time, sources]` and a gain matrix `G` of
//! shape `[sensors, sources]`:
//!
//! ```text
//! lin   S · Gᵀ
//! exp   ln(exp(S) · Gᵀ)
//! ```
use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array4, ArrayView2, Axis};

use crate::error::{Error, Result};

/// How source activity sums at a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SumMode {
    #[default]
    Lin,
    Exp,
}

impl FromStr for SumMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lin" => Ok(SumMode::Lin),
            "exp" => Ok(SumMode::Exp),
            other => Err(Error::InvalidParameter(format!(
                "sum mode {other:?}, expected \"lin\" or \"exp\""
            ))),
        }
    }
}

impl fmt::Display for SumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SumMode::Lin => "lin",
            SumMode::Exp => "exp",
        })
    }
}

/// Project one `[time, sources]` block.
pub fn project(source: ArrayView2<'_, f64>, gain: &Array2<f64>, mode: SumMode) -> Array2<f64> {
    match mode {
        SumMode::Lin => source.dot(&gain.t()),
        SumMode::Exp => source.mapv(f64::exp).dot(&gain.t()).mapv(f64::ln),
    }
}

/// Project every `(variable, sample)` lane of a `[T, V, S, N]` array,
/// giving `[T, V, sensors, N]`.
///
/// # Errors
///
/// [`Error::InvalidParameter`] when the gain matrix has a different number
/// of columns than the space axis.
pub fn project_lanes(data: &Array4<f64>, gain: &Array2<f64>, mode: SumMode) -> Result<Array4<f64>> {
    let (t, v, s, n) = data.dim();
    if gain.ncols() != s {
        return Err(Error::InvalidParameter(format!(
            "gain matrix has {} source columns but the series has {s} space elements",
            gain.ncols()
        )));
    }
    let mut out = Array4::<f64>::zeros((t, v, gain.nrows(), n));
    for iv in 0..v {
        for isamp in 0..n {
            let block = data.index_axis(Axis(3), isamp);
            let block = block.index_axis(Axis(1), iv);
            out.index_axis_mut(Axis(3), isamp)
                .index_axis_mut(Axis(1), iv)
                .assign(&project(block, gain, mode));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn linear_projection() {
        let s = array![[1.0, 2.0], [3.0, 4.0]];
        let g = array![[1.0, 0.0], [0.5, 0.5], [0.0, 2.0]];
        let y = project(s.view(), &g, SumMode::Lin);
        assert_eq!(y, array![[1.0, 1.5, 4.0], [3.0, 3.5, 8.0]]);
    }

    #[test]
    fn exp_projection_of_identity_is_identity() {
        let s = array![[0.3, -1.2]];
        let g = array![[1.0, 0.0], [0.0, 1.0]];
        let y = project(s.view(), &g, SumMode::Exp);
        assert_abs_diff_eq!(y[[0, 0]], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(y[[0, 1]], -1.2, epsilon = 1e-12);
    }

    #[test]
    fn lanes_keep_variables_and_samples() {
        let data = Array4::from_shape_fn((5, 2, 3, 2), |(t, v, s, n)| (t + v + s + n) as f64);
        let g = Array2::<f64>::ones((4, 3));
        let out = project_lanes(&data, &g, SumMode::Lin).unwrap();
        assert_eq!(out.dim(), (5, 2, 4, 2));
        assert_eq!(out[[1, 1, 3, 1]], (3 + 4 + 5) as f64);
        assert!(project_lanes(&data, &Array2::ones((4, 2)), SumMode::Lin).is_err());
    }

    #[test]
    fn sum_mode_parses() {
        assert_eq!("EXP".parse::<SumMode>().unwrap(), SumMode::Exp);
        assert!("log".parse::<SumMode>().is_err());
    }
}
