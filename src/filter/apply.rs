//! Zero-phase FIR filtering by FFT overlap-add.
//!
//! An odd kernel of `N` taps runs once and its output is advanced by
//! `(N-1)/2` samples, which cancels the linear phase. Every lane is extended
//! by `N-1` odd-reflected samples per side so the edge transient falls
//! outside the kept window.
use std::sync::Arc;

use ndarray::{Array, Array1, ArrayViewMut1, Axis, Dimension};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{Error, Result};

/// A kernel planned for lanes of one length.
///
/// The FFT size, both plans and the kernel spectrum are computed once in
/// [`new`](Self::new) and shared by every [`filter_lane`](Self::filter_lane)
/// call, so filtering a `[T, V, S, N]` series plans a single FFT pair.
pub struct ZeroPhaseFir {
    n_taps: usize,
    n_lane: usize,
    /// Input samples consumed per FFT block.
    block: usize,
    /// Kernel spectrum, pre-scaled by `1 / n_fft`.
    spectrum: Vec<Complex<f64>>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl ZeroPhaseFir {
    /// Plan `h` for lanes of `n_lane` samples. `h` must have an odd number of
    /// taps (all kernels from [`design`](super::design) do).
    pub fn new(h: &[f64], n_lane: usize) -> Result<Self> {
        let n_taps = h.len();
        if n_taps % 2 == 0 {
            return Err(Error::InvalidParameter(format!(
                "zero-phase FIR kernel needs an odd number of taps, got {n_taps}"
            )));
        }
        let n_fft = fft_len(n_taps, n_lane + 2 * (n_taps - 1));
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let forward = planner.plan_fft_forward(n_fft);
        let inverse = planner.plan_fft_inverse(n_fft);

        let scale = 1.0 / n_fft as f64;
        let mut spectrum: Vec<Complex<f64>> = (0..n_fft)
            .map(|i| Complex::new(h.get(i).map_or(0.0, |&v| v * scale), 0.0))
            .collect();
        forward.process(&mut spectrum);

        Ok(Self { n_taps, n_lane, block: n_fft - n_taps + 1, spectrum, forward, inverse })
    }

    pub fn n_lane(&self) -> usize {
        self.n_lane
    }

    /// Filter one lane in place.
    pub fn filter_lane(&self, mut lane: ArrayViewMut1<'_, f64>) -> Result<()> {
        if lane.len() != self.n_lane {
            return Err(Error::InvalidParameter(format!(
                "filter planned for {} samples, lane has {}",
                self.n_lane,
                lane.len()
            )));
        }
        if self.n_lane == 0 {
            return Ok(());
        }
        let edge = self.n_taps - 1;
        let shift = edge / 2;
        let padded = reflect_limited_pad(&lane.to_vec(), edge, edge);

        let mut acc = vec![0.0_f64; padded.len()];
        let mut buf = vec![Complex::<f64>::default(); self.spectrum.len()];
        for start in (0..padded.len()).step_by(self.block) {
            let chunk = &padded[start..(start + self.block).min(padded.len())];
            let samples = chunk.iter().map(|&v| Complex::new(v, 0.0));
            for (b, v) in buf.iter_mut().zip(samples.chain(std::iter::repeat(Complex::default()))) {
                *b = v;
            }
            self.forward.process(&mut buf);
            buf.iter_mut().zip(self.spectrum.iter()).for_each(|(b, &hf)| *b *= hf);
            self.inverse.process(&mut buf);

            // Output sample `o` takes product sample `o + shift - start`.
            let first = start.saturating_sub(shift);
            for (o, b) in acc.iter_mut().skip(first).zip(buf.iter().skip(first + shift - start)) {
                *o += b.re;
            }
        }

        lane.iter_mut()
            .zip(&acc[edge..edge + self.n_lane])
            .for_each(|(l, &v)| *l = v);
        Ok(())
    }
}

/// Filter every lane of `data` along `axis` in place.
pub fn apply_fir_zero_phase<D: Dimension>(data: &mut Array<f64, D>, h: &[f64], axis: Axis) -> Result<()> {
    let fir = ZeroPhaseFir::new(h, data.len_of(axis))?;
    data.lanes_mut(axis)
        .into_iter()
        .try_for_each(|lane| fir.filter_lane(lane))
}

/// Filter a single signal; the output has the length of `x`.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    let mut y = Array1::from(x.to_vec());
    ZeroPhaseFir::new(h, x.len())?.filter_lane(y.view_mut())?;
    Ok(y.to_vec())
}

/// Odd reflection about the end samples: `2·x[0] − x[i]` on the left,
/// `2·x[n−1] − x[n−1−i]` on the right. Positions beyond the signal are
/// zero. `x` must not be empty.
pub(crate) fn reflect_limited_pad(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    let (first, last) = (x[0], x[n - 1]);
    let left = (1..=n_l)
        .rev()
        .map(|i| if i < n { 2.0 * first - x[i] } else { 0.0 });
    let right = (1..=n_r).map(|i| if i < n { 2.0 * last - x[n - 1 - i] } else { 0.0 });
    left.chain(x.iter().copied()).chain(right).collect()
}

/// Power-of-two FFT size with the lowest overlap-add cost
/// `ceil(n_x / (N − n_taps + 1)) · N · (log2 N + 1) + 4e-5 · N · n_x`.
fn fft_len(n_taps: usize, n_x: usize) -> usize {
    let lo = (2 * n_taps - 1).next_power_of_two().trailing_zeros();
    let hi = (n_x.max(1).next_power_of_two().trailing_zeros() + 1).max(lo);
    let cost = |n: usize| {
        let blocks = n_x.div_ceil(n - n_taps + 1) as f64;
        blocks * n as f64 * (n.trailing_zeros() as f64 + 1.0) + 4e-5 * n as f64 * n_x as f64
    };
    (lo..=hi)
        .map(|p| 1_usize << p)
        .fold((1_usize << lo, f64::INFINITY), |best, n| {
            let c = cost(n);
            if c < best.1 {
                (n, c)
            } else {
                best
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::design::{design_highpass, design_lowpass};
    use ndarray::Array4;

    #[test]
    fn filter_preserves_length() {
        let x: Vec<f64> = (0..1024).map(|i| (i as f64 / 1024.0).sin()).collect();
        let h = design_highpass(0.5, 256.0);
        assert_eq!(filter_1d(&x, &h).unwrap().len(), x.len());
    }

    #[test]
    fn filter_removes_dc() {
        let x = vec![1.0; 4096];
        let h = design_highpass(0.5, 256.0);
        let y = filter_1d(&x, &h).unwrap();
        let n_h = h.len();
        let max_val = y[n_h..y.len() - n_h].iter().map(|v| v.abs()).fold(0.0, f64::max);
        assert!(max_val < 1e-3, "DC not removed: max={max_val}");
    }

    #[test]
    fn even_kernel_is_rejected() {
        assert!(filter_1d(&[1.0, 2.0], &[0.5, 0.5]).is_err());
    }

    #[test]
    fn reflect_limited_left_pad() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let padded = reflect_limited_pad(&x, 3, 0);
        assert_eq!(&padded[..3], &[-2.0, -1.0, 0.0]);
        assert_eq!(&padded[3..], &x[..]);
    }

    #[test]
    fn reflect_pad_longer_than_signal_zero_fills() {
        let padded = reflect_limited_pad(&[1.0, 2.0], 3, 3);
        assert_eq!(padded, vec![0.0, 0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn planned_kernel_rejects_other_lengths() {
        let fir = ZeroPhaseFir::new(&design_lowpass(20.0, 256.0), 300).unwrap();
        assert_eq!(fir.n_lane(), 300);
        let mut short = Array1::<f64>::zeros(299);
        assert!(fir.filter_lane(short.view_mut()).is_err());
    }

    #[test]
    fn every_lane_matches_single_signal_filter() {
        let h = design_highpass(1.0, 256.0);
        let mut data = ndarray::Array2::from_shape_fn((3, 700), |(c, i)| {
            ((i * (c + 1)) as f64 * 0.05).sin() + c as f64
        });
        let rows: Vec<Vec<f64>> = data.rows().into_iter().map(|r| r.to_vec()).collect();
        apply_fir_zero_phase(&mut data, &h, Axis(1)).unwrap();
        for (row, x) in data.rows().into_iter().zip(&rows) {
            let want = filter_1d(x, &h).unwrap();
            for (a, b) in row.iter().zip(&want) {
                approx::assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn lanes_along_time_axis() {
        let mut data = Array4::from_elem((512, 1, 2, 1), 2.0);
        let h = design_lowpass(20.0, 256.0);
        apply_fir_zero_phase(&mut data, &h, Axis(0)).unwrap();
        for &v in data.iter() {
            approx::assert_abs_diff_eq!(v, 2.0, epsilon = 1e-6);
        }
    }
}
