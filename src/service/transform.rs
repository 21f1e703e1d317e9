//! Per-signal transforms applied along the time axis.
//!
//! Every function here works on one 1-D signal; the service maps it over the
//! `(variable, space, sample)` lanes of a series.
//!
//! ```text
//! hilbert      |x + i·H(x)|             FFT analytic signal
//! convolve     (x * k)[(n_k−1)/2 ..]    'same'-length linear convolution
//! detrend      x − (a + b·t)            least squares, or x − mean
//! spectrogram  Σ_f P(f, t)              Hann, 1/8 overlap, one-sided density
//! ```
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{Error, Result};

/// Analytic-signal amplitude for signals of one length, planned once.
///
/// The spectrum is one-sided: DC (and Nyquist, for even lengths) kept,
/// positive frequencies doubled, negative frequencies zeroed.
pub struct Hilbert {
    n: usize,
    /// One-sided gain per bin, folded with the `1 / n` inverse scale.
    gain: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Hilbert {
    pub fn new(n: usize) -> Self {
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let scale = 1.0 / n.max(1) as f64;
        let gain = (0..n)
            .map(|k| {
                if k == 0 || (n % 2 == 0 && k == n / 2) {
                    scale
                } else if k <= (n - 1) / 2 {
                    2.0 * scale
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            n,
            gain,
            forward: planner.plan_fft_forward(n),
            inverse: planner.plan_fft_inverse(n),
        }
    }

    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if `x` is not of the planned length.
    pub fn amplitude(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.n {
            return Err(Error::InvalidParameter(format!(
                "hilbert transform planned for {} samples, signal has {}",
                self.n,
                x.len()
            )));
        }
        if self.n == 0 {
            return Ok(vec![]);
        }
        let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex { re: v, im: 0.0 }).collect();
        self.forward.process(&mut buf);
        buf.iter_mut().zip(&self.gain).for_each(|(b, &g)| *b *= g);
        self.inverse.process(&mut buf);
        Ok(buf.iter().map(|c| c.norm()).collect())
    }
}

/// Amplitude of the analytic signal of `x`.
pub fn hilbert_amplitude(x: &[f64]) -> Vec<f64> {
    Hilbert::new(x.len()).amplitude(x).unwrap_or_default()
}

/// Linear convolution trimmed to the length of `x`, centred on the full
/// output.
pub fn convolve_same(x: &[f64], kernel: &[f64]) -> Vec<f64> {
    let (n_x, n_k) = (x.len(), kernel.len());
    if n_x == 0 || n_k == 0 {
        return vec![0.0; n_x];
    }
    let offset = (n_k - 1) / 2;
    (0..n_x)
        .map(|i| {
            let j = i + offset;
            let lo = j.saturating_sub(n_x - 1);
            let hi = j.min(n_k - 1);
            (lo..=hi).map(|k| kernel[k] * x[j - k]).sum()
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetrendType {
    #[default]
    Linear,
    Constant,
}

impl FromStr for DetrendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "l" => Ok(DetrendType::Linear),
            "constant" | "c" => Ok(DetrendType::Constant),
            other => Err(Error::InvalidParameter(format!(
                "detrend type {other:?}, expected \"linear\" or \"constant\""
            ))),
        }
    }
}

impl fmt::Display for DetrendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetrendType::Linear => f.write_str("linear"),
            DetrendType::Constant => f.write_str("constant"),
        }
    }
}

/// Remove the mean (`Constant`) or the least-squares line (`Linear`).
pub fn detrend(x: &mut [f64], kind: DetrendType) {
    let n = x.len();
    if n == 0 {
        return;
    }
    let mean = x.iter().sum::<f64>() / n as f64;
    match kind {
        DetrendType::Constant => x.iter_mut().for_each(|v| *v -= mean),
        DetrendType::Linear => {
            let t_mean = (n - 1) as f64 / 2.0;
            let (mut sxy, mut sxx) = (0.0, 0.0);
            for (i, &v) in x.iter().enumerate() {
                let dt = i as f64 - t_mean;
                sxy += dt * (v - mean);
                sxx += dt * dt;
            }
            let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
            for (i, v) in x.iter_mut().enumerate() {
                *v -= mean + slope * (i as f64 - t_mean);
            }
        }
    }
}

/// Periodic Hann window.
pub fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect()
}

/// Short-time power, summed over a frequency band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPower {
    /// One value per segment.
    pub power: Vec<f64>,
    /// Segment centres in seconds from the first sample.
    pub times: Vec<f64>,
}

/// Hann-segment power spectral density summed over a band, planned once
/// for a segment length.
///
/// Segments of `nperseg` samples overlap by `nperseg / 8` and are
/// mean-detrended before windowing. Bins with `hpf < f < lpf` contribute.
pub struct Spectrogram {
    fs: f64,
    nperseg: usize,
    win: Vec<f64>,
    /// Density scale per bin, doubled for the one-sided bins, zero outside
    /// the band.
    weight: Vec<f64>,
    fft: Arc<dyn Fft<f64>>,
}

impl Spectrogram {
    pub fn new(fs: f64, nperseg: usize, lpf: Option<f64>, hpf: Option<f64>) -> Result<Self> {
        if nperseg == 0 {
            return Err(Error::InvalidParameter("spectrogram segment length must be positive".into()));
        }
        let win = hann(nperseg);
        let scale = 1.0 / (fs * win.iter().map(|w| w * w).sum::<f64>());
        let weight = (0..nperseg / 2 + 1)
            .map(|k| {
                let f = k as f64 * fs / nperseg as f64;
                let in_band = lpf.map_or(true, |l| f < l) && hpf.map_or(true, |h| f > h);
                let sides = if k == 0 || (nperseg % 2 == 0 && k == nperseg / 2) { 1.0 } else { 2.0 };
                if in_band {
                    sides * scale
                } else {
                    0.0
                }
            })
            .collect();
        let fft = FftPlanner::<f64>::new().plan_fft_forward(nperseg);
        Ok(Self { fs, nperseg, win, weight, fft })
    }

    /// # Errors
    ///
    /// [`Error::InvalidParameter`] if `x` is shorter than one segment.
    pub fn band_power(&self, x: &[f64]) -> Result<BandPower> {
        let nperseg = self.nperseg;
        if nperseg > x.len() {
            return Err(Error::InvalidParameter(format!(
                "spectrogram segment length {nperseg} must be in 1..={}",
                x.len()
            )));
        }
        let step = nperseg - nperseg / 8;
        let n_segments = (x.len() - nperseg) / step + 1;

        let mut power = Vec::with_capacity(n_segments);
        let mut times = Vec::with_capacity(n_segments);
        let mut buf = vec![Complex::<f64>::default(); nperseg];
        for start in (0..n_segments).map(|seg| seg * step) {
            let chunk = &x[start..start + nperseg];
            let mean = chunk.iter().sum::<f64>() / nperseg as f64;
            for ((b, &v), &w) in buf.iter_mut().zip(chunk).zip(&self.win) {
                *b = Complex { re: (v - mean) * w, im: 0.0 };
            }
            self.fft.process(&mut buf);
            power.push(buf.iter().zip(&self.weight).map(|(b, &w)| b.norm_sqr() * w).sum());
            times.push((start as f64 + nperseg as f64 / 2.0) / self.fs);
        }
        Ok(BandPower { power, times })
    }
}

/// One-shot [`Spectrogram::band_power`].
///
/// # Errors
///
/// [`Error::InvalidParameter`] if `nperseg` is zero or longer than `x`.
pub fn spectrogram_band_power(
    x: &[f64],
    fs: f64,
    nperseg: usize,
    lpf: Option<f64>,
    hpf: Option<f64>,
) -> Result<BandPower> {
    Spectrogram::new(fs, nperseg, lpf, hpf)?.band_power(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hilbert_of_cosine_is_flat() {
        let n = 256;
        let x: Vec<f64> = (0..n).map(|i| 3.0 * (2.0 * PI * 8.0 * i as f64 / n as f64).cos()).collect();
        for v in hilbert_amplitude(&x) {
            assert_abs_diff_eq!(v, 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn planned_transforms_are_reusable() {
        let a: Vec<f64> = (0..200).map(|i| (i as f64 * 0.3).sin()).collect();
        let b: Vec<f64> = (0..200).map(|i| (i as f64 * 0.07).cos() + 1.0).collect();
        let h = Hilbert::new(200);
        let spec = Spectrogram::new(50.0, 32, Some(10.0), None).unwrap();
        for x in [&a, &b] {
            assert_eq!(h.amplitude(x).unwrap(), hilbert_amplitude(x));
            assert_eq!(spec.band_power(x).unwrap(), spectrogram_band_power(x, 50.0, 32, Some(10.0), None).unwrap());
        }
        assert!(h.amplitude(&a[..199]).is_err());
        assert!(spec.band_power(&a[..31]).is_err());
        assert!(Spectrogram::new(50.0, 0, None, None).is_err());
    }

    #[test]
    fn convolve_same_moving_average() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let k = [1.0 / 3.0; 3];
        let y = convolve_same(&x, &k);
        assert_eq!(y.len(), 5);
        assert_abs_diff_eq!(y[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[2], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[4], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn convolve_even_kernel_offset() {
        let y = convolve_same(&[1.0, 0.0, 0.0, 0.0], &[1.0, 2.0]);
        assert_eq!(y, vec![1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn detrend_removes_line() {
        let mut x: Vec<f64> = (0..10).map(|i| 2.0 + 0.5 * i as f64).collect();
        detrend(&mut x, DetrendType::Linear);
        x.iter().for_each(|&v| assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12));

        let mut y = vec![1.0, 3.0];
        detrend(&mut y, DetrendType::Constant);
        assert_eq!(y, vec![-1.0, 1.0]);
    }

    #[test]
    fn detrend_type_parses() {
        assert_eq!("Constant".parse::<DetrendType>().unwrap(), DetrendType::Constant);
        assert!("quadratic".parse::<DetrendType>().is_err());
    }

    #[test]
    fn spectrogram_segments_and_band() {
        let fs = 100.0;
        let x: Vec<f64> = (0..400).map(|i| (2.0 * PI * 10.0 * i as f64 / fs).sin()).collect();
        let all = spectrogram_band_power(&x, fs, 64, None, None).unwrap();
        // step 56: (400 - 64) / 56 + 1
        assert_eq!(all.power.len(), 7);
        assert_abs_diff_eq!(all.times[0], 0.32, epsilon = 1e-12);
        let above = spectrogram_band_power(&x, fs, 64, None, Some(30.0)).unwrap();
        assert!(above.power[3] < 0.01 * all.power[3]);
        assert!(spectrogram_band_power(&x, fs, 500, None, None).is_err());
    }
}
