//! Windowed-sinc FIR design (Hamming window), following
//! `scipy.signal.firwin` and MNE's automatic transition bandwidths.
//!
//! For a cutoff `f` Hz at sampling rate `sfreq`:
//!   • highpass transition = min(max(0.25 · f, 2.0), f)
//!   • lowpass transition  = min(max(0.25 · f, 2.0), sfreq/2 − f)
//!   • filter length N     = ceil(3.3 / transition · sfreq), rounded to odd
//!   • band filters are differences of lowpass kernels of equal length
use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Pass/stop band of a filter, cutoffs in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterBand {
    Lowpass(f64),
    Highpass(f64),
    Bandpass(f64, f64),
    Bandstop(f64, f64),
}

impl FilterBand {
    /// Build a band from optional low/high cutoffs and a mode name
    /// (`"bandpass"`, `"bandstop"`, `"lowpass"`, `"highpass"`).
    pub fn from_cutoffs(lowcut: Option<f64>, highcut: Option<f64>, mode: &str) -> Result<Self> {
        match (mode.to_ascii_lowercase().as_str(), lowcut, highcut) {
            ("bandpass", Some(l), Some(h)) => Ok(FilterBand::Bandpass(l, h)),
            ("bandstop", Some(l), Some(h)) => Ok(FilterBand::Bandstop(l, h)),
            ("lowpass", _, Some(h)) => Ok(FilterBand::Lowpass(h)),
            ("highpass", Some(l), _) => Ok(FilterBand::Highpass(l)),
            (m, l, h) => Err(Error::InvalidParameter(format!(
                "filter mode {m:?} with lowcut={l:?} highcut={h:?}"
            ))),
        }
    }
}

/// Highpass transition bandwidth: `min(max(0.25 · l_freq, 2.0), l_freq)`.
pub fn auto_trans_bandwidth(l_freq: f64) -> f64 {
    (0.25 * l_freq).max(2.0).min(l_freq)
}

/// Lowpass transition bandwidth: `min(max(0.25 · h_freq, 2.0), nyquist − h_freq)`.
pub fn auto_trans_bandwidth_high(h_freq: f64, sfreq: f64) -> f64 {
    (0.25 * h_freq).max(2.0).min(sfreq / 2.0 - h_freq)
}

/// Number of taps for a transition bandwidth; always odd.
///
/// Formula: `ceil(3.3 / trans_bw * sfreq)` rounded up to odd.
pub fn auto_filter_length(trans_bw: f64, sfreq: f64) -> usize {
    let n_raw = (3.3 / trans_bw * sfreq).ceil() as usize;
    if n_raw % 2 == 0 { n_raw + 1 } else { n_raw }
}

/// Design a zero-phase FIR kernel for `band` at `sfreq` Hz.
///
/// Every cutoff must lie strictly inside `(0, sfreq/2)` and band edges must
/// be increasing.
pub fn design(band: FilterBand, sfreq: f64) -> Result<Vec<f64>> {
    let nyq = sfreq / 2.0;
    let check = |f: f64| {
        if f > 0.0 && f < nyq {
            Ok(f)
        } else {
            Err(Error::InvalidParameter(format!(
                "cutoff {f} Hz outside (0, {nyq}) for sampling rate {sfreq} Hz"
            )))
        }
    };
    match band {
        FilterBand::Highpass(l) => Ok(design_highpass(check(l)?, sfreq)),
        FilterBand::Lowpass(h) => Ok(design_lowpass(check(h)?, sfreq)),
        FilterBand::Bandpass(l, h) | FilterBand::Bandstop(l, h) => {
            let (l, h) = (check(l)?, check(h)?);
            if l >= h {
                return Err(Error::InvalidParameter(format!(
                    "band edges must increase, got {l} Hz ≥ {h} Hz"
                )));
            }
            let pass = design_bandpass(l, h, sfreq);
            if matches!(band, FilterBand::Bandpass(..)) {
                Ok(pass)
            } else {
                Ok(invert(pass))
            }
        }
    }
}

/// Highpass at `l_freq`: spectral inversion of a lowpass at the middle of
/// the transition band.
pub fn design_highpass(l_freq: f64, sfreq: f64) -> Vec<f64> {
    let trans_bw = auto_trans_bandwidth(l_freq);
    let n = auto_filter_length(trans_bw, sfreq);
    let cutoff_hz = l_freq - trans_bw / 2.0;
    invert(firwin(n, cutoff_hz, sfreq, true))
}

/// Lowpass at `h_freq`, cutoff in the middle of the transition band.
pub fn design_lowpass(h_freq: f64, sfreq: f64) -> Vec<f64> {
    let trans_bw = auto_trans_bandwidth_high(h_freq, sfreq);
    let n = auto_filter_length(trans_bw, sfreq);
    firwin(n, h_freq + trans_bw / 2.0, sfreq, true)
}

/// Bandpass `[l_freq, h_freq]` as `lowpass(h) − lowpass(l)`.
pub fn design_bandpass(l_freq: f64, h_freq: f64, sfreq: f64) -> Vec<f64> {
    let l_trans = auto_trans_bandwidth(l_freq);
    let h_trans = auto_trans_bandwidth_high(h_freq, sfreq);
    let n = auto_filter_length(l_trans.min(h_trans), sfreq);
    let upper = firwin(n, h_freq + h_trans / 2.0, sfreq, true);
    let lower = firwin(n, l_freq - l_trans / 2.0, sfreq, true);
    upper.iter().zip(&lower).map(|(u, l)| u - l).collect()
}

/// `delta[N/2] − h`: turns a lowpass into a highpass, a bandpass into a
/// bandstop.
fn invert(mut h: Vec<f64>) -> Vec<f64> {
    let mid = h.len() / 2;
    h.iter_mut().for_each(|v| *v = -*v);
    h[mid] += 1.0;
    h
}

/// Hamming-windowed sinc with unit DC gain.
///
/// `pass_zero=true` gives a lowpass, `false` its spectral inverse.
/// `cutoff_hz` is the −6 dB point. `n` must be odd.
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64, pass_zero: bool) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0);

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // lim_{x→0} sin(π·fc·x) / (π·x) = fc
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);

    if pass_zero { h } else { invert(h) }
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}
