//! FIR filter design and application.
//!
//! - [`design`]: Hamming-windowed sinc lowpass/highpass/bandpass/bandstop
//!   kernels with automatic transition bandwidth and length.
//! - [`apply`]: overlap-add zero-phase convolution along any array axis.

pub mod apply;
pub mod design;

pub use apply::{apply_fir_zero_phase, filter_1d, ZeroPhaseFir};
pub use design::{
    auto_filter_length, auto_trans_bandwidth, auto_trans_bandwidth_high, design, design_bandpass,
    design_highpass, design_lowpass, firwin, hamming, FilterBand,
};
