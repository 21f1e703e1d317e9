use ndarray::{Array2, Axis};
use neuro_ts::filter::{apply_fir_zero_phase, design, design_highpass, design_lowpass, FilterBand};

// ── Coefficient tests ─────────────────────────────────────────────────────────

#[test]
fn filter_coeffs_sum_near_zero() {
    // Highpass: sum of coefficients ≈ 0 (zero DC gain).
    let h = design_highpass(0.5, 256.0);
    let s: f64 = h.iter().sum();
    assert!(s.abs() < 1e-9, "sum(h) = {s:.2e}, expected ≈ 0 for highpass");
}

#[test]
fn lowpass_coeffs_have_unit_gain() {
    let h = design_lowpass(30.0, 256.0);
    let s: f64 = h.iter().sum();
    assert!((s - 1.0).abs() < 1e-9, "sum(h) = {s}");
}

#[test]
fn filter_coeffs_symmetric() {
    let h = design_highpass(0.5, 256.0);
    let n = h.len();
    assert_eq!(n % 2, 1);
    for i in 0..n / 2 {
        let diff = (h[i] - h[n - 1 - i]).abs();
        assert!(diff < 1e-12, "h[{i}]={} ≠ h[{}]={}", h[i], n - 1 - i, h[n - 1 - i]);
    }
}

#[test]
fn cutoffs_outside_nyquist_are_rejected() {
    assert!(design(FilterBand::Lowpass(200.0), 256.0).is_err());
    assert!(design(FilterBand::Highpass(0.0), 256.0).is_err());
    assert!(design(FilterBand::Bandpass(30.0, 10.0), 256.0).is_err());
    assert!(FilterBand::from_cutoffs(Some(1.0), None, "bandpass").is_err());
    assert_eq!(
        FilterBand::from_cutoffs(None, Some(40.0), "LowPass").unwrap(),
        FilterBand::Lowpass(40.0)
    );
}

// ── Application tests ─────────────────────────────────────────────────────────

fn two_tones(sfreq: f64, n: usize, f_low: f64, f_high: f64) -> Array2<f64> {
    Array2::from_shape_fn((1, n), |(_, i)| {
        let t = i as f64 / sfreq;
        (2.0 * std::f64::consts::PI * f_low * t).sin() + (2.0 * std::f64::consts::PI * f_high * t).sin()
    })
}

fn interior_rms(data: &Array2<f64>, guard: usize) -> f64 {
    let row = data.row(0);
    let interior = row.slice(ndarray::s![guard..row.len() - guard]);
    (interior.iter().map(|v| v * v).sum::<f64>() / interior.len() as f64).sqrt()
}

#[test]
fn filter_removes_sub_hz_content() {
    // 0.1 Hz (stop band) + 5 Hz (pass band), 60 seconds.
    let sfreq = 256.0;
    let mut data = two_tones(sfreq, 60 * 256, 0.1, 5.0);
    let h = design_highpass(0.5, sfreq);
    apply_fir_zero_phase(&mut data, &h, Axis(1)).unwrap();

    // Pure 5 Hz sine has RMS = 1/sqrt(2) ≈ 0.707.
    let rms = interior_rms(&data, h.len());
    assert!(rms > 0.5, "RMS too low ({rms:.3}), pass-band signal attenuated?");
    assert!(rms < 0.85, "RMS too high ({rms:.3}), stop-band not attenuated?");
}

#[test]
fn bandstop_removes_line_noise() {
    let sfreq = 256.0;
    let mut data = two_tones(sfreq, 20 * 256, 5.0, 50.0);
    let h = design(FilterBand::Bandstop(40.0, 60.0), sfreq).unwrap();
    apply_fir_zero_phase(&mut data, &h, Axis(1)).unwrap();

    let rms = interior_rms(&data, h.len());
    assert!((rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.05, "RMS {rms:.3}");
}
