/// Shared builders for integration tests.
use ndarray::{Array, Array2, Array3, Array4, IxDyn};
use neuro_ts::{AxisRole, Sensors, SensorsType, TimeSeries, TimeSeriesOptions};

#[allow(unused)]
/// 3×3 series: time 0.00, 0.01, 0.02; regions r1..r3.
pub fn region_2d() -> TimeSeries {
    let data = Array2::from_shape_fn((3, 3), |(t, s)| (t * 10 + s) as f64);
    let opts = TimeSeriesOptions {
        start_time: Some(0.0),
        sample_period: Some(0.01),
        ..TimeSeriesOptions::default()
    }
    .with_labels(AxisRole::Space, &["r1", "r2", "r3"]);
    TimeSeries::new(data, opts).unwrap()
}

#[allow(unused)]
/// 3×4×3 series with state variables sv1..sv4 and regions r1..r3;
/// value = 100·t + 10·v + s.
pub fn region_3d() -> TimeSeries {
    let data = Array3::from_shape_fn((3, 4, 3), |(t, v, s)| (t * 100 + v * 10 + s) as f64);
    let opts = TimeSeriesOptions {
        start_time: Some(0.0),
        sample_period: Some(0.01),
        ..TimeSeriesOptions::default()
    }
    .with_labels(AxisRole::Space, &["r1", "r2", "r3"])
    .with_labels(AxisRole::Variables, &["sv1", "sv2", "sv3", "sv4"]);
    TimeSeries::new(data, opts).unwrap()
}

#[allow(unused)]
/// `[T, 1, S, 1]` sines at 1 kHz (period 1 ms); channel `s` has frequency
/// `freqs[s]` Hz and amplitude `s + 1`.
pub fn sines(n_t: usize, freqs: &[f64]) -> TimeSeries {
    let labels: Vec<String> = (0..freqs.len()).map(|s| format!("ch{s}")).collect();
    let data = Array4::from_shape_fn((n_t, 1, freqs.len(), 1), |(t, _, s, _)| {
        let time = t as f64 / 1000.0;
        (s + 1) as f64 * (2.0 * std::f64::consts::PI * freqs[s] * time).sin()
    });
    let opts = TimeSeriesOptions {
        sample_period: Some(1.0),
        time_unit: Some("ms".into()),
        ..TimeSeriesOptions::default()
    }
    .with_labels(AxisRole::Space, &labels);
    TimeSeries::new(data, opts).unwrap()
}

#[allow(unused)]
/// Sensors with identity-like gain `[n_sensors, n_sources]`.
pub fn seeg_sensors(n_sensors: usize, n_sources: usize) -> Sensors {
    let labels = (0..n_sensors).map(|i| format!("A{}", i + 1)).collect();
    let gain = Array2::from_shape_fn((n_sensors, n_sources), |(i, j)| if i == j { 1.0 } else { 0.1 });
    Sensors::new("seeg", labels, gain, SensorsType::Seeg).unwrap()
}

#[allow(unused)]
/// Maximum absolute difference between two arrays.
pub fn max_abs_diff<D: ndarray::Dimension>(a: &Array<f64, D>, b: &Array<f64, D>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}

#[allow(unused)]
/// Standard deviation of an array (ddof = 0).
pub fn array_std(a: &Array<f64, IxDyn>) -> f64 {
    let n = a.len() as f64;
    let mean: f64 = a.iter().sum::<f64>() / n;
    let var: f64 = a.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}
