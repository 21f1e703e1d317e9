//! # neuro-ts: labelled 4-D time series for brain signals
//!
//! `neuro-ts` stores simulated or recorded brain activity (region, surface,
//! volume, EEG, MEG or SEEG sensor signals) as a `[time, variables, space,
//! samples]` array with per-axis labels, and provides a stateless service
//! for the usual post-processing: filtering, envelopes, normalisation,
//! decimation, concatenation, channel selection and sensor projection.
//!
//! ## Overview
//!
//! ```text
//! ndarray (2-D … 4-D) + TimeSeriesOptions
//!   │
//!   ├─ TimeSeries::new()           promote to 4-D, derive timing, validate labels
//!   │
//!   ├─ selection                   by index, label or time; windows; mixed indexing
//!   │    get_subspace_by_label(["r1", "r3"])
//!   │    index(&[.., "sv3".into(), Selector::span("r1", "r3")])
//!   │
//!   └─ TimeseriesService           every op returns a new series
//!        filter → hilbert_envelope → normalize("zscore") → select_by_power
//!        compute_seeg(source, sensors, SumMode::Lin)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use neuro_ts::{AxisRole, TimeSeries, TimeSeriesOptions, TimeseriesService};
//! use ndarray::Array2;
//!
//! // 1 s of 3 regions at 1 kHz (sample period in ms)
//! let data = Array2::from_shape_fn((1000, 3), |(t, s)| ((t * (s + 1)) as f64 * 0.05).sin());
//! let opts = TimeSeriesOptions { sample_period: Some(1.0), ..TimeSeriesOptions::default() }
//!     .with_labels(AxisRole::Space, &["r1", "r2", "r3"]);
//! let ts = TimeSeries::new(data, opts).unwrap();
//!
//! let svc = TimeseriesService::new();
//! let env = svc.hilbert_envelope(&ts).unwrap();
//! let z = svc.normalize(&env, "zscore", Some(0), None).unwrap();
//! let r2 = z.get_subspace_by_label(&["r2"]).unwrap();
//! assert_eq!(r2.shape(), [1000, 1, 1, 1]);
//! ```
//!
//! ## Errors and logging
//!
//! Fallible library calls return [`Result`] with an [`Error`] whose
//! [`kind`](Error::kind) separates shape, index, lookup, ambiguity, value,
//! configuration and attribute failures. Diagnostics go through the `log`
//! facade under each component's [`Logger`] target; no backend is installed
//! by the library.

pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod labels;
pub mod logging;
pub mod sensors;
pub mod service;
pub mod timeseries;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `neuro_ts::Foo` without having to know the internal module layout.

// config
pub use config::{TimeSeriesOptions, DEFAULT_SAMPLE_PERIOD, DEFAULT_TIME_UNIT};

// error
pub use error::{Error, ErrorKind, Result};

// labels
pub use labels::{AxisLabelRegistry, AxisRole};

// logging
pub use logging::Logger;

// sensors
pub use sensors::{monopolar_to_bipolar, Sensors, SensorsType, Surface};

// timeseries
pub use timeseries::{prepare_4d, Bound, Key, Selector, TimeSeries, TsType};

// service
pub use service::{
    AmplitudeReduction, DetrendType, GroupClustering, MetricThreshold, Normalization, Percentiles,
    SumMode, TimeseriesService, NORMALIZATION_METHODS,
};

// io
pub use io::{load_timeseries, write_timeseries, StWriter};
