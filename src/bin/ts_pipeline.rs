/// ts_pipeline: load a time series from safetensors, run a fixed chain of
/// service operations, write the result.
///
/// Steps (each optional, in this order):
///   subspace      keep the named space labels
///   filter        zero-phase FIR (--lowcut/--highcut/--mode)
///   decimate      anti-aliased stride by --decimate
///   envelope      hilbert | abs | spectrogram
///   normalize     any strategy name, along time
///   select        keep the --select-power strongest channels
use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

use neuro_ts::{
    io::{load_timeseries, write_timeseries},
    Logger, MetricThreshold, TimeseriesService,
};

#[derive(Parser, Debug)]
#[command(name = "ts_pipeline", about = "Time series post-processing pipeline")]
struct Args {
    /// Input safetensors file (float `data` tensor, rank 2–4).
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Space labels to keep (comma-separated); empty keeps all.
    #[arg(long, default_value = "")]
    labels: String,

    /// Lower cutoff (Hz).
    #[arg(long)]
    lowcut: Option<f64>,

    /// Upper cutoff (Hz).
    #[arg(long)]
    highcut: Option<f64>,

    /// bandpass | bandstop | lowpass | highpass
    #[arg(long, default_value = "bandpass")]
    mode: String,

    /// Decimation ratio (1 = none).
    #[arg(long, default_value_t = 1)]
    decimate: usize,

    /// hilbert | abs | spectrogram
    #[arg(long)]
    envelope: Option<String>,

    /// Normalisation strategy, e.g. zscore, baseline-std, minmax.
    #[arg(long)]
    normalize: Option<String>,

    /// Keep this many channels with the largest power.
    #[arg(long)]
    select_power: Option<usize>,

    /// Store the output array as F32 instead of F64.
    #[arg(long, default_value_t = false)]
    f32: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let svc = TimeseriesService::with_logger(Logger::new("ts_pipeline"));

    let mut ts = load_timeseries(&args.input)?;
    log::info!(
        "loaded {:?} @ {} Hz ({})",
        ts.shape(),
        ts.sample_rate(),
        ts.ts_type()
    );

    if !args.labels.is_empty() {
        let keep: Vec<&str> = args.labels.split(',').map(str::trim).collect();
        ts = ts.get_subspace_by_label(&keep)?;
    }

    if args.lowcut.is_some() || args.highcut.is_some() {
        ts = svc.filter(&ts, args.lowcut, args.highcut, &args.mode)?;
        log::info!("filtered ({} {:?}–{:?} Hz)", args.mode, args.lowcut, args.highcut);
    }

    if args.decimate > 1 {
        ts = svc.decimate_by_filtering(&ts, args.decimate)?;
        log::info!("decimated by {} → {} samples", args.decimate, ts.time_length());
    }

    if let Some(kind) = args.envelope.as_deref() {
        ts = match kind {
            "hilbert" => svc.hilbert_envelope(&ts)?,
            "abs" => svc.abs_envelope(&ts)?,
            "spectrogram" => svc.spectrogram_envelope(&ts, args.highcut, args.lowcut, None)?,
            other => bail!("unknown envelope {other:?}, expected hilbert, abs or spectrogram"),
        };
        log::info!("{kind} envelope → {:?}", ts.shape());
    }

    if let Some(name) = args.normalize.as_deref() {
        ts = svc.normalize(&ts, name, Some(0), None)?;
    }

    if let Some(n) = args.select_power {
        let (sub, idx) = svc.select_by_power(&ts, None, MetricThreshold::count(n))?;
        log::info!("selected channels {:?}", sub.space_labels().iter().zip(&idx).collect::<Vec<_>>());
        ts = sub;
    }

    write_timeseries(&ts, &args.output, args.f32)?;
    log::info!("written → {}", args.output.display());
    Ok(())
}
