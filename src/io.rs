//! Safetensors I/O for time series.
//!
//! A series is stored as:
//!
//! ```text
//! data                 F32 | F64   [T, V, S, N] (rank 2–4 accepted on read)
//! start_time           F64   [1]   optional, default 0
//! sample_period        F64   [1]   optional, default 1
//! labels.<role>        U8    [len] newline-joined labels, optional per axis
//! __metadata__         {"time_unit", "ts_type", "title"} all optional
//! ```
//!
//! `<role>` is one of `time`, `variables`, `space`, `samples`.
use anyhow::{bail, ensure, Context, Result};
use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::TimeSeriesOptions;
use crate::labels::AxisRole;
use crate::timeseries::{TimeSeries, TsType};

// ── Low-level safetensors parser (raw bytes → ndarray, no tensor types) ─────

type Header = HashMap<String, serde_json::Value>;

fn parse_header(bytes: &[u8]) -> Result<(Header, usize)> {
    ensure!(bytes.len() >= 8, "safetensors file too small");
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let n = usize::try_from(u64::from_le_bytes(len)).context("safetensors header length overflows")?;
    let end = n.checked_add(8).context("safetensors header length overflows")?;
    ensure!(bytes.len() >= end, "safetensors header length {n} exceeds file size");
    let header: Header =
        serde_json::from_slice(&bytes[8..end]).context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, entry: &serde_json::Value) -> Result<&'a [u8]> {
    let offsets = entry["data_offsets"]
        .as_array()
        .context("tensor entry without data_offsets")?;
    let (s, e) = match offsets.as_slice() {
        [s, e] => (
            s.as_u64().context("bad data offset")? as usize,
            e.as_u64().context("bad data offset")? as usize,
        ),
        _ => bail!("data_offsets must have two entries"),
    };
    let range = data_start.checked_add(s).zip(data_start.checked_add(e));
    range
        .and_then(|(s, e)| bytes.get(s..e))
        .context("tensor data outside the file")
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry without shape")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("bad shape entry"))
        .collect()
}

/// Read an F32 or F64 tensor, widened to f64.
fn read_float_tensor(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<ArrayD<f64>> {
    let raw = tensor_bytes(bytes, data_start, entry)?;
    let values: Vec<f64> = match entry["dtype"].as_str() {
        Some("F32") => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        Some("F64") => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        other => bail!("unsupported dtype {other:?}, expected F32 or F64"),
    };
    Ok(ArrayD::from_shape_vec(IxDyn(&shape_of(entry)?), values)?)
}

fn read_scalar(bytes: &[u8], data_start: usize, header: &Header, key: &str) -> Result<Option<f64>> {
    match header.get(key) {
        Some(entry) => {
            let t = read_float_tensor(bytes, data_start, entry)?;
            Ok(Some(*t.iter().next().with_context(|| format!("'{key}' is empty"))?))
        }
        None => Ok(None),
    }
}

fn read_labels(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<String>> {
    let raw = std::str::from_utf8(tensor_bytes(bytes, data_start, entry)?)?;
    Ok(raw.split('\n').map(String::from).collect())
}

fn label_key(role: AxisRole) -> String {
    let name = match role {
        AxisRole::Time => "time",
        AxisRole::Variables => "variables",
        AxisRole::Space => "space",
        AxisRole::Samples => "samples",
    };
    format!("labels.{name}")
}

// ── Time series ──────────────────────────────────────────────────────────────

/// Load a time series written by [`write_timeseries`] (or any safetensors
/// file with a float `data` tensor of rank 2 to 4).
pub fn load_timeseries(path: &Path) -> Result<TimeSeries> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let data_entry = header.get("data").context("missing 'data' key")?;
    let data = read_float_tensor(&bytes, data_start, data_entry)?;

    let mut opts = TimeSeriesOptions {
        start_time: read_scalar(&bytes, data_start, &header, "start_time")?,
        sample_period: read_scalar(&bytes, data_start, &header, "sample_period")?,
        ..TimeSeriesOptions::default()
    };
    for role in AxisRole::ALL {
        if let Some(entry) = header.get(&label_key(role)) {
            opts.labels.insert(role, read_labels(&bytes, data_start, entry)?);
        }
    }
    if let Some(meta) = header.get("__metadata__").and_then(|m| m.as_object()) {
        let text = |k: &str| meta.get(k).and_then(|v| v.as_str()).map(String::from);
        opts.time_unit = text("time_unit");
        opts.title = text("title");
        if let Some(t) = text("ts_type") {
            opts.ts_type = Some(t.parse::<TsType>()?);
        }
    }

    log::debug!(
        "loaded {:?} from {} ({} tensors)",
        data.shape(),
        path.display(),
        header.len()
    );
    Ok(TimeSeries::new(data, opts)?)
}

/// Write `ts` to `path`; `single_precision` stores `data` as F32.
pub fn write_timeseries(ts: &TimeSeries, path: &Path, single_precision: bool) -> Result<()> {
    StWriter::from_timeseries(ts, single_precision)
        .write(path)
        .with_context(|| format!("writing {}", path.display()))
}

// ── Safetensors writer ───────────────────────────────────────────────────────

enum Payload {
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// UTF-8 text, stored as a 1-D U8 tensor.
    Text(String),
}

impl Payload {
    fn dtype(&self) -> &'static str {
        match self {
            Payload::F32(_) => "F32",
            Payload::F64(_) => "F64",
            Payload::Text(_) => "U8",
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            Payload::F32(v) => v.len() * 4,
            Payload::F64(v) => v.len() * 8,
            Payload::Text(t) => t.len(),
        }
    }

    fn write_to(&self, out: &mut impl Write) -> std::io::Result<()> {
        match self {
            Payload::F32(v) => v.iter().try_for_each(|x| out.write_all(&x.to_le_bytes())),
            Payload::F64(v) => v.iter().try_for_each(|x| out.write_all(&x.to_le_bytes())),
            Payload::Text(t) => out.write_all(t.as_bytes()),
        }
    }
}

struct Tensor {
    name: String,
    shape: Vec<usize>,
    payload: Payload,
}

/// Safetensors writer for F32, F64 and text tensors plus string metadata.
///
/// Tensors are laid out in insertion order.
///
/// ```rust,no_run
/// use neuro_ts::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("signal", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_text("labels.space", "r1\nr2\nr3");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    tensors: Vec<Tensor>,
    metadata: serde_json::Map<String, serde_json::Value>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout read back by [`load_timeseries`]: `data`, the two timing
    /// scalars, one text tensor per labelled axis and the descriptive fields
    /// as metadata.
    pub fn from_timeseries(ts: &TimeSeries, single_precision: bool) -> Self {
        let data = if single_precision {
            Payload::F32(ts.data().iter().map(|&v| v as f32).collect())
        } else {
            Payload::F64(ts.data().iter().copied().collect())
        };
        let mut w = Self::new();
        w.push("data", ts.shape().to_vec(), data);
        w.add_f64("start_time", &[ts.start_time()], &[1]);
        w.add_f64("sample_period", &[ts.sample_period()], &[1]);
        for role in AxisRole::ALL.into_iter().filter(|&r| ts.registry().is_labelled(r)) {
            w.add_text(&label_key(role), &ts.labels(role).join("\n"));
        }
        w.add_metadata("time_unit", ts.time_unit());
        w.add_metadata("ts_type", &ts.ts_type().to_string());
        w.add_metadata("title", ts.title());
        w
    }

    fn push(&mut self, name: &str, shape: Vec<usize>, payload: Payload) {
        self.tensors.push(Tensor { name: name.to_string(), shape, payload });
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        self.push(name, shape.to_vec(), Payload::F32(data.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        self.push(name, shape.to_vec(), Payload::F64(data.to_vec()));
    }

    pub fn add_text(&mut self, name: &str, text: &str) {
        self.push(name, vec![text.len()], Payload::Text(text.to_string()));
    }

    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// JSON header, space-padded to a multiple of eight bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            map.insert("__metadata__".into(), self.metadata.clone().into());
        }
        let mut offset = 0usize;
        for t in &self.tensors {
            let end = offset + t.payload.byte_len();
            map.insert(
                t.name.clone(),
                serde_json::json!({
                    "dtype": t.payload.dtype(),
                    "shape": t.shape,
                    "data_offsets": [offset, end],
                }),
            );
            offset = end;
        }
        let mut header = serde_json::to_vec(&map)?;
        header.resize(header.len().next_multiple_of(8), b' ');
        Ok(header)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let header = self.header()?;
        let mut out = BufWriter::new(std::fs::File::create(path)?);
        out.write_all(&(header.len() as u64).to_le_bytes())?;
        out.write_all(&header)?;
        for t in &self.tensors {
            t.payload.write_to(&mut out)?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_padded_to_eight_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pad.safetensors");
        let mut w = StWriter::new();
        w.add_f64("x", &[1.0], &[1]);
        w.write(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let (header, start) = parse_header(&bytes).unwrap();
        assert_eq!(start % 8, 0);
        assert!(header.contains_key("x"));
    }

    #[test]
    fn series_layout_skips_unlabelled_axes() {
        let opts = TimeSeriesOptions::default().with_labels(AxisRole::Space, &["r1", "r2"]);
        let ts = TimeSeries::new(ndarray::Array2::<f64>::zeros((3, 2)), opts).unwrap();
        let w = StWriter::from_timeseries(&ts, true);
        let names: Vec<&str> = w.tensors.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["data", "start_time", "sample_period", "labels.space"]);
        assert_eq!(w.tensors[0].payload.dtype(), "F32");
        assert_eq!(w.tensors[3].payload.byte_len(), "r1\nr2".len());
        assert!(w.metadata.contains_key("ts_type"));
    }

    #[test]
    fn truncated_file_is_rejected() {
        assert!(parse_header(&[1, 0, 0]).is_err());
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());
    }

    #[test]
    fn huge_header_length_is_rejected() {
        let mut bytes = u64::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"{}");
        assert!(parse_header(&bytes).is_err());
    }
}
