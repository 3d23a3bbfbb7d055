//! Python bindings, built with the `python` feature.

use pyo3::exceptions::{PyIOError, PyRuntimeError, PyTimeoutError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::errors::DriverError;
use crate::protocol::{decode, Sample, FRAME_SIZE};
use crate::session::{
    acquire as acquire_blocking, AcquisitionResult, SessionConfig, DEFAULT_DURATION_S,
    DEFAULT_SAMPLING_RATE_HZ,
};
use crate::transport::{SerialSettings, BAUD_RATE};

fn to_py_err(e: DriverError) -> PyErr {
    match e {
        DriverError::TransportOpen { .. } | DriverError::Io(_) | DriverError::Serial(_) => {
            PyIOError::new_err(e.to_string())
        }
        DriverError::ProtocolTimeout { .. } | DriverError::BulkReadTimeout { .. } => {
            PyTimeoutError::new_err(e.to_string())
        }
        DriverError::InvalidConfig(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

/// One decoded reading.
///
/// Attributes:
///     timestamp_us: Microseconds since the first frame of the session.
///     capacitance_pf: Capacitance in pF, rounded to 4 decimals.
#[pyclass(name = "Sample", frozen, eq)]
#[derive(Clone, PartialEq)]
struct PySample {
    #[pyo3(get)]
    timestamp_us: i64,
    #[pyo3(get)]
    capacitance_pf: f64,
}

#[pymethods]
impl PySample {
    fn __repr__(&self) -> String {
        format!(
            "Sample(timestamp_us={}, capacitance_pf={})",
            self.timestamp_us, self.capacitance_pf
        )
    }
}

impl From<Sample> for PySample {
    fn from(s: Sample) -> Self {
        PySample {
            timestamp_us: s.relative_timestamp,
            capacitance_pf: s.capacitance_pf,
        }
    }
}

/// Samples and bookkeeping from one acquisition.
///
/// Attributes:
///     samples: List of Sample objects in device order.
///     bytes_received: Size of the raw stream.
///     whole_frames: False if the stream ended inside a frame.
#[pyclass(name = "AcquisitionResult", frozen)]
#[derive(Clone)]
struct PyAcquisitionResult {
    #[pyo3(get)]
    samples: Vec<PySample>,
    #[pyo3(get)]
    bytes_received: usize,
    #[pyo3(get)]
    whole_frames: bool,
    #[pyo3(get)]
    duration_s: f64,
    #[pyo3(get)]
    sampling_rate_hz: f64,
    #[pyo3(get)]
    capdac: u8,
}

#[pymethods]
impl PyAcquisitionResult {
    fn __repr__(&self) -> String {
        format!(
            "AcquisitionResult(samples={}, bytes_received={}, capdac={})",
            self.samples.len(),
            self.bytes_received,
            self.capdac
        )
    }

    fn __len__(&self) -> usize {
        self.samples.len()
    }

    /// Columns as a dict of lists, ready for `pandas.DataFrame`.
    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        let ts: Vec<i64> = self.samples.iter().map(|s| s.timestamp_us).collect();
        let pf: Vec<f64> = self.samples.iter().map(|s| s.capacitance_pf).collect();
        dict.set_item("timestamp_us", ts)?;
        dict.set_item("capacitance_pf", pf)?;
        Ok(dict)
    }
}

impl From<AcquisitionResult> for PyAcquisitionResult {
    fn from(r: AcquisitionResult) -> Self {
        PyAcquisitionResult {
            samples: r.samples.into_iter().map(PySample::from).collect(),
            bytes_received: r.bytes_received,
            whole_frames: r.whole_frames,
            duration_s: r.metadata.duration_s,
            sampling_rate_hz: r.metadata.sampling_rate_hz,
            capdac: r.metadata.capdac,
        }
    }
}

/// Decode a raw frame stream. Trailing bytes short of a frame are ignored.
#[pyfunction]
#[pyo3(signature = (data, capdac=0))]
fn decode_frames(data: &[u8], capdac: i64) -> Vec<PySample> {
    let capdac = crate::protocol::clamp_capdac(capdac);
    decode(data, capdac).into_iter().map(PySample::from).collect()
}

/// Configure the board, run one acquisition and return the decoded samples.
///
/// Raises:
///     IOError: If the port cannot be opened or the link fails.
///     TimeoutError: If the device stops answering.
///     RuntimeError: If the device answers with the wrong acknowledgment.
///     ValueError: If rate x duration is not a usable sample count.
#[pyfunction]
#[pyo3(signature = (
    port,
    duration_s=DEFAULT_DURATION_S,
    sampling_rate_hz=DEFAULT_SAMPLING_RATE_HZ,
    capdac=0,
    baud_rate=BAUD_RATE
))]
fn acquire(
    py: Python<'_>,
    port: &str,
    duration_s: f64,
    sampling_rate_hz: f64,
    capdac: i64,
    baud_rate: u32,
) -> PyResult<PyAcquisitionResult> {
    let settings = SerialSettings {
        baud_rate,
        ..SerialSettings::new(port)
    };
    let config = SessionConfig {
        capdac,
        duration_s,
        sampling_rate_hz,
        ..SessionConfig::default()
    };
    py.detach(|| acquire_blocking(&settings, config))
        .map(PyAcquisitionResult::from)
        .map_err(to_py_err)
}

/// Route Rust log output to stderr at `level` (or `CAPDAC_LOG`/`RUST_LOG`).
#[pyfunction]
#[pyo3(signature = (level=None))]
fn init_logging(level: Option<&str>) {
    crate::logging::init_logging_with(level);
}

#[pymodule]
#[pyo3(name = "_core")]
fn core_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySample>()?;
    m.add_class::<PyAcquisitionResult>()?;
    m.add_function(wrap_pyfunction!(decode_frames, m)?)?;
    m.add_function(wrap_pyfunction!(acquire, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    m.add("FRAME_SIZE", FRAME_SIZE)?;
    m.add("DEFAULT_SAMPLING_RATE", DEFAULT_SAMPLING_RATE_HZ)?;
    m.add("CAPDAC_MAX", crate::protocol::CAPDAC_MAX)?;

    Ok(())
}
