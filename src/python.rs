// Python bindings, built with the "python" feature

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::AudioContext;

fn to_json(context: &AudioContext) -> PyResult<String> {
    serde_json::to_string(context).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Decode an MP3 file and return everything found as a JSON string
#[pyfunction]
fn decode_file(path: &str) -> PyResult<String> {
    let context = crate::read_file(path)?;
    to_json(&context)
}

/// Decode an in-memory MP3 stream and return everything found as a JSON string
#[pyfunction]
fn decode_bytes(data: &[u8]) -> PyResult<String> {
    to_json(&crate::decode(data))
}

/// mp3meta - MPEG audio metadata decoder
#[pymodule]
fn mp3meta(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(decode_file, m)?)?;
    m.add_function(wrap_pyfunction!(decode_bytes, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
