//! Zstd codec glue.

use bytes::Bytes;

use crate::compression::core::CompressorOptions;
use crate::error::{Result, StrataError};

pub(crate) fn compress(data: &[u8], options: &CompressorOptions) -> Result<Vec<u8>> {
    let mut compressor = zstd::bulk::Compressor::new(options.level)
        .map_err(|e| StrataError::Corruption(format!("zstd compressor setup failed: {e}")))?;
    if let Some(window_log) = options.window_log {
        // Tuning only; out-of-range values are ignored.
        let _ = compressor.set_parameter(zstd::zstd_safe::CParameter::WindowLog(window_log));
    }
    compressor
        .compress(data)
        .map_err(|e| StrataError::Corruption(format!("zstd compression failed: {e}")))
}

pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Bytes> {
    let mut decompressor = zstd::bulk::Decompressor::new()
        .map_err(|e| StrataError::Corruption(format!("zstd decompressor setup failed: {e}")))?;
    let _ = decompressor.set_parameter(zstd::zstd_safe::DParameter::WindowLogMax(31));
    let mut buf = vec![0u8; expected_size];
    let actual_size = decompressor
        .decompress_to_buffer(data, &mut buf[..])
        .map_err(|e| StrataError::Corruption(format!("zstd decompression failed: {e}")))?;
    if actual_size != expected_size {
        return Err(StrataError::Corruption(format!(
            "zstd decompression size mismatch: expected {expected_size}, got {actual_size}"
        )));
    }
    Ok(Bytes::from(buf))
}
