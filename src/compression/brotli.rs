//! Brotli codec glue.

use std::io::Cursor;

use bytes::Bytes;

use crate::compression::core::CompressorOptions;
use crate::error::{Result, StrataError};

pub(crate) fn compress(data: &[u8], options: &CompressorOptions) -> Result<Vec<u8>> {
    let mut params = brotli::enc::BrotliEncoderParams {
        quality: options.level,
        ..Default::default()
    };
    if let Some(window_log) = options.window_log {
        params.lgwin = window_log as i32;
    }
    if let Some(size_hint) = options.size_hint {
        params.size_hint = size_hint as usize;
    }
    let mut out = Vec::new();
    brotli::BrotliCompress(&mut Cursor::new(data), &mut out, &params)
        .map_err(|e| StrataError::Corruption(format!("brotli compression failed: {e}")))?;
    Ok(out)
}

pub(crate) fn decompress(data: &[u8], expected_size: usize) -> Result<Bytes> {
    let mut out = Vec::with_capacity(expected_size);
    brotli::BrotliDecompress(&mut Cursor::new(data), &mut out)
        .map_err(|e| StrataError::Corruption(format!("brotli decompression failed: {e}")))?;
    if out.len() != expected_size {
        return Err(StrataError::Corruption(format!(
            "brotli decompression size mismatch: expected {expected_size}, got {}",
            out.len()
        )));
    }
    Ok(Bytes::from(out))
}
