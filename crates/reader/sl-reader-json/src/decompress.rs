use async_compression::tokio::bufread::GzipDecoder;
use bytes::Bytes;
use sl_error::{ReaderError, Result, SlError};
use tokio::io::AsyncReadExt;
use tracing::trace;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Returns true if `key` ends in `.gz` or `data` starts with the gzip magic.
pub fn is_gzip(key: &str, data: &[u8]) -> bool {
    key.to_lowercase().ends_with(".gz") || data.starts_with(&GZIP_MAGIC)
}

/// Gunzips `data` when it is gzip, otherwise returns it unchanged.
pub async fn maybe_decompress(key: &str, data: Bytes) -> Result<Bytes> {
    if data.is_empty() || !is_gzip(key, &data) {
        return Ok(data);
    }

    let mut decoder = GzipDecoder::new(&data[..]);
    decoder.multiple_members(true);

    let mut out = Vec::with_capacity(data.len() * 4);
    decoder.read_to_end(&mut out).await.map_err(|e| {
        SlError::Reader(ReaderError::Decompression(format!(
            "Failed to gunzip {}: {}",
            key, e
        )))
    })?;

    trace!(key = key, compressed = data.len(), size = out.len(), "Decompressed object");
    Ok(Bytes::from(out))
}
