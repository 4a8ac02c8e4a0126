//! JSON and NDJSON decoding for silverline.
//!
//! Raw objects go through three steps:
//! 1. [`maybe_decompress`] - gunzip when the key or the magic bytes say gzip
//! 2. [`detect_format`] - declared format, then key extension, then sniffing
//! 3. [`decode`] - one [`RawRecord`] per JSON value
//!
//! [`read_records`] runs all three.

mod decode;
mod decompress;
mod format;

pub use decode::{decode, RawRecord};
pub use decompress::{is_gzip, maybe_decompress};
pub use format::detect_format;

use bytes::Bytes;
use sl_error::Result;
use sl_types::RecordFormat;

/// Decompresses, detects the format of and decodes one object.
pub async fn read_records(
    key: &str,
    declared: Option<RecordFormat>,
    data: Bytes,
) -> Result<Vec<RawRecord>> {
    let data = maybe_decompress(key, data).await?;
    let format = detect_format(key, declared, &data);
    decode(&data, format)
}
