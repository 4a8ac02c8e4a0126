use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow_json::ReaderBuilder;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use serde_json::{Map, Value};
use sl_error::{FlushError, Result, SlError};

/// Converts normalized rows to one Arrow batch of `schema`.
pub fn to_record_batch(schema: &SchemaRef, rows: &[Map<String, Value>]) -> Result<RecordBatch> {
    let arrow_err = |e: arrow::error::ArrowError| SlError::Flush(FlushError::Arrow(e.to_string()));

    let mut decoder = ReaderBuilder::new(schema.clone())
        .with_batch_size(rows.len().max(1))
        .build_decoder()
        .map_err(arrow_err)?;

    decoder.serialize(rows).map_err(arrow_err)?;

    Ok(decoder
        .flush()
        .map_err(arrow_err)?
        .unwrap_or_else(|| RecordBatch::new_empty(schema.clone())))
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(concat!("silverline ", env!("CARGO_PKG_VERSION")).to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Encodes one batch as a Snappy-compressed Parquet file.
pub fn encode_parquet(batch: &RecordBatch) -> Result<Bytes> {
    let encode_err = |stage: &str, e: parquet::errors::ParquetError| {
        SlError::Flush(FlushError::Encode(format!("parquet {} failed: {}", stage, e)))
    };

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(writer_properties()))
        .map_err(|e| encode_err("writer init", e))?;
    writer.write(batch).map_err(|e| encode_err("write", e))?;
    writer.close().map_err(|e| encode_err("close", e))?;

    Ok(Bytes::from(buf))
}
