// src/load/mod.rs

pub mod convert;

use anyhow::{bail, Context, Result};
use arrow::{
    compute::concat_batches,
    csv::ReaderBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{fs::File, path::Path, sync::Arc};
use tracing::{debug, info};

use crate::columns::{NUMERIC, WHITELIST};
use convert::{clean_str, coerce_columns};

const BATCH_SIZE: usize = 64 * 1024;

/// Load the school characteristics CSV, keeping only the whitelisted columns.
///
/// The header is read first so missing columns are reported by name. Every column is
/// read as text and the count columns are then coerced to Int64 (see [`convert`]), since
/// the publisher mixes numbers with suppression markers.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_school_csv<P: AsRef<Path>>(path: P) -> Result<RecordBatch> {
    let path = path.as_ref();

    // 1) Resolve the whitelist against the header
    let headers = read_headers(path)?;
    let projection = project_whitelist(&headers)?;
    debug!(columns = headers.len(), "header read");

    // 2) Read only the projected columns, all as text
    let fields: Vec<Field> = headers
        .iter()
        .map(|h| Field::new(h, DataType::Utf8, true))
        .collect();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .with_projection(projection)
        .build(file)
        .with_context(|| format!("Failed to build CSV reader for {}", path.display()))?;

    let schema = reader.schema();
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("CSV parse error in {}", path.display()))?;
    let raw = concat_batches(&schema, &batches).context("concatenating CSV batches")?;

    // 3) Counts and time period to Int64
    let batch = coerce_columns(&raw, &NUMERIC)?;
    info!(rows = batch.num_rows(), "loaded school characteristics");
    Ok(batch)
}

fn read_headers(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    Ok(headers.iter().map(|h| clean_str(h).to_string()).collect())
}

/// Indices of the whitelisted columns, in whitelist order.
fn project_whitelist(headers: &[String]) -> Result<Vec<usize>> {
    let mut projection = Vec::with_capacity(WHITELIST.len());
    let mut missing = Vec::new();
    for name in WHITELIST {
        match headers.iter().position(|h| h == name) {
            Some(idx) => projection.push(idx),
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        bail!("input is missing required columns: {}", missing.join(", "));
    }
    Ok(projection)
}
