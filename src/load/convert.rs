use anyhow::Result;
use arrow::{
    array::{Array, ArrayRef, Int64Builder, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Parse a published count. Suppression markers (`z`, `x`, `c`, `:`) and anything else
/// non-numeric come back as `None`; whole-number floats such as `"120.0"` are accepted.
pub fn parse_count(raw: &str) -> Option<i64> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

/// Rebuild `batch` with every column named in `numeric` converted from Utf8 to Int64.
/// Other columns keep their values with cleaned text.
pub fn coerce_columns(batch: &RecordBatch, numeric: &[&str]) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut out = Vec::with_capacity(batch.num_columns());

    for (arr, fld) in batch.columns().iter().zip(batch.schema().fields()) {
        let Some(sarr) = arr.as_any().downcast_ref::<StringArray>() else {
            fields.push((**fld).clone());
            out.push(arr.clone());
            continue;
        };

        if numeric.contains(&fld.name().as_str()) {
            let mut b = Int64Builder::with_capacity(sarr.len());
            for opt in sarr.iter() {
                b.append_option(opt.and_then(parse_count));
            }
            fields.push(Field::new(fld.name(), DataType::Int64, true));
            out.push(Arc::new(b.finish()) as ArrayRef);
        } else {
            let cleaned: StringArray = sarr.iter().map(|opt| opt.map(clean_str)).collect();
            fields.push(Field::new(fld.name(), DataType::Utf8, true));
            out.push(Arc::new(cleaned) as ArrayRef);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), out).map_err(Into::into)
}
