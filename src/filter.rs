// src/filter.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, BooleanArray, Int64Array, StringArray},
    compute::{self, filter_record_batch, kernels::cmp::eq, kernels::numeric::add},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::columns::{
    int_column, string_column, ADMISSIONS_POLICY, KS3_PUPILS, KS4_PUPILS, PHASE_TYPE_GROUPING,
    ROLL, TIME_PERIOD,
};

/// Most recent `time_period` in the batch, ignoring nulls.
pub fn latest_time_period(batch: &RecordBatch) -> Result<Option<i64>> {
    Ok(compute::max(int_column(batch, TIME_PERIOD)?))
}

/// Keep rows from the latest time period whose phase grouping equals `phase`.
/// Returns the filtered rows together with the period used.
pub fn filter_latest_phase(batch: &RecordBatch, phase: &str) -> Result<(RecordBatch, Option<i64>)> {
    let Some(latest) = latest_time_period(batch)? else {
        debug!("no time_period values; nothing to keep");
        return Ok((batch.slice(0, 0), None));
    };

    let in_period = eq(int_column(batch, TIME_PERIOD)?, &Int64Array::new_scalar(latest))?;
    let in_phase = eq(
        string_column(batch, PHASE_TYPE_GROUPING)?,
        &StringArray::new_scalar(phase),
    )?;
    let mask = compute::and(&in_period, &in_phase)?;
    let out = filter_record_batch(batch, &mask).context("filtering latest period + phase")?;

    info!(latest, phase, rows = out.num_rows(), "kept latest period");
    Ok((out, Some(latest)))
}

/// Keep only rows where every column in `dimensions` equals `sentinel`.
///
/// The source table repeats the same pupils at several cross-tabulation levels (by sex,
/// establishment type, urban/rural, ...). Pinning every dimension but admissions policy to
/// its aggregate leaves one row per authority and policy. Null cells never match.
pub fn pin_dimensions(
    batch: &RecordBatch,
    dimensions: &[String],
    sentinel: &str,
) -> Result<RecordBatch> {
    if dimensions.iter().any(|d| d == ADMISSIONS_POLICY) {
        bail!("`{}` cannot be pinned", ADMISSIONS_POLICY);
    }

    let scalar = StringArray::new_scalar(sentinel);
    let mut mask = BooleanArray::from(vec![true; batch.num_rows()]);
    for dim in dimensions {
        let hit = eq(string_column(batch, dim)?, &scalar)
            .with_context(|| format!("comparing `{}` to `{}`", dim, sentinel))?;
        mask = compute::and(&mask, &hit)?;
    }

    let out = filter_record_batch(batch, &mask).context("pinning dimensions")?;
    info!(
        dimensions = dimensions.len(),
        before = batch.num_rows(),
        after = out.num_rows(),
        "pinned aggregate dimensions"
    );
    Ok(out)
}

/// Append `roll = KS3 + KS4`. A null in either count gives a null roll.
pub fn derive_roll(batch: &RecordBatch) -> Result<RecordBatch> {
    let ks3 = int_column(batch, KS3_PUPILS)?;
    let ks4 = int_column(batch, KS4_PUPILS)?;
    let roll: ArrayRef = add(ks3, ks4).context("adding KS3 and KS4 counts")?;

    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| (**f).clone()).collect();
    fields.push(Field::new(ROLL, DataType::Int64, true));
    let mut columns = batch.columns().to_vec();
    columns.push(roll);

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).map_err(Into::into)
}
