// src/columns.rs

use anyhow::{anyhow, Result};
use arrow::{
    array::{Int64Array, StringArray},
    record_batch::RecordBatch,
};

pub const TIME_PERIOD: &str = "time_period";
pub const LA_NAME: &str = "la_name";
pub const SEX_OF_SCHOOL: &str = "sex_of_school_description";
pub const PHASE_TYPE_GROUPING: &str = "phase_type_grouping";
pub const TYPE_OF_ESTABLISHMENT: &str = "type_of_establishment";
pub const DENOMINATION: &str = "denomination";
pub const ADMISSIONS_POLICY: &str = "admissions_policy";
pub const URBAN_RURAL: &str = "urban_rural";
pub const ACADEMY_FLAG: &str = "academy_flag";
pub const KS3_PUPILS: &str = "number_of_key_stage_3_pupils_years_7_to_9";
pub const KS4_PUPILS: &str = "number_of_key_stage_4_pupils_years_10_and_11";
pub const ROLL: &str = "roll";

/// The only columns read from the source file.
pub const WHITELIST: [&str; 11] = [
    TIME_PERIOD,
    LA_NAME,
    SEX_OF_SCHOOL,
    PHASE_TYPE_GROUPING,
    TYPE_OF_ESTABLISHMENT,
    DENOMINATION,
    ADMISSIONS_POLICY,
    URBAN_RURAL,
    ACADEMY_FLAG,
    KS3_PUPILS,
    KS4_PUPILS,
];

/// Columns coerced to Int64 after loading. Everything else stays Utf8.
pub const NUMERIC: [&str; 3] = [TIME_PERIOD, KS3_PUPILS, KS4_PUPILS];

/// Borrow a Utf8 column by name.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("column `{}` not present", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column `{}` is not Utf8", name))
}

/// Borrow an Int64 column by name.
pub fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("column `{}` not present", name))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| anyhow!("column `{}` is not Int64", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::{
        array::ArrayRef,
        datatypes::{DataType, Field, Schema},
    };
    use std::sync::Arc;

    #[test]
    fn typed_accessors_check_name_and_type() -> Result<()> {
        let schema = Schema::new(vec![
            Field::new(LA_NAME, DataType::Utf8, true),
            Field::new(ROLL, DataType::Int64, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["Kent"])) as ArrayRef,
                Arc::new(Int64Array::from(vec![42])) as ArrayRef,
            ],
        )?;

        assert_eq!(string_column(&batch, LA_NAME)?.value(0), "Kent");
        assert_eq!(int_column(&batch, ROLL)?.value(0), 42);
        assert!(int_column(&batch, LA_NAME).is_err());
        assert!(string_column(&batch, DENOMINATION).is_err());
        Ok(())
    }
}
