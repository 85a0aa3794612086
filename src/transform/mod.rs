//! Table transformations applied to loaded inventories.
//!
//! - [`mapping`]: rename and convert flows with a flow-mapping table
//! - [`dqi`]: derive data quality indicator scores from raw values
//! - [`context`]: assign release-height and urban/rural compartments
//! - [`location`]: state location codes and published geographies

pub mod context;
pub mod dqi;
pub mod location;
pub mod mapping;

pub use context::{
    assign_secondary_contexts, classify_height, classify_urban, SecondaryContext,
    StaticUrbanAreas, UrbanAreaProvider,
};
pub use dqi::{apply_dqi_to_field, apply_dqi_to_values, DqiBounds, Indicator};
pub use location::{
    assign_state_names, extract_coordinates, read_iso_3166, LocationFeature, LocationGroup,
};
pub use mapping::{
    apply_flow_mapping, FieldMap, FlowMapping, FlowMappingProvider, StaticFlowMapping,
};

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, FieldRef, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::error::{LcaError, Result};

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| LcaError::MissingColumn {
            column: name.to_string(),
        })
}

fn invalid(name: &str, err: impl std::fmt::Display) -> LcaError {
    LcaError::InvalidColumn {
        column: name.to_string(),
        message: err.to_string(),
    }
}

/// A column as UTF-8 text, casting other types.
pub(crate) fn string_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let array = cast(column(batch, name)?, &DataType::Utf8).map_err(|e| invalid(name, e))?;
    Ok(array.as_string::<i32>().clone())
}

/// A column as `f64`. Values that cannot be converted become null.
pub(crate) fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = cast(column(batch, name)?, &DataType::Float64).map_err(|e| invalid(name, e))?;
    Ok(array.as_primitive::<Float64Type>().clone())
}

/// Replace the column called `name`, or append it when absent.
pub(crate) fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    let field = Arc::new(Field::new(name, array.data_type().clone(), true));

    match schema.index_of(name) {
        Ok(i) => {
            fields[i] = field;
            columns[i] = array;
        }
        Err(_) => {
            fields.push(field);
            columns.push(array);
        }
    }

    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    RecordBatch::try_new(Arc::new(schema), columns).map_err(|e| invalid(name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;

    fn batch() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            ("Year", Arc::new(Int64Array::from(vec![2017, 2018])) as ArrayRef),
            ("Note", Arc::new(StringArray::from(vec!["1.5", "n/a"])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn string_column_casts_numbers() {
        let years = string_column(&batch(), "Year").unwrap();
        assert_eq!(years.value(0), "2017");
    }

    #[test]
    fn float_column_nulls_unparseable_text() {
        let notes = float_column(&batch(), "Note").unwrap();
        assert_eq!(notes.value(0), 1.5);
        assert!(notes.is_null(1));
    }

    #[test]
    fn missing_column_is_reported() {
        let err = float_column(&batch(), "Nope").unwrap_err();
        assert!(matches!(err, LcaError::MissingColumn { column } if column == "Nope"));
    }

    #[test]
    fn with_column_replaces_then_appends() {
        let replaced = with_column(
            &batch(),
            "Year",
            Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef,
        )
        .unwrap();
        assert_eq!(replaced.num_columns(), 2);
        assert_eq!(replaced.schema().field(0).data_type(), &DataType::Utf8);

        let appended = with_column(
            &replaced,
            "Extra",
            Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
        )
        .unwrap();
        assert_eq!(appended.num_columns(), 3);
        assert_eq!(appended.schema().field(2).name(), "Extra");
    }
}
