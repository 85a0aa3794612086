//! Flow mapping.
//!
//! A flow-mapping table translates source flows (name, context, unit) into
//! target flows of a reference list, with a conversion factor for the
//! amount. [`apply_flow_mapping`] joins an inventory against such a table.

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{float_column, string_column, with_column};
use crate::cache::read_table;
use crate::error::{LcaError, Result};

/// One row of a flow-mapping table.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowMapping {
    pub source_list: String,
    pub source_flow_name: String,
    pub source_flow_context: String,
    pub source_unit: String,
    /// Multiplier for the amount; `None` means 1.
    pub conversion_factor: Option<f64>,
    pub target_flow_name: String,
    pub target_flow_context: String,
    pub target_unit: String,
    pub target_flow_uuid: String,
}

/// Supplies mapping rows for the requested source lists.
pub trait FlowMappingProvider {
    /// Mapping rows whose source list is one of `sources`; all rows when
    /// `sources` is empty.
    fn flow_mapping(&self, sources: &[&str]) -> Result<Vec<FlowMapping>>;
}

/// A mapping table held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFlowMapping {
    rows: Vec<FlowMapping>,
}

impl StaticFlowMapping {
    pub fn new(rows: Vec<FlowMapping>) -> Self {
        Self { rows }
    }

    /// Build from a table with the usual mapping-file columns
    /// (`SourceListName`, `SourceFlowName`, `SourceFlowContext`,
    /// `SourceUnit`, `ConversionFactor`, `TargetFlowName`,
    /// `TargetFlowContext`, `TargetUnit`, `TargetFlowUUID`).
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let list = string_column(batch, "SourceListName")?;
        let name = string_column(batch, "SourceFlowName")?;
        let context = string_column(batch, "SourceFlowContext")?;
        let unit = string_column(batch, "SourceUnit")?;
        let factor = float_column(batch, "ConversionFactor")?;
        let target_name = string_column(batch, "TargetFlowName")?;
        let target_context = string_column(batch, "TargetFlowContext")?;
        let target_unit = string_column(batch, "TargetUnit")?;
        let target_uuid = string_column(batch, "TargetFlowUUID")?;

        let text = |a: &StringArray, i: usize| {
            if a.is_null(i) {
                String::new()
            } else {
                a.value(i).to_string()
            }
        };

        let rows = (0..batch.num_rows())
            .map(|i| FlowMapping {
                source_list: text(&list, i),
                source_flow_name: text(&name, i),
                source_flow_context: text(&context, i),
                source_unit: text(&unit, i),
                conversion_factor: (!factor.is_null(i)).then(|| factor.value(i)),
                target_flow_name: text(&target_name, i),
                target_flow_context: text(&target_context, i),
                target_unit: text(&target_unit, i),
                target_flow_uuid: text(&target_uuid, i),
            })
            .collect();
        Ok(Self { rows })
    }

    /// Load a mapping file (parquet or csv).
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_batch(&read_table(path)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FlowMappingProvider for StaticFlowMapping {
    fn flow_mapping(&self, sources: &[&str]) -> Result<Vec<FlowMapping>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| sources.is_empty() || sources.contains(&r.source_list.as_str()))
            .cloned()
            .collect())
    }
}

/// Column names in the table being mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub flowable_name: String,
    pub flowable_unit: String,
    pub flowable_context: String,
    pub flowable_quantity: String,
    pub uuid: String,
    /// When set, rows only match mapping rows of the same source list.
    pub source_list: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            flowable_name: "Flowable".into(),
            flowable_unit: "Unit".into(),
            flowable_context: "Context".into(),
            flowable_quantity: "FlowAmount".into(),
            uuid: "FlowUUID".into(),
            source_list: None,
        }
    }
}

type MatchKey<'a> = (&'a str, &'a str, &'a str, Option<&'a str>);

/// Map `table`'s flows onto a reference list.
///
/// Rows join the mapping on name, context and unit (and source list when
/// the field map names one). Matched rows take the target name, context,
/// unit and UUID, and their quantity is multiplied by the conversion
/// factor. A row matching several mapping rows is repeated once per match.
/// Unmatched rows are dropped unless `keep_unmapped` is set, in which case
/// they pass through unchanged.
///
/// Returns `None` when the provider has no mapping for `sources`.
pub fn apply_flow_mapping(
    table: &RecordBatch,
    provider: &dyn FlowMappingProvider,
    sources: &[&str],
    fields: &FieldMap,
    keep_unmapped: bool,
) -> Result<Option<RecordBatch>> {
    let mapping = provider.flow_mapping(sources)?;
    if mapping.is_empty() {
        info!("No flow mapping found for {:?}", sources);
        return Ok(None);
    }

    let mut by_key: HashMap<MatchKey<'_>, Vec<usize>> = HashMap::new();
    for (i, m) in mapping.iter().enumerate() {
        let list = fields.source_list.as_ref().map(|_| m.source_list.as_str());
        by_key
            .entry((
                m.source_flow_name.as_str(),
                m.source_flow_context.as_str(),
                m.source_unit.as_str(),
                list,
            ))
            .or_default()
            .push(i);
    }

    let names = string_column(table, &fields.flowable_name)?;
    let contexts = string_column(table, &fields.flowable_context)?;
    let units = string_column(table, &fields.flowable_unit)?;
    let lists = match &fields.source_list {
        Some(column) => Some(string_column(table, column)?),
        None => None,
    };
    // Fail before doing any work when the quantity column is unusable.
    float_column(table, &fields.flowable_quantity)?;

    let mut rows: Vec<u32> = Vec::new();
    let mut matched: Vec<Option<&FlowMapping>> = Vec::new();
    for i in 0..table.num_rows() {
        let hits = row_key(&names, &contexts, &units, lists.as_ref(), i)
            .and_then(|key| by_key.get(&key));
        match hits {
            Some(hits) => {
                for &m in hits {
                    rows.push(i as u32);
                    matched.push(Some(&mapping[m]));
                }
            }
            None if keep_unmapped => {
                rows.push(i as u32);
                matched.push(None);
            }
            None => {}
        }
    }
    debug!(
        "{} of {} rows mapped",
        matched.iter().filter(|m| m.is_some()).count(),
        table.num_rows()
    );

    let indices = UInt32Array::from(rows);
    let joined = take_record_batch(table, &indices).map_err(|e| LcaError::InvalidColumn {
        column: fields.flowable_name.clone(),
        message: e.to_string(),
    })?;

    let mut out = replace_text(&joined, &fields.flowable_name, &matched, |m| {
        m.target_flow_name.as_str()
    })?;
    out = replace_text(&out, &fields.flowable_context, &matched, |m| {
        m.target_flow_context.as_str()
    })?;
    out = replace_text(&out, &fields.flowable_unit, &matched, |m| m.target_unit.as_str())?;

    let quantity = float_column(&out, &fields.flowable_quantity)?;
    let scaled: Float64Array = matched
        .iter()
        .enumerate()
        .map(|(i, m)| {
            if quantity.is_null(i) {
                return None;
            }
            let factor = m.and_then(|m| m.conversion_factor).unwrap_or(1.0);
            Some(quantity.value(i) * factor)
        })
        .collect();
    out = with_column(&out, &fields.flowable_quantity, Arc::new(scaled) as ArrayRef)?;

    if out.schema().index_of(&fields.uuid).is_ok() {
        out = replace_text(&out, &fields.uuid, &matched, |m| m.target_flow_uuid.as_str())?;
    } else {
        let uuids: StringArray = matched
            .iter()
            .map(|m| m.map(|m| m.target_flow_uuid.as_str()))
            .collect();
        out = with_column(&out, &fields.uuid, Arc::new(uuids) as ArrayRef)?;
    }

    Ok(Some(out))
}

/// Overwrite `column` with the mapped value on matched rows.
fn replace_text(
    batch: &RecordBatch,
    column: &str,
    matched: &[Option<&FlowMapping>],
    pick: impl Fn(&FlowMapping) -> &str,
) -> Result<RecordBatch> {
    let current = string_column(batch, column)?;
    let values: StringArray = matched
        .iter()
        .enumerate()
        .map(|(i, m)| match m {
            Some(m) => Some(pick(m)),
            None if current.is_null(i) => None,
            None => Some(current.value(i)),
        })
        .collect();
    with_column(batch, column, Arc::new(values) as ArrayRef)
}

fn row_key<'a>(
    names: &'a StringArray,
    contexts: &'a StringArray,
    units: &'a StringArray,
    lists: Option<&'a StringArray>,
    i: usize,
) -> Option<MatchKey<'a>> {
    if names.is_null(i) || contexts.is_null(i) || units.is_null(i) {
        return None;
    }
    let list = match lists {
        Some(lists) if lists.is_null(i) => return None,
        Some(lists) => Some(lists.value(i)),
        None => None,
    };
    Some((names.value(i), contexts.value(i), units.value(i), list))
}
