//! Integration tests for table transformations and source records.

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, UInt8Array};
use arrow::record_batch::RecordBatch;
use geo::{LineString, MultiPolygon, Polygon};
use lcadata::cache::{write_table, Format};
use lcadata::sources::{generate_sources, make_uuid};
use lcadata::transform::{
    apply_dqi_to_field, apply_flow_mapping, assign_secondary_contexts, FieldMap, Indicator,
    SecondaryContext, StaticFlowMapping, StaticUrbanAreas,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn strings(batch: &RecordBatch, column: &str) -> Vec<String> {
    let array = batch
        .column_by_name(column)
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    array.iter().map(|v| v.unwrap_or_default().to_string()).collect()
}

fn inventory() -> RecordBatch {
    RecordBatch::try_from_iter(vec![
        (
            "Flowable",
            Arc::new(StringArray::from(vec!["Sulfur dioxide", "Lead", "Mystery"])) as ArrayRef,
        ),
        (
            "Context",
            Arc::new(StringArray::from(vec!["air", "air", "air"])) as ArrayRef,
        ),
        (
            "Unit",
            Arc::new(StringArray::from(vec!["lb", "lb", "lb"])) as ArrayRef,
        ),
        (
            "FlowAmount",
            Arc::new(Float64Array::from(vec![1000.0, 10.0, 1.0])) as ArrayRef,
        ),
        (
            "Latitude",
            Arc::new(Float64Array::from(vec![Some(40.5), Some(35.0), None])) as ArrayRef,
        ),
        (
            "Longitude",
            Arc::new(Float64Array::from(vec![Some(-74.5), Some(-100.0), None])) as ArrayRef,
        ),
        (
            "StackHeight",
            Arc::new(Float64Array::from(vec![Some(200.0), Some(3.0), None])) as ArrayRef,
        ),
    ])
    .unwrap()
}

#[test]
fn mapping_file_on_disk_drives_flow_mapping() {
    let temp = TempDir::new().unwrap();
    let mapping_path = temp.path().join("NEI.csv");
    fs::write(
        &mapping_path,
        "SourceListName,SourceFlowName,SourceFlowContext,SourceUnit,ConversionFactor,\
TargetFlowName,TargetFlowContext,TargetUnit,TargetFlowUUID\n\
NEI,Sulfur dioxide,air,lb,0.45359237,Sulfur dioxide,emission/air,kg,uuid-so2\n\
NEI,Lead,air,lb,0.45359237,Lead,emission/air,kg,uuid-pb\n",
    )
    .unwrap();
    let provider = StaticFlowMapping::from_file(&mapping_path).unwrap();

    let mapped = apply_flow_mapping(&inventory(), &provider, &["NEI"], &FieldMap::default(), false)
        .unwrap()
        .unwrap();

    assert_eq!(mapped.num_rows(), 2);
    assert_eq!(strings(&mapped, "Unit"), vec!["kg", "kg"]);
    assert_eq!(strings(&mapped, "FlowUUID"), vec!["uuid-so2", "uuid-pb"]);
    let amounts = mapped
        .column_by_name("FlowAmount")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!((amounts.value(0) - 453.59237).abs() < 1e-9);
}

#[test]
fn unknown_source_list_yields_none() {
    let provider = StaticFlowMapping::new(Vec::new());
    let result =
        apply_flow_mapping(&inventory(), &provider, &["TRI"], &FieldMap::default(), true).unwrap();
    assert!(result.is_none());
}

#[test]
fn contexts_and_scores_stack_on_one_table() {
    let ring = LineString::from(vec![
        (-75.0, 40.0),
        (-74.0, 40.0),
        (-74.0, 41.0),
        (-75.0, 41.0),
        (-75.0, 40.0),
    ]);
    let areas = StaticUrbanAreas::new()
        .with_year(2017, MultiPolygon::new(vec![Polygon::new(ring, vec![])]));

    let with_contexts = assign_secondary_contexts(
        &inventory(),
        2017,
        &[SecondaryContext::Urban, SecondaryContext::ReleaseHeight],
        &areas,
    )
    .unwrap();
    let scored = apply_dqi_to_field(
        &with_contexts,
        "StackHeight",
        Indicator::TemporalCorrelation,
        None,
    )
    .unwrap();

    assert_eq!(strings(&scored, "cmpt_urb"), vec!["urban", "rural", "unspecified"]);
    assert_eq!(strings(&scored, "cmpt_rh"), vec!["high", "ground", "unspecified"]);
    let scores = scored
        .column_by_name("TemporalCorrelation")
        .unwrap()
        .as_any()
        .downcast_ref::<UInt8Array>()
        .unwrap();
    assert_eq!(scores.value(1), 1);
    assert!(!scores.is_null(2));
    assert_eq!(scores.value(2), 5);
}

#[test]
fn transformed_tables_round_trip_through_parquet() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.parquet");
    let scored =
        apply_dqi_to_field(&inventory(), "FlowAmount", Indicator::DataCollection, None).unwrap();

    write_table(&scored, &path, Format::Parquet).unwrap();
    let back = lcadata::cache::read_table(&path).unwrap();

    let types = |b: &RecordBatch| -> Vec<_> {
        b.schema()
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect()
    };
    assert_eq!(types(&back), types(&scored));
    assert_eq!(back.num_rows(), 3);
}

#[test]
fn sources_from_a_bib_file() {
    let temp = TempDir::new().unwrap();
    let bib = temp.path().join("refs.bib");
    fs::write(
        &bib,
        "@misc{epa_nei_2017,\n  title = {2017 National Emissions Inventory},\n  \
         publisher = {U.S. EPA},\n  year = {2020},\n  url = {https://www.epa.gov/nei}\n}\n",
    )
    .unwrap();

    let sources = generate_sources(&bib, &[("epa_nei_2017", "NEI 2017")]).unwrap();

    assert_eq!(sources.len(), 1);
    assert_eq!(
        sources[0].description,
        "U.S. EPA, 2017 National Emissions Inventory, 2020"
    );
    assert_eq!(sources[0].id, make_uuid(&[&sources[0].description]));
}
