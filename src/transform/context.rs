//! Secondary compartments for facility-level releases.
//!
//! Release height is derived from a `StackHeight` column in feet; urban or
//! rural location from `Latitude`/`Longitude` against the census urban areas
//! of the data year.

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use geo::{Intersects, MultiPolygon, Point};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{float_column, with_column};
use crate::error::{LcaError, Result};

pub const FEET_PER_METER: f64 = 3.28;

pub const RELEASE_HEIGHT_COLUMN: &str = "cmpt_rh";
pub const URBAN_COLUMN: &str = "cmpt_urb";

const UNSPECIFIED: &str = "unspecified";

/// Release height label for a stack height in feet.
///
/// ```
/// use lcadata::transform::context::release_height_label;
///
/// assert_eq!(release_height_label(None), "unspecified");
/// assert_eq!(release_height_label(Some(10.0)), "ground");
/// assert_eq!(release_height_label(Some(500.0)), "very high");
/// ```
pub fn release_height_label(height_ft: Option<f64>) -> &'static str {
    match height_ft.filter(|h| !h.is_nan()) {
        None => UNSPECIFIED,
        Some(h) if h < 4.0 * FEET_PER_METER => "ground",
        Some(h) if h < 25.0 * FEET_PER_METER => "low",
        Some(h) if h < 150.0 * FEET_PER_METER => "high",
        Some(_) => "very high",
    }
}

/// Add a `cmpt_rh` column from `StackHeight`.
pub fn classify_height(table: &RecordBatch) -> Result<RecordBatch> {
    let heights = float_column(table, "StackHeight")?;
    let labels: StringArray = (0..heights.len())
        .map(|i| {
            let h = (!heights.is_null(i)).then(|| heights.value(i));
            Some(release_height_label(h))
        })
        .collect();
    with_column(table, RELEASE_HEIGHT_COLUMN, Arc::new(labels) as ArrayRef)
}

/// Supplies urban-area geometry (WGS84 lon/lat) per data year.
pub trait UrbanAreaProvider {
    /// Every urban area of `year` merged into one multipolygon.
    ///
    /// Fails with [`LcaError::GeometryUnavailable`] when the year is unknown.
    fn urban_areas(&self, year: u16) -> Result<MultiPolygon<f64>>;
}

/// Urban areas held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticUrbanAreas {
    years: HashMap<u16, MultiPolygon<f64>>,
}

impl StaticUrbanAreas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add areas for `year`, merging with any already present.
    pub fn insert(&mut self, year: u16, areas: MultiPolygon<f64>) {
        self.years
            .entry(year)
            .or_insert_with(|| MultiPolygon::new(Vec::new()))
            .0
            .extend(areas.0);
    }

    pub fn with_year(mut self, year: u16, areas: MultiPolygon<f64>) -> Self {
        self.insert(year, areas);
        self
    }
}

impl UrbanAreaProvider for StaticUrbanAreas {
    fn urban_areas(&self, year: u16) -> Result<MultiPolygon<f64>> {
        self.years
            .get(&year)
            .cloned()
            .ok_or(LcaError::GeometryUnavailable { year })
    }
}

/// Add a `cmpt_urb` column: `urban`, `rural`, or `unspecified` when either
/// coordinate is missing.
pub fn classify_urban(
    table: &RecordBatch,
    year: u16,
    provider: &dyn UrbanAreaProvider,
) -> Result<RecordBatch> {
    let areas = provider.urban_areas(year)?;
    let lat = float_column(table, "Latitude")?;
    let lon = float_column(table, "Longitude")?;

    let mut missing = 0;
    let labels: StringArray = (0..table.num_rows())
        .map(|i| {
            if lat.is_null(i) || lon.is_null(i) || lat.value(i).is_nan() || lon.value(i).is_nan() {
                missing += 1;
                return Some(UNSPECIFIED);
            }
            let point = Point::new(lon.value(i), lat.value(i));
            Some(if areas.intersects(&point) { "urban" } else { "rural" })
        })
        .collect();

    if missing > 0 {
        info!("Point data contains {} missing Latitude and/or Longitude values", missing);
    }
    with_column(table, URBAN_COLUMN, Arc::new(labels) as ArrayRef)
}

/// Secondary compartments that can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryContext {
    /// Urban or rural, from coordinates.
    Urban,
    /// Release height, from stack height.
    ReleaseHeight,
}

impl FromStr for SecondaryContext {
    type Err = LcaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "urb" => Ok(SecondaryContext::Urban),
            "rh" => Ok(SecondaryContext::ReleaseHeight),
            other => Err(LcaError::ConfigValidationError {
                message: format!("unknown secondary context '{other}' (expected urb or rh)"),
            }),
        }
    }
}

/// Assign each requested compartment, urban/rural first.
///
/// With nothing requested the table is returned unchanged.
pub fn assign_secondary_contexts(
    table: &RecordBatch,
    year: u16,
    contexts: &[SecondaryContext],
    provider: &dyn UrbanAreaProvider,
) -> Result<RecordBatch> {
    if contexts.is_empty() {
        warn!("No secondary contexts requested; expected one or more of urb, rh");
        return Ok(table.clone());
    }

    let mut out = table.clone();
    if contexts.contains(&SecondaryContext::Urban) {
        debug!("Assigning urban/rural compartments for {}", year);
        out = classify_urban(&out, year, provider)?;
    }
    if contexts.contains(&SecondaryContext::ReleaseHeight) {
        debug!("Assigning release height compartments");
        out = classify_height(&out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Float64Array;
    use geo::{LineString, Polygon};

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (x0, y0),
            (x0 + size, y0),
            (x0 + size, y0 + size),
            (x0, y0 + size),
            (x0, y0),
        ]);
        MultiPolygon::new(vec![Polygon::new(ring, vec![])])
    }

    fn facilities() -> RecordBatch {
        RecordBatch::try_from_iter(vec![
            (
                "Latitude",
                Arc::new(Float64Array::from(vec![Some(40.5), Some(10.0), None])) as ArrayRef,
            ),
            (
                "Longitude",
                Arc::new(Float64Array::from(vec![Some(-74.5), Some(10.0), Some(1.0)])) as ArrayRef,
            ),
            (
                "StackHeight",
                Arc::new(Float64Array::from(vec![Some(5.0), None, Some(100.0)])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    fn labels(table: &RecordBatch, column: &str) -> Vec<String> {
        table
            .column_by_name(column)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn height_thresholds_use_feet() {
        assert_eq!(release_height_label(Some(13.0)), "ground");
        assert_eq!(release_height_label(Some(13.2)), "low");
        assert_eq!(release_height_label(Some(81.9)), "low");
        assert_eq!(release_height_label(Some(82.0)), "high");
        assert_eq!(release_height_label(Some(492.0)), "very high");
        assert_eq!(release_height_label(Some(f64::NAN)), "unspecified");
    }

    #[test]
    fn classifies_height_column() {
        let out = classify_height(&facilities()).unwrap();
        assert_eq!(labels(&out, "cmpt_rh"), vec!["ground", "unspecified", "high"]);
    }

    #[test]
    fn classifies_urban_points() {
        let areas = StaticUrbanAreas::new().with_year(2017, square(-75.0, 40.0, 1.0));

        let out = classify_urban(&facilities(), 2017, &areas).unwrap();

        assert_eq!(labels(&out, "cmpt_urb"), vec!["urban", "rural", "unspecified"]);
    }

    #[test]
    fn unknown_year_is_geometry_unavailable() {
        let areas = StaticUrbanAreas::new();
        let err = classify_urban(&facilities(), 1999, &areas).unwrap_err();
        assert!(matches!(err, LcaError::GeometryUnavailable { year: 1999 }));
    }

    #[test]
    fn insert_merges_polygons_for_a_year() {
        let mut areas = StaticUrbanAreas::new();
        areas.insert(2010, square(0.0, 0.0, 1.0));
        areas.insert(2010, square(5.0, 5.0, 1.0));
        assert_eq!(areas.urban_areas(2010).unwrap().0.len(), 2);
    }

    #[test]
    fn assigns_requested_contexts() {
        let areas = StaticUrbanAreas::new().with_year(2017, square(-75.0, 40.0, 1.0));
        let contexts: Vec<SecondaryContext> =
            ["urb", "rh"].iter().map(|s| s.parse().unwrap()).collect();

        let out = assign_secondary_contexts(&facilities(), 2017, &contexts, &areas).unwrap();

        assert!(out.column_by_name("cmpt_urb").is_some());
        assert!(out.column_by_name("cmpt_rh").is_some());
    }

    #[test]
    fn nothing_requested_returns_input() {
        let areas = StaticUrbanAreas::new();
        let out = assign_secondary_contexts(&facilities(), 2017, &[], &areas).unwrap();
        assert_eq!(out.num_columns(), 3);
    }

    #[test]
    fn unknown_context_code_is_rejected() {
        assert!("pop".parse::<SecondaryContext>().is_err());
    }
}
