//! Data quality indicator scoring.
//!
//! Scores run from 1 (best) to 5 (worst). A raw value is scored by the first
//! breakpoint it does not exceed; values past the last breakpoint, missing
//! values and NaN get the fallback score.

use arrow::array::{Array, ArrayRef, UInt8Array};
use arrow::record_batch::RecordBatch;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::{float_column, with_column};
use crate::error::{LcaError, Result};

/// The five pedigree-matrix indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    DataReliability,
    TemporalCorrelation,
    GeographicalCorrelation,
    TechnologicalCorrelation,
    DataCollection,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::DataReliability,
        Indicator::TemporalCorrelation,
        Indicator::GeographicalCorrelation,
        Indicator::TechnologicalCorrelation,
        Indicator::DataCollection,
    ];

    /// Column name used for the indicator's scores.
    pub fn name(&self) -> &'static str {
        match self {
            Indicator::DataReliability => "DataReliability",
            Indicator::TemporalCorrelation => "TemporalCorrelation",
            Indicator::GeographicalCorrelation => "GeographicalCorrelation",
            Indicator::TechnologicalCorrelation => "TechnologicalCorrelation",
            Indicator::DataCollection => "DataCollection",
        }
    }

    /// Built-in bounds, if the indicator has any.
    pub fn default_bounds(&self) -> Option<DqiBounds> {
        match self {
            Indicator::TemporalCorrelation => Some(DqiBounds::temporal_correlation()),
            Indicator::DataCollection => Some(DqiBounds::data_collection()),
            _ => None,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Indicator {
    type Err = LcaError;

    fn from_str(s: &str) -> Result<Self> {
        Indicator::ALL
            .into_iter()
            .find(|i| i.name() == s)
            .ok_or_else(|| LcaError::ConfigValidationError {
                message: format!("unknown data quality indicator '{s}'"),
            })
    }
}

/// Ordered breakpoints mapping raw values to scores.
#[derive(Debug, Clone, PartialEq)]
pub struct DqiBounds {
    breakpoints: Vec<(f64, u8)>,
    fallback: u8,
}

impl DqiBounds {
    /// Breakpoints must be in ascending order.
    pub fn new(breakpoints: Vec<(f64, u8)>, fallback: u8) -> Self {
        Self {
            breakpoints,
            fallback,
        }
    }

    /// Age of the data in years.
    pub fn temporal_correlation() -> Self {
        Self::new(vec![(3.0, 1), (6.0, 2), (10.0, 3), (15.0, 4)], 5)
    }

    /// Share of sites covered.
    pub fn data_collection() -> Self {
        Self::new(vec![(0.4, 4), (0.6, 3), (0.8, 2), (1.0, 1)], 5)
    }

    /// Score a raw value.
    ///
    /// ```
    /// use lcadata::transform::DqiBounds;
    ///
    /// let bounds = DqiBounds::temporal_correlation();
    /// assert_eq!(bounds.score(Some(2.0)), 1);
    /// assert_eq!(bounds.score(Some(6.0)), 2);
    /// assert_eq!(bounds.score(Some(40.0)), 5);
    /// assert_eq!(bounds.score(None), 5);
    /// ```
    pub fn score(&self, raw: Option<f64>) -> u8 {
        let Some(raw) = raw.filter(|v| !v.is_nan()) else {
            return self.fallback;
        };
        self.breakpoints
            .iter()
            .find(|(bound, _)| raw <= *bound)
            .map_or(self.fallback, |(_, score)| *score)
    }
}

/// Score each value. With no bounds every score is `None`.
pub fn apply_dqi_to_values(
    values: &[Option<f64>],
    indicator: Indicator,
    bounds: Option<&DqiBounds>,
) -> Vec<Option<u8>> {
    let defaults = indicator.default_bounds();
    match bounds.or(defaults.as_ref()) {
        Some(bounds) => values.iter().map(|v| Some(bounds.score(*v))).collect(),
        None => vec![None; values.len()],
    }
}

/// Score `field` and store the result in a column named after `indicator`.
///
/// Non-numeric values in `field` are treated as missing.
pub fn apply_dqi_to_field(
    table: &RecordBatch,
    field: &str,
    indicator: Indicator,
    bounds: Option<&DqiBounds>,
) -> Result<RecordBatch> {
    let raw = float_column(table, field)?;
    let values: Vec<Option<f64>> = (0..raw.len())
        .map(|i| (!raw.is_null(i)).then(|| raw.value(i)))
        .collect();

    let scores = UInt8Array::from(apply_dqi_to_values(&values, indicator, bounds));
    with_column(table, indicator.name(), Arc::new(scores) as ArrayRef)
}
