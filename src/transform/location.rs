//! Location codes and geography.
//!
//! Inventories key US states by five-digit FIPS codes; LCA databases expect
//! `US-XX` location codes. Geometries for states and countries come from the
//! published ecoinvent geography files, keyed by their `shortname`.

use arrow::array::{ArrayRef, StringArray};
use arrow::compute::{filter_record_batch, is_not_null};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use bzip2::read::BzDecoder;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{string_column, with_column};
use crate::cache::{parse_csv, read_table};
use crate::error::{LcaError, Result};
use crate::remote::HttpFetcher;

/// Where the geography files are published.
pub const GEOGRAPHY_ROOT: &str = "https://geography.ecoinvent.org/files/";

/// openLCA reference location table.
pub const OLCA_LOCATIONS_URL: &str =
    "https://raw.githubusercontent.com/GreenDelta/data/master/refdata/locations.csv";

pub const LOCATION_COLUMN: &str = "Location";

/// National total in FIPS form.
const NATIONAL_FIPS: &str = "00000";

/// State FIPS prefixes and postal abbreviations.
const STATE_FIPS: [(&str, &str); 51] = [
    ("01", "AL"),
    ("02", "AK"),
    ("04", "AZ"),
    ("05", "AR"),
    ("06", "CA"),
    ("08", "CO"),
    ("09", "CT"),
    ("10", "DE"),
    ("11", "DC"),
    ("12", "FL"),
    ("13", "GA"),
    ("15", "HI"),
    ("16", "ID"),
    ("17", "IL"),
    ("18", "IN"),
    ("19", "IA"),
    ("20", "KS"),
    ("21", "KY"),
    ("22", "LA"),
    ("23", "ME"),
    ("24", "MD"),
    ("25", "MA"),
    ("26", "MI"),
    ("27", "MN"),
    ("28", "MS"),
    ("29", "MO"),
    ("30", "MT"),
    ("31", "NE"),
    ("32", "NV"),
    ("33", "NH"),
    ("34", "NJ"),
    ("35", "NM"),
    ("36", "NY"),
    ("37", "NC"),
    ("38", "ND"),
    ("39", "OH"),
    ("40", "OK"),
    ("41", "OR"),
    ("42", "PA"),
    ("44", "RI"),
    ("45", "SC"),
    ("46", "SD"),
    ("47", "TN"),
    ("48", "TX"),
    ("49", "UT"),
    ("50", "VT"),
    ("51", "VA"),
    ("53", "WA"),
    ("54", "WV"),
    ("55", "WI"),
    ("56", "WY"),
];

/// Location code for a state-level FIPS code.
///
/// `00000` is the national total. County codes and anything else yield
/// `None`.
///
/// ```
/// use lcadata::transform::location::state_location;
///
/// assert_eq!(state_location("06000").as_deref(), Some("US-CA"));
/// assert_eq!(state_location("00000").as_deref(), Some("US"));
/// assert_eq!(state_location("06037"), None);
/// ```
pub fn state_location(fips: &str) -> Option<String> {
    if fips == NATIONAL_FIPS {
        return Some("US".to_string());
    }
    let state = fips.strip_suffix("000").filter(|s| s.len() == 2)?;
    STATE_FIPS
        .iter()
        .find(|(code, _)| *code == state)
        .map(|(_, abbrev)| format!("US-{abbrev}"))
}

/// Replace state FIPS codes in the `Location` column with `US-XX` codes.
///
/// Other values pass through unchanged. Rows without a location are
/// dropped.
pub fn assign_state_names(table: &RecordBatch) -> Result<RecordBatch> {
    let locations = string_column(table, LOCATION_COLUMN)?;
    let renamed: StringArray = locations
        .iter()
        .map(|value| value.map(|v| state_location(v).unwrap_or_else(|| v.to_string())))
        .collect();

    let mask = is_not_null(&renamed).map_err(anyhow::Error::from)?;
    let table = with_column(table, LOCATION_COLUMN, Arc::new(renamed) as ArrayRef)?;
    let kept = filter_record_batch(&table, &mask).map_err(anyhow::Error::from)?;
    debug!(
        "Assigned state names; dropped {} rows without a location",
        table.num_rows() - kept.num_rows()
    );
    Ok(kept)
}

/// Published geography collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationGroup {
    /// US states and other first-level subdivisions.
    States,
    /// Countries.
    Countries,
}

impl LocationGroup {
    pub fn file_name(&self) -> &'static str {
        match self {
            LocationGroup::States => "states.geojson.bz2",
            LocationGroup::Countries => "countries.geojson.bz2",
        }
    }
}

/// One GeoJSON feature, split into geometry and properties.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFeature {
    pub geometry: Value,
    pub properties: Map<String, Value>,
}

/// Download a geography collection and key its features by `shortname`.
///
/// The state collection is narrowed to US locations.
pub fn extract_coordinates(
    fetcher: &HttpFetcher,
    base_url: &str,
    group: LocationGroup,
) -> Result<BTreeMap<String, LocationFeature>> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), group.file_name());
    info!("Downloading {}", url);
    let bytes = fetcher.get_bytes(&url)?;
    parse_geography(&bytes, group, Path::new(&url))
}

/// Key the features of a GeoJSON collection by `shortname`.
///
/// Accepts bzip2-compressed or plain JSON. Features without a `shortname`
/// are skipped.
pub fn parse_geography(
    bytes: &[u8],
    group: LocationGroup,
    origin: &Path,
) -> Result<BTreeMap<String, LocationFeature>> {
    let text = decompress(bytes).map_err(|e| geography_error(origin, e))?;
    let collection: Value =
        serde_json::from_slice(&text).map_err(|e| geography_error(origin, e))?;
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| geography_error(origin, "not a FeatureCollection"))?;

    let mut locations = BTreeMap::new();
    for feature in features {
        let properties = feature
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let Some(shortname) = properties.get("shortname").and_then(Value::as_str) else {
            continue;
        };
        if group == LocationGroup::States && !shortname.starts_with("US") {
            continue;
        }
        let shortname = shortname.to_string();
        let geometry = feature.get("geometry").cloned().unwrap_or(Value::Null);
        locations.insert(shortname, LocationFeature { geometry, properties });
    }
    debug!("{} locations in {}", locations.len(), origin.display());
    Ok(locations)
}

fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    if !bytes.starts_with(b"BZh") {
        return Ok(bytes.to_vec());
    }
    let mut out = Vec::new();
    BzDecoder::new(bytes).read_to_end(&mut out)?;
    Ok(out)
}

fn geography_error(origin: &Path, err: impl std::fmt::Display) -> LcaError {
    LcaError::Deserialization {
        path: origin.to_path_buf(),
        message: err.to_string(),
    }
}

/// Download the openLCA reference location table.
pub fn olca_location_meta(fetcher: &HttpFetcher, url: &str) -> Result<RecordBatch> {
    let bytes = fetcher.get_bytes(url)?;
    parse_csv(&bytes, Path::new(url))
}

/// Read an ISO 3166 country code export.
///
/// The ISO browsing platform's column names are shortened to `Name`,
/// `ISO-2d` and `ISO-3d`; other columns are kept.
pub fn read_iso_3166(path: &Path) -> Result<RecordBatch> {
    let table = read_table(path)?;
    let schema = table.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| {
            let name = match f.name().as_str() {
                "English short name" => "Name",
                "Alpha-2 code" => "ISO-2d",
                "Alpha-3 code" => "ISO-3d",
                other => other,
            };
            f.as_ref().clone().with_name(name)
        })
        .collect();
    let schema = Schema::new_with_metadata(fields, schema.metadata().clone());
    Ok(table.with_schema(Arc::new(schema)).map_err(anyhow::Error::from)?)
}
