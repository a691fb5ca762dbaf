//! Region seed parsing.
//!
//! Seeds arrive as an operator-supplied environment value: a whitespace
//! separated list of entries, each entry a pipe-delimited record
//!
//! ```text
//! name|base64(secret)|ip,ip,...|lat,lon;lat,lon;...
//! ```
//!
//! The IP allow-list and geo sections are optional; the name and secret are
//! not. Parsing is strict about anything that would poison the registry (bad
//! base64, non-numeric coordinates) and lenient about trailing empties.

use base64::{Engine, engine::general_purpose::STANDARD};
use relaymesh_storage::{GeoPoint, Zeroizing};

use crate::error::{RegistryError, RegistryResult};

/// One parsed region seed entry.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionSeed {
    /// Region name, the registry key.
    pub name: String,
    /// Decoded symmetric signing secret.
    pub secret: Zeroizing<Vec<u8>>,
    /// Allowed client network prefixes; `None` when the section was absent.
    pub ip_filter: Option<Vec<String>>,
    /// Parsed service-area points; empty when the section was absent.
    pub geo_positions: Vec<GeoPoint>,
}

impl RegionSeed {
    /// Parses a single pipe-delimited seed entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSeed`] when the name is empty, the
    /// secret is missing or not valid base64, or a geo coordinate is not a
    /// number.
    pub fn parse(entry: &str) -> RegistryResult<Self> {
        let mut parts = entry.split('|');

        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(RegistryError::invalid_seed(entry, "empty region name"));
        }

        let secret_b64 = parts
            .next()
            .filter(|part| !part.is_empty())
            .ok_or_else(|| RegistryError::invalid_seed(entry, "missing secret"))?;
        let secret = STANDARD
            .decode(secret_b64)
            .map_err(|_| RegistryError::invalid_seed(name, "invalid base64 secret"))?;

        let ip_filter = parts.next().filter(|part| !part.is_empty()).map(|part| {
            part.split(',')
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_owned)
                .collect()
        });

        let geo_positions = match parts.next().filter(|part| !part.is_empty()) {
            Some(part) => parse_geo(name, part)?,
            None => Vec::new(),
        };

        Ok(Self { name: name.to_owned(), secret: Zeroizing::new(secret), ip_filter, geo_positions })
    }
}

fn parse_geo(name: &str, section: &str) -> RegistryResult<Vec<GeoPoint>> {
    let mut points = Vec::new();
    for pair in section.split(';').filter(|pair| !pair.is_empty()) {
        let mut coords = pair.split(',');
        let (Some(lat), Some(lon)) = (coords.next(), coords.next()) else {
            // Incomplete pair, skip it rather than reject the region.
            continue;
        };
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| RegistryError::invalid_seed(name, format!("bad latitude {lat:?}")))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| RegistryError::invalid_seed(name, format!("bad longitude {lon:?}")))?;
        points.push(GeoPoint::new(lat, lon));
    }
    Ok(points)
}

/// Parses a whitespace-separated list of seed entries.
///
/// # Errors
///
/// Fails on the first malformed entry; a bad operator value should stop the
/// process at startup rather than run with a partial region set.
pub fn parse_seed_list(value: &str) -> RegistryResult<Vec<RegionSeed>> {
    value.split_whitespace().map(RegionSeed::parse).collect()
}
