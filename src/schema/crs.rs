//! Minimal EPSG coordinate reference system lookup.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsKind {
    Geographic,
    Projected,
}

/// Order of the two ordinates in stored coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    LonLat,
    LatLon,
    EastNorth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateReferenceSystem {
    pub srid: u32,
    pub name: &'static str,
    pub kind: CrsKind,
    pub axis_order: AxisOrder,
}

impl CoordinateReferenceSystem {
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.srid)
    }

    pub fn is_longitude_first(&self) -> bool {
        self.axis_order == AxisOrder::LonLat
    }
}

impl fmt::Display for CoordinateReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.identifier(), self.name)
    }
}

const KNOWN_SYSTEMS: &[(u32, &str, CrsKind)] = &[
    (4326, "WGS 84", CrsKind::Geographic),
    (4258, "ETRS89", CrsKind::Geographic),
    (3857, "WGS 84 / Pseudo-Mercator", CrsKind::Projected),
];

fn epsg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?i:epsg):(\d+)$").unwrap())
}

/// Resolves an `EPSG:<code>` identifier.
///
/// `longitude_first` only affects geographic systems; projected systems are
/// always easting/northing.
pub fn decode_crs(code: &str, longitude_first: bool) -> Result<CoordinateReferenceSystem, SchemaError> {
    let captures = epsg_pattern()
        .captures(code.trim())
        .ok_or_else(|| SchemaError::InvalidCrs(code.to_string()))?;
    let srid: u32 = captures[1]
        .parse()
        .map_err(|_| SchemaError::InvalidCrs(code.to_string()))?;

    let (_, name, kind) = KNOWN_SYSTEMS
        .iter()
        .find(|(known, _, _)| *known == srid)
        .ok_or_else(|| SchemaError::UnknownCrs(code.to_string()))?;

    let axis_order = match (kind, longitude_first) {
        (CrsKind::Projected, _) => AxisOrder::EastNorth,
        (CrsKind::Geographic, true) => AxisOrder::LonLat,
        (CrsKind::Geographic, false) => AxisOrder::LatLon,
    };

    Ok(CoordinateReferenceSystem {
        srid,
        name,
        kind: *kind,
        axis_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_longitude_first() {
        let crs = decode_crs("EPSG:4326", true).unwrap();
        assert_eq!(crs.srid, 4326);
        assert_eq!(crs.axis_order, AxisOrder::LonLat);
        assert!(crs.is_longitude_first());
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_wgs84_authority_order() {
        let crs = decode_crs("epsg:4326", false).unwrap();
        assert_eq!(crs.axis_order, AxisOrder::LatLon);
    }

    #[test]
    fn test_projected_ignores_axis_flag() {
        let crs = decode_crs("EPSG:3857", true).unwrap();
        assert_eq!(crs.kind, CrsKind::Projected);
        assert_eq!(crs.axis_order, AxisOrder::EastNorth);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(
            decode_crs("EPSG:9999", true),
            Err(SchemaError::UnknownCrs("EPSG:9999".to_string()))
        );
    }

    #[test]
    fn test_malformed_identifier() {
        assert!(matches!(decode_crs("WGS84", true), Err(SchemaError::InvalidCrs(_))));
        assert!(matches!(decode_crs("EPSG:", true), Err(SchemaError::InvalidCrs(_))));
        assert!(matches!(
            decode_crs("EPSG:99999999999", true),
            Err(SchemaError::InvalidCrs(_))
        ));
    }
}
