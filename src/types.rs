// Geo value types shared by the command builders and the reply decoders

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A (longitude, latitude) pair.
///
/// Positions read back from the server went through a 52-bit geohash and can
/// differ from what was written by up to about 1e-5 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// True when both axes are within `tolerance` degrees of `other`
    pub fn approx_eq(&self, other: &Coordinate, tolerance: f64) -> bool {
        (self.longitude - other.longitude).abs() <= tolerance
            && (self.latitude - other.latitude).abs() <= tolerance
    }
}

/// Distance unit accepted by the GEO commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeoUnit {
    #[default]
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "ft")]
    Feet,
}

impl GeoUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoUnit::Meters => "m",
            GeoUnit::Kilometers => "km",
            GeoUnit::Miles => "mi",
            GeoUnit::Feet => "ft",
        }
    }
}

impl fmt::Display for GeoUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeoUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "meters" => Ok(GeoUnit::Meters),
            "km" | "kilometers" => Ok(GeoUnit::Kilometers),
            "mi" | "miles" => Ok(GeoUnit::Miles),
            "ft" | "feet" => Ok(GeoUnit::Feet),
            _ => Err(format!("invalid geo unit '{}', use m, km, mi or ft", s)),
        }
    }
}

/// A distance as reported by the server, tagged with the unit it was asked in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub unit: GeoUnit,
}

/// Sort order of search results by distance from the center
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoOrder {
    Asc,
    Desc,
}

impl GeoOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoOrder::Asc => "ASC",
            GeoOrder::Desc => "DESC",
        }
    }
}

/// `COUNT n [ANY]`. `ANY` only exists together with a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoCount {
    pub count: u64,
    pub any: bool,
}

impl GeoCount {
    pub fn new(count: u64) -> Self {
        Self { count, any: false }
    }

    /// Let the server stop as soon as `count` matches are found
    pub fn any(count: u64) -> Self {
        Self { count, any: true }
    }
}

bitflags! {
    /// Reply enrichment requested from a search. The decoder reads exactly
    /// the fields these flags ask for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GeoFlags: u8 {
        const WITH_COORD = 0b001;
        const WITH_DIST = 0b010;
        const WITH_HASH = 0b100;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parse() {
        assert_eq!("km".parse::<GeoUnit>().unwrap(), GeoUnit::Kilometers);
        assert_eq!("FT".parse::<GeoUnit>().unwrap(), GeoUnit::Feet);
        assert_eq!("miles".parse::<GeoUnit>().unwrap(), GeoUnit::Miles);
        assert!("yards".parse::<GeoUnit>().is_err());
        assert_eq!(GeoUnit::default().as_str(), "m");
    }

    #[test]
    fn test_unit_serde() {
        assert_eq!(serde_json::to_string(&GeoUnit::Kilometers).unwrap(), "\"km\"");
        let unit: GeoUnit = serde_json::from_str("\"mi\"").unwrap();
        assert_eq!(unit, GeoUnit::Miles);
    }

    #[test]
    fn test_coordinate_approx_eq() {
        let written = Coordinate::new(13.361389, 38.115556);
        let stored = Coordinate::new(13.36138933897018433, 38.11555639549629859);
        assert!(written.approx_eq(&stored, 1e-5));
        assert!(!written.approx_eq(&Coordinate::new(13.37, 38.115556), 1e-5));
    }

    #[test]
    fn test_flags() {
        let flags = GeoFlags::WITH_COORD | GeoFlags::WITH_HASH;
        assert!(flags.contains(GeoFlags::WITH_COORD));
        assert!(!flags.contains(GeoFlags::WITH_DIST));
        assert!(GeoFlags::default().is_empty());
        assert_eq!(GeoFlags::all().bits(), 0b111);
    }
}
