use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A classifieds platform being aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    Kleinanzeigen,
    WgGesucht,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Kleinanzeigen, Source::WgGesucht];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Kleinanzeigen => "kleinanzeigen",
            Source::WgGesucht => "wg-gesucht",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Source::Kleinanzeigen => "Kleinanzeigen",
            Source::WgGesucht => "WG-Gesucht",
        }
    }

    /// Parse a wire name. Unknown names are rejected, never defaulted.
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "kleinanzeigen" => Ok(Source::Kleinanzeigen),
            "wg-gesucht" => Ok(Source::WgGesucht),
            other => Err(AppError::UnsupportedSource(other.to_string())),
        }
    }

    /// Expand a CLI selector: a single wire name, or "all".
    pub fn parse_selector(s: &str) -> Result<Vec<Self>, AppError> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Self::ALL.to_vec())
        } else {
            Ok(vec![Self::parse(s)?])
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of property a listing offers. Classification always resolves;
/// unrecognized content falls back to `Apartment`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Room,
    #[default]
    Apartment,
    House,
    Commercial,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Room => "room",
            PropertyType::Apartment => "apartment",
            PropertyType::House => "house",
            PropertyType::Commercial => "commercial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "room" => Some(PropertyType::Room),
            "apartment" => Some(PropertyType::Apartment),
            "house" => Some(PropertyType::House),
            "commercial" => Some(PropertyType::Commercial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// The unified, source-agnostic listing shape. Every field is present after
/// normalization; unknown values are `None` or empty, never missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalListing {
    pub id: String,
    pub source: Source,
    /// Source-native identifier. Empty when the id had to be derived from
    /// content instead.
    pub source_id: String,
    pub title: String,
    pub description: String,
    pub full_description: String,
    pub price: Option<f64>,
    pub currency: String,
    pub location: String,
    pub detailed_location: String,
    pub coordinates: Coordinates,
    pub size_sqm: Option<f64>,
    pub rooms: Option<f64>,
    pub property_type: PropertyType,
    pub images: Vec<String>,
    pub url: String,
    /// Source-specific auxiliary fields (seller info, flatshare composition).
    /// Carried through untouched and never validated.
    pub source_data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_wire_names_round_trip() {
        for source in Source::ALL {
            assert_eq!(Source::parse(source.as_str()).unwrap(), source);
        }
        assert_eq!(
            serde_json::to_string(&Source::WgGesucht).unwrap(),
            "\"wg-gesucht\""
        );
        assert_eq!(
            serde_json::to_string(&Source::Kleinanzeigen).unwrap(),
            "\"kleinanzeigen\""
        );
    }

    #[test]
    fn test_unknown_source_rejected() {
        let err = Source::parse("ebay").unwrap_err();
        assert!(matches!(err, AppError::UnsupportedSource(_)));
    }

    #[test]
    fn test_selector_expansion() {
        assert_eq!(Source::parse_selector("all").unwrap(), Source::ALL.to_vec());
        assert_eq!(
            Source::parse_selector("kleinanzeigen").unwrap(),
            vec![Source::Kleinanzeigen]
        );
        assert!(Source::parse_selector("craigslist").is_err());
    }

    #[test]
    fn test_property_type_fallback() {
        assert_eq!(PropertyType::default(), PropertyType::Apartment);
        assert_eq!(PropertyType::from_str("house"), Some(PropertyType::House));
        assert_eq!(PropertyType::from_str("castle"), None);
    }
}
