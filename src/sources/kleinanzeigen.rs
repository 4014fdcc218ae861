use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Extractor, FetchParams, RawRecord, SourceClient};
use crate::config;
use crate::error::AppError;
use crate::extract::{
    classify_property_type, collapse_whitespace, hash_id, normalize_images, parse_price,
    parse_rooms, parse_size,
};
use crate::model::{CanonicalListing, Coordinates, Source};

/// Raw fields consumed by the canonical mapping; everything else survives
/// verbatim under `source_data`.
const CANONICAL_FIELDS: &[&str] = &[
    "id",
    "title",
    "description",
    "full_description",
    "price",
    "currency",
    "location",
    "district",
    "address",
    "latitude",
    "longitude",
    "coordinates",
    "size",
    "rooms",
    "image",
    "images",
    "url",
];

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

pub struct KleinanzeigenExtractor;

impl KleinanzeigenExtractor {
    fn coordinates(raw: &RawRecord) -> Coordinates {
        if let Some(pair) = raw.object_field("coordinates") {
            return Coordinates {
                lat: pair.get("lat").and_then(Value::as_f64),
                lng: pair.get("lng").and_then(Value::as_f64),
            };
        }
        Coordinates {
            lat: raw.f64_field("latitude"),
            lng: raw.f64_field("longitude"),
        }
    }

    fn images(raw: &RawRecord) -> Vec<String> {
        let mut candidates: Vec<Value> = Vec::new();
        if let Some(single) = raw.0.get("image") {
            candidates.push(single.clone());
        }
        if let Some(gallery) = raw.array_field("images") {
            candidates.extend(gallery.iter().cloned());
        }
        normalize_images(&candidates)
    }
}

impl Extractor for KleinanzeigenExtractor {
    fn source(&self) -> Source {
        Source::Kleinanzeigen
    }

    fn listing_id(&self, raw: &RawRecord) -> Option<String> {
        if let Some(native) = raw.string_like("id").filter(|s| !s.is_empty()) {
            return Some(native);
        }
        raw.str_field("url")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| raw.str_field("title").map(str::trim).filter(|s| !s.is_empty()))
            .map(|basis| hash_id(Source::Kleinanzeigen, basis))
    }

    fn extract(&self, raw: &RawRecord) -> CanonicalListing {
        let title = collapse_whitespace(raw.str_field("title").unwrap_or_default());
        let description = collapse_whitespace(raw.str_field("description").unwrap_or_default());
        let full_description =
            collapse_whitespace(raw.str_field("full_description").unwrap_or_default());
        let searchable = format!("{title} {description}");

        let price = raw
            .f64_field("price")
            .filter(|v| *v >= 0.0)
            .or_else(|| raw.str_field("price").and_then(parse_price));
        let size_sqm = raw
            .f64_field("size")
            .filter(|v| *v > 0.0)
            .or_else(|| raw.str_field("size").and_then(parse_size))
            .or_else(|| parse_size(&searchable));
        let rooms = raw
            .f64_field("rooms")
            .filter(|v| *v > 0.0)
            .or_else(|| raw.str_field("rooms").and_then(parse_rooms))
            .or_else(|| parse_rooms(&searchable));
        let property_type = classify_property_type(&title, &description);

        CanonicalListing {
            id: String::new(),
            source: Source::Kleinanzeigen,
            source_id: raw.string_like("id").unwrap_or_default(),
            property_type,
            price,
            currency: raw
                .string_like("currency")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "EUR".to_string()),
            location: collapse_whitespace(raw.str_field("location").unwrap_or_default()),
            detailed_location: collapse_whitespace(
                raw.str_field("district")
                    .or_else(|| raw.str_field("address"))
                    .unwrap_or_default(),
            ),
            coordinates: Self::coordinates(raw),
            size_sqm,
            rooms,
            images: Self::images(raw),
            url: raw.str_field("url").unwrap_or_default().trim().to_string(),
            source_data: raw.except(CANONICAL_FIELDS),
            title,
            description,
            full_description,
        }
    }
}

// ---------------------------------------------------------------------------
// Live client
// ---------------------------------------------------------------------------

/// Search client against the Kleinanzeigen mobile JSON endpoints.
pub struct KleinanzeigenClient {
    client: Client,
}

impl KleinanzeigenClient {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config::HTTP_USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize, Default)]
struct AdsResponse {
    #[serde(default)]
    ads: Vec<Map<String, Value>>,
    /// Some API revisions nest the list under "results" instead.
    #[serde(default)]
    results: Vec<Map<String, Value>>,
}

impl AdsResponse {
    fn into_records(self) -> Vec<RawRecord> {
        let ads = if !self.ads.is_empty() {
            self.ads
        } else {
            self.results
        };
        ads.into_iter().map(RawRecord).collect()
    }
}

#[derive(Debug, Deserialize, Default)]
struct AdDetailResponse {
    #[serde(default)]
    ad: Option<Map<String, Value>>,
}

#[async_trait]
impl SourceClient for KleinanzeigenClient {
    fn source(&self) -> Source {
        Source::Kleinanzeigen
    }

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<RawRecord>, AppError> {
        let mut query: Vec<(&str, String)> = vec![
            ("q", params.query.clone()),
            // Mietwohnungen category
            ("categoryId", "203".to_string()),
        ];
        if let Some(location) = &params.location {
            query.push(("locationStr", location.clone()));
        }
        if let Some(max_price) = params.max_price {
            query.push(("maxPrice", format!("{max_price:.0}")));
        }

        let resp = self
            .client
            .get(config::KLEINANZEIGEN_SEARCH_URL)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::SourceFetch(format!(
                "kleinanzeigen search returned HTTP {}",
                resp.status()
            )));
        }

        let parsed: AdsResponse = resp.json().await?;
        let records = parsed.into_records();
        tracing::debug!("kleinanzeigen search returned {} record(s)", records.len());
        Ok(records)
    }

    async fn fetch_detail(&self, source_id: &str) -> Result<RawRecord, AppError> {
        let url = format!("{}/{source_id}.json", config::KLEINANZEIGEN_DETAIL_URL);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::SourceFetch(format!(
                "kleinanzeigen detail for {source_id} returned HTTP {}",
                resp.status()
            )));
        }

        let parsed: AdDetailResponse = resp.json().await?;
        parsed.ad.map(RawRecord).ok_or_else(|| {
            AppError::SourceFetch(format!(
                "kleinanzeigen detail for {source_id} had no ad payload"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropertyType;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        RawRecord(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_extract_full_record() {
        let record = raw(json!({
            "id": "123",
            "title": "Nachmieter   gesucht",
            "description": "Helle Wohnung\nin Mitte",
            "price": "650 €",
            "location": "Berlin",
            "district": "Mitte",
            "size": "54 m²",
            "rooms": "2 Zimmer",
            "latitude": 52.52,
            "longitude": 13.405,
            "image": "//img.kleinanzeigen.de/1.jpg",
            "images": ["//img.kleinanzeigen.de/1.jpg", "https://img.kleinanzeigen.de/2.jpg"],
            "url": "https://www.kleinanzeigen.de/s-anzeige/123",
            "seller": {"name": "Max", "commercial": false}
        }));
        let extractor = KleinanzeigenExtractor;
        let listing = extractor.extract(&record);

        assert_eq!(listing.source, Source::Kleinanzeigen);
        assert_eq!(listing.source_id, "123");
        assert_eq!(listing.title, "Nachmieter gesucht");
        assert_eq!(listing.description, "Helle Wohnung in Mitte");
        assert_eq!(listing.price, Some(650.0));
        assert_eq!(listing.currency, "EUR");
        assert_eq!(listing.location, "Berlin");
        assert_eq!(listing.detailed_location, "Mitte");
        assert_eq!(listing.size_sqm, Some(54.0));
        assert_eq!(listing.rooms, Some(2.0));
        assert_eq!(listing.coordinates.lat, Some(52.52));
        assert_eq!(listing.coordinates.lng, Some(13.405));
        assert_eq!(listing.property_type, PropertyType::Apartment);
        // duplicate thumbnail deduped, protocol-relative URL made absolute
        assert_eq!(
            listing.images,
            vec![
                "https://img.kleinanzeigen.de/1.jpg".to_string(),
                "https://img.kleinanzeigen.de/2.jpg".to_string(),
            ]
        );
        assert_eq!(
            listing
                .source_data
                .get("seller")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str),
            Some("Max")
        );
        assert!(!listing.source_data.contains_key("title"));
        assert_eq!(extractor.listing_id(&record).as_deref(), Some("123"));
    }

    #[test]
    fn test_listing_id_falls_back_to_content_hash() {
        let extractor = KleinanzeigenExtractor;

        let with_url = raw(json!({
            "title": "Wohnung",
            "url": "https://www.kleinanzeigen.de/s-anzeige/987"
        }));
        let id = extractor.listing_id(&with_url).unwrap();
        assert_eq!(id.len(), crate::config::HASH_ID_LEN);
        assert_eq!(extractor.listing_id(&with_url).unwrap(), id);

        let title_only = raw(json!({"title": "Wohnung"}));
        assert!(extractor.listing_id(&title_only).is_some());

        let nothing = raw(json!({"price": "650 €"}));
        assert_eq!(extractor.listing_id(&nothing), None);
    }

    #[test]
    fn test_extract_sparse_record() {
        let listing = KleinanzeigenExtractor.extract(&raw(json!({"id": 44})));
        assert_eq!(listing.source_id, "44");
        assert_eq!(listing.title, "");
        assert_eq!(listing.price, None);
        assert_eq!(listing.size_sqm, None);
        assert_eq!(listing.rooms, None);
        assert_eq!(listing.coordinates, Coordinates::default());
        assert!(listing.images.is_empty());
        assert_eq!(listing.property_type, PropertyType::Apartment);
        assert_eq!(listing.currency, "EUR");
    }

    #[test]
    fn test_size_and_rooms_parsed_from_title() {
        let listing = KleinanzeigenExtractor.extract(&raw(json!({
            "id": "9",
            "title": "2-Zimmer-Wohnung, 54,5 m² in Neukölln"
        })));
        assert_eq!(listing.size_sqm, Some(54.5));
        assert_eq!(listing.rooms, Some(2.0));
    }

    #[test]
    fn test_numeric_fields_accepted() {
        let listing = KleinanzeigenExtractor.extract(&raw(json!({
            "id": 9,
            "price": 650,
            "size": 54.5,
            "rooms": 2
        })));
        assert_eq!(listing.price, Some(650.0));
        assert_eq!(listing.size_sqm, Some(54.5));
        assert_eq!(listing.rooms, Some(2.0));
    }

    #[test]
    fn test_coordinate_pair_preferred_over_flat_fields() {
        let listing = KleinanzeigenExtractor.extract(&raw(json!({
            "id": "9",
            "coordinates": {"lat": 52.5, "lng": 13.4},
            "latitude": 1.0,
            "longitude": 2.0
        })));
        assert_eq!(listing.coordinates.lat, Some(52.5));
        assert_eq!(listing.coordinates.lng, Some(13.4));
    }

    #[test]
    fn test_search_response_ads_field() {
        let resp: AdsResponse =
            serde_json::from_str(r#"{"ads": [{"id": "1"}, {"id": "2"}]}"#).unwrap();
        assert_eq!(resp.into_records().len(), 2);
    }

    #[test]
    fn test_search_response_results_fallback() {
        let resp: AdsResponse = serde_json::from_str(r#"{"results": [{"id": "1"}]}"#).unwrap();
        assert_eq!(resp.into_records().len(), 1);

        let empty: AdsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_records().is_empty());
    }

    #[test]
    fn test_detail_response_payload() {
        let resp: AdDetailResponse =
            serde_json::from_str(r#"{"ad": {"id": "1", "full_description": "lang"}}"#).unwrap();
        assert!(resp.ad.is_some());

        let empty: AdDetailResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.ad.is_none());
    }
}
