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
/// verbatim under `source_data` (flatshare composition, roommate counts,
/// availability dates and so on).
const CANONICAL_FIELDS: &[&str] = &[
    "id",
    "offer_id",
    "title",
    "offer_title",
    "description",
    "freetext_description",
    "full_description",
    "price",
    "total_costs",
    "rent_costs",
    "currency",
    "city",
    "district",
    "lat",
    "lng",
    "coordinates",
    "size",
    "property_size",
    "rooms",
    "number_of_rooms",
    "thumb",
    "image",
    "image_urls",
    "url",
];

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

pub struct WgGesuchtExtractor;

impl WgGesuchtExtractor {
    /// Offer ids are small integers that would collide with other sources'
    /// id spaces, so the canonical id gets a "wg-" namespace.
    fn native_id(raw: &RawRecord) -> Option<String> {
        raw.string_like("id")
            .filter(|s| !s.is_empty())
            .or_else(|| raw.string_like("offer_id").filter(|s| !s.is_empty()))
    }

    fn price(raw: &RawRecord) -> Option<f64> {
        for key in ["total_costs", "rent_costs", "price"] {
            let parsed = raw
                .f64_field(key)
                .filter(|v| *v >= 0.0)
                .or_else(|| raw.str_field(key).and_then(parse_price));
            if parsed.is_some() {
                return parsed;
            }
        }
        None
    }

    fn coordinates(raw: &RawRecord) -> Coordinates {
        if let Some(pair) = raw.object_field("coordinates") {
            return Coordinates {
                lat: pair.get("lat").and_then(Value::as_f64),
                lng: pair.get("lng").and_then(Value::as_f64),
            };
        }
        Coordinates {
            lat: raw.f64_field("lat"),
            lng: raw.f64_field("lng"),
        }
    }

    /// Offers spread their pictures over several fields; collect them all
    /// and let dedup sort it out.
    fn images(raw: &RawRecord) -> Vec<String> {
        let mut candidates: Vec<Value> = Vec::new();
        for key in ["thumb", "image"] {
            if let Some(single) = raw.0.get(key) {
                candidates.push(single.clone());
            }
        }
        if let Some(gallery) = raw.array_field("image_urls") {
            candidates.extend(gallery.iter().cloned());
        }
        normalize_images(&candidates)
    }
}

impl Extractor for WgGesuchtExtractor {
    fn source(&self) -> Source {
        Source::WgGesucht
    }

    fn listing_id(&self, raw: &RawRecord) -> Option<String> {
        if let Some(native) = Self::native_id(raw) {
            return Some(format!("wg-{native}"));
        }
        raw.str_field("url")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                raw.str_field("offer_title")
                    .or_else(|| raw.str_field("title"))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .map(|basis| hash_id(Source::WgGesucht, basis))
    }

    fn extract(&self, raw: &RawRecord) -> CanonicalListing {
        let title = collapse_whitespace(
            raw.str_field("offer_title")
                .or_else(|| raw.str_field("title"))
                .unwrap_or_default(),
        );
        let description = collapse_whitespace(raw.str_field("description").unwrap_or_default());
        let full_description = collapse_whitespace(
            raw.str_field("freetext_description")
                .or_else(|| raw.str_field("full_description"))
                .unwrap_or_default(),
        );
        let searchable = format!("{title} {description}");

        let size_sqm = raw
            .f64_field("property_size")
            .or_else(|| raw.f64_field("size"))
            .filter(|v| *v > 0.0)
            .or_else(|| raw.str_field("property_size").and_then(parse_size))
            .or_else(|| raw.str_field("size").and_then(parse_size))
            .or_else(|| parse_size(&searchable));
        let rooms = raw
            .f64_field("number_of_rooms")
            .or_else(|| raw.f64_field("rooms"))
            .filter(|v| *v > 0.0)
            .or_else(|| raw.str_field("rooms").and_then(parse_rooms))
            .or_else(|| parse_rooms(&searchable));
        let property_type = classify_property_type(&title, &description);

        let native_id = Self::native_id(raw);
        let url = raw
            .str_field("url")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| {
                // offer pages live at a stable id-derived path
                native_id
                    .as_ref()
                    .map(|id| format!("https://www.wg-gesucht.de/{id}.html"))
            })
            .unwrap_or_default();

        CanonicalListing {
            id: String::new(),
            source: Source::WgGesucht,
            source_id: native_id.unwrap_or_default(),
            property_type,
            price: Self::price(raw),
            currency: raw
                .string_like("currency")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "EUR".to_string()),
            location: collapse_whitespace(raw.str_field("city").unwrap_or_default()),
            detailed_location: collapse_whitespace(raw.str_field("district").unwrap_or_default()),
            coordinates: Self::coordinates(raw),
            size_sqm,
            rooms,
            images: Self::images(raw),
            url,
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

/// Search client against the WG-Gesucht offers API.
pub struct WgGesuchtClient {
    client: Client,
}

impl WgGesuchtClient {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config::HTTP_USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize, Default)]
struct OffersResponse {
    #[serde(default)]
    offers: Vec<Map<String, Value>>,
    /// HAL-style revisions nest the list under "_embedded".
    #[serde(default, rename = "_embedded")]
    embedded: EmbeddedOffers,
}

#[derive(Debug, Deserialize, Default)]
struct EmbeddedOffers {
    #[serde(default)]
    offers: Vec<Map<String, Value>>,
}

impl OffersResponse {
    fn into_records(self) -> Vec<RawRecord> {
        let offers = if !self.offers.is_empty() {
            self.offers
        } else {
            self.embedded.offers
        };
        offers.into_iter().map(RawRecord).collect()
    }
}

#[async_trait]
impl SourceClient for WgGesuchtClient {
    fn source(&self) -> Source {
        Source::WgGesucht
    }

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<RawRecord>, AppError> {
        let mut query: Vec<(&str, String)> = vec![("query", params.query.clone())];
        if let Some(location) = &params.location {
            query.push(("city", location.clone()));
        }
        if let Some(max_price) = params.max_price {
            query.push(("max_rent", format!("{max_price:.0}")));
        }

        let resp = self
            .client
            .get(config::WG_GESUCHT_SEARCH_URL)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::SourceFetch(format!(
                "wg-gesucht search returned HTTP {}",
                resp.status()
            )));
        }

        let parsed: OffersResponse = resp.json().await?;
        let records = parsed.into_records();
        tracing::debug!("wg-gesucht search returned {} record(s)", records.len());
        Ok(records)
    }

    async fn fetch_detail(&self, source_id: &str) -> Result<RawRecord, AppError> {
        let url = format!("{}/{source_id}", config::WG_GESUCHT_DETAIL_URL);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::SourceFetch(format!(
                "wg-gesucht detail for {source_id} returned HTTP {}",
                resp.status()
            )));
        }

        // the detail endpoint returns the offer object itself
        let parsed: Map<String, Value> = resp.json().await?;
        if parsed.is_empty() {
            return Err(AppError::SourceFetch(format!(
                "wg-gesucht detail for {source_id} was empty"
            )));
        }
        Ok(RawRecord(parsed))
    }
}
