pub mod file;
pub mod kleinanzeigen;
pub mod wg_gesucht;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::model::{CanonicalListing, Source};

/// One unparsed record in a source's native shape. Any field may be missing
/// or oddly typed; the accessors are lenient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord(pub Map<String, Value>);

impl RawRecord {
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// String content of a field that may arrive as a string or a number.
    pub fn string_like(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Float content of a field that may arrive as a number or a numeric
    /// string.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn array_field(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    pub fn object_field(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Everything except the given keys: the auxiliary fields a source
    /// carries beyond the canonical schema.
    pub fn except(&self, keys: &[&str]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Overlay `other` onto this record; on key conflicts `other` wins.
    /// Used to merge detail-fetch output onto a search result.
    pub fn merge(&mut self, other: &RawRecord) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

/// Search parameters for one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct FetchParams {
    pub query: String,
    pub location: Option<String>,
    pub max_price: Option<f64>,
}

/// Pure per-source mapping from a raw record to the canonical schema.
/// Implementations must be deterministic: the same raw record always
/// produces the same output.
pub trait Extractor: Send + Sync {
    fn source(&self) -> Source;

    /// Stable id for the record: the source-native id when present,
    /// otherwise a content hash of the url or title. `None` when the record
    /// carries nothing to derive an id from.
    fn listing_id(&self, raw: &RawRecord) -> Option<String>;

    /// Map raw fields into a canonical listing. The `id` field is left
    /// empty here and filled in by the normalizer.
    fn extract(&self, raw: &RawRecord) -> CanonicalListing;
}

/// Upstream access to one source: search plus per-listing detail.
#[async_trait]
pub trait SourceClient: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch_records(&self, params: &FetchParams) -> Result<Vec<RawRecord>, AppError>;

    /// Fetch the detail payload for one listing, keyed by its source-native
    /// id. Returns a partial record to be merged onto the search result.
    async fn fetch_detail(&self, source_id: &str) -> Result<RawRecord, AppError>;
}

/// Build the map of all compiled-in extractors.
/// Adding a source: implement `Extractor` and `SourceClient` for it, then
/// register both here and in `build_live_client`.
pub fn build_extractor_registry() -> HashMap<Source, Arc<dyn Extractor>> {
    let mut map: HashMap<Source, Arc<dyn Extractor>> = HashMap::new();

    let kleinanzeigen = Arc::new(kleinanzeigen::KleinanzeigenExtractor);
    map.insert(kleinanzeigen.source(), kleinanzeigen);

    let wg_gesucht = Arc::new(wg_gesucht::WgGesuchtExtractor);
    map.insert(wg_gesucht.source(), wg_gesucht);

    map
}

/// Live HTTP client for a source.
pub fn build_live_client(source: Source) -> Result<Box<dyn SourceClient>, AppError> {
    Ok(match source {
        Source::Kleinanzeigen => Box::new(kleinanzeigen::KleinanzeigenClient::new()?),
        Source::WgGesucht => Box::new(wg_gesucht::WgGesuchtClient::new()?),
    })
}
