use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{FetchParams, RawRecord, SourceClient};
use crate::error::AppError;
use crate::model::Source;

/// Serves pre-scraped records from a JSON document instead of the network.
/// Accepts either a bare array of records or an envelope carrying per-id
/// detail records for the enrichment pass.
pub struct FileClient {
    source: Source,
    records: Vec<RawRecord>,
    details: HashMap<String, RawRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileDocument {
    Records(Vec<Map<String, Value>>),
    Envelope {
        #[serde(default)]
        records: Vec<Map<String, Value>>,
        #[serde(default)]
        details: HashMap<String, Map<String, Value>>,
    },
}

impl FileClient {
    pub fn load(source: Source, path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(source, &text)
    }

    pub fn from_json(source: Source, text: &str) -> Result<Self, AppError> {
        let document: FileDocument = serde_json::from_str(text)?;
        let (records, details) = match document {
            FileDocument::Records(records) => (records, HashMap::new()),
            FileDocument::Envelope { records, details } => (records, details),
        };
        Ok(Self {
            source,
            records: records.into_iter().map(RawRecord).collect(),
            details: details
                .into_iter()
                .map(|(id, fields)| (id, RawRecord(fields)))
                .collect(),
        })
    }
}

#[async_trait]
impl SourceClient for FileClient {
    fn source(&self) -> Source {
        self.source
    }

    /// The file is served as-is; search parameters were already baked in
    /// when it was scraped.
    async fn fetch_records(&self, _params: &FetchParams) -> Result<Vec<RawRecord>, AppError> {
        Ok(self.records.clone())
    }

    async fn fetch_detail(&self, source_id: &str) -> Result<RawRecord, AppError> {
        self.details.get(source_id).cloned().ok_or_else(|| {
            AppError::SourceFetch(format!("no detail record for '{source_id}' in file"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bare_array_document() {
        let client = FileClient::from_json(
            Source::Kleinanzeigen,
            r#"[{"id": "1", "title": "Wohnung"}, {"id": "2"}]"#,
        )
        .unwrap();
        assert_eq!(client.source(), Source::Kleinanzeigen);

        let records = client.fetch_records(&FetchParams::default()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].str_field("id"), Some("1"));

        let err = client.fetch_detail("1").await.unwrap_err();
        assert!(matches!(err, AppError::SourceFetch(_)));
    }

    #[tokio::test]
    async fn test_envelope_document_with_details() {
        let client = FileClient::from_json(
            Source::WgGesucht,
            r#"{
                "records": [{"id": "1", "offer_title": "Zimmer"}],
                "details": {"1": {"freetext_description": "lang"}}
            }"#,
        )
        .unwrap();

        let records = client.fetch_records(&FetchParams::default()).await.unwrap();
        assert_eq!(records.len(), 1);

        let detail = client.fetch_detail("1").await.unwrap();
        assert_eq!(detail.str_field("freetext_description"), Some("lang"));
        assert!(client.fetch_detail("2").await.is_err());
    }

    #[test]
    fn test_invalid_document_rejected() {
        assert!(FileClient::from_json(Source::Kleinanzeigen, "not json").is_err());
        assert!(FileClient::from_json(Source::Kleinanzeigen, "42").is_err());
    }
}
