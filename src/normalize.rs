use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppError;
use crate::extract::synthetic_id;
use crate::model::{CanonicalListing, Source};
use crate::sources::{Extractor, RawRecord};

/// What to do with a record whose id cannot be derived from any stable
/// content. Synthesizing keeps the record but defeats deduplication for it,
/// so rejection is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdPolicy {
    #[default]
    Reject,
    Synthesize,
}

/// Map one raw record into the canonical schema via the extractor registered
/// for `source`. Deterministic for any record with a derivable id: the same
/// input yields the same listing, id included.
pub fn normalize(
    extractors: &HashMap<Source, Arc<dyn Extractor>>,
    source: Source,
    raw: &RawRecord,
    policy: IdPolicy,
) -> Result<CanonicalListing, AppError> {
    let extractor = extractors
        .get(&source)
        .ok_or_else(|| AppError::UnsupportedSource(source.as_str().to_string()))?;

    let mut listing = extractor.extract(raw);
    listing.id = match extractor.listing_id(raw) {
        Some(id) => id,
        None => match policy {
            IdPolicy::Reject => {
                return Err(AppError::UnderivableId(format!(
                    "{} record carries no native id, url or title",
                    source.as_str()
                )));
            }
            IdPolicy::Synthesize => synthetic_id(),
        },
    };
    Ok(listing)
}
