use crate::error::AppError;
use crate::model::CanonicalListing;

/// Accumulated validation violations for one listing. Empty means valid.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

/// Check required fields and value ranges, collecting every violation
/// instead of stopping at the first. Never fails itself; the caller decides
/// what to do with an invalid listing.
pub fn validate(listing: &CanonicalListing) -> ValidationReport {
    let mut errors = Vec::new();

    if listing.id.is_empty() {
        errors.push("id must not be empty".to_string());
    }
    if listing.title.is_empty() {
        errors.push("title must not be empty".to_string());
    }
    if let Some(price) = listing.price
        && price < 0.0
    {
        errors.push(format!("price must be non-negative, got {price}"));
    }
    if let Some(lat) = listing.coordinates.lat
        && !(-90.0..=90.0).contains(&lat)
    {
        errors.push(format!("latitude {lat} outside [-90, 90]"));
    }
    if let Some(lng) = listing.coordinates.lng
        && !(-180.0..=180.0).contains(&lng)
    {
        errors.push(format!("longitude {lng} outside [-180, 180]"));
    }

    ValidationReport { errors }
}
