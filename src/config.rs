use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::AppError;

/// Listings not re-observed for this many days are deactivated by the sweep.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Upper bound on stored image URLs per listing.
pub const MAX_IMAGES: usize = 10;

/// Hex length of content-derived listing ids.
pub const HASH_ID_LEN: usize = 16;

pub const HTTP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const KLEINANZEIGEN_SEARCH_URL: &str = "https://api.kleinanzeigen.de/api/ads.json";
pub const KLEINANZEIGEN_DETAIL_URL: &str = "https://api.kleinanzeigen.de/api/ads";

pub const WG_GESUCHT_SEARCH_URL: &str = "https://www.wg-gesucht.de/api/asset/offers.json";
pub const WG_GESUCHT_DETAIL_URL: &str = "https://www.wg-gesucht.de/api/asset/offers";

pub fn project_dirs() -> Result<ProjectDirs, AppError> {
    ProjectDirs::from("", "", "mietradar")
        .ok_or_else(|| AppError::Config("Could not determine home directory".to_string()))
}

/// Default database location inside the platform data directory. The
/// directory is created on first use.
pub fn db_path() -> Result<PathBuf, AppError> {
    let dirs = project_dirs()?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("mietradar.db"))
}
