use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Explicit "looked up, no usable result" value for a cached location.
/// Distinct from an absent cache row, which means the IP was never looked up.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// A single ban action recorded by the ban daemon.
///
/// `location` stays `None` until the save-time enrichment step resolves it;
/// after that it is never rewritten, even when the location cache later
/// learns a better answer for the same IP.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BanAction {
    pub id: i64,
    pub protocol: String,
    /// Unix timestamp (seconds) of the ban action.
    pub created_at: i64,
    pub ip: String,
    pub location: Option<String>,
}

/// Cached geolocation of an IP address. At most one row per distinct IP.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub id: i64,
    pub ip: String,
    pub country_name: String,
}

impl Location {
    pub fn is_unknown(&self) -> bool {
        self.country_name == UNKNOWN_LOCATION
    }
}
