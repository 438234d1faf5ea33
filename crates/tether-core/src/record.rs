use crate::shortcode::ShortCode;
use serde::{Deserialize, Serialize};

/// A stored URL mapping.
///
/// This is also the line format of the durable log, one JSON object per
/// line with the keys `user_id`, `short_url`, `original_url` and `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The user that first submitted the URL.
    pub user_id: String,
    /// The short code derived from `original_url`.
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Tombstone. Never flips back to `false` once set.
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    /// Builds a fresh, live record for `url`, deriving its short code.
    pub fn new(user_id: impl Into<String>, url: impl Into<String>) -> Self {
        let original_url = url.into();
        Self {
            user_id: user_id.into(),
            short_code: ShortCode::from_url(&original_url),
            original_url,
            deleted: false,
        }
    }
}

/// A request to tombstone one short code on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub user_id: String,
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
}

impl DeleteRequest {
    pub fn new(user_id: impl Into<String>, short_code: ShortCode) -> Self {
        Self {
            user_id: user_id.into(),
            short_code,
        }
    }
}

/// One URL of a batch submission, tagged by a caller-chosen id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// The short code assigned to one [`BatchItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub correlation_id: String,
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
}

/// One entry of a per-user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUrl {
    #[serde(rename = "short_url")]
    pub short_code: ShortCode,
    pub original_url: String,
}

/// Counts of distinct URLs and distinct users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub urls: u64,
    pub users: u64,
}
