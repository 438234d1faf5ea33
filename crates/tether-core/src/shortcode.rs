use crate::codec;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::Display;

/// A base62 short code identifying a shortened URL.
///
/// Codes produced by [`ShortCode::from_url`] are a pure function of the
/// URL. Codes arriving from callers go through [`ShortCode::parse`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Derives the short code for a URL.
    pub fn from_url(url: &str) -> Self {
        codec::encode(url)
    }

    /// Parses an externally supplied code.
    ///
    /// Valid codes are non-empty and contain only `[0-9A-Za-z]`.
    pub fn parse(code: impl Into<String>) -> std::result::Result<Self, StoreError> {
        let code = code.into();

        if code.is_empty() {
            return Err(StoreError::InvalidShortCode(
                "short code cannot be empty".to_string(),
            ));
        }

        if !code.chars().all(codec::is_base62) {
            return Err(StoreError::InvalidShortCode(format!(
                "must contain only base62 characters: '{}'",
                code
            )));
        }

        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes read back from trusted storage.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ShortCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_codes() {
        assert!(ShortCode::parse("abc").is_ok());
        assert!(ShortCode::parse("Abc123XYZ").is_ok());
        assert!(ShortCode::parse("0").is_ok());
    }

    #[test]
    fn parse_empty() {
        assert!(matches!(
            ShortCode::parse(""),
            Err(StoreError::InvalidShortCode(_))
        ));
    }

    #[test]
    fn parse_invalid_characters() {
        assert!(ShortCode::parse("abc-def").is_err());
        assert!(ShortCode::parse("abc_def").is_err());
        assert!(ShortCode::parse("abc/def").is_err());
        assert!(ShortCode::parse("abc def").is_err());
    }

    #[test]
    fn from_url_roundtrips_through_parse() {
        let code = ShortCode::from_url("https://example.com");
        let parsed = ShortCode::parse(code.as_str()).unwrap();
        assert_eq!(code, parsed);
    }

    #[test]
    fn to_url() {
        let code = ShortCode::parse("abc123").unwrap();
        assert_eq!(code.to_url("http://localhost:8080"), "http://localhost:8080/abc123");
        assert_eq!(code.to_url("http://localhost:8080/"), "http://localhost:8080/abc123");
    }

    #[test]
    fn serializes_as_plain_string() {
        let code = ShortCode::new_unchecked("abc123");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"abc123\"");
    }
}
