//! Deterministic URL to short code encoding.
//!
//! The code is the base62 rendering of the URL's UTF-8 bytes read as one
//! big-endian number. The same URL yields the same code in every process.

use crate::shortcode::ShortCode;

/// Digits, then upper case, then lower case.
pub const BASE62_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encodes a URL into its short code.
///
/// Infallible: every byte sequence has an encoding. Leading zero bytes
/// map to a leading `'0'` each, as in base58.
pub fn encode(url: &str) -> ShortCode {
    ShortCode::new_unchecked(base_x::encode(BASE62_ALPHABET, url.as_bytes()))
}

/// Returns `true` if `c` belongs to [`BASE62_ALPHABET`].
pub fn is_base62(c: char) -> bool {
    c.is_ascii_alphanumeric()
}
