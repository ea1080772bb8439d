//! Content-based resource versions and their HTTP ETag form.
//!
//! A version is the base64 form of the first 8 bytes of the SHA-256 digest of
//! some content. Identical content always yields the identical version, so a
//! version changes exactly when the encoded resource changes.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

/// Opaque version string for `content`.
pub fn version_from_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let hash = hasher.finalize();
    // First 8 bytes keep ETags short
    BASE64.encode(&hash[..8])
}

/// Weak ETag header value: `W/"<version>"`.
pub fn weak_etag(version: &str) -> String {
    if version.starts_with("W/") {
        version.to_string()
    } else {
        format!("W/\"{}\"", version.trim_matches('"'))
    }
}

/// Strip `W/` and quotes from an ETag header value.
pub fn parse_etag(etag: &str) -> &str {
    etag.trim().trim_start_matches("W/").trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_deterministic() {
        let a = version_from_content(br#"{"id":"123","userName":"bjensen"}"#);
        let b = version_from_content(br#"{"id":"123","userName":"bjensen"}"#);
        let c = version_from_content(br#"{"id":"123","userName":"jsmith"}"#);
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 8 bytes -> 12 base64 characters
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn test_etag_forms() {
        assert_eq!(weak_etag("abc"), "W/\"abc\"");
        assert_eq!(weak_etag("W/\"abc\""), "W/\"abc\"");
        assert_eq!(parse_etag("W/\"abc\""), "abc");
        assert_eq!(parse_etag("\"abc\""), "abc");
    }
}
