//! Shape checks for resolved profile fields.
//!
//! The canonical schema uses 42-character 0x-prefixed addresses and
//! 66-character token ids. Anything else coming out of resolution is a
//! pipeline bug, not absent data, and is reported as a validation failure.

use url::Url;

/// Length of a 0x-prefixed hex address string.
pub const ADDRESS_HEX_LEN: usize = 42;

/// Length of a 0x-prefixed 32-byte hex digest string.
pub const DIGEST_HEX_LEN: usize = 66;

/// Root suffix every indexed name must carry.
pub const NAME_SUFFIX: &str = ".eth";

fn is_hex_string(s: &str, expected_len: usize) -> bool {
    s.len() == expected_len
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validate a 42-character 0x-prefixed address string.
#[inline]
pub fn is_valid_address(s: &str) -> bool {
    is_hex_string(s, ADDRESS_HEX_LEN)
}

/// Validate a 66-character 0x-prefixed digest string (token id).
#[inline]
pub fn is_valid_digest(s: &str) -> bool {
    is_hex_string(s, DIGEST_HEX_LEN)
}

/// Validate that a name carries the service suffix and a non-empty label.
#[inline]
pub fn is_valid_name(name: &str) -> bool {
    name.len() > NAME_SUFFIX.len() && name.ends_with(NAME_SUFFIX)
}

/// Validate that a string parses as an absolute URL.
#[inline]
pub fn is_valid_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}
