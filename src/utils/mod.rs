//! Utility functions for the enscan indexer.
//!
//! - [`namehash`] - EIP-137 namehash and name token ids
//! - [`text`] - text record normalization (urls, keywords, sanitizing)
//! - [`validation`] - profile shape checks

mod namehash;
mod text;
mod validation;

pub use namehash::{namehash, token_id};
pub use text::{non_empty, normalize_url, sanitize_string, split_keywords};
pub use validation::{
    is_valid_address, is_valid_digest, is_valid_name, is_valid_url, ADDRESS_HEX_LEN,
    DIGEST_HEX_LEN, NAME_SUFFIX,
};
