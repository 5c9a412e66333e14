use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{is_valid_address, is_valid_digest, is_valid_name, is_valid_url};

/// One row per registered name (PostgreSQL `enscan.profiles`).
///
/// `ens_name` is the unique key; when a name is registered more than once
/// in history, the persisted row carries the registration with the highest
/// `emitted_block_number`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub ens_name: String,
    pub resolver_address: String,
    pub registrant_address: String,
    pub token_id: String,
    pub expiration_date: DateTime<Utc>,

    pub content_hash: Option<String>,
    pub bitcoin: Option<String>,
    pub dogecoin: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub notice: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub discord: Option<String>,
    pub github: Option<String>,
    pub reddit: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub linkedin: Option<String>,
    pub ens_delegate: Option<String>,

    /// Block at which the triggering registration event was emitted.
    pub emitted_block_number: i64,
}

impl Profile {
    /// Check the assembled profile against the canonical schema:
    /// `.eth` suffix, 42-character addresses, 66-character token id and a
    /// parseable url when one is set. A mismatch here is a pipeline bug,
    /// not absent data.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_name(&self.ens_name) {
            return Err(format!("invalid name: {}", self.ens_name));
        }
        if !is_valid_address(&self.resolver_address) {
            return Err(format!("invalid resolver address: {}", self.resolver_address));
        }
        if !is_valid_address(&self.registrant_address) {
            return Err(format!(
                "invalid registrant address: {}",
                self.registrant_address
            ));
        }
        if !is_valid_digest(&self.token_id) {
            return Err(format!("invalid token id: {}", self.token_id));
        }
        if let Some(url) = &self.url {
            if !is_valid_url(url) {
                return Err(format!("invalid url record: {url}"));
            }
        }
        Ok(())
    }
}

/// Minimal valid profile for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn sample_profile(name: &str, block: i64) -> Profile {
    Profile {
        ens_name: name.to_string(),
        resolver_address: "0x4976fb03c32e5b8cfe2b6ccb31c09ba78ebaba41".to_string(),
        registrant_address: "0x283af0b28c62c092c9727f1ee09c02ca627eb7f5".to_string(),
        token_id: format!("0x{}", "ab".repeat(32)),
        expiration_date: Utc::now(),
        content_hash: None,
        bitcoin: None,
        dogecoin: None,
        email: None,
        url: None,
        avatar: None,
        location: None,
        description: None,
        notice: None,
        keywords: None,
        discord: None,
        github: None,
        reddit: None,
        twitter: None,
        telegram: None,
        linkedin: None,
        ens_delegate: None,
        emitted_block_number: block,
    }
}
