use alloy::primitives::{Address, LogData, B256, U256};
use alloy::sol_types::SolEvent;
use anyhow::Context;

use crate::abis::IETHRegistrarController::NameRegistered;
use crate::utils::NAME_SUFFIX;

/// Raw on-chain log as returned by the fetcher. Immutable once fetched;
/// ordered by `(block_number, log_index)`. Never persisted.
#[derive(Debug, Clone)]
pub struct EventLog {
    pub address: Address,
    pub data: LogData,
    pub block_number: u64,
    pub log_index: u64,
}

/// Typed `NameRegistered` event, the single decode step all downstream
/// logic consumes.
#[derive(Debug, Clone)]
pub struct RegistrationEvent {
    /// Canonical name: the registered label with the service suffix.
    pub name: String,
    pub label: B256,
    pub owner: Address,
    pub cost: U256,
    pub expires: U256,
    pub block_number: u64,
    pub log_index: u64,
}

impl RegistrationEvent {
    /// Decode a `NameRegistered` log and append the service suffix to the
    /// raw registered label.
    pub fn decode(log: &EventLog) -> anyhow::Result<Self> {
        let event = NameRegistered::decode_log_data(&log.data)
            .with_context(|| format!("undecodable registration log at block {}", log.block_number))?;

        Ok(Self {
            name: format!("{}{}", event.name, NAME_SUFFIX),
            label: event.label,
            owner: event.owner,
            cost: event.cost,
            expires: event.expires,
            block_number: log.block_number,
            log_index: log.log_index,
        })
    }
}

/// Build an ABI-encoded registration log, for tests across the crate.
#[cfg(test)]
pub(crate) fn encoded_registration_log(label: &str, block_number: u64, log_index: u64) -> EventLog {
    use alloy::primitives::keccak256;

    let event = NameRegistered {
        name: label.to_string(),
        label: keccak256(label.as_bytes()),
        owner: Address::repeat_byte(0x11),
        cost: U256::from(1_000_000u64),
        expires: U256::from(1_893_456_000u64),
    };

    EventLog {
        address: Address::repeat_byte(0x22),
        data: event.encode_log_data(),
        block_number,
        log_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_appends_suffix_and_keeps_block() {
        let log = encoded_registration_log("alice", 9_380_500, 3);
        let event = RegistrationEvent::decode(&log).unwrap();

        assert_eq!(event.name, "alice.eth");
        assert_eq!(event.block_number, 9_380_500);
        assert_eq!(event.log_index, 3);
        assert_eq!(event.owner, Address::repeat_byte(0x11));
    }

    #[test]
    fn decode_rejects_garbage_payload() {
        let mut log = encoded_registration_log("alice", 1, 0);
        log.data = LogData::new_unchecked(vec![], alloy::primitives::Bytes::new());
        assert!(RegistrationEvent::decode(&log).is_err());
    }
}
