use alloy::primitives::{keccak256, B256};

/// EIP-137 namehash.
///
/// Hashes labels right-to-left, folding each label hash into the
/// accumulated node. The empty name hashes to thirty-two zero bytes.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }

    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }

    node
}

/// Token id of a name: keccak256 over the canonical name's UTF-8 bytes,
/// rendered as a 66-character 0x-prefixed hex string.
pub fn token_id(name: &str) -> B256 {
    keccak256(name.as_bytes())
}
