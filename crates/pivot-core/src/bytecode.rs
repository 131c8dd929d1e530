//! Bytecode handling utilities
//!
//! Provides type-safe bytecode operations including parsing, validation,
//! hash computation and constructor-argument concatenation.

use crate::error::Result;
use alloy::primitives::{keccak256, Bytes, B256};

/// Represents compiled contract bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytecode {
    bytes: Vec<u8>,
}

impl Bytecode {
    /// Create bytecode from a hex string (with or without 0x prefix)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let clean = hex.trim().trim_start_matches("0x");
        if clean.is_empty() {
            return Ok(Self { bytes: Vec::new() });
        }
        let bytes = hex::decode(clean)?;
        Ok(Self { bytes })
    }

    /// Compute the keccak256 hash of the bytecode
    pub fn hash(&self) -> B256 {
        keccak256(&self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Creation code with ABI-encoded constructor arguments appended
    pub fn with_args(&self, encoded_args: &[u8]) -> Bytes {
        let mut code = self.bytes.clone();
        code.extend_from_slice(encoded_args);
        Bytes::from(code)
    }

    /// Convert to hex string (with 0x prefix)
    pub fn to_hex(&self) -> String {
        if self.bytes.is_empty() {
            return "0x".to_string();
        }
        format!("0x{}", hex::encode(&self.bytes))
    }
}

/// Hex-encode a hash without the 0x prefix, as stored in the manifest
pub fn hash_to_hex(hash: &B256) -> String {
    hex::encode(hash.as_slice())
}

/// Parse a manifest hash (with or without 0x prefix)
pub fn hash_from_hex(value: &str) -> Result<B256> {
    let bytes = hex::decode(value.trim_start_matches("0x"))?;
    if bytes.len() != 32 {
        return Err(hex::FromHexError::InvalidStringLength.into());
    }
    Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytecode_from_hex() {
        let bytecode = Bytecode::from_hex("0x6080604052").unwrap();
        assert!(!bytecode.is_empty());
        assert_eq!(bytecode.len(), 5);
    }

    #[test]
    fn test_bytecode_from_hex_no_prefix() {
        let bytecode = Bytecode::from_hex("6080604052").unwrap();
        assert_eq!(bytecode.len(), 5);
        assert_eq!(bytecode.to_hex(), "0x6080604052");
    }

    #[test]
    fn test_bytecode_empty() {
        let bytecode = Bytecode::from_hex("0x").unwrap();
        assert!(bytecode.is_empty());
        assert_eq!(bytecode.to_hex(), "0x");
    }

    #[test]
    fn test_bytecode_invalid_hex() {
        assert!(Bytecode::from_hex("not_hex").is_err());
    }

    #[test]
    fn test_bytecode_hash_is_deterministic() {
        let a = Bytecode::from_hex("0x6080604052").unwrap();
        let b = Bytecode::from_hex("6080604052").unwrap();
        let c = Bytecode::from_hex("0x6080604053").unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_with_args_appends() {
        let bytecode = Bytecode::from_hex("0x6080").unwrap();
        let code = bytecode.with_args(&[0xaa, 0xbb]);
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0xaa, 0xbb]);
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = Bytecode::from_hex("0x6080604052").unwrap().hash();
        let encoded = hash_to_hex(&hash);
        assert_eq!(encoded.len(), 64);
        assert_eq!(hash_from_hex(&encoded).unwrap(), hash);
        assert_eq!(hash_from_hex(&format!("0x{}", encoded)).unwrap(), hash);
        assert!(hash_from_hex("abcd").is_err());
    }
}
