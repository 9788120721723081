use std::fmt;

use crate::U256;
use crate::error::Result;
use crate::util::cbor_bytes;
use serde::{Deserialize, Serialize};
use sha256::digest;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(U256);

impl Hash {
    // raw bytes -> SHA-256
    pub fn digest(data: &[u8]) -> Self {
        let hash = digest(data);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hash, &mut bytes).expect("BUG: sha256 digest is always 64 hex chars");
        Hash::from_bytes(bytes)
    }

    // serde Serialize 가능한 값을 CBOR로 직렬화한 뒤 해싱
    pub fn hash<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self::digest(&cbor_bytes(data)?))
    }

    /// Interprets the bytes as an unsigned big-endian 256-bit integer.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(U256::from_big_endian(&bytes))
    }

    // hash가 target 미만이어야 채굴한 것으로 간주 (같으면 실패)
    pub fn matches_target(&self, target: U256) -> bool {
        self.0 < target
    }

    pub fn zero() -> Self {
        Hash(U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        bytes
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}
