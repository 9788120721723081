use crate::error::{ChainError, Result};
use crate::sha256::Hash;
use crate::types::Transaction;
use serde::{Deserialize, Serialize};

// data -> CBOR. 필드 순서가 고정되어 있으므로 같은 값이면 항상 같은 바이트가 나온다
pub fn cbor_bytes<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    let mut serialized: Vec<u8> = vec![];
    ciborium::into_writer(data, &mut serialized)
        .map_err(|e| ChainError::Serialization(e.to_string()))?;
    Ok(serialized)
}

/// Lowercase hex text with no zero padding. Negative values keep a leading `-`
/// followed by the magnitude rather than a two's-complement rendering.
pub fn int_to_hex(value: i64) -> String {
    if value < 0 {
        format!("-{:x}", value.unsigned_abs())
    } else {
        format!("{:x}", value)
    }
}

// 구분자 없이 순서대로 이어 붙인다
pub fn concat_fields(fields: &[&[u8]]) -> Vec<u8> {
    let len = fields.iter().map(|field| field.len()).sum();
    let mut data = Vec::with_capacity(len);
    for field in fields {
        data.extend_from_slice(field);
    }
    data
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct MerkleRoot(Hash);

impl MerkleRoot {
    // tx id들을 leaf로 하는 merkle tree의 root
    pub fn calculate(transactions: &[Transaction]) -> MerkleRoot {
        let mut layer: Vec<Hash> = transactions.iter().map(|tx| tx.id()).collect();

        if layer.is_empty() {
            return MerkleRoot(Hash::zero());
        }

        while layer.len() > 1 {
            let mut next = Vec::with_capacity(layer.len().div_ceil(2));
            for pair in layer.chunks(2) {
                let left = pair[0];
                // 홀수 개라면 마지막 노드를 복제
                let right = pair.get(1).copied().unwrap_or(left);
                next.push(Hash::digest(&concat_fields(&[
                    &left.as_bytes(),
                    &right.as_bytes(),
                ])));
            }
            layer = next;
        }

        MerkleRoot(layer[0])
    }

    pub fn hash(&self) -> Hash {
        self.0
    }
}
