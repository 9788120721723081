use crate::error::Result;
use crate::pow::ProofOfWork;
use crate::sha256::Hash;
use crate::types::transaction::Transaction;
use crate::util::MerkleRoot;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    /// unix seconds
    pub timestamp: i64,
    pub prev_block_hash: Hash,
    pub transactions: Vec<Transaction>,
    /// for POW. 채굴이 끝나기 전에는 0
    pub nonce: i64,
    pub hash: Hash,
}

impl Block {
    pub fn new(transactions: Vec<Transaction>, prev_block_hash: Hash) -> Self {
        Self::with_timestamp(transactions, prev_block_hash, Utc::now().timestamp())
    }

    pub fn with_timestamp(
        transactions: Vec<Transaction>,
        prev_block_hash: Hash,
        timestamp: i64,
    ) -> Self {
        Self {
            timestamp,
            prev_block_hash,
            transactions,
            nonce: 0,
            hash: Hash::zero(),
        }
    }

    // 제네시스 블록은 coinbase 하나만 담고 prev는 zero hash
    pub fn genesis(coinbase: Transaction) -> Self {
        Self::new(vec![coinbase], Hash::zero())
    }

    /// tx aggregated to single merkle root
    pub fn hash_transactions(&self) -> Hash {
        MerkleRoot::calculate(&self.transactions).hash()
    }

    pub fn mine(&mut self, difficulty: u32) -> Result<()> {
        self.mine_until(difficulty, &AtomicBool::new(false))
    }

    // 채굴에 성공했을 때만 nonce와 hash를 기록한다
    pub fn mine_until(&mut self, difficulty: u32, cancel: &AtomicBool) -> Result<()> {
        let (nonce, hash) = ProofOfWork::new(self, difficulty)?.run_until(cancel)?;
        self.nonce = nonce;
        self.hash = hash;
        Ok(())
    }

    pub fn has_valid_pow(&self, difficulty: u32) -> Result<bool> {
        Ok(ProofOfWork::new(self, difficulty)?.validate())
    }
}
