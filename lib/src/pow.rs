use crate::U256;
use crate::error::{ChainError, Result};
use crate::sha256::Hash;
use crate::types::Block;
use crate::util::{concat_fields, int_to_hex};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};

// 진행 상황을 debug 로그로 남기는 간격
const PROGRESS_INTERVAL: i64 = 1 << 20;

/// Target for `difficulty` leading hex zeros: `1 << (256 - 4 * difficulty)`.
///
/// Difficulty 0 would need 2^256, which a 256-bit integer cannot hold.
pub fn target_for_difficulty(difficulty: u32) -> Result<U256> {
    if difficulty == 0 || difficulty >= 64 {
        return Err(ChainError::InvalidDifficulty(difficulty));
    }
    Ok(U256::one() << (256 - difficulty * 4))
}

/// Mining and validation context bound to a single block.
#[derive(Debug)]
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: U256,
    difficulty: u32,
    max_nonce: i64,
    // nonce를 제외한 앞부분. 매 시도마다 다시 만들 필요가 없다
    prefix: Vec<u8>,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(block: &'a Block, difficulty: u32) -> Result<Self> {
        let target = target_for_difficulty(difficulty)?;
        let prefix = concat_fields(&[
            &block.prev_block_hash.as_bytes(),
            &block.hash_transactions().as_bytes(),
            int_to_hex(block.timestamp).as_bytes(),
            int_to_hex(difficulty as i64).as_bytes(),
        ]);

        Ok(ProofOfWork {
            block,
            target,
            difficulty,
            max_nonce: crate::MAX_NONCE,
            prefix,
        })
    }

    // 탐색 상한을 줄인다 (테스트, 짧은 작업 단위)
    pub fn with_max_nonce(mut self, max_nonce: i64) -> Self {
        self.max_nonce = max_nonce.max(0);
        self
    }

    pub fn target(&self) -> U256 {
        self.target
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// prev hash | tx hash | timestamp hex | difficulty hex | nonce hex, no delimiters.
    pub fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        concat_fields(&[&self.prefix, int_to_hex(nonce).as_bytes()])
    }

    fn hash_with(&self, nonce: i64) -> Hash {
        Hash::digest(&self.prepare_data(nonce))
    }

    pub fn run(&self) -> Result<(i64, Hash)> {
        self.run_until(&AtomicBool::new(false))
    }

    /// Searches nonces from 0 upward for the first hash below the target.
    ///
    /// `cancel` is checked once per attempt, before hashing.
    pub fn run_until(&self, cancel: &AtomicBool) -> Result<(i64, Hash)> {
        info!(
            "mining block with {} transactions at difficulty {}",
            self.block.transactions.len(),
            self.difficulty
        );

        let mut nonce = 0;
        while nonce < self.max_nonce {
            if cancel.load(Ordering::Relaxed) {
                warn!("mining cancelled at nonce {}", nonce);
                return Err(ChainError::MiningCancelled(nonce));
            }

            let hash = self.hash_with(nonce);
            trace!("{}", hash);

            if hash.matches_target(self.target) {
                info!("block mined: nonce {} hash {}", nonce, hash);
                return Ok((nonce, hash));
            }

            nonce += 1;
            if nonce % PROGRESS_INTERVAL == 0 {
                debug!("tried {} nonces", nonce);
            }
        }

        warn!("nonce space exhausted after {} attempts", self.max_nonce);
        Err(ChainError::NonceExhausted(self.max_nonce))
    }

    // block에 기록된 nonce로 다시 계산해서 target 미만인지 확인
    pub fn validate(&self) -> bool {
        self.hash_with(self.block.nonce).matches_target(self.target)
    }
}
