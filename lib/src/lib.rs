use serde::{Deserialize, Serialize};
use uint::construct_uint;

pub mod error;
pub mod ledger;
pub mod miner;
pub mod pow;
pub mod sha256;
pub mod types;
pub mod util;

pub use error::ChainError;
pub use ledger::{AddressCodec, Ledger, SpendableOutputs, Utf8AddressCodec, UtxoSet};
pub use miner::MiningWorker;
pub use pow::{ProofOfWork, target_for_difficulty};
pub use sha256::Hash;
pub use types::{Block, Transaction, TransactionBuilder, TxInput, TxOutput};

construct_uint! {
    #[derive(Serialize, Deserialize)]
    pub struct U256(4);
}

// 해시 앞자리에 필요한 16진수 0의 개수
pub const DIFFICULTY: u32 = 6;

// nonce 탐색 상한. 사실상 무한하지만 유한하다
pub const MAX_NONCE: i64 = i64::MAX;

// coinbase tx 하나가 새로 만들어내는 보상
pub const SUBSIDY: u64 = 10;
