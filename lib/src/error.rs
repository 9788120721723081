use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("invalid difficulty {0}: target shift would be out of range")]
    InvalidDifficulty(u32),
    #[error("nonce space exhausted after {0} attempts")]
    NonceExhausted(i64),
    #[error("mining cancelled at nonce {0}")]
    MiningCancelled(i64),
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },
    #[error("serialization failure: {0}")]
    Serialization(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("transfer amount must be positive")]
    InvalidAmount,
    #[error("mining thread exited without reporting a result")]
    MinerDisconnected,
    #[error("transaction {0} is already in the utxo set")]
    DuplicateTransaction(String),
    #[error("output {txid}:{vout} is not unspent")]
    UnknownOutput { txid: String, vout: i64 },
}

pub type Result<T> = std::result::Result<T, ChainError>;
