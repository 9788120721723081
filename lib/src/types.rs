mod block;
mod transaction;

pub use block::Block;
pub use transaction::{Transaction, TransactionBuilder, TxInput, TxOutput};
