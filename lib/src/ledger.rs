//! Collaborator boundaries for transaction assembly: the spendable-output
//! query and the address codec, plus in-memory implementations of both.

use crate::error::{ChainError, Result};
use crate::types::{Transaction, TxOutput};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outputs a ledger hands out for one transaction build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableOutputs {
    /// sum of the values of every output listed below
    pub accumulated: u64,
    /// hex tx id -> output indices
    pub outputs: BTreeMap<String, Vec<i64>>,
}

pub trait Ledger {
    /// Outputs owned by `address` worth at least `amount` when available.
    ///
    /// The returned outputs are treated as reserved for the caller's build.
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs>;
}

pub trait AddressCodec {
    fn decode(&self, address: &str) -> Result<Vec<u8>>;
    fn encode(&self, raw: &[u8]) -> Result<String>;
}

// 주소 문자열을 그대로 바이트로 쓰는 codec
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8AddressCodec;

impl AddressCodec for Utf8AddressCodec {
    fn decode(&self, address: &str) -> Result<Vec<u8>> {
        if address.is_empty() {
            return Err(ChainError::InvalidAddress("empty address".to_owned()));
        }
        Ok(address.as_bytes().to_vec())
    }

    fn encode(&self, raw: &[u8]) -> Result<String> {
        String::from_utf8(raw.to_vec()).map_err(|e| ChainError::InvalidAddress(e.to_string()))
    }
}

/// In-memory unspent output set keyed by hex tx id and output index.
#[derive(Clone, Debug, Default)]
pub struct UtxoSet<C = Utf8AddressCodec> {
    utxos: BTreeMap<String, BTreeMap<i64, TxOutput>>,
    codec: C,
}

impl UtxoSet<Utf8AddressCodec> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: AddressCodec> UtxoSet<C> {
    pub fn with_codec(codec: C) -> Self {
        UtxoSet {
            utxos: BTreeMap::new(),
            codec,
        }
    }

    /// Applies a transaction included in a block: spent outputs are removed and
    /// new outputs added.
    ///
    /// Every input must name an unspent output, at most once, and the tx id must
    /// not already be present. On error the set is left unchanged.
    pub fn apply(&mut self, transaction: &Transaction) -> Result<()> {
        let id = transaction.id().to_string();
        if self.utxos.contains_key(&id) {
            return Err(ChainError::DuplicateTransaction(id));
        }

        let mut spent: BTreeSet<(String, i64)> = BTreeSet::new();
        if !transaction.is_coinbase() {
            for input in transaction.inputs() {
                let txid = hex::encode(&input.txid);
                let unspent = self
                    .utxos
                    .get(&txid)
                    .is_some_and(|outs| outs.contains_key(&input.vout));
                // 같은 tx 안에서 같은 output을 두 번 쓰는 것도 막는다
                if !unspent || !spent.insert((txid.clone(), input.vout)) {
                    return Err(ChainError::UnknownOutput {
                        txid,
                        vout: input.vout,
                    });
                }
            }
        }

        // 검사를 모두 통과한 뒤에만 변경
        for (txid, vout) in spent {
            if let Some(outs) = self.utxos.get_mut(&txid) {
                outs.remove(&vout);
                if outs.is_empty() {
                    self.utxos.remove(&txid);
                }
            }
        }

        let outs: BTreeMap<i64, TxOutput> = transaction
            .outputs()
            .iter()
            .enumerate()
            .map(|(index, output)| (index as i64, output.clone()))
            .collect();
        if !outs.is_empty() {
            self.utxos.insert(id, outs);
        }
        debug!("applied transaction {}", transaction.id());
        Ok(())
    }

    pub fn balance(&self, address: &str) -> Result<u64> {
        let pub_key_hash = self.codec.decode(address)?;
        Ok(self
            .utxos
            .values()
            .flat_map(|outs| outs.values())
            .filter(|output| output.is_locked_with_key(&pub_key_hash))
            .map(|output| output.value)
            .sum())
    }

    pub fn len(&self) -> usize {
        self.utxos.values().map(|outs| outs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

impl<C: AddressCodec> Ledger for UtxoSet<C> {
    fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs> {
        let pub_key_hash = self.codec.decode(address)?;
        let mut spendable = SpendableOutputs::default();

        // amount를 채우는 순간 멈춘다. 같은 output을 두 번 고르지 않는다
        'collect: for (txid, outs) in &self.utxos {
            for (&index, output) in outs {
                if spendable.accumulated >= amount {
                    break 'collect;
                }
                if output.is_locked_with_key(&pub_key_hash) {
                    spendable.accumulated += output.value;
                    spendable.outputs.entry(txid.clone()).or_default().push(index);
                }
            }
        }

        debug!(
            "spendable outputs for {}: {} of {} requested",
            address, spendable.accumulated, amount
        );
        Ok(spendable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionBuilder, TxInput};

    fn funded(addresses: &[&str]) -> UtxoSet {
        let mut utxos = UtxoSet::new();
        for (i, address) in addresses.iter().enumerate() {
            let tx = Transaction::new_coinbase(address, &format!("block {}", i), &Utf8AddressCodec)
                .unwrap();
            utxos.apply(&tx).unwrap();
        }
        utxos
    }

    #[test]
    fn codec_round_trip_and_rejects_empty() {
        let codec = Utf8AddressCodec;
        let raw = codec.decode("alice").unwrap();
        assert_eq!(codec.encode(&raw).unwrap(), "alice");
        assert!(matches!(codec.decode(""), Err(ChainError::InvalidAddress(_))));
        assert!(matches!(codec.encode(&[0xff, 0xfe]), Err(ChainError::InvalidAddress(_))));
    }

    #[test]
    fn coinbase_funds_the_recipient() {
        let utxos = funded(&["alice"]);
        assert_eq!(utxos.balance("alice").unwrap(), crate::SUBSIDY);
        assert_eq!(utxos.balance("bob").unwrap(), 0);
        assert_eq!(utxos.len(), 1);
    }

    #[test]
    fn selection_stops_once_amount_is_covered() {
        let utxos = funded(&["alice", "alice", "alice"]);

        let spendable = utxos.find_spendable_outputs("alice", 15).unwrap();

        assert_eq!(spendable.accumulated, 20);
        let picked: usize = spendable.outputs.values().map(|outs| outs.len()).sum();
        assert_eq!(picked, 2);
    }

    #[test]
    fn selection_reports_shortfall() {
        let utxos = funded(&["alice"]);
        let spendable = utxos.find_spendable_outputs("alice", 25).unwrap();
        assert_eq!(spendable.accumulated, 10);
    }

    #[test]
    fn applying_a_transfer_moves_value() {
        let mut utxos = funded(&["alice", "alice"]);

        let tx = Transaction::new_transfer("alice", "bob", 12, &utxos, &Utf8AddressCodec).unwrap();
        utxos.apply(&tx).unwrap();

        assert_eq!(utxos.balance("alice").unwrap(), 8);
        assert_eq!(utxos.balance("bob").unwrap(), 12);
        assert_eq!(utxos.len(), 2);
    }

    #[test]
    fn spent_outputs_are_not_offered_again() {
        let mut utxos = funded(&["alice"]);

        let tx = Transaction::new_transfer("alice", "bob", 10, &utxos, &Utf8AddressCodec).unwrap();
        utxos.apply(&tx).unwrap();

        let err = Transaction::new_transfer("alice", "bob", 1, &utxos, &Utf8AddressCodec)
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::InsufficientFunds {
                required: 1,
                available: 0
            }
        ));
    }

    #[test]
    fn same_coinbase_twice_is_rejected() {
        let mut utxos = UtxoSet::new();
        let first = Transaction::new_coinbase("alice", "", &Utf8AddressCodec).unwrap();
        let second = Transaction::new_coinbase("alice", "", &Utf8AddressCodec).unwrap();
        assert_eq!(first.id(), second.id());

        utxos.apply(&first).unwrap();
        let err = utxos.apply(&second).unwrap_err();

        assert!(matches!(
            err,
            ChainError::DuplicateTransaction(id) if id == first.id().to_string()
        ));
        assert_eq!(utxos.balance("alice").unwrap(), crate::SUBSIDY);
    }

    #[test]
    fn double_spend_from_one_snapshot_is_rejected() {
        let mut utxos = funded(&["alice"]);
        let to_bob =
            Transaction::new_transfer("alice", "bob", 10, &utxos, &Utf8AddressCodec).unwrap();
        let to_carol =
            Transaction::new_transfer("alice", "carol", 10, &utxos, &Utf8AddressCodec).unwrap();

        utxos.apply(&to_bob).unwrap();
        let before = utxos.clone();
        let err = utxos.apply(&to_carol).unwrap_err();

        assert!(matches!(err, ChainError::UnknownOutput { vout: 0, .. }));
        assert_eq!(utxos.balance("bob").unwrap(), 10);
        assert_eq!(utxos.balance("carol").unwrap(), 0);
        assert_eq!(utxos.len(), before.len());
    }

    #[test]
    fn failed_apply_changes_nothing() {
        let mut utxos = funded(&["alice"]);
        let funding = utxos.find_spendable_outputs("alice", 10).unwrap();
        let (txid, _) = funding.outputs.iter().next().unwrap();
        let pub_key = Utf8AddressCodec.decode("alice").unwrap();

        // 첫 input은 유효하지만 두 번째 input이 없는 output을 가리킨다
        let tx = TransactionBuilder::new()
            .input(TxInput::new(hex::decode(txid).unwrap(), 0, pub_key.clone()))
            .input(TxInput::new(hex::decode(txid).unwrap(), 7, pub_key))
            .output(TxOutput::lock(10, "bob", &Utf8AddressCodec).unwrap())
            .finalize()
            .unwrap();

        assert!(matches!(
            utxos.apply(&tx),
            Err(ChainError::UnknownOutput { vout: 7, .. })
        ));
        assert_eq!(utxos.balance("alice").unwrap(), 10);
        assert_eq!(utxos.balance("bob").unwrap(), 0);
    }

    #[test]
    fn output_spent_twice_in_one_transaction_is_rejected() {
        let mut utxos = funded(&["alice"]);
        let funding = utxos.find_spendable_outputs("alice", 10).unwrap();
        let (txid, _) = funding.outputs.iter().next().unwrap();
        let pub_key = Utf8AddressCodec.decode("alice").unwrap();

        let tx = TransactionBuilder::new()
            .input(TxInput::new(hex::decode(txid).unwrap(), 0, pub_key.clone()))
            .input(TxInput::new(hex::decode(txid).unwrap(), 0, pub_key))
            .output(TxOutput::lock(20, "bob", &Utf8AddressCodec).unwrap())
            .finalize()
            .unwrap();

        assert!(matches!(
            utxos.apply(&tx),
            Err(ChainError::UnknownOutput { vout: 0, .. })
        ));
        assert_eq!(utxos.balance("alice").unwrap(), 10);
    }
}
