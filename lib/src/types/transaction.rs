use crate::error::{ChainError, Result};
use crate::ledger::{AddressCodec, Ledger};
use crate::sha256::Hash;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    /// input으로 사용할 이전 tx의 id. coinbase라면 비어 있다
    pub txid: Vec<u8>,
    /// 이전 tx의 output index. coinbase라면 -1
    pub vout: i64,
    /// 서명은 외부 signing 단계에서 채운다
    pub signature: Option<Vec<u8>>,
    pub pub_key: Vec<u8>,
}

impl TxInput {
    pub fn new(txid: Vec<u8>, vout: i64, pub_key: Vec<u8>) -> Self {
        TxInput {
            txid,
            vout,
            signature: None,
            pub_key,
        }
    }

    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key == pub_key_hash
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub pub_key_hash: Vec<u8>,
}

impl TxOutput {
    // address를 codec으로 풀어서 output을 잠근다
    pub fn lock<C: AddressCodec>(value: u64, address: &str, codec: &C) -> Result<Self> {
        Ok(TxOutput {
            value,
            pub_key_hash: codec.decode(address)?,
        })
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash == pub_key_hash
    }
}

// id 계산에 들어가는 내용. finalize와 has_valid_id가 같은 인코딩을 쓴다
#[derive(Serialize)]
struct TxContent<'a> {
    inputs: &'a [TxInput],
    outputs: &'a [TxOutput],
}

/// A transaction whose inputs and outputs are still being assembled.
///
/// `finalize` consumes the builder, so an ID can be assigned exactly once.
#[derive(Clone, Debug, Default)]
pub struct TransactionBuilder {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: TxInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: TxOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn finalize(self) -> Result<Transaction> {
        let id = Hash::hash(&TxContent {
            inputs: &self.inputs,
            outputs: &self.outputs,
        })?;
        Ok(Transaction {
            id,
            inputs: self.inputs,
            outputs: self.outputs,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    id: Hash,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn id(&self) -> Hash {
        self.id
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].txid.is_empty() && self.inputs[0].vout == -1
    }

    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|output| output.value).sum()
    }

    // 저장소나 네트워크에서 받은 tx의 id가 내용과 일치하는지 다시 계산해본다
    pub fn has_valid_id(&self) -> Result<bool> {
        let expected = Hash::hash(&TxContent {
            inputs: &self.inputs,
            outputs: &self.outputs,
        })?;
        Ok(expected == self.id)
    }

    /// Builds the reward transaction that introduces `SUBSIDY` new coins.
    ///
    /// The single input references nothing (empty txid, vout -1) and carries
    /// `data` as its payload; an empty `data` becomes `Reward to '<to>'`.
    pub fn new_coinbase<C: AddressCodec>(to: &str, data: &str, codec: &C) -> Result<Self> {
        let data = if data.is_empty() {
            format!("Reward to '{}'", to)
        } else {
            data.to_owned()
        };

        TransactionBuilder::new()
            .input(TxInput::new(vec![], -1, data.into_bytes()))
            .output(TxOutput::lock(crate::SUBSIDY, to, codec)?)
            .finalize()
    }

    /// Builds a transfer of `amount` from `from` to `to`, funded by the outputs
    /// the ledger reports as spendable for `from`.
    pub fn new_transfer<L: Ledger, C: AddressCodec>(
        from: &str,
        to: &str,
        amount: u64,
        ledger: &L,
        codec: &C,
    ) -> Result<Self> {
        if amount == 0 {
            return Err(ChainError::InvalidAmount);
        }

        let spendable = ledger.find_spendable_outputs(from, amount)?;

        // 잔액 부족이면 tx를 만들기 전에 중단
        if spendable.accumulated < amount {
            return Err(ChainError::InsufficientFunds {
                required: amount,
                available: spendable.accumulated,
            });
        }

        let pub_key = codec.decode(from)?;
        let mut builder = TransactionBuilder::new();

        for (txid, outs) in &spendable.outputs {
            let decoded_txid = hex::decode(txid).map_err(|e| {
                ChainError::Serialization(format!("malformed txid {}: {}", txid, e))
            })?;
            for &out in outs {
                builder = builder.input(TxInput::new(decoded_txid.clone(), out, pub_key.clone()));
            }
        }

        builder = builder.output(TxOutput::lock(amount, to, codec)?);

        // 거스름돈은 남는 값이 있을 때만 보낸 사람에게 되돌린다
        if spendable.accumulated > amount {
            builder = builder.output(TxOutput::lock(spendable.accumulated - amount, from, codec)?);
        }

        builder.finalize()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--- Transaction {}:", self.id)?;
        for (i, input) in self.inputs.iter().enumerate() {
            writeln!(f, "     Input {}:", i)?;
            writeln!(f, "       TXID:      {}", hex::encode(&input.txid))?;
            writeln!(f, "       Out:       {}", input.vout)?;
            writeln!(f, "       PubKey:    {}", hex::encode(&input.pub_key))?;
        }
        for (i, output) in self.outputs.iter().enumerate() {
            writeln!(f, "     Output {}:", i)?;
            writeln!(f, "       Value:  {}", output.value)?;
            writeln!(f, "       Script: {}", hex::encode(&output.pub_key_hash))?;
        }
        Ok(())
    }
}
