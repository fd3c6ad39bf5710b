//! VeChain transactions support.

use crate::utils::{blake2_256, unhex};
use alloy::primitives::{Address, U256};
use alloy_rlp::{BufMut, Bytes, Decodable, Encodable, Header};
use serde::{Deserialize, Serialize};

/// Base gas cost of every transaction.
pub const TX_GAS: u64 = 5_000;
/// Gas cost of a single clause calling an existing account.
pub const CLAUSE_GAS: u64 = 16_000;
/// Gas cost of a single contract-creation clause.
pub const CLAUSE_GAS_CONTRACT_CREATION: u64 = 48_000;
/// Gas cost of transmitting one zero byte of clause data.
pub const ZERO_DATA_GAS: u64 = 4;
/// Gas cost of transmitting one non-zero byte of clause data.
pub const NON_ZERO_DATA_GAS: u64 = 68;

/// Type tag prefixing the RLP payload of dynamic-fee transactions.
pub const DYNAMIC_FEE_TX_TYPE: u8 = 0x51;

fn lstrip<S: AsRef<[u8]>>(bytes: S) -> Vec<u8> {
    bytes
        .as_ref()
        .iter()
        .skip_while(|&&x| x == 0)
        .copied()
        .collect()
}

/// Recipient of a clause.
///
/// Clauses built from user input may carry a vet.domains name instead of a
/// concrete address; names are resolved (best-effort) while building the
/// transaction body and rejected when the wire transaction is constructed.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseTo {
    /// On-chain account address.
    Address(Address),
    /// Human-readable name, e.g. `example.vet`.
    Name(String),
}

impl ClauseTo {
    /// Concrete address, if already resolved.
    pub const fn address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            Self::Name(_) => None,
        }
    }

    /// Is this recipient an unresolved name?
    pub const fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }
}

impl From<Address> for ClauseTo {
    fn from(address: Address) -> Self {
        Self::Address(address)
    }
}

impl From<String> for ClauseTo {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&str> for ClauseTo {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Represents a single transaction clause (recipient, value and data).
#[serde_with::serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// Recipient. [`None`] deploys a contract.
    pub to: Option<ClauseTo>,
    /// Amount of funds to spend.
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub value: U256,
    /// Contract code or call data.
    #[serde_as(as = "unhex::Hex")]
    pub data: Bytes,
}

impl Clause {
    /// Shortcut for a simple transfer clause.
    pub fn transfer(recipient: Address, value: U256) -> Self {
        Self {
            to: Some(recipient.into()),
            value,
            data: Bytes::new(),
        }
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        match &self.to {
            Some(ClauseTo::Address(address)) => address.encode(out),
            // Names are rejected before a wire transaction can exist.
            Some(ClauseTo::Name(_)) | None => Bytes::new().encode(out),
        }
        Bytes::from(lstrip(self.value.to_be_bytes::<32>())).encode(out);
        self.data.encode(out);
    }
}

impl Encodable for Clause {
    fn encode(&self, out: &mut dyn BufMut) {
        let mut enc = vec![];
        self.encode_fields(&mut enc);
        Header {
            list: true,
            payload_length: enc.len(),
        }
        .encode(out);
        out.put_slice(&enc);
    }
}

impl Decodable for Clause {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let to = Bytes::decode(&mut payload)?;
        let to = if to.is_empty() {
            None
        } else if to.len() == Address::len_bytes() {
            Some(ClauseTo::Address(Address::from_slice(&to)))
        } else {
            return Err(alloy_rlp::Error::UnexpectedLength);
        };
        let value = Bytes::decode(&mut payload)?;
        let value = U256::try_from_be_slice(&value).ok_or(alloy_rlp::Error::Overflow)?;
        let data = Bytes::decode(&mut payload)?;
        Ok(Self { to, value, data })
    }
}

/// Fully determined fee specification of a transaction.
///
/// Produced by the fee resolver; a transaction body can never hold an
/// inconsistent mix of legacy and dynamic fee fields.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FeeSpec {
    /// Legacy fee market: a 0-255 coefficient scaling the base gas price.
    Legacy {
        /// Coefficient used to calculate the final gas price.
        gas_price_coef: u8,
    },
    /// Dynamic fee market available after the Galactica hard fork.
    Dynamic {
        /// Cap on the total fee per unit of gas.
        max_fee_per_gas: U256,
        /// Cap on the priority (tip) component per unit of gas.
        max_priority_fee_per_gas: U256,
    },
}

impl FeeSpec {
    /// Does this specification use the post-Galactica fee market?
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }

    /// Legacy coefficient, if this is a legacy specification.
    pub const fn gas_price_coef(&self) -> Option<u8> {
        match self {
            Self::Legacy { gas_price_coef } => Some(*gas_price_coef),
            Self::Dynamic { .. } => None,
        }
    }

    /// Total fee cap, if this is a dynamic specification.
    pub const fn max_fee_per_gas(&self) -> Option<U256> {
        match self {
            Self::Dynamic {
                max_fee_per_gas, ..
            } => Some(*max_fee_per_gas),
            Self::Legacy { .. } => None,
        }
    }

    /// Priority fee cap, if this is a dynamic specification.
    pub const fn max_priority_fee_per_gas(&self) -> Option<U256> {
        match self {
            Self::Dynamic {
                max_priority_fee_per_gas,
                ..
            } => Some(*max_priority_fee_per_gas),
            Self::Legacy { .. } => None,
        }
    }
}

impl Default for FeeSpec {
    fn default() -> Self {
        Self::Legacy { gas_price_coef: 0 }
    }
}

/// Represents a transaction's `reserved` field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Reserved {
    /// Features to enable.
    pub features: u32,
    /// Currently unused fields.
    pub unused: Vec<Bytes>,
}

impl Reserved {
    /// Feature bit marking a fee-delegated transaction.
    pub const FEATURE_DELEGATED: u32 = 1;

    /// Reserved field of a fee-delegated transaction.
    pub fn new_delegated() -> Self {
        Self {
            features: Self::FEATURE_DELEGATED,
            unused: vec![],
        }
    }

    /// Is the fee-delegation feature enabled?
    pub const fn is_delegated(&self) -> bool {
        self.features & Self::FEATURE_DELEGATED != 0
    }
}

impl Encodable for Reserved {
    fn encode(&self, out: &mut dyn BufMut) {
        let mut fields: Vec<Bytes> = vec![lstrip(self.features.to_be_bytes()).into()];
        fields.extend(self.unused.iter().cloned());
        // Trailing empty fields must be trimmed from the encoding.
        while matches!(fields.last(), Some(last) if last.is_empty()) {
            fields.pop();
        }
        let mut enc = vec![];
        for field in &fields {
            field.encode(&mut enc);
        }
        Header {
            list: true,
            payload_length: enc.len(),
        }
        .encode(out);
        out.put_slice(&enc);
    }
}

impl Decodable for Reserved {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let mut fields = vec![];
        while !payload.is_empty() {
            fields.push(Bytes::decode(&mut payload)?);
        }
        let features = match fields.first() {
            Some(bytes) if bytes.len() <= 4 => {
                let mut padded = [0u8; 4];
                padded[4 - bytes.len()..].copy_from_slice(bytes);
                u32::from_be_bytes(padded)
            }
            Some(_) => return Err(alloy_rlp::Error::Overflow),
            None => 0,
        };
        let unused = fields.into_iter().skip(1).collect();
        Ok(Self { features, unused })
    }
}

/// The fully resolved structure submitted for signing.
///
/// Never mutated after creation; consumed once by the signer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionBody {
    /// Last byte of the genesis block id.
    pub chain_tag: u8,
    /// First 8 bytes of some recent block id, the expiration anchor.
    pub block_ref: u64,
    /// Expiration relative to `block_ref`, in blocks.
    pub expiration: u32,
    /// Transaction clauses.
    pub clauses: Vec<Clause>,
    /// Maximal amount of gas to spend for the transaction.
    pub gas: u64,
    /// Fee specification: legacy coefficient or dynamic caps.
    pub fee: FeeSpec,
    /// Id of the transaction this one depends on.
    pub depends_on: Option<U256>,
    /// Transaction nonce.
    pub nonce: u64,
    /// Reserved fields (fee delegation).
    pub reserved: Option<Reserved>,
}

impl TransactionBody {
    /// First clause recipient that is still an unresolved name, if any.
    pub fn unresolved_name(&self) -> Option<&str> {
        self.clauses.iter().find_map(|clause| match &clause.to {
            Some(ClauseTo::Name(name)) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Is fee delegation requested?
    pub fn is_delegated(&self) -> bool {
        self.reserved
            .as_ref()
            .is_some_and(Reserved::is_delegated)
    }
}

/// Errors preventing a transaction from being encoded for the wire.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TransactionError {
    /// A clause recipient is a name the builder could not resolve.
    #[error("clause recipient '{0}' is an unresolved name")]
    UnresolvedName(String),
    /// Operation requires a signature, and the transaction has none.
    #[error("transaction must be signed first")]
    Unsigned,
    /// Provided signature has a wrong length.
    #[error("signature must be 65 bytes long (130 for delegated transactions)")]
    InvalidSignature,
}

/// A transaction body together with its optional signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    /// Resolved transaction body.
    pub body: TransactionBody,
    /// 65 bytes, or 130 bytes for delegated transactions.
    /// [`None`] before signing.
    pub signature: Option<Bytes>,
}

impl Transaction {
    /// Wrap a body, rejecting clauses with unresolved name recipients.
    pub fn new(body: TransactionBody) -> Result<Self, TransactionError> {
        match body.unresolved_name() {
            Some(name) => Err(TransactionError::UnresolvedName(name.to_string())),
            None => Ok(Self {
                body,
                signature: None,
            }),
        }
    }

    /// Attach a signature, validating its length against the fee-delegation
    /// feature of the body.
    pub fn with_signature(mut self, signature: Bytes) -> Result<Self, TransactionError> {
        let expected = if self.body.is_delegated() { 130 } else { 65 };
        if signature.len() != expected {
            return Err(TransactionError::InvalidSignature);
        }
        self.signature = Some(signature);
        Ok(self)
    }

    /// Is a signature attached?
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Blake2b-256 hash of the unsigned encoding, the message to sign.
    pub fn signing_hash(&self) -> [u8; 32] {
        let unsigned = Self {
            body: self.body.clone(),
            signature: None,
        };
        let mut enc = vec![];
        unsigned.encode(&mut enc);
        blake2_256(&[enc])
    }

    /// Intrinsic gas of the transaction's clauses.
    pub fn intrinsic_gas(&self) -> u64 {
        intrinsic_gas(&self.body.clauses)
    }

    /// Encoded bytes ready for broadcasting, available for signed
    /// transactions only.
    pub fn to_broadcastable_bytes(&self) -> Result<Bytes, TransactionError> {
        if !self.is_signed() {
            return Err(TransactionError::Unsigned);
        }
        let mut enc = vec![];
        self.encode(&mut enc);
        Ok(enc.into())
    }

    fn encode_fields(&self, out: &mut dyn BufMut) {
        let body = &self.body;
        body.chain_tag.encode(out);
        body.block_ref.encode(out);
        body.expiration.encode(out);
        body.clauses.encode(out);
        match body.fee {
            FeeSpec::Legacy { gas_price_coef } => gas_price_coef.encode(out),
            FeeSpec::Dynamic {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                max_priority_fee_per_gas.encode(out);
                max_fee_per_gas.encode(out);
            }
        }
        body.gas.encode(out);
        match body.depends_on {
            Some(id) => Bytes::copy_from_slice(&id.to_be_bytes::<32>()).encode(out),
            None => Bytes::new().encode(out),
        }
        body.nonce.encode(out);
        match &body.reserved {
            Some(reserved) => reserved.encode(out),
            None => Header {
                list: true,
                payload_length: 0,
            }
            .encode(out),
        }
        if let Some(signature) = &self.signature {
            signature.encode(out);
        }
    }
}

impl Encodable for Transaction {
    fn encode(&self, out: &mut dyn BufMut) {
        if self.body.fee.is_dynamic() {
            out.put_u8(DYNAMIC_FEE_TX_TYPE);
        }
        let mut enc = vec![];
        self.encode_fields(&mut enc);
        Header {
            list: true,
            payload_length: enc.len(),
        }
        .encode(out);
        out.put_slice(&enc);
    }
}

impl Decodable for Transaction {
    fn decode(buf: &mut &[u8]) -> alloy_rlp::Result<Self> {
        let dynamic = buf.first() == Some(&DYNAMIC_FEE_TX_TYPE);
        if dynamic {
            *buf = &buf[1..];
        }
        let header = Header::decode(buf)?;
        if !header.list {
            return Err(alloy_rlp::Error::UnexpectedString);
        }
        if buf.len() < header.payload_length {
            return Err(alloy_rlp::Error::InputTooShort);
        }
        let mut payload = &buf[..header.payload_length];
        *buf = &buf[header.payload_length..];

        let chain_tag = u8::decode(&mut payload)?;
        let block_ref = u64::decode(&mut payload)?;
        let expiration = u32::decode(&mut payload)?;
        let clauses = Vec::<Clause>::decode(&mut payload)?;
        let fee = if dynamic {
            let max_priority_fee_per_gas = U256::decode(&mut payload)?;
            let max_fee_per_gas = U256::decode(&mut payload)?;
            FeeSpec::Dynamic {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            }
        } else {
            FeeSpec::Legacy {
                gas_price_coef: u8::decode(&mut payload)?,
            }
        };
        let gas = u64::decode(&mut payload)?;
        let depends_on = Bytes::decode(&mut payload)?;
        let depends_on = if depends_on.is_empty() {
            None
        } else {
            Some(U256::try_from_be_slice(&depends_on).ok_or(alloy_rlp::Error::Overflow)?)
        };
        let nonce = u64::decode(&mut payload)?;
        let reserved = Reserved::decode(&mut payload)?;
        let reserved = (reserved != Reserved::default()).then_some(reserved);
        let signature = if payload.is_empty() {
            None
        } else {
            Some(Bytes::decode(&mut payload)?)
        };
        Ok(Self {
            body: TransactionBody {
                chain_tag,
                block_ref,
                expiration,
                clauses,
                gas,
                fee,
                depends_on,
                nonce,
                reserved,
            },
            signature,
        })
    }
}

/// Intrinsic gas required by a set of clauses, before any execution.
pub fn intrinsic_gas(clauses: &[Clause]) -> u64 {
    if clauses.is_empty() {
        return TX_GAS + CLAUSE_GAS;
    }
    clauses.iter().fold(TX_GAS, |sum, clause| {
        let clause_gas = if clause.to.is_some() {
            CLAUSE_GAS
        } else {
            CLAUSE_GAS_CONTRACT_CREATION
        };
        sum + clause_gas + data_gas(&clause.data)
    })
}

fn data_gas(data: &[u8]) -> u64 {
    data.iter()
        .map(|byte| {
            if *byte == 0 {
                ZERO_DATA_GAS
            } else {
                NON_ZERO_DATA_GAS
            }
        })
        .sum()
}
