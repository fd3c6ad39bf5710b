//! Module for interacting with node HTTP APIs.

use crate::fees::{FeeHistory, FeeHistorySource, FeeHistoryOptions, ForkDetector};
use crate::gas::{ChainSimulator, SimulateOptions};
use crate::submit::{Broadcaster, ReceiptSource};
use crate::transaction_builder::{BlockSource, NameResolver};
use crate::transactions::{Clause, Transaction};
use crate::utils::unhex;
use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{Address, U256};
use alloy_rlp::{Bytes, Decodable};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

/// Errors of node communication.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NetworkError {
    /// Connection-level failure (DNS, TLS, timeouts, malformed HTTP).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Node answered with a payload we cannot parse.
    #[error("malformed node response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Request URL could not be constructed.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
    /// Node answered with a server error (HTTP 5xx).
    #[error("node unavailable: {0}")]
    Unavailable(String),
    /// Node rejected a broadcasted transaction.
    #[error("failed to broadcast: {0}")]
    BroadcastFailed(String),
    /// Any other unexpected node behaviour.
    #[error("unexpected node response: {0}")]
    Unexpected(String),
}

impl NetworkError {
    /// Is retrying this request later reasonable?
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Unavailable(_))
    }
}

/// A simple HTTP REST client for a VeChain node.
#[derive(Clone, Debug)]
pub struct ThorNode {
    /// API base url
    pub base_url: Url,
    /// Chain tag used for this network.
    pub chain_tag: u8,
    /// vet.domains resolve-utils contract, if deployed on this network.
    pub name_resolver: Option<Address>,
}

/// Block reference: a way to identify the block on the chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BlockReference {
    /// Latest: already approved by some node, but not finalized yet.
    Best,
    /// Finalized: block is frozen on chain.
    Finalized,
    /// The block currently being assembled on top of the best one.
    Next,
    /// Block ordinal number (1..)
    Number(u64),
    /// Block ID
    ID(U256),
}

impl BlockReference {
    pub(crate) fn as_query_param(&self) -> String {
        match self {
            BlockReference::Best => "best".to_string(),
            BlockReference::Finalized => "finalized".to_string(),
            BlockReference::Next => "next".to_string(),
            BlockReference::Number(num) => format!("0x{num:02x}"),
            BlockReference::ID(id) => format!("0x{id:064x}"),
        }
    }
}

/// Transaction metadata
#[serde_with::serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    /// Block identifier
    #[serde(rename = "blockID")]
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub block_id: U256,
    /// Block number (height)
    pub block_number: u32,
    /// Block unix timestamp
    pub block_timestamp: u32,
}

/// Transaction receipt metadata
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    /// Block identifier
    #[serde(rename = "blockID")]
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub block_id: U256,
    /// Block number (height)
    pub block_number: u32,
    /// Block unix timestamp
    pub block_timestamp: u32,
    /// Transaction identifier
    #[serde(rename = "txID")]
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub tx_id: U256,
    /// Transaction origin (signer)
    pub tx_origin: Address,
}

/// Transaction receipt
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Amount of gas consumed by this transaction
    pub gas_used: u64,
    /// Address of account who paid used gas
    pub gas_payer: Address,
    /// Hex form of amount of paid energy
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub paid: U256,
    /// Hex form of amount of reward
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub reward: U256,
    /// true means the transaction was reverted
    pub reverted: bool,
    /// Outputs (if this transaction was a contract call)
    pub outputs: Vec<ReceiptOutput>,
    /// Block and transaction identification
    pub meta: ReceiptMeta,
}

/// Single output in the transaction receipt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptOutput {
    /// Deployed contract address, if the corresponding clause is a contract deployment clause
    pub contract_address: Option<Address>,
    /// Emitted contract events
    pub events: Vec<Event>,
    /// Transfers executed during the contract call
    pub transfers: Vec<Transfer>,
}

/// Emitted contract event
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The address of contract which produces the event
    pub address: Address,
    /// Event topics
    #[serde_as(as = "Vec<unhex::HexNum<32, U256>>")]
    pub topics: Vec<U256>,
    /// Event data
    #[serde_as(as = "unhex::Hex")]
    pub data: Bytes,
}

/// Single transfer during the contract call
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Address that sends tokens
    pub sender: Address,
    /// Address that receives tokens
    pub recipient: Address,
    /// Amount of tokens
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub amount: U256,
}

/// A blockchain block.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// Block number (height)
    pub number: u32,
    /// Block identifier
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub id: U256,
    /// RLP encoded block size in bytes
    pub size: u32,
    /// Parent block ID
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    #[serde(rename = "parentID")]
    pub parent_id: U256,
    /// Block unix timestamp
    pub timestamp: u32,
    /// Block gas limit (max allowed accumulative gas usage of transactions)
    pub gas_limit: u32,
    /// Address of account to receive block reward
    pub beneficiary: Address,
    /// Accumulative gas usage of transactions
    pub gas_used: u32,
    /// Base fee per unit of gas, present after the Galactica fork only.
    #[serde_as(as = "Option<unhex::HexNum<32, U256>>")]
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
    /// Sum of all ancestral blocks' score
    pub total_score: u32,
    /// Root hash of transactions in the block
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub txs_root: U256,
    /// Supported txs features bitset
    pub txs_features: u32,
    /// Root hash of accounts state
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub state_root: U256,
    /// Root hash of transaction receipts
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub receipts_root: U256,
    /// Is in trunk?
    pub is_trunk: bool,
    /// Is finalized?
    pub is_finalized: bool,
    /// The one who signed this block
    pub signer: Address,
}

impl BlockInfo {
    pub const fn block_ref(&self) -> u64 {
        //! Extract blockRef for transaction.
        self.id.as_limbs()[3]
    }
}

/// Account details
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// VET balance
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub balance: U256,
    /// VTHO balance
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub energy: U256,
    /// Is a contract?
    pub has_code: bool,
}

/// Result of a single clause execution simulation.
#[serde_with::serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    /// Output data
    #[serde_as(as = "unhex::Hex")]
    pub data: Bytes,
    /// Emitted events
    pub events: Vec<Event>,
    /// Executed transfers
    pub transfers: Vec<Transfer>,
    /// Gas spent
    pub gas_used: u64,
    /// Will be reverted?
    pub reverted: bool,
    /// Error description returned by VM
    pub vm_error: String,
}

#[serde_with::serde_as]
#[derive(Deserialize)]
struct RawTxResponse {
    #[serde_as(as = "unhex::Hex")]
    raw: Bytes,
    meta: Option<TransactionMeta>,
}

#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
struct BlockResponse {
    #[serde(flatten)]
    base: BlockInfo,
    #[serde_as(as = "Vec<unhex::HexNum<32, U256>>")]
    transactions: Vec<U256>,
}

#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
struct TransactionBroadcastRequest {
    #[serde_as(as = "unhex::Hex")]
    raw: Bytes,
}

#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
struct TransactionIdResponse {
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    id: U256,
}

#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriorityFeeResponse {
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    max_priority_fee_per_gas: U256,
}

/// Transaction execution simulation request
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateCallRequest<'a> {
    clauses: &'a [Clause],
    #[serde(skip_serializing_if = "Option::is_none")]
    gas: Option<u64>,
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<Address>,
    #[serde_as(as = "Option<serde_with::DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    proved_work: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_payer: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<u32>,
    #[serde_as(as = "Option<unhex::HexNum<8, u64>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    block_ref: Option<u64>,
}

fn nullable(text: &str) -> Option<&str> {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    (trimmed != "null").then_some(trimmed)
}

impl ThorNode {
    /// Chain tag for mainnet
    pub const MAINNET_CHAIN_TAG: u8 = 0x4A;
    /// REST API URL for mainnet (one possible)
    pub const MAINNET_BASE_URL: &'static str = "https://mainnet.vechain.org/";
    /// vet.domains resolve-utils contract on mainnet
    pub const MAINNET_NAME_RESOLVER: &'static str = "0xA11413086e163e41901bb81fdc5617c975Fa5a1A";
    /// Chain tag for testnet
    pub const TESTNET_CHAIN_TAG: u8 = 0x27;
    /// REST API URL for testnet (one possible)
    pub const TESTNET_BASE_URL: &'static str = "https://testnet.vechain.org/";
    /// vet.domains resolve-utils contract on testnet
    pub const TESTNET_NAME_RESOLVER: &'static str = "0xc403b8EA53F707d7d4de095f0A20bC491Cf2bc94";

    pub fn mainnet() -> Self {
        //! Mainnet parameters
        Self {
            base_url: Self::MAINNET_BASE_URL.parse().expect("hardcoded URL"),
            chain_tag: Self::MAINNET_CHAIN_TAG,
            name_resolver: Self::MAINNET_NAME_RESOLVER.parse().ok(),
        }
    }

    pub fn testnet() -> Self {
        //! Testnet parameters
        Self {
            base_url: Self::TESTNET_BASE_URL.parse().expect("hardcoded URL"),
            chain_tag: Self::TESTNET_CHAIN_TAG,
            name_resolver: Self::TESTNET_NAME_RESOLVER.parse().ok(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, NetworkError> {
        self.base_url
            .join(path)
            .map_err(|e| NetworkError::InvalidUrl(format!("{path}: {e}")))
    }

    async fn get_text(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, String), NetworkError> {
        let client = Client::new();
        let response = client.get(self.url(path)?).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_server_error() {
            return Err(NetworkError::Unavailable(format!("{status}: {text}")));
        }
        tracing::trace!(path, %status, "GET completed");
        Ok((status, text))
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<String, NetworkError> {
        let client = Client::new();
        let response = client
            .post(self.url(path)?)
            .query(query)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_server_error() {
            return Err(NetworkError::Unavailable(format!("{status}: {text}")));
        }
        tracing::trace!(path, %status, "POST completed");
        Ok(text)
    }

    pub async fn fetch_transaction(
        &self,
        transaction_id: U256,
    ) -> Result<Option<(Transaction, Option<TransactionMeta>)>, NetworkError> {
        //! Retrieve a [`Transaction`] from node by its ID.
        //!
        //! Returns [`None`] for nonexistent transactions.
        //!
        //! Meta can be [`None`] if a transaction was broadcasted, but
        //! not yet included into a block.
        let path = format!("/transactions/0x{transaction_id:064x}");
        let (_, response) = self
            .get_text(&path, &[("raw", "true".to_string())])
            .await?;
        match nullable(&response) {
            None => Ok(None),
            Some(response) => {
                let decoded: RawTxResponse = serde_json::from_str(response)?;
                let tx = Transaction::decode(&mut &decoded.raw[..])
                    .map_err(|e| NetworkError::Unexpected(format!("undecodable raw tx: {e}")))?;
                Ok(Some((tx, decoded.meta)))
            }
        }
    }

    pub async fn fetch_transaction_receipt(
        &self,
        transaction_id: U256,
        head: Option<U256>,
    ) -> Result<Option<Receipt>, NetworkError> {
        //! Retrieve a transaction receipt from node given a transaction ID.
        //!
        //! Returns [`None`] for nonexistent or not mined transactions.
        let path = format!("/transactions/0x{transaction_id:064x}/receipt");
        let query: Vec<(&str, String)> = head
            .map(|head| vec![("head", format!("0x{head:064x}"))])
            .unwrap_or_default();
        let (_, response) = self.get_text(&path, &query).await?;
        match nullable(&response) {
            None => Ok(None),
            Some(response) => Ok(Some(serde_json::from_str(response)?)),
        }
    }

    pub async fn fetch_block(
        &self,
        reference: BlockReference,
    ) -> Result<Option<(BlockInfo, Vec<U256>)>, NetworkError> {
        //! Retrieve a block from node by given identifier.
        //!
        //! Returns [`None`] for nonexistent blocks.
        let path = format!("/blocks/{}", reference.as_query_param());
        let (_, response) = self.get_text(&path, &[]).await?;
        match nullable(&response) {
            None => Ok(None),
            Some(response) => {
                let decoded: BlockResponse = serde_json::from_str(response)?;
                Ok(Some((decoded.base, decoded.transactions)))
            }
        }
    }

    pub async fn fetch_best_block(&self) -> Result<(BlockInfo, Vec<U256>), NetworkError> {
        //! Retrieve a best block from node.
        self.fetch_block(BlockReference::Best)
            .await?
            .ok_or_else(|| NetworkError::Unexpected("best block not found".to_string()))
    }

    pub async fn fetch_account(&self, address: Address) -> Result<AccountInfo, NetworkError> {
        //! Retrieve account details.
        let path = format!("/accounts/{address}");
        let (_, response) = self.get_text(&path, &[]).await?;
        Ok(serde_json::from_str(&response)?)
    }

    pub async fn broadcast_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<U256, NetworkError> {
        //! Broadcast a new [`Transaction`] to the node.
        let raw = transaction
            .to_broadcastable_bytes()
            .map_err(|e| NetworkError::Unexpected(e.to_string()))?;
        self.broadcast_raw(&raw).await
    }
}

#[async_trait]
impl ForkDetector for ThorNode {
    async fn is_galactica_forked(
        &self,
        reference: BlockReference,
    ) -> Result<bool, NetworkError> {
        // The fork announces itself through the base fee on block payloads.
        let block = self.fetch_block(reference).await?;
        Ok(block.is_some_and(|(info, _)| info.base_fee_per_gas.is_some()))
    }
}

#[async_trait]
impl FeeHistorySource for ThorNode {
    async fn get_fee_history(
        &self,
        options: &FeeHistoryOptions,
    ) -> Result<FeeHistory, NetworkError> {
        let mut query = vec![
            ("blockCount", options.block_count.to_string()),
            ("newestBlock", options.newest_block.as_query_param()),
        ];
        if !options.reward_percentiles.is_empty() {
            let percentiles: Vec<String> = options
                .reward_percentiles
                .iter()
                .map(u8::to_string)
                .collect();
            query.push(("rewardPercentiles", percentiles.join(",")));
        }
        let (status, response) = self.get_text("/fees/history", &query).await?;
        if !status.is_success() {
            return Err(NetworkError::Unexpected(format!(
                "fee history request failed with {status}: {response}"
            )));
        }
        Ok(serde_json::from_str(&response)?)
    }

    async fn get_max_priority_fee_per_gas(&self) -> Result<U256, NetworkError> {
        let (status, response) = self.get_text("/fees/priority", &[]).await?;
        if !status.is_success() {
            return Err(NetworkError::Unexpected(format!(
                "priority fee request failed with {status}: {response}"
            )));
        }
        let decoded: PriorityFeeResponse = serde_json::from_str(&response)?;
        Ok(decoded.max_priority_fee_per_gas)
    }

    async fn get_next_block_base_fee_per_gas(&self) -> Result<Option<U256>, NetworkError> {
        let query = [
            ("blockCount", "1".to_string()),
            ("newestBlock", BlockReference::Next.as_query_param()),
        ];
        let (status, response) = self.get_text("/fees/history", &query).await?;
        if !status.is_success() {
            // Pre-fork nodes reject the fee endpoints.
            return Ok(None);
        }
        let history: FeeHistory = serde_json::from_str(&response)?;
        Ok(history.base_fee_per_gas.last().copied())
    }
}

#[async_trait]
impl ChainSimulator for ThorNode {
    async fn simulate(
        &self,
        clauses: &[Clause],
        options: &SimulateOptions,
    ) -> Result<Vec<SimulationOutcome>, NetworkError> {
        let request = SimulateCallRequest {
            clauses,
            gas: options.gas,
            gas_price: options.gas_price,
            caller: options.caller,
            proved_work: options.proved_work,
            gas_payer: options.gas_payer,
            expiration: options.expiration,
            block_ref: options.block_ref,
        };
        let query: Vec<(&str, String)> = options
            .revision
            .as_ref()
            .map(|revision| vec![("revision", revision.as_query_param())])
            .unwrap_or_default();
        let response = self.post_json("/accounts/*", &query, &request).await?;
        Ok(serde_json::from_str(&response)?)
    }
}

#[async_trait]
impl BlockSource for ThorNode {
    async fn get_genesis_block_id(&self) -> Result<Option<U256>, NetworkError> {
        let block = self.fetch_block(BlockReference::Number(0)).await?;
        Ok(block.map(|(info, _)| info.id))
    }

    async fn get_best_block_ref(&self) -> Result<Option<u64>, NetworkError> {
        let block = self.fetch_block(BlockReference::Best).await?;
        Ok(block.map(|(info, _)| info.block_ref()))
    }
}

#[async_trait]
impl NameResolver for ThorNode {
    async fn resolve_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<Address>>, NetworkError> {
        let resolver = self.name_resolver.ok_or_else(|| {
            NetworkError::Unexpected("this network has no name resolver contract".to_string())
        })?;
        let function =
            Function::parse("getAddresses(string[] names) returns (address[] addresses)")
                .map_err(|e| NetworkError::Unexpected(format!("bad resolver ABI: {e}")))?;
        let args = DynSolValue::Array(
            names
                .iter()
                .map(|name| DynSolValue::String(name.clone()))
                .collect(),
        );
        let data = function
            .abi_encode_input(&[args])
            .map_err(|e| NetworkError::Unexpected(format!("cannot encode resolver call: {e}")))?;
        let clauses = [Clause {
            to: Some(resolver.into()),
            value: U256::ZERO,
            data: data.into(),
        }];
        let mut outcomes = self.simulate(&clauses, &SimulateOptions::default()).await?;
        if outcomes.len() != 1 {
            return Err(NetworkError::Unexpected(format!(
                "resolver simulation returned {} outcomes",
                outcomes.len()
            )));
        }
        let outcome = outcomes.remove(0);
        if outcome.reverted {
            return Err(NetworkError::Unexpected(
                "resolver simulation reverted".to_string(),
            ));
        }
        let decoded = function
            .abi_decode_output(&outcome.data)
            .map_err(|e| NetworkError::Unexpected(format!("cannot decode resolver output: {e}")))?;
        let addresses = match decoded.first() {
            Some(DynSolValue::Array(items)) => items
                .iter()
                .map(|item| match item {
                    DynSolValue::Address(address) if !address.is_zero() => Some(*address),
                    _ => None,
                })
                .collect(),
            _ => {
                return Err(NetworkError::Unexpected(
                    "resolver output is not an address array".to_string(),
                ))
            }
        };
        Ok(addresses)
    }
}

#[async_trait]
impl Broadcaster for ThorNode {
    async fn broadcast_raw(&self, raw: &[u8]) -> Result<U256, NetworkError> {
        let response = self
            .post_json(
                "/transactions",
                &[],
                &TransactionBroadcastRequest {
                    raw: Bytes::copy_from_slice(raw),
                },
            )
            .await?;
        let decoded: TransactionIdResponse = serde_json::from_str(&response)
            .map_err(|_| NetworkError::BroadcastFailed(response.clone()))?;
        tracing::debug!(id = %decoded.id, "transaction broadcasted");
        Ok(decoded.id)
    }
}

#[async_trait]
impl ReceiptSource for ThorNode {
    async fn get_transaction_receipt(
        &self,
        transaction_id: U256,
        head: Option<U256>,
    ) -> Result<Option<Receipt>, NetworkError> {
        self.fetch_transaction_receipt(transaction_id, head).await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_block_reference_query_params() {
        assert_eq!(BlockReference::Best.as_query_param(), "best");
        assert_eq!(BlockReference::Finalized.as_query_param(), "finalized");
        assert_eq!(BlockReference::Next.as_query_param(), "next");
        assert_eq!(BlockReference::Number(0).as_query_param(), "0x00");
        assert_eq!(BlockReference::Number(0x1234).as_query_param(), "0x1234");
        assert_eq!(
            BlockReference::ID(U256::from(1)).as_query_param(),
            format!("0x{:064x}", 1)
        );
    }

    #[test]
    fn test_block_info_deserialization() {
        let block: BlockResponse = serde_json::from_str(
            r#"{
                "number": 21251500,
                "id": "0x014444ac151bd43e2d4719bb12ab01e0a345dfbb8a9e1b58a93ca30b2aa25eec",
                "size": 361,
                "parentID": "0x014444ab9e92d33a10e8f15a68d529d401bb800b286e2dcdb3e3fffa94596a32",
                "timestamp": 1729239520,
                "gasLimit": 30000000,
                "beneficiary": "0xb4094c25f86d628fdd571afc4077f0d0196afb48",
                "gasUsed": 21000,
                "baseFeePerGas": "0x09184e72a000",
                "totalScore": 136509202,
                "txsRoot": "0x31fdd8a6dd45ed7e3e42d598fba30cd08b9a9f5b6a86317f38ac72071ab4c00c",
                "txsFeatures": 1,
                "stateRoot": "0x50d4a0486e5c469a9a9f2e8120824b32bc29f84e6ba9a5d478b4c4a12a64ddc6",
                "receiptsRoot": "0x4c5b5bd6fd4a6a48155c6c0f80f2a5a325e3e0bf2b6f2013d8b5a86c1e5d4a15",
                "isTrunk": true,
                "isFinalized": false,
                "signer": "0x2ea5314bcac09cbd99ff08eec5f6a8309d272a34",
                "transactions": []
            }"#,
        )
        .unwrap();
        assert_eq!(block.base.number, 21251500);
        assert_eq!(
            block.base.base_fee_per_gas,
            Some(U256::from(10_000_000_000_000_u64))
        );
        assert_eq!(block.base.block_ref(), 0x014444ac151bd43e);
        assert!(block.transactions.is_empty());
    }

    #[test]
    fn test_block_without_base_fee() {
        let block: BlockInfo = serde_json::from_str(
            r#"{
                "number": 1,
                "id": "0x0000000000000001000000000000000000000000000000000000000000000000",
                "size": 361,
                "parentID": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "timestamp": 1729239520,
                "gasLimit": 30000000,
                "beneficiary": "0xb4094c25f86d628fdd571afc4077f0d0196afb48",
                "gasUsed": 0,
                "totalScore": 1,
                "txsRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "txsFeatures": 1,
                "stateRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "receiptsRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
                "isTrunk": true,
                "isFinalized": true,
                "signer": "0x2ea5314bcac09cbd99ff08eec5f6a8309d272a34"
            }"#,
        )
        .unwrap();
        assert_eq!(block.base_fee_per_gas, None);
    }

    #[test]
    fn test_receipt_deserialization() {
        let receipt: Receipt = serde_json::from_str(
            r#"{
                "gasUsed": 21000,
                "gasPayer": "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed",
                "paid": "0x1b5b8c4e33fa5000",
                "reward": "0x835107ddc632000",
                "reverted": false,
                "outputs": [
                    {
                        "contractAddress": null,
                        "events": [],
                        "transfers": [
                            {
                                "sender": "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed",
                                "recipient": "0x625fCe8dd8E2C05e82e77847F3da06CF5C83b8a7",
                                "amount": "0x2710"
                            }
                        ]
                    }
                ],
                "meta": {
                    "blockID": "0x014444ac151bd43e2d4719bb12ab01e0a345dfbb8a9e1b58a93ca30b2aa25eec",
                    "blockNumber": 21251500,
                    "blockTimestamp": 1729239520,
                    "txID": "0x00000000000000000000000000000000000000000000000000000000000000aa",
                    "txOrigin": "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed"
                }
            }"#,
        )
        .unwrap();
        assert!(!receipt.reverted);
        assert_eq!(receipt.meta.block_number, 21251500);
        assert_eq!(receipt.outputs[0].transfers[0].amount, U256::from(0x2710));
    }

    #[test]
    fn test_simulate_request_skips_unset_fields() {
        let request = SimulateCallRequest {
            clauses: &[],
            gas: Some(50_000),
            gas_price: None,
            caller: None,
            proved_work: Some(1000),
            gas_payer: None,
            expiration: None,
            block_ref: Some(0xaabbccdd),
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({
                "clauses": [],
                "gas": 50_000,
                "provedWork": "1000",
                "blockRef": "0x00000000aabbccdd"
            })
        );
    }

    #[test]
    fn test_presets() {
        let mainnet = ThorNode::mainnet();
        assert_eq!(mainnet.chain_tag, 0x4A);
        assert!(mainnet.name_resolver.is_some());
        let testnet = ThorNode::testnet();
        assert_eq!(testnet.chain_tag, 0x27);
        assert!(testnet.name_resolver.is_some());
    }
}
