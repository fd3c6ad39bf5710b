//! Transaction broadcasting and inclusion polling.

use crate::network::{NetworkError, Receipt};
use crate::transactions::{Transaction, TransactionError};
use alloy::primitives::U256;
use alloy_rlp::Decodable;
use async_trait::async_trait;
use std::time::Duration;

/// Default total time to wait for transaction inclusion.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(30_000);
/// Default pause between receipt polls.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(1_000);

/// Polling parameters of the inclusion wait.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WaitOptions {
    /// Total time to wait before giving up.
    pub timeout: Duration,
    /// Pause between consecutive receipt polls.
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_WAIT_INTERVAL,
        }
    }
}

/// Submits raw transactions to the chain.
#[async_trait]
pub trait Broadcaster {
    /// Broadcast encoded transaction bytes, returning the transaction id.
    async fn broadcast_raw(&self, raw: &[u8]) -> Result<U256, NetworkError>;
}

/// Provides transaction receipts.
#[async_trait]
pub trait ReceiptSource {
    /// Receipt of a transaction, [`None`] while not included in a block.
    async fn get_transaction_receipt(
        &self,
        transaction_id: U256,
        head: Option<U256>,
    ) -> Result<Option<Receipt>, NetworkError>;
}

/// Errors of transaction submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Raw transaction string is not hex or not a decodable transaction.
    #[error("malformed raw transaction: {0}")]
    MalformedRawTransaction(String),
    /// Transaction id is not 32 bytes of hex.
    #[error("invalid transaction id: {0}")]
    InvalidTransactionId(String),
    /// Transaction-level failure (unsigned, bad signature).
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Network failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Broadcasts transactions and tracks their inclusion.
#[derive(Clone, Debug)]
pub struct TransactionSubmitter<'a, N> {
    node: &'a N,
}

/// A broadcasted transaction whose inclusion can be awaited.
#[derive(Clone, Debug)]
pub struct PendingTransaction<'a, N> {
    node: &'a N,
    id: U256,
}

impl<'a, N: Broadcaster + ReceiptSource> TransactionSubmitter<'a, N> {
    /// Create a submitter talking to the given node.
    pub const fn new(node: &'a N) -> Self {
        Self { node }
    }

    /// Broadcast a signed [`Transaction`].
    pub async fn send_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<PendingTransaction<'a, N>, SubmitError> {
        let raw = transaction.to_broadcastable_bytes()?;
        let id = self.node.broadcast_raw(&raw).await?;
        Ok(PendingTransaction {
            node: self.node,
            id,
        })
    }

    /// Broadcast a hex-encoded signed transaction.
    ///
    /// The payload must decode back into a signed transaction before
    /// anything is sent to the node.
    pub async fn send_raw_transaction(
        &self,
        raw: &str,
    ) -> Result<PendingTransaction<'a, N>, SubmitError> {
        let bytes = alloy::hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
            .map_err(|e| SubmitError::MalformedRawTransaction(e.to_string()))?;
        let mut slice = &bytes[..];
        let transaction = Transaction::decode(&mut slice)
            .map_err(|e| SubmitError::MalformedRawTransaction(e.to_string()))?;
        if !slice.is_empty() {
            return Err(SubmitError::MalformedRawTransaction(
                "trailing bytes after transaction".to_string(),
            ));
        }
        if !transaction.is_signed() {
            return Err(TransactionError::Unsigned.into());
        }
        let id = self.node.broadcast_raw(&bytes).await?;
        Ok(PendingTransaction {
            node: self.node,
            id,
        })
    }

    /// Wait for the transaction with the given hex id to be included.
    ///
    /// Returns [`None`] when the timeout elapses first.
    pub async fn wait_for_transaction(
        &self,
        transaction_id: &str,
        options: WaitOptions,
    ) -> Result<Option<Receipt>, SubmitError> {
        let id = parse_tx_id(transaction_id)?;
        poll_receipt(self.node, id, options).await
    }
}

impl<'a, N: ReceiptSource> PendingTransaction<'a, N> {
    /// Id of the broadcasted transaction.
    pub const fn id(&self) -> U256 {
        self.id
    }

    /// Wait for this transaction to be included in a block.
    ///
    /// Returns [`None`] when the timeout elapses first.
    pub async fn wait(&self, options: WaitOptions) -> Result<Option<Receipt>, SubmitError> {
        poll_receipt(self.node, self.id, options).await
    }
}

/// Parse a transaction id: exactly 64 hex digits, `0x` prefix optional.
pub fn parse_tx_id(transaction_id: &str) -> Result<U256, SubmitError> {
    let digits = transaction_id
        .strip_prefix("0x")
        .unwrap_or(transaction_id);
    if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SubmitError::InvalidTransactionId(
            transaction_id.to_string(),
        ));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| SubmitError::InvalidTransactionId(transaction_id.to_string()))
}

async fn poll_receipt<N: ReceiptSource>(
    node: &N,
    id: U256,
    options: WaitOptions,
) -> Result<Option<Receipt>, SubmitError> {
    // The deadline is fixed up front, polling never extends it.
    let deadline = tokio::time::Instant::now() + options.timeout;
    loop {
        if tokio::time::Instant::now() >= deadline {
            tracing::debug!(%id, "inclusion wait timed out");
            return Ok(None);
        }
        match node.get_transaction_receipt(id, None).await {
            Ok(Some(receipt)) => return Ok(Some(receipt)),
            Ok(None) => {}
            Err(error) if error.is_transient() => {
                tracing::debug!(%id, %error, "transient failure while polling, retrying");
            }
            Err(error) => return Err(error.into()),
        }
        tokio::time::sleep(options.interval).await;
    }
}
