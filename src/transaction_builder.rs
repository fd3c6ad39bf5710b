//! Fluent [`TransactionBodyBuilder`] interface implementation.

use crate::fees::{FeeHistorySource, FeeOptions, FeeResolutionError, FeeResolver, ForkDetector};
use crate::network::NetworkError;
use crate::transactions::{Clause, ClauseTo, Reserved, TransactionBody};
use alloy::primitives::ruint::UintTryFrom;
use alloy::primitives::{Address, U256};
use alloy_rlp::Bytes;
use async_trait::async_trait;
use rand::Rng;

/// Default transaction lifetime relative to its block reference, in blocks.
pub const DEFAULT_EXPIRATION: u32 = 32;

/// Provides chain identification data.
#[async_trait]
pub trait BlockSource {
    /// Id of the genesis block, [`None`] if the node has none.
    async fn get_genesis_block_id(&self) -> Result<Option<U256>, NetworkError>;

    /// Block reference (first 8 bytes of the id) of the best block.
    async fn get_best_block_ref(&self) -> Result<Option<u64>, NetworkError>;
}

/// Resolves vet.domains names to account addresses.
#[async_trait]
pub trait NameResolver {
    /// Resolve names in a single batch, [`None`] per unresolved name.
    ///
    /// The output is parallel to the input.
    async fn resolve_names(&self, names: &[String]) -> Result<Vec<Option<Address>>, NetworkError>;
}

/// Errors of transaction body building.
#[derive(Debug, thiserror::Error)]
pub enum TransactionBuilderError {
    /// No clauses were added.
    #[error("Cannot build an empty transaction - make sure to add at least one clause first.")]
    EmptyTransaction,
    /// Node did not report a genesis block.
    #[error("Cannot identify the chain: node did not report a genesis block.")]
    MissingGenesisBlock,
    /// Node did not report a best block.
    #[error("Cannot anchor the transaction: node did not report a best block.")]
    MissingBlockRef,
    /// Fee resolution failure.
    #[error(transparent)]
    Fee(#[from] FeeResolutionError),
    /// Network failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Clone, Debug, Default)]
struct BodyTemplate {
    chain_tag: Option<u8>,
    block_ref: Option<u64>,
    expiration: Option<u32>,
    clauses: Vec<Clause>,
    gas: Option<u64>,
    fee_options: FeeOptions,
    depends_on: Option<U256>,
    nonce: Option<u64>,
    delegated: bool,
}

/// Assembles a complete [`TransactionBody`], filling the gaps from chain
/// state.
///
/// Missing chain tag and block reference are read from the node, fee
/// parameters go through fee resolution, clause recipients given as
/// vet.domains names are resolved in one batch (unresolved names are kept
/// as-is). Building is read-only: nothing is signed or broadcasted.
#[derive(Clone, Debug)]
pub struct TransactionBodyBuilder<'a, N> {
    node: &'a N,
    template: BodyTemplate,
}

impl<'a, N> TransactionBodyBuilder<'a, N> {
    /// Create a builder reading chain state from the given node.
    pub fn new(node: &'a N) -> Self {
        Self {
            node,
            template: BodyTemplate::default(),
        }
    }

    /// Mark the transaction as fee-delegated.
    #[must_use]
    pub fn delegated(mut self) -> Self {
        self.template.delegated = true;
        self
    }

    /// Set an explicit chain tag (skips the genesis block lookup).
    #[must_use]
    pub fn chain_tag(mut self, chain_tag: u8) -> Self {
        self.template.chain_tag = Some(chain_tag);
        self
    }

    /// Set an explicit nonce (random if unset).
    #[must_use]
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.template.nonce = Some(nonce);
        self
    }

    /// Mark the transaction as dependent on another one.
    #[must_use]
    pub fn depends_on(mut self, depends_on: U256) -> Self {
        self.template.depends_on = Some(depends_on);
        self
    }

    /// Set an explicit gas amount, overriding the one given to `build`.
    #[must_use]
    pub fn gas(mut self, gas: u64) -> Self {
        self.template.gas = Some(gas);
        self
    }

    /// Set the legacy gas price coefficient.
    #[must_use]
    pub fn gas_price_coef(mut self, gas_price_coef: u8) -> Self {
        self.template.fee_options.gas_price_coef = Some(gas_price_coef);
        self
    }

    /// Set the dynamic total fee cap.
    #[must_use]
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.template.fee_options.max_fee_per_gas = Some(max_fee_per_gas);
        self
    }

    /// Set the dynamic priority fee cap.
    #[must_use]
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.template.fee_options.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    /// Set the transaction lifetime, in blocks.
    #[must_use]
    pub fn expiration(mut self, expiration: u32) -> Self {
        self.template.expiration = Some(expiration);
        self
    }

    /// Set an explicit block reference (skips the best block lookup).
    #[must_use]
    pub fn block_ref(mut self, block_ref: u64) -> Self {
        self.template.block_ref = Some(block_ref);
        self
    }

    /// Add a simple transfer clause.
    #[must_use]
    pub fn add_transfer<T>(self, recipient: impl Into<ClauseTo>, value: T) -> Self
    where
        U256: UintTryFrom<T>,
    {
        self.add_clause(Clause {
            to: Some(recipient.into()),
            value: U256::from(value),
            data: Bytes::new(),
        })
    }

    /// Add a contract deployment clause.
    #[must_use]
    pub fn add_contract_create(self, contract_bytes: Bytes) -> Self {
        self.add_clause(Clause {
            to: None,
            value: U256::ZERO,
            data: contract_bytes,
        })
    }

    /// Add a contract method call clause.
    #[must_use]
    pub fn add_contract_call(self, contract_address: impl Into<ClauseTo>, data: Bytes) -> Self {
        self.add_clause(Clause {
            to: Some(contract_address.into()),
            value: U256::ZERO,
            data,
        })
    }

    /// Add an arbitrary, fully formed clause.
    #[must_use]
    pub fn add_clause(mut self, clause: Clause) -> Self {
        self.template.clauses.push(clause);
        self
    }
}

impl<'a, N: BlockSource + NameResolver + ForkDetector + FeeHistorySource>
    TransactionBodyBuilder<'a, N>
{
    /// Assemble the transaction body, budgeting `gas` for execution.
    ///
    /// An explicit [`gas`](Self::gas) set on the builder wins over the
    /// argument.
    pub async fn build(self, gas: u64) -> Result<TransactionBody, TransactionBuilderError> {
        let template = self.template;
        if template.clauses.is_empty() {
            return Err(TransactionBuilderError::EmptyTransaction);
        }

        let chain_tag = match template.chain_tag {
            Some(tag) => tag,
            None => {
                let genesis_id = self
                    .node
                    .get_genesis_block_id()
                    .await?
                    .ok_or(TransactionBuilderError::MissingGenesisBlock)?;
                genesis_id.to_be_bytes::<32>()[31]
            }
        };
        let block_ref = match template.block_ref {
            Some(block_ref) => block_ref,
            None => self
                .node
                .get_best_block_ref()
                .await?
                .ok_or(TransactionBuilderError::MissingBlockRef)?,
        };
        let clauses = resolve_clause_names(self.node, template.clauses).await?;
        let fee = FeeResolver::new(self.node)
            .resolve(template.fee_options)
            .await?;

        Ok(TransactionBody {
            chain_tag,
            block_ref,
            expiration: template.expiration.unwrap_or(DEFAULT_EXPIRATION),
            clauses,
            gas: template.gas.unwrap_or(gas),
            fee,
            depends_on: template.depends_on,
            nonce: template
                .nonce
                .unwrap_or_else(|| rand::rng().random::<u64>()),
            reserved: template.delegated.then(Reserved::new_delegated),
        })
    }
}

/// Replace name recipients with resolved addresses, in one resolver call.
///
/// Names the resolver does not know stay in place: building is best-effort,
/// the strict check happens when the wire transaction is constructed.
async fn resolve_clause_names<N: NameResolver>(
    node: &N,
    mut clauses: Vec<Clause>,
) -> Result<Vec<Clause>, TransactionBuilderError> {
    let mut names: Vec<String> = vec![];
    for clause in &clauses {
        if let Some(ClauseTo::Name(name)) = &clause.to {
            if name.contains('.') && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    if names.is_empty() {
        return Ok(clauses);
    }
    let resolved = node.resolve_names(&names).await?;
    for clause in &mut clauses {
        if let Some(ClauseTo::Name(name)) = &clause.to {
            let address = names
                .iter()
                .position(|n| n == name)
                .and_then(|i| resolved.get(i).copied().flatten());
            if let Some(address) = address {
                clause.to = Some(ClauseTo::Address(address));
            } else {
                tracing::debug!(name = %name, "name left unresolved");
            }
        }
    }
    Ok(clauses)
}
