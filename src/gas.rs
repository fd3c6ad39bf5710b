//! Gas estimation via clause simulation.

use crate::network::{BlockReference, NetworkError, SimulationOutcome};
use crate::revert::decode_revert_reason;
use crate::transactions::{intrinsic_gas, Clause};
use alloy::json_abi::Error as ErrorFragment;
use alloy::primitives::Address;
use async_trait::async_trait;

/// Execution surcharge applied whenever simulation reports any gas use.
pub const CONTRACT_INTERACTION_GAS: u64 = 15_000;

/// Context of a clause simulation.
#[derive(Clone, Debug, Default)]
pub struct SimulateOptions {
    /// Block state to simulate against, best block when unset.
    pub revision: Option<BlockReference>,
    /// Account executing the clauses.
    pub caller: Option<Address>,
    /// Gas price to assume.
    pub gas_price: Option<u64>,
    /// Account paying for gas (fee delegation).
    pub gas_payer: Option<Address>,
    /// Gas limit of the simulated execution.
    pub gas: Option<u64>,
    /// Block reference of the simulated transaction.
    pub block_ref: Option<u64>,
    /// Expiration of the simulated transaction.
    pub expiration: Option<u32>,
    /// Proved work of the simulated transaction.
    pub proved_work: Option<u64>,
}

/// Executes clauses against chain state without committing anything.
#[async_trait]
pub trait ChainSimulator {
    /// Simulate the execution of `clauses`, one outcome per clause.
    async fn simulate(
        &self,
        clauses: &[Clause],
        options: &SimulateOptions,
    ) -> Result<Vec<SimulationOutcome>, NetworkError>;
}

/// Parameters of a gas estimation.
#[derive(Clone, Debug, Default)]
pub struct EstimateGasOptions {
    /// Fractional safety margin over the computed gas, in `(0, 1]`.
    pub gas_padding: Option<f64>,
    /// Custom error to try when decoding revert payloads.
    pub error_fragment: Option<ErrorFragment>,
    /// Simulation context.
    pub simulation: SimulateOptions,
}

/// Outcome of a gas estimation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EstimateGasResult {
    /// Total gas to budget for the transaction, padding included.
    pub total_gas: u64,
    /// Did any clause revert during simulation?
    pub reverted: bool,
    /// Decoded revert reason per clause, parallel to the input: empty
    /// string for clauses that did not revert or whose payload was not
    /// decodable. Empty unless `reverted`.
    pub revert_reasons: Vec<String>,
    /// VM error per clause, parallel to the input, passed through from the
    /// simulator. Empty unless `reverted`.
    pub vm_errors: Vec<String>,
}

/// Errors of the gas estimation process.
#[derive(Debug, thiserror::Error)]
pub enum GasEstimationError {
    /// No clauses to estimate.
    #[error("cannot estimate gas without clauses")]
    EmptyClauses,
    /// Padding outside of `(0, 1]`.
    #[error("gas padding must be in (0, 1], got {0}")]
    InvalidGasPadding(f64),
    /// Network failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Estimates the gas a set of clauses needs.
///
/// The estimate is the clauses' intrinsic gas plus the simulated execution
/// cost (with [`CONTRACT_INTERACTION_GAS`] on top whenever execution used
/// any gas), optionally inflated by a padding fraction.
#[derive(Clone, Debug)]
pub struct GasEstimator<'a, S> {
    node: &'a S,
}

impl<'a, S: ChainSimulator> GasEstimator<'a, S> {
    /// Create an estimator simulating against the given node.
    pub const fn new(node: &'a S) -> Self {
        Self { node }
    }

    /// Estimate the gas needed to execute `clauses` as `caller`.
    ///
    /// A caller in `options.simulation` takes precedence over the `caller`
    /// argument.
    pub async fn estimate_gas(
        &self,
        clauses: &[Clause],
        caller: Option<Address>,
        options: EstimateGasOptions,
    ) -> Result<EstimateGasResult, GasEstimationError> {
        if clauses.is_empty() {
            return Err(GasEstimationError::EmptyClauses);
        }
        let padding = options.gas_padding.unwrap_or(0.0);
        if options.gas_padding.is_some() && !(padding > 0.0 && padding <= 1.0) {
            return Err(GasEstimationError::InvalidGasPadding(padding));
        }

        let mut sim_opts = options.simulation;
        sim_opts.caller = sim_opts.caller.or(caller);
        let outcomes = self.node.simulate(clauses, &sim_opts).await?;

        let execution_gas: u64 = outcomes.iter().map(|o| o.gas_used).sum();
        let base = intrinsic_gas(clauses)
            + if execution_gas > 0 {
                execution_gas + CONTRACT_INTERACTION_GAS
            } else {
                0
            };
        let total_gas = ((base as f64) * (1.0 + padding)).ceil() as u64;

        let reverted = outcomes.iter().any(|o| o.reverted);
        let (revert_reasons, vm_errors) = if reverted {
            // Both arrays stay parallel to the clause list.
            let reasons = outcomes
                .iter()
                .map(|o| {
                    if o.reverted {
                        decode_revert_reason(&o.data, options.error_fragment.as_ref())
                            .unwrap_or_default()
                    } else {
                        String::new()
                    }
                })
                .collect();
            let errors = outcomes.iter().map(|o| o.vm_error.clone()).collect();
            (reasons, errors)
        } else {
            (vec![], vec![])
        };
        tracing::debug!(total_gas, reverted, "gas estimation finished");

        Ok(EstimateGasResult {
            total_gas,
            reverted,
            revert_reasons,
            vm_errors,
        })
    }
}
