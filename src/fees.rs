//! Transaction fee resolution.
//!
//! Turns the user-facing bag of optional fee parameters into a fully
//! determined [`FeeSpec`], consulting the network for the Galactica fork
//! state and recent fee history when defaults must be computed.

use crate::network::{BlockReference, NetworkError};
use crate::transactions::FeeSpec;
use crate::utils::unhex;
use alloy::primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;

/// Number of recent blocks inspected when estimating a priority fee.
const FEE_HISTORY_BLOCKS: u32 = 10;
/// Reward percentiles requested from the fee history endpoint.
const REWARD_PERCENTILES: [u8; 3] = [25, 50, 75];
/// The default priority fee is capped at 4.6% of the base fee.
const PRIORITY_FEE_CAP: (u64, u64) = (46, 1000);
/// The default max fee allows a 12% base fee increase on top of the tip.
const BASE_FEE_HEADROOM: (u64, u64) = (112, 100);

/// User-provided fee parameters, all optional.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeeOptions {
    /// Legacy gas price coefficient.
    pub gas_price_coef: Option<u8>,
    /// Dynamic total fee cap per unit of gas.
    pub max_fee_per_gas: Option<U256>,
    /// Dynamic priority fee cap per unit of gas.
    pub max_priority_fee_per_gas: Option<U256>,
}

/// Fee history of a range of recent blocks.
#[serde_with::serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeHistory {
    /// Id of the oldest block in the range.
    #[serde_as(as = "unhex::HexNum<32, U256>")]
    pub oldest_block: U256,
    /// Base fee of every block in the range, oldest first.
    #[serde_as(as = "Vec<unhex::HexNum<32, U256>>")]
    pub base_fee_per_gas: Vec<U256>,
    /// Gas used ratio of every block in the range.
    pub gas_used_ratio: Vec<f64>,
    /// Per-block reward values at the requested percentiles, oldest first.
    /// Absent when no percentiles were requested.
    #[serde_as(as = "Option<Vec<Vec<unhex::HexNum<32, U256>>>>")]
    #[serde(default)]
    pub reward: Option<Vec<Vec<U256>>>,
}

/// Query parameters of a fee history request.
#[derive(Clone, Debug)]
pub struct FeeHistoryOptions {
    /// How many blocks to cover, ending at `newest_block`.
    pub block_count: u32,
    /// Most recent block of the range.
    pub newest_block: BlockReference,
    /// Reward percentiles to report per block, ascending, 0-100.
    pub reward_percentiles: Vec<u8>,
}

/// Answers whether the Galactica hard fork (dynamic fee market) is active.
#[async_trait]
pub trait ForkDetector {
    /// Is the fork active at the given block?
    async fn is_galactica_forked(&self, reference: BlockReference)
        -> Result<bool, NetworkError>;
}

/// Provides fee market observations from the chain.
#[async_trait]
pub trait FeeHistorySource {
    /// Fee history of a recent block range.
    async fn get_fee_history(
        &self,
        options: &FeeHistoryOptions,
    ) -> Result<FeeHistory, NetworkError>;

    /// Node-suggested priority fee per gas.
    async fn get_max_priority_fee_per_gas(&self) -> Result<U256, NetworkError>;

    /// Base fee of the next block, [`None`] before the fork.
    async fn get_next_block_base_fee_per_gas(&self) -> Result<Option<U256>, NetworkError>;
}

/// Errors of the fee resolution process.
#[derive(Debug, thiserror::Error)]
pub enum FeeResolutionError {
    /// `max_priority_fee_per_gas` combined with `gas_price_coef`.
    #[error(
        "maxPriorityFeePerGas cannot be combined with gasPriceCoef without maxFeePerGas: {options:?}"
    )]
    PriorityFeeWithCoef {
        /// The offending parameter combination.
        options: FeeOptions,
    },
    /// `max_fee_per_gas` combined with `gas_price_coef`.
    #[error(
        "maxFeePerGas cannot be combined with gasPriceCoef without maxPriorityFeePerGas: {options:?}"
    )]
    MaxFeeWithCoef {
        /// The offending parameter combination.
        options: FeeOptions,
    },
    /// Dynamic fee parameters used before the Galactica fork.
    #[error("dynamic fee parameters are not supported before the Galactica fork: {options:?}")]
    DynamicFeeBeforeFork {
        /// The offending parameter combination.
        options: FeeOptions,
    },
    /// The fork is active, but the node reported no next base fee.
    #[error("node did not report a base fee for the next block")]
    MissingBaseFee,
    /// Network failure.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Resolves [`FeeOptions`] into a [`FeeSpec`].
///
/// Resolution is read-only and idempotent: the same inputs against the same
/// chain state produce the same specification.
#[derive(Clone, Debug)]
pub struct FeeResolver<'a, N> {
    node: &'a N,
}

impl<'a, N: ForkDetector + FeeHistorySource> FeeResolver<'a, N> {
    /// Create a resolver reading chain state from the given node.
    pub const fn new(node: &'a N) -> Self {
        Self { node }
    }

    /// Resolve the given parameters into a complete fee specification.
    pub async fn resolve(&self, options: FeeOptions) -> Result<FeeSpec, FeeResolutionError> {
        let FeeOptions {
            gas_price_coef,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        } = options.clone();

        if gas_price_coef.is_some() && max_priority_fee_per_gas.is_some() && max_fee_per_gas.is_none()
        {
            return Err(FeeResolutionError::PriorityFeeWithCoef { options });
        }
        if gas_price_coef.is_some() && max_fee_per_gas.is_some() && max_priority_fee_per_gas.is_none()
        {
            return Err(FeeResolutionError::MaxFeeWithCoef { options });
        }
        if let (Some(coef), None, None) = (gas_price_coef, max_fee_per_gas, max_priority_fee_per_gas)
        {
            // Explicit legacy pricing bypasses the fork check entirely.
            return Ok(FeeSpec::Legacy {
                gas_price_coef: coef,
            });
        }

        let forked = self.node.is_galactica_forked(BlockReference::Best).await?;
        if !forked {
            if max_fee_per_gas.is_some() || max_priority_fee_per_gas.is_some() {
                return Err(FeeResolutionError::DynamicFeeBeforeFork { options });
            }
            tracing::debug!("galactica fork not active, defaulting to legacy fees");
            return Ok(FeeSpec::default());
        }

        if let (Some(max_fee), Some(max_priority)) = (max_fee_per_gas, max_priority_fee_per_gas) {
            // gas_price_coef, if also present, is dropped here.
            return Ok(FeeSpec::Dynamic {
                max_fee_per_gas: max_fee,
                max_priority_fee_per_gas: max_priority,
            });
        }

        let base_fee = self
            .node
            .get_next_block_base_fee_per_gas()
            .await?
            .ok_or(FeeResolutionError::MissingBaseFee)?;
        let max_priority = match max_priority_fee_per_gas {
            Some(fee) => fee,
            None => self.default_max_priority_fee(base_fee).await?,
        };
        let max_fee = match max_fee_per_gas {
            Some(fee) => fee,
            None => {
                base_fee * U256::from(BASE_FEE_HEADROOM.0) / U256::from(BASE_FEE_HEADROOM.1)
                    + max_priority
            }
        };
        tracing::debug!(
            %base_fee,
            %max_fee,
            %max_priority,
            "computed dynamic fee defaults"
        );
        Ok(FeeSpec::Dynamic {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_priority,
        })
    }

    async fn default_max_priority_fee(&self, base_fee: U256) -> Result<U256, FeeResolutionError> {
        let history = self
            .node
            .get_fee_history(&FeeHistoryOptions {
                block_count: FEE_HISTORY_BLOCKS,
                newest_block: BlockReference::Best,
                reward_percentiles: REWARD_PERCENTILES.to_vec(),
            })
            .await?;
        let observed = match history.reward.as_deref().filter(|r| !r.is_empty()) {
            Some(rewards) => priority_fee_from_rewards(rewards),
            None => None,
        };
        let fee = match observed {
            Some(fee) => fee,
            None => {
                tracing::debug!("no usable reward history, asking the node for a priority fee");
                self.node.get_max_priority_fee_per_gas().await?
            }
        };
        let cap = base_fee * U256::from(PRIORITY_FEE_CAP.0) / U256::from(PRIORITY_FEE_CAP.1);
        Ok(fee.min(cap))
    }
}

/// Pick a priority fee from per-block percentile rewards (oldest first).
///
/// When the newest block reports identical rewards at every requested
/// percentile, that single value is representative. Otherwise the highest
/// requested percentile is averaged over all blocks reporting it.
fn priority_fee_from_rewards(rewards: &[Vec<U256>]) -> Option<U256> {
    let newest = rewards.last()?;
    if newest.len() == REWARD_PERCENTILES.len()
        && newest.windows(2).all(|pair| pair[0] == pair[1])
    {
        return Some(newest[0]);
    }
    let top_percentile_index = REWARD_PERCENTILES.len() - 1;
    let top: Vec<U256> = rewards
        .iter()
        .filter_map(|block| block.get(top_percentile_index).copied())
        .collect();
    if top.is_empty() {
        return None;
    }
    let sum: U256 = top.iter().copied().fold(U256::ZERO, |acc, x| acc + x);
    Some(sum / U256::from(top.len()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rewards_all_equal_in_newest() {
        let rewards = vec![
            vec![U256::from(5), U256::from(7), U256::from(9)],
            vec![U256::from(3), U256::from(3), U256::from(3)],
        ];
        assert_eq!(priority_fee_from_rewards(&rewards), Some(U256::from(3)));
    }

    #[test]
    fn test_rewards_averaged() {
        let rewards = vec![
            vec![U256::from(1), U256::from(2), U256::from(10)],
            vec![U256::from(1), U256::from(2), U256::from(20)],
        ];
        assert_eq!(priority_fee_from_rewards(&rewards), Some(U256::from(15)));
    }

    #[test]
    fn test_rewards_skip_short_blocks() {
        let rewards = vec![
            vec![U256::from(1)],
            vec![U256::from(1), U256::from(2), U256::from(30)],
        ];
        assert_eq!(priority_fee_from_rewards(&rewards), Some(U256::from(30)));
    }

    #[test]
    fn test_rewards_no_usable_entries() {
        let rewards = vec![vec![U256::from(1)], vec![U256::from(2)]];
        assert_eq!(priority_fee_from_rewards(&rewards), None);
        assert_eq!(priority_fee_from_rewards(&[]), None);
    }

    #[test]
    fn test_fee_history_deserialization() {
        let history: FeeHistory = serde_json::from_str(
            r#"{
                "oldestBlock": "0x0000000000000001000000000000000000000000000000000000000000000000",
                "baseFeePerGas": ["0x3e8", "0x3f0"],
                "gasUsedRatio": [0.5, 0.25],
                "reward": [["0x1", "0x2", "0x3"]]
            }"#,
        )
        .unwrap();
        assert_eq!(history.base_fee_per_gas[0], U256::from(1000));
        assert_eq!(history.gas_used_ratio, vec![0.5, 0.25]);
        assert_eq!(
            history.reward,
            Some(vec![vec![U256::from(1), U256::from(2), U256::from(3)]])
        );
    }

    #[test]
    fn test_fee_history_without_rewards() {
        let history: FeeHistory = serde_json::from_str(
            r#"{
                "oldestBlock": "0x0000000000000001000000000000000000000000000000000000000000000000",
                "baseFeePerGas": ["0x3e8"],
                "gasUsedRatio": [0.5]
            }"#,
        )
        .unwrap();
        assert_eq!(history.reward, None);
    }
}
