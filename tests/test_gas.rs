use async_trait::async_trait;
use std::sync::Mutex;
use thor_client::gas::{
    ChainSimulator, EstimateGasOptions, GasEstimationError, GasEstimator, SimulateOptions,
};
use thor_client::network::{NetworkError, SimulationOutcome};
use thor_client::transactions::Clause;
use thor_client::{Address, U256};

struct FakeSimulator {
    outcomes: Vec<SimulationOutcome>,
    seen_caller: Mutex<Option<Option<Address>>>,
}

impl FakeSimulator {
    fn returning(outcomes: Vec<SimulationOutcome>) -> Self {
        Self {
            outcomes,
            seen_caller: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ChainSimulator for FakeSimulator {
    async fn simulate(
        &self,
        clauses: &[Clause],
        options: &SimulateOptions,
    ) -> Result<Vec<SimulationOutcome>, NetworkError> {
        assert!(!clauses.is_empty(), "estimator must reject empty clauses");
        *self.seen_caller.lock().unwrap() = Some(options.caller);
        Ok(self.outcomes.clone())
    }
}

fn transfer_clause() -> Clause {
    Clause::transfer(Address::from([0x01; 20]), U256::from(1000))
}

fn call_clause() -> Clause {
    Clause {
        to: Some(Address::from([0x02; 20]).into()),
        value: U256::ZERO,
        data: vec![0x12].into(),
    }
}

fn encode_revert_string(reason: &str) -> Vec<u8> {
    let mut out = vec![0x08, 0xc3, 0x79, 0xa0];
    out.extend(U256::from(32).to_be_bytes::<32>());
    out.extend(U256::from(reason.len()).to_be_bytes::<32>());
    let mut padded = reason.as_bytes().to_vec();
    padded.resize(reason.len().div_ceil(32) * 32, 0);
    out.extend(padded);
    out
}

#[tokio::test]
async fn test_empty_clauses_rejected() {
    let node = FakeSimulator::returning(vec![]);
    let err = GasEstimator::new(&node)
        .estimate_gas(&[], None, EstimateGasOptions::default())
        .await
        .expect_err("Must fail");
    assert!(matches!(err, GasEstimationError::EmptyClauses));
}

#[tokio::test]
async fn test_invalid_padding_rejected() {
    let node = FakeSimulator::returning(vec![SimulationOutcome::default()]);
    for padding in [0.0, -0.5, 1.01, 2.0] {
        let err = GasEstimator::new(&node)
            .estimate_gas(
                &[transfer_clause()],
                None,
                EstimateGasOptions {
                    gas_padding: Some(padding),
                    ..EstimateGasOptions::default()
                },
            )
            .await
            .expect_err("Must fail");
        assert!(matches!(err, GasEstimationError::InvalidGasPadding(p) if p == padding));
    }
}

#[tokio::test]
async fn test_transfer_costs_intrinsic_only() {
    // No execution gas reported: no contract interaction surcharge.
    let node = FakeSimulator::returning(vec![SimulationOutcome::default()]);
    let result = GasEstimator::new(&node)
        .estimate_gas(&[transfer_clause()], None, EstimateGasOptions::default())
        .await
        .expect("Must estimate");
    assert_eq!(result.total_gas, 21_000);
    assert!(!result.reverted);
    assert!(result.revert_reasons.is_empty());
    assert!(result.vm_errors.is_empty());
}

#[tokio::test]
async fn test_contract_call_adds_surcharge() {
    let node = FakeSimulator::returning(vec![SimulationOutcome {
        gas_used: 100,
        ..SimulationOutcome::default()
    }]);
    let result = GasEstimator::new(&node)
        .estimate_gas(&[call_clause()], None, EstimateGasOptions::default())
        .await
        .expect("Must estimate");
    // 5000 + 16000 + 68 (one non-zero data byte) + 100 + 15000
    assert_eq!(result.total_gas, 36_168);
}

#[tokio::test]
async fn test_padding_rounds_up() {
    let node = FakeSimulator::returning(vec![SimulationOutcome {
        gas_used: 100,
        ..SimulationOutcome::default()
    }]);
    let result = GasEstimator::new(&node)
        .estimate_gas(
            &[call_clause()],
            None,
            EstimateGasOptions {
                gas_padding: Some(0.1),
                ..EstimateGasOptions::default()
            },
        )
        .await
        .expect("Must estimate");
    assert_eq!(result.total_gas, 39_785);
}

#[tokio::test]
async fn test_full_padding_doubles() {
    let node = FakeSimulator::returning(vec![SimulationOutcome::default()]);
    let result = GasEstimator::new(&node)
        .estimate_gas(
            &[transfer_clause()],
            None,
            EstimateGasOptions {
                gas_padding: Some(1.0),
                ..EstimateGasOptions::default()
            },
        )
        .await
        .expect("Must estimate");
    assert_eq!(result.total_gas, 42_000);
}

#[tokio::test]
async fn test_revert_reasons_decoded() {
    let node = FakeSimulator::returning(vec![
        SimulationOutcome {
            gas_used: 200,
            ..SimulationOutcome::default()
        },
        SimulationOutcome {
            data: encode_revert_string("insufficient balance").into(),
            gas_used: 300,
            reverted: true,
            vm_error: "execution reverted".to_string(),
            ..SimulationOutcome::default()
        },
    ]);
    let result = GasEstimator::new(&node)
        .estimate_gas(
            &[call_clause(), call_clause()],
            None,
            EstimateGasOptions::default(),
        )
        .await
        .expect("Must estimate");
    assert!(result.reverted);
    // One entry per clause: the successful first clause keeps its slot.
    assert_eq!(result.revert_reasons, vec!["", "insufficient balance"]);
    assert_eq!(result.vm_errors, vec!["", "execution reverted"]);
}

#[tokio::test]
async fn test_result_arrays_parallel_to_clauses() {
    let node = FakeSimulator::returning(vec![
        SimulationOutcome {
            data: encode_revert_string("boom").into(),
            gas_used: 100,
            reverted: true,
            vm_error: "execution reverted".to_string(),
            ..SimulationOutcome::default()
        },
        SimulationOutcome {
            gas_used: 200,
            ..SimulationOutcome::default()
        },
        SimulationOutcome {
            data: encode_revert_string("kaboom").into(),
            gas_used: 300,
            reverted: true,
            ..SimulationOutcome::default()
        },
    ]);
    let result = GasEstimator::new(&node)
        .estimate_gas(
            &[call_clause(), call_clause(), call_clause()],
            None,
            EstimateGasOptions::default(),
        )
        .await
        .expect("Must estimate");
    assert_eq!(result.revert_reasons, vec!["boom", "", "kaboom"]);
    assert_eq!(result.vm_errors, vec!["execution reverted", "", ""]);
}

#[tokio::test]
async fn test_undecodable_revert_is_empty_reason() {
    let node = FakeSimulator::returning(vec![SimulationOutcome {
        data: vec![0xde, 0xad, 0xbe, 0xef].into(),
        gas_used: 300,
        reverted: true,
        ..SimulationOutcome::default()
    }]);
    let result = GasEstimator::new(&node)
        .estimate_gas(&[call_clause()], None, EstimateGasOptions::default())
        .await
        .expect("Must estimate");
    assert!(result.reverted);
    assert_eq!(result.revert_reasons, vec![String::new()]);
}

#[tokio::test]
async fn test_caller_argument_forwarded() {
    let caller = Address::from([0xaa; 20]);
    let node = FakeSimulator::returning(vec![SimulationOutcome::default()]);
    GasEstimator::new(&node)
        .estimate_gas(
            &[transfer_clause()],
            Some(caller),
            EstimateGasOptions::default(),
        )
        .await
        .expect("Must estimate");
    assert_eq!(*node.seen_caller.lock().unwrap(), Some(Some(caller)));
}

#[tokio::test]
async fn test_options_caller_wins() {
    let arg_caller = Address::from([0xaa; 20]);
    let options_caller = Address::from([0xbb; 20]);
    let node = FakeSimulator::returning(vec![SimulationOutcome::default()]);
    GasEstimator::new(&node)
        .estimate_gas(
            &[transfer_clause()],
            Some(arg_caller),
            EstimateGasOptions {
                simulation: SimulateOptions {
                    caller: Some(options_caller),
                    ..SimulateOptions::default()
                },
                ..EstimateGasOptions::default()
            },
        )
        .await
        .expect("Must estimate");
    assert_eq!(*node.seen_caller.lock().unwrap(), Some(Some(options_caller)));
}
