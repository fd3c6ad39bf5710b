#![doc(html_root_url = "https://docs.rs/thor-client/0.1.0")]
#![warn(rust_2018_idioms, missing_docs)]
#![deny(dead_code, unused_imports, unused_mut)]

//! Rust client library for the VeChain Thor blockchain: transaction
//! building with automatic fee resolution (legacy and post-Galactica
//! dynamic fees), gas estimation via clause simulation, revert reason
//! decoding, broadcasting and receipt polling.
//!
//! The chain-facing pieces are split behind small traits ([`ForkDetector`],
//! [`FeeHistorySource`], [`ChainSimulator`], [`BlockSource`],
//! [`NameResolver`], [`Broadcaster`], [`ReceiptSource`]), all implemented
//! by the bundled REST client [`network::ThorNode`], so every component
//! can be driven by a fake in tests.
//!
//! ## Usage
//!
//! Assembling and inspecting a transaction without touching the network:
//!
//! ```rust
//! use thor_client::transactions::{Clause, FeeSpec, Transaction, TransactionBody};
//! use thor_client::{Address, U256};
//!
//! let recipient: Address = "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed"
//!     .parse()
//!     .unwrap();
//! let body = TransactionBody {
//!     chain_tag: 1,
//!     block_ref: 0xaabbccdd,
//!     expiration: 32,
//!     clauses: vec![Clause::transfer(recipient, U256::from(10000))],
//!     gas: 21_000,
//!     fee: FeeSpec::Legacy { gas_price_coef: 128 },
//!     depends_on: None,
//!     nonce: 0xbc614e,
//!     reserved: None,
//! };
//! let transaction = Transaction::new(body).expect("recipients are concrete");
//! println!("{:02x?}", transaction.signing_hash());
//! ```
//!
//! Everything network-dependent (fee defaults, gas estimation, inclusion
//! polling) lives on [`fees::FeeResolver`], [`gas::GasEstimator`],
//! [`TransactionBodyBuilder`] and [`submit::TransactionSubmitter`].
//!
//! [`ForkDetector`]: fees::ForkDetector
//! [`FeeHistorySource`]: fees::FeeHistorySource
//! [`ChainSimulator`]: gas::ChainSimulator
//! [`Broadcaster`]: submit::Broadcaster
//! [`ReceiptSource`]: submit::ReceiptSource

pub mod fees;
pub mod gas;
pub mod network;
pub mod revert;
pub mod submit;
mod transaction_builder;
pub use transaction_builder::{
    BlockSource, NameResolver, TransactionBodyBuilder, TransactionBuilderError,
    DEFAULT_EXPIRATION,
};
pub mod transactions;
mod utils;
pub use alloy::primitives::{Address, U256};
pub use alloy_rlp::Bytes;
pub use utils::blake2_256;
