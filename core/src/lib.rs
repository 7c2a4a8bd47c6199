//! DeMine deployment core.
//!
//! Tracks what has been deployed on each network, decides whether a proxy
//! clone has to be (re)deployed, and drives the daily NFT finalization.

pub mod chain;
pub mod clone;
pub mod config;
pub mod contracts;
pub mod error;
pub mod finalize;
pub mod network;
pub mod registry;
pub mod state;
pub mod units;

pub use chain::{Chain, JsonRpcClient, LocalSigners, TxReceipt};
pub use clone::{ensure_cloned, CloneRequest, Reconciliation, StaleReason};
pub use config::Config;
pub use error::{ChainError, Error, Result};
pub use finalize::{FinalizePlan, FinalizeReport, FinalizeStep, Finalizer, DAY};
pub use network::Network;
pub use registry::{HardhatDeployments, Registry};
pub use state::{DeploymentRecord, StateFile, StateStore};
