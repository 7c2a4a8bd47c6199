//! Idempotent proxy cloning.
//!
//! A clone is redeployed only when the recorded `(source, fallback)` pair
//! differs from the intended one, or when no target was ever recorded.
//! The comparison is exact; a partially matching record is never reused.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolEvent;
use std::fmt;

use crate::chain::{self, Chain, TxReceipt};
use crate::contracts::diamond::{self, FacetCut};
use crate::error::{ChainError, Result};
use crate::state::{DeploymentRecord, StateFile};

/// Why a recorded clone can't be reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    SourceChanged { recorded: Address, intended: Address },
    FallbackChanged { recorded: Address, intended: Address },
    TargetUnset,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::SourceChanged { recorded, intended } => {
                write!(f, "source changed {} -> {}", recorded, intended)
            }
            StaleReason::FallbackChanged { recorded, intended } => {
                write!(f, "fallback changed {} -> {}", recorded, intended)
            }
            StaleReason::TargetUnset => write!(f, "no target recorded"),
        }
    }
}

/// Outcome of comparing a prior record with the intended deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Absent,
    Stale(StaleReason),
    Current(Address),
}

impl Reconciliation {
    pub fn check(prior: Option<&DeploymentRecord>, source: Address, fallback: Address) -> Self {
        let Some(prior) = prior else {
            return Reconciliation::Absent;
        };
        if prior.source != source {
            return Reconciliation::Stale(StaleReason::SourceChanged {
                recorded: prior.source,
                intended: source,
            });
        }
        if prior.fallback != fallback {
            return Reconciliation::Stale(StaleReason::FallbackChanged {
                recorded: prior.fallback,
                intended: fallback,
            });
        }
        match prior.deployed_target() {
            Some(target) => Reconciliation::Current(target),
            None => Reconciliation::Stale(StaleReason::TargetUnset),
        }
    }

    /// Check `key` in a loaded state file.
    pub fn of(state: &StateFile, key: &str, source: Address, fallback: Address) -> Self {
        Self::check(state.get(key), source, fallback)
    }

    pub fn current(&self) -> Option<Address> {
        match self {
            Reconciliation::Current(target) => Some(*target),
            _ => None,
        }
    }
}

/// Everything needed to clone `source` into a new proxy.
#[derive(Debug, Clone)]
pub struct CloneRequest {
    pub key: String,
    pub source: Address,
    pub fallback: Address,
    pub owner: Address,
    /// Account submitting the clone transaction
    pub sender: Address,
    pub facet_cuts: Vec<FacetCut>,
    /// ABI-encoded call to the fallback's initializer
    pub init_data: Bytes,
}

/// Submit one clone transaction and return the new proxy address with its
/// receipt.
pub async fn clone_contract<C>(chain: &C, request: &CloneRequest) -> Result<(Address, TxReceipt)>
where
    C: Chain + ?Sized,
{
    let call = diamond::cloneCall {
        owner: request.owner,
        facetCuts: request.facet_cuts.clone(),
        fallbackAddress: request.fallback,
        fallbackInitData: request.init_data.clone(),
    };
    let receipt = chain::transact(chain, request.sender, request.source, &call).await?;
    let cloned = cloned_address(&receipt, request.source)?;
    Ok((cloned, receipt))
}

/// Target of the `Cloned` event emitted by `source`.
pub fn cloned_address(receipt: &TxReceipt, source: Address) -> Result<Address, ChainError> {
    receipt
        .logs_with_topic(diamond::Cloned::SIGNATURE_HASH)
        .filter(|log| log.address == source)
        .find_map(|log| log.topics.get(2).map(|topic| Address::from_word(*topic)))
        .ok_or(ChainError::MissingCloneEvent(receipt.transaction_hash))
}

/// Return the recorded clone for `request.key` when it is current, otherwise
/// clone, record the result in `state` and persist it.
pub async fn ensure_cloned<C>(chain: &C, state: &mut StateFile, request: &CloneRequest) -> Result<Address>
where
    C: Chain + ?Sized,
{
    match Reconciliation::of(state, &request.key, request.source, request.fallback) {
        Reconciliation::Current(target) => {
            tracing::warn!("Nothing changed for {}, keeping {}", request.key, target);
            return Ok(target);
        }
        Reconciliation::Stale(reason) => {
            tracing::info!("{} is stale ({}), re-cloning", request.key, reason);
        }
        Reconciliation::Absent => {
            tracing::info!("{} not deployed yet on {}", request.key, state.network());
        }
    }

    let (cloned, receipt) = clone_contract(chain, request).await?;
    tracing::info!("✅ Cloned {} at {} (tx {})", request.key, cloned, receipt.transaction_hash);

    state
        .update(
            request.key.clone(),
            DeploymentRecord::cloned(request.source, cloned, request.fallback, &receipt),
        )
        .await?;
    Ok(cloned)
}
