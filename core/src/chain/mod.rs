//! Blockchain collaborator - everything the tasks need from a node.
//!
//! Calls are strictly sequential: a write returns only once its receipt is
//! available, so the next step always sees the previous one mined.

pub mod rpc_client;
pub mod signer;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use alloy_primitives::{Address, Bytes, B256, U64};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ChainError;

pub use rpc_client::JsonRpcClient;
pub use signer::LocalSigners;

#[async_trait]
pub trait Chain: Send + Sync {
    /// Accounts that can sign, in named-account order.
    async fn accounts(&self) -> Result<Vec<Address>, ChainError>;

    /// Read-only contract call against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError>;

    /// Submit a transaction and block until it is mined. A mined-but-reverted
    /// transaction is an error.
    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxReceipt, ChainError>;
}

/// Transaction receipt as returned by `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_hash: B256,
    pub block_number: U64,
    pub gas_used: U64,
    /// `0x1` success, `0x0` reverted (absent on pre-Byzantium chains)
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<Log>,
    /// Remaining receipt fields, kept for the state file audit trail
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s != U64::ZERO).unwrap_or(true)
    }

    /// Logs whose first topic is `signature`.
    pub fn logs_with_topic(&self, signature: B256) -> impl Iterator<Item = &Log> {
        self.logs
            .iter()
            .filter(move |log| log.topics.first() == Some(&signature))
    }
}

/// Typed view call.
pub async fn read<C, T>(chain: &C, to: Address, call: &T) -> Result<T::Return, ChainError>
where
    C: Chain + ?Sized,
    T: SolCall,
{
    let out = chain.call(to, call.abi_encode().into()).await?;
    Ok(T::abi_decode_returns(&out, true)?)
}

/// Typed state-changing call; returns once mined.
pub async fn transact<C, T>(
    chain: &C,
    from: Address,
    to: Address,
    call: &T,
) -> Result<TxReceipt, ChainError>
where
    C: Chain + ?Sized,
    T: SolCall,
{
    tracing::debug!(
        "sending 0x{} from {} to {}",
        hex::encode(T::SELECTOR),
        from,
        to
    );
    chain.send_transaction(from, to, call.abi_encode().into()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_receipt_parses_hex_quantities() {
        let raw = json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "blockHash": format!("0x{}", "cd".repeat(32)),
            "blockNumber": "0x1b4",
            "gasUsed": "0x5208",
            "status": "0x1",
            "logs": [{
                "address": "0x0000000000000000000000000000000000000001",
                "topics": [format!("0x{}", "11".repeat(32))],
                "data": "0x"
            }],
            "cumulativeGasUsed": "0x5208"
        });

        let receipt: TxReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.block_number, U64::from(436));
        assert_eq!(receipt.gas_used, U64::from(21_000));
        assert!(receipt.succeeded());
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(
            receipt.logs_with_topic(B256::repeat_byte(0x11)).count(),
            1
        );
        assert_eq!(receipt.logs_with_topic(B256::ZERO).count(), 0);
    }

    #[test]
    fn test_receipt_status_zero_is_failure() {
        let raw = json!({
            "transactionHash": format!("0x{}", "00".repeat(32)),
            "blockHash": format!("0x{}", "00".repeat(32)),
            "blockNumber": "0x1",
            "gasUsed": "0x1",
            "status": "0x0"
        });
        let receipt: TxReceipt = serde_json::from_value(raw).unwrap();
        assert!(!receipt.succeeded());
        assert!(receipt.logs.is_empty());
    }
}
