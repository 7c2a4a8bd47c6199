//! Ethereum JSON-RPC client over HTTP
//!
//! With local signers attached, transactions are signed here and sent via
//! `eth_sendRawTransaction`. Without them signing is left to the node and
//! transactions go out through `eth_sendTransaction`.

use alloy_consensus::TxLegacy;
use alloy_primitives::{Address, Bytes, TxKind, B256, U128, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::{Chain, LocalSigners, TxReceipt};
use crate::config::RpcConfig;
use crate::error::ChainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

pub struct JsonRpcClient {
    base_url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    gas_price: Option<u64>,
    poll_interval: Duration,
    receipt_timeout: Duration,
    local: Option<LocalSigning>,
}

struct LocalSigning {
    signers: LocalSigners,
    chain_id: u64,
}

impl JsonRpcClient {
    pub fn new(
        base_url: impl Into<String>,
        rpc: &RpcConfig,
        gas_price: Option<u64>,
    ) -> Result<Self, ChainError> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(rpc.timeout())
            .build()?;

        tracing::info!("JsonRpcClient initialized: {}", base_url);

        Ok(Self {
            base_url,
            client,
            next_id: AtomicU64::new(1),
            gas_price,
            poll_interval: rpc.poll_interval(),
            receipt_timeout: rpc.receipt_timeout(),
            local: None,
        })
    }

    /// Sign locally for `chain_id` instead of using node-managed accounts.
    pub fn with_signers(mut self, signers: LocalSigners, chain_id: u64) -> Self {
        tracing::info!(
            "Signing locally for chain {} with {} key(s)",
            chain_id,
            signers.addresses().len()
        );
        self.local = Some(LocalSigning { signers, chain_id });
        self
    }

    pub fn signs_locally(&self) -> bool {
        self.local.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn payload(&self, method: &str, params: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params,
        }
    }

    /// Raw JSON-RPC call
    pub async fn call_raw(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let payload = self.payload(method, params);

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Http(status));
        }

        let rpc_response: RpcResponse = response.json().await?;
        unwrap_response(method, rpc_response)
    }

    /// Typed JSON-RPC call
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let value = self.call_raw(method, params).await?;
        serde_json::from_value(value).map_err(|e| ChainError::Malformed {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn get_receipt(&self, hash: B256) -> Result<Option<TxReceipt>, ChainError> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }

    /// Poll until the transaction is mined or the receipt timeout elapses.
    pub async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, ChainError> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.get_receipt(hash).await? {
                if !receipt.succeeded() {
                    tracing::error!("❌ transaction {} reverted in block {}", hash, receipt.block_number);
                    return Err(ChainError::Reverted(hash));
                }
                return Ok(receipt);
            }

            if started.elapsed() >= self.receipt_timeout {
                return Err(ChainError::ReceiptTimeout {
                    hash,
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn transaction_object(&self, from: Address, to: Address, data: &Bytes) -> Value {
        let mut tx = json!({
            "from": from,
            "to": to,
            "data": data,
        });
        if let Some(price) = self.gas_price {
            tx["gasPrice"] = json!(format!("{:#x}", price));
        }
        tx
    }

    async fn send_signed(
        &self,
        local: &LocalSigning,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<B256, ChainError> {
        let nonce: U64 = self
            .request("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price: U128 = match self.gas_price {
            Some(price) => U128::from(price),
            None => self.request("eth_gasPrice", json!([])).await?,
        };
        let gas_limit: U64 = self
            .request("eth_estimateGas", json!([self.transaction_object(from, to, &data)]))
            .await?;

        let tx = TxLegacy {
            chain_id: Some(local.chain_id),
            nonce: nonce.saturating_to(),
            gas_price: gas_price.saturating_to(),
            gas_limit: gas_limit.saturating_to(),
            to: TxKind::Call(to),
            value: U256::ZERO,
            input: data,
        };
        tracing::debug!(
            "signing tx from {} nonce {} gas {} @ {}",
            from,
            tx.nonce,
            tx.gas_limit,
            tx.gas_price
        );
        let raw = local.signers.sign(from, tx).await?;
        self.request("eth_sendRawTransaction", json!([raw])).await
    }
}

fn unwrap_response(method: &str, response: RpcResponse) -> Result<Value, ChainError> {
    if let Some(error) = response.error {
        tracing::error!("RPC error from {}: {} ({})", method, error.message, error.code);
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

#[async_trait]
impl Chain for JsonRpcClient {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        match &self.local {
            Some(local) => Ok(local.signers.addresses().to_vec()),
            None => self.request("eth_accounts", json!([])).await,
        }
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxReceipt, ChainError> {
        let hash: B256 = match &self.local {
            Some(local) => self.send_signed(local, from, to, data).await?,
            None => {
                let tx = self.transaction_object(from, to, &data);
                self.request("eth_sendTransaction", json!([tx])).await?
            }
        };
        tracing::info!("⏳ submitted {}, waiting for receipt", hash);
        self.wait_for_receipt(hash).await
    }
}
