//! In-memory [`Chain`] for tests.
//!
//! Views are answered from a table keyed by `(contract, selector)`. Every
//! write is recorded; `clone(...)` writes additionally emit a `Cloned` event
//! for the next queued target address.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use super::{Chain, Log, TxReceipt};
use crate::contracts::diamond;
use crate::error::ChainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

impl SentTransaction {
    pub fn selector(&self) -> [u8; 4] {
        let mut selector = [0u8; 4];
        if self.data.len() >= 4 {
            selector.copy_from_slice(&self.data[..4]);
        }
        selector
    }

    pub fn is<T: SolCall>(&self) -> bool {
        self.selector() == T::SELECTOR
    }

    pub fn decode<T: SolCall>(&self) -> Result<T, ChainError> {
        Ok(T::abi_decode(&self.data, true)?)
    }
}

#[derive(Default)]
pub struct MockChain {
    accounts: Vec<Address>,
    views: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    sent: Mutex<Vec<SentTransaction>>,
    clone_targets: Mutex<VecDeque<Address>>,
    revert_on: Mutex<Option<[u8; 4]>>,
}

impl MockChain {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts,
            ..Default::default()
        }
    }

    /// Four distinct accounts: deployer, admin, custodian, alchemist.
    pub fn with_named_accounts() -> Self {
        Self::new((1..=4u8).map(Address::repeat_byte).collect())
    }

    pub fn account(&self, index: usize) -> Address {
        self.accounts[index]
    }

    pub fn set_view<T: SolCall>(&self, to: Address, output: Bytes) {
        self.views.lock().insert((to, T::SELECTOR), output);
    }

    /// Answer a view returning a single integer word.
    pub fn set_uint<T: SolCall>(&self, to: Address, value: U256) {
        self.set_view::<T>(to, Bytes::from(value.to_be_bytes::<32>().to_vec()));
    }

    /// Queue the address the next clone transaction will report.
    pub fn push_clone_target(&self, target: Address) {
        self.clone_targets.lock().push_back(target);
    }

    /// Make every transaction with this selector revert.
    pub fn revert_on<T: SolCall>(&self) {
        *self.revert_on.lock() = Some(T::SELECTOR);
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_of<T: SolCall>(&self) -> Vec<SentTransaction> {
        self.sent.lock().iter().filter(|tx| tx.is::<T>()).cloned().collect()
    }

    fn clone_log(&self, source: Address, nonce: usize) -> Result<Log, ChainError> {
        let target = self
            .clone_targets
            .lock()
            .pop_front()
            .unwrap_or_else(|| Address::from_word(keccak256(format!("clone-{}", nonce))));
        Ok(Log {
            address: source,
            topics: vec![
                diamond::Cloned::SIGNATURE_HASH,
                source.into_word(),
                target.into_word(),
            ],
            data: Bytes::new(),
        })
    }
}

#[async_trait]
impl Chain for MockChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.accounts.clone())
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let mut selector = [0u8; 4];
        if data.len() >= 4 {
            selector.copy_from_slice(&data[..4]);
        }
        self.views
            .lock()
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            })
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> Result<TxReceipt, ChainError> {
        let tx = SentTransaction { from, to, data };
        let nonce = {
            let mut sent = self.sent.lock();
            sent.push(tx.clone());
            sent.len()
        };
        let hash = keccak256(format!("tx-{}", nonce));

        if *self.revert_on.lock() == Some(tx.selector()) {
            return Err(ChainError::Reverted(hash));
        }

        let logs = if tx.is::<diamond::cloneCall>() {
            vec![self.clone_log(to, nonce)?]
        } else {
            Vec::new()
        };

        Ok(TxReceipt {
            transaction_hash: hash,
            block_hash: B256::from(U256::from(nonce)),
            block_number: U64::from(nonce),
            gas_used: U64::from(21_000u64),
            status: Some(U64::from(1u64)),
            logs,
            extra: Default::default(),
        })
    }
}
