//! Local transaction signing with the operator's keys.
//!
//! Keys are read from `DEPLOYER`, `ADMIN`, `CUSTODIAN` and `ALCHEMIST`, in
//! that order, so the named account indices mean the same thing whether the
//! node or this process holds the keys.

use alloy_consensus::{TxEnvelope, TxLegacy, TypedTransaction};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::{Ethereum, EthereumWallet, NetworkWallet};
use alloy_primitives::{Address, Bytes};
use alloy_signer_local::PrivateKeySigner;

use crate::error::ChainError;

pub const KEY_ENV_VARS: [&str; 4] = ["DEPLOYER", "ADMIN", "CUSTODIAN", "ALCHEMIST"];

pub struct LocalSigners {
    wallet: EthereumWallet,
    addresses: Vec<Address>,
}

impl LocalSigners {
    /// Signers for `(name, key)` pairs in account order. `None` when no key
    /// is given; a missing key followed by a present one is an error since
    /// it would shift every later account index.
    pub fn from_keys<'a, I>(keys: I) -> Result<Option<Self>, ChainError>
    where
        I: IntoIterator<Item = (&'static str, Option<&'a str>)>,
    {
        let mut signers = Vec::new();
        let mut gap: Option<&'static str> = None;
        for (name, key) in keys {
            match key {
                Some(key) => {
                    if let Some(missing) = gap {
                        return Err(ChainError::InvalidKey {
                            name,
                            reason: format!("set while {} is not", missing),
                        });
                    }
                    let signer: PrivateKeySigner =
                        key.trim().parse().map_err(|e| ChainError::InvalidKey {
                            name,
                            reason: format!("{}", e),
                        })?;
                    signers.push(signer);
                }
                None => {
                    gap.get_or_insert(name);
                }
            }
        }

        let mut signers = signers.into_iter();
        let Some(first) = signers.next() else {
            return Ok(None);
        };
        let mut addresses = vec![first.address()];
        let mut wallet = EthereumWallet::new(first);
        for signer in signers {
            addresses.push(signer.address());
            wallet.register_signer(signer);
        }
        Ok(Some(Self { wallet, addresses }))
    }

    /// Keys from the process environment; empty variables count as unset.
    pub fn from_env() -> Result<Option<Self>, ChainError> {
        let values: Vec<(&'static str, Option<String>)> = KEY_ENV_VARS
            .iter()
            .map(|name| {
                let value = std::env::var(name).ok().filter(|v| !v.trim().is_empty());
                (*name, value)
            })
            .collect();
        Self::from_keys(values.iter().map(|(name, value)| (*name, value.as_deref())))
    }

    /// Signer addresses, in account order.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Sign `tx` as `from` and return the EIP-2718 encoding for
    /// `eth_sendRawTransaction`.
    pub async fn sign(&self, from: Address, tx: TxLegacy) -> Result<Bytes, ChainError> {
        let envelope: TxEnvelope = <EthereumWallet as NetworkWallet<Ethereum>>::sign_transaction_from(
            &self.wallet,
            from,
            TypedTransaction::Legacy(tx),
        )
        .await?;
        Ok(envelope.encoded_2718().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_eips::eip2718::Decodable2718;
    use alloy_primitives::{address, TxKind, U256};

    // well-known development keys (hardhat accounts #0 and #1)
    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn test_addresses_follow_key_order() {
        let signers = LocalSigners::from_keys([
            ("DEPLOYER", Some(KEY_0)),
            ("ADMIN", Some(KEY_1)),
            ("CUSTODIAN", None),
            ("ALCHEMIST", None),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(
            signers.addresses(),
            [
                address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
                address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            ]
        );
    }

    #[test]
    fn test_no_keys() {
        assert!(LocalSigners::from_keys([("DEPLOYER", None), ("ADMIN", None)])
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_gap_in_keys() {
        let err = LocalSigners::from_keys([("DEPLOYER", None), ("ADMIN", Some(KEY_1))])
            .err()
            .unwrap();
        assert!(matches!(err, ChainError::InvalidKey { name: "ADMIN", .. }));
    }

    #[test]
    fn test_bad_key() {
        let err = LocalSigners::from_keys([("DEPLOYER", Some("0x1234"))]).err().unwrap();
        assert!(matches!(err, ChainError::InvalidKey { name: "DEPLOYER", .. }));
    }

    #[tokio::test]
    async fn test_sign_legacy_transaction() {
        let signers = LocalSigners::from_keys([("DEPLOYER", Some(KEY_0))]).unwrap().unwrap();
        let from = signers.addresses()[0];
        let tx = TxLegacy {
            chain_id: Some(97),
            nonce: 7,
            gas_price: 10_000_000_000,
            gas_limit: 21_000,
            to: TxKind::Call(Address::repeat_byte(0xd0)),
            value: U256::ZERO,
            input: Bytes::from(vec![0xca, 0xfe]),
        };

        let raw = signers.sign(from, tx).await.unwrap();
        let decoded = TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap();
        let TxEnvelope::Legacy(signed) = decoded else {
            panic!("expected a legacy transaction");
        };
        assert_eq!(signed.tx().nonce, 7);
        assert_eq!(signed.tx().chain_id, Some(97));
        assert_eq!(signed.tx().input, Bytes::from(vec![0xca, 0xfe]));
    }

    #[tokio::test]
    async fn test_sign_for_unknown_sender() {
        let signers = LocalSigners::from_keys([("DEPLOYER", Some(KEY_0))]).unwrap().unwrap();
        let err = signers
            .sign(Address::repeat_byte(9), TxLegacy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Signing(_)));
    }
}
