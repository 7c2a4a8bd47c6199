//! Per-network deployment state.
//!
//! One JSON file per `(network, namespace)` pair under the state directory,
//! mapping a logical key (`nft`, `wrappedUSD`, `agent+50`) to the clone that
//! was deployed for it. Files are created on the first recorded clone and
//! never removed by the tooling.
//!
//! There is no locking: two task runs against the same file at once will
//! lose one of the writes.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::chain::TxReceipt;
use crate::error::{Error, Result};
use crate::network::Network;

/// One deployed clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// Template contract the clone was made from
    #[serde(serialize_with = "checksummed")]
    pub source: Address,
    /// The clone itself; unset until the clone transaction is mined
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "checksummed_opt"
    )]
    pub target: Option<Address>,
    /// Logic contract the clone delegates to
    #[serde(serialize_with = "checksummed")]
    pub fallback: Address,
    /// Receipt of the clone transaction, kept as the node returned it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_receipt: Option<Value>,
}

fn checksummed<S: Serializer>(
    address: &Address,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&address.to_checksum(None))
}

fn checksummed_opt<S: Serializer>(
    address: &Option<Address>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match address {
        Some(address) => checksummed(address, serializer),
        None => serializer.serialize_none(),
    }
}

impl DeploymentRecord {
    /// Target, treating the zero address as unset.
    pub fn deployed_target(&self) -> Option<Address> {
        self.target.filter(|t| !t.is_zero())
    }

    /// Record of a mined clone.
    pub fn cloned(
        source: Address,
        target: Address,
        fallback: Address,
        receipt: &TxReceipt,
    ) -> Self {
        Self {
            source,
            target: Some(target),
            fallback,
            tx_receipt: serde_json::to_value(receipt).ok(),
        }
    }
}

/// A key's JSON as found on disk, with its parsed record when it has one.
/// Entries are written back from `raw`, so records nobody touched keep
/// every field and the exact address spelling they were read with.
#[derive(Debug, Clone)]
struct Entry {
    raw: Value,
    record: Option<DeploymentRecord>,
}

/// Where state files live.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
    network: Network,
}

impl StateStore {
    pub fn new(root: impl AsRef<Path>, network: Network) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            network,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.root
            .join(self.network.name())
            .join(format!("{}.json", namespace))
    }

    /// Load a namespace; a missing file is an empty state.
    pub async fn load(&self, namespace: &str) -> Result<StateFile> {
        let path = self.path_for(namespace);
        let raw: Map<String, Value> = match fs::read_to_string(&path).await {
            Ok(data) => serde_json::from_str(&data).map_err(|source| Error::StateFormat {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(Error::StateIo { path, source }),
        };

        let entries = raw
            .into_iter()
            .map(|(key, raw)| {
                let record = match serde_json::from_value::<DeploymentRecord>(raw.clone()) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(
                            "{}: ignoring {:?}, not a clone record: {}",
                            path.display(),
                            key,
                            e
                        );
                        None
                    }
                };
                (key, Entry { raw, record })
            })
            .collect();

        Ok(StateFile {
            network: self.network,
            path,
            entries,
        })
    }
}

/// The loaded contents of one state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    network: Network,
    path: PathBuf,
    entries: BTreeMap<String, Entry>,
}

impl StateFile {
    pub fn network(&self) -> Network {
        self.network
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&DeploymentRecord> {
        self.entries.get(key).and_then(|entry| entry.record.as_ref())
    }

    /// Deployed target for `key`, if any.
    pub fn target(&self, key: &str) -> Option<Address> {
        self.get(key).and_then(DeploymentRecord::deployed_target)
    }

    /// Number of keys in the file, including ones that are not clone records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the record for `key` in memory. Call [`StateFile::save`] to
    /// persist.
    pub fn insert(&mut self, key: impl Into<String>, record: DeploymentRecord) -> Result<()> {
        let raw = serde_json::to_value(&record).map_err(|source| Error::StateFormat {
            path: self.path.clone(),
            source,
        })?;
        self.entries.insert(
            key.into(),
            Entry {
                raw,
                record: Some(record),
            },
        );
        Ok(())
    }

    /// Write the whole file, creating the network directory if needed.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| Error::StateIo {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let raw: Map<String, Value> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.raw.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&raw).map_err(|source| Error::StateFormat {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json)
            .await
            .map_err(|source| Error::StateIo {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!("state written to {}", self.path.display());
        Ok(())
    }

    /// Insert and persist in one step.
    pub async fn update(&mut self, key: impl Into<String>, record: DeploymentRecord) -> Result<()> {
        self.insert(key, record)?;
        self.save().await
    }
}
