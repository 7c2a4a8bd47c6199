//! Deployment artifact lookup
//!
//! Base contracts (Diamond, facets, strategies) are deployed once per
//! network by the contract deployment pipeline, which leaves one JSON
//! artifact per contract: `<deployments_dir>/<network>/<Name>.json`.

use alloy_primitives::Address;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::ChainError;
use crate::network::Network;

pub trait Registry: Send + Sync {
    /// On-chain address of a named deployment.
    fn address(&self, name: &str) -> Result<Address, ChainError>;

    /// ABI of a named deployment.
    fn abi(&self, name: &str) -> Result<Value, ChainError>;
}

#[derive(Debug, Deserialize)]
struct Artifact {
    address: Address,
    #[serde(default)]
    abi: Value,
}

/// Reads the hardhat-deploy directory layout.
#[derive(Debug, Clone)]
pub struct HardhatDeployments {
    network: Network,
    dir: PathBuf,
}

impl HardhatDeployments {
    pub fn new(root: impl AsRef<Path>, network: Network) -> Self {
        Self {
            network,
            dir: root.as_ref().join(network.name()),
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    fn load(&self, name: &str) -> Result<Artifact, ChainError> {
        let path = self.artifact_path(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChainError::ArtifactNotFound {
                    network: self.network.name().to_string(),
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(ChainError::ArtifactUnreadable {
                    path,
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_str(&content).map_err(|e| ChainError::ArtifactUnreadable {
            path,
            reason: e.to_string(),
        })
    }
}

impl Registry for HardhatDeployments {
    fn address(&self, name: &str) -> Result<Address, ChainError> {
        let artifact = self.load(name)?;
        tracing::debug!("{} resolved to {} on {}", name, artifact.address, self.network);
        Ok(artifact.address)
    }

    fn abi(&self, name: &str) -> Result<Value, ChainError> {
        Ok(self.load(name)?.abi)
    }
}

/// Fixed name -> address table.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    addresses: std::collections::HashMap<String, Address>,
}

#[cfg(any(test, feature = "test-utils"))]
impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, address: Address) -> Self {
        self.addresses.insert(name.to_string(), address);
        self
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Registry for InMemoryRegistry {
    fn address(&self, name: &str) -> Result<Address, ChainError> {
        self.addresses
            .get(name)
            .copied()
            .ok_or_else(|| ChainError::ArtifactNotFound {
                network: "memory".to_string(),
                name: name.to_string(),
            })
    }

    fn abi(&self, name: &str) -> Result<Value, ChainError> {
        self.address(name).map(|_| Value::Array(vec![]))
    }
}
