use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::B256;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures talking to the chain or resolving on-chain collaborators.
/// Always fatal for the running task; nothing here is retried.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC connection failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed RPC response for {method}: {reason}")]
    Malformed { method: String, reason: String },

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("transaction {hash} not mined within {waited:?}")]
    ReceiptTimeout { hash: B256, waited: Duration },

    #[error("no Cloned event in receipt of {0}")]
    MissingCloneEvent(B256),

    #[error("ABI decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("deployment artifact {name} not found for network {network}")]
    ArtifactNotFound { network: String, name: String },

    #[error("deployment artifact {path}: {reason}")]
    ArtifactUnreadable { path: PathBuf, reason: String },

    #[error("signing key {name} {reason}")]
    InvalidKey { name: &'static str, reason: String },

    #[error("signing failed: {0}")]
    Signing(#[from] alloy_signer::Error),

    #[error("named account {name} (index {index}) not available on node")]
    MissingAccount { name: &'static str, index: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    /// Bad task parameters. Tasks log these and return a sentinel instead of
    /// failing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("state file {path}: {source}")]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is not valid JSON: {source}")]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key} for {namespace} is not deployed on {network}")]
    NotDeployed {
        network: String,
        namespace: String,
        key: String,
    },

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
