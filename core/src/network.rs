//! Networks the DeMine contracts are deployed to.
//!
//! The network name keys everything on disk: state files, deployment
//! artifacts and the RPC endpoint override variable.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Matic,
    MaticDev,
    Bsc,
    BscDev,
    Localhost,
}

impl Network {
    pub const ALL: [Network; 5] = [
        Network::Matic,
        Network::MaticDev,
        Network::Bsc,
        Network::BscDev,
        Network::Localhost,
    ];

    /// Name used for state/deployment directories and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Matic => "matic",
            Network::MaticDev => "maticdev",
            Network::Bsc => "bsc",
            Network::BscDev => "bscdev",
            Network::Localhost => "localhost",
        }
    }

    /// EIP-155 chain id, bound into locally signed transactions.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Matic => 137,
            Network::MaticDev => 80001,
            Network::Bsc => 56,
            Network::BscDev => 97,
            Network::Localhost => 31337,
        }
    }

    /// Public endpoint, if the network has one. Polygon networks go through a
    /// keyed provider and must be configured explicitly.
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            Network::Matic | Network::MaticDev => None,
            Network::Bsc => Some("https://bsc-dataseed.binance.org/"),
            Network::BscDev => Some("https://data-seed-prebsc-1-s1.binance.org:8545"),
            Network::Localhost => Some("http://127.0.0.1:8545"),
        }
    }

    /// Fixed gas price in wei, when the network needs one.
    pub fn default_gas_price(&self) -> Option<u64> {
        match self {
            Network::Bsc => Some(5_000_000_000),
            Network::BscDev => Some(10_000_000_000),
            _ => None,
        }
    }

    /// Environment variable overriding the RPC endpoint, e.g. `DEMINE_BSC_RPC_URL`.
    pub fn rpc_env_var(&self) -> String {
        format!("DEMINE_{}_RPC_URL", self.name().to_uppercase())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Network::ALL
            .into_iter()
            .find(|n| n.name() == lower)
            .ok_or_else(|| {
                let known: Vec<_> = Network::ALL.iter().map(|n| n.name()).collect();
                format!("Unknown network '{}'. Known: {}", s, known.join(", "))
            })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
