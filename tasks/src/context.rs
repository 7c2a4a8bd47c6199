use alloy_primitives::Address;
use demine_core::{Chain, ChainError, Config, Error, Network, Registry, Result, StateStore};

/// Accounts the tasks sign with, by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedAccount {
    Deployer,
    Admin,
    Custodian,
    Alchemist,
}

impl NamedAccount {
    pub const ALL: [NamedAccount; 4] = [
        NamedAccount::Deployer,
        NamedAccount::Admin,
        NamedAccount::Custodian,
        NamedAccount::Alchemist,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NamedAccount::Deployer => "deployer",
            NamedAccount::Admin => "admin",
            NamedAccount::Custodian => "custodian",
            NamedAccount::Alchemist => "alchemist",
        }
    }

    fn index(&self, config: &Config) -> usize {
        let accounts = &config.named_accounts;
        match self {
            NamedAccount::Deployer => accounts.deployer,
            NamedAccount::Admin => accounts.admin,
            NamedAccount::Custodian => accounts.custodian,
            NamedAccount::Alchemist => accounts.alchemist,
        }
    }
}

/// Everything a task runs against: one network, its node and artifacts,
/// and the immutable configuration.
pub struct TaskContext<C, R> {
    pub config: Config,
    pub network: Network,
    pub chain: C,
    pub registry: R,
}

impl<C: Chain, R: Registry> TaskContext<C, R> {
    pub fn new(config: Config, network: Network, chain: C, registry: R) -> Self {
        Self {
            config,
            network,
            chain,
            registry,
        }
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.config.state_dir, self.network)
    }

    pub async fn account(&self, role: NamedAccount) -> Result<Address> {
        let index = role.index(&self.config);
        let accounts = self.chain.accounts().await?;
        accounts.get(index).copied().ok_or_else(|| {
            Error::Chain(ChainError::MissingAccount {
                name: role.name(),
                index,
            })
        })
    }

    pub async fn admin(&self) -> Result<Address> {
        self.account(NamedAccount::Admin).await
    }

    /// Royalty recipient: the network's configured custodian, else the
    /// custodian account.
    pub async fn custodian(&self) -> Result<Address> {
        match self.config.network(self.network).custodian {
            Some(custodian) => Ok(custodian),
            None => self.account(NamedAccount::Custodian).await,
        }
    }

    pub fn deployment(&self, name: &str) -> Result<Address> {
        Ok(self.registry.address(name)?)
    }

    pub fn require_nft_coin(&self, coin: &str) -> Result<()> {
        if self.config.is_nft_coin(coin) {
            Ok(())
        } else {
            let known: Vec<_> = self.config.token_uri.keys().map(String::as_str).collect();
            Err(Error::InvalidInput(format!(
                "Unknown coin {:?}, expected one of {}",
                coin,
                known.join(", ")
            )))
        }
    }
}
