use alloy_primitives::Address;
use demine_core::{Chain, Registry, Result};
use serde_json::Value;

use crate::context::{NamedAccount, TaskContext};

/// `accounts`: every named account with the address it resolves to.
pub async fn accounts<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
) -> Result<Vec<(&'static str, Address)>> {
    let mut resolved = Vec::with_capacity(NamedAccount::ALL.len());
    for role in NamedAccount::ALL {
        resolved.push((role.name(), ctx.account(role).await?));
    }
    Ok(resolved)
}

/// `abi`: the ABI of a deployed contract.
pub fn abi<C: Chain, R: Registry>(ctx: &TaskContext<C, R>, contract: &str) -> Result<Value> {
    Ok(ctx.registry.abi(contract)?)
}
