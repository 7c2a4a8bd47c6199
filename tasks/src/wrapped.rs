use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use demine_core::contracts::wrapped;
use demine_core::{ensure_cloned, Chain, CloneRequest, Error, Reconciliation, Registry, Result, StateFile};

use crate::context::TaskContext;
use crate::or_sentinel;

/// State key of the wrapped token for `coin`, e.g. `wrappedUSD`.
pub fn wrapped_key(coin: &str) -> String {
    format!("wrapped{}", coin.to_uppercase())
}

/// `wrapped-clone`: ensure the wrapped token for `coin` is deployed.
pub async fn wrapped_clone<C: Chain, R: Registry>(ctx: &TaskContext<C, R>, coin: &str) -> Result<Address> {
    or_sentinel(ensure_wrapped(ctx, coin).await)
}

/// Wrapped token address for `coin`, cloning it when needed. Uses the
/// coin's own state file.
pub(crate) async fn ensure_wrapped<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    coin: &str,
) -> Result<Address> {
    let mut state = ctx.store().load(coin).await?;
    clone_wrapped(ctx, &mut state, coin).await
}

async fn clone_wrapped<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    state: &mut StateFile,
    coin: &str,
) -> Result<Address> {
    let token = ctx
        .config
        .wrapped_token(coin)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("No wrapped token configured for {:?}", coin)))?;

    tracing::info!("=========== Wrapped{}-clone start ===========", coin.to_uppercase());
    let key = wrapped_key(coin);
    let base = ctx.deployment("Diamond")?;
    let facet = ctx.deployment("ERC20Facet")?;

    if let Some(target) = Reconciliation::of(state, &key, base, facet).current() {
        tracing::warn!("Nothing changed.");
        tracing::info!("=========== Wrapped{}-clone skipped ===========", coin.to_uppercase());
        return Ok(target);
    }

    let admin = ctx.admin().await?;
    tracing::info!(
        "Cloning {} ({}, {} decimals) on {} from {} with fallback {}",
        token.name,
        token.symbol,
        token.decimals,
        ctx.network,
        base,
        facet
    );
    let init = wrapped::initCall {
        name: token.name,
        symbol: token.symbol,
        decimals: token.decimals,
    };
    let request = CloneRequest {
        key,
        source: base,
        fallback: facet,
        owner: admin,
        sender: admin,
        facet_cuts: vec![],
        init_data: init.abi_encode().into(),
    };
    let cloned = ensure_cloned(&ctx.chain, state, &request).await?;
    tracing::info!("=========== Wrapped{}-clone end ===========", coin.to_uppercase());
    Ok(cloned)
}
