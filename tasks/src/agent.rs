use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use demine_core::chain;
use demine_core::contracts::{mortgage, wrapped};
use demine_core::units::{parse_cost, to_base_units};
use demine_core::{ensure_cloned, Chain, CloneRequest, Reconciliation, Registry, Result};
use serde_json::json;

use crate::context::TaskContext;
use crate::nft::{ensure_nft, NFT_KEY};
use crate::or_sentinel;
use crate::wrapped::{ensure_wrapped, wrapped_key};

pub const PRICING_STRATEGIES: [&str; 2] = ["PricingStatic", "PricingLinearDecay"];
pub const ALLOWANCE_STRATEGIES: [&str; 2] = ["AllowanceFixedOneTime", "AllowanceRangeOneTime"];

/// State key of the agent selling `coin` NFTs at `cost`.
pub fn agent_key(cost: &str) -> String {
    format!("agent+{}", cost)
}

/// `agent-clone`: ensure a mortgage agent for `coin` NFTs priced at `cost`
/// USD per token.
pub async fn agent_clone<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    coin: &str,
    cost: &str,
) -> Result<Address> {
    or_sentinel(clone_agent(ctx, coin, cost).await)
}

async fn clone_agent<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    coin: &str,
    cost: &str,
) -> Result<Address> {
    let cost_value = parse_cost(cost)?;
    tracing::info!("=========== MortgageFacet-clone start ===========");
    ctx.require_nft_coin(coin)?;

    let key = agent_key(cost);
    let base = ctx.deployment("Diamond")?;
    let mortgage_facet = ctx.deployment("MortgageFacet")?;

    let mut state = ctx.store().load(coin).await?;
    if let Some(target) = Reconciliation::of(&state, &key, base, mortgage_facet).current() {
        tracing::warn!("Nothing changed.");
        tracing::info!("=========== MortgageFacet-clone skipped ===========");
        return Ok(target);
    }

    let nft_addr = match state.target(NFT_KEY) {
        Some(addr) => addr,
        None => ensure_nft(ctx, &mut state, coin).await?,
    };
    let payment_token = payment_token(ctx).await?;

    let decimals = chain::read(&ctx.chain, payment_token, &wrapped::decimalsCall {})
        .await?
        ._0;
    let token_cost = to_base_units(cost_value, decimals)?;

    let admin = ctx.admin().await?;
    let pricing = resolve_all(ctx, &PRICING_STRATEGIES)?;
    let allowance = resolve_all(ctx, &ALLOWANCE_STRATEGIES)?;

    log_clone_plan(
        ctx,
        base,
        admin,
        mortgage_facet,
        nft_addr,
        payment_token,
        token_cost,
        cost,
        &pricing,
        &allowance,
    );

    let init = mortgage::initCall {
        nft: nft_addr,
        paymentToken: payment_token,
        custodian: admin,
        tokenCost: token_cost,
        pricingStrategies: pricing.iter().map(|(_, a)| *a).collect(),
        allowanceStrategies: allowance.iter().map(|(_, a)| *a).collect(),
    };
    let request = CloneRequest {
        key,
        source: base,
        fallback: mortgage_facet,
        owner: admin,
        sender: admin,
        facet_cuts: vec![],
        init_data: init.abi_encode().into(),
    };
    let cloned = ensure_cloned(&ctx.chain, &mut state, &request).await?;
    tracing::info!("Cloned contract DeMine MortgageFacet at {}", cloned);
    Ok(cloned)
}

/// Payment token: a configured stablecoin, else the wrapped USD clone
/// (deployed on demand).
async fn payment_token<C: Chain, R: Registry>(ctx: &TaskContext<C, R>) -> Result<Address> {
    if let Some(token) = ctx.config.network(ctx.network).payment_token {
        return Ok(token);
    }
    let usd = ctx.store().load("usd").await?;
    match usd.target(&wrapped_key("usd")) {
        Some(token) => Ok(token),
        None => ensure_wrapped(ctx, "usd").await,
    }
}

fn resolve_all<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    names: &[&'static str],
) -> Result<Vec<(&'static str, Address)>> {
    names
        .iter()
        .map(|name| Ok((*name, ctx.deployment(name)?)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn log_clone_plan<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    source: Address,
    owner: Address,
    fallback: Address,
    nft: Address,
    payment_token: Address,
    token_cost: U256,
    cost: &str,
    pricing: &[(&str, Address)],
    allowance: &[(&str, Address)],
) {
    let strategies = |entries: &[(&str, Address)]| {
        entries
            .iter()
            .map(|(name, addr)| (name.to_string(), json!(addr)))
            .collect::<serde_json::Map<_, _>>()
    };
    let plan = json!({
        "network": ctx.network.name(),
        "source": source,
        "owner": owner,
        "fallback": fallback,
        "fallbackInitArgs": {
            "nft": nft,
            "paymentToken": payment_token,
            "custodian": owner,
            "tokenCost": token_cost.to_string(),
            "tokenCostDecimal": cost,
            "pricingStrategies": strategies(pricing),
            "allowanceStrategies": strategies(allowance),
        }
    });
    tracing::info!(
        "Cloning Mining3Agent: {}",
        serde_json::to_string_pretty(&plan).unwrap_or_default()
    );
}
