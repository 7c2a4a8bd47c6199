use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use chrono::{DateTime, Utc};
use demine_core::contracts::nft;
use demine_core::finalize::{day_timestamp, start_of_day};
use demine_core::{
    ensure_cloned, Chain, CloneRequest, Error, FinalizeReport, Finalizer, Reconciliation, Registry,
    Result, StateFile,
};

use crate::context::TaskContext;
use crate::or_sentinel;

pub const NFT_KEY: &str = "nft";

/// `nft-clone`: ensure the ERC1155 NFT for `coin` is deployed.
pub async fn nft_clone<C: Chain, R: Registry>(ctx: &TaskContext<C, R>, coin: &str) -> Result<Address> {
    or_sentinel(load_and_ensure_nft(ctx, coin).await)
}

async fn load_and_ensure_nft<C: Chain, R: Registry>(ctx: &TaskContext<C, R>, coin: &str) -> Result<Address> {
    ctx.require_nft_coin(coin)?;
    let mut state = ctx.store().load(coin).await?;
    ensure_nft(ctx, &mut state, coin).await
}

/// NFT clone for `coin` recorded in `state`, deploying it if needed.
pub(crate) async fn ensure_nft<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    state: &mut StateFile,
    coin: &str,
) -> Result<Address> {
    tracing::info!("=========== ERC1155Facet-clone start ===========");
    let base = ctx.deployment("Diamond")?;
    let facet = ctx.deployment("ERC1155Facet")?;

    if let Some(target) = Reconciliation::of(state, NFT_KEY, base, facet).current() {
        tracing::warn!("Nothing changed.");
        tracing::info!("=========== ERC1155Facet-clone skipped ===========");
        return Ok(target);
    }

    let uri = ctx
        .config
        .token_uri
        .get(coin)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("No token URI configured for {:?}", coin)))?;
    let admin = ctx.admin().await?;
    let custodian = ctx.custodian().await?;

    tracing::info!(
        "Cloning DeMine NFT for {} on {}: source={} fallback={} royalty={}bps to {} uri={}",
        coin,
        ctx.network,
        base,
        facet,
        ctx.config.royalty_bps,
        custodian,
        uri
    );
    let init = nft::initCall {
        royaltyRecipient: custodian,
        royaltyBps: ctx.config.royalty_bps,
        uri,
    };
    let request = CloneRequest {
        key: NFT_KEY.to_string(),
        source: base,
        fallback: facet,
        owner: admin,
        sender: admin,
        facet_cuts: vec![],
        init_data: init.abi_encode().into(),
    };
    let cloned = ensure_cloned(&ctx.chain, state, &request).await?;
    tracing::info!("=========== ERC1155Facet-clone end ===========");
    Ok(cloned)
}

/// Deployed NFT for `coin`; finalizing needs an existing clone.
async fn deployed_nft<C: Chain, R: Registry>(ctx: &TaskContext<C, R>, coin: &str) -> Result<Address> {
    let state = ctx.store().load(coin).await?;
    state.target(NFT_KEY).ok_or_else(|| Error::NotDeployed {
        network: ctx.network.to_string(),
        namespace: coin.to_string(),
        key: NFT_KEY.to_string(),
    })
}

/// `nft-admin-finalize`: a single finalize transaction. With a timestamp it
/// pins the first finalized day; without one it finalizes the next day.
pub async fn nft_admin_finalize<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    coin: &str,
    timestamp: Option<u64>,
) -> Result<()> {
    if let Err(e) = ctx.require_nft_coin(coin) {
        tracing::warn!("{}", e);
        return Ok(());
    }
    let nft_addr = deployed_nft(ctx, coin).await?;
    let admin = ctx.admin().await?;
    Finalizer::new(&ctx.chain, nft_addr, admin)
        .finalize_once(timestamp)
        .await?;
    tracing::info!("Finalized {} NFT at {}", coin, nft_addr);
    Ok(())
}

/// `nft-finalize`: catch the NFT's finalized day up to the start of `now`'s
/// day. Returns `None` when the coin is unknown.
pub async fn nft_finalize<C: Chain, R: Registry>(
    ctx: &TaskContext<C, R>,
    coin: &str,
    now: DateTime<Utc>,
) -> Result<Option<FinalizeReport>> {
    if let Err(e) = ctx.require_nft_coin(coin) {
        tracing::warn!("{}", e);
        return Ok(None);
    }
    let nft_addr = deployed_nft(ctx, coin).await?;
    let admin = ctx.admin().await?;
    let genesis = day_timestamp(ctx.config.finalize.genesis)?;
    let today = start_of_day(now);

    let report = Finalizer::new(&ctx.chain, nft_addr, admin)
        .run(genesis, today)
        .await?;
    tracing::info!(
        "✅ {} NFT finalized up to {} ({} days advanced{})",
        coin,
        report.watermark,
        report.advanced,
        if report.initialized { ", initialized" } else { "" }
    );
    Ok(Some(report))
}
