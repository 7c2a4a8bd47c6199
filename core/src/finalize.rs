//! NFT finalization
//!
//! The NFT contract keeps a `finalized()` watermark: the start of the last
//! day whose emission has been locked. The watermark only moves forward,
//! one day per `finalize()` transaction. A never-finalized contract is
//! first pinned to a genesis day through `initFinalize(day)`.
//!
//! `today` is sampled once by the caller; days that start while the loop is
//! running are left for the next run.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, NaiveDate, Utc};

use crate::chain::{self, Chain};
use crate::contracts::nft;
use crate::error::{ChainError, Error, Result};

/// Seconds per day
pub const DAY: u64 = 86_400;

/// Start of the UTC day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> u64 {
    let secs = ts.timestamp().max(0) as u64;
    secs - secs % DAY
}

/// Start of the UTC day `date`.
pub fn day_timestamp(date: NaiveDate) -> Result<u64> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Config(format!("invalid date {}", date)))?;
    u64::try_from(midnight.and_utc().timestamp())
        .map_err(|_| Error::Config(format!("{} is before the epoch", date)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStep {
    /// `initFinalize(genesis)` on a never-finalized contract
    Initialize(u64),
    /// `finalize()`; the value is the watermark after the call
    Advance(u64),
}

/// Day-by-day walk from the current watermark up to `today`.
#[derive(Debug, Clone)]
pub struct FinalizePlan {
    counter: u64,
    today: u64,
    pending_init: Option<u64>,
}

impl FinalizePlan {
    pub fn new(watermark: u64, genesis: u64, today: u64) -> Self {
        if watermark == 0 {
            Self {
                counter: 0,
                today,
                pending_init: Some(genesis),
            }
        } else {
            Self {
                counter: watermark,
                today,
                pending_init: None,
            }
        }
    }

    /// Watermark after the steps taken so far.
    pub fn watermark(&self) -> u64 {
        self.counter
    }
}

impl Iterator for FinalizePlan {
    type Item = FinalizeStep;

    fn next(&mut self) -> Option<FinalizeStep> {
        if let Some(genesis) = self.pending_init.take() {
            self.counter = genesis;
            return Some(FinalizeStep::Initialize(genesis));
        }
        let next = self.counter.checked_add(DAY)?;
        if next > self.today {
            return None;
        }
        self.counter = next;
        Some(FinalizeStep::Advance(next))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Watermark read from the contract before the loop
    pub started_at: u64,
    pub initialized: bool,
    pub advanced: u32,
    /// Watermark after the loop
    pub watermark: u64,
}

/// Sends finalize transactions for one NFT contract.
pub struct Finalizer<'a, C: Chain + ?Sized> {
    chain: &'a C,
    nft: Address,
    admin: Address,
}

impl<'a, C: Chain + ?Sized> Finalizer<'a, C> {
    pub fn new(chain: &'a C, nft: Address, admin: Address) -> Self {
        Self { chain, nft, admin }
    }

    pub async fn watermark(&self) -> Result<u64, ChainError> {
        let ret = chain::read(self.chain, self.nft, &nft::finalizedCall {}).await?;
        Ok(ret._0.saturating_to::<u64>())
    }

    /// One finalize transaction: `initFinalize(ts)` when given a timestamp,
    /// `finalize()` otherwise.
    pub async fn finalize_once(&self, timestamp: Option<u64>) -> Result<(), ChainError> {
        let receipt = match timestamp {
            Some(ts) => {
                let call = nft::initFinalizeCall {
                    timestamp: U256::from(ts),
                };
                chain::transact(self.chain, self.admin, self.nft, &call).await?
            }
            None => chain::transact(self.chain, self.admin, self.nft, &nft::finalizeCall {}).await?,
        };
        tracing::debug!("finalize mined in block {}", receipt.block_number);
        Ok(())
    }

    /// Catch the watermark up to `today`. The first failing transaction
    /// aborts the run; whatever was mined before it stays finalized.
    pub async fn run(&self, genesis: u64, today: u64) -> Result<FinalizeReport> {
        let started_at = self.watermark().await?;
        let mut report = FinalizeReport {
            started_at,
            watermark: started_at,
            ..Default::default()
        };

        if started_at >= today {
            tracing::info!("NFT {} already finalized up to {}", self.nft, started_at);
        }

        for step in FinalizePlan::new(started_at, genesis, today) {
            match step {
                FinalizeStep::Initialize(ts) => {
                    tracing::info!("🗓️  Initializing finalization of {} at {}", self.nft, ts);
                    self.finalize_once(Some(ts)).await?;
                    report.initialized = true;
                    report.watermark = ts;
                }
                FinalizeStep::Advance(ts) => {
                    tracing::info!("Finalizing {} for day {}", self.nft, ts);
                    self.finalize_once(None).await?;
                    report.advanced += 1;
                    report.watermark = ts;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use chrono::TimeZone;

    const GENESIS: u64 = 1_643_760_000; // 2022-02-02

    #[test]
    fn test_start_of_day() {
        let ts = Utc.with_ymd_and_hms(2022, 2, 2, 17, 45, 3).unwrap();
        assert_eq!(start_of_day(ts), GENESIS);
        let midnight = Utc.with_ymd_and_hms(2022, 2, 2, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(midnight), GENESIS);
    }

    #[test]
    fn test_day_timestamp() {
        let date = NaiveDate::from_ymd_opt(2022, 2, 2).unwrap();
        assert_eq!(day_timestamp(date).unwrap(), GENESIS);
    }

    #[test]
    fn test_plan_from_zero() {
        let today = GENESIS + 5 * DAY;
        let steps: Vec<_> = FinalizePlan::new(0, GENESIS, today).collect();

        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], FinalizeStep::Initialize(GENESIS));
        assert!(steps[1..].iter().all(|s| matches!(s, FinalizeStep::Advance(_))));
        assert_eq!(steps.last(), Some(&FinalizeStep::Advance(today)));
    }

    #[test]
    fn test_plan_caught_up() {
        let today = GENESIS + 3 * DAY;
        assert_eq!(FinalizePlan::new(today, GENESIS, today).count(), 0);
    }

    #[test]
    fn test_plan_resumes_from_watermark() {
        let today = GENESIS + 10 * DAY;
        let mut plan = FinalizePlan::new(GENESIS + 7 * DAY, GENESIS, today);
        let steps: Vec<_> = plan.by_ref().collect();
        assert_eq!(
            steps,
            vec![
                FinalizeStep::Advance(GENESIS + 8 * DAY),
                FinalizeStep::Advance(GENESIS + 9 * DAY),
                FinalizeStep::Advance(GENESIS + 10 * DAY),
            ]
        );
        assert_eq!(plan.watermark(), today);
    }

    #[test]
    fn test_plan_genesis_is_today() {
        let steps: Vec<_> = FinalizePlan::new(0, GENESIS, GENESIS).collect();
        assert_eq!(steps, vec![FinalizeStep::Initialize(GENESIS)]);
    }

    #[test]
    fn test_plan_never_passes_today() {
        // watermark off the day grid: only whole days that have started
        let today = GENESIS + 2 * DAY;
        let steps: Vec<_> = FinalizePlan::new(GENESIS + 100, GENESIS, today).collect();
        assert_eq!(steps, vec![FinalizeStep::Advance(GENESIS + DAY + 100)]);
    }

    #[tokio::test]
    async fn test_run_from_zero() {
        let chain = MockChain::with_named_accounts();
        let nft_addr = Address::repeat_byte(0x55);
        let admin = chain.account(1);
        chain.set_uint::<nft::finalizedCall>(nft_addr, U256::ZERO);

        let today = GENESIS + 4 * DAY;
        let report = Finalizer::new(&chain, nft_addr, admin)
            .run(GENESIS, today)
            .await
            .unwrap();

        assert!(report.initialized);
        assert_eq!(report.advanced, 4);
        assert_eq!(report.watermark, today);

        let sent = chain.sent();
        assert_eq!(sent.len(), 5);
        let init = sent[0].decode::<nft::initFinalizeCall>().unwrap();
        assert_eq!(init.timestamp, U256::from(GENESIS));
        assert!(sent[1..].iter().all(|tx| tx.is::<nft::finalizeCall>()));
        assert!(sent.iter().all(|tx| tx.from == admin && tx.to == nft_addr));
    }

    #[tokio::test]
    async fn test_run_caught_up_sends_nothing() {
        let chain = MockChain::with_named_accounts();
        let nft_addr = Address::repeat_byte(0x55);
        let today = GENESIS + 30 * DAY;
        chain.set_uint::<nft::finalizedCall>(nft_addr, U256::from(today));

        let report = Finalizer::new(&chain, nft_addr, chain.account(1))
            .run(GENESIS, today)
            .await
            .unwrap();

        assert_eq!(chain.sent_count(), 0);
        assert_eq!(report.watermark, today);
        assert!(!report.initialized);
    }

    #[tokio::test]
    async fn test_run_aborts_on_failure() {
        let chain = MockChain::with_named_accounts();
        let nft_addr = Address::repeat_byte(0x55);
        chain.set_uint::<nft::finalizedCall>(nft_addr, U256::from(GENESIS));
        chain.revert_on::<nft::finalizeCall>();

        let result = Finalizer::new(&chain, nft_addr, chain.account(1))
            .run(GENESIS, GENESIS + 3 * DAY)
            .await;

        assert!(matches!(result, Err(Error::Chain(ChainError::Reverted(_)))));
        assert_eq!(chain.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_watermark() {
        let chain = MockChain::with_named_accounts();
        let result = Finalizer::new(&chain, Address::repeat_byte(0x55), chain.account(1))
            .run(GENESIS, GENESIS)
            .await;
        assert!(matches!(result, Err(Error::Chain(ChainError::Rpc { .. }))));
        assert_eq!(chain.sent_count(), 0);
    }
}
