// crates/tier-node/src/host.rs
//
// Per-block driver for the tier module.
//
// Block order:
//   0. begin block: unbonding entries that matured by the block time pay out
//   1. epoch tick; tier epoch hooks run, any error aborts the block
//   2. reward processing (errors logged, block continues)
//   3. slashes raised this block go to the slashing adapter (errors logged)
//   4. transactions are dispatched; a failure rejects only that transaction
//   5. end block: slash burns land, matured unbonding pays out, rewards accrue
//
// Epoch hook failures are fatal. Reward and slashing failures never are.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use tier_core::{
    BlockContext, BlockEvent, EpochHooks, EpochSignal, EpochTicker, TierError, ValAddress,
};
use tier_economics::{Keeper, RewardSplit, SlashReason, SlashReport, TierEvent};
use tier_rpc::{dispatch, JsonRpcRequest, JsonRpcResponse};
use tier_sim::SimChain;
use tier_store::KvStore;

/// Errors that stop the chain.
#[derive(Debug, Error)]
pub enum HostError {
    /// An epoch hook failed. State from earlier hooks in the block may be
    /// partially applied, so the block cannot be committed.
    #[error("Fatal error at height {height} in {hook}: {source}")]
    Fatal {
        height: i64,
        hook: String,
        #[source]
        source: TierError,
    },

    #[error("Invalid block time: {0}")]
    InvalidBlockTime(String),

    #[error("Genesis failed: {0}")]
    Genesis(#[from] TierError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A slash the staking subsystem applies during the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashOrder {
    pub validator: ValAddress,
    pub fraction: Decimal,
    pub reason: SlashReason,
}

/// What happens in one block besides the module's own hooks.
#[derive(Debug, Clone, Default)]
pub struct BlockInput {
    pub slashes: Vec<SlashOrder>,
    pub txs: Vec<JsonRpcRequest>,
}

/// The submitter-facing result of one transaction.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub method: String,
    pub response: JsonRpcResponse,
}

/// Summary of one executed block.
#[derive(Debug, Clone)]
pub struct BlockReport {
    pub height: i64,
    pub time: DateTime<Utc>,
    pub epoch_signals: Vec<EpochSignal>,
    pub rewards: Option<RewardSplit>,
    pub slashing: SlashReport,
    pub txs: Vec<TxOutcome>,
    pub unbondings_paid: usize,
    pub events: Vec<TierEvent>,
}

impl BlockReport {
    pub fn accepted_txs(&self) -> usize {
        self.txs.iter().filter(|t| t.response.success).count()
    }
}

/// Drives a keeper and its simulated collaborators block by block.
pub struct BlockHost<S: KvStore> {
    keeper: Keeper<S>,
    chain: Arc<SimChain>,
    ticker: Arc<dyn EpochTicker>,
    block_time: chrono::Duration,
    reward_rate_ppm: u64,
    /// Height and time of the last executed block.
    height: i64,
    time: DateTime<Utc>,
}

impl<S: KvStore> BlockHost<S> {
    /// Create a host whose first block runs at `genesis_time + block_time`.
    pub fn new(
        keeper: Keeper<S>,
        chain: Arc<SimChain>,
        ticker: Arc<dyn EpochTicker>,
        genesis_time: DateTime<Utc>,
        block_time: Duration,
        reward_rate_ppm: u64,
    ) -> Result<Self, HostError> {
        let block_time = chrono::Duration::from_std(block_time)
            .map_err(|e| HostError::InvalidBlockTime(e.to_string()))?;
        if block_time <= chrono::Duration::zero() {
            return Err(HostError::InvalidBlockTime(
                "block time must be positive".to_string(),
            ));
        }
        Ok(Self {
            keeper,
            chain,
            ticker,
            block_time,
            reward_rate_ppm,
            height: 0,
            time: genesis_time,
        })
    }

    pub fn keeper(&self) -> &Keeper<S> {
        &self.keeper
    }

    pub fn keeper_mut(&mut self) -> &mut Keeper<S> {
        &mut self.keeper
    }

    pub fn chain(&self) -> &Arc<SimChain> {
        &self.chain
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Context of the block that `execute_block` will run next.
    pub fn next_context(&self) -> BlockContext {
        BlockContext::new(self.height + 1, self.time + self.block_time)
    }

    /// Execute one block. Only a failed epoch hook returns an error, in which
    /// case height and time do not advance.
    pub fn execute_block(&mut self, input: BlockInput) -> Result<BlockReport, HostError> {
        let ctx = self.next_context();

        // 0. Begin block.
        let paid_at_begin = self.chain.begin_block(&ctx);

        // 1. Epoch boundaries.
        let epoch_signals = self.ticker.tick(&ctx);
        for signal in &epoch_signals {
            self.run_epoch_hook(&ctx, signal)?;
        }

        // 2. Reward processing.
        let rewards = self.keeper.maybe_process_rewards(&ctx);

        // 3. Slashing.
        let slash_events = self.raise_slashes(&input.slashes);
        let slashing = self.keeper.handle_slashing_events(&ctx, &slash_events);

        // 4. Transactions.
        let mut txs = Vec::with_capacity(input.txs.len());
        for request in input.txs {
            let method = request.method.clone();
            let response = dispatch(&mut self.keeper, &ctx, request);
            if let Some(err) = &response.error {
                debug!("Rejected {} at height {}: {}", method, ctx.height, err);
            }
            txs.push(TxOutcome { method, response });
        }

        // 5. End block.
        let unbondings_paid = paid_at_begin + self.chain.end_block(&ctx);
        if let Err(e) = self.chain.accrue_block_rewards(self.reward_rate_ppm) {
            warn!("Reward accrual failed at height {}: {}", ctx.height, e);
        }

        let events = self.keeper.drain_events();
        for event in &events {
            match serde_json::to_string(event) {
                Ok(json) => info!(height = ctx.height, "{}: {}", event.name(), json),
                Err(_) => info!(height = ctx.height, "{}", event.name()),
            }
        }

        self.height = ctx.height;
        self.time = ctx.time;

        Ok(BlockReport {
            height: ctx.height,
            time: ctx.time,
            epoch_signals,
            rewards,
            slashing,
            txs,
            unbondings_paid,
            events,
        })
    }

    fn run_epoch_hook(&mut self, ctx: &BlockContext, signal: &EpochSignal) -> Result<(), HostError> {
        let (hook, result) = match signal {
            EpochSignal::AfterEpochEnd {
                identifier,
                epoch_number,
            } => (
                "after_epoch_end",
                self.keeper.after_epoch_end(ctx, identifier, *epoch_number),
            ),
            EpochSignal::BeforeEpochStart {
                identifier,
                epoch_number,
            } => (
                "before_epoch_start",
                self.keeper.before_epoch_start(ctx, identifier, *epoch_number),
            ),
        };
        result.map_err(|source| {
            self.keeper.metrics().record_internal_error();
            error!("Epoch hook {} failed at height {}: {}", hook, ctx.height, source);
            HostError::Fatal {
                height: ctx.height,
                hook: hook.to_string(),
                source,
            }
        })
    }

    /// Apply slash orders on the staking side, returning the events it raised.
    fn raise_slashes(&self, orders: &[SlashOrder]) -> Vec<BlockEvent> {
        let mut events = Vec::with_capacity(orders.len());
        for order in orders {
            match self
                .chain
                .slash(&order.validator, order.fraction, &order.reason.to_string())
            {
                Ok(event) => events.push(event),
                Err(e) => warn!("Staking refused slash of {}: {}", order.validator, e),
            }
        }
        events
    }
}
