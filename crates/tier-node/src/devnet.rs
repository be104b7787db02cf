// crates/tier-node/src/devnet.rs
//
// Seeded devnet: genesis setup and a random transaction/slash generator.
//
// The generator reads current lockup state so most transactions it emits are
// valid, but it does not avoid every failure (e.g. cancelling an unlocking
// whose staking entry already matured). Rejections are part of the workload.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde_json::json;

use tier_core::{
    module_address, AccAddress, Lockup, UnlockingLockup, ValAddress, INSURANCE_POOL_NAME,
};
use tier_economics::{Collaborators, Keeper, SlashReason, TierConfig};
use tier_rpc::JsonRpcRequest;
use tier_sim::{SimChain, SimEpochs};
use tier_store::KvStore;

use crate::config::NodeConfig;
use crate::host::{BlockHost, BlockInput, HostError, SlashOrder};

/// Account allowed to submit `tier/update_params` on the devnet.
pub fn governance_address() -> AccAddress {
    module_address("gov")
}

pub fn devnet_validator(index: u8) -> ValAddress {
    ValAddress::from_bytes([0x10u8.wrapping_add(index); 20])
}

pub fn devnet_delegator(index: u8) -> AccAddress {
    AccAddress::from_bytes([0x80u8.wrapping_add(index); 20])
}

/// Devnet participants.
#[derive(Debug, Clone)]
pub struct Devnet {
    pub validators: Vec<ValAddress>,
    pub delegators: Vec<AccAddress>,
}

/// Build collaborators, fund genesis accounts, and wrap a keeper over `kv`
/// in a block host.
pub fn genesis<S: KvStore>(config: &NodeConfig, kv: S) -> Result<(BlockHost<S>, Devnet), HostError> {
    let params = config.module_params();
    params.validate()?;

    let chain = Arc::new(SimChain::new(config.unbonding_time()));
    let validators: Vec<ValAddress> = (0..config.validators).map(devnet_validator).collect();
    for validator in &validators {
        chain.add_validator(validator, u128::from(config.validator_self_bond))?;
    }
    let delegators: Vec<AccAddress> = (0..config.delegators).map(devnet_delegator).collect();
    for delegator in &delegators {
        chain.fund(delegator, u128::from(config.initial_balance))?;
    }
    chain.fund_module(INSURANCE_POOL_NAME, u128::from(config.insurance_pool_funding))?;

    let tier_config = TierConfig::new(governance_address());
    let epochs = Arc::new(SimEpochs::new(
        &tier_config.epoch_identifier,
        params.epoch_duration,
        config.chain_start,
    ));
    // A second clock the module must ignore.
    epochs.add_epoch(
        "day",
        std::time::Duration::from_secs(24 * 60 * 60),
        config.chain_start,
    );

    let mut keeper = Keeper::new(
        kv,
        tier_config,
        Collaborators {
            staking: chain.clone(),
            bank: chain.clone(),
            epochs: epochs.clone(),
            distribution: chain.clone(),
        },
    );
    keeper.set_params(&params)?;

    tracing::info!(
        "Devnet genesis: {} validators, {} delegators, epoch {}s",
        validators.len(),
        delegators.len(),
        params.epoch_duration.as_secs()
    );

    let host = BlockHost::new(
        keeper,
        chain,
        epochs,
        config.chain_start,
        config.block_time(),
        config.reward_rate_ppm,
    )?;
    Ok((
        host,
        Devnet {
            validators,
            delegators,
        },
    ))
}

/// Random but reproducible block contents.
pub struct TxGenerator {
    rng: StdRng,
    devnet: Devnet,
    slash_chance_pct: u8,
    max_txs_per_block: usize,
}

impl TxGenerator {
    pub fn new(seed: u64, devnet: Devnet, slash_chance_pct: u8) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            devnet,
            slash_chance_pct: slash_chance_pct.min(100),
            max_txs_per_block: 3,
        }
    }

    /// Contents of the next block, based on the host's current state.
    pub fn next_block<S: KvStore>(&mut self, host: &BlockHost<S>) -> BlockInput {
        let mut input = BlockInput::default();
        if self.devnet.validators.is_empty() || self.devnet.delegators.is_empty() {
            return input;
        }

        if self.rng.gen_range(0..100u8) < self.slash_chance_pct {
            input.slashes.push(self.random_slash());
        }

        let count = self.rng.gen_range(0..=self.max_txs_per_block);
        for _ in 0..count {
            input.txs.push(self.random_tx(host));
        }
        input
    }

    fn random_slash(&mut self) -> SlashOrder {
        let validator = self.pick_validator();
        // Downtime is far more common than equivocation.
        let (reason, fraction) = if self.rng.gen_bool(0.8) {
            (SlashReason::MissingSignature, Decimal::new(1, 4))
        } else {
            (SlashReason::DoubleSign, Decimal::new(5, 2))
        };
        SlashOrder {
            validator,
            fraction,
            reason,
        }
    }

    fn random_tx<S: KvStore>(&mut self, host: &BlockHost<S>) -> JsonRpcRequest {
        let delegator = self.pick_delegator();
        let store = host.keeper().store();
        let lockups: Vec<Lockup> = store
            .iter_lockups_by_delegator(&delegator)
            .filter_map(Result::ok)
            .collect();
        let unlocking: Vec<UnlockingLockup> = store
            .iter_unlocking_lockups_by_delegator(&delegator)
            .filter_map(Result::ok)
            .collect();

        let roll = self.rng.gen_range(0..100u8);
        if roll >= 90 && !unlocking.is_empty() {
            let record = &unlocking[self.rng.gen_range(0..unlocking.len())];
            let amount = self.rng.gen_range(1..=record.amount);
            return JsonRpcRequest::new(
                "tier/cancel_unlocking",
                json!({
                    "delegator_address": record.delegator.to_string(),
                    "validator_address": record.validator.to_string(),
                    "creation_height": record.creation_height,
                    "amount": amount.to_string(),
                }),
            );
        }
        if roll >= 75 && !lockups.is_empty() && self.devnet.validators.len() > 1 {
            let lockup = &lockups[self.rng.gen_range(0..lockups.len())];
            let dst = loop {
                let candidate = self.pick_validator();
                if candidate != lockup.validator {
                    break candidate;
                }
            };
            let amount = self.rng.gen_range(1..=lockup.amount);
            return JsonRpcRequest::new(
                "tier/redelegate",
                json!({
                    "delegator_address": lockup.delegator.to_string(),
                    "src_validator_address": lockup.validator.to_string(),
                    "dst_validator_address": dst.to_string(),
                    "amount": amount.to_string(),
                }),
            );
        }
        if roll >= 50 && !lockups.is_empty() {
            let lockup = &lockups[self.rng.gen_range(0..lockups.len())];
            let amount = self.rng.gen_range(1..=lockup.amount);
            return JsonRpcRequest::new(
                "tier/unlock",
                json!({
                    "delegator_address": lockup.delegator.to_string(),
                    "validator_address": lockup.validator.to_string(),
                    "amount": amount.to_string(),
                }),
            );
        }

        let validator = self.pick_validator();
        let amount: u128 = self.rng.gen_range(1_000_000..=50_000_000);
        JsonRpcRequest::new(
            "tier/lock",
            json!({
                "delegator_address": delegator.to_string(),
                "validator_address": validator.to_string(),
                "amount": amount.to_string(),
            }),
        )
    }

    fn pick_validator(&mut self) -> ValAddress {
        let i = self.rng.gen_range(0..self.devnet.validators.len());
        self.devnet.validators[i].clone()
    }

    fn pick_delegator(&mut self) -> AccAddress {
        let i = self.rng.gen_range(0..self.devnet.delegators.len());
        self.devnet.delegators[i].clone()
    }
}
