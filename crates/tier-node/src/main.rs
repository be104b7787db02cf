// crates/tier-node/src/main.rs
//
// Binary entrypoint for the tier node.
//
// Initializes tracing, parses CLI arguments, loads configuration, builds the
// devnet genesis, and runs blocks either back to back or paced in real time.

use clap::Parser;

use tier_node::{genesis, open_store, run_blocks, run_paced, BlockHost, NodeConfig, TxGenerator};
use tier_store::KvStore;

/// Tier node: runs the tier lockup module against a simulated chain.
#[derive(Parser, Debug)]
#[command(name = "tier-node", version = "0.1.0", about = "Tier lockup module devnet node")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "tier-node.toml")]
    config: String,

    /// Number of blocks to run. Overrides the config file.
    #[arg(long)]
    blocks: Option<u64>,

    /// Seed for the transaction generator. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Pace blocks in real time. Runs until Ctrl-C unless `--blocks` is given.
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found.
    let loaded = NodeConfig::load(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|cfg| cfg.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let mut config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", args.config);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                args.config,
                e
            );
            NodeConfig::default()
        }
    };

    // CLI flags override the config file values.
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    tracing::info!("Tier node v0.1.0");
    tracing::info!("Store: {}", config.store);
    tracing::info!("Seed: {}", config.seed);
    tracing::info!("Block time: {}ms", config.block_time_ms);

    let store = open_store(&config)?;
    let (mut host, devnet) = genesis(&config, store)?;
    let mut generator = TxGenerator::new(config.seed, devnet, config.slash_chance_pct);

    let produced = if args.live {
        run_paced(&mut host, &mut generator, config.block_time(), args.blocks).await?
    } else {
        run_blocks(&mut host, &mut generator, args.blocks.unwrap_or(config.blocks))?
    };
    tracing::info!("Produced {} blocks", produced);

    print_summary(&host)?;
    tracing::info!("Tier node shut down gracefully");
    Ok(())
}

fn print_summary<S: KvStore>(host: &BlockHost<S>) -> Result<(), Box<dyn std::error::Error>> {
    let keeper = host.keeper();
    let summary = serde_json::json!({
        "height": host.height(),
        "time": host.time().to_rfc3339(),
        "total_locked": keeper.store().total_lockups_amount()?.to_string(),
        "unlocking_lockups": keeper.store().iter_unlocking_lockups().count(),
        "insurance_lockups": keeper.store().iter_insurance_lockups().count(),
        "metrics": keeper.metrics().snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
