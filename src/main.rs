use clap::{Parser, Subcommand, ValueEnum};
use eyre::{eyre, Result, WrapErr};
use rust_decimal::Decimal;
use std::path::{Path as FsPath, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use swap_router::{
    PoolArena, PoolTypeFilter, RouteCache, RouteProposer, Router, RouterConfig, SwapOptions,
    SwapType,
};

#[derive(Parser)]
#[command(name = "swap-router")]
#[command(about = "Multi-path swap router over AMM pool snapshots", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote a swap and print the batch-swap instructions
    Quote {
        /// Pool snapshot (JSON list of pools)
        #[arg(long)]
        pools: PathBuf,

        #[arg(long)]
        token_in: String,

        #[arg(long)]
        token_out: String,

        /// Amount of token_in (exact-in) or token_out (exact-out)
        #[arg(long)]
        amount: Decimal,

        #[arg(long, value_enum, default_value = "exact-in")]
        swap_type: SwapTypeArg,

        /// Maximum number of paths to split across (defaults to SOR_MAX_POOLS)
        #[arg(long)]
        max_pools: Option<usize>,

        /// Cost of one hop in units of the return token (defaults to SOR_COST_PER_HOP)
        #[arg(long)]
        cost_per_hop: Option<Decimal>,

        /// Restrict routing to one pool type
        #[arg(long, value_enum, default_value = "all")]
        pool_type: PoolTypeArg,
    },

    /// List candidate paths with their limits
    Paths {
        /// Pool snapshot (JSON list of pools)
        #[arg(long)]
        pools: PathBuf,

        #[arg(long)]
        token_in: String,

        #[arg(long)]
        token_out: String,

        #[arg(long, value_enum, default_value = "exact-in")]
        swap_type: SwapTypeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SwapTypeArg {
    ExactIn,
    ExactOut,
}

impl From<SwapTypeArg> for SwapType {
    fn from(arg: SwapTypeArg) -> Self {
        match arg {
            SwapTypeArg::ExactIn => SwapType::ExactIn,
            SwapTypeArg::ExactOut => SwapType::ExactOut,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PoolTypeArg {
    All,
    Weighted,
    Stable,
}

impl From<PoolTypeArg> for PoolTypeFilter {
    fn from(arg: PoolTypeArg) -> Self {
        match arg {
            PoolTypeArg::All => PoolTypeFilter::All,
            PoolTypeArg::Weighted => PoolTypeFilter::Weighted,
            PoolTypeArg::Stable => PoolTypeFilter::Stable,
        }
    }
}

fn load_pools(path: &FsPath) -> Result<PoolArena> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read pool snapshot {}", path.display()))?;
    let arena = PoolArena::from_json(&raw)?;
    if arena.is_empty() {
        return Err(eyre!("Pool snapshot {} contains no usable pools", path.display()));
    }
    info!("Loaded {} pools from {}", arena.len(), path.display());
    Ok(arena)
}

#[allow(clippy::too_many_arguments)]
fn run_quote(
    config: RouterConfig,
    pools: &FsPath,
    token_in: &str,
    token_out: &str,
    amount: Decimal,
    swap_type: SwapType,
    max_pools: Option<usize>,
    cost_per_hop: Option<Decimal>,
    pool_type: PoolTypeFilter,
) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(eyre!("Amount must be positive, got {}", amount));
    }

    let arena = load_pools(pools)?;
    let mut router = Router::new(arena, config);
    let defaults = router.default_options();
    let options = SwapOptions {
        max_pools: max_pools.unwrap_or(defaults.max_pools),
        cost_per_hop: cost_per_hop.unwrap_or(defaults.cost_per_hop),
        pool_type_filter: pool_type,
        ..defaults
    };

    let cache = RouteCache::new();
    let info = router.get_swaps(token_in, token_out, swap_type, amount, &options, &cache);
    if info.is_empty() {
        tracing::warn!("No route can fill {} {} -> {}", amount, token_in, token_out);
    }

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn run_paths(
    config: RouterConfig,
    pools: &FsPath,
    token_in: &str,
    token_out: &str,
    swap_type: SwapType,
) -> Result<()> {
    let arena = load_pools(pools)?;
    let mut proposer = RouteProposer::new(config.path_graph);
    proposer.init_path_graph_with_pools(&arena);

    let paths = proposer.get_candidate_paths(
        token_in,
        token_out,
        swap_type,
        &arena,
        &SwapOptions::default(),
        &RouteCache::new(),
    );

    let listing: Vec<serde_json::Value> = paths
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.id,
                "tokens": p.token_path(),
                "hops": p.hop_count(),
                "boosted": p.is_boosted(),
                "limitAmount": p.limit_amount,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.log_json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::WARN)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::WARN)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = RouterConfig::from_env()?;

    match cli.command {
        Commands::Quote {
            pools,
            token_in,
            token_out,
            amount,
            swap_type,
            max_pools,
            cost_per_hop,
            pool_type,
        } => run_quote(
            config,
            &pools,
            &token_in,
            &token_out,
            amount,
            swap_type.into(),
            max_pools,
            cost_per_hop,
            pool_type.into(),
        ),
        Commands::Paths {
            pools,
            token_in,
            token_out,
            swap_type,
        } => run_paths(config, &pools, &token_in, &token_out, swap_type.into()),
    }
}
