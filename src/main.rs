use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use flipquest::{
    config::AppConfig,
    ledger::{
        LedgerPoller,
        POLL_INTERVAL,
        ProgressLedger,
        store::SledLedgerStore,
    },
    local::LocalChain,
    orchestrator::Orchestrator,
    quote::ZeroExClient,
    reads::ReadFacade,
    types::CoinSide,
    units::{
        STABLECOIN_DECIMALS,
        WAGER_TOKEN_DECIMALS,
        format_units,
        parse_units,
        pow10,
    },
    wallet,
};
use alloy_primitives::{
    Address,
    U256,
};
use itertools::Itertools;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Coin-flip client demo against an in-process chain.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory for the sled-backed progress ledger
    /// (defaults to ~/.flipquest/data).
    #[arg(long)]
    data_dir: Option<String>,

    /// Keystore wallet to use as the player account.
    #[arg(long)]
    wallet: Option<String>,

    /// Override the wallet keystore directory.
    #[arg(long)]
    wallet_dir: Option<String>,

    /// Quote aggregator endpoint.
    #[arg(long)]
    quote_url: Option<Url>,

    /// Bet amount in whole wager tokens.
    #[arg(long, default_value = "2000")]
    bet: String,

    /// Side to back.
    #[arg(long, default_value = "heads")]
    side: String,

    /// Optional stablecoin amount to swap for wager tokens first.
    #[arg(long)]
    swap: Option<String>,
}

fn parse_side(raw: &str) -> Result<CoinSide> {
    match raw.to_lowercase().as_str() {
        "heads" => Ok(CoinSide::Heads),
        "tails" => Ok(CoinSide::Tails),
        other => Err(eyre!("Unknown side '{other}'; use heads or tails")),
    }
}

fn resolve_data_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => {
            let home =
                std::env::var("HOME").wrap_err("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(".flipquest").join("data"))
        }
    }
}

fn resolve_player(args: &Args) -> Result<Address> {
    match &args.wallet {
        Some(name) => {
            let dir = wallet::resolve_wallet_dir(args.wallet_dir.as_deref())?;
            let descriptor = wallet::find_wallet(&dir, name)?;
            wallet::wallet_address(&descriptor)
        }
        None => Ok(Address::repeat_byte(0xAA)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    let args = Args::parse();

    let side = parse_side(&args.side)?;
    let stake = parse_units(&args.bet, WAGER_TOKEN_DECIMALS)
        .map_err(|e| eyre!("Invalid --bet amount: {e}"))?;
    let player = resolve_player(&args)?;

    let data_dir = resolve_data_dir(args.data_dir.as_deref())?;
    std::fs::create_dir_all(&data_dir).wrap_err("Failed to create data directory")?;
    let db = sled::open(data_dir.join("ledger")).wrap_err("Failed to open ledger db")?;
    let store = SledLedgerStore::open(&db).map_err(|e| eyre!(e))?;
    let ledger = ProgressLedger::load(store).map_err(|e| eyre!(e))?;

    let mut config = AppConfig::local();
    if let Some(url) = &args.quote_url {
        config.quote_url = url.to_string();
    }
    let chain = LocalChain::new(config.addresses);
    chain.connect(player);
    chain.fund(
        config.addresses.flip_token,
        player,
        U256::from(1_000_000u64) * pow10(WAGER_TOKEN_DECIMALS),
    );
    chain.fund(
        config.addresses.usdc_token,
        player,
        U256::from(10_000u64) * pow10(STABLECOIN_DECIMALS),
    );

    let quotes = ZeroExClient::new(config.quote_url.clone()).map_err(|e| eyre!(e))?;
    let facade = ReadFacade::new(chain.clone(), config.addresses);
    let orchestrator =
        Orchestrator::new(facade, chain.clone(), quotes, ledger.clone(), config.clone());

    let poller = LedgerPoller::spawn(ledger.clone(), POLL_INTERVAL);

    tracing::info!(%player, "starting coin-flip demo session");

    if let Some(raw) = &args.swap {
        let sell = parse_units(raw, STABLECOIN_DECIMALS)
            .map_err(|e| eyre!("Invalid --swap amount: {e}"))?;
        match orchestrator.swap(sell, None, None).await {
            Ok(outcome) => println!(
                "Swapped {} USDC for at least {} FLIP ({})",
                format_units(sell, STABLECOIN_DECIMALS),
                format_units(outcome.bought, WAGER_TOKEN_DECIMALS),
                outcome.tx_hash,
            ),
            Err(error) => println!("Swap skipped: {error}"),
        }
    }

    match orchestrator.place_bet(side, stake).await {
        Ok(outcome) => println!(
            "Bet {} FLIP on {side}: {:?} ({})",
            format_units(stake, WAGER_TOKEN_DECIMALS),
            outcome.resolution,
            outcome.tx_hash,
        ),
        Err(error) => println!("Bet failed: {error}"),
    }

    let cached = orchestrator.facade().cached();
    if let Some(balance) = cached.flip_balance {
        println!("FLIP balance: {}", format_units(balance, WAGER_TOKEN_DECIMALS));
    }

    let totals = ledger.totals();
    println!(
        "History: {} bets ({} won), {} swaps",
        totals.bets, totals.wins, totals.swaps,
    );
    let unlocked = ledger
        .achievements()
        .into_iter()
        .filter(|a| a.unlocked)
        .map(|a| a.title)
        .join(", ");
    if !unlocked.is_empty() {
        println!("Achievements: {unlocked}");
    }
    let flip_balance = cached.flip_balance.unwrap_or_default();
    for step in ledger.quest_steps(true, flip_balance) {
        let mark = if step.done { "x" } else { " " };
        println!("  [{mark}] {}", step.title);
    }

    println!("Watching the ledger for cross-session unlocks; press Ctrl-C to exit.");
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Received interrupt, exiting");
    poller.stop().await;
    Ok(())
}
