use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use duelhall::{
    balance::{
        AccountId,
        BalanceSynchronizer,
        SyncConfig,
    },
    config::{
        AppConfig,
        DEFAULT_GAME_ID,
        DEFAULT_RPC_URL,
    },
    ledger::RpcLedgerClient,
    registry,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage_and_exit() -> ! {
    println!(
        "Usage: duelhall [--rpc-url <url>] [--account <address>]\n\
         [--game <id>] [--poll-secs <n>] [--divisor <n>]\n\
         \n\
         Flags:\n\
           --rpc-url <url>    Ledger RPC endpoint (default {DEFAULT_RPC_URL})\n\
           --account <addr>   Watch this account's balance\n\
           --game <id>        Featured game id (default {DEFAULT_GAME_ID})\n\
           --poll-secs <n>    Balance poll interval in seconds (default 30)\n\
           --divisor <n>      Native units per display unit (default 1000000000)"
    );
    std::process::exit(0);
}

fn parse_cli_args() -> Result<AppConfig> {
    let mut args = std::env::args().skip(1);
    let mut rpc_url: Option<String> = None;
    let mut account: Option<String> = None;
    let mut game: Option<String> = None;
    let mut poll_secs: Option<u64> = None;
    let mut divisor: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--rpc-url" => {
                let url = args
                    .next()
                    .ok_or_else(|| eyre!("--rpc-url requires a URL argument"))?;
                if rpc_url.is_some() {
                    return Err(eyre!("--rpc-url may only be specified once"));
                }
                rpc_url = Some(url);
            }
            "--account" => {
                let address = args
                    .next()
                    .ok_or_else(|| eyre!("--account requires an address argument"))?;
                if account.is_some() {
                    return Err(eyre!("--account may only be specified once"));
                }
                account = Some(address);
            }
            "--game" => {
                let id = args
                    .next()
                    .ok_or_else(|| eyre!("--game requires a game id"))?;
                if game.is_some() {
                    return Err(eyre!("--game may only be specified once"));
                }
                game = Some(id);
            }
            "--poll-secs" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--poll-secs requires a number of seconds"))?;
                if poll_secs.is_some() {
                    return Err(eyre!("--poll-secs may only be specified once"));
                }
                poll_secs = Some(raw.parse().wrap_err("--poll-secs expects an integer")?);
            }
            "--divisor" => {
                let raw = args
                    .next()
                    .ok_or_else(|| eyre!("--divisor requires a number"))?;
                if divisor.is_some() {
                    return Err(eyre!("--divisor may only be specified once"));
                }
                divisor = Some(raw.parse().wrap_err("--divisor expects an integer")?);
            }
            "--help" | "-h" => print_usage_and_exit(),
            other => return Err(eyre!("Unknown argument: {other}")),
        }
    }

    let mut sync = SyncConfig::default();
    if let Some(secs) = poll_secs {
        if secs == 0 {
            return Err(eyre!("--poll-secs must be at least 1"));
        }
        sync.poll_interval = Duration::from_secs(secs);
    }
    if let Some(divisor) = divisor {
        if divisor == 0 {
            return Err(eyre!("--divisor must be non-zero"));
        }
        sync.unit_divisor = divisor;
    }

    Ok(AppConfig {
        rpc_url: rpc_url.unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
        account: account.map(AccountId::new),
        default_game: game.unwrap_or_else(|| DEFAULT_GAME_ID.to_string()),
        sync,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    color_eyre::install()?;
    let config = parse_cli_args()?;
    run(config).await
}

async fn run(config: AppConfig) -> Result<()> {
    for game in registry::builtin_catalog() {
        info!(id = %game.id, name = %game.meta.name, tag = ?game.meta.tag, "game available");
    }
    info!(default_game = %config.default_game, "catalog loaded");

    let client = RpcLedgerClient::new(config.rpc_url.as_str())?;
    info!(ledger = %client, "connecting to ledger");
    let (identity_tx, identity_rx) = watch::channel(config.account.clone());
    let sync = BalanceSynchronizer::spawn(client, identity_rx, config.sync.clone());
    let mut snapshots = sync.subscribe();

    match &config.account {
        Some(account) => info!(account = %account, "watching balance"),
        None => info!("no account connected; balance will read as unknown"),
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                info!(
                    amount = ?snapshot.amount,
                    loading = snapshot.is_loading,
                    error = ?snapshot.error,
                    "balance snapshot"
                );
            }
        }
    }

    drop(identity_tx);
    Ok(())
}
