use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use tally_store::app::{make_store, AppContext};
use tally_store::cancel::CancelToken;
use tally_store::config::Config;
use tally_store::counter::{
    increment_async, increment_if_odd, select_count, select_status, CounterAction,
};
use tally_store::endpoints::counter::{GetCount, IncrementCount};
use tally_store::endpoints::quotes::GetQuotes;
use tally_store::error::AppError;
use tally_store::logging;
use tally_store::service::{self, CounterService};

#[derive(Debug, Parser)]
#[command(name = "tally", about = "Counter and quotes state store")]
struct Cli {
    /// Config file (default: ~/.config/tally-store/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the counter service
    Serve(ServeArgs),
    /// Fetch quotes through the cache
    Quotes(QuotesArgs),
    /// Run the counter scenario locally and against the counter service
    Demo(DemoArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Debug, Args)]
struct QuotesArgs {
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Debug, Args)]
struct DemoArgs {
    #[arg(long, default_value_t = 2)]
    amount: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    match cli.command {
        Command::Serve(args) => run_serve(&config, args).await,
        Command::Quotes(args) => run_quotes(&config, args).await,
        Command::Demo(args) => run_demo(&config, args).await,
    }
}

async fn run_serve(config: &Config, args: ServeArgs) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.service.bind_addr.clone());
    let addr: SocketAddr = bind
        .parse()
        .map_err(|source| AppError::InvalidAddress {
            addr: bind.clone(),
            source,
        })?;
    let listener = TcpListener::bind(addr).await.map_err(AppError::from)?;

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            on_signal.cancel();
        }
    });

    service::serve(listener, CounterService::default(), cancel).await?;
    Ok(())
}

async fn run_quotes(config: &Config, args: QuotesArgs) -> anyhow::Result<()> {
    let context = AppContext::new(config)?;
    let limit = args.limit.unwrap_or(config.quotes_api.limit);

    let hook = context.quotes.query(GetQuotes, limit);
    let response = hook
        .settled()
        .await
        .with_context(|| format!("fetching {} quotes", limit))?;

    for quote in &response.quotes {
        println!("#{} \"{}\" - {}", quote.id, quote.quote, quote.author);
    }
    println!("({} of {} quotes)", response.quotes.len(), response.total);
    Ok(())
}

async fn run_demo(config: &Config, args: DemoArgs) -> anyhow::Result<()> {
    // Local slice: 0 -> 1 -> 11 -> 15
    let store = make_store(None);
    store.dispatch(CounterAction::Increment);
    println!("increment            -> {}", select_count(&store.get_state()));
    increment_if_odd(&store, 10);
    println!("incrementIfOdd 10    -> {}", select_count(&store.get_state()));
    increment_if_odd(&store, 4);
    println!("incrementIfOdd 4     -> {}", select_count(&store.get_state()));

    // Async increment against a local counter service.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let cancel = CancelToken::new();
    let server = tokio::spawn(service::serve(
        listener,
        CounterService::default(),
        cancel.clone(),
    ));

    let mut config = config.clone();
    config.counter_api.base_url = format!("http://{}/api", addr);
    let context = AppContext::with_store(&config, store)?;

    let pending = increment_async(&context.store, context.count_source.clone(), args.amount);
    println!(
        "incrementAsync {}     -> {:?}",
        args.amount,
        select_status(&context.store.get_state())
    );
    let outcome = pending.settled().await;
    println!(
        "settled ({:?})    -> {}",
        outcome,
        select_count(&context.store.get_state())
    );

    let count = context.counter_api.query(GetCount, ());
    println!("server count         -> {}", count.settled().await?);

    let increment = context.counter_api.mutation(IncrementCount);
    let new_count = increment.trigger(args.amount).settled().await?;
    println!("server increment     -> {}", new_count);
    println!("refetched count      -> {}", count.settled().await?);

    drop(count);
    drop(increment);
    cancel.cancel();
    server.await??;
    Ok(())
}
