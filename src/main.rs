use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing::info;

use titan_quote::monitoring::{console_filter_from_env, init_logging};
use titan_quote::{QuoteClient, QuoteRequest, Settings};

/// Fetch the best swap quote from the Titan quote stream.
#[derive(Parser, Debug)]
#[command(name = "titan-quote")]
#[command(about = "Fetch the best swap route for a token pair from the Titan quote stream")]
struct Args {
    /// Input token mint (base58)
    #[arg(long)]
    in_mint: String,

    /// Output token mint (base58)
    #[arg(long)]
    out_mint: String,

    /// Input amount in base units
    #[arg(long)]
    amount: String,

    /// Requesting wallet public key (base58)
    #[arg(long)]
    user: String,

    #[arg(long, default_value_t = 50)]
    slippage_bps: u16,

    /// Priority fee in micro-lamports
    #[arg(long, default_value_t = 0)]
    priority_fee: u64,

    #[arg(long, default_value = "./logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env file first
    dotenv().ok();

    let console_level = console_filter_from_env("warn");
    let _guard = init_logging(&args.log_dir, "debug", &console_level)?;

    let settings = Settings::from_env().context("loading settings")?;
    info!(
        regions = ?settings.preferred_regions,
        authenticated = settings.has_token(),
        timeout_ms = settings.request_timeout.as_millis() as u64,
        "Configuration loaded"
    );
    settings.platform_fee.log_summary();

    let fee = settings.platform_fee.resolve(&args.in_mint, &args.out_mint);
    let request = QuoteRequest::new(
        args.in_mint,
        args.out_mint,
        args.amount,
        args.slippage_bps,
        args.user,
    )
    .with_priority_fee(args.priority_fee)
    .with_fee(fee);

    let client = QuoteClient::new(settings);
    let quote = client.fetch_best_quote(&request).await?;

    println!("{}", serde_json::to_string_pretty(&quote)?);
    Ok(())
}
