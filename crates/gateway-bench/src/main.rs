use std::io::Write;

use clap::Parser;
use tracing::info;

use gateway_bench::{BenchConfig, GatewayClient};

#[derive(Parser)]
#[command(
    name = "gateway-bench",
    about = "Time AddOrder calls against the order gateway",
    version,
)]
struct Cli {
    /// Gateway gRPC endpoint.
    #[arg(long, default_value = "http://localhost:5337")]
    endpoint: String,

    /// Number of orders to send.
    #[arg(short = 'n', long, default_value = "1000")]
    count: u32,

    /// Market to place orders in.
    #[arg(long, default_value = "BTC/ETH")]
    market: String,

    /// Order amount in fundamental units.
    #[arg(long, default_value = "1000")]
    amount: u64,

    /// Limit price.
    #[arg(long, default_value = "17.5")]
    price: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,gateway_bench=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BenchConfig {
        count: cli.count,
        market_id: cli.market,
        amount: cli.amount,
        price: cli.price,
        ..Default::default()
    };

    info!(endpoint = %cli.endpoint, count = config.count, market = %config.market_id, "connecting to gateway");
    let mut client = GatewayClient::connect(cli.endpoint.clone()).await?;

    let mut stdout = std::io::stdout().lock();
    let summary = gateway_bench::run(&mut client, &config, &mut stdout).await?;
    writeln!(stdout, "{summary}")?;

    Ok(())
}
