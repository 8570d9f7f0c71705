use clap::Parser;
use tracing_subscriber::EnvFilter;

use rump::config::Config;
use rump::{run, SyncOptions};

#[derive(Parser)]
#[command(name = "rump", about = "Copy all keys between two Redis-protocol stores with DUMP/RESTORE")]
struct Cli {
    /// Source store, example: redis://127.0.0.1:6379/0
    #[arg(long)]
    from: String,

    /// Destination store, example: redis://127.0.0.1:6379/1
    #[arg(long)]
    to: String,

    /// Records buffered between scan and restore (overrides RUMP_QUEUE_CAPACITY)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// COUNT hint for every SCAN (overrides RUMP_SCAN_COUNT)
    #[arg(long)]
    scan_count: Option<usize>,
}

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = SyncOptions::from_config(cli.from, cli.to, &config);
    if let Some(capacity) = cli.queue_capacity {
        options.queue_capacity = capacity.max(1);
    }
    if let Some(count) = cli.scan_count {
        options.scan_count = (count > 0).then_some(count);
    }

    match run(&options).await {
        Ok(_) => println!("Sync done."),
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    }
}
