//! The `minicached` server binary.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use minicached_core::{Cache, CacheLimit};
use minicached_server::{Server, ServerConfig, DEFAULT_PORT};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "minicached",
    version,
    about = "memcached-compatible in-memory cache server"
)]
struct Args {
    /// Port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Leave Nagle's algorithm enabled on accepted sockets.
    #[arg(long)]
    delay: bool,

    /// Reply ERROR to every query without parsing (load-test mode).
    #[arg(long)]
    fast: bool,

    /// Evict oldest records beyond this count (0 disables).
    #[arg(long, value_name = "N", default_value_t = 0)]
    max_records: usize,

    /// Evict records when resident memory exceeds this many MB (0 disables).
    #[arg(long, value_name = "MB", default_value_t = 0)]
    max_size_mb: u64,
}

impl Args {
    fn limit(&self) -> CacheLimit {
        if self.max_records > 0 {
            CacheLimit::MaxRecords(self.max_records)
        } else if self.max_size_mb > 0 {
            CacheLimit::MaxSizeMb(self.max_size_mb)
        } else {
            CacheLimit::Unbounded
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            // Help text and argument errors both exit 1.
            let _ = error.print();
            return ExitCode::from(1);
        }
    };
    init_tracing(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("minicached: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let limit = args.limit();
    let config = ServerConfig {
        port: args.port,
        delay: args.delay,
        fast: args.fast,
        limit,
        ..ServerConfig::default()
    };

    let cache = Arc::new(Cache::new(limit));
    let mut server = Server::new(config, cache);
    let port = server.start().await?;
    info!(port, ?limit, "minicached ready");

    server
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("interrupt received, shutting down");
        })
        .await
}
