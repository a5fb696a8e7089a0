//! repasseweb main entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use repasseweb_api::start_server;
use repasseweb_config::Config;
use repasseweb_core::Dashboard;
use repasseweb_store::build_backend;

#[derive(Parser, Debug)]
#[command(name = "repasseweb")]
#[command(version = "0.1.0")]
#[command(about = "Admin dashboard API for courier and restaurant payouts", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    // logging is configured from the file, so load errors go to stderr
    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            for hint in e.suggestions() {
                eprintln!("[HINT] {}", hint);
            }
            return Err(e).with_context(|| {
                format!("Failed to load configuration from {}", args.config.display())
            });
        }
    };
    init_logging(&config.logging.level);
    log::info!(
        "Config loaded: backend={}, bind={}",
        config.backend.kind,
        config.bind_address()
    );

    let backend = build_backend(&config.backend).context("Failed to initialise the ledger backend")?;
    let dashboard = Dashboard::new(backend, config.query.clone());

    let rt = Runtime::new()?;
    rt.block_on(start_server(config, dashboard))
        .context("Server error")?;

    Ok(())
}
