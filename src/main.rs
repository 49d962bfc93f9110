use clap::Parser;
use perigee::{config, server};

/// Perigee - course enrollment platform backend
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// HTTP server port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Serve from the in-memory mock store, skipping the database
    #[arg(long)]
    mock_db: bool,

    /// Deployment environment: development or production (overrides APP_ENV)
    #[arg(long)]
    env: Option<config::Environment>,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.host,
            http_port: cli.port,
            mock_db: cli.mock_db,
            environment: cli.env,
        }
    }
}

#[tokio::main]
async fn main() {
    // Defaults to INFO level, can be overridden with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    println!("\nPerigee v{}\n", env!("CARGO_PKG_VERSION"));

    let cli_config: config::CliConfig = cli.into();
    let config = match config::ServerConfig::from_cli(cli_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    server::run_with_config(config).await;
}
