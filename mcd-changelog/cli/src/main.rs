//! MCD Changelog CLI - index and query MakerDAO MCD releases

use clap::{Parser, Subcommand};
use mcd_changelog_lib::{ChangelogError, Config, Network, QueryResult, ReleaseCollection};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mcd-changelog")]
#[command(about = "Index and query MakerDAO MCD releases", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long = "log-json", global = true)]
    log_json: bool,

    /// Changelog base URL [env: MCD_CHANGELOG_URL]
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Directory for the release index and ABI bundles [env: MCD_CHANGELOG_DIR]
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the changelog, fetch every release and save the index
    Refresh,

    /// Show the latest release for a network
    Query {
        /// Network to query (mainnet, kovan, rinkeby, ropsten, goerli)
        #[arg(value_name = "NETWORK")]
        network: String,

        /// Also print this ABI file from the release's bundle (e.g. MCD_VAT.abi)
        #[arg(long, value_name = "FILE")]
        abi: Option<String>,

        /// Output as JSON instead of terminal format
        #[arg(long)]
        json: bool,
    },

    /// List every release in the saved index
    List {
        /// Only list releases for this network
        #[arg(short, long, value_name = "NETWORK")]
        network: Option<String>,

        /// Output as JSON instead of terminal format
        #[arg(long)]
        json: bool,
    },
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins; otherwise default to WARN and let -v raise it
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,mcd_changelog_lib=info".to_string(),
            2 => "info,mcd_changelog_lib=debug".to_string(),
            _ => "debug,mcd_changelog_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(false)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

fn print_summary(releases: &ReleaseCollection) {
    for network in Network::ALL {
        let count = releases.iter().filter(|r| r.network() == network).count();
        if count > 0 {
            println!("{network:<8} {count} release(s)");
        }
    }
    println!("Total: {} release(s)", releases.len());
}

fn print_query(result: &QueryResult) {
    let release = &result.release;
    println!("Latest release: {release}");

    match release.contracts() {
        Some(contracts) => {
            println!("\nContracts ({}):", contracts.len());
            let width = contracts.keys().map(String::len).max().unwrap_or(0);
            for (name, address) in contracts {
                println!("  {name:<width$}  {address}");
            }
        }
        None => println!("\nNo contracts manifest recorded"),
    }

    match release.abi_bundle() {
        Some(bundle) => println!("\nABI bundle: {}", bundle.display()),
        None => println!("\nNo ABI bundle"),
    }

    if let Some(abi) = &result.abi {
        println!("\n{}:\n{}", abi.name, abi.contents);
    }
}

fn list(config: &Config, network: Option<&str>, json: bool) -> Result<(), ChangelogError> {
    let releases = mcd_changelog_lib::load_releases(config)?;
    let selected: Vec<_> = match network {
        Some(network) => releases.filter_by_network(network)?,
        None => releases.iter().collect(),
    };

    if json {
        println!("{}", to_json(&selected));
    } else {
        for release in selected {
            let abi = if release.abi_bundle().is_some() { "abi" } else { "-" };
            println!("{:<24} {abi}", release.to_string());
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.log_json);

    let mut config = Config::from_env();
    if let Some(url) = cli.url {
        config.base_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(?config, "Configuration loaded");

    let result = match cli.command {
        Commands::Refresh => mcd_changelog_lib::refresh(&config)
            .await
            .map(|releases| print_summary(&releases)),

        Commands::Query { network, abi, json } => {
            mcd_changelog_lib::query(&config, &network, abi.as_deref()).map(|result| {
                if json {
                    println!("{}", to_json(&result));
                } else {
                    print_query(&result);
                }
            })
        }

        Commands::List { network, json } => list(&config, network.as_deref(), json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
