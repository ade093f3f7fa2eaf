use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use banlog::commands::{self, ReportFormat};
use banlog::config::Config;
use banlog::geoloc::{GeoProvider, IpGeolocationClient};
use banlog::insight::{GeminiClient, InsightGenerator};
use banlog::models::UNKNOWN_LOCATION;
use banlog::report::render::PROJECT_URL;
use banlog::storage::SqliteStorage;
use banlog::telegraph::TelegraphClient;

#[derive(Parser)]
#[command(name = "banlog")]
#[command(version)]
#[command(about = "Logs fail2ban ban actions and generates periodic reports", long_about = None)]
struct Cli {
    /// Config file path (default: $XDG_CONFIG_HOME/banlog/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a ban action
    Save {
        /// IP address of the ban action
        #[arg(long)]
        ip: String,
        /// Protocol of the ban action (e.g. ssh)
        #[arg(long)]
        protocol: String,
    },
    /// Generate a report
    Report {
        /// Output format of the report
        #[arg(long, value_enum, default_value_t = ReportFormat::Plain)]
        format: ReportFormat,
        /// Shift the reference instant by this many days (negative = past)
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset_days: i64,
    },
    /// Perform a maintenance job
    Maintenance {
        #[command(subcommand)]
        job: MaintenanceJob,
    },
}

#[derive(Subcommand)]
enum MaintenanceJob {
    /// List IPs whose cached location is still unknown
    ListUnknownIps,
    /// Try resolving unknown IPs again and update the cache
    ResolveUnknownIps,
    /// Delete all ban action logs (the location cache is kept)
    PurgeLogs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let storage = SqliteStorage::new(&config.database_url()?).await?;
    storage.init().await?;

    let geo = geo_provider(&config)?;

    match cli.command {
        Commands::Save { ip, protocol } => {
            commands::save(&storage, geo.as_deref(), &protocol, &ip).await?;
        }
        Commands::Report {
            format,
            offset_days,
        } => {
            let insight = insight_generator(&config)?;

            let publisher = if format == ReportFormat::Telegraph {
                match &config.telegraph_access_token {
                    Some(token) => Some(TelegraphClient::new(token)?),
                    None => {
                        // one-time token minting; the operator persists it
                        let token = TelegraphClient::create_account(
                            "banlog",
                            "Ban Action Logger",
                            PROJECT_URL,
                        )
                        .await?;
                        println!(
                            "Add '{token}' to your banlog configuration file with key `telegraph_access_token`"
                        );
                        return Ok(());
                    }
                }
            } else {
                None
            };

            let report = commands::report(
                &storage,
                format,
                offset_days,
                publisher
                    .as_ref()
                    .map(|p| p as &dyn banlog::telegraph::PagePublisher),
                insight.as_deref(),
            )
            .await?;

            let mut stdout = std::io::stdout();
            stdout.write_all(&report)?;
            stdout.write_all(b"\n")?;
        }
        Commands::Maintenance { job } => match job {
            MaintenanceJob::ListUnknownIps => {
                let unknowns = commands::list_unknown_ips(&storage).await?;
                println!("Unknown IPs:\n");
                for location in unknowns {
                    println!("{}", location.ip);
                }
            }
            MaintenanceJob::ResolveUnknownIps => {
                let results = commands::resolve_unknown_ips(&storage, geo.as_deref()).await?;
                let resolved = results
                    .iter()
                    .filter(|l| l.country_name != UNKNOWN_LOCATION)
                    .count();
                println!(
                    "Newly resolved IPs: {resolved}\nStill unresolved: {}",
                    results.len() - resolved
                );
            }
            MaintenanceJob::PurgeLogs => {
                let purged = commands::purge_logs(&storage).await?;
                println!("Purged {purged} logs.");
            }
        },
    }

    Ok(())
}

fn geo_provider(config: &Config) -> Result<Option<Box<dyn GeoProvider>>> {
    Ok(match &config.ipgeolocation_api_key {
        Some(key) => Some(Box::new(IpGeolocationClient::new(key)?)),
        None => None,
    })
}

fn insight_generator(config: &Config) -> Result<Option<Box<dyn InsightGenerator>>> {
    Ok(match &config.google_ai_api_key {
        Some(key) => Some(Box::new(GeminiClient::new(key)?)),
        None => None,
    })
}
