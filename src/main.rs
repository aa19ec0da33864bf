use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use roster_keeper::config::RosterConfig;
use roster_keeper::discord::{DiscordClient, MemorySink, MessageSink};
use roster_keeper::roster::{build_roster, render_roster, RosterPublisher};
use roster_keeper::{api, db};

/// Channel id used by dry runs when none is configured.
const DRY_RUN_CHANNEL: &str = "dry-run";

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Guild roster bot: one auto-updating Discord message per branch")]
struct Cli {
    /// SQLite database file (overrides ROSTER_DATABASE_PATH and config.json)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Roster channel id (overrides ROSTER_CHANNEL_ID and config.json)
    #[arg(long, global = true)]
    channel: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every branch, then serve the admin API
    Serve {
        /// Port for the admin API
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep messages in memory instead of posting to Discord
        #[arg(long)]
        dry_run: bool,
    },
    /// Render one branch, or every branch, and exit
    Render {
        /// Branch id; all branches when omitted
        #[arg(long)]
        branch: Option<Uuid>,

        /// Keep messages in memory instead of posting to Discord
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the rendered embed of a branch as JSON
    Preview {
        #[arg(long)]
        branch: Uuid,
    },
    /// Create or upgrade the database schema
    Migrate,
}

/// Initialize tracing with output to stderr (for preview) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "roster_keeper=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Preview prints JSON on stdout
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_database(config: &RosterConfig) -> anyhow::Result<db::Database> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())
            .with_context(|| format!("Failed to open database {}", path.display()))?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn build_publisher(
    config: &RosterConfig,
    db: db::Database,
    dry_run: bool,
) -> anyhow::Result<RosterPublisher> {
    if dry_run {
        let channel = config.channel_id.as_deref().unwrap_or(DRY_RUN_CHANNEL);
        tracing::info!("Dry run: roster messages stay in memory, stored ids are left alone");
        let sink: Arc<dyn MessageSink> = Arc::new(MemorySink::new());
        return Ok(RosterPublisher::new(db, sink, channel).read_only());
    }

    let channel = config.require_channel()?;
    let token = config.require_token()?;
    let sink: Arc<dyn MessageSink> =
        Arc::new(DiscordClient::new(config.discord_api_url.clone(), token));
    Ok(RosterPublisher::new(db, sink, channel))
}

async fn serve(config: RosterConfig, port: u16, dry_run: bool) -> anyhow::Result<()> {
    let db = open_database(&config)?;
    let publisher = build_publisher(&config, db.clone(), dry_run)?;

    publisher.refresh_all().await;

    let app = api::create_router(db, publisher);
    let addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Roster admin API listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Some(Commands::Preview { .. }));
    init_tracing(use_stderr);

    let mut config = RosterConfig::load()?;
    if let Some(path) = cli.database {
        config.database_path = Some(path);
    }
    if let Some(channel) = cli.channel {
        config.channel_id = Some(channel);
    }

    match cli.command {
        Some(Commands::Serve { port, dry_run }) => {
            let port = port.unwrap_or(config.port);
            serve(config, port, dry_run).await?;
        }
        Some(Commands::Render { branch, dry_run }) => {
            let db = open_database(&config)?;
            let publisher = build_publisher(&config, db, dry_run)?;

            match branch {
                Some(id) => {
                    let outcome = publisher.sync_branch(id).await?;
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                None => {
                    let summary = publisher.refresh_all().await;
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
            }
        }
        Some(Commands::Preview { branch }) => {
            let db = open_database(&config)?;
            let view = build_roster(&db, branch)?
                .ok_or_else(|| anyhow::anyhow!("Branch {} not found", branch))?;
            let embed = render_roster(&view, Utc::now());
            println!("{}", serde_json::to_string_pretty(&embed)?);
        }
        Some(Commands::Migrate) => {
            open_database(&config)?;
            tracing::info!("Database schema is up to date");
        }
        None => {
            let port = config.port;
            serve(config, port, false).await?;
        }
    }

    Ok(())
}
