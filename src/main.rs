use anyhow::{Context, Result};
use campaign_detector::campaign::{CampaignDetector, CampaignField};
use campaign_detector::config::{Config, DatabaseBackend, DatabaseConfig};
use campaign_detector::models::{StoredCampaign, TrackingRequest, VisitorInfo};
use campaign_detector::storage::{PostgresStorage, SqliteStorage, Storage};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "campaign-detect")]
#[command(about = "Detect marketing campaign attribution for landing URLs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect campaign dimensions from a landing URL
    Detect {
        /// Landing page URL
        url: String,
    },
    /// Attribute a visit, falling back to the visitor's history
    Attribute {
        /// Landing page URL
        url: String,
        /// Visitor id as hex
        #[arg(long)]
        visitor: String,
        /// Credit the first campaign touch instead of the latest
        #[arg(long)]
        first_referrer: bool,
    },
    /// Create the visit log table
    Init,
    /// Insert a visit into the visit log
    Seed(SeedArgs),
}

#[derive(Args)]
struct SeedArgs {
    /// Visitor id as hex
    #[arg(long)]
    visitor: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    keyword: Option<String>,
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    medium: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    placement: Option<String>,
}

impl SeedArgs {
    fn campaign(&self) -> StoredCampaign {
        let mut campaign = StoredCampaign::default();
        for (field, value) in [
            (CampaignField::Name, &self.name),
            (CampaignField::Keyword, &self.keyword),
            (CampaignField::Source, &self.source),
            (CampaignField::Medium, &self.medium),
            (CampaignField::Content, &self.content),
            (CampaignField::Id, &self.id),
            (CampaignField::Group, &self.group),
            (CampaignField::Placement, &self.placement),
        ] {
            campaign.set(field, value.clone());
        }
        campaign
    }
}

async fn open_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(
                SqliteStorage::with_prefix(&config.url, config.max_connections, &config.table_prefix)
                    .await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.url);
            Arc::new(
                PostgresStorage::with_prefix(
                    &config.url,
                    config.max_connections,
                    &config.table_prefix,
                )
                .await?,
            )
        }
    };
    Ok(storage)
}

fn parse_visitor_id(hex_id: &str) -> Result<Vec<u8>> {
    hex::decode(hex_id).with_context(|| format!("visitor id '{hex_id}' is not valid hex"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let params = &config.campaign.parameters;

    match cli.command {
        Commands::Detect { url } => {
            let detector = CampaignDetector::new();
            let dimensions = detector.detect_campaign_from_request(&TrackingRequest::new(url), params);
            println!("{}", serde_json::to_string_pretty(&dimensions)?);
        }
        Commands::Attribute {
            url,
            visitor,
            first_referrer,
        } => {
            let storage = open_storage(&config.database).await?;
            let visitor = VisitorInfo::new(parse_visitor_id(&visitor)?);
            let attribute_first_referrer =
                first_referrer || config.campaign.attribute_first_referrer;

            let mut detector = CampaignDetector::new();
            let dimensions = detector
                .attribute(
                    storage.as_ref(),
                    &TrackingRequest::new(url),
                    &visitor,
                    params,
                    attribute_first_referrer,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&dimensions)?);
        }
        Commands::Init => {
            let storage = open_storage(&config.database).await?;
            storage.init().await?;
            info!("Visit log initialized");
        }
        Commands::Seed(args) => {
            let storage = open_storage(&config.database).await?;
            let visit =
                VisitorInfo::new(parse_visitor_id(&args.visitor)?).with_campaign(args.campaign());
            let idvisit = storage.insert_visit(&visit).await?;
            println!("✓ Inserted visit {} for visitor {}", idvisit, args.visitor);
        }
    }

    Ok(())
}
