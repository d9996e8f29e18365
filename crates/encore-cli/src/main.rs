//! Encore CLI: inspect the concert catalog, the review feed and the local wizard state.
//!
//! Reads the same environment as the services (`DATABASE_URL`, `WIZARD_STATE_DIR`, ...).
//! Set `ENCORE_USER_ID` to act as a user for `my-reviews`.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use encore_cli::{describe_error, init_tracing, truncate_chars, EnvIdentity};
use encore_core::constants::WIZARD_STORAGE_KEY;
use encore_core::models::{FeedEntry, SearchMode};
use encore_core::Config;
use encore_db::db::{setup_database, CatalogRepository, ReviewRepository, UserRepository};
use encore_services::{
    create_storage, ConcertResolutionService, FeedService, FileWizardStorage,
    InMemoryPreviewRegistry, MediaStagingPipeline, ReviewWizard, WizardStorage,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "encore", about = "Encore concert review CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search verified concerts by artist name or title
    Search {
        term: String,
        #[arg(long, value_enum, default_value = "artist")]
        mode: Mode,
    },
    /// Newest reviews
    Feed {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value = "json")]
        format: Format,
    },
    /// One review with its concert and author
    Review {
        /// Review UUID
        id: Uuid,
    },
    /// Reviews written by ENCORE_USER_ID
    MyReviews,
    /// Persisted review wizard state
    Wizard {
        #[command(subcommand)]
        sub: WizardCommands,
    },
    /// Delete stored review images by public URL
    PruneImages {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Subcommand)]
enum WizardCommands {
    Show,
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Artist,
    Title,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Artist => SearchMode::ByArtist,
            Mode::Title => SearchMode::ByTitle,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn print_feed_table(entries: &[FeedEntry]) {
    println!("{:<36}  {:<24}  {:<12}  CONTENT", "REVIEW", "CONCERT", "AUTHOR");
    for entry in entries {
        let concert = entry
            .concert
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or("-");
        let author = entry
            .author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or("-");
        println!(
            "{:<36}  {:<24}  {:<12}  {}",
            entry.review.id,
            truncate_chars(concert, 24),
            truncate_chars(author, 12),
            truncate_chars(&entry.review.content.replace('\n', " "), 40)
        );
    }
}

struct Stores {
    resolution: ConcertResolutionService,
    feed: FeedService,
}

async fn connect(config: &Config) -> anyhow::Result<Stores> {
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for this command")?;
    let pool = setup_database(url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;

    let identity = Arc::new(EnvIdentity::from_env()?);
    let catalog = Arc::new(CatalogRepository::new(pool.clone()));
    let reviews = Arc::new(ReviewRepository::new(pool.clone()));
    let users = Arc::new(UserRepository::new(pool));

    Ok(Stores {
        resolution: ConcertResolutionService::new(
            catalog.clone(),
            identity.clone(),
            config.search.clone(),
        ),
        feed: FeedService::new(reviews, catalog, users, identity, config.review.clone()),
    })
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Search { term, mode } => {
            let stores = connect(&config).await?;
            let results = stores.resolution.search(&term, mode.into()).await?;
            print_json(&results)?;
        }
        Commands::Feed { limit, format } => {
            let stores = connect(&config).await?;
            let entries = stores.feed.feed(limit).await?;
            match format {
                Format::Json => print_json(&entries)?,
                Format::Table => print_feed_table(&entries),
            }
        }
        Commands::Review { id } => {
            let stores = connect(&config).await?;
            print_json(&stores.feed.review_detail(id).await?)?;
        }
        Commands::MyReviews => {
            let stores = connect(&config).await?;
            print_json(&stores.feed.my_reviews().await?)?;
        }
        Commands::Wizard { sub } => {
            let storage = Arc::new(FileWizardStorage::new(config.wizard_state_dir.clone()));
            match sub {
                WizardCommands::Show => {
                    let wizard = ReviewWizard::load(storage);
                    print_json(&serde_json::json!({
                        "concertRef": wizard.concert_ref(),
                        "content": wizard.content(),
                        "currentStep": wizard.current_step(),
                    }))?
                }
                WizardCommands::Reset => {
                    storage.clear(WIZARD_STORAGE_KEY)?;
                    println!("Wizard state cleared");
                }
            }
        }
        Commands::PruneImages { urls } => {
            let storage = create_storage(&config)
                .await
                .context("Failed to open object storage")?;
            let pipeline = MediaStagingPipeline::new(
                storage,
                Arc::new(InMemoryPreviewRegistry::new()),
                &config.media,
            );
            print_json(&pipeline.delete_remote(&urls).await)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe_error(&err));
            ExitCode::FAILURE
        }
    }
}
