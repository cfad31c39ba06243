//! # formbox CLI (`fbx`)
//!
//! The `fbx` binary is the command-line interface to the formbox content
//! repository.
//!
//! ## Usage
//!
//! ```bash
//! fbx --config ./formbox.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fbx init` | Create the data directories and search index database |
//! | `fbx categories` | List registered categories with item counts |
//! | `fbx schema <category>` | Print a category's JSON/UI schema bundle |
//! | `fbx list <category>` | List a category's items |
//! | `fbx create <category> --data '<json>'` | Create an item |
//! | `fbx update <category> <item-id> --data '<json>'` | Update an item |
//! | `fbx delete <item-id>...` | Delete items by id |
//! | `fbx get <item-id>` | Fetch one item by id |
//! | `fbx find <tag>` | Find items carrying a metadata tag |

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use formbox::config::{load_config, Config};
use formbox::hooks::HookRegistry;
use formbox::{Repository, UpsertRequest};

/// formbox — a file-backed content repository with form-defined categories
/// and derivation hooks.
#[derive(Parser)]
#[command(
    name = "fbx",
    about = "formbox — a file-backed content repository with form-defined categories",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./formbox.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the forms/data directories and the search index database.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// List registered categories with their item counts.
    Categories,

    /// Print a category's schema bundle as JSON.
    Schema {
        /// Category id.
        category: String,
    },

    /// List a category's items as JSON.
    List {
        /// Category id.
        category: String,
    },

    /// Create a new item in a category.
    Create {
        /// Category id.
        category: String,

        /// Submitted form data as a JSON object.
        #[arg(long)]
        data: String,
    },

    /// Update an existing item.
    Update {
        /// Category id.
        category: String,

        /// Id of the item to update.
        item_id: String,

        /// Submitted form data as a JSON object.
        #[arg(long)]
        data: String,
    },

    /// Delete one or more items by id.
    Delete {
        /// Item ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Fetch one item by id.
    Get {
        /// Item id.
        item_id: String,
    },

    /// Find items carrying a metadata tag.
    Find {
        /// Metadata tag.
        tag: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => cmd_init(&config).await,
        Commands::Categories => {
            let repo = open(&config).await?;
            let summaries = repo.categories().await;
            if summaries.is_empty() {
                println!("No categories registered.");
            }
            for summary in summaries {
                println!(
                    "  {} — {} ({} items){}",
                    summary.id,
                    summary.title,
                    summary.count,
                    summary
                        .description
                        .map(|d| format!(": {d}"))
                        .unwrap_or_default()
                );
            }
            repo.close().await;
            Ok(())
        }
        Commands::Schema { category } => {
            let repo = open(&config).await?;
            match repo.schema(&category) {
                Some(schema) => println!("{}", serde_json::to_string_pretty(&schema)?),
                None => println!("null"),
            }
            repo.close().await;
            Ok(())
        }
        Commands::List { category } => {
            let repo = open(&config).await?;
            let items = repo.list(&category).await?;
            println!("{}", serde_json::to_string_pretty(&items)?);
            repo.close().await;
            Ok(())
        }
        Commands::Create { category, data } => {
            let form_data = parse_form_data(&data)?;
            let repo = open(&config).await?;
            let item = repo
                .upsert(UpsertRequest {
                    item_id: None,
                    category_id: category,
                    form_data,
                })
                .await?;
            println!("created {}", item.id);
            repo.close().await;
            Ok(())
        }
        Commands::Update {
            category,
            item_id,
            data,
        } => {
            let form_data = parse_form_data(&data)?;
            let repo = open(&config).await?;
            let item = repo
                .upsert(UpsertRequest {
                    item_id: Some(item_id),
                    category_id: category,
                    form_data,
                })
                .await?;
            println!("updated {}", item.id);
            repo.close().await;
            Ok(())
        }
        Commands::Delete { ids } => {
            let repo = open(&config).await?;
            repo.delete(&ids).await?;
            println!("deleted {} items", ids.len());
            repo.close().await;
            Ok(())
        }
        Commands::Get { item_id } => {
            let repo = open(&config).await?;
            let item = repo.get_by_id(&item_id).await?;
            repo.close().await;
            match item {
                Some(item) => {
                    println!("{}", serde_json::to_string_pretty(&item)?);
                    Ok(())
                }
                None => anyhow::bail!("item not found: {item_id}"),
            }
        }
        Commands::Find { tag } => {
            let repo = open(&config).await?;
            let items = repo.get_by_metadata_tag(&tag).await?;
            if items.is_empty() {
                println!("No results");
            } else {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
            repo.close().await;
            Ok(())
        }
    }
}

async fn open(config: &Config) -> Result<Repository> {
    let hooks = HookRegistry::with_builtins();
    Repository::init(config, &hooks)
        .await
        .context("Failed to initialize repository")
}

async fn cmd_init(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.forms.dir)
        .with_context(|| format!("Failed to create forms dir: {}", config.forms.dir.display()))?;
    std::fs::create_dir_all(&config.data.dir)
        .with_context(|| format!("Failed to create data dir: {}", config.data.dir.display()))?;

    // Opening the repository creates the search index schema.
    let repo = open(config).await?;
    repo.close().await;

    println!("initialized");
    println!("  forms: {}", config.forms.dir.display());
    println!("  data:  {}", config.data.dir.display());
    println!("  index: {}", config.db.path.display());
    Ok(())
}

fn parse_form_data(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("--data must be valid JSON")
}
