//! 🚀 kvault-cli: the front door, the bouncer, the maitre d' of kvault.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the library do the heavy lifting.
//! Like a manager. 🦆
//!
//! ```text
//! kvault-cli [--config kvault.toml] save   <ARCHIVE>
//! kvault-cli [--config kvault.toml] load   <ARCHIVE>
//! kvault-cli [--config kvault.toml] schema [--collection C] [--kind K] > asset.proto
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "kvault.toml";

#[derive(Parser, Debug)]
#[command(name = "kvault-cli", version, about = "Save an Elasticsearch collection to a gzip'd archive, and load it back")]
struct Cli {
    /// Config file (TOML). Defaults to ./kvault.toml when it exists; KVAULT_* env vars fill the gaps.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scroll the configured collection into an archive
    Save {
        /// Archive file to write
        archive: PathBuf,
    },
    /// Create every archived record in the configured cluster
    Load {
        /// Archive file to read
        archive: PathBuf,
    },
    /// Print the schema generated from the collection's mapping
    Schema {
        /// Override `elasticsearch.collection`
        #[arg(long)]
        collection: Option<String>,
        /// Override `elasticsearch.kind`
        #[arg(long)]
        kind: Option<String>,
    },
}

/// 🚀 main(): where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (to stderr, so `schema` can own stdout)
/// 2. Parse args (clap turns bad ones into a usage error and exit code 2)
/// 3. Load config
/// 4. Run the command
/// 5. Handle errors (cry, then exit 1)
#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        report(&err);
        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = resolve_config_file(cli.config.as_deref())?;
    let mut app_config = kvault::app_config::load_config(config_file.as_deref()).context(
        "💀 In kvault-cli, main, we couldn't load the config. Take a look at the file, make sure [elasticsearch] has a url, collection and kind.",
    )?;

    match cli.command {
        Command::Save { archive } => {
            let report = kvault::save(&app_config, &archive).await?;
            info!("✅ {} read, {} archived to '{}'", report.read, report.written, archive.display());
        }
        Command::Load { archive } => {
            let report = kvault::load(&app_config, &archive).await?;
            info!("✅ {} read from '{}', {} created", report.read, archive.display(), report.written);
        }
        Command::Schema { collection, kind } => {
            if let Some(collection) = collection {
                app_config.elasticsearch.collection = collection;
            }
            if let Some(kind) = kind {
                app_config.elasticsearch.kind = kind;
            }
            let schema = kvault::generate_schema(&app_config).await?;
            println!("{schema}");
        }
    }
    Ok(())
}

/// 🔒 An explicit `--config` must exist. The default is only used if it is there.
fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!("💀 Couldn't even check whether '{}' exists. Permissions, probably.", path.display())
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' does not exist. Relative paths are relative to where you are standing, not where the binary lives.",
                    path.display()
                );
            }
            Ok(Some(path.to_path_buf()))
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            Ok(default.try_exists().unwrap_or(false).then_some(default))
        }
    }
}

/// 🧅 Peel the onion of sadness, one layer at a time, and sniff for a dead cluster.
fn report(err: &anyhow::Error) {
    error!("💀 error: {}", err);
    let mut the_vibes_are_giving_connection_issues = false;
    for cause in err.chain().skip(1) {
        error!("⚠️  cause: {}", cause);
        if looks_like_connection_trouble(&cause.to_string()) {
            the_vibes_are_giving_connection_issues = true;
        }
    }
    if the_vibes_are_giving_connection_issues {
        error!(
            "🔧 hint: looks like Elasticsearch isn't reachable. Double-check `elasticsearch.url` and that the \
             cluster is actually running. If you're using Docker, `docker ps` knows the truth. ☕"
        );
    }
}

fn looks_like_connection_trouble(cause: &str) -> bool {
    ["error sending request", "connection refused", "Connection refused", "tcp connect error", "dns error"]
        .iter()
        .any(|needle| cause.contains(needle))
}
