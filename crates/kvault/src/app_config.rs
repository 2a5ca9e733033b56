//! 🔧 App Configuration: the sacred TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." -- every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! ```toml
//! [elasticsearch]
//! url = "http://localhost:9200"
//! collection = "blog"
//! kind = "post"
//!
//! [archive]
//! schema_file = "blog.proto"
//!
//! [runtime]
//! queue_capacity = 10
//!
//! [schema]
//! optional = ["status"]
//!
//! [[transforms]]
//! type = "skip"
//! field = "creator"
//! equals = "test"
//! ```

use std::path::Path;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use tracing::info;

use crate::backends::{ArchiveConfig, ElasticsearchConfig};
use crate::schema_gen::CardinalityRule;
use crate::transforms::TransformConfig;

/// 📦 The AppConfig: one struct to rule them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 The cluster end of every command.
    pub elasticsearch: ElasticsearchConfig,
    /// 🗄️ The file end.
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// 🧬 Cardinality rules for `schema`.
    #[serde(default)]
    pub schema: CardinalityRule,
    /// 🔄 Applied in order, whichever direction the run goes.
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

/// 🧵 Knobs for the supervisor.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 📬 How many records may sit between the source and the sink. The
    /// backpressure window. 0 is treated as 1.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    10
}

/// 🚀 Load the config, from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges `KVAULT_*` environment variables with an optional TOML file.
/// Sections nest with a double underscore: `KVAULT_ELASTICSEARCH__URL`.
///
/// 📐 DESIGN NOTE:
///   - If `config_file_name` is None  → env vars only.
///   - If `config_file_name` is Some  → env vars + TOML file, merged. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!("🔧 Loading configuration: {:#?}", config_file_name.unwrap_or(Path::new("")));

    let config = Figment::new().merge(Env::prefixed("KVAULT_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (KVAULT_*). \
             The file exists in our hearts, but apparently not on disk. Or it does, and [elasticsearch] is missing a url, collection or kind.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (KVAULT_*). \
                 No file was provided, so this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
