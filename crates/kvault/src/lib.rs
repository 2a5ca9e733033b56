// ai
//! 🗄️ kvault: move a search index into a gzip'd box and back out again.
//!
//! 🎬 *[narrator voice]* "It started with a cluster that had to be decommissioned
//! by Friday, and a bucket that only took files."
//!
//! Three things this crate does, one function each:
//! - [`save`]: scroll a collection out of Elasticsearch, run the transform
//!   chain, pack every record into an archive.
//! - [`load`]: read an archive back, run the transform chain, `_create` every
//!   record in the cluster.
//! - [`generate_schema`]: turn the collection's mapping into the message
//!   definitions the archive is packed against.
//!
//! Records move one at a time through a bounded channel, so a slow end slows
//! the fast end down instead of filling memory. 🦆

pub mod app_config;
pub mod codec;
pub mod common;
pub mod schema_gen;
pub mod transforms;

mod backends;
mod progress;
mod supervisors;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app_config::AppConfig;
use crate::backends::elasticsearch::DuplexConfig;
use crate::backends::{
    ArchiveSink, ArchiveSource, ElasticsearchClient, RemoteIndex, RemoteIndexDuplex, SinkBackend, SourceBackend,
};
use crate::codec::RecordCodec;
use crate::progress::ProgressUnit;
use crate::supervisors::Supervisor;
use crate::transforms::TransformChain;

pub use crate::backends::{ArchiveConfig, Compression, ElasticsearchConfig};
pub use crate::supervisors::PipelineReport;

/// 📤 Cluster → archive.
pub async fn save(config: &AppConfig, archive: &Path) -> Result<PipelineReport> {
    let client = connect(config).await?;
    save_with(client, config, archive).await
}

/// 📥 Archive → cluster.
pub async fn load(config: &AppConfig, archive: &Path) -> Result<PipelineReport> {
    let client = connect(config).await?;
    load_with(client, config, archive).await
}

/// 🧬 Mapping → schema text, ready to be written to `archive.schema_file`.
pub async fn generate_schema(config: &AppConfig) -> Result<String> {
    let client = connect(config).await?;
    let es = &config.elasticsearch;
    schema_gen::generate(client.as_ref(), &es.collection, &es.kind, &config.schema).await
}

async fn connect(config: &AppConfig) -> Result<Arc<dyn RemoteIndex>> {
    let client = ElasticsearchClient::new(&config.elasticsearch)?;
    client.ping().await?;
    Ok(Arc::new(client))
}

async fn load_codec(config: &AppConfig) -> Result<Arc<RecordCodec>> {
    let path = &config.archive.schema_file;
    let text = tokio::fs::read_to_string(path).await.with_context(|| {
        format!(
            "💀 No schema at '{}'. Run `kvault-cli schema > {}` first, we'll wait.",
            path.display(),
            path.display()
        )
    })?;
    let codec = RecordCodec::load(&text).with_context(|| format!("💀 The schema in '{}' does not load.", path.display()))?;
    info!("📜 schema '{}' loaded, packing '{}' records", path.display(), codec.source_message());
    Ok(Arc::new(codec))
}

async fn save_with(client: Arc<dyn RemoteIndex>, config: &AppConfig, archive: &Path) -> Result<PipelineReport> {
    let codec = load_codec(config).await?;
    let es = &config.elasticsearch;
    let source = RemoteIndexDuplex::new(client, DuplexConfig::from(es)).with_progress(
        format!("📤 {}/{} → {}", es.collection, es.kind, archive.display()),
        ProgressUnit::Docs,
        0,
    );
    let sink = ArchiveSink::new(archive, codec, config.archive.compression).await?;

    Supervisor::new(config.runtime.clone())
        .run(
            SourceBackend::Elasticsearch(source),
            TransformChain::from_configs(&config.transforms),
            SinkBackend::Archive(sink),
        )
        .await
        .with_context(|| format!("💀 Saving '{}/{}' to '{}' did not finish.", es.collection, es.kind, archive.display()))
}

async fn load_with(client: Arc<dyn RemoteIndex>, config: &AppConfig, archive: &Path) -> Result<PipelineReport> {
    let codec = load_codec(config).await?;
    let source = ArchiveSource::new(archive, codec, config.archive.compression, config.archive.read_batch_size)
        .await?
        .with_progress()
        .await;
    let sink = RemoteIndexDuplex::new(client, DuplexConfig::from(&config.elasticsearch));

    Supervisor::new(config.runtime.clone())
        .run(
            SourceBackend::Archive(source),
            TransformChain::from_configs(&config.transforms),
            SinkBackend::Elasticsearch(sink),
        )
        .await
        .with_context(|| format!("💀 Loading '{}' into the cluster did not finish.", archive.display()))
}
