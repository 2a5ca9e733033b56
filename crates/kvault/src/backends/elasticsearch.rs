//! # 📡 THE ELASTICSEARCH BACKEND
//!
//! *Previously, on kvault...*
//!
//! 🎬 COLD OPEN: INT. SERVER ROOM, 3:47 AM
//!
//! The monitoring dashboard glows amber in the dark. One engineer, alone,
//! needs every document out of an index before the hardware refresh on
//! Monday. "I'll just scroll it," they whispered. "It'll be fast," they said.
//!
//! 🚀 This module is both ends of the cluster conversation:
//! - `client` speaks HTTP: search, scroll, clear scroll, `_create`, `_mapping`.
//!   It is the only file in the crate that knows what a URL looks like.
//! - `duplex` speaks pipeline: it drives the scroll cursor as a [`Source`]
//!   and issues one acknowledged `_create` per record as a [`Sink`].
//!
//! The two are split by the [`RemoteIndex`] trait so the pipeline can be tested
//! against a cluster that lives in a `Vec`. 🦆
//!
//! [`Source`]: crate::backends::Source
//! [`Sink`]: crate::backends::Sink

mod client;
mod duplex;

pub(crate) use client::{ElasticsearchClient, RemoteIndex, SearchPage, SearchQuery};
pub(crate) use duplex::{DuplexConfig, RemoteIndexDuplex};

use serde::Deserialize;

// 📡 ElasticsearchConfig: "It's just Elasticsearch", she said, before the cluster went red.
//
// 🔧 auth is tri-modal: api_key, username+password, or "I hope anonymous works" (it might, on localhost).
// `collection` and `kind` pick the index and mapping type every command works against.
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    /// 📡 The URL of your cluster. Include scheme + port. Yes, all of it.
    pub url: String,
    /// 📦 Index to read from or write to.
    pub collection: String,
    /// 🏷️ Mapping type. Also names the top-level message in the generated schema.
    pub kind: String,
    /// 🔒 Username for basic auth. Optional, like flossing.
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 Password. If this is in plaintext in your config file, I've already filed a complaint.
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key auth. Wins over basic auth when both are set. This is not a democracy.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 📄 Hits per scroll page. `None` lets the cluster pick (it picks 10, it always picks 10).
    #[serde(default)]
    pub page_size: Option<u64>,
    /// ⏳ How long the cluster keeps the scroll context alive between pages.
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,
    /// 🛣️ Put `kind` in REST paths (`/{index}/{type}/_search`). Turn off for typeless clusters.
    #[serde(default = "default_typed_paths")]
    pub typed_paths: bool,
    /// ⏱️ Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_scroll_keep_alive() -> String {
    "30m".to_string()
}

fn default_typed_paths() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}
