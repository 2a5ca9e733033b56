// ai
//! 🔄 Transforms: the part of the pipeline where records get opinions 🎭🚀
//!
//! 🎬 COLD OPEN: INT. STAGING CLUSTER, 2:47 AM
//!
//! "Can we load production into staging," the ticket said, "but strip the
//! timestamps, skip the test accounts, and make ten copies of everything so
//! we can load-test the new mapping?" The engineer read it twice. Then they
//! wrote four lines of TOML and went back to bed.
//!
//! A [`Transform`] takes one record and answers with zero, one, or many.
//! Stages run strictly in order: whatever stage N emits, stage N+1 sees, in
//! emission order, before stage N is handed its next input. Nothing runs in
//! parallel with itself, so a stage can keep plain `&mut self` state (a
//! counter, a dedupe set, a grudge) without a lock in sight.
//!
//! ```text
//!   record ──▶ [strip_fields] ──▶ [skip] ──▶ [clone ×3] ──▶ r, r', r''
//! ```
//!
//! ## Knowledge Graph 🧠
//! - Built-ins are configured from `[[transforms]]` via [`TransformConfig`].
//! - Library users can add their own with [`FnStage`] or by implementing [`Transform`].
//! - Used by: the sink worker, between the channel and the sink.
//!
//! ⚠️ The singularity will transform all data into pure consciousness.
//! Until then, we `Vec<Record>`. 🦆

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::common::Record;

mod clone;
mod echo;
mod fields;
mod filter;
mod fn_stage;
mod passthrough;

pub use clone::Cloner;
pub use echo::{Count, Echo};
pub use fields::{PrefixId, StripFields};
pub use filter::{Breaker, Skip};
pub use fn_stage::FnStage;
pub use passthrough::Passthrough;

/// 🔄 One stage of the chain.
///
/// # Contract 📜
/// - Called once per input, in arrival order. The returned future completing
///   is the "done with this one, send the next" signal.
/// - Return an empty `Vec` to drop, one record to pass or mutate, many to fan out.
/// - An `Err` stops the whole pipeline. There is no skip-and-continue; if you
///   want that, return an empty `Vec` instead.
#[async_trait]
pub trait Transform: Send + std::fmt::Debug {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>>;
}

/// 🎛️ The built-in stages, as they appear in `[[transforms]]` config.
///
/// ```toml
/// [[transforms]]
/// type = "strip_fields"
/// fields = ["_created_time", "_updated_time"]
///
/// [[transforms]]
/// type = "skip"
/// field = "creator"
/// equals = "test"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// 🚶 Identity.
    Passthrough,
    /// 📣 Log every record at info level.
    Echo,
    /// 🔢 Log a running count every `every` records.
    Count {
        #[serde(default = "default_count_every")]
        every: u64,
    },
    /// ✂️ Remove these top-level body fields.
    StripFields { fields: Vec<String> },
    /// 🚫 Drop records whose body `field` equals `equals`.
    Skip { field: String, equals: Value },
    /// 👯 Emit `copies` copies of each record.
    Clone {
        copies: usize,
        /// Copy `i` goes to `new_<collection>_<i>` / `new_<kind>_<i>`.
        #[serde(default)]
        redirect: bool,
        /// Copy `i` gets `" # i"` appended to this text field.
        #[serde(default)]
        annotate_field: Option<String>,
    },
    /// 🏷️ Rewrite `body.id` to `<prefix><id>`.
    PrefixId { prefix: String },
    /// 🧱 Swallow everything. Nothing gets past. Useful for dry runs.
    Breaker,
}

fn default_count_every() -> u64 {
    1
}

impl TransformConfig {
    /// 🏗️ Instantiate the stage this config describes.
    pub fn build(&self) -> Box<dyn Transform> {
        match self {
            TransformConfig::Passthrough => Box::new(Passthrough),
            TransformConfig::Echo => Box::new(Echo),
            TransformConfig::Count { every } => Box::new(Count::new(*every)),
            TransformConfig::StripFields { fields } => Box::new(StripFields::new(fields.clone())),
            TransformConfig::Skip { field, equals } => Box::new(Skip::new(field.clone(), equals.clone())),
            TransformConfig::Clone {
                copies,
                redirect,
                annotate_field,
            } => Box::new(Cloner::new(*copies, *redirect, annotate_field.clone())),
            TransformConfig::PrefixId { prefix } => Box::new(PrefixId::new(prefix.clone())),
            TransformConfig::Breaker => Box::new(Breaker),
        }
    }
}

/// ⛓️ An ordered list of stages applied to one record at a time.
#[derive(Debug, Default)]
pub struct TransformChain {
    stages: Vec<Box<dyn Transform>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &[TransformConfig]) -> Self {
        Self {
            stages: configs.iter().map(TransformConfig::build).collect(),
        }
    }

    /// ➕ Append a stage at the end of the chain.
    pub fn push(&mut self, stage: impl Transform + 'static) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// 🔄 Run one record through every stage, left to right.
    ///
    /// Each stage sees the previous stage's output in emission order. A stage
    /// that emits nothing ends the trip early; later stages never hear of it.
    pub async fn apply(&mut self, record: Record) -> Result<Vec<Record>> {
        let mut batch = vec![record];
        for stage in &mut self.stages {
            let mut emitted = Vec::with_capacity(batch.len());
            for record in batch {
                emitted.extend(stage.transform(record).await?);
            }
            batch = emitted;
            if batch.is_empty() {
                break;
            }
        }
        Ok(batch)
    }
}
