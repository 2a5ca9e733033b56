// ai
//! 🚶 Passthrough: the stage that does nothing, so a chain can say so out loud.
//!
//! Handy as a placeholder while a config is being sketched, and as proof that
//! the plumbing around the chain works when nothing inside it does. 🦆

use anyhow::Result;
use async_trait::async_trait;

use super::Transform;
use crate::common::Record;

#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl Transform for Passthrough {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        Ok(vec![record])
    }
}
