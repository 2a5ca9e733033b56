// ai
//! 🧩 Closures as stages, for library users who want one small tweak and no ceremony.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use super::Transform;
use crate::common::Record;

/// 🧩 Wraps `FnMut(Record) -> Result<Vec<Record>>` as a [`Transform`].
///
/// ```ignore
/// chain.push(FnStage::new("lowercase_titles", |mut r: Record| {
///     if let Some(Value::String(t)) = r.body.get_mut("title") { *t = t.to_lowercase(); }
///     Ok(vec![r])
/// }));
/// ```
pub struct FnStage<F> {
    name: &'static str,
    f: F,
}

impl<F> FnStage<F>
where
    F: FnMut(Record) -> Result<Vec<Record>> + Send,
{
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

// 🎭 closures do not Debug, so the name stands in for them
impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> Transform for FnStage<F>
where
    F: FnMut(Record) -> Result<Vec<Record>> + Send,
{
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        (self.f)(record)
    }
}
