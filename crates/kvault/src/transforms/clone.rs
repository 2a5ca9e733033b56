// ai
//! 👯 Fan-out: one record in, `copies` records out, in copy order.
//!
//! The load-test stage. Copy `i` (counting from 0) can optionally be moved to
//! its own collection and kind, `new_<collection>_<i>` / `new_<kind>_<i>`,
//! and can have `" # i"` appended to a text field so the copies are
//! tellable-apart by a human squinting at Kibana.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use super::Transform;
use crate::common::Record;

#[derive(Debug, Clone)]
pub struct Cloner {
    copies: usize,
    redirect: bool,
    annotate_field: Option<String>,
}

impl Cloner {
    pub fn new(copies: usize, redirect: bool, annotate_field: Option<String>) -> Self {
        Self {
            copies,
            redirect,
            annotate_field,
        }
    }

    fn copy(&self, record: &Record, i: usize) -> Record {
        let mut copy = record.clone();
        if self.redirect {
            copy.collection = format!("new_{}_{}", record.collection, i);
            copy.kind = format!("new_{}_{}", record.kind, i);
        }
        if let Some(field) = &self.annotate_field
            && let Some(Value::String(text)) = copy.body.get_mut(field)
        {
            text.push_str(&format!(" # {i}"));
        }
        copy
    }
}

#[async_trait]
impl Transform for Cloner {
    async fn transform(&mut self, record: Record) -> Result<Vec<Record>> {
        Ok((0..self.copies).map(|i| self.copy(&record, i)).collect())
    }
}
