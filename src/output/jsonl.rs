//! JSON-lines item sink
//!
//! Every saved item becomes one JSON object on its own line, appended to a
//! file or written to stdout.

use crate::item::{FieldValue, Item, SaveStep};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Serialize)]
struct ItemRecord<'a> {
    name: &'a str,
    url: &'a str,
    fetched_at: DateTime<Utc>,
    fields: &'a BTreeMap<String, FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_length: Option<usize>,
}

/// Writes items as JSON lines
pub struct JsonLinesSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesSink {
    /// Opens `path` for appending, creating it if needed
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::from_writer(file))
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Appends one item
    pub fn write(&self, item: &Item) -> anyhow::Result<()> {
        let record = ItemRecord {
            name: &item.name,
            url: item.url(),
            fetched_at: Utc::now(),
            fields: &item.result,
            content_length: item.content.as_ref().map(Vec::len),
        };
        let line = serde_json::to_string(&record)
            .with_context(|| format!("Failed to serialize item '{}'", item.name))?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .with_context(|| format!("Failed to write item '{}' from {}", item.name, item.url()))
    }

    /// A save step writing into this sink
    pub fn save_step(self: &Arc<Self>) -> SaveStep {
        let sink = Arc::clone(self);
        SaveStep::blocking(move |item, _session| sink.write(item))
    }
}
