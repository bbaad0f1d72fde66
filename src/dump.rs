//! The dump document: one JSON object holding every collected category
//! plus the run metadata.

use std::io::Write;
use std::path::Path;

use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Serializer, Value};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::normalize::Record;

/// Compact timestamp used in output file names and the dump meta.
pub fn generate_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day][hour][minute][second]"
        ))
        .unwrap_or_else(|_| "00000000000000".to_string())
}

#[derive(Debug, Clone)]
pub struct Dump {
    sections: Map<String, Value>,
}

impl Dump {
    pub fn new(sections: Map<String, Value>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sections.contains_key(key)
    }

    /// The records of a category section; empty for missing sections.
    pub fn records(&self, key: &str) -> Vec<&Record> {
        self.sections
            .get(key)
            .and_then(Value::as_array)
            .map(|records| records.iter().filter_map(Value::as_object).collect())
            .unwrap_or_default()
    }

    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.sections.get("meta").and_then(Value::as_object)
    }

    /// Records the command line (and query config, when one was used)
    /// into the meta block.
    pub fn annotate_meta(&mut self, launch_arguments: String, query_config: Option<Value>) {
        if let Some(meta) = self
            .sections
            .get_mut("meta")
            .and_then(Value::as_object_mut)
        {
            meta.insert("launch_arguments".to_string(), Value::from(launch_arguments));
            if let Some(config) = query_config {
                meta.insert("query_config".to_string(), config);
            }
        }
    }

    pub fn write(&self, path: &Path) -> crate::Result<()> {
        use serde::Serialize;

        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut writer, formatter);
        self.sections.serialize(&mut serializer)?;
        writer.flush()?;
        Ok(())
    }

    /// Re-reads a previously written dump, for graph generation without
    /// touching the network.
    pub fn load(path: &Path) -> crate::Result<Self> {
        log::info!("Importing dump from file {}", path.display());
        let data = std::fs::read_to_string(path)?;
        let sections: Map<String, Value> = serde_json::from_str(&data)?;
        Ok(Self { sections })
    }
}
