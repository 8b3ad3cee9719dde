//! JSON feed writer.

use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::{Result, feed::JsonRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedPath {
    pub url: String,
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditionalInfo {
    pub path: FeedPath,
}

/// Per-calendar JSON document: `count`, `additionalInfo`, `results`, in that
/// key order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonFeed {
    pub count: usize,
    pub additional_info: AdditionalInfo,
    pub results: Vec<JsonRecord>,
}

impl JsonFeed {
    pub fn new(path: FeedPath) -> Self {
        Self {
            count: 0,
            additional_info: AdditionalInfo { path },
            results: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: JsonRecord) {
        self.results.push(record);
        self.count = self.results.len();
    }

    /// UTF-8, four-space indentation, keys in declaration order.
    pub fn render(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()?)?;
        Ok(())
    }
}
