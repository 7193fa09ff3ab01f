//! Extraction pass: source MML text to an identifier -> draw order mapping

use crate::error::Result;
use crate::record::{classify_line, ensure_structure, numbered_lines, LineKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::debug;

/// Draw orders keyed by record identifier
///
/// Values are kept as the digit strings found in the file. Using a BTreeMap
/// keeps exports deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawOrderMap {
    entries: BTreeMap<String, String>,
}

impl DrawOrderMap {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a draw order, returning the previous value
    pub fn insert(&mut self, identifier: impl Into<String>, draw_order: impl Into<String>) -> Option<String> {
        self.entries.insert(identifier.into(), draw_order.into())
    }

    /// Look up the draw order for an identifier
    pub fn get(&self, identifier: &str) -> Option<&str> {
        self.entries.get(identifier).map(|s| s.as_str())
    }

    /// Number of identifiers in the mapping
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(identifier, draw_order)` sorted by identifier
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Write the mapping as pretty JSON
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Write the mapping as CSV with an `identifier,draw_order` header
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["identifier", "draw_order"])?;
        for (identifier, draw_order) in self.iter() {
            csv_writer.write_record([identifier, draw_order])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DrawOrderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DrawOrderMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Build the draw order mapping from source MML text
///
/// Later records win when an identifier appears more than once. Any malformed
/// record line aborts the whole pass.
pub fn extract_draw_orders(text: &str) -> Result<DrawOrderMap> {
    ensure_structure(text)?;

    let mut map = DrawOrderMap::new();
    let mut records = 0usize;

    for (line_number, line) in numbered_lines(text) {
        if let LineKind::Record(record) = classify_line(line, line_number)? {
            records += 1;
            if let Some(previous) = map.insert(record.identifier, record.draw_order) {
                debug!(
                    identifier = record.identifier,
                    previous = %previous,
                    line = line_number,
                    "duplicate identifier, keeping later draw order"
                );
            }
        }
    }

    debug!(records, identifiers = map.len(), "extracted draw orders");
    Ok(map)
}
