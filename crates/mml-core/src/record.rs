//! CSF record recognition for MML file text
//!
//! An MML file is only understood as far as its `<CSFFILEn>` record lines.
//! Everything else is carried through untouched.

use crate::error::{Error, Result};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Top-level wrapper element; may span many lines
static MML_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<Compact_Sonar_Files>.*</Compact_Sonar_Files>")
        .expect("Invalid MML wrapper regex")
});

/// Full shape of a CSF record line. Opening and closing tag numbers are not
/// required to agree.
static CSF_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<CSFFILE[0-9]+>[0-9,.]+&quot;.*\.CSF&quot;.*&quot;.*\.jsf&quot;.*&quot;.*&quot;,[0-9]+,[0-9]+</CSFFILE[0-9]+>",
    )
    .expect("Invalid CSF row regex")
});

static CSF_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z_.0-9]+\.jsf").expect("Invalid CSF identifier regex"));

static CSF_DRAW_ORDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",([0-9]+)</CSFFILE").expect("Invalid CSF draw order regex"));

/// Marker that flags a line as intended to be a record
const CSF_OPEN_MARKER: &str = "<CSFFILE";

/// Fail unless the text contains the `<Compact_Sonar_Files>` wrapper
pub fn ensure_structure(text: &str) -> Result<()> {
    if MML_WRAPPER.is_match(text) {
        Ok(())
    } else {
        Err(Error::UnrecognisedStructure)
    }
}

/// Split file text into 1-based numbered lines on `\n`
///
/// A trailing newline yields a final empty line, so joining the lines back
/// with `\n` reproduces the input exactly.
pub fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split('\n').enumerate().map(|(i, line)| (i + 1, line))
}

/// How a single line of MML text is treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Ordinary content, carried through verbatim
    Passthrough,
    /// A well-formed CSF record
    Record(CsfRecord<'a>),
}

/// Fields extracted from a well-formed CSF record line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsfRecord<'a> {
    /// Record identifier, e.g. `FOO.jsf`
    pub identifier: &'a str,
    /// Draw order digits as written in the line
    pub draw_order: &'a str,
    /// Byte range of the draw order digits within the line
    draw_order_span: Range<usize>,
}

impl CsfRecord<'_> {
    /// Rebuild `line` with its draw order replaced by `value`
    ///
    /// `line` must be the line this record was extracted from.
    pub fn with_draw_order(&self, line: &str, value: &str) -> String {
        let mut out = String::with_capacity(line.len() + value.len());
        out.push_str(&line[..self.draw_order_span.start]);
        out.push_str(value);
        out.push_str(&line[self.draw_order_span.end..]);
        out
    }
}

/// Classify one line, extracting record fields when it is a CSF record
///
/// A line that mentions `<CSFFILE` without matching the full record shape is
/// an error, as is a record line without an uppercase `.jsf` identifier.
pub fn classify_line(line: &str, line_number: usize) -> Result<LineKind<'_>> {
    if !CSF_ROW.is_match(line) {
        if line.contains(CSF_OPEN_MARKER) {
            return Err(Error::UnrecognisedRow { line: line_number });
        }
        return Ok(LineKind::Passthrough);
    }

    let identifier = CSF_IDENTIFIER
        .find(line)
        .ok_or(Error::UnrecognisedRow { line: line_number })?
        .as_str();

    let digits = CSF_DRAW_ORDER
        .captures(line)
        .and_then(|c| c.get(1))
        .ok_or(Error::UnrecognisedRow { line: line_number })?;

    Ok(LineKind::Record(CsfRecord {
        identifier,
        draw_order: digits.as_str(),
        draw_order_span: digits.range(),
    }))
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Build a record line the way the files lay them out
    pub fn csf_line(tag: u32, identifier: &str, label: &str, draw_order: u32) -> String {
        format!(
            "    <CSFFILE{tag}>0,1.5,2&quot;C:\\SONAR\\{stem}.CSF&quot;,&quot;C:\\SONAR\\JSF\\{identifier}&quot;,&quot;{label}&quot;,3,{draw_order}</CSFFILE{tag}>",
            stem = identifier.trim_end_matches(".jsf"),
        )
    }

    /// Wrap record lines in a minimal MML document
    pub fn mml_document(lines: &[String]) -> String {
        let mut text = String::from("<?xml version=\"1.0\"?>\n<Compact_Sonar_Files>\n");
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        text.push_str("</Compact_Sonar_Files>\n");
        text
    }
}
