//! Merge pass: rewrite destination draw orders from a mapping

use crate::error::Result;
use crate::extractor::DrawOrderMap;
use crate::record::{classify_line, ensure_structure, numbered_lines, LineKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A single rewritten record line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    /// 1-based line number in the destination text
    pub line: usize,
    /// Record identifier
    pub identifier: String,
    /// Draw order before the merge
    pub from: String,
    /// Draw order after the merge
    pub to: String,
}

/// Result of merging a mapping into destination text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// Processed text, same lines in the same order as the input
    pub text: String,
    /// Number of lines whose draw order changed
    pub lines_affected: usize,
    /// Well-formed record lines in the destination
    pub records_seen: usize,
    /// Records whose identifier was found in the mapping
    pub records_matched: usize,
    /// Every rewritten line, in file order
    pub changes: Vec<LineChange>,
}

/// Apply `map` to the records in destination MML text
///
/// Records missing from the mapping, or already carrying the mapped value,
/// are left as they are. Any malformed record line aborts the whole pass and
/// no text is produced.
pub fn merge_draw_orders(text: &str, map: &DrawOrderMap) -> Result<MergeOutcome> {
    ensure_structure(text)?;

    let mut lines: Vec<String> = Vec::new();
    let mut changes: Vec<LineChange> = Vec::new();
    let mut records_seen = 0;
    let mut records_matched = 0;

    for (line_number, line) in numbered_lines(text) {
        let record = match classify_line(line, line_number)? {
            LineKind::Passthrough => {
                lines.push(line.to_string());
                continue;
            }
            LineKind::Record(record) => record,
        };
        records_seen += 1;

        let Some(draw_order) = map.get(record.identifier) else {
            lines.push(line.to_string());
            continue;
        };
        records_matched += 1;

        if draw_order == record.draw_order {
            lines.push(line.to_string());
            continue;
        }

        trace!(
            line = line_number,
            identifier = record.identifier,
            from = record.draw_order,
            to = draw_order,
            "rewriting draw order"
        );
        lines.push(record.with_draw_order(line, draw_order));
        changes.push(LineChange {
            line: line_number,
            identifier: record.identifier.to_string(),
            from: record.draw_order.to_string(),
            to: draw_order.to_string(),
        });
    }

    debug!(
        records_seen,
        records_matched,
        lines_affected = changes.len(),
        "merged draw orders"
    );

    Ok(MergeOutcome {
        text: lines.join("\n"),
        lines_affected: changes.len(),
        records_seen,
        records_matched,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extractor::extract_draw_orders;
    use crate::record::fixtures::{csf_line, mml_document};
    use proptest::prelude::*;

    fn map_of(entries: &[(&str, &str)]) -> DrawOrderMap {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_merge_rewrites_matching_record() {
        let source = mml_document(&[csf_line(1, "FOO.jsf", "Label", 42)]);
        let dest = mml_document(&[csf_line(1, "FOO.jsf", "Label", 7)]);

        let map = extract_draw_orders(&source).unwrap();
        let outcome = merge_draw_orders(&dest, &map).unwrap();

        assert_eq!(outcome.lines_affected, 1);
        assert_eq!(outcome.text, source);
        assert_eq!(
            outcome.changes,
            vec![LineChange {
                line: 3,
                identifier: "FOO.jsf".to_string(),
                from: "7".to_string(),
                to: "42".to_string(),
            }]
        );
    }

    #[test]
    fn test_merge_leaves_unknown_identifiers() {
        let dest = mml_document(&[csf_line(1, "FOO.jsf", "Foo", 7), csf_line(2, "BAR.jsf", "Bar", 3)]);
        let outcome = merge_draw_orders(&dest, &map_of(&[("BAR.jsf", "30")])).unwrap();

        assert_eq!(outcome.lines_affected, 1);
        assert_eq!(outcome.records_seen, 2);
        assert_eq!(outcome.records_matched, 1);
        assert!(outcome.text.contains(&csf_line(1, "FOO.jsf", "Foo", 7)));
        assert!(outcome.text.contains(&csf_line(2, "BAR.jsf", "Bar", 30)));
    }

    #[test]
    fn test_merge_same_value_is_not_a_change() {
        let dest = mml_document(&[csf_line(1, "FOO.jsf", "Foo", 7)]);
        let outcome = merge_draw_orders(&dest, &map_of(&[("FOO.jsf", "7")])).unwrap();

        assert_eq!(outcome.records_matched, 1);
        assert_eq!(outcome.lines_affected, 0);
        assert_eq!(outcome.text, dest);
    }

    #[test]
    fn test_merge_empty_map_is_identity() {
        let dest = mml_document(&[csf_line(1, "FOO.jsf", "Foo", 7)]);
        let outcome = merge_draw_orders(&dest, &DrawOrderMap::new()).unwrap();
        assert_eq!(outcome.text, dest);
        assert_eq!(outcome.lines_affected, 0);
    }

    #[test]
    fn test_merge_preserves_crlf_and_blank_lines() {
        let dest = format!(
            "<?xml?>\r\n<Compact_Sonar_Files>\r\n\r\n{}\r\n</Compact_Sonar_Files>",
            csf_line(1, "FOO.jsf", "Foo", 7)
        );
        let outcome = merge_draw_orders(&dest, &map_of(&[("FOO.jsf", "8")])).unwrap();
        assert_eq!(outcome.text, dest.replace(",7</CSFFILE1>", ",8</CSFFILE1>"));
    }

    #[test]
    fn test_merge_rejects_missing_wrapper() {
        let err = merge_draw_orders("<Nope/>", &DrawOrderMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnrecognisedStructure));
    }

    #[test]
    fn test_merge_rejects_malformed_row() {
        let dest = mml_document(&[
            csf_line(1, "FOO.jsf", "Foo", 7),
            "<CSFFILE2>1,2,3</CSFFILE2>".to_string(),
        ]);
        let err = merge_draw_orders(&dest, &map_of(&[("FOO.jsf", "8")])).unwrap_err();
        assert!(matches!(err, Error::UnrecognisedRow { line: 4 }));
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let dest = mml_document(&[csf_line(1, "FOO.jsf", "Foo", 7), csf_line(2, "BAR.jsf", "Bar", 1)]);
        let map = map_of(&[("FOO.jsf", "12"), ("BAR.jsf", "5")]);

        let first = merge_draw_orders(&dest, &map).unwrap();
        let second = merge_draw_orders(&first.text, &map).unwrap();

        assert_eq!(first.lines_affected, 2);
        assert_eq!(second.lines_affected, 0);
        assert_eq!(second.text, first.text);
    }

    fn record_strategy() -> impl Strategy<Value = (String, u32, bool)> {
        ("[A-Z]{1,4}(_[0-9]{1,2})?", 0u32..500, any::<bool>())
    }

    fn identifier(stem: &str) -> String {
        format!("{stem}.jsf")
    }

    proptest! {
        #[test]
        fn prop_line_count_and_affected_agree(
            records in proptest::collection::vec(record_strategy(), 0..20),
            filler in proptest::collection::vec("[ a-z<>/]{0,12}", 0..5),
            new_order in 0u32..500,
        ) {
            let mut lines: Vec<String> = filler
                .into_iter()
                .filter(|l| !l.contains("<CSFFILE"))
                .collect();
            let mut map = DrawOrderMap::new();
            for (i, (stem, order, mapped)) in records.iter().enumerate() {
                let id = identifier(stem);
                lines.push(csf_line(i as u32, &id, "label", *order));
                if *mapped {
                    map.insert(id, new_order.to_string());
                }
            }
            let dest = mml_document(&lines);

            let outcome = merge_draw_orders(&dest, &map).unwrap();

            let before: Vec<&str> = dest.split('\n').collect();
            let after: Vec<&str> = outcome.text.split('\n').collect();
            prop_assert_eq!(before.len(), after.len());

            let differing = before.iter().zip(&after).filter(|(a, b)| a != b).count();
            prop_assert_eq!(outcome.lines_affected, differing);
            prop_assert_eq!(outcome.changes.len(), differing);

            let again = merge_draw_orders(&outcome.text, &map).unwrap();
            prop_assert_eq!(again.lines_affected, 0);
            prop_assert_eq!(again.text, outcome.text);
        }

        #[test]
        fn prop_records_without_map_hits_pass_through(
            records in proptest::collection::vec(record_strategy(), 0..20),
        ) {
            let lines: Vec<String> = records
                .iter()
                .enumerate()
                .map(|(i, (stem, order, _))| csf_line(i as u32, &identifier(stem), "x", *order))
                .collect();
            let dest = mml_document(&lines);

            let outcome = merge_draw_orders(&dest, &DrawOrderMap::new()).unwrap();
            prop_assert_eq!(outcome.text, dest);
            prop_assert_eq!(outcome.records_seen, records.len());
        }
    }
}
