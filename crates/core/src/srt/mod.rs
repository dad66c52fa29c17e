//! This module is responsible for SRT block parsing and reassembly.
//! Time ranges are kept as opaque strings so translation never touches timing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Marker separating start and end inside a time range line.
pub const TIME_RANGE_DELIMITER: &str = "-->";

/// Represents a single SRT block (index, time range, content lines).
/// Each content line keeps its `\n` terminator; blank lines are kept as `"\n"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedBlock {
    pub index: u64,
    pub time_range: String,
    pub lines: Vec<String>,
}

impl TimedBlock {
    /// Build a block from its parts.
    pub fn new(index: u64, time_range: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            index,
            time_range: time_range.into(),
            lines,
        }
    }

    /// Return a copy of this block with its content replaced.
    /// Index and time range are carried over untouched.
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            index: self.index,
            time_range: self.time_range.clone(),
            lines,
        }
    }
}

/// Parse SRT text into a list of blocks.
/// A bare integer line opens a block, a `-->` line sets its time range and
/// any other line, blank or not, is appended to the open block's content.
pub fn parse(input: &str) -> Vec<TimedBlock> {
    trace!("parse input_len={}", input.len());
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut blocks = Vec::new();
    let mut current: Option<TimedBlock> = None;
    for raw in input.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        if let Some(index) = parse_index(line) {
            if let Some(done) = current.take() {
                blocks.push(done);
            }
            current = Some(TimedBlock::new(index, String::new(), Vec::new()));
        } else if line.contains(TIME_RANGE_DELIMITER) {
            if let Some(block) = current.as_mut() {
                block.time_range = line.trim().to_string();
            }
        } else if let Some(block) = current.as_mut() {
            block.lines.push(format!("{line}\n"));
        }
    }
    if let Some(done) = current {
        blocks.push(done);
    }
    blocks
}

/// Recognise an index line: only ASCII digits once surrounding space is removed.
fn parse_index(line: &str) -> Option<u64> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Render one block back to SRT text.
/// The block always ends with a blank line, added only when the content does
/// not already end with one, so parsed input renders back byte for byte.
pub fn render_block(block: &TimedBlock) -> String {
    let mut out = format!("{}\n{}\n", block.index, block.time_range);
    for line in &block.lines {
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    let ends_blank = block.lines.last().is_some_and(|l| l.trim().is_empty());
    if !ends_blank {
        out.push('\n');
    }
    out
}

/// Reassemble completed blocks into SRT text ordered by index.
/// Input order is irrelevant; holes in the index space are skipped and a
/// repeated index keeps the first block seen.
pub fn reassemble<I>(blocks: I) -> String
where
    I: IntoIterator<Item = TimedBlock>,
{
    let mut by_index: BTreeMap<u64, TimedBlock> = BTreeMap::new();
    for block in blocks {
        if by_index.contains_key(&block.index) {
            warn!("duplicate block index {} ignored during reassembly", block.index);
            continue;
        }
        by_index.insert(block.index, block);
    }
    trace!("reassemble blocks={}", by_index.len());
    by_index.values().map(render_block).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:01,000\nHello\n\n2\n00:00:01,000 --> 00:00:02,000\nTwo\nlines\n\n";

    #[test]
    fn roundtrip_srt() {
        let blocks = parse(SAMPLE);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 1);
        assert_eq!(blocks[0].time_range, "00:00:00,000 --> 00:00:01,000");
        assert_eq!(blocks[1].lines, vec!["Two\n", "lines\n", "\n"]);
        assert_eq!(reassemble(blocks), SAMPLE);
    }

    /// Ensure a document starting at index 0 keeps its first block.
    #[test]
    fn keeps_index_zero() {
        let input = "0\n00:00:00,000 --> 00:00:01,000\nzero\n\n1\n00:00:01,000 --> 00:00:02,000\none\n\n";
        let blocks = parse(input);
        assert_eq!(blocks.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(reassemble(blocks), input);
    }

    /// Lines before the first index have no open block and are dropped.
    #[test]
    fn discards_preamble() {
        let input = "WEBVTT-ish header\n00:00:00,000 --> 00:00:01,000\n\n3\n00:00:05,000 --> 00:00:06,000\nhi\n";
        let blocks = parse(input);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 3);
        assert_eq!(blocks[0].lines, vec!["hi\n"]);
    }

    /// Blank lines inside a block stay in place.
    #[test]
    fn preserves_inner_blank_lines() {
        let input = "1\n00:00:00,000 --> 00:00:01,000\nHello\n\nWorld\n";
        let blocks = parse(input);
        assert_eq!(blocks[0].lines, vec!["Hello\n", "\n", "World\n"]);
    }

    /// CRLF input and a leading BOM parse the same as plain LF input.
    #[test]
    fn normalizes_crlf_and_bom() {
        let input = "\u{feff}1\r\n00:00:00,000 --> 00:00:01,000\r\nHello\r\n\r\n";
        let blocks = parse(input);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].index, 1);
        assert_eq!(blocks[0].lines, vec!["Hello\n", "\n"]);
    }

    /// Malformed time ranges are kept verbatim for later stages.
    #[test]
    fn passes_malformed_range_through() {
        let blocks = parse("7\nsoon --> later\ntext\n");
        assert_eq!(blocks[0].time_range, "soon --> later");
    }

    /// The last block gets a closing blank line when the file lacks one.
    #[test]
    fn render_terminates_block() {
        let block = TimedBlock::new(4, "a --> b", vec!["x".into()]);
        assert_eq!(render_block(&block), "4\na --> b\nx\n\n");
    }

    /// Any permutation of the same blocks reassembles to the same text.
    #[test]
    fn reassembly_ignores_input_order() {
        let blocks = parse(SAMPLE);
        let mut reversed = blocks.clone();
        reversed.reverse();
        assert_eq!(reassemble(blocks), reassemble(reversed));
    }

    /// Missing indices are skipped rather than treated as errors.
    #[test]
    fn reassembly_skips_holes() {
        let blocks = vec![
            TimedBlock::new(9, "c", vec!["nine\n".into()]),
            TimedBlock::new(0, "a", vec!["zero\n".into()]),
            TimedBlock::new(4, "b", vec!["four\n".into()]),
        ];
        assert_eq!(
            reassemble(blocks),
            "0\na\nzero\n\n4\nb\nfour\n\n9\nc\nnine\n\n"
        );
    }

    #[test]
    fn reassembly_keeps_first_duplicate() {
        let blocks = vec![
            TimedBlock::new(1, "a", vec!["first\n".into()]),
            TimedBlock::new(1, "a", vec!["second\n".into()]),
        ];
        assert_eq!(reassemble(blocks), "1\na\nfirst\n\n");
    }
}
