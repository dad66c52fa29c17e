//! Silence detection between consecutive subtitle blocks.
//! Reports stretches without captions that exceed a threshold, which usually
//! point at audio the transcription missed.

use crate::error::{ConfigError, ParseError};
use crate::srt::{TimedBlock, TIME_RANGE_DELIMITER};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Default silence threshold in seconds.
pub const DEFAULT_GAP_THRESHOLD_SECS: f64 = 10.0;

const MICROS_PER_SEC: u64 = 1_000_000;

/// Gap detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapConfig {
    pub threshold_seconds: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            threshold_seconds: DEFAULT_GAP_THRESHOLD_SECS,
        }
    }
}

impl GapConfig {
    /// Reject thresholds that cannot be compared meaningfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_seconds.is_finite() || self.threshold_seconds < 0.0 {
            return Err(ConfigError::Threshold(self.threshold_seconds));
        }
        Ok(())
    }
}

/// A time of day with microsecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    micros: u64,
}

impl Timestamp {
    /// Parse `HH:MM:SS,fff` (or `.fff`), with one to six fractional digits.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::Timestamp(text.to_string());
        let (clock, fraction) = text
            .trim()
            .split_once([',', '.'])
            .ok_or_else(malformed)?;
        let mut fields = clock.split(':');
        let (Some(h), Some(m), Some(s), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed());
        };
        let hours = parse_digits(h, 2).ok_or_else(malformed)?;
        let minutes = parse_digits(m, 2).ok_or_else(malformed)?;
        let seconds = parse_digits(s, 2).ok_or_else(malformed)?;
        let frac = parse_digits(fraction, 6).ok_or_else(malformed)?;
        for (value, limit, field) in [
            (hours, 24, "hours"),
            (minutes, 60, "minutes"),
            (seconds, 60, "seconds"),
        ] {
            if value >= limit {
                return Err(ParseError::OutOfRange {
                    text: text.to_string(),
                    field,
                });
            }
        }
        // ",5" means half a second, so scale by the digits that are missing.
        let scale = 10u64.pow(6 - fraction.len() as u32);
        Ok(Self {
            micros: ((hours * 60 + minutes) * 60 + seconds) * MICROS_PER_SEC + frac * scale,
        })
    }

    /// Microseconds since midnight.
    pub fn as_micros(self) -> u64 {
        self.micros
    }
}

/// Parse between one and `max_len` ASCII digits.
fn parse_digits(text: &str, max_len: usize) -> Option<u64> {
    if text.is_empty() || text.len() > max_len || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A silence between the end of one block and the start of the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub previous_end: String,
    pub next_start: String,
    pub duration_seconds: f64,
}

/// Result of one scan: gaps found plus the pairs that could not be parsed.
#[derive(Debug, Default)]
pub struct GapScan {
    pub gaps: Vec<Gap>,
    /// Position of the failing pair (0-based, counted from the first pair) and why.
    pub errors: Vec<(usize, ParseError)>,
}

/// Split a time range into its raw start and end strings.
pub fn split_time_range(range: &str) -> Result<(String, String), ParseError> {
    let (start, end) = range
        .split_once(TIME_RANGE_DELIMITER)
        .ok_or_else(|| ParseError::MissingSeparator(range.to_string()))?;
    Ok((start.trim().to_string(), end.trim().to_string()))
}

/// Collect the `(start, end)` pair of every block, in block order.
/// A range without a separator is kept as its `MissingSeparator` error.
pub fn time_pairs(blocks: &[TimedBlock]) -> Vec<Result<(String, String), ParseError>> {
    blocks
        .iter()
        .map(|b| split_time_range(&b.time_range))
        .collect()
}

/// Compare one block's end with the next block's start.
/// Returns `Ok(None)` when the silence does not exceed the threshold.
fn gap_between(
    previous: &(String, String),
    next: &(String, String),
    threshold_seconds: f64,
) -> Result<Option<Gap>, ParseError> {
    let end = Timestamp::parse(&previous.1)?;
    let start = Timestamp::parse(&next.0)?;
    if start <= end {
        return Ok(None);
    }
    let duration_seconds = (start.as_micros() - end.as_micros()) as f64 / MICROS_PER_SEC as f64;
    if duration_seconds <= threshold_seconds {
        return Ok(None);
    }
    Ok(Some(Gap {
        previous_end: previous.1.clone(),
        next_start: next.0.clone(),
        duration_seconds,
    }))
}

/// Scan consecutive pairs and report every silence longer than the threshold.
/// Overlapping or out-of-order entries are ignored; a malformed timestamp
/// only fails its own pair.
pub fn detect_gaps(pairs: &[(String, String)], config: &GapConfig) -> GapScan {
    let pairs: Vec<Result<(String, String), ParseError>> = pairs.iter().cloned().map(Ok).collect();
    scan_pairs(&pairs, config)
}

/// Scan the time ranges of parsed blocks.
/// A range that could not be split is reported for each pair it belongs to.
pub fn detect_block_gaps(blocks: &[TimedBlock], config: &GapConfig) -> GapScan {
    scan_pairs(&time_pairs(blocks), config)
}

fn scan_pairs(pairs: &[Result<(String, String), ParseError>], config: &GapConfig) -> GapScan {
    trace!(
        "scan_pairs pairs={} threshold={}",
        pairs.len(),
        config.threshold_seconds
    );
    let mut scan = GapScan::default();
    for (i, window) in pairs.windows(2).enumerate() {
        let res = match (&window[0], &window[1]) {
            (Ok(previous), Ok(next)) => gap_between(previous, next, config.threshold_seconds),
            (Err(err), _) | (_, Err(err)) => Err(err.clone()),
        };
        match res {
            Ok(Some(gap)) => {
                debug!(
                    "gap of {:.3}s between {} and {}",
                    gap.duration_seconds, gap.previous_end, gap.next_start
                );
                scan.gaps.push(gap);
            }
            Ok(None) => {}
            Err(err) => scan.errors.push((i, err)),
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(start: &str, end: &str) -> (String, String) {
        (start.to_string(), end.to_string())
    }

    /// A 15 second silence is the only thing reported with the default threshold.
    #[test]
    fn reports_single_gap() {
        let pairs = vec![
            pair("00:00:00,000", "00:00:05,000"),
            pair("00:00:20,000", "00:00:25,000"),
        ];
        let scan = detect_gaps(&pairs, &GapConfig::default());
        assert!(scan.errors.is_empty());
        assert_eq!(
            scan.gaps,
            vec![Gap {
                previous_end: "00:00:05,000".into(),
                next_start: "00:00:20,000".into(),
                duration_seconds: 15.0,
            }]
        );
    }

    /// Silences equal to the threshold and overlaps are not gaps.
    #[test]
    fn ignores_small_and_negative_gaps() {
        let pairs = vec![
            pair("00:00:00,000", "00:00:05,000"),
            pair("00:00:15,000", "00:00:30,000"),
            pair("00:00:20,000", "00:00:21,000"),
        ];
        let scan = detect_gaps(&pairs, &GapConfig::default());
        assert!(scan.gaps.is_empty());
        assert!(scan.errors.is_empty());
    }

    /// A broken timestamp fails its pair but the scan keeps going.
    #[test]
    fn malformed_pair_does_not_abort_scan() {
        let pairs = vec![
            pair("00:00:00,000", "garbage"),
            pair("00:00:10,000", "00:00:11,000"),
            pair("00:01:00,000", "00:01:01,000"),
        ];
        let scan = detect_gaps(&pairs, &GapConfig::default());
        assert_eq!(scan.errors.len(), 1);
        assert_eq!(scan.errors[0].0, 0);
        assert_eq!(scan.gaps.len(), 1);
        assert_eq!(scan.gaps[0].duration_seconds, 49.0);
    }

    #[test]
    fn parses_fractions_and_rejects_bad_fields() {
        assert_eq!(Timestamp::parse("00:00:01,5").unwrap().as_micros(), 1_500_000);
        assert_eq!(Timestamp::parse("01:00:00.250").unwrap().as_micros(), 3_600_250_000);
        assert!(matches!(
            Timestamp::parse("00:61:00,000"),
            Err(ParseError::OutOfRange { field: "minutes", .. })
        ));
        assert!(Timestamp::parse("00:00:00").is_err());
        assert!(Timestamp::parse("0:0:0:0,0").is_err());
    }

    /// Pairs are read from block time ranges in document order.
    #[test]
    fn derives_pairs_from_blocks() {
        let blocks = vec![
            TimedBlock::new(1, "00:00:00,000 --> 00:00:01,000", vec![]),
            TimedBlock::new(2, "broken", vec![]),
        ];
        assert_eq!(
            time_pairs(&blocks),
            vec![
                Ok(pair("00:00:00,000", "00:00:01,000")),
                Err(ParseError::MissingSeparator("broken".into())),
            ]
        );
    }

    /// A range without `-->` fails both pairs it touches and the scan carries on.
    #[test]
    fn reports_missing_separator() {
        let blocks = vec![
            TimedBlock::new(1, "00:00:00,000 --> 00:00:01,000", vec![]),
            TimedBlock::new(2, "broken", vec![]),
            TimedBlock::new(3, "00:00:30,000 --> 00:00:31,000", vec![]),
            TimedBlock::new(4, "00:01:00,000 --> 00:01:01,000", vec![]),
        ];
        let scan = detect_block_gaps(&blocks, &GapConfig::default());
        let missing = ParseError::MissingSeparator("broken".into());
        assert_eq!(scan.errors, vec![(0, missing.clone()), (1, missing)]);
        assert_eq!(scan.gaps.len(), 1);
        assert_eq!(scan.gaps[0].previous_end, "00:00:31,000");
        assert_eq!(scan.gaps[0].duration_seconds, 29.0);
    }

    #[test]
    fn rejects_negative_threshold() {
        let config = GapConfig {
            threshold_seconds: -1.0,
        };
        assert_eq!(config.validate(), Err(ConfigError::Threshold(-1.0)));
    }
}
