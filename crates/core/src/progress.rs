//! Progress extraction from separation tool output.
//!
//! The tool reports progress as terminal progress bars (`" 45%|████  | 45/100"`),
//! possibly several redraws on one line separated by `\r`. [`parse_progress`]
//! pulls out the latest percentage and maps it into `5..=95`; the controller
//! sets the start and the final `100` itself once artifacts are verified.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Lowest progress value derived from tool output.
pub const MIN_REPORTED_PROGRESS: u8 = 5;

/// Highest progress value derived from tool output.
pub const MAX_REPORTED_PROGRESS: u8 = 95;

static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)%").unwrap());

/// Returns the mapped progress of the last `\r`-delimited segment containing a
/// percentage token, or `None` when no segment has one.
pub fn parse_progress(line: &str) -> Option<u8> {
    line.rsplit('\r')
        .find_map(|segment| PERCENT_RE.captures(segment))
        .map(|caps| {
            // Out-of-range values (including ones too long for u32) saturate at 100
            let raw = caps[1].parse::<u32>().unwrap_or(100).min(100);
            map_percentage(raw as u8)
        })
}

/// Maps a raw `0..=100` percentage onto `5..=95`.
pub fn map_percentage(raw: u8) -> u8 {
    let raw = raw.min(100) as u16;
    (MIN_REPORTED_PROGRESS as u16 + raw * 9 / 10) as u8
}

/// Filters a progress stream down to strictly increasing values.
///
/// One tracker lives for the duration of a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    /// Creates a tracker starting from the given persisted value.
    pub fn starting_at(last: u8) -> Self {
        Self { last }
    }

    /// Records `value` and returns it if it is greater than the last accepted value.
    pub fn advance(&mut self, value: u8) -> Option<u8> {
        if value > self.last {
            self.last = value;
            Some(value)
        } else {
            None
        }
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}
