use anyhow::{Context, Result};
use regex::Regex;

use crate::config::StopwordSet;

// Line boundaries: \n, \r, VT, FF, FS, GS, RS, NEL, LS and PS. `\r\n` leaves
// an empty segment behind, which the blank-line rule drops.
const LINE_BREAKS: [char; 10] = [
    '\n', '\r', '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}',
];

#[derive(Debug, Clone)]
pub(super) struct PageNormalizer {
    stopwords: StopwordSet,
    whitespace_run: Regex,
}

impl PageNormalizer {
    pub(super) fn new(stopwords: StopwordSet) -> Result<Self> {
        Ok(Self {
            stopwords,
            whitespace_run: Regex::new(r"\s{2,}")
                .context("failed to compile whitespace run regex")?,
        })
    }

    pub(super) fn normalize(&self, text: &str) -> String {
        text.split(LINE_BREAKS)
            .filter_map(|line| {
                let line = line.trim().to_lowercase();
                if line.is_empty() || self.stopwords.matches(&line) {
                    return None;
                }
                Some(self.whitespace_run.replace_all(&line, " ").into_owned())
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
