//! Corpus normalizer: flattens content records into one bounded seed text.
//!
//! The rendered text never exceeds the configured ceiling, counted in chars.
//! Whole records are kept in input order while they fit; everything from the
//! first overflowing record onward is dropped. If not even the first record
//! fits, its rendering is cut at the ceiling.

use content_sources::ContentRecord;
use serde::{Deserialize, Serialize};
use transcript_ledger::ContentDigest;

/// Default ceiling in characters.
pub const DEFAULT_CORPUS_CEILING: usize = 8192;

const RECORD_SEPARATOR: &str = "\n\n";

/// Normalized, size-bounded seed text plus the records it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    records: Vec<ContentRecord>,
    rendered: String,
    ceiling: usize,
    dropped: usize,
    truncated: bool,
}

impl Corpus {
    /// Wrap operator-supplied seed text, cut to `ceiling` chars.
    pub fn from_text(text: &str, ceiling: usize) -> Self {
        let truncated = text.chars().count() > ceiling;
        Corpus {
            records: Vec::new(),
            rendered: truncate_chars(text, ceiling),
            ceiling,
            dropped: 0,
            truncated,
        }
    }

    /// Records that contributed to the rendered text.
    pub fn records(&self) -> &[ContentRecord] {
        &self.records
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Number of records left out because they did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Whether the first record had to be cut mid-text.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn char_len(&self) -> usize {
        self.rendered.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }

    /// SHA-256 digest of the rendered text.
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::from_bytes(self.rendered.as_bytes())
    }
}

/// Render one record with the fixed corpus template.
pub fn render_record(record: &ContentRecord) -> String {
    let author = record.author.as_deref().unwrap_or(&record.source);
    let description = record.description.as_deref().unwrap_or("N/A");
    let mut out = format!(
        "Title: {}\nAuthor: {}\nDescription: {}\nContent: {}",
        record.title, author, description, record.body
    );
    if !record.snippets.is_empty() {
        out.push_str("\nTop comments:");
        for snippet in &record.snippets {
            out.push_str("\n- ");
            out.push_str(snippet);
        }
    }
    out
}

/// Merge `records` into a [`Corpus`] whose rendered text fits in `ceiling` chars.
pub fn normalize(records: Vec<ContentRecord>, ceiling: usize) -> Corpus {
    let total = records.len();
    let mut kept = Vec::new();
    let mut rendered = String::new();
    let mut used = 0usize;
    let mut truncated = false;

    for record in records {
        let block = render_record(&record);
        let sep = if kept.is_empty() { 0 } else { RECORD_SEPARATOR.len() };
        let cost = sep + block.chars().count();

        if used + cost <= ceiling {
            if sep > 0 {
                rendered.push_str(RECORD_SEPARATOR);
            }
            rendered.push_str(&block);
            used += cost;
            kept.push(record);
            continue;
        }

        if kept.is_empty() {
            rendered = truncate_chars(&block, ceiling);
            truncated = true;
            kept.push(record);
        }
        break;
    }

    Corpus {
        dropped: total - kept.len(),
        records: kept,
        rendered,
        ceiling,
        truncated,
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
