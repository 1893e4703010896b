//! Size limits applied to incoming payloads.
//!
//! Clamping never fails a request: oversized collections and strings are cut
//! down before any inference runs.

/// Return at most `max_chars` characters of `input` (not bytes).
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampPolicy {
    /// Ranking request body cap in bytes
    pub max_body_bytes: u64,
    pub max_documents: usize,
    pub max_doc_chars: usize,
    pub max_text_chars: usize,
    pub min_summarize_chars: usize,
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024,
            max_documents: 500,
            max_doc_chars: 2000,
            max_text_chars: 2000,
            min_summarize_chars: 50,
        }
    }
}

impl ClampPolicy {
    /// Keep the first `max_documents` entries, each cut to `max_doc_chars`.
    pub fn clamp_documents(&self, mut documents: Vec<String>) -> Vec<String> {
        documents.truncate(self.max_documents);
        for doc in documents.iter_mut() {
            let keep = truncate_chars(doc, self.max_doc_chars).len();
            doc.truncate(keep);
        }
        documents
    }

    /// Portion of a text handed to the summarization model.
    pub fn clamp_text<'a>(&self, text: &'a str) -> &'a str {
        truncate_chars(text, self.max_text_chars)
    }

    /// Whether a text is too short to be worth summarizing.
    pub fn is_too_short(&self, text: &str) -> bool {
        text.trim_matches(is_space).chars().count() < self.min_summarize_chars
    }
}

/// Unicode whitespace plus the information separators U+001C..U+001F,
/// which `char::is_whitespace` leaves out.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}
