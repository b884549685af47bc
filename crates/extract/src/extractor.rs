use serde::{Deserialize, Serialize};

/// Extracted text below this length is treated as no content at all.
const EXTRACTION_FLOOR: usize = 50;

/// Default minimum length for a confident extraction. Results between the
/// floor and this bound are usable but flagged as low confidence.
pub const MIN_CONTENT_LENGTH: usize = 100;

pub const SHORT_CONTENT_CONFIDENCE: f64 = 0.3;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: String,
    pub text: String,
    pub html: String,
    pub byline: Option<String>,
}

/// Pure readability collaborator: `html, url -> content | None`.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, url: &str) -> Option<ExtractedContent>;
}

/// Extraction outcome with a confidence estimate. A short-but-present result
/// is distinguished from a hard extraction failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub success: bool,
    pub confidence: f64,
    pub content: Option<ExtractedContent>,
}

impl ExtractionReport {
    pub fn assess(extracted: Option<ExtractedContent>, min_length: usize) -> Self {
        match extracted {
            None => Self {
                success: false,
                confidence: 0.0,
                content: None,
            },
            Some(content) if content.text.chars().count() < min_length => Self {
                success: false,
                confidence: SHORT_CONTENT_CONFIDENCE,
                content: Some(content),
            },
            Some(content) => {
                let len = content.text.chars().count() as f64;
                Self {
                    success: true,
                    confidence: (0.5 + len / 2000.0).min(1.0),
                    content: Some(content),
                }
            }
        }
    }
}

/// Tag-stripping extractor used when no external readability collaborator is
/// wired in. Good enough for prose-heavy pages; markup-only pages fall below
/// the extraction floor and return `None`.
#[derive(Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Byte-wise ASCII case-insensitive search; safe on any UTF-8 input.
    fn find_ci(haystack: &str, from: usize, needle: &str) -> Option<usize> {
        let hay = haystack.as_bytes();
        let pat = needle.as_bytes();
        if from >= hay.len() || pat.is_empty() {
            return None;
        }
        hay[from..]
            .windows(pat.len())
            .position(|w| w.eq_ignore_ascii_case(pat))
            .map(|i| from + i)
    }

    fn title_of(html: &str) -> String {
        let Some(start) = Self::find_ci(html, 0, "<title") else {
            return String::new();
        };
        let Some(open_end) = Self::find_ci(html, start, ">").map(|i| i + 1) else {
            return String::new();
        };
        let Some(end) = Self::find_ci(html, open_end, "</title>") else {
            return String::new();
        };
        html[open_end..end].trim().to_string()
    }

    fn visible_text(html: &str) -> String {
        let mut out = String::with_capacity(html.len() / 4);
        let mut skip_until: Option<usize> = None;
        let mut in_tag = false;

        for (idx, ch) in html.char_indices() {
            if let Some(end) = skip_until {
                if idx < end {
                    continue;
                }
                skip_until = None;
            }
            if ch == '<' {
                // Drop script and style bodies entirely.
                for (opener, closer) in [("<script", "</script>"), ("<style", "</style>")] {
                    if Self::find_ci(html, idx, opener) == Some(idx) {
                        skip_until =
                            Some(Self::find_ci(html, idx, closer).unwrap_or(html.len()));
                    }
                }
                in_tag = true;
                continue;
            }
            if ch == '>' {
                in_tag = false;
                if !out.ends_with(' ') && !out.is_empty() {
                    out.push(' ');
                }
                continue;
            }
            if !in_tag {
                out.push(ch);
            }
        }

        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl ContentExtractor for HeuristicExtractor {
    fn extract(&self, html: &str, _url: &str) -> Option<ExtractedContent> {
        let text = Self::visible_text(html);
        if text.chars().count() < EXTRACTION_FLOOR {
            return None;
        }
        Some(ExtractedContent {
            title: Self::title_of(html),
            text,
            html: html.to_string(),
            byline: None,
        })
    }
}
