//! Content extraction and summarization support.
//!
//! Extraction is a pure collaborator: `html, url -> content | None`. A `None`
//! is a normal outcome for pages with too little readable text, distinct from
//! a merely-short result which is reported with nonzero confidence.

mod extractor;
mod summarizer;

pub use extractor::{
    ContentExtractor, ExtractedContent, ExtractionReport, HeuristicExtractor,
    MIN_CONTENT_LENGTH, SHORT_CONTENT_CONFIDENCE,
};
pub use summarizer::{PageSummarizer, Summary, SummarizerConfig};
