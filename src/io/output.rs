use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{DocType, Document};
use crate::sieves::AttributionResult;

/// Machine-readable attribution output for one document
#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    pub doc_id: String,
    pub doc_type: DocType,
    /// One entry per quotation, in document order
    pub quotes: Vec<QuoteEntry>,
    /// Speaker per utterance index
    pub utterance_speakers: Vec<UtteranceSpeaker>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteEntry {
    pub index: usize,
    pub text: String,
    pub token_begin: usize,
    pub token_end: usize,
    pub begin_char: Option<usize>,
    pub end_char: Option<usize>,
    pub mention: Option<ReportSpan>,
    pub mention_type: Option<String>,
    pub mention_sieve: Option<String>,
    pub speaker: Option<String>,
    pub speaker_sieve: Option<String>,
    pub canonical: Option<ReportSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSpan {
    pub text: String,
    pub token_begin: usize,
    pub token_end: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceSpeaker {
    pub utterance: usize,
    pub speaker: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_tokens: usize,
    pub total_sentences: usize,
    pub total_mentions: usize,
    pub total_clusters: usize,
    pub num_paragraphs: usize,
    pub quotes: usize,
    pub quotes_with_mention: usize,
    pub quotes_with_speaker: usize,
    pub quotes_with_canonical: usize,
    /// Quotes resolved per sieve key
    pub mention_sieves: std::collections::BTreeMap<String, usize>,
    pub speaker_sieves: std::collections::BTreeMap<String, usize>,
}

impl AttributionReport {
    pub fn from_document(doc: &Document, result: &AttributionResult) -> Self {
        let quotes = doc
            .quotes
            .iter()
            .map(|q| QuoteEntry {
                index: q.index,
                text: q.text.clone(),
                token_begin: q.token_begin,
                token_end: q.token_end,
                begin_char: q.begin_char,
                end_char: q.end_char,
                mention: q.mention_span().zip(q.mention_text()).map(|((b, e), text)| ReportSpan {
                    text: text.to_string(),
                    token_begin: b,
                    token_end: e,
                }),
                mention_type: q.mention_kind().map(|k| k.as_str().to_string()),
                mention_sieve: q.mention_sieve().map(str::to_string),
                speaker: q.speaker().map(str::to_string),
                speaker_sieve: q.speaker_sieve().map(str::to_string),
                canonical: q
                    .canonical_span()
                    .zip(q.canonical_mention())
                    .map(|((b, e), text)| ReportSpan {
                        text: text.to_string(),
                        token_begin: b,
                        token_end: e,
                    }),
            })
            .collect();

        let utterance_speakers = doc
            .speakers
            .iter()
            .map(|(&utterance, speaker)| UtteranceSpeaker {
                utterance,
                speaker: speaker_label(doc, speaker),
            })
            .collect();

        let metadata = ReportMetadata {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            total_tokens: doc.token_count(),
            total_sentences: doc.sentences.len(),
            total_mentions: doc.predicted_mentions_by_id.len(),
            total_clusters: doc
                .coref_clusters
                .values()
                .filter(|c| !c.is_retired())
                .count(),
            num_paragraphs: doc.num_paragraphs,
            quotes: result.quotes,
            quotes_with_mention: result.with_mention,
            quotes_with_speaker: result.with_speaker,
            quotes_with_canonical: result.with_canonical,
            mention_sieves: result.mention_sieves.clone(),
            speaker_sieves: result.speaker_sieves.clone(),
        };

        Self {
            doc_id: doc.doc_id.clone(),
            doc_type: doc.doc_type,
            quotes,
            utterance_speakers,
            metadata,
        }
    }

    /// Write to a JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        serde_json::to_writer_pretty(file, self).context("Failed to write JSON")?;
        Ok(())
    }
}

/// A decimal speaker id is shown with the mention it points at
fn speaker_label(doc: &Document, speaker: &str) -> String {
    speaker
        .parse::<usize>()
        .ok()
        .and_then(|id| doc.mention(id))
        .map(|m| format!("{} ({})", speaker, m.span_text))
        .unwrap_or_else(|| speaker.to_string())
}

/// Human-readable attribution format
pub struct HumanReport<'a> {
    doc: &'a Document,
}

impl<'a> HumanReport<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    /// One block per quotation: speaker header, then the wrapped quote text
    pub fn format(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("# {} ({:?})\n\n", self.doc.doc_id, self.doc.doc_type));

        for quote in &self.doc.quotes {
            let speaker = quote.speaker().unwrap_or("UNKNOWN");
            output.push_str(&format!("[{}] {}", quote.index, speaker));
            match (quote.mention_text(), quote.mention_sieve()) {
                (Some(mention), Some(sieve)) => {
                    output.push_str(&format!(" via \"{}\" ({})", mention, sieve));
                }
                (Some(mention), None) => output.push_str(&format!(" via \"{}\"", mention)),
                _ => {}
            }
            if let Some(canonical) = quote.canonical_mention() {
                output.push_str(&format!(" = {}", canonical));
            }
            output.push_str(":\n");
            output.push_str(&wrap_text(&quote.text, 80));
            output.push_str("\n\n");
        }

        output
    }

    /// Write to a text file
    pub fn write_file(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create file: {:?}", path))?;
        write!(file, "{}", self.format())?;
        Ok(())
    }
}

/// Wrap text at approximately the given width
fn wrap_text(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        if line_len + word.len() + 1 > width && line_len > 0 {
            result.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            result.push(' ');
            line_len += 1;
        }
        result.push_str(word);
        line_len += word.len();
    }

    result
}
