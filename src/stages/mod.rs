pub mod stage0_mentions;
pub mod stage1_relations;
pub mod stage2_discourse;
pub mod stage3_clusters;
pub mod stage_mention_detection;

pub use stage0_mentions::*;
pub use stage1_relations::*;
pub use stage2_discourse::*;
pub use stage3_clusters::*;
pub use stage_mention_detection::*;

use tracing::{debug, info};

use crate::error::DocumentResult;
use crate::models::{Dictionaries, Document, HeadFinder, MentionId, MentionType, PennHeadFinder};

/// How predicted mentions are paired with gold mentions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TwinPolicy {
    /// Identical (start, end) spans only; lowest gold id wins on duplicate spans
    #[default]
    Strict,
    /// Exact spans first, then the earliest unclaimed gold mention with the same head
    Relaxed,
}

/// Configuration for document preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub twin_policy: TwinPolicy,
    /// A character gap larger than this between consecutive tokens starts a paragraph
    pub paragraph_gap: usize,
    /// Run rule-based mention detection when no predicted mentions are supplied
    pub detect_mentions: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            twin_policy: TwinPolicy::Strict,
            paragraph_gap: 2,
            detect_mentions: true,
        }
    }
}

/// A mention span as delivered by mention detection or gold data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSpan {
    pub start: usize,
    /// Exclusive
    pub end: usize,
    /// Head token; found from the parse when absent
    pub head: Option<usize>,
    pub mention_type: Option<MentionType>,
    pub gold_cluster_id: Option<usize>,
    /// Gold antecedent, as a gold mention id (document-order index over gold mentions)
    pub original_ref: Option<MentionId>,
}

impl MentionSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            ..Default::default()
        }
    }

    pub fn with_head(mut self, head: usize) -> Self {
        self.head = Some(head);
        self
    }

    pub fn with_type(mut self, mention_type: MentionType) -> Self {
        self.mention_type = Some(mention_type);
        self
    }

    pub fn with_gold_cluster(mut self, cluster: usize) -> Self {
        self.gold_cluster_id = Some(cluster);
        self
    }
}

/// Per-sentence mention spans handed to the preprocessor
#[derive(Debug, Clone, Default)]
pub struct RawMentions {
    pub predicted: Vec<Vec<MentionSpan>>,
    pub gold: Option<Vec<Vec<MentionSpan>>>,
}

/// Summary of a preprocessing run
#[derive(Debug, Clone, Default)]
pub struct PreprocessResult {
    pub predicted_mentions: usize,
    pub gold_mentions: usize,
    pub twins_found: usize,
    pub utterances: usize,
    pub paragraphs: usize,
    pub speakers: usize,
}

/// Populate `doc` from raw mention spans.
///
/// Any data-integrity fault aborts the whole document.
pub fn preprocess(
    doc: &mut Document,
    mut raw: RawMentions,
    dict: &Dictionaries,
    config: &PreprocessConfig,
) -> DocumentResult<PreprocessResult> {
    let finder = PennHeadFinder;
    preprocess_with_head_finder(doc, &mut raw, dict, config, &finder)
}

pub fn preprocess_with_head_finder(
    doc: &mut Document,
    raw: &mut RawMentions,
    dict: &Dictionaries,
    config: &PreprocessConfig,
    finder: &dyn HeadFinder,
) -> DocumentResult<PreprocessResult> {
    if config.detect_mentions && raw.predicted.iter().all(Vec::is_empty) {
        raw.predicted = detect_mentions(doc, finder)?;
        debug!(
            "Detected {} mentions",
            raw.predicted.iter().map(Vec::len).sum::<usize>()
        );
    }

    // 0. ids, twins, mention info, reordering
    let twins_found = initialize_mentions(doc, raw, dict, config.twin_policy, finder)?;
    reorder_mentions(doc);

    // 1. syntactic relations
    mark_syntactic_relations(doc);

    // 2. discourse
    set_paragraph_annotation(doc, config.paragraph_gap);
    process_discourse(doc, dict);

    // 3. clusters and numbering
    initialize_clusters(doc);
    if doc.gold_mentions.is_some() {
        extract_gold_clusters(doc)?;
        debug!(
            "Found {} of {} gold mentions",
            doc.gold_mentions_by_id.values().filter(|g| g.has_twin).count(),
            doc.gold_mentions_by_id.len()
        );
    }
    assign_mention_numbers(doc);

    let result = PreprocessResult {
        predicted_mentions: doc.predicted_mentions_by_id.len(),
        gold_mentions: doc.gold_mentions_by_id.len(),
        twins_found,
        utterances: doc.max_utter + 1,
        paragraphs: doc.num_paragraphs,
        speakers: doc.speaker_info_map.len(),
    };
    info!(
        "Preprocessed {}: {} mentions, {} utterances, {} speakers, {:?}",
        doc.doc_id, result.predicted_mentions, result.utterances, result.speakers, doc.doc_type
    );
    Ok(result)
}
