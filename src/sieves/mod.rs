pub mod candidates;
pub mod discourse;
pub mod patterns;
pub mod speaker;
pub mod supervised;

pub use candidates::*;
pub use supervised::{FeatureVector, LinearScorer, QuoteScorer};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{DocumentError, DocumentResult};
use crate::models::{Dictionaries, Document, MentionResolution};

/// Quote-to-mention sieves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMentionSieve {
    /// First-person pronoun inside the quote whose speaker is known
    SelfReference,
    /// Mention and reporting verb right next to the quote
    Trigram,
    /// Subject of a reporting verb in the quote's sentences
    Dependency,
    /// The only character name in the quote's sentences
    OneName,
    /// The character addressed in a neighbouring quote
    Vocative,
    /// Closest mention before a quote that ends its paragraph
    ParagraphEnd,
    /// Best candidate under a trained scorer
    Supervised,
    /// Speaker of the quote two turns back in a strict alternation
    Conversational,
    /// Speaker of the quote two turns back across any paragraphs
    LooseConversational,
    /// Nearest narration mention
    Closest,
}

impl QuoteMentionSieve {
    pub const ALL: [QuoteMentionSieve; 10] = [
        Self::SelfReference,
        Self::Trigram,
        Self::Dependency,
        Self::OneName,
        Self::Vocative,
        Self::ParagraphEnd,
        Self::Supervised,
        Self::Conversational,
        Self::LooseConversational,
        Self::Closest,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SelfReference => "self",
            Self::Trigram => "tri",
            Self::Dependency => "dep",
            Self::OneName => "onename",
            Self::Vocative => "voc",
            Self::ParagraphEnd => "paraend",
            Self::Supervised => "sup",
            Self::Conversational => "conv",
            Self::LooseConversational => "loose",
            Self::Closest => "closest",
        }
    }

    pub fn resolve(&self, input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
        match self {
            Self::SelfReference => patterns::self_reference(input, quote),
            Self::Trigram => patterns::trigram(input, quote),
            Self::Dependency => patterns::dependency(input, quote),
            Self::OneName => patterns::one_name(input, quote),
            Self::Vocative => patterns::vocative(input, quote),
            Self::ParagraphEnd => discourse::paragraph_end(input, quote),
            Self::Supervised => supervised::best_candidate(input, quote),
            Self::Conversational => discourse::conversational(input, quote, true),
            Self::LooseConversational => discourse::conversational(input, quote, false),
            Self::Closest => discourse::closest(input, quote),
        }
    }
}

impl FromStr for QuoteMentionSieve {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|sieve| sieve.key() == key)
            .ok_or_else(|| DocumentError::UnknownSieve {
                name: key.to_string(),
            })
    }
}

impl fmt::Display for QuoteMentionSieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Mention-to-speaker sieves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionSpeakerSieve {
    /// Names map to characters, pronouns through speaker pairs and clusters
    Deterministic,
    /// Speaker of the quote two turns back
    LooseConversational,
    /// Highest-scoring nearby character
    TopSpeaker,
    /// Most frequently named character
    Majority,
}

impl MentionSpeakerSieve {
    pub const ALL: [MentionSpeakerSieve; 4] = [
        Self::Deterministic,
        Self::LooseConversational,
        Self::TopSpeaker,
        Self::Majority,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Deterministic => "det",
            Self::LooseConversational => "loose",
            Self::TopSpeaker => "top",
            Self::Majority => "maj",
        }
    }

    pub fn resolve(&self, input: &SieveInput<'_>, quote: usize) -> Option<String> {
        match self {
            Self::Deterministic => speaker::deterministic(input, quote),
            Self::LooseConversational => speaker::loose_conversational(input, quote),
            Self::TopSpeaker => speaker::top_speaker(input, quote),
            Self::Majority => speaker::majority(input, quote),
        }
    }
}

impl FromStr for MentionSpeakerSieve {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        Self::ALL
            .into_iter()
            .find(|sieve| sieve.key() == key)
            .ok_or_else(|| DocumentError::UnknownSieve {
                name: key.to_string(),
            })
    }
}

impl fmt::Display for MentionSpeakerSieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub const DEFAULT_QM_SIEVES: &str = "self,tri,dep,onename,voc,paraend,sup,conv,loose";
pub const DEFAULT_MS_SIEVES: &str = "det,loose,top,maj";

/// Configuration for quote attribution
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionConfig {
    pub qm_sieves: Vec<QuoteMentionSieve>,
    pub ms_sieves: Vec<MentionSpeakerSieve>,
    /// Minimum scorer confidence for the supervised sieve
    pub supervised_threshold: f64,
    /// How many tokens around a quote candidates are drawn from
    pub candidate_window: usize,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            qm_sieves: vec![
                QuoteMentionSieve::SelfReference,
                QuoteMentionSieve::Trigram,
                QuoteMentionSieve::Dependency,
                QuoteMentionSieve::OneName,
                QuoteMentionSieve::Vocative,
                QuoteMentionSieve::ParagraphEnd,
                QuoteMentionSieve::Supervised,
                QuoteMentionSieve::Conversational,
                QuoteMentionSieve::LooseConversational,
            ],
            ms_sieves: MentionSpeakerSieve::ALL.to_vec(),
            supervised_threshold: 0.5,
            candidate_window: 60,
        }
    }
}

impl AttributionConfig {
    /// Build from comma-separated sieve keys, e.g. `"tri,dep,conv"` and `"det,maj"`
    pub fn from_lists(qm: &str, ms: &str) -> DocumentResult<Self> {
        Ok(Self {
            qm_sieves: parse_list(qm)?,
            ms_sieves: parse_list(ms)?,
            ..Default::default()
        })
    }
}

fn parse_list<T: FromStr<Err = DocumentError>>(list: &str) -> DocumentResult<Vec<T>> {
    list.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::parse)
        .collect()
}

/// Everything a sieve may read while resolving one quote
pub struct SieveInput<'a> {
    pub doc: &'a Document,
    pub dict: &'a Dictionaries,
    pub ctx: &'a AttributionContext,
    pub config: &'a AttributionConfig,
    pub scorer: Option<&'a dyn QuoteScorer>,
}

/// Summary of an attribution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributionResult {
    pub quotes: usize,
    pub with_mention: usize,
    pub with_speaker: usize,
    pub with_canonical: usize,
    /// Quotes resolved per quote-to-mention sieve key
    pub mention_sieves: BTreeMap<String, usize>,
    /// Quotes resolved per mention-to-speaker sieve key
    pub speaker_sieves: BTreeMap<String, usize>,
}

/// Attribute every quotation of a preprocessed document.
///
/// Quotations are detected from glyph tokens when none were supplied, and entity
/// mentions are derived from NER tags when none were supplied. A quote left
/// unresolved by every sieve simply carries no attribution.
pub fn attribute_quotes(
    doc: &mut Document,
    dict: &Dictionaries,
    config: &AttributionConfig,
    scorer: Option<&dyn QuoteScorer>,
) -> AttributionResult {
    if doc.quotes.is_empty() {
        doc.quotes = detect_quotes(doc);
        debug!("Detected {} quotations", doc.quotes.len());
    }
    if doc.entity_mentions.is_empty() {
        doc.entity_mentions = entity_mentions_from_ner(doc);
        debug!("Derived {} entity mentions from NER tags", doc.entity_mentions.len());
    }
    index_entity_mentions(doc);

    let ctx = AttributionContext::build(doc, dict);
    let mut result = AttributionResult {
        quotes: doc.quotes.len(),
        ..Default::default()
    };

    for sieve in &config.qm_sieves {
        if *sieve == QuoteMentionSieve::Supervised && scorer.is_none() {
            debug!("No scorer loaded, skipping supervised sieve");
            continue;
        }
        let mut resolved = 0;
        for q in 0..doc.quotes.len() {
            if doc.quotes[q].has_mention() {
                continue;
            }
            let input = SieveInput {
                doc,
                dict,
                ctx: &ctx,
                config,
                scorer,
            };
            if let Some(resolution) = sieve.resolve(&input, q) {
                debug!("Quote {} -> {:?} by {}", q, resolution.text, sieve);
                doc.quotes[q].set_mention(resolution, sieve.key());
                resolved += 1;
            }
        }
        result.mention_sieves.insert(sieve.key().to_string(), resolved);
    }

    for sieve in &config.ms_sieves {
        let mut resolved = 0;
        for q in 0..doc.quotes.len() {
            if doc.quotes[q].has_speaker() {
                continue;
            }
            let input = SieveInput {
                doc,
                dict,
                ctx: &ctx,
                config,
                scorer,
            };
            if let Some(speaker) = sieve.resolve(&input, q) {
                debug!("Quote {} spoken by {:?} per {}", q, speaker, sieve);
                doc.quotes[q].set_speaker(speaker, sieve.key());
                resolved += 1;
            }
        }
        result.speaker_sieves.insert(sieve.key().to_string(), resolved);
    }

    result.with_canonical = canonicalize(doc);
    result.with_mention = doc.quotes.iter().filter(|q| q.has_mention()).count();
    result.with_speaker = doc.quotes.iter().filter(|q| q.has_speaker()).count();
    info!(
        "Attributed {}: {} quotes, {} with mention, {} with speaker, {} canonical",
        doc.doc_id, result.quotes, result.with_mention, result.with_speaker, result.with_canonical
    );
    result
}

/// Copy canonical entity mentions onto quotes with a direct mention.
///
/// The entity mention is read from the mention's first token. A mention that is
/// not an entity mention itself (a pronoun, say) is followed through its
/// coreference cluster and then through the speaker pairs. Returns the number of
/// quotes that received a canonical mention.
pub fn canonicalize(doc: &mut Document) -> usize {
    let mut updates = Vec::new();
    for (q, quote) in doc.quotes.iter().enumerate() {
        let Some((begin, end)) = quote.mention_span() else {
            continue;
        };
        let Some(entity) = entity_for_span(doc, begin, end) else {
            debug!("Quote {} mention has no entity mention", q);
            continue;
        };
        let canonical_index = doc.entity_mentions[entity].canonical.unwrap_or(entity);
        let Some(canonical) = doc.entity_mentions.get(canonical_index) else {
            continue;
        };
        updates.push((
            q,
            canonical.text.clone(),
            canonical.token_begin,
            canonical.token_end,
        ));
    }
    let count = updates.len();
    for (q, text, begin, end) in updates {
        doc.quotes[q].set_canonical(text, begin, end);
    }
    count
}

fn entity_for_span(doc: &Document, begin: usize, end: usize) -> Option<usize> {
    if let Some(entity) = entity_mention_at(doc, begin) {
        return Some(entity);
    }
    let mention = (begin..end).find_map(|global| {
        let position = doc.locate_token(global)?;
        doc.mention_head_positions.get(&position).copied()
    })?;

    let cluster_members = doc
        .cluster_of(mention)
        .and_then(|c| doc.coref_clusters.get(&c))
        .map(|c| c.members.iter().copied().collect::<Vec<_>>())
        .unwrap_or_default();
    let speakers = doc
        .speaker_pairs
        .iter()
        .filter(|(m, _)| *m == mention)
        .map(|(_, s)| *s);

    cluster_members
        .into_iter()
        .filter(|&m| m != mention)
        .chain(speakers)
        .find_map(|linked| {
            let m = doc.mention(linked)?;
            entity_mention_at(doc, doc.global_index(m.sent_num, m.head_index))
        })
}
