use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::SieveInput;
use super::candidates::CharacterMention;
use crate::models::{CharacterMentionKind, MentionResolution, Quotation};

/// Named feature values for one (quote, candidate) pair
pub type FeatureVector = BTreeMap<&'static str, f64>;

/// Scores how likely a candidate mention is the speaker of a quote, in `[0, 1]`
pub trait QuoteScorer: Send + Sync {
    fn score(&self, features: &FeatureVector) -> f64;
}

/// Logistic regression over named features. Features without a weight count as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearScorer {
    pub bias: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl QuoteScorer for LinearScorer {
    fn score(&self, features: &FeatureVector) -> f64 {
        let z = features.iter().fold(self.bias, |acc, (name, value)| {
            acc + self.weights.get(*name).copied().unwrap_or(0.0) * value
        });
        1.0 / (1.0 + (-z).exp())
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

pub fn features(input: &SieveInput<'_>, quote: &Quotation, candidate: &CharacterMention) -> FeatureVector {
    let ctx = input.ctx;
    let window = input.config.candidate_window.max(1) as f64;
    let distance = candidate.distance_to(quote).unwrap_or(input.config.candidate_window);

    let report_verb_adjacent = [candidate.token_begin.checked_sub(1), Some(candidate.token_end)]
        .into_iter()
        .flatten()
        .filter(|&t| !ctx.in_quote(t))
        .filter_map(|t| input.doc.token(t))
        .any(|t| t.is_verb() && input.dict.is_report_verb(&t.lemma));

    let frequencies = ctx.character_frequencies();
    let total: usize = frequencies.values().sum();
    let frequency = ctx
        .character_for(&candidate.text)
        .filter(|_| candidate.kind == CharacterMentionKind::Name && total > 0)
        .and_then(|c| frequencies.get(c.name.as_str()))
        .map_or(0.0, |&n| n as f64 / total as f64);

    FeatureVector::from([
        ("distance", distance as f64 / window),
        ("before", flag(candidate.precedes(quote))),
        (
            "same_sentence",
            flag((quote.sentence_begin..=quote.sentence_end).contains(&candidate.sentence)),
        ),
        (
            "same_paragraph",
            flag(ctx.paragraph(candidate.token_begin) == ctx.quote_paragraph(quote)),
        ),
        ("name", flag(candidate.kind == CharacterMentionKind::Name)),
        ("pronoun", flag(candidate.kind == CharacterMentionKind::Pronoun)),
        ("animate", flag(candidate.kind == CharacterMentionKind::AnimateNoun)),
        ("report_verb_adjacent", flag(report_verb_adjacent)),
        ("quote_adjacent", flag(distance <= 2)),
        ("frequency", frequency),
    ])
}

/// Highest-scoring narration mention within the candidate window, if it clears
/// the configured threshold. Without a scorer nothing is resolved.
pub fn best_candidate(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let scorer = input.scorer?;
    let quote = &input.doc.quotes[quote];
    let threshold = input.config.supervised_threshold;

    let mut best: Option<(f64, &CharacterMention)> = None;
    for candidate in input.ctx.narration_mentions() {
        if candidate
            .distance_to(quote)
            .is_none_or(|d| d > input.config.candidate_window)
        {
            continue;
        }
        let score = scorer.score(&features(input, quote, candidate));
        trace!("Quote {} candidate {:?} scored {:.3}", quote.index, candidate.text, score);
        if score >= threshold && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, m)| m.resolution())
}
