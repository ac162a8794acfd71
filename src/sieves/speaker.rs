use std::collections::BTreeMap;

use super::SieveInput;
use super::candidates::normalize_whitespace;
use super::discourse::alternates;
use super::patterns::vocatives;
use crate::models::{CharacterMentionKind, Gender, MentionType};

const BEFORE_WEIGHT: f64 = 1.0;
const AFTER_WEIGHT: f64 = 0.5;
const SAME_PARAGRAPH_BONUS: f64 = 1.0;
const FAMILY_BONUS: f64 = 2.0;

fn character_name(input: &SieveInput<'_>, text: &str) -> Option<String> {
    input.ctx.character_for(text).map(|c| c.name.clone())
}

/// A name is its character (or itself). A pronoun or animate noun follows the
/// predicted mention headed inside it to its reported speaker, then to proper
/// names in its coreference cluster.
pub fn deterministic(input: &SieveInput<'_>, quote: usize) -> Option<String> {
    let doc = input.doc;
    let quote = &doc.quotes[quote];
    let (begin, end) = quote.mention_span()?;
    let text = quote.mention_text()?;

    if quote.mention_kind()? == CharacterMentionKind::Name {
        return Some(character_name(input, text).unwrap_or_else(|| normalize_whitespace(text)));
    }

    let mention = (begin..end).find_map(|global| {
        let position = doc.locate_token(global)?;
        doc.mention_head_positions.get(&position).copied()
    })?;
    let speakers = doc
        .speaker_pairs
        .iter()
        .filter(|(m, _)| *m == mention)
        .filter_map(|(_, s)| doc.mention(*s));
    let proper_corefs = doc
        .cluster_of(mention)
        .and_then(|c| doc.coref_clusters.get(&c))
        .into_iter()
        .flat_map(|c| c.members.iter().copied())
        .filter(|&m| m != mention)
        .filter_map(|m| doc.mention(m))
        .filter(|m| m.mention_type == MentionType::Proper);

    speakers
        .chain(proper_corefs)
        .find_map(|m| character_name(input, &m.span_text))
}

/// Speaker of the quote two turns back (or ahead) when the turn in between was
/// someone else's.
pub fn loose_conversational(input: &SieveInput<'_>, quote: usize) -> Option<String> {
    let quotes = &input.doc.quotes;
    let candidate = |other: usize, between: usize| {
        let speaker = quotes[other].speaker()?;
        (quotes[between].speaker() != Some(speaker)).then(|| speaker.to_string())
    };
    if quote >= 2 && alternates(input, [quote - 2, quote - 1, quote], false) {
        if let Some(found) = candidate(quote - 2, quote - 1) {
            return Some(found);
        }
    }
    if quote + 2 < quotes.len() && alternates(input, [quote, quote + 1, quote + 2], false) {
        if let Some(found) = candidate(quote + 2, quote + 1) {
            return Some(found);
        }
    }
    None
}

/// Score the characters named around the quote and take the best.
///
/// Names before the quote weigh more than names after it and names in the quote's
/// paragraph get a bonus. Characters addressed inside the quote are excluded, as
/// are characters whose gender contradicts a pronoun mention of the quote. When
/// the quote's mention is a family word ("mother"), names introduced by that word
/// get a bonus. Ties go to the name nearest the quote.
pub fn top_speaker(input: &SieveInput<'_>, quote: usize) -> Option<String> {
    let doc = input.doc;
    let ctx = input.ctx;
    let quote = &doc.quotes[quote];
    let paragraph = ctx.quote_paragraph(quote);

    let addressed: Vec<String> = vocatives(input, quote)
        .into_iter()
        .filter_map(|m| character_name(input, &m.text))
        .collect();
    let mention_text = quote.mention_text().map(str::to_lowercase);
    let pronoun_gender = match quote.mention_kind() {
        Some(CharacterMentionKind::Pronoun) => mention_text
            .as_deref()
            .map_or(Gender::Unknown, |t| input.dict.gender_of(t)),
        _ => Gender::Unknown,
    };
    let family_word = mention_text.filter(|t| input.dict.is_family_word(t));

    // character -> (score, nearest distance)
    let mut scores: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for mention in ctx.narration_mentions() {
        if mention.kind != CharacterMentionKind::Name {
            continue;
        }
        let Some(distance) = mention.distance_to(quote) else {
            continue;
        };
        if distance > input.config.candidate_window {
            continue;
        }
        let Some(character) = ctx.character_for(&mention.text) else {
            continue;
        };
        if addressed.contains(&character.name) {
            continue;
        }
        if pronoun_gender != Gender::Unknown
            && character.gender != Gender::Unknown
            && character.gender != pronoun_gender
        {
            continue;
        }

        let mut score = if mention.precedes(quote) {
            BEFORE_WEIGHT
        } else {
            AFTER_WEIGHT
        };
        if paragraph.is_some() && ctx.paragraph(mention.token_begin) == paragraph {
            score += SAME_PARAGRAPH_BONUS;
        }
        if let Some(word) = &family_word {
            let introduced = mention
                .token_begin
                .checked_sub(1)
                .and_then(|t| doc.token(t))
                .is_some_and(|t| t.word.eq_ignore_ascii_case(word));
            if introduced {
                score += FAMILY_BONUS;
            }
        }

        let entry = scores
            .entry(character.name.clone())
            .or_insert((0.0, usize::MAX));
        entry.0 += score;
        entry.1 = entry.1.min(distance);
    }

    scores
        .into_iter()
        .max_by(|(_, (a, da)), (_, (b, db))| a.total_cmp(b).then(db.cmp(da)))
        .map(|(name, _)| name)
}

/// The character named most often in the document; the earliest-introduced one
/// wins a tie.
pub fn majority(input: &SieveInput<'_>, _quote: usize) -> Option<String> {
    let ctx = input.ctx;
    let frequencies = ctx.character_frequencies();
    let mut best: Option<(&str, usize)> = None;
    for character in &ctx.characters {
        let count = frequencies.get(character.name.as_str()).copied().unwrap_or(0);
        if count > 0 && best.is_none_or(|(_, top)| count > top) {
            best = Some((&character.name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
}
