use std::collections::BTreeSet;

use super::candidates::{CharacterMention, is_punctuation};
use super::SieveInput;
use crate::models::{CharacterMentionKind, MentionResolution, Quotation};
use crate::rules::{is_quote_glyph, is_speaker};

const VOCATIVE_OPENERS: &[&str] = &[",", "o", "oh"];
const VOCATIVE_CLOSERS: &[&str] = &[",", ".", "!", "?", ";"];

fn is_report_verb(input: &SieveInput<'_>, global: usize) -> bool {
    input
        .doc
        .token(global)
        .is_some_and(|t| t.is_verb() && input.dict.is_report_verb(&t.lemma))
}

fn narration_mention<'a>(
    input: &SieveInput<'a>,
    found: Option<&'a CharacterMention>,
) -> Option<&'a CharacterMention> {
    found.filter(|m| !input.ctx.in_quote(m.token_begin))
}

/// Mention starting at `global`, or right after a determiner there
fn mention_from<'a>(input: &SieveInput<'a>, global: usize) -> Option<&'a CharacterMention> {
    let ctx = input.ctx;
    narration_mention(input, ctx.mention_starting_at(global)).or_else(|| {
        let determiner = input.doc.token(global).is_some_and(|t| t.pos == "DT");
        if determiner {
            narration_mention(input, ctx.mention_starting_at(global + 1))
        } else {
            None
        }
    })
}

/// A first-person pronoun inside the quote whose speaker mention is already known.
///
/// Known means a speaker pair recorded by the preprocessor, or a narration
/// mention of the same sentence that reports the pronoun.
pub fn self_reference(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let doc = input.doc;
    let quote = &doc.quotes[quote];
    input
        .ctx
        .mentions_within(quote)
        .filter(|m| {
            m.kind == CharacterMentionKind::Pronoun && input.dict.is_first_person_singular(&m.text)
        })
        .find(|m| has_known_speaker(input, m))
        .map(CharacterMention::resolution)
}

fn has_known_speaker(input: &SieveInput<'_>, pronoun: &CharacterMention) -> bool {
    let doc = input.doc;
    let Some(position) = doc.locate_token(pronoun.token_begin) else {
        return false;
    };
    let Some(&id) = doc.mention_head_positions.get(&position) else {
        return false;
    };
    if doc.speaker_pairs.iter().any(|(m, _)| *m == id) {
        return true;
    }
    let Some(ant) = doc.mention(id) else {
        return false;
    };
    doc.predicted_mentions
        .get(ant.sent_num)
        .into_iter()
        .flatten()
        .filter_map(|&other| doc.mention(other))
        .any(|m| m.mention_id != id && is_speaker(doc, m, ant, input.dict))
}

/// `"..." Joe said`, `"..." said Joe`, `Joe said, "..."` and `said Joe, "..."`
pub fn trigram(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let doc = input.doc;
    let quote = &doc.quotes[quote];

    let mut after = quote.token_end;
    while doc.token(after).is_some_and(|t| t.pos == ",") {
        after += 1;
    }
    if let Some(m) = mention_from(input, after) {
        if is_report_verb(input, m.token_end) {
            return Some(m.resolution());
        }
    }
    if is_report_verb(input, after) {
        if let Some(m) = mention_from(input, after + 1) {
            return Some(m.resolution());
        }
    }

    let mut before = quote.token_begin;
    while before > 0 && doc.token(before - 1).is_some_and(is_punctuation) {
        before -= 1;
    }
    if before == 0 {
        return None;
    }
    let last = before - 1;
    if let Some(m) = narration_mention(input, input.ctx.mention_ending_at(before)) {
        if m.token_begin > 0 && is_report_verb(input, m.token_begin - 1) {
            return Some(m.resolution());
        }
    }
    if is_report_verb(input, last) {
        if let Some(m) = narration_mention(input, input.ctx.mention_ending_at(last)) {
            return Some(m.resolution());
        }
    }
    None
}

fn quote_sentences(quote: &Quotation) -> BTreeSet<usize> {
    [quote.sentence_begin, quote.sentence_end].into_iter().collect()
}

/// Nominal subject of a reporting verb outside the quote, in the sentences it touches
pub fn dependency(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let doc = input.doc;
    let ctx = input.ctx;
    let quote = &doc.quotes[quote];
    for sent_num in quote_sentences(quote) {
        let Some(sentence) = doc.sentences.get(sent_num) else {
            continue;
        };
        let Some(graph) = sentence.dependencies() else {
            continue;
        };
        for (i, token) in sentence.tokens.iter().enumerate() {
            let global = sentence.token_offset + i;
            if ctx.in_quote(global) || !token.is_verb() || !input.dict.is_report_verb(&token.lemma) {
                continue;
            }
            let Some(subject) = graph.child_with_relation(i, "nsubj") else {
                continue;
            };
            let subject = sentence.token_offset + subject;
            if let Some(m) = narration_mention(input, ctx.mention_covering(subject)) {
                return Some(m.resolution());
            }
        }
    }
    None
}

/// The only character named in narration of the quote's sentences
pub fn one_name(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let ctx = input.ctx;
    let quote = &input.doc.quotes[quote];
    let names: Vec<&CharacterMention> = ctx
        .narration_mentions()
        .filter(|m| m.kind == CharacterMentionKind::Name)
        .filter(|m| (quote.sentence_begin..=quote.sentence_end).contains(&m.sentence))
        .collect();

    let characters: BTreeSet<String> = names
        .iter()
        .map(|m| {
            ctx.character_for(&m.text)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| m.text.clone())
        })
        .collect();
    if characters.len() != 1 {
        return None;
    }
    names
        .into_iter()
        .min_by_key(|m| m.distance_to(quote).unwrap_or(0))
        .map(CharacterMention::resolution)
}

/// Names addressed inside a quote: `"Joe, come here"`, `"Come here, Joe!"`
pub fn vocatives<'a>(input: &SieveInput<'a>, quote: &Quotation) -> Vec<&'a CharacterMention> {
    let doc = input.doc;
    let word = |global: Option<usize>| {
        global
            .and_then(|g| doc.token(g))
            .map(|t| t.word.to_lowercase())
            .unwrap_or_default()
    };
    input
        .ctx
        .mentions_within(quote)
        .filter(|m| m.kind == CharacterMentionKind::Name)
        .filter(|m| {
            let prev = word(m.token_begin.checked_sub(1));
            let next = word(Some(m.token_end));
            let opens = VOCATIVE_OPENERS.contains(&prev.as_str()) || is_quote_glyph(&prev);
            let closes = VOCATIVE_CLOSERS.contains(&next.as_str()) || is_quote_glyph(&next);
            opens && closes
        })
        .collect()
}

/// Someone addressed by name in the previous quote answers in this one; someone
/// addressed in the next quote spoke this one.
pub fn vocative(input: &SieveInput<'_>, quote: usize) -> Option<MentionResolution> {
    let doc = input.doc;
    let ctx = input.ctx;
    let current = &doc.quotes[quote];
    let paragraph = ctx.quote_paragraph(current);

    if let Some(previous) = quote.checked_sub(1).map(|p| &doc.quotes[p]) {
        if ctx.quote_paragraph(previous) != paragraph {
            if let Some(m) = vocatives(input, previous).first() {
                return Some(m.resolution());
            }
        }
    }
    if let Some(next) = doc.quotes.get(quote + 1) {
        if ctx.quote_paragraph(next) != paragraph {
            if let Some(m) = vocatives(input, next).last() {
                return Some(m.resolution());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dictionaries, Document, Sentence};
    use crate::sieves::{
        AttributionConfig, AttributionContext, detect_quotes, entity_mentions_from_ner,
    };
    use crate::test_support::{joe_said_happy_document, token};

    fn prepared(mut doc: Document) -> (Document, AttributionContext) {
        doc.entity_mentions = entity_mentions_from_ner(&doc);
        doc.quotes = detect_quotes(&doc);
        let ctx = AttributionContext::build(&doc, &Dictionaries::default());
        (doc, ctx)
    }

    fn with_input<T>(doc: &Document, ctx: &AttributionContext, f: impl FnOnce(&SieveInput<'_>) -> T) -> T {
        let dict = Dictionaries::default();
        let config = AttributionConfig::default();
        let input = SieveInput {
            doc,
            dict: &dict,
            ctx,
            config: &config,
            scorer: None,
        };
        f(&input)
    }

    /// `" Go home , " Ann told Joe .`
    fn ann_told_joe() -> Document {
        let words = [
            token("\"", "``", "\"", "O"),
            token("Go", "VB", "go", "O"),
            token("home", "NN", "home", "O"),
            token(",", ",", ",", "O"),
            token("\"", "''", "\"", "O"),
            token("Ann", "NNP", "ann", "PERSON"),
            token("told", "VBD", "tell", "O"),
            token("Joe", "NNP", "joe", "PERSON"),
            token(".", ".", ".", "O"),
        ];
        Document::new("ann", vec![Sentence::new(words.to_vec())])
    }

    #[test]
    fn test_trigram_mention_before_quote() {
        let (doc, ctx) = prepared(joe_said_happy_document());
        let found = with_input(&doc, &ctx, |input| trigram(input, 0)).unwrap();
        assert_eq!(found.text, "Joe");
        assert_eq!((found.token_begin, found.token_end), (0, 1));
        assert_eq!(found.kind, CharacterMentionKind::Name);
    }

    #[test]
    fn test_trigram_mention_after_quote() {
        let (doc, ctx) = prepared(ann_told_joe());
        let found = with_input(&doc, &ctx, |input| trigram(input, 0)).unwrap();
        assert_eq!(found.text, "Ann");
    }

    #[test]
    fn test_trigram_verb_then_pronoun() {
        // " Stop , " said he .
        let words = [
            token("\"", "``", "\"", "O"),
            token("Stop", "VB", "stop", "O"),
            token(",", ",", ",", "O"),
            token("\"", "''", "\"", "O"),
            token("said", "VBD", "say", "O"),
            token("he", "PRP", "he", "O"),
            token(".", ".", ".", "O"),
        ];
        let (doc, ctx) = prepared(Document::new("he", vec![Sentence::new(words.to_vec())]));
        let found = with_input(&doc, &ctx, |input| trigram(input, 0)).unwrap();
        assert_eq!(found.text, "he");
        assert_eq!(found.kind, CharacterMentionKind::Pronoun);
    }

    #[test]
    fn test_dependency_subject_of_report_verb() {
        let (doc, ctx) = prepared(joe_said_happy_document());
        let found = with_input(&doc, &ctx, |input| dependency(input, 0)).unwrap();
        assert_eq!(found.text, "Joe");
    }

    #[test]
    fn test_one_name_needs_a_single_character() {
        let (doc, ctx) = prepared(joe_said_happy_document());
        assert!(with_input(&doc, &ctx, |input| one_name(input, 0)).is_some());

        let (doc, ctx) = prepared(ann_told_joe());
        assert!(with_input(&doc, &ctx, |input| one_name(input, 0)).is_none());
    }

    #[test]
    fn test_vocative_in_previous_quote() {
        // " Joe , come here . "  \n\n  " Coming . "
        let mut first = vec![
            token("\"", "``", "\"", "O"),
            token("Joe", "NNP", "joe", "PERSON"),
            token(",", ",", ",", "O"),
            token("come", "VB", "come", "O"),
            token("here", "RB", "here", "O"),
            token(".", ".", ".", "O"),
            token("\"", "''", "\"", "O"),
        ];
        let mut second = vec![
            token("\"", "``", "\"", "O"),
            token("Coming", "VBG", "come", "O"),
            token(".", ".", ".", "O"),
            token("\"", "''", "\"", "O"),
        ];
        for (i, t) in first.iter_mut().chain(second.iter_mut()).enumerate() {
            let base = if i < 7 { i * 2 } else { 100 + i * 2 };
            t.begin_char = Some(base);
            t.end_char = Some(base + 1);
        }
        let mut doc = Document::new("voc", vec![Sentence::new(first), Sentence::new(second)]);
        crate::stages::set_paragraph_annotation(&mut doc, 2);
        let (doc, ctx) = prepared(doc);

        assert_eq!(doc.quotes.len(), 2);
        let found = with_input(&doc, &ctx, |input| vocative(input, 1)).unwrap();
        assert_eq!(found.text, "Joe");
        assert_eq!(found.token_begin, 1);
        // the first quote has no earlier quote and nobody is addressed in the second
        assert!(with_input(&doc, &ctx, |input| vocative(input, 0)).is_none());
    }
}
