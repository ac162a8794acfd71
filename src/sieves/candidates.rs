use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::models::{
    CharacterMentionKind, Dictionaries, Document, EntityMention, EntityMentionIndexAnnotation,
    Gender, MentionResolution, Quotation, Token,
};
use crate::rules::{is_closing_quote, is_neutral_quote, is_opening_quote, is_quote_glyph};

/// A person that can speak a quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    /// Whitespace-normalized name
    pub name: String,
    pub gender: Gender,
}

/// A span that may name, or stand in for, a character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMention {
    pub text: String,
    /// Document-wide token range, half-open
    pub token_begin: usize,
    pub token_end: usize,
    pub sentence: usize,
    pub kind: CharacterMentionKind,
    pub gender: Gender,
}

impl CharacterMention {
    pub fn resolution(&self) -> MentionResolution {
        MentionResolution {
            text: self.text.clone(),
            token_begin: self.token_begin,
            token_end: self.token_end,
            kind: self.kind,
        }
    }

    /// Tokens between the mention and the quote; `None` when it sits inside it
    pub fn distance_to(&self, quote: &Quotation) -> Option<usize> {
        if self.token_end <= quote.token_begin {
            Some(quote.token_begin - self.token_end)
        } else if self.token_begin >= quote.token_end {
            Some(self.token_begin - quote.token_end)
        } else {
            None
        }
    }

    pub fn precedes(&self, quote: &Quotation) -> bool {
        self.token_end <= quote.token_begin
    }
}

pub fn is_punctuation(token: &Token) -> bool {
    is_quote_glyph(&token.word) || token.word.chars().all(|c| c.is_ascii_punctuation())
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pair quotation glyph tokens into quotations. An unclosed quotation is dropped.
pub fn detect_quotes(doc: &Document) -> Vec<Quotation> {
    let mut quotes = Vec::new();
    let mut open: Option<usize> = None;
    for (global, token) in doc.tokens().enumerate() {
        let word = token.word.as_str();
        match open {
            None if is_opening_quote(word) || is_neutral_quote(word) => open = Some(global),
            Some(begin) if is_closing_quote(word) || is_neutral_quote(word) => {
                quotes.push(quotation_from_tokens(doc, quotes.len(), begin, global + 1));
                open = None;
            }
            _ => {}
        }
    }
    if let Some(begin) = open {
        debug!("Dropping unclosed quotation starting at token {}", begin);
    }
    quotes
}

/// A quotation over a non-empty document-wide token range
pub fn quotation_from_tokens(
    doc: &Document,
    index: usize,
    token_begin: usize,
    token_end: usize,
) -> Quotation {
    let first = doc.locate_token(token_begin).unwrap_or((0, 0));
    let last = doc.locate_token(token_end - 1).unwrap_or(first);
    Quotation {
        index,
        text: doc.text_between(token_begin, token_end),
        begin_char: doc.token(token_begin).and_then(|t| t.begin_char),
        end_char: doc.token(token_end - 1).and_then(|t| t.end_char),
        token_begin,
        token_end,
        sentence_begin: first.0,
        sentence_end: last.0,
        ..Default::default()
    }
}

/// Entity mentions from runs of identical NER tags within a sentence.
///
/// A PERSON mention's canonical mention is the longest PERSON mention containing all
/// of its words ("Smith" resolves to "Joe Smith").
pub fn entity_mentions_from_ner(doc: &Document) -> Vec<EntityMention> {
    let mut mentions = Vec::new();
    for (sent_num, sentence) in doc.sentences.iter().enumerate() {
        let tokens = &sentence.tokens;
        let mut i = 0;
        while i < tokens.len() {
            let ner = tokens[i].ner.as_str();
            let mut end = i + 1;
            while end < tokens.len() && tokens[end].ner == ner {
                end += 1;
            }
            if !ner.is_empty() && ner != "O" {
                mentions.push(EntityMention {
                    text: sentence.span_text(i, end),
                    sentence: sent_num,
                    token_begin: sentence.token_offset + i,
                    token_end: sentence.token_offset + end,
                    entity_type: ner.to_string(),
                    canonical: None,
                });
            }
            i = end;
        }
    }
    link_canonical_mentions(&mut mentions);
    mentions
}

fn link_canonical_mentions(mentions: &mut [EntityMention]) {
    let words: Vec<Vec<String>> = mentions
        .iter()
        .map(|m| m.text.split_whitespace().map(str::to_lowercase).collect())
        .collect();
    for i in 0..mentions.len() {
        let mut best = i;
        for j in 0..mentions.len() {
            if mentions[j].entity_type != mentions[i].entity_type {
                continue;
            }
            let contains = words[i].iter().all(|w| words[j].contains(w));
            if contains && words[j].len() > words[best].len() {
                best = j;
            }
        }
        mentions[i].canonical = Some(best);
    }
}

/// Point every token of an entity mention back at it. A token claimed by two
/// entity mentions keeps the later one.
pub fn index_entity_mentions(doc: &mut Document) {
    let spans: Vec<(usize, usize, usize)> = doc
        .entity_mentions
        .iter()
        .enumerate()
        .map(|(i, m)| (i, m.token_begin, m.token_end))
        .collect();
    for (index, begin, end) in spans {
        for global in begin..end {
            let Some((sent, idx)) = doc.locate_token(global) else {
                continue;
            };
            let token = &mut doc.sentences[sent].tokens[idx];
            let previous = token.annotations.set::<EntityMentionIndexAnnotation>(index);
            if let Some(previous) = previous.filter(|p| *p != index) {
                warn!(
                    "Token {} ({}) moves from entity mention {} to {}",
                    global, token.word, previous, index
                );
            }
        }
    }
}

pub fn entity_mention_at(doc: &Document, token: usize) -> Option<usize> {
    doc.token(token)?
        .annotations
        .get::<EntityMentionIndexAnnotation>()
        .copied()
}

/// Everything the sieves share for one document
#[derive(Debug, Clone, Default)]
pub struct AttributionContext {
    pub characters: Vec<Character>,
    /// Character mentions in document order
    pub mentions: Vec<CharacterMention>,
    /// Quote index per document-wide token
    pub quote_of_token: Vec<Option<usize>>,
    /// Paragraph per document-wide token; sentences stand in when offsets are missing
    pub token_paragraphs: Vec<usize>,
}

impl AttributionContext {
    pub fn build(doc: &Document, dict: &Dictionaries) -> Self {
        let characters = characters_from_entities(&doc.entity_mentions, dict);

        let mut quote_of_token = vec![None; doc.token_count()];
        for (q, quote) in doc.quotes.iter().enumerate() {
            for slot in quote_of_token
                .iter_mut()
                .take(quote.token_end)
                .skip(quote.token_begin)
            {
                *slot = Some(q);
            }
        }

        let mut token_paragraphs = Vec::with_capacity(doc.token_count());
        for (sent_num, sentence) in doc.sentences.iter().enumerate() {
            for token in &sentence.tokens {
                token_paragraphs.push(token.paragraph().unwrap_or(sent_num + 1));
            }
        }

        let mentions = character_mentions(doc, dict);
        debug!(
            "{} characters, {} character mentions, {} quotes",
            characters.len(),
            mentions.len(),
            doc.quotes.len()
        );
        Self {
            characters,
            mentions,
            quote_of_token,
            token_paragraphs,
        }
    }

    pub fn in_quote(&self, token: usize) -> bool {
        self.quote_of_token.get(token).is_some_and(Option::is_some)
    }

    pub fn paragraph(&self, token: usize) -> Option<usize> {
        self.token_paragraphs.get(token).copied()
    }

    pub fn quote_paragraph(&self, quote: &Quotation) -> Option<usize> {
        self.paragraph(quote.token_begin)
    }

    /// Character mentions in narration, outside every quotation
    pub fn narration_mentions(&self) -> impl Iterator<Item = &CharacterMention> {
        self.mentions
            .iter()
            .filter(move |m| !self.in_quote(m.token_begin))
    }

    pub fn mentions_within(&self, quote: &Quotation) -> impl Iterator<Item = &CharacterMention> {
        self.mentions
            .iter()
            .filter(move |m| quote.token_begin <= m.token_begin && m.token_end <= quote.token_end)
    }

    pub fn mention_starting_at(&self, token: usize) -> Option<&CharacterMention> {
        self.mentions.iter().find(|m| m.token_begin == token)
    }

    pub fn mention_ending_at(&self, token_end: usize) -> Option<&CharacterMention> {
        self.mentions.iter().find(|m| m.token_end == token_end)
    }

    pub fn mention_covering(&self, token: usize) -> Option<&CharacterMention> {
        self.mentions
            .iter()
            .find(|m| m.token_begin <= token && token < m.token_end)
    }

    /// The character a name refers to: an exact name first, then any shared word
    pub fn character_for(&self, text: &str) -> Option<&Character> {
        let text = normalize_whitespace(text);
        self.characters
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&text))
            .or_else(|| {
                self.characters.iter().find(|c| {
                    c.name.split_whitespace().any(|name_word| {
                        text.split_whitespace()
                            .any(|word| word.eq_ignore_ascii_case(name_word))
                    })
                })
            })
    }

    /// Name-mention counts per character over the whole document
    pub fn character_frequencies(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for mention in &self.mentions {
            if mention.kind != CharacterMentionKind::Name {
                continue;
            }
            if let Some(character) = self.character_for(&mention.text) {
                *counts.entry(character.name.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// One character per distinct PERSON entity mention text
pub fn characters_from_entities(entities: &[EntityMention], dict: &Dictionaries) -> Vec<Character> {
    let mut characters: Vec<Character> = Vec::new();
    for entity in entities.iter().filter(|e| e.entity_type.starts_with("PER")) {
        let name = normalize_whitespace(&entity.text);
        if characters.iter().any(|c| c.name == name) {
            continue;
        }
        let gender = name
            .split_whitespace()
            .next()
            .map(|first| dict.gender_of(first))
            .unwrap_or_default();
        characters.push(Character { name, gender });
    }
    characters
}

/// Person names, personal pronouns and animate nouns, in document order
pub fn character_mentions(doc: &Document, dict: &Dictionaries) -> Vec<CharacterMention> {
    let mut mentions: Vec<CharacterMention> = doc
        .entity_mentions
        .iter()
        .filter(|e| e.entity_type.starts_with("PER"))
        .map(|e| CharacterMention {
            text: normalize_whitespace(&e.text),
            token_begin: e.token_begin,
            token_end: e.token_end,
            sentence: e.sentence,
            kind: CharacterMentionKind::Name,
            gender: e
                .text
                .split_whitespace()
                .next()
                .map(|first| dict.gender_of(first))
                .unwrap_or_default(),
        })
        .collect();

    for (sent_num, sentence) in doc.sentences.iter().enumerate() {
        for (i, token) in sentence.tokens.iter().enumerate() {
            let global = sentence.token_offset + i;
            if mentions
                .iter()
                .any(|m| m.token_begin <= global && global < m.token_end)
            {
                continue;
            }
            let word = token.word.as_str();
            let kind = if token.pos.starts_with("PRP")
                && (dict.is_character_pronoun(word) || dict.is_first_person_singular(word))
            {
                CharacterMentionKind::Pronoun
            } else if token.pos.starts_with("NN")
                && !token.pos.starts_with("NNP")
                && dict.animate_words.contains(&word.to_lowercase())
            {
                CharacterMentionKind::AnimateNoun
            } else {
                continue;
            };
            mentions.push(CharacterMention {
                text: token.word.clone(),
                token_begin: global,
                token_end: global + 1,
                sentence: sent_num,
                kind,
                gender: dict.gender_of(word),
            });
        }
    }
    mentions.sort_by_key(|m| (m.token_begin, m.token_end));
    mentions
}
