use std::collections::BTreeMap;
use std::ops::Range;

use tracing::debug;

use crate::models::{
    DependencyGraph, Dictionaries, DocType, Document, Gender, MentionId, ParagraphAnnotation,
    Position, SpeakerAnnotation, SpeakerInfo, Token, UtteranceAnnotation, is_decimal_id,
    is_placeholder_speaker, placeholder_speaker,
};
use crate::rules::{is_closing_quote, is_neutral_quote, is_opening_quote, mention_matches_speaker};

/// Number tokens by paragraph. A character gap wider than `gap` between consecutive
/// tokens opens a new paragraph; indices start at 1.
pub fn set_paragraph_annotation(doc: &mut Document, gap: usize) {
    let mut paragraph = 0;
    let mut previous_end: Option<usize> = None;
    for token in doc.tokens_mut() {
        match token.begin_char {
            Some(begin) => {
                if previous_end.is_none_or(|end| begin > end + gap) {
                    paragraph += 1;
                }
                token.annotations.set::<ParagraphAnnotation>(paragraph);
                previous_end = Some(token.end_char.unwrap_or(begin));
            }
            None => {
                token.annotations.remove::<ParagraphAnnotation>();
            }
        }
    }

    let heads: Vec<(MentionId, Option<usize>)> = doc
        .ordered_mentions()
        .map(|m| (m.mention_id, doc.head_token(m).and_then(Token::paragraph)))
        .collect();
    for (id, paragraph) in heads {
        if let Some(mention) = doc.mention_mut(id) {
            mention.paragraph = paragraph;
        }
    }
    doc.num_paragraphs = paragraph;
}

/// Assign utterances and speakers to tokens and mentions, classify the document
/// and record speaker pairs.
pub fn process_discourse(doc: &mut Document, dict: &Dictionaries) {
    if !doc.use_marked_discourse() {
        for token in doc.tokens_mut() {
            token.annotations.remove::<SpeakerAnnotation>();
            token.annotations.remove::<UtteranceAnnotation>();
        }
    }
    set_utterance_and_speaker_annotation(doc);

    let utters: Vec<(MentionId, usize)> = doc
        .ordered_mentions()
        .map(|m| (m.mention_id, doc.head_token(m).map(Token::utterance).unwrap_or(0)))
        .collect();
    for (id, utter) in utters {
        if let Some(mention) = doc.mention_mut(id) {
            mention.utter = utter;
        }
    }

    doc.doc_type = find_doc_type(doc);
    doc.max_utter = doc.tokens().map(Token::utterance).max().unwrap_or(0);
    find_speakers(doc, dict);

    for speaker in doc.speakers.values() {
        if !doc.speaker_info_map.contains_key(speaker) {
            doc.speaker_info_map
                .insert(speaker.clone(), SpeakerInfo::new(speaker));
        }
    }
    reconcile_speakers(doc);

    let speakers = doc.speakers.clone();
    for token in doc.tokens_mut() {
        if let Some(speaker) = speakers.get(&token.utterance()) {
            token.annotations.set::<SpeakerAnnotation>(speaker.clone());
        }
    }
    find_speaker_pairs(doc);

    debug!(
        "{:?} document with {} utterances, speakers {:?}",
        doc.doc_type,
        doc.max_utter + 1,
        doc.speakers
    );
}

/// The utterance state machine.
///
/// A speaker change mints a new utterance; a quote opening mints one for the
/// quoted text while the text around the quote keeps the outside utterance.
pub fn set_utterance_and_speaker_annotation(doc: &mut Document) {
    let mut utterance = 0;
    let mut outside_quote_utterance = 0;
    let mut inside_quotation = false;
    let mut max_utter = 0;
    let mut info_given = false;
    let mut previous_speaker = doc
        .tokens()
        .next()
        .and_then(|t| t.speaker().map(str::to_string));

    for token in doc.tokens_mut() {
        let current = token.speaker().map(str::to_string);
        if current.as_deref().is_some_and(|s| s != "-") {
            info_given = true;
        }
        let speaker_change = info_given && current.is_some() && current != previous_speaker;
        let word = token.word.as_str();
        let quote_start = is_opening_quote(word) || (!inside_quotation && is_neutral_quote(word));
        let quote_end = is_closing_quote(word) || (inside_quotation && is_neutral_quote(word));

        if speaker_change {
            utterance = max_utter + 1;
            outside_quote_utterance = if quote_start { utterance + 1 } else { utterance };
            previous_speaker = current.clone();
        } else if quote_start {
            utterance = max_utter + 1;
        }
        if quote_end {
            utterance = outside_quote_utterance;
            inside_quotation = false;
        }
        max_utter = max_utter.max(utterance);

        // The opening glyph belongs to the text outside the quote
        let assigned = if quote_start { outside_quote_utterance } else { utterance };
        token.annotations.set::<UtteranceAnnotation>(assigned);

        let no_speaker_info = current
            .as_deref()
            .is_none_or(|s| s.is_empty() || is_placeholder_speaker(s));
        if no_speaker_info || inside_quotation {
            token
                .annotations
                .set::<SpeakerAnnotation>(placeholder_speaker(assigned));
        }
        if quote_start {
            inside_quotation = true;
        }
    }
    doc.speaker_info_given = info_given;
}

/// ARTICLE when narration resumes (utterance 0) after a quotation, CONVERSATION when
/// utterances only move forward.
pub fn find_doc_type(doc: &Document) -> DocType {
    let mut speaker_change = false;
    for token in doc.tokens() {
        let utter = token.utterance();
        if utter != 0 {
            speaker_change = true;
        } else if speaker_change {
            return DocType::Article;
        }
    }
    if speaker_change {
        DocType::Conversation
    } else {
        DocType::Article
    }
}

fn find_speakers(doc: &mut Document, dict: &Dictionaries) {
    if !doc.use_marked_discourse() {
        match doc.doc_type {
            DocType::Conversation => find_speakers_in_conversation(doc, dict),
            DocType::Article => find_speakers_in_article(doc, dict),
        }
    }

    let mut first_seen: BTreeMap<usize, String> = BTreeMap::new();
    for token in doc.tokens() {
        first_seen
            .entry(token.utterance())
            .or_insert_with(|| token.speaker().unwrap_or_default().to_string());
    }
    for (utter, speaker) in first_seen {
        doc.speakers.entry(utter).or_insert(speaker);
    }
}

fn find_speakers_in_article(doc: &mut Document, dict: &Dictionaries) {
    let mut found: Vec<(usize, String)> = Vec::new();
    let mut begin: Option<Position> = None;
    let mut utter_num = 0;
    for (i, sentence) in doc.sentences.iter().enumerate() {
        for (j, token) in sentence.tokens.iter().enumerate() {
            let utter = token.utterance();
            match begin {
                None if utter != 0 => {
                    utter_num = utter;
                    begin = Some((i, j));
                }
                Some(start) if utter == 0 => {
                    if let Some(speaker) = find_quotation_speaker(doc, start, (i, j), dict) {
                        found.push((utter_num, speaker));
                    }
                    begin = None;
                }
                _ => {}
            }
        }
    }
    if let Some(start) = begin {
        let last = doc.sentences.len() - 1;
        let end = (last, doc.sentences[last].len().saturating_sub(1));
        if let Some(speaker) = find_quotation_speaker(doc, start, end, dict) {
            found.push((utter_num, speaker));
        }
    }

    for (utter, speaker) in found {
        debug!("Quotation utterance {} spoken by {}", utter, speaker);
        doc.speakers.insert(utter, speaker);
    }
}

/// Search around a quotation for a reporting verb: the sentence where it starts,
/// the sentence where it ends, then the neighbouring sentences when the quote sits
/// at a sentence boundary.
fn find_quotation_speaker(
    doc: &Document,
    begin: Position,
    end: Position,
    dict: &Dictionaries,
) -> Option<String> {
    let sentence_len = |s: usize| doc.sentences.get(s).map_or(0, |s| s.len());

    find_speaker(doc, begin.0, 0..begin.1, dict)
        .or_else(|| find_speaker(doc, end.0, end.1..sentence_len(end.0), dict))
        .or_else(|| {
            (begin.1 <= 1 && begin.0 > 0)
                .then(|| find_speaker(doc, begin.0 - 1, 0..sentence_len(begin.0 - 1), dict))
                .flatten()
        })
        .or_else(|| {
            (end.1 + 2 >= sentence_len(end.0) && end.0 + 1 < doc.sentences.len())
                .then(|| find_speaker(doc, end.0 + 1, 0..sentence_len(end.0 + 1), dict))
                .flatten()
        })
}

fn find_speaker(
    doc: &Document,
    sent_num: usize,
    range: Range<usize>,
    dict: &Dictionaries,
) -> Option<String> {
    let sentence = doc.sentences.get(sent_num)?;
    let graph = sentence.dependencies()?;
    let end = range.end.min(sentence.len());

    for i in range.start..end {
        let token = &sentence.tokens[i];
        if token.utterance() != 0 || !token.is_verb() || !dict.is_report_verb(&token.lemma) {
            continue;
        }
        if let Some(speaker) = find_subject(doc, graph, sent_num, i) {
            return Some(speaker);
        }
        // "was talking", "can tell"
        for ancestor in graph.path_to_root(i) {
            let Some(tag) = sentence.tokens.get(ancestor).map(|t| t.pos.as_str()) else {
                break;
            };
            if !tag.starts_with('V') && !tag.starts_with("MD") {
                break;
            }
            if let Some(speaker) = find_subject(doc, graph, sent_num, ancestor) {
                return Some(speaker);
            }
        }
    }
    None
}

/// The nominal subject of `governor`, as a mention id when a mention is headed
/// there and as the bare word otherwise
fn find_subject(
    doc: &Document,
    graph: &DependencyGraph,
    sent_num: usize,
    governor: usize,
) -> Option<String> {
    let subject = graph.child_with_relation(governor, "nsubj")?;
    match doc.mention_head_positions.get(&(sent_num, subject)) {
        Some(id) => Some(id.to_string()),
        None => doc
            .token_at(sent_num, subject)
            .map(|t| t.word.clone()),
    }
}

fn find_speakers_in_conversation(doc: &mut Document, dict: &Dictionaries) {
    // "I am Joe": Joe speaks his own utterance
    let mut self_named: Vec<(usize, MentionId)> = Vec::new();
    for mention in doc.ordered_mentions() {
        let names_speaker = mention.predicate_nominatives.iter().any(|&other| {
            doc.mention(other)
                .is_some_and(|m| m.span_text.eq_ignore_ascii_case("i"))
        });
        if names_speaker {
            let utter = doc.head_token(mention).map(Token::utterance).unwrap_or(0);
            self_named.push((utter, mention.mention_id));
        }
    }
    for (utter, id) in self_named {
        doc.speakers.insert(utter, id.to_string());
    }

    // Consecutive sentences opening in the same utterance form one paragraph
    let mut paragraphs: Vec<(Range<usize>, usize)> = Vec::new();
    for (i, sentence) in doc.sentences.iter().enumerate() {
        let utter = sentence.tokens.first().map(Token::utterance).unwrap_or(0);
        match paragraphs.last_mut() {
            Some((range, current)) if *current == utter => range.end = i + 1,
            _ => paragraphs.push((i..i + 1, utter)),
        }
    }

    let mut next_speaker = String::new();
    for (range, utter) in paragraphs {
        next_speaker = find_paragraph_speaker(doc, range, utter, &next_speaker, dict);
    }
}

/// Give the paragraph's utterance a speaker if it has none yet and return the
/// speaker announced for the next paragraph.
fn find_paragraph_speaker(
    doc: &mut Document,
    paragraph: Range<usize>,
    utter: usize,
    announced: &str,
    dict: &Dictionaries,
) -> String {
    if paragraph.is_empty() {
        return String::new();
    }
    let last = paragraph.end - 1;

    if !doc.speakers.contains_key(&utter) {
        if !announced.is_empty() {
            doc.speakers.insert(utter, announced.to_string());
        } else if let Some(speaker) = speaker_label(doc, last) {
            doc.speakers.insert(utter, speaker);
        }
    }
    find_next_paragraph_speaker(doc, last, dict)
}

/// A verbless closing line naming a person ("John, NBC News")
fn speaker_label(doc: &Document, sent_num: usize) -> Option<String> {
    let sentence = doc.sentences.get(sent_num)?;
    let mut speaker = None;
    for (i, token) in sentence.tokens.iter().enumerate() {
        if token.is_verb() {
            return None;
        }
        if token.is_person() {
            if let Some(id) = doc.mention_head_positions.get(&(sent_num, i)) {
                speaker = Some(id.to_string());
            }
        }
    }
    speaker
}

/// A person subject of a reporting verb in the paragraph's last sentence
fn find_next_paragraph_speaker(doc: &Document, sent_num: usize, dict: &Dictionaries) -> String {
    let Some(sentence) = doc.sentences.get(sent_num) else {
        return String::new();
    };
    let Some(graph) = sentence.dependencies() else {
        return String::new();
    };

    let mut speaker = String::new();
    for (i, token) in sentence.tokens.iter().enumerate() {
        if !dict.is_report_verb(&token.lemma) {
            continue;
        }
        for (governor, subject) in graph.pairs_with_relation("nsubj") {
            if governor != i {
                continue;
            }
            if let Some(mention) = doc.mention_at_head(sent_num, subject) {
                if mention.ner.starts_with("PER") {
                    speaker = mention.mention_id.to_string();
                }
            }
        }
    }
    speaker
}

/// Turn raw speaker names into mention ids: strict name match over all mentions
/// first, loose match second.
pub fn reconcile_speakers(doc: &mut Document) {
    let mut conversion: BTreeMap<String, MentionId> = BTreeMap::new();
    for (speaker, info) in &doc.speaker_info_map {
        if !info.has_real_speaker_name() {
            continue;
        }
        let mentions = || doc.predicted_mentions_by_id.values();
        let matched = mentions()
            .find(|m| mention_matches_speaker(m, info, true))
            .or_else(|| mentions().find(|m| mention_matches_speaker(m, info, false)));
        if let Some(mention) = matched {
            conversion.insert(speaker.clone(), mention.mention_id);
        }
    }
    if conversion.is_empty() {
        return;
    }
    debug!("Speaker names resolved to mentions: {:?}", conversion);

    for speaker in doc.speakers.values_mut() {
        if let Some(id) = conversion.get(speaker) {
            *speaker = id.to_string();
        }
    }
    for (name, id) in conversion {
        let Some(mut info) = doc.speaker_info_map.remove(&name) else {
            continue;
        };
        info.add_mention(id);
        if info.gender == Gender::Unknown {
            if let Some(mention) = doc.mention(id) {
                info.gender = mention.gender;
            }
        }
        doc.speaker_info_map.insert(id.to_string(), info);
    }
}

/// Record (mention, speaker mention) for every mention spoken by a known mention.
/// Raw upstream speaker names are only trusted as ids for CoNLL input.
fn find_speaker_pairs(doc: &mut Document) {
    if !doc.conll_doc && doc.use_marked_discourse() {
        return;
    }
    let mut pairs = Vec::new();
    for mention in doc.predicted_mentions_by_id.values() {
        let Some(speaker) = doc.head_token(mention).and_then(Token::speaker) else {
            continue;
        };
        if !is_decimal_id(speaker) {
            continue;
        }
        if let Ok(speaker_id) = speaker.parse::<MentionId>() {
            if doc.predicted_mentions_by_id.contains_key(&speaker_id) {
                pairs.push((mention.mention_id, speaker_id));
            }
        }
    }
    doc.speaker_pairs.extend(pairs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyEdge, PennHeadFinder, Sentence, UseMarkedDiscourseAnnotation};
    use crate::stages::{
        MentionSpan, PreprocessConfig, RawMentions, TwinPolicy, initialize_mentions,
        mark_syntactic_relations, preprocess, reorder_mentions,
    };
    use crate::test_support::{joe_said_happy, sentence, token};

    fn utterances(doc: &Document) -> Vec<usize> {
        doc.tokens().map(Token::utterance).collect()
    }

    #[test]
    fn test_article_quote_gets_its_own_utterance() {
        let (mut doc, raw) = joe_said_happy();
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();

        // Joe said , " I am happy . "
        assert_eq!(utterances(&doc), vec![0, 0, 0, 0, 1, 1, 1, 1, 0]);
        assert_eq!(doc.doc_type, DocType::Article);
        assert_eq!(doc.max_utter, 1);
    }

    #[test]
    fn test_article_speaker_from_reporting_verb() {
        let (mut doc, raw) = joe_said_happy();
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();

        let joe = doc.ordered_mentions().find(|m| m.span_text == "Joe").unwrap().mention_id;
        let i = doc.ordered_mentions().find(|m| m.span_text == "I").unwrap().mention_id;
        assert_eq!(doc.speakers.get(&1), Some(&joe.to_string()));
        assert_eq!(doc.speakers.get(&0).map(String::as_str), Some("PER0"));
        assert_eq!(doc.token(5).and_then(Token::speaker), Some(joe.to_string().as_str()));
        assert!(doc.speaker_info_map.contains_key(&joe.to_string()));
        assert!(doc.speaker_pairs.contains(&(i, joe)));
        assert_eq!(doc.mention(i).map(|m| m.utter), Some(1));
    }

    #[test]
    fn test_paragraphs_follow_character_gaps() {
        let (mut doc, raw) = joe_said_happy();
        // push the quote into a second paragraph
        for token in doc.tokens_mut().skip(4) {
            token.begin_char = token.begin_char.map(|b| b + 10);
            token.end_char = token.end_char.map(|e| e + 10);
        }
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();

        let paragraphs: Vec<Option<usize>> = doc.tokens().map(Token::paragraph).collect();
        assert_eq!(paragraphs[..5], [Some(1), Some(1), Some(1), Some(1), Some(2)]);
        assert_eq!(doc.num_paragraphs, 2);
        let i = doc.ordered_mentions().find(|m| m.span_text == "I").unwrap();
        assert_eq!(i.paragraph, Some(2));
    }

    #[test]
    fn test_tokens_without_offsets_have_no_paragraph() {
        let mut doc = Document::new("p", vec![sentence(&[("Hi", "UH"), ("there", "RB")])]);
        set_paragraph_annotation(&mut doc, 2);
        assert!(doc.tokens().all(|t| t.paragraph().is_none()));
        assert_eq!(doc.num_paragraphs, 0);
    }

    fn transcript() -> (Document, RawMentions) {
        let mut first = sentence(&[("Joe", "NNP"), ("speaks", "VBZ")]);
        let mut second = sentence(&[("Ann", "NNP"), ("answers", "VBZ")]);
        first.tokens[0].ner = "PERSON".to_string();
        second.tokens[0].ner = "PERSON".to_string();
        for token in &mut first.tokens {
            token.annotations.set::<SpeakerAnnotation>("Joe Smith".to_string());
        }
        for token in &mut second.tokens {
            token.annotations.set::<SpeakerAnnotation>("Ann".to_string());
        }
        let mut doc = Document::new("talk", vec![first, second]);
        doc.annotations.set::<UseMarkedDiscourseAnnotation>(true);
        let raw = RawMentions {
            predicted: vec![vec![MentionSpan::new(0, 1)], vec![MentionSpan::new(0, 1)]],
            gold: None,
        };
        (doc, raw)
    }

    #[test]
    fn test_conversation_speakers_reconciled_to_mentions() {
        let (mut doc, raw) = transcript();
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();

        assert_eq!(utterances(&doc), vec![0, 0, 1, 1]);
        assert_eq!(doc.doc_type, DocType::Conversation);
        assert!(doc.speaker_info_given);
        // "Joe Smith" only matches loosely, "Ann" strictly
        assert_eq!(doc.speakers.get(&0).map(String::as_str), Some("0"));
        assert_eq!(doc.speakers.get(&1).map(String::as_str), Some("1"));
        assert!(doc.speaker_info_map.contains_key("0"));
        assert!(!doc.speaker_info_map.contains_key("Joe Smith"));
        assert_eq!(doc.speaker_info_map["0"].speaker_name, "Joe Smith");
        assert_eq!(doc.token(3).and_then(Token::speaker), Some("1"));
        // marked discourse outside CoNLL input records no pairs
        assert!(doc.speaker_pairs.is_empty());
    }

    #[test]
    fn test_unmarked_discourse_drops_upstream_speakers() {
        let (mut doc, raw) = transcript();
        doc.annotations.remove::<UseMarkedDiscourseAnnotation>();
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();

        assert_eq!(utterances(&doc), vec![0, 0, 0, 0]);
        assert!(!doc.speaker_info_given);
        assert_eq!(doc.doc_type, DocType::Article);
        assert_eq!(doc.token(0).and_then(Token::speaker), Some("PER0"));
    }

    #[test]
    fn test_placeholder_speakers_are_relabelled() {
        let mut doc = Document::new(
            "ph",
            vec![sentence(&[("a", "DT"), ("b", "NN")])],
        );
        for (i, t) in doc.tokens_mut().enumerate() {
            t.annotations.set::<SpeakerAnnotation>(format!("PER{}", i));
        }
        set_utterance_and_speaker_annotation(&mut doc);
        // placeholders still count as speaker changes but are relabelled
        assert_eq!(utterances(&doc), vec![0, 1]);
        assert_eq!(doc.token(1).and_then(Token::speaker), Some("PER1"));
    }

    #[test]
    fn test_speaker_change_at_quote_start() {
        let mut tokens = vec![
            token("said", "VBD", "say", "O"),
            token("\"", "``", "\"", "O"),
            token("go", "VB", "go", "O"),
            token("\"", "''", "\"", "O"),
            token("ok", "UH", "ok", "O"),
        ];
        tokens[1].annotations.set::<SpeakerAnnotation>("Bob".to_string());
        let mut doc = Document::new("q", vec![crate::models::Sentence::new(tokens)]);
        set_utterance_and_speaker_annotation(&mut doc);
        // quote text gets 1, narration after the quote gets 2
        assert_eq!(utterances(&doc), vec![0, 2, 1, 2, 2]);
        assert_eq!(doc.token(2).and_then(Token::speaker), Some("PER1"));
    }

    #[test]
    fn test_opening_glyph_keeps_outside_placeholder() {
        let tokens = vec![
            token("\"", "``", "\"", "O"),
            token("go", "VB", "go", "O"),
            token("\"", "''", "\"", "O"),
        ];
        let mut doc = Document::new("glyph", vec![Sentence::new(tokens)]);
        set_utterance_and_speaker_annotation(&mut doc);

        assert_eq!(utterances(&doc), vec![0, 1, 0]);
        let speakers: Vec<_> = doc.tokens().map(Token::speaker).collect();
        assert_eq!(speakers, vec![Some("PER0"), Some("PER1"), Some("PER0")]);
    }

    fn person(word: &str) -> Token {
        token(word, "NNP", &word.to_lowercase(), "PERSON")
    }

    fn glyph() -> Token {
        token("\"", "``", "\"", "O")
    }

    /// `<name> said .` with its dependencies
    fn said(name: &str) -> Sentence {
        let mut sentence = Sentence::new(vec![
            person(name),
            token("said", "VBD", "say", "O"),
            token(".", ".", ".", "O"),
        ]);
        sentence.basic_dependencies = Some(DependencyGraph::new(vec![
            DependencyEdge::new(None, 1, "root"),
            DependencyEdge::new(Some(1), 0, "nsubj"),
            DependencyEdge::new(Some(1), 2, "punct"),
        ]));
        sentence
    }

    fn preprocessed(sentences: Vec<Sentence>, predicted: Vec<Vec<MentionSpan>>) -> Document {
        let mut doc = Document::new("speakers", sentences);
        let raw = RawMentions {
            predicted,
            gold: None,
        };
        preprocess(&mut doc, raw, &Dictionaries::default(), &PreprocessConfig::default()).unwrap();
        doc
    }

    fn mention_id(doc: &Document, text: &str) -> String {
        doc.ordered_mentions()
            .find(|m| m.span_text == text)
            .unwrap()
            .mention_id
            .to_string()
    }

    #[test]
    fn test_article_speaker_in_sentence_where_quote_ends() {
        // " Hello . | Bye " Joe said .
        let first = Sentence::new(vec![
            glyph(),
            token("Hello", "UH", "hello", "O"),
            token(".", ".", ".", "O"),
        ]);
        let mut second = Sentence::new(vec![
            token("Bye", "UH", "bye", "O"),
            token("\"", "''", "\"", "O"),
            person("Joe"),
            token("said", "VBD", "say", "O"),
            token(".", ".", ".", "O"),
        ]);
        second.basic_dependencies = Some(DependencyGraph::new(vec![
            DependencyEdge::new(None, 3, "root"),
            DependencyEdge::new(Some(3), 2, "nsubj"),
            DependencyEdge::new(Some(3), 4, "punct"),
        ]));
        let doc = preprocessed(
            vec![first, second],
            vec![vec![], vec![MentionSpan::new(2, 3).with_head(2)]],
        );

        assert_eq!(utterances(&doc), vec![0, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(doc.doc_type, DocType::Article);
        assert_eq!(doc.speakers.get(&1), Some(&mention_id(&doc, "Joe")));
    }

    #[test]
    fn test_article_speaker_in_previous_sentence() {
        // Joe said . | " Hello . "
        let quote = Sentence::new(vec![
            glyph(),
            token("Hello", "UH", "hello", "O"),
            token(".", ".", ".", "O"),
            token("\"", "''", "\"", "O"),
        ]);
        let doc = preprocessed(
            vec![said("Joe"), quote],
            vec![vec![MentionSpan::new(0, 1).with_head(0)], vec![]],
        );

        assert_eq!(doc.doc_type, DocType::Article);
        assert_eq!(doc.speakers.get(&1), Some(&mention_id(&doc, "Joe")));
    }

    #[test]
    fn test_article_speaker_in_next_sentence() {
        // " Hello . " | Joe said .
        let quote = Sentence::new(vec![
            glyph(),
            token("Hello", "UH", "hello", "O"),
            token(".", ".", ".", "O"),
            token("\"", "''", "\"", "O"),
        ]);
        let doc = preprocessed(
            vec![quote, said("Joe")],
            vec![vec![], vec![MentionSpan::new(0, 1).with_head(0)]],
        );

        assert_eq!(doc.doc_type, DocType::Article);
        assert_eq!(doc.speakers.get(&1), Some(&mention_id(&doc, "Joe")));
        assert_eq!(doc.speakers.get(&0).map(String::as_str), Some("PER0"));
    }

    #[test]
    fn test_conversation_speaker_named_by_predicate_nominative() {
        // " I am Joe .  (never closed)
        let mut sentence = Sentence::new(vec![
            glyph(),
            token("I", "PRP", "i", "O"),
            token("am", "VBP", "be", "O"),
            person("Joe"),
            token(".", ".", ".", "O"),
        ]);
        sentence.basic_dependencies = Some(DependencyGraph::new(vec![
            DependencyEdge::new(None, 3, "root"),
            DependencyEdge::new(Some(3), 1, "nsubj"),
            DependencyEdge::new(Some(3), 2, "cop"),
            DependencyEdge::new(Some(3), 4, "punct"),
        ]));
        let doc = preprocessed(
            vec![sentence],
            vec![vec![
                MentionSpan::new(1, 2).with_head(1),
                MentionSpan::new(3, 4).with_head(3),
            ]],
        );

        let joe = mention_id(&doc, "Joe");
        let i: MentionId = mention_id(&doc, "I").parse().unwrap();
        assert_eq!(doc.doc_type, DocType::Conversation);
        assert_eq!(doc.speakers.get(&1), Some(&joe));
        // the opening glyph belongs to utterance 0
        assert_eq!(doc.speakers.get(&0).map(String::as_str), Some("PER0"));
        assert!(doc.speaker_pairs.contains(&(i, joe.parse().unwrap())));
    }

    /// Conversation speakers found from sentences pre-labelled with utterances
    fn conversation(
        sentences: Vec<(Sentence, usize)>,
        predicted: Vec<Vec<MentionSpan>>,
    ) -> Document {
        let (sentences, utters): (Vec<_>, Vec<_>) = sentences.into_iter().unzip();
        let mut doc = Document::new("conversation", sentences);
        let dict = Dictionaries::default();
        let raw = RawMentions {
            predicted,
            gold: None,
        };
        initialize_mentions(&mut doc, &raw, &dict, TwinPolicy::Strict, &PennHeadFinder).unwrap();
        reorder_mentions(&mut doc);
        mark_syntactic_relations(&mut doc);
        for (sentence, utter) in doc.sentences.iter_mut().zip(utters) {
            for token in &mut sentence.tokens {
                token.annotations.set::<UtteranceAnnotation>(utter);
            }
        }
        find_speakers_in_conversation(&mut doc, &dict);
        doc
    }

    #[test]
    fn test_conversation_speaker_from_closing_name_line() {
        let greeting = Sentence::new(vec![
            token("Hello", "UH", "hello", "O"),
            token("there", "RB", "there", "O"),
        ]);
        // Joe , NBC News
        let signature = Sentence::new(vec![
            person("Joe"),
            token(",", ",", ",", "O"),
            token("NBC", "NNP", "nbc", "ORGANIZATION"),
            token("News", "NNP", "news", "ORGANIZATION"),
        ]);
        // a closing line with a verb is not a label
        let waved = Sentence::new(vec![person("Ann"), token("waved", "VBD", "wave", "O")]);
        let doc = conversation(
            vec![(greeting, 1), (signature, 1), (waved, 2)],
            vec![
                vec![],
                vec![MentionSpan::new(0, 1).with_head(0)],
                vec![MentionSpan::new(0, 1).with_head(0)],
            ],
        );

        assert_eq!(doc.speakers.get(&1), Some(&mention_id(&doc, "Joe")));
        assert!(!doc.speakers.contains_key(&2));
    }

    #[test]
    fn test_conversation_reporting_verb_announces_next_speaker() {
        let reply = Sentence::new(vec![
            token("Why", "WRB", "why", "O"),
            token("?", ".", "?", "O"),
        ]);
        let doc = conversation(
            vec![(said("Ann"), 1), (reply, 2)],
            vec![vec![MentionSpan::new(0, 1).with_head(0)], vec![]],
        );

        // a sentence with a verb gives its own utterance no label
        assert!(!doc.speakers.contains_key(&1));
        assert_eq!(doc.speakers.get(&2), Some(&mention_id(&doc, "Ann")));
    }

    #[test]
    fn test_conversation_self_naming_beats_announced_speaker() {
        // I(0) am(1) Joe(2)
        let mut intro = Sentence::new(vec![
            token("I", "PRP", "i", "O"),
            token("am", "VBP", "be", "O"),
            person("Joe"),
        ]);
        intro.basic_dependencies = Some(DependencyGraph::new(vec![
            DependencyEdge::new(None, 2, "root"),
            DependencyEdge::new(Some(2), 0, "nsubj"),
            DependencyEdge::new(Some(2), 1, "cop"),
        ]));
        let doc = conversation(
            vec![(said("Ann"), 1), (intro, 2)],
            vec![
                vec![MentionSpan::new(0, 1).with_head(0)],
                vec![
                    MentionSpan::new(0, 1).with_head(0),
                    MentionSpan::new(2, 3).with_head(2),
                ],
            ],
        );

        assert_eq!(doc.speakers.get(&2), Some(&mention_id(&doc, "Joe")));
    }
}
