use crate::models::{DependencyEdge, DependencyGraph, Document, EntityMention, Sentence, Token};
use crate::sieves::{detect_quotes, entity_mentions_from_ner};
use crate::stages::{MentionSpan, RawMentions, set_paragraph_annotation};

pub fn token(word: &str, pos: &str, lemma: &str, ner: &str) -> Token {
    let mut token = Token::new(word, pos);
    token.lemma = lemma.to_string();
    token.ner = ner.to_string();
    token
}

pub fn sentence(words: &[(&str, &str)]) -> Sentence {
    Sentence::new(words.iter().map(|(w, p)| Token::new(w, p)).collect())
}

/// `Joe said , " I am happy . "` with offsets and basic dependencies
pub fn joe_said_happy_document() -> Document {
    let mut tokens = vec![
        token("Joe", "NNP", "joe", "PERSON"),
        token("said", "VBD", "say", "O"),
        token(",", ",", ",", "O"),
        token("\"", "``", "\"", "O"),
        token("I", "PRP", "i", "O"),
        token("am", "VBP", "be", "O"),
        token("happy", "JJ", "happy", "O"),
        token(".", ".", ".", "O"),
        token("\"", "''", "\"", "O"),
    ];
    let offsets = [
        (0, 3),
        (4, 8),
        (8, 9),
        (10, 11),
        (11, 12),
        (13, 15),
        (16, 21),
        (21, 22),
        (22, 23),
    ];
    for (token, (begin, end)) in tokens.iter_mut().zip(offsets) {
        token.begin_char = Some(begin);
        token.end_char = Some(end);
    }

    let mut sentence = Sentence::new(tokens);
    sentence.basic_dependencies = Some(DependencyGraph::new(vec![
        DependencyEdge::new(None, 1, "root"),
        DependencyEdge::new(Some(1), 0, "nsubj"),
        DependencyEdge::new(Some(1), 2, "punct"),
        DependencyEdge::new(Some(1), 3, "punct"),
        DependencyEdge::new(Some(1), 6, "ccomp"),
        DependencyEdge::new(Some(6), 4, "nsubj"),
        DependencyEdge::new(Some(6), 5, "cop"),
        DependencyEdge::new(Some(6), 7, "punct"),
        DependencyEdge::new(Some(1), 8, "punct"),
    ]));
    Document::new("joe", vec![sentence])
}

/// The same document with the entity mention for "Joe" and predicted mentions
/// for "Joe" and "I"
pub fn joe_said_happy() -> (Document, RawMentions) {
    let mut doc = joe_said_happy_document();
    doc.entity_mentions = vec![EntityMention {
        text: "Joe".to_string(),
        sentence: 0,
        token_begin: 0,
        token_end: 1,
        entity_type: "PERSON".to_string(),
        canonical: Some(0),
    }];
    let raw = RawMentions {
        predicted: vec![vec![
            MentionSpan::new(0, 1).with_head(0),
            MentionSpan::new(4, 5).with_head(4),
        ]],
        gold: None,
    };
    (doc, raw)
}

/// One paragraph per sentence: tokens a space apart, sentences far apart. Entity
/// mentions and quotations are derived from the tokens.
pub fn paragraphs(doc_id: &str, sentences: Vec<Vec<Token>>) -> Document {
    let mut offset = 0;
    let mut built = Vec::new();
    for mut tokens in sentences {
        for t in &mut tokens {
            t.begin_char = Some(offset);
            t.end_char = Some(offset + t.word.len());
            offset += t.word.len() + 1;
        }
        offset += 10;
        built.push(Sentence::new(tokens));
    }
    let mut doc = Document::new(doc_id, built);
    set_paragraph_annotation(&mut doc, 2);
    doc.entity_mentions = entity_mentions_from_ner(&doc);
    doc.quotes = detect_quotes(&doc);
    doc
}

/// `" w1 w2 ... "` as interjection tokens
pub fn quote_tokens(words: &[&str]) -> Vec<Token> {
    let mut tokens = vec![token("\"", "``", "\"", "O")];
    tokens.extend(words.iter().map(|w| token(w, "UH", &w.to_lowercase(), "O")));
    tokens.push(token("\"", "''", "\"", "O"));
    tokens
}
