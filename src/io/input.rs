use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::models::{
    DependencyEdge, DependencyGraph, Document, EntityMention, MentionType, ParseTree, Sentence,
    SpeakerAnnotation, Token, UseMarkedDiscourseAnnotation, UtteranceAnnotation,
};
use crate::sieves::quotation_from_tokens;
use crate::stages::{MentionSpan, RawMentions};

/// Serialized document handed over by the upstream annotators
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInput {
    pub doc_id: String,
    /// Keep upstream speaker and utterance marks
    #[serde(default)]
    pub use_marked_discourse: bool,
    /// The document came from a CoNLL file, so speakers are raw metadata
    #[serde(default)]
    pub conll: bool,
    pub sentences: Vec<SentenceInput>,
    #[serde(default)]
    pub entity_mentions: Vec<EntityMentionInput>,
    /// Quotations as document-wide half-open token ranges
    #[serde(default)]
    pub quotes: Vec<QuoteInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentenceInput {
    pub tokens: Vec<TokenInput>,
    /// Penn Treebank bracketed parse
    #[serde(default)]
    pub parse: Option<String>,
    #[serde(default)]
    pub basic_dependencies: Option<Vec<DependencyEdge>>,
    #[serde(default)]
    pub enhanced_dependencies: Option<Vec<DependencyEdge>>,
    #[serde(default)]
    pub chunk_tags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<MentionInput>,
    #[serde(default)]
    pub gold_mentions: Option<Vec<MentionInput>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInput {
    pub word: String,
    #[serde(default)]
    pub lemma: Option<String>,
    pub pos: String,
    #[serde(default)]
    pub ner: Option<String>,
    #[serde(default)]
    pub begin_char: Option<usize>,
    #[serde(default)]
    pub end_char: Option<usize>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub utterance: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionInput {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub head: Option<usize>,
    #[serde(default, rename = "type")]
    pub mention_type: Option<MentionType>,
    #[serde(default)]
    pub gold_cluster: Option<usize>,
    #[serde(default)]
    pub original_ref: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityMentionInput {
    pub token_begin: usize,
    pub token_end: usize,
    pub entity_type: String,
    #[serde(default)]
    pub canonical: Option<usize>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuoteInput {
    pub token_begin: usize,
    pub token_end: usize,
}

/// Parse a document JSON file
pub fn parse_document_file(path: &Path) -> Result<(Document, RawMentions)> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_document_json(&content).with_context(|| format!("Invalid document: {:?}", path))
}

/// Parse a document JSON string
pub fn parse_document_json(json: &str) -> Result<(Document, RawMentions)> {
    let input: DocumentInput =
        serde_json::from_str(json).context("Failed to parse document JSON")?;
    build_document(input)
}

/// Convert the serialized form into a document and its raw mention spans
pub fn build_document(input: DocumentInput) -> Result<(Document, RawMentions)> {
    let has_gold = input.sentences.iter().any(|s| s.gold_mentions.is_some());
    let mut sentences = Vec::with_capacity(input.sentences.len());
    let mut predicted = Vec::with_capacity(input.sentences.len());
    let mut gold = Vec::with_capacity(input.sentences.len());

    for (sent_num, sentence) in input.sentences.into_iter().enumerate() {
        let tokens: Vec<Token> = sentence.tokens.into_iter().map(build_token).collect();
        let mut built = Sentence::new(tokens);
        if let Some(parse) = &sentence.parse {
            let tree = ParseTree::parse(parse)
                .with_context(|| format!("Bad parse in sentence {}", sent_num))?;
            if tree.leaf_count() != built.len() {
                bail!(
                    "Parse of sentence {} has {} leaves for {} tokens",
                    sent_num,
                    tree.leaf_count(),
                    built.len()
                );
            }
            built.parse = Some(tree);
        }
        built.basic_dependencies = sentence.basic_dependencies.map(DependencyGraph::new);
        built.enhanced_dependencies = sentence.enhanced_dependencies.map(DependencyGraph::new);
        built.chunk_tags = sentence.chunk_tags;
        sentences.push(built);

        predicted.push(sentence.mentions.into_iter().map(build_span).collect());
        gold.push(
            sentence
                .gold_mentions
                .unwrap_or_default()
                .into_iter()
                .map(build_span)
                .collect(),
        );
    }

    let mut doc = Document::new(&input.doc_id, sentences);
    doc.conll_doc = input.conll;
    doc.annotations
        .set::<UseMarkedDiscourseAnnotation>(input.use_marked_discourse);

    for entity in input.entity_mentions {
        let Some((sentence, _)) = doc.locate_token(entity.token_begin) else {
            bail!("Entity mention starts outside the document at token {}", entity.token_begin);
        };
        doc.entity_mentions.push(EntityMention {
            text: doc.text_between(entity.token_begin, entity.token_end),
            sentence,
            token_begin: entity.token_begin,
            token_end: entity.token_end,
            entity_type: entity.entity_type,
            canonical: entity.canonical,
        });
    }

    let token_count = doc.token_count();
    for (index, quote) in input.quotes.into_iter().enumerate() {
        if quote.token_begin >= quote.token_end || quote.token_end > token_count {
            bail!(
                "Quote {} has an invalid token range {}..{}",
                index,
                quote.token_begin,
                quote.token_end
            );
        }
        let quotation = quotation_from_tokens(&doc, index, quote.token_begin, quote.token_end);
        doc.quotes.push(quotation);
    }

    let raw = RawMentions {
        predicted,
        gold: has_gold.then_some(gold),
    };
    Ok((doc, raw))
}

fn build_token(input: TokenInput) -> Token {
    let mut token = Token::new(&input.word, &input.pos);
    if let Some(lemma) = input.lemma {
        token.lemma = lemma;
    }
    if let Some(ner) = input.ner {
        token.ner = ner;
    }
    token.begin_char = input.begin_char;
    token.end_char = input.end_char;
    if let Some(speaker) = input.speaker {
        token.annotations.set::<SpeakerAnnotation>(speaker);
    }
    if let Some(utterance) = input.utterance {
        token.annotations.set::<UtteranceAnnotation>(utterance);
    }
    token
}

fn build_span(input: MentionInput) -> MentionSpan {
    MentionSpan {
        start: input.start,
        end: input.end,
        head: input.head,
        mention_type: input.mention_type,
        gold_cluster_id: input.gold_cluster,
        original_ref: input.original_ref,
    }
}
