use serde::Serialize;

use super::annotation::{AnnotationKey, AnnotationMap};

/// A named-entity mention as produced by the upstream entity-mention annotator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMention {
    pub text: String,
    pub sentence: usize,
    /// Document-wide token index of the first token
    pub token_begin: usize,
    /// Document-wide token index one past the last token
    pub token_end: usize,
    pub entity_type: String,
    /// Index of the canonical (fullest) entity mention of the same entity
    pub canonical: Option<usize>,
}

/// Kind of the direct speaker mention found for a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CharacterMentionKind {
    Name,
    Pronoun,
    AnimateNoun,
}

impl CharacterMentionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterMentionKind::Name => "name",
            CharacterMentionKind::Pronoun => "pronoun",
            CharacterMentionKind::AnimateNoun => "animate noun",
        }
    }
}

pub struct QuoteMentionTextAnnotation;
impl AnnotationKey for QuoteMentionTextAnnotation {
    type Value = String;
    const NAME: &'static str = "MentionText";
}

/// Document-wide token index of the first token of the direct mention
pub struct QuoteMentionBeginAnnotation;
impl AnnotationKey for QuoteMentionBeginAnnotation {
    type Value = usize;
    const NAME: &'static str = "MentionBegin";
}

/// Document-wide token index one past the direct mention
pub struct QuoteMentionEndAnnotation;
impl AnnotationKey for QuoteMentionEndAnnotation {
    type Value = usize;
    const NAME: &'static str = "MentionEnd";
}

pub struct QuoteMentionTypeAnnotation;
impl AnnotationKey for QuoteMentionTypeAnnotation {
    type Value = CharacterMentionKind;
    const NAME: &'static str = "MentionType";
}

pub struct QuoteMentionSieveAnnotation;
impl AnnotationKey for QuoteMentionSieveAnnotation {
    type Value = String;
    const NAME: &'static str = "MentionSieve";
}

pub struct QuoteSpeakerAnnotation;
impl AnnotationKey for QuoteSpeakerAnnotation {
    type Value = String;
    const NAME: &'static str = "Speaker";
}

pub struct QuoteSpeakerSieveAnnotation;
impl AnnotationKey for QuoteSpeakerSieveAnnotation {
    type Value = String;
    const NAME: &'static str = "SpeakerSieve";
}

pub struct CanonicalMentionAnnotation;
impl AnnotationKey for CanonicalMentionAnnotation {
    type Value = String;
    const NAME: &'static str = "CanonicalMention";
}

pub struct CanonicalMentionBeginAnnotation;
impl AnnotationKey for CanonicalMentionBeginAnnotation {
    type Value = usize;
    const NAME: &'static str = "CanonicalMentionBegin";
}

pub struct CanonicalMentionEndAnnotation;
impl AnnotationKey for CanonicalMentionEndAnnotation {
    type Value = usize;
    const NAME: &'static str = "CanonicalMentionEnd";
}

/// A direct speaker mention chosen for a quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionResolution {
    pub text: String,
    pub token_begin: usize,
    pub token_end: usize,
    pub kind: CharacterMentionKind,
}

/// A quoted span; identity is its position in the document's quote list
#[derive(Debug, Clone, Default)]
pub struct Quotation {
    pub index: usize,
    pub text: String,
    pub begin_char: Option<usize>,
    pub end_char: Option<usize>,
    /// Document-wide token range, half-open, including the quote glyphs
    pub token_begin: usize,
    pub token_end: usize,
    pub sentence_begin: usize,
    /// Last sentence touched by the quote (inclusive)
    pub sentence_end: usize,
    /// Attribution fields are written here
    pub annotations: AnnotationMap,
}

impl Quotation {
    pub fn has_mention(&self) -> bool {
        self.annotations.contains::<QuoteMentionBeginAnnotation>()
    }

    pub fn has_speaker(&self) -> bool {
        self.annotations.contains::<QuoteSpeakerAnnotation>()
    }

    pub fn mention_span(&self) -> Option<(usize, usize)> {
        let begin = *self.annotations.get::<QuoteMentionBeginAnnotation>()?;
        let end = *self.annotations.get::<QuoteMentionEndAnnotation>()?;
        Some((begin, end))
    }

    pub fn mention_text(&self) -> Option<&str> {
        self.annotations
            .get::<QuoteMentionTextAnnotation>()
            .map(String::as_str)
    }

    pub fn mention_kind(&self) -> Option<CharacterMentionKind> {
        self.annotations.get::<QuoteMentionTypeAnnotation>().copied()
    }

    pub fn mention_sieve(&self) -> Option<&str> {
        self.annotations
            .get::<QuoteMentionSieveAnnotation>()
            .map(String::as_str)
    }

    pub fn speaker(&self) -> Option<&str> {
        self.annotations
            .get::<QuoteSpeakerAnnotation>()
            .map(String::as_str)
    }

    pub fn speaker_sieve(&self) -> Option<&str> {
        self.annotations
            .get::<QuoteSpeakerSieveAnnotation>()
            .map(String::as_str)
    }

    pub fn canonical_mention(&self) -> Option<&str> {
        self.annotations
            .get::<CanonicalMentionAnnotation>()
            .map(String::as_str)
    }

    pub fn canonical_span(&self) -> Option<(usize, usize)> {
        let begin = *self.annotations.get::<CanonicalMentionBeginAnnotation>()?;
        let end = *self.annotations.get::<CanonicalMentionEndAnnotation>()?;
        Some((begin, end))
    }

    pub fn set_mention(&mut self, resolution: MentionResolution, sieve: &str) {
        self.annotations
            .set::<QuoteMentionTextAnnotation>(resolution.text);
        self.annotations
            .set::<QuoteMentionBeginAnnotation>(resolution.token_begin);
        self.annotations
            .set::<QuoteMentionEndAnnotation>(resolution.token_end);
        self.annotations
            .set::<QuoteMentionTypeAnnotation>(resolution.kind);
        self.annotations
            .set::<QuoteMentionSieveAnnotation>(sieve.to_string());
    }

    pub fn set_speaker(&mut self, speaker: String, sieve: &str) {
        self.annotations.set::<QuoteSpeakerAnnotation>(speaker);
        self.annotations
            .set::<QuoteSpeakerSieveAnnotation>(sieve.to_string());
    }

    pub fn set_canonical(&mut self, text: String, token_begin: usize, token_end: usize) {
        self.annotations.set::<CanonicalMentionAnnotation>(text);
        self.annotations
            .set::<CanonicalMentionBeginAnnotation>(token_begin);
        self.annotations
            .set::<CanonicalMentionEndAnnotation>(token_end);
    }

    /// Whether a document-wide token index falls inside the quote
    pub fn contains_token(&self, token: usize) -> bool {
        (self.token_begin..self.token_end).contains(&token)
    }
}
