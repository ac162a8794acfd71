use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::cluster::ClusterId;

pub type MentionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionType {
    Pronominal,
    Nominal,
    Proper,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Number {
    Singular,
    Plural,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Neutral,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Animacy {
    Animate,
    Inanimate,
    #[default]
    Unknown,
}

/// A candidate referring expression
#[derive(Debug, Clone)]
pub struct Mention {
    /// Unique within the document, assigned by the preprocessor
    pub mention_id: MentionId,
    /// Gold backward link to the antecedent mention, if any
    pub original_ref: Option<MentionId>,
    pub sent_num: usize,
    /// First token of the span (inclusive)
    pub start_index: usize,
    /// One past the last token of the span
    pub end_index: usize,
    /// Head token position within the sentence
    pub head_index: usize,
    pub paragraph: Option<usize>,
    pub utter: usize,
    pub span_text: String,
    pub head_word: String,
    pub ner: String,
    pub gold_cluster_id: Option<usize>,
    pub has_twin: bool,
    /// Cluster currently holding this mention; changes on merge
    pub coref_cluster_id: Option<ClusterId>,
    pub mention_type: MentionType,
    pub number: Number,
    pub gender: Gender,
    pub animacy: Animacy,
    /// Node of the sentence parse covering the mention's noun phrase
    pub subtree: Option<usize>,
    /// Final document-wide order, assigned last
    pub mention_num: Option<usize>,
    pub appositions: BTreeSet<MentionId>,
    pub predicate_nominatives: BTreeSet<MentionId>,
    pub relative_pronouns: BTreeSet<MentionId>,
    pub list_members: BTreeSet<MentionId>,
    pub belongs_to_lists: BTreeSet<MentionId>,
}

impl Mention {
    /// A fresh span with no id; the preprocessor fills in the rest
    pub fn new(sent_num: usize, start_index: usize, end_index: usize, head_index: usize) -> Self {
        Self {
            mention_id: 0,
            original_ref: None,
            sent_num,
            start_index,
            end_index,
            head_index,
            paragraph: None,
            utter: 0,
            span_text: String::new(),
            head_word: String::new(),
            ner: "O".to_string(),
            gold_cluster_id: None,
            has_twin: false,
            coref_cluster_id: None,
            mention_type: MentionType::Nominal,
            number: Number::Unknown,
            gender: Gender::Unknown,
            animacy: Animacy::Unknown,
            subtree: None,
            mention_num: None,
            appositions: BTreeSet::new(),
            predicate_nominatives: BTreeSet::new(),
            relative_pronouns: BTreeSet::new(),
            list_members: BTreeSet::new(),
            belongs_to_lists: BTreeSet::new(),
        }
    }

    pub fn span(&self) -> (usize, usize) {
        (self.start_index, self.end_index)
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_pronominal(&self) -> bool {
        self.mention_type == MentionType::Pronominal
    }

    /// `self` lies within `other` in the same sentence
    pub fn inside_in(&self, other: &Mention) -> bool {
        self.sent_num == other.sent_num
            && other.start_index <= self.start_index
            && self.end_index <= other.end_index
    }

    /// `self` is an element of the list mention `other`
    pub fn is_list_member_of(&self, other: &Mention) -> bool {
        if self.mention_id == other.mention_id {
            return false;
        }
        if self.mention_type == MentionType::List || other.mention_type != MentionType::List {
            return false;
        }
        self.inside_in(other)
    }

    pub fn is_member_of_same_list(&self, other: &Mention) -> bool {
        self.belongs_to_lists
            .intersection(&other.belongs_to_lists)
            .next()
            .is_some()
    }

    pub fn add_apposition(&mut self, other: MentionId) {
        self.appositions.insert(other);
    }

    pub fn add_predicate_nominative(&mut self, other: MentionId) {
        self.predicate_nominatives.insert(other);
    }

    pub fn add_relative_pronoun(&mut self, other: MentionId) {
        self.relative_pronouns.insert(other);
    }

    pub fn add_list_member(&mut self, member: MentionId) {
        self.list_members.insert(member);
    }

    pub fn add_belongs_to_list(&mut self, list: MentionId) {
        self.belongs_to_lists.insert(list);
    }

    /// Canonical left-to-right, outer-to-inner order
    pub fn document_order(&self, other: &Mention) -> Ordering {
        self.sent_num
            .cmp(&other.sent_num)
            .then(self.start_index.cmp(&other.start_index))
            .then(other.end_index.cmp(&self.end_index))
            .then(self.head_index.cmp(&other.head_index))
            .then(list_first(self.mention_type, other.mention_type))
            .then(self.mention_id.cmp(&other.mention_id))
    }

    pub fn appear_earlier_than(&self, other: &Mention) -> bool {
        self.document_order(other) == Ordering::Less
    }
}

fn list_first(a: MentionType, b: MentionType) -> Ordering {
    match (a == MentionType::List, b == MentionType::List) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
