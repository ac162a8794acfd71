use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use super::annotation::{AnnotationMap, UseMarkedDiscourseAnnotation};
use super::cluster::{ClusterId, CorefCluster};
use super::mention::{Mention, MentionId};
use super::quote::{EntityMention, Quotation};
use super::speaker::SpeakerInfo;
use super::token::{Sentence, Token};
use crate::error::{DocumentError, DocumentResult};
use crate::rules::is_acronym;

/// (sentence index, index within the sentence's mention list or token list)
pub type Position = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocType {
    Conversation,
    #[default]
    Article,
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Owns every piece of mutable state for one document
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub doc_id: String,
    pub sentences: Vec<Sentence>,
    /// Document-level annotations
    pub annotations: AnnotationMap,
    pub doc_type: DocType,
    /// Set when the document was read from CoNLL input
    pub conll_doc: bool,

    /// Predicted mention ids per sentence, in canonical order
    pub predicted_mentions: Vec<Vec<MentionId>>,
    /// Gold mention ids per sentence, when gold data is present
    pub gold_mentions: Option<Vec<Vec<MentionId>>>,
    pub predicted_mentions_by_id: BTreeMap<MentionId, Mention>,
    pub gold_mentions_by_id: BTreeMap<MentionId, Mention>,

    /// Working positions; mentions pruned later are removed here
    pub positions: BTreeMap<MentionId, Position>,
    /// Frozen copy of `positions` taken before any pruning
    pub all_positions: BTreeMap<MentionId, Position>,
    /// (sentence, head token) to the mention headed there
    pub mention_head_positions: HashMap<Position, MentionId>,

    pub coref_clusters: BTreeMap<ClusterId, CorefCluster>,
    pub gold_clusters: BTreeMap<usize, CorefCluster>,
    incompatibles: HashSet<(MentionId, MentionId)>,
    incompatible_clusters: HashSet<(ClusterId, ClusterId)>,
    acronym_cache: HashMap<(ClusterId, ClusterId), bool>,

    /// Utterance index to speaker identifier
    pub speakers: BTreeMap<usize, String>,
    pub speaker_info_map: BTreeMap<String, SpeakerInfo>,
    /// (mention, speaker mention) pairs
    pub speaker_pairs: BTreeSet<(MentionId, MentionId)>,
    pub speaker_info_given: bool,
    pub max_utter: usize,
    pub num_paragraphs: usize,

    pub quotes: Vec<Quotation>,
    pub entity_mentions: Vec<EntityMention>,

    gold_links: Option<Vec<(MentionId, MentionId)>>,
}

impl Document {
    pub fn new(doc_id: &str, mut sentences: Vec<Sentence>) -> Self {
        let mut offset = 0;
        for sentence in &mut sentences {
            sentence.token_offset = offset;
            offset += sentence.tokens.len();
        }
        let sentence_count = sentences.len();
        Self {
            doc_id: doc_id.to_string(),
            sentences,
            predicted_mentions: vec![Vec::new(); sentence_count],
            ..Default::default()
        }
    }

    pub fn use_marked_discourse(&self) -> bool {
        self.annotations
            .get::<UseMarkedDiscourseAnnotation>()
            .copied()
            .unwrap_or(false)
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(|s| s.tokens.len()).sum()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.sentences.iter().flat_map(|s| s.tokens.iter())
    }

    pub fn tokens_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.sentences.iter_mut().flat_map(|s| s.tokens.iter_mut())
    }

    /// Map a document-wide token index to (sentence, index within sentence)
    pub fn locate_token(&self, global: usize) -> Option<Position> {
        let sent = self
            .sentences
            .partition_point(|s| s.token_offset <= global)
            .checked_sub(1)?;
        let idx = global - self.sentences[sent].token_offset;
        (idx < self.sentences[sent].tokens.len()).then_some((sent, idx))
    }

    pub fn global_index(&self, sent: usize, idx: usize) -> usize {
        self.sentences
            .get(sent)
            .map(|s| s.token_offset + idx)
            .unwrap_or(idx)
    }

    pub fn token(&self, global: usize) -> Option<&Token> {
        let (sent, idx) = self.locate_token(global)?;
        self.sentences[sent].tokens.get(idx)
    }

    pub fn token_at(&self, sent: usize, idx: usize) -> Option<&Token> {
        self.sentences.get(sent).and_then(|s| s.tokens.get(idx))
    }

    /// Space-joined words of a document-wide half-open token range
    pub fn text_between(&self, begin: usize, end: usize) -> String {
        (begin..end)
            .filter_map(|i| self.token(i))
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn mention(&self, id: MentionId) -> Option<&Mention> {
        self.predicted_mentions_by_id.get(&id)
    }

    pub fn mention_mut(&mut self, id: MentionId) -> Option<&mut Mention> {
        self.predicted_mentions_by_id.get_mut(&id)
    }

    /// Predicted mentions in canonical document order
    pub fn ordered_mentions(&self) -> impl Iterator<Item = &Mention> {
        self.predicted_mentions
            .iter()
            .flatten()
            .filter_map(|id| self.predicted_mentions_by_id.get(id))
    }

    pub fn head_token(&self, mention: &Mention) -> Option<&Token> {
        self.token_at(mention.sent_num, mention.head_index)
    }

    pub fn mention_at_head(&self, sent: usize, head: usize) -> Option<&Mention> {
        self.mention_head_positions
            .get(&(sent, head))
            .and_then(|id| self.predicted_mentions_by_id.get(id))
    }

    /// Add a predicted mention at the end of its sentence's list
    pub fn insert_predicted_mention(&mut self, mention: Mention) {
        if self.predicted_mentions.len() <= mention.sent_num {
            self.predicted_mentions.resize(mention.sent_num + 1, Vec::new());
        }
        self.predicted_mentions[mention.sent_num].push(mention.mention_id);
        self.predicted_mentions_by_id
            .insert(mention.mention_id, mention);
    }

    pub fn cluster_of(&self, mention: MentionId) -> Option<ClusterId> {
        self.predicted_mentions_by_id
            .get(&mention)
            .and_then(|m| m.coref_cluster_id)
    }

    pub fn speaker_info(&self, speaker: &str) -> Option<&SpeakerInfo> {
        self.speaker_info_map.get(speaker)
    }

    pub fn is_incompatible(&self, a: MentionId, b: MentionId) -> bool {
        self.incompatibles.contains(&ordered(a, b))
    }

    pub fn is_incompatible_clusters(&self, a: ClusterId, b: ClusterId) -> bool {
        self.incompatible_clusters.contains(&ordered(a, b))
    }

    /// Mark two mentions, and the clusters currently holding them, as never mergeable
    pub fn add_incompatible(&mut self, a: MentionId, b: MentionId) {
        let cluster_a = self.cluster_of(a).unwrap_or(a);
        let cluster_b = self.cluster_of(b).unwrap_or(b);
        self.incompatibles.insert(ordered(a, b));
        self.incompatible_clusters
            .insert(ordered(cluster_a, cluster_b));
    }

    pub fn incompatible_cluster_pairs(&self) -> impl Iterator<Item = &(ClusterId, ClusterId)> {
        self.incompatible_clusters.iter()
    }

    /// Rewrite every cluster incompatibility touching `from` to touch `to` instead
    pub fn merge_incompatibles(&mut self, to: ClusterId, from: ClusterId) {
        if to == from {
            return;
        }
        let touching: Vec<(ClusterId, ClusterId)> = self
            .incompatible_clusters
            .iter()
            .filter(|(a, b)| *a == from || *b == from)
            .copied()
            .collect();
        for pair in touching {
            self.incompatible_clusters.remove(&pair);
            let other = if pair.0 == from { pair.1 } else { pair.0 };
            if other != to && other != from {
                self.incompatible_clusters.insert(ordered(other, to));
            }
        }
    }

    /// Same rewrite as [`merge_incompatibles`](Self::merge_incompatibles) for cached
    /// acronym results. Only positive results survive the merge.
    pub fn merge_acronym_cache(&mut self, to: ClusterId, from: ClusterId) {
        if to == from {
            return;
        }
        let touching: Vec<((ClusterId, ClusterId), bool)> = self
            .acronym_cache
            .iter()
            .filter(|((a, b), _)| *a == from || *b == from)
            .map(|(pair, value)| (*pair, *value))
            .collect();
        for (pair, value) in touching {
            self.acronym_cache.remove(&pair);
            let other = if pair.0 == from { pair.1 } else { pair.0 };
            if value && other != to && other != from {
                self.acronym_cache.insert(ordered(other, to), true);
            }
        }
    }

    /// Move every member of `from` into `to`, keeping all derived relations consistent.
    /// The losing cluster stays in the map, empty.
    pub fn merge_clusters(&mut self, to: ClusterId, from: ClusterId) {
        if to == from {
            return;
        }
        self.merge_incompatibles(to, from);
        self.merge_acronym_cache(to, from);

        let moved = self
            .coref_clusters
            .get_mut(&from)
            .map(|c| std::mem::take(&mut c.members))
            .unwrap_or_default();
        for id in &moved {
            if let Some(mention) = self.predicted_mentions_by_id.get_mut(id) {
                mention.coref_cluster_id = Some(to);
            }
        }
        debug!("Merged cluster {} into {} ({} mentions)", from, to, moved.len());
        self.coref_clusters
            .entry(to)
            .or_insert_with(|| CorefCluster::new(to))
            .members
            .extend(moved);
    }

    pub fn cached_acronym(&self, a: ClusterId, b: ClusterId) -> Option<bool> {
        self.acronym_cache.get(&ordered(a, b)).copied()
    }

    /// Whether any mention of one cluster is an acronym of a mention of the other, memoized
    pub fn cluster_acronym(&mut self, a: ClusterId, b: ClusterId) -> bool {
        let key = ordered(a, b);
        if let Some(&cached) = self.acronym_cache.get(&key) {
            return cached;
        }
        let words_of = |cluster: ClusterId| {
            self.coref_clusters
                .get(&cluster)
                .into_iter()
                .flat_map(|c| c.members.iter())
                .filter_map(|id| self.predicted_mentions_by_id.get(id))
                .map(|m| m.span_text.split_whitespace().collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        let left = words_of(a);
        let right = words_of(b);
        let result = left
            .iter()
            .any(|l| right.iter().any(|r| is_acronym(l, r)));
        self.acronym_cache.insert(key, result);
        result
    }

    /// Every mention belongs to exactly one cluster and agrees with it
    pub fn clusters_partition_mentions(&self) -> bool {
        let mut seen = HashSet::new();
        for cluster in self.coref_clusters.values() {
            for &id in &cluster.members {
                if !seen.insert(id) || self.cluster_of(id) != Some(cluster.cluster_id) {
                    return false;
                }
            }
        }
        seen.len() == self.predicted_mentions_by_id.len()
    }

    /// Both mentions are gold mentions of the same gold cluster
    pub fn is_coref(&self, a: MentionId, b: MentionId) -> bool {
        match (self.gold_mentions_by_id.get(&a), self.gold_mentions_by_id.get(&b)) {
            (Some(x), Some(y)) => x.gold_cluster_id.is_some() && x.gold_cluster_id == y.gold_cluster_id,
            _ => false,
        }
    }

    /// All pairwise (anaphor, antecedent) gold links, computed once
    pub fn extract_gold_links(&mut self) -> DocumentResult<&[(MentionId, MentionId)]> {
        if self.gold_links.is_none() {
            let links = self.compute_gold_links()?;
            debug!("Extracted {} gold links", links.len());
            self.gold_links = Some(links);
        }
        Ok(self.gold_links.as_deref().unwrap_or(&[]))
    }

    fn compute_gold_links(&mut self) -> DocumentResult<Vec<(MentionId, MentionId)>> {
        let Some(gold) = self.gold_mentions.clone() else {
            return Ok(Vec::new());
        };

        let mut positions: HashMap<MentionId, Position> = HashMap::new();
        let mut antecedents: HashMap<MentionId, Vec<Position>> = HashMap::new();
        let mut refs: HashMap<MentionId, Option<MentionId>> = HashMap::new();
        for (i, sentence) in gold.iter().enumerate() {
            for (j, &id) in sentence.iter().enumerate() {
                positions.insert(id, (i, j));
                antecedents.insert(id, Vec::new());
                let original_ref = self
                    .gold_mentions_by_id
                    .get(&id)
                    .and_then(|m| m.original_ref);
                refs.insert(id, original_ref);
            }
        }

        type Link = (Position, Position);
        fn add_link(link: Link, links: &mut Vec<Link>, link_set: &mut HashSet<Link>) {
            if link_set.insert(link) {
                links.push(link);
            }
        }
        let mut links: Vec<Link> = Vec::new();
        let mut link_set: HashSet<Link> = HashSet::new();

        for sentence in &gold {
            for &id in sentence {
                let Some(&src) = positions.get(&id) else {
                    continue;
                };
                let Some(first_ref) = refs.get(&id).copied().flatten() else {
                    continue;
                };
                let mut dst = *positions
                    .get(&first_ref)
                    .ok_or(DocumentError::MissingGoldAntecedent { id: first_ref })?;

                // Cataphoric annotation: reverse the chain until the antecedent precedes the anaphor
                let mut current_ref = Some(first_ref);
                let mut visited = HashSet::new();
                while dst > src {
                    let dst_id = gold[dst.0][dst.1];
                    if !visited.insert(dst_id) {
                        return Err(DocumentError::CyclicGoldChain { id });
                    }
                    let dst_ref = refs.get(&dst_id).copied().flatten();
                    refs.insert(id, dst_ref);
                    refs.insert(dst_id, Some(id));
                    current_ref = dst_ref;
                    match dst_ref {
                        Some(next) => {
                            dst = *positions
                                .get(&next)
                                .ok_or(DocumentError::MissingGoldAntecedent { id: next })?;
                        }
                        None => break,
                    }
                }
                let Some(ref_id) = current_ref else {
                    continue;
                };
                if ref_id == id {
                    return Err(DocumentError::CyclicGoldChain { id });
                }

                // A <- B and A <- C: make the link B <- C
                for k in dst.0..=src.0 {
                    for l in 0..gold[k].len() {
                        if k == dst.0 && l < dst.1 {
                            continue;
                        }
                        if k == src.0 && l > src.1 {
                            break;
                        }
                        let missed = (k, l);
                        if link_set.contains(&(missed, dst)) {
                            antecedents.entry(id).or_default().push(missed);
                            add_link((src, missed), &mut links, &mut link_set);
                        }
                    }
                }

                add_link((src, dst), &mut links, &mut link_set);
                antecedents.entry(id).or_default().push(dst);
                let inherited = antecedents.get(&ref_id).cloned().unwrap_or_default();
                for ant in inherited {
                    antecedents.entry(id).or_default().push(ant);
                    add_link((src, ant), &mut links, &mut link_set);
                }
            }
        }

        for (id, original_ref) in refs {
            if let Some(mention) = self.gold_mentions_by_id.get_mut(&id) {
                mention.original_ref = original_ref;
            }
        }

        Ok(links
            .into_iter()
            .map(|(a, b)| (gold[a.0][a.1], gold[b.0][b.1]))
            .collect())
    }
}
