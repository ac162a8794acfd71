use std::collections::{BTreeMap, HashMap, VecDeque};

use tracing::{debug, warn};

use super::{MentionSpan, RawMentions, TwinPolicy};
use crate::error::{DocumentError, DocumentResult};
use crate::models::{
    Dictionaries, Document, HeadFinder, Mention, MentionId, MentionType, Sentence,
};

/// Assign ids, match twins and fill per-mention information.
///
/// Gold mentions are numbered first, then predicted mentions, both sentence-major.
/// Returns the number of predicted mentions that found a gold twin.
pub fn initialize_mentions(
    doc: &mut Document,
    raw: &RawMentions,
    dict: &Dictionaries,
    policy: TwinPolicy,
    finder: &dyn HeadFinder,
) -> DocumentResult<usize> {
    let sentence_count = doc.sentences.len();
    let mut next_id: MentionId = 0;

    if let Some(gold) = &raw.gold {
        let mut lists = vec![Vec::new(); sentence_count];
        for (sent_num, spans) in gold.iter().enumerate().take(sentence_count) {
            for span in spans {
                let Some(mention) = build_mention(doc, sent_num, span, next_id, dict, finder)? else {
                    continue;
                };
                lists[sent_num].push(next_id);
                doc.gold_mentions_by_id.insert(next_id, mention);
                next_id += 1;
            }
        }
        doc.gold_mentions = Some(lists);
        derive_original_refs(doc);
    }

    let mut predicted: Vec<Vec<Mention>> = vec![Vec::new(); sentence_count];
    for (sent_num, spans) in raw.predicted.iter().enumerate().take(sentence_count) {
        for span in spans {
            if let Some(mention) = build_mention(doc, sent_num, span, next_id, dict, finder)? {
                predicted[sent_num].push(mention);
                next_id += 1;
            }
        }
    }

    let twins = if doc.gold_mentions.is_some() {
        match policy {
            TwinPolicy::Strict => find_twin_mentions_strict(doc, &mut predicted),
            TwinPolicy::Relaxed => find_twin_mentions_relaxed(doc, &mut predicted),
        }
    } else {
        0
    };

    fill_mention_info(doc, predicted, finder)?;
    Ok(twins)
}

fn build_mention(
    doc: &Document,
    sent_num: usize,
    span: &MentionSpan,
    id: MentionId,
    dict: &Dictionaries,
    finder: &dyn HeadFinder,
) -> DocumentResult<Option<Mention>> {
    let Some(sentence) = doc.sentences.get(sent_num) else {
        return Ok(None);
    };
    if span.start >= span.end || span.end > sentence.len() {
        warn!(
            "Dropping mention span [{}, {}) outside sentence {} of length {}",
            span.start,
            span.end,
            sent_num,
            sentence.len()
        );
        return Ok(None);
    }

    let head = span
        .head
        .unwrap_or_else(|| find_head(sentence, span.start, span.end, finder));
    if head >= sentence.len() {
        return Err(DocumentError::MissingHeadLeaf { mention: id, head });
    }

    let mut mention = Mention::new(sent_num, span.start, span.end, head);
    mention.mention_id = id;
    mention.gold_cluster_id = span.gold_cluster_id;
    mention.original_ref = span.original_ref;
    fill_features(sentence, &mut mention, span.mention_type, dict);
    Ok(Some(mention))
}

/// Head token of a span: the head of the parse node covering it exactly, otherwise
/// the rightmost noun or pronoun
pub fn find_head(sentence: &Sentence, start: usize, end: usize, finder: &dyn HeadFinder) -> usize {
    if let Some(tree) = &sentence.parse {
        let covering = (0..tree.node_count())
            .find(|&node| !tree.is_leaf(node) && tree.leaf_span(node) == (start, end));
        if let Some(node) = covering {
            let leaf = tree.head_terminal(node, finder);
            if let Some(index) = tree.node(leaf).and_then(|n| n.leaf_index) {
                if (start..end).contains(&index) {
                    return index;
                }
            }
        }
    }

    sentence.tokens[start..end]
        .iter()
        .rposition(|t| t.pos.starts_with("NN") || t.pos.starts_with("PRP"))
        .map(|offset| start + offset)
        .unwrap_or(end - 1)
}

fn fill_features(
    sentence: &Sentence,
    mention: &mut Mention,
    given_type: Option<MentionType>,
    dict: &Dictionaries,
) {
    let head = &sentence.tokens[mention.head_index];
    mention.span_text = sentence.span_text(mention.start_index, mention.end_index);
    mention.head_word = head.word.clone();
    mention.ner = head.ner.clone();
    mention.mention_type = given_type.unwrap_or_else(|| infer_type(sentence, mention, dict));
    mention.number = dict.number_of(&head.word, &head.pos);

    let gender_word = match mention.mention_type {
        MentionType::Proper => sentence.tokens[mention.start_index].word.as_str(),
        _ => head.word.as_str(),
    };
    mention.gender = dict.gender_of(gender_word);
    mention.animacy = dict.animacy_of(&head.word, &head.ner);
}

/// Pronoun, proper name or common noun phrase; lists are only ever given upstream
pub fn infer_type(sentence: &Sentence, mention: &Mention, dict: &Dictionaries) -> MentionType {
    let head = &sentence.tokens[mention.head_index];
    let single = mention.len() == 1;
    if head.pos.starts_with("PRP")
        || (single && head.pos.starts_with("WP"))
        || (single && dict.is_pronoun(&head.word))
    {
        MentionType::Pronominal
    } else if head.pos.starts_with("NNP") || (head.ner != "O" && !head.ner.is_empty()) {
        MentionType::Proper
    } else {
        MentionType::Nominal
    }
}

/// Gold input that only carries cluster ids gets backward links to the previous
/// mention of the same cluster.
fn derive_original_refs(doc: &mut Document) {
    if doc
        .gold_mentions_by_id
        .values()
        .any(|g| g.original_ref.is_some())
    {
        return;
    }
    let mut last_seen: HashMap<usize, MentionId> = HashMap::new();
    for gold in doc.gold_mentions_by_id.values_mut() {
        if let Some(cluster) = gold.gold_cluster_id {
            gold.original_ref = last_seen.insert(cluster, gold.mention_id);
        }
    }
}

fn gold_ids_in(doc: &Document, sent_num: usize) -> Vec<MentionId> {
    doc.gold_mentions
        .as_ref()
        .and_then(|lists| lists.get(sent_num))
        .cloned()
        .unwrap_or_default()
}

fn claim_twin(doc: &mut Document, predicted: &mut Mention, gold_id: MentionId) {
    predicted.mention_id = gold_id;
    predicted.has_twin = true;
    if let Some(gold) = doc.gold_mentions_by_id.get_mut(&gold_id) {
        gold.has_twin = true;
    }
}

/// Pair predicted and gold mentions with identical spans
pub fn find_twin_mentions_strict(doc: &mut Document, predicted: &mut [Vec<Mention>]) -> usize {
    let mut twins = 0;
    for (sent_num, mentions) in predicted.iter_mut().enumerate() {
        let mut pool: BTreeMap<(usize, usize), Vec<MentionId>> = BTreeMap::new();
        for gold_id in gold_ids_in(doc, sent_num) {
            let Some(gold) = doc.gold_mentions_by_id.get(&gold_id) else {
                continue;
            };
            let span = gold.span();
            let existing = pool.entry(span).or_default();
            if !existing.is_empty() {
                warn!(
                    "Gold mentions with the same offsets {:?}: {} and {:?} ({})",
                    span, gold_id, existing, gold.span_text
                );
            }
            existing.push(gold_id);
        }

        for mention in mentions.iter_mut() {
            let span = mention.span();
            let Some(candidates) = pool.get_mut(&span) else {
                continue;
            };
            let Some((slot, &gold_id)) = candidates.iter().enumerate().min_by_key(|(_, id)| **id)
            else {
                continue;
            };
            candidates.remove(slot);
            if candidates.is_empty() {
                pool.remove(&span);
            }
            claim_twin(doc, mention, gold_id);
            twins += 1;
        }
    }
    debug!("Strict twin matching paired {} mentions", twins);
    twins
}

/// Exact spans first, then the earliest remaining gold mention sharing the head token
pub fn find_twin_mentions_relaxed(doc: &mut Document, predicted: &mut [Vec<Mention>]) -> usize {
    let mut twins = 0;
    for (sent_num, mentions) in predicted.iter_mut().enumerate() {
        let mut by_span: HashMap<(usize, usize), MentionId> = HashMap::new();
        let mut by_head: HashMap<usize, VecDeque<MentionId>> = HashMap::new();
        for gold_id in gold_ids_in(doc, sent_num) {
            let Some(gold) = doc.gold_mentions_by_id.get(&gold_id) else {
                continue;
            };
            by_span.entry(gold.span()).or_insert(gold_id);
            by_head.entry(gold.head_index).or_default().push_back(gold_id);
        }

        let mut remains = Vec::new();
        for (slot, mention) in mentions.iter_mut().enumerate() {
            match by_span.remove(&mention.span()) {
                Some(gold_id) => {
                    if let Some(queue) = by_head.get_mut(&mention.head_index) {
                        queue.retain(|&id| id != gold_id);
                    }
                    for queue in by_head.values_mut() {
                        queue.retain(|&id| id != gold_id);
                    }
                    claim_twin(doc, mention, gold_id);
                    twins += 1;
                }
                None => remains.push(slot),
            }
        }

        for slot in remains {
            let mention = &mut mentions[slot];
            let Some(gold_id) = by_head
                .get_mut(&mention.head_index)
                .and_then(VecDeque::pop_front)
            else {
                continue;
            };
            claim_twin(doc, mention, gold_id);
            twins += 1;
        }
    }
    debug!("Relaxed twin matching paired {} mentions", twins);
    twins
}

/// Register predicted mentions with the document: positions, head positions and
/// the noun-phrase subtree sharing the mention's head.
fn fill_mention_info(
    doc: &mut Document,
    predicted: Vec<Vec<Mention>>,
    finder: &dyn HeadFinder,
) -> DocumentResult<()> {
    doc.predicted_mentions = vec![Vec::new(); doc.sentences.len()];
    for (sent_num, mentions) in predicted.into_iter().enumerate() {
        for (j, mut mention) in mentions.into_iter().enumerate() {
            mention.sent_num = sent_num;
            let id = mention.mention_id;

            if let Some(tree) = &doc.sentences[sent_num].parse {
                let head_leaf = tree.leaf(mention.head_index).ok_or(
                    DocumentError::MissingHeadLeaf {
                        mention: id,
                        head: mention.head_index,
                    },
                )?;
                mention.subtree = Some(tree.noun_phrase_for_head(head_leaf, finder));
            }

            doc.positions.insert(id, (sent_num, j));
            doc.mention_head_positions
                .insert((sent_num, mention.head_index), id);
            doc.insert_predicted_mention(mention);
        }
    }
    doc.all_positions = doc.positions.clone();
    Ok(())
}

/// Sort each sentence's mentions outer-to-inner, left-to-right, and refresh positions
pub fn reorder_mentions(doc: &mut Document) {
    let by_id = &doc.predicted_mentions_by_id;
    for ids in &mut doc.predicted_mentions {
        ids.sort_by(|a, b| match (by_id.get(a), by_id.get(b)) {
            (Some(x), Some(y)) => x.document_order(y),
            _ => a.cmp(b),
        });
    }
    for (sent_num, ids) in doc.predicted_mentions.iter().enumerate() {
        for (j, id) in ids.iter().enumerate() {
            doc.positions.insert(*id, (sent_num, j));
        }
    }
    doc.all_positions = doc.positions.clone();
}
