use std::collections::HashSet;

use tracing::debug;

use crate::models::{DependencyGraph, Document, Mention, MentionId, Token};

/// Cross-mention relation found from the dependency graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionRelation {
    Apposition,
    PredicateNominative,
    RelativePronoun,
}

/// Mark list membership, appositions, predicate nominatives and relative pronouns
/// between the mentions of each sentence.
pub fn mark_syntactic_relations(doc: &mut Document) {
    for sent_num in 0..doc.predicted_mentions.len() {
        let ids = doc.predicted_mentions[sent_num].clone();
        if ids.is_empty() {
            continue;
        }
        mark_list_members(doc, &ids);

        let Some(graph) = doc.sentences.get(sent_num).and_then(|s| s.dependencies()) else {
            debug!("No dependency graph for sentence {}, skipping relations", sent_num);
            continue;
        };
        let appositions = apposition_pairs(graph);
        let copulas = predicate_nominative_pairs(graph, &doc.sentences[sent_num].tokens);
        // Relative pronouns are never detected; the slot stays empty
        let relative_pronouns = HashSet::new();

        mark_relation(doc, &ids, &appositions, MentionRelation::Apposition);
        mark_relation(doc, &ids, &copulas, MentionRelation::PredicateNominative);
        mark_relation(doc, &ids, &relative_pronouns, MentionRelation::RelativePronoun);
    }
}

fn mark_list_members(doc: &mut Document, ids: &[MentionId]) {
    let mut links: Vec<(MentionId, MentionId)> = Vec::new();
    for &a in ids {
        for &b in ids {
            let (Some(m1), Some(m2)) = (doc.mention(a), doc.mention(b)) else {
                continue;
            };
            if m1.is_list_member_of(m2) {
                links.push((b, a));
            }
        }
    }
    for (list, member) in links {
        if let Some(m) = doc.mention_mut(list) {
            m.add_list_member(member);
        }
        if let Some(m) = doc.mention_mut(member) {
            m.add_belongs_to_list(list);
        }
    }
}

/// (governor, dependent) token pairs of `appos` edges
pub fn apposition_pairs(graph: &DependencyGraph) -> HashSet<(usize, usize)> {
    graph.pairs_with_relation("appos").collect()
}

/// (subject, predicate) token pairs of copular clauses.
///
/// A WH-word subject inside a relative clause is replaced by the noun the clause
/// modifies: in "Tim, who is a student" the subject becomes "Tim".
pub fn predicate_nominative_pairs(
    graph: &DependencyGraph,
    tokens: &[Token],
) -> HashSet<(usize, usize)> {
    let mut pairs = HashSet::new();
    for (predicate, _) in graph.pairs_with_relation("cop") {
        let Some(mut subject) = graph
            .child_with_relation(predicate, "nsubj")
            .or_else(|| graph.child_with_relation(predicate, "csubj"))
        else {
            continue;
        };

        if tokens.get(subject).is_some_and(|t| t.pos.starts_with('W')) {
            if let Some((parent, relation)) = graph.parent(predicate) {
                if matches!(relation, "acl:relcl" | "rcmod") {
                    subject = parent;
                }
            }
        }
        pairs.insert((subject, predicate));
    }
    pairs
}

fn in_list_relation(m1: &Mention, m2: &Mention) -> bool {
    m1.is_list_member_of(m2) || m2.is_list_member_of(m1) || m1.is_member_of_same_list(m2)
}

fn mark_relation(
    doc: &mut Document,
    ids: &[MentionId],
    pairs: &HashSet<(usize, usize)>,
    relation: MentionRelation,
) {
    if pairs.is_empty() {
        return;
    }
    let mut found: Vec<(MentionId, MentionId)> = Vec::new();
    for &a in ids {
        for &b in ids {
            if a == b {
                continue;
            }
            let (Some(m1), Some(m2)) = (doc.mention(a), doc.mention(b)) else {
                continue;
            };
            if in_list_relation(m1, m2) || !pairs.contains(&(m1.head_index, m2.head_index)) {
                continue;
            }
            let keep = match relation {
                // A shared head only counts when the apposition is nested
                MentionRelation::Apposition => m1.head_index != m2.head_index || m2.inside_in(m1),
                _ => true,
            };
            if keep {
                found.push((b, a));
            }
        }
    }

    for (target, other) in found {
        let Some(m) = doc.mention_mut(target) else {
            continue;
        };
        match relation {
            MentionRelation::Apposition => m.add_apposition(other),
            MentionRelation::PredicateNominative => m.add_predicate_nominative(other),
            MentionRelation::RelativePronoun => m.add_relative_pronoun(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyEdge, MentionType, Sentence};

    fn doc_with(words: &[(&str, &str)], edges: Vec<DependencyEdge>, spans: &[(usize, usize, usize)]) -> Document {
        let tokens = words.iter().map(|(w, p)| Token::new(w, p)).collect();
        let mut sentence = Sentence::new(tokens);
        sentence.basic_dependencies = Some(DependencyGraph::new(edges));
        let mut doc = Document::new("rel", vec![sentence]);
        for (id, &(start, end, head)) in spans.iter().enumerate() {
            let mut m = Mention::new(0, start, end, head);
            m.mention_id = id;
            doc.insert_predicted_mention(m);
        }
        doc
    }

    #[test]
    fn test_predicate_nominative() {
        // I(0) am(1) Joe(2)
        let mut doc = doc_with(
            &[("I", "PRP"), ("am", "VBP"), ("Joe", "NNP")],
            vec![
                DependencyEdge::new(None, 2, "root"),
                DependencyEdge::new(Some(2), 0, "nsubj"),
                DependencyEdge::new(Some(2), 1, "cop"),
            ],
            &[(0, 1, 0), (2, 3, 2)],
        );
        mark_syntactic_relations(&mut doc);
        assert!(doc.mention(1).unwrap().predicate_nominatives.contains(&0));
        assert!(doc.mention(0).unwrap().predicate_nominatives.is_empty());
    }

    #[test]
    fn test_relative_clause_subject_correction() {
        // Tim(0) ,(1) who(2) is(3) a(4) student(5)
        let mut doc = doc_with(
            &[("Tim", "NNP"), (",", ","), ("who", "WP"), ("is", "VBZ"), ("a", "DT"), ("student", "NN")],
            vec![
                DependencyEdge::new(None, 0, "root"),
                DependencyEdge::new(Some(0), 5, "acl:relcl"),
                DependencyEdge::new(Some(5), 2, "nsubj"),
                DependencyEdge::new(Some(5), 3, "cop"),
                DependencyEdge::new(Some(5), 4, "det"),
            ],
            &[(0, 1, 0), (4, 6, 5)],
        );
        mark_syntactic_relations(&mut doc);
        assert!(doc.mention(1).unwrap().predicate_nominatives.contains(&0));
    }

    #[test]
    fn test_apposition() {
        // Joe(0) ,(1) a(2) baker(3)
        let mut doc = doc_with(
            &[("Joe", "NNP"), (",", ","), ("a", "DT"), ("baker", "NN")],
            vec![
                DependencyEdge::new(None, 0, "root"),
                DependencyEdge::new(Some(0), 3, "appos"),
            ],
            &[(0, 1, 0), (2, 4, 3)],
        );
        mark_syntactic_relations(&mut doc);
        assert!(doc.mention(1).unwrap().appositions.contains(&0));
    }

    #[test]
    fn test_list_members_block_other_relations() {
        // Joe(0) and(1) Ann(2)
        let mut doc = doc_with(
            &[("Joe", "NNP"), ("and", "CC"), ("Ann", "NNP")],
            vec![
                DependencyEdge::new(None, 0, "root"),
                DependencyEdge::new(Some(0), 2, "appos"),
            ],
            &[(0, 3, 0), (0, 1, 0), (2, 3, 2)],
        );
        if let Some(list) = doc.mention_mut(0) {
            list.mention_type = MentionType::List;
        }
        mark_syntactic_relations(&mut doc);

        let list = doc.mention(0).unwrap();
        assert_eq!(list.list_members.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(doc.mention(1).unwrap().belongs_to_lists.contains(&0));
        // members of one list are never appositions of each other
        assert!(doc.mention(2).unwrap().appositions.is_empty());
        assert!(doc.mention(1).unwrap().appositions.is_empty());
    }
}
