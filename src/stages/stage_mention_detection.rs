use tracing::debug;

use super::stage0_mentions::find_head;
use super::MentionSpan;
use crate::error::DocumentResult;
use crate::io::decode_chunks;
use crate::models::{Document, HeadFinder, ParseTree, Sentence};

/// Entity types that never form a mention on their own
const NON_MENTION_NER: &[&str] = &[
    "O", "QUANTITY", "CARDINAL", "PERCENT", "DATE", "DURATION", "TIME", "SET",
];

const NEGATIVE_QUANTIFIERS: &[&str] = &["none", "no", "nothing", "not"];

pub fn detect_mentions(
    doc: &Document,
    finder: &dyn HeadFinder,
) -> DocumentResult<Vec<Vec<MentionSpan>>> {
    let mut detected = Vec::with_capacity(doc.sentences.len());
    for (sent_num, sentence) in doc.sentences.iter().enumerate() {
        let named = named_entity_spans(sentence);
        let mut spans = named.clone();

        let phrases = match &sentence.parse {
            Some(tree) => np_or_prp_spans(tree),
            None if !sentence.chunk_tags.is_empty() => decode_chunks(&sentence.chunk_tags)?
                .into_iter()
                .filter(|c| c.label.as_deref() == Some("NP"))
                .map(|c| (c.start, c.end))
                .collect(),
            None => Vec::new(),
        };
        for span in phrases {
            let inside_named = named.iter().any(|ne| ne.0 <= span.0 && span.1 <= ne.1);
            if !inside_named && !spans.contains(&span) {
                spans.push(span);
            }
        }

        let candidates: Vec<MentionSpan> = spans
            .into_iter()
            .map(|(start, end)| {
                MentionSpan::new(start, end).with_head(find_head(sentence, start, end, finder))
            })
            .collect();
        let kept = remove_spurious_mentions(sentence, candidates);
        debug!("Sentence {}: {} mentions detected", sent_num, kept.len());
        detected.push(kept);
    }
    Ok(detected)
}

/// Maximal runs of tokens sharing an entity tag, with a trailing possessive `'s`
pub fn named_entity_spans(sentence: &Sentence) -> Vec<(usize, usize)> {
    let tokens = &sentence.tokens;
    let tag = |i: usize| {
        let ner = tokens[i].ner.as_str();
        if ner.is_empty() { "O" } else { ner }
    };

    let mut spans = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let ner = tag(i);
        let mut end = i + 1;
        while end < tokens.len() && tag(end) == ner {
            end += 1;
        }
        if NON_MENTION_NER.contains(&ner) {
            i = end;
            continue;
        }
        if tokens
            .get(end)
            .is_some_and(|t| t.word == "'s" && t.pos == "POS")
        {
            end += 1;
        }
        spans.push((i, end));
        i = end;
    }
    spans
}

/// Spans of every NP or PRP constituent, outermost first
pub fn np_or_prp_spans(tree: &ParseTree) -> Vec<(usize, usize)> {
    (0..tree.node_count())
        .filter(|&node| !tree.is_leaf(node))
        .filter(|&node| {
            let label = tree.label(node);
            label.starts_with("NP") || label.starts_with("PRP")
        })
        .map(|node| tree.leaf_span(node))
        .filter(|(start, end)| start < end)
        .collect()
}

fn is_spurious(sentence: &Sentence, span: &MentionSpan) -> bool {
    let first = sentence.tokens[span.start].word.to_lowercase();
    if NEGATIVE_QUANTIFIERS.contains(&first.as_str()) {
        return true;
    }
    let Some(head) = span.head.and_then(|h| sentence.tokens.get(h)) else {
        return false;
    };
    head.word == "%" || head.ner == "PERCENT" || head.ner == "MONEY"
}

/// Drop quantified, percentage and money mentions, and the inner one of two nested
/// mentions sharing a head unless a comma or conjunction follows it.
pub fn remove_spurious_mentions(sentence: &Sentence, spans: Vec<MentionSpan>) -> Vec<MentionSpan> {
    let mut removed: Vec<bool> = spans.iter().map(|s| is_spurious(sentence, s)).collect();

    for outer in 0..spans.len() {
        for inner in 0..spans.len() {
            if outer == inner || removed[outer] || removed[inner] {
                continue;
            }
            let (a, b) = (&spans[outer], &spans[inner]);
            let nested = a.start <= b.start && b.end <= a.end;
            if a.head != b.head || !nested {
                continue;
            }
            let followed_by_separator = sentence
                .tokens
                .get(b.end)
                .is_some_and(|t| t.pos == "," || t.pos == "CC");
            if !followed_by_separator {
                removed[inner] = true;
            }
        }
    }

    spans
        .into_iter()
        .zip(removed)
        .filter_map(|(span, removed)| (!removed).then_some(span))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocumentError;
    use crate::models::PennHeadFinder;
    use crate::test_support::sentence;

    fn spans_of(detected: &[MentionSpan]) -> Vec<(usize, usize)> {
        detected.iter().map(|m| (m.start, m.end)).collect()
    }

    #[test]
    fn test_named_entities_and_noun_phrases() {
        let mut s = sentence(&[
            ("Joe", "NNP"),
            ("Smith", "NNP"),
            ("saw", "VBD"),
            ("the", "DT"),
            ("dog", "NN"),
        ]);
        s.tokens[0].ner = "PERSON".to_string();
        s.tokens[1].ner = "PERSON".to_string();
        s.parse = Some(
            ParseTree::parse(
                "(ROOT (S (NP (NNP Joe) (NNP Smith)) (VP (VBD saw) (NP (DT the) (NN dog)))))",
            )
            .unwrap(),
        );
        let doc = Document::new("md", vec![s]);
        let detected = detect_mentions(&doc, &PennHeadFinder).unwrap();

        assert_eq!(spans_of(&detected[0]), vec![(0, 2), (3, 5)]);
        assert_eq!(detected[0][0].head, Some(1));
        assert_eq!(detected[0][1].head, Some(4));
    }

    #[test]
    fn test_possessive_joins_entity() {
        let mut s = sentence(&[("Ann", "NNP"), ("'s", "POS"), ("cat", "NN")]);
        s.tokens[0].ner = "PERSON".to_string();
        assert_eq!(named_entity_spans(&s), vec![(0, 2)]);
    }

    #[test]
    fn test_non_mention_entity_types_skipped() {
        let mut s = sentence(&[("three", "CD"), ("days", "NNS")]);
        s.tokens[0].ner = "NUMBER".to_string();
        s.tokens[1].ner = "DURATION".to_string();
        assert_eq!(named_entity_spans(&s), vec![(0, 1)]);
    }

    #[test]
    fn test_chunks_without_parse() {
        let mut s = sentence(&[
            ("Mr.", "NNP"),
            ("Smith", "NNP"),
            ("said", "VBD"),
            ("no", "DT"),
            ("one", "NN"),
            ("came", "VBD"),
        ]);
        s.tokens[1].ner = "PERSON".to_string();
        s.chunk_tags = ["B-NP", "I-NP", "B-VP", "B-NP", "I-NP", "B-VP"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let doc = Document::new("md", vec![s]);
        let detected = detect_mentions(&doc, &PennHeadFinder).unwrap();

        // "Smith" is nested in "Mr. Smith" with the same head; "no one" is quantified
        assert_eq!(spans_of(&detected[0]), vec![(0, 2)]);
    }

    #[test]
    fn test_nested_mention_kept_before_conjunction() {
        let s = sentence(&[("cats", "NNS"), ("and", "CC"), ("dogs", "NNS")]);
        let spans = vec![
            MentionSpan::new(0, 3).with_head(0),
            MentionSpan::new(0, 1).with_head(0),
        ];
        assert_eq!(remove_spurious_mentions(&s, spans).len(), 2);
    }

    #[test]
    fn test_money_mentions_removed() {
        let mut s = sentence(&[("$", "$"), ("5", "CD")]);
        s.tokens[1].ner = "MONEY".to_string();
        let spans = vec![MentionSpan::new(0, 2).with_head(1)];
        assert!(remove_spurious_mentions(&s, spans).is_empty());
    }

    #[test]
    fn test_illegal_chunk_sequence_is_fatal() {
        let mut s = sentence(&[("the", "DT"), ("dog", "NN")]);
        s.chunk_tags = vec!["O".to_string(), "I-NP".to_string()];
        let doc = Document::new("md", vec![s]);
        assert_eq!(
            detect_mentions(&doc, &PennHeadFinder),
            Err(DocumentError::IllegalChunkTag {
                index: 1,
                tag: "I-NP".to_string()
            })
        );
    }
}
