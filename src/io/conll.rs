use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::error::{DocumentError, DocumentResult};
use crate::models::{
    Document, ParseTree, Sentence, SpeakerAnnotation, Token, UseMarkedDiscourseAnnotation,
};
use crate::stages::{MentionSpan, RawMentions};

const DOC_START: &str = "#begin document ";
const DOC_END: &str = "#end document";

const FIELD_WORD: usize = 3;
const FIELD_POS: usize = 4;
const FIELD_PARSE_BIT: usize = 5;
const FIELD_SPEAKER: usize = 9;
const FIELD_NER: usize = 10;
const FIELDS_MIN: usize = 12;

/// A labelled span over sentence tokens, end exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledSpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

struct Row {
    line: usize,
    fields: Vec<String>,
}

impl Row {
    fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    fn last(&self) -> &str {
        self.fields.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Default)]
struct RawDocument {
    id: String,
    sentences: Vec<Vec<Row>>,
}

pub fn parse_conll_file(path: &Path) -> Result<Vec<(Document, RawMentions)>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_conll_str(&content).with_context(|| format!("Invalid CoNLL file: {:?}", path))
}

/// Parse every document of a CoNLL-2011 file. Coreference columns become gold mentions.
pub fn parse_conll_str(text: &str) -> Result<Vec<(Document, RawMentions)>> {
    let mut documents = Vec::new();
    let mut current: Option<RawDocument> = None;
    let mut sentence: Vec<Row> = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_num = i + 1;
        let line = line.trim();
        if line.is_empty() {
            if !sentence.is_empty() {
                if let Some(doc) = current.as_mut() {
                    doc.sentences.push(std::mem::take(&mut sentence));
                }
            }
            continue;
        }
        if let Some(id) = line.strip_prefix(DOC_START) {
            if current.is_some() {
                warn!("Unexpected begin document at line {}", line_num);
            }
            current = Some(RawDocument {
                id: id.trim().to_string(),
                ..Default::default()
            });
        } else if line.starts_with(DOC_END) {
            let Some(mut doc) = current.take() else {
                bail!("End of document without a beginning at line {}", line_num);
            };
            if !sentence.is_empty() {
                doc.sentences.push(std::mem::take(&mut sentence));
            }
            documents.push(build_document(doc)?);
        } else {
            if current.is_none() {
                bail!("Token line outside of a document at line {}", line_num);
            }
            let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            if fields.len() < FIELDS_MIN {
                bail!(
                    "Expected at least {} fields, found {} at line {}",
                    FIELDS_MIN,
                    fields.len(),
                    line_num
                );
            }
            sentence.push(Row {
                line: line_num,
                fields,
            });
        }
    }
    if current.is_some() {
        bail!("Unterminated document at end of input");
    }
    debug!("Read {} CoNLL documents", documents.len());
    Ok(documents)
}

fn build_document(raw: RawDocument) -> Result<(Document, RawMentions)> {
    let mut sentences = Vec::with_capacity(raw.sentences.len());
    let mut gold = Vec::with_capacity(raw.sentences.len());

    for rows in &raw.sentences {
        let mut tokens: Vec<Token> = rows
            .iter()
            .map(|row| {
                let mut token = Token::new(row.field(FIELD_WORD), row.field(FIELD_POS));
                let speaker = row.field(FIELD_SPEAKER).replace('_', " ");
                if speaker != "-" {
                    token.annotations.set::<SpeakerAnnotation>(speaker);
                }
                token
            })
            .collect();

        let first_line = rows.first().map(|r| r.line).unwrap_or(0);
        let ner_column: Vec<&str> = rows.iter().map(|r| r.field(FIELD_NER)).collect();
        for span in labelled_spans(&ner_column, FIELD_NER, first_line, "*", false)? {
            for token in &mut tokens[span.start..span.end] {
                if token.ner != "O" {
                    warn!("Replacing old named entity tag {} with {}", token.ner, span.label);
                }
                token.ner = span.label.clone();
            }
        }

        let coref_column: Vec<&str> = rows.iter().map(Row::last).collect();
        let last_field = rows.first().map(|r| r.fields.len() - 1).unwrap_or(0);
        let mut mentions = Vec::new();
        for span in labelled_spans(&coref_column, last_field, first_line, "-", true)? {
            let cluster: usize = span
                .label
                .parse()
                .with_context(|| format!("Bad coreference label {:?} near line {}", span.label, first_line))?;
            mentions.push(MentionSpan::new(span.start, span.end).with_gold_cluster(cluster));
        }
        mentions.sort_by_key(|m| (m.start, std::cmp::Reverse(m.end)));
        gold.push(mentions);

        let mut sentence = Sentence::new(tokens);
        sentence.parse = Some(
            parse_bits_to_tree(rows)
                .with_context(|| format!("Bad parse bits near line {}", first_line))?,
        );
        sentences.push(sentence);
    }

    let mut doc = Document::new(&raw.id, sentences);
    doc.conll_doc = true;
    doc.annotations.set::<UseMarkedDiscourseAnnotation>(true);
    let predicted = vec![Vec::new(); doc.sentences.len()];
    Ok((
        doc,
        RawMentions {
            predicted,
            gold: Some(gold),
        },
    ))
}

/// Splice `(POS word)` into each parse bit in place of its `*`
fn parse_bits_to_tree(rows: &[Row]) -> DocumentResult<ParseTree> {
    let mut penn = String::new();
    for row in rows {
        if !penn.is_empty() {
            penn.push(' ');
        }
        let bit = row.field(FIELD_PARSE_BIT).replace("NOPARSE", "X");
        let leaf = format!("({} {})", row.field(FIELD_POS), row.field(FIELD_WORD));
        match bit.split_once('*') {
            Some((before, after)) => {
                if after.contains('*') {
                    warn!("Parse bit with multiple *: {}", bit);
                }
                penn.push_str(before);
                penn.push_str(&leaf);
                penn.push_str(after);
            }
            None => penn.push_str(&leaf),
        }
    }
    ParseTree::parse(&penn)
}

/// Decode a bracketed label column such as `(PERSON*`, `*`, `*)` or `(12|(3)`.
///
/// `default_marker` is the value of a token outside every span. With
/// `check_end_label`, a closing bracket names its label (`12)`) and closes the
/// innermost open span carrying it. Any bracket left unmatched is an
/// [`DocumentError::UnbalancedLabelledSpan`].
pub fn labelled_spans(
    values: &[&str],
    column: usize,
    line: usize,
    default_marker: &str,
    check_end_label: bool,
) -> DocumentResult<Vec<LabelledSpan>> {
    let unbalanced = |offset: usize| DocumentError::UnbalancedLabelledSpan {
        column,
        line: line + offset,
    };
    let strip_star = default_marker == "*";
    let clean = |s: &str| {
        if strip_star { s.replace('*', "") } else { s.to_string() }
    };

    let mut spans = Vec::new();
    // (start, label)
    let mut open: Vec<(usize, String)> = Vec::new();
    for (pos, value) in values.iter().enumerate() {
        if *value == default_marker {
            continue;
        }
        let mut open_paren: Option<usize> = None;
        let mut last_delimiter: Option<usize> = None;
        for (j, c) in value.char_indices() {
            let is_delimiter = matches!(c, '(' | ')' | '|');
            if is_delimiter {
                if let Some(start) = open_paren.take() {
                    open.push((pos, clean(&value[start + 1..j])));
                }
            }
            if c == '(' {
                open_paren = Some(j);
            } else if c == ')' {
                let index = if check_end_label {
                    let from = last_delimiter.map(|d| d + 1).unwrap_or(0);
                    let label = &value[from..j];
                    open.iter()
                        .rposition(|(_, l)| l == label)
                        .ok_or_else(|| unbalanced(pos))?
                } else {
                    open.len().checked_sub(1).ok_or_else(|| unbalanced(pos))?
                };
                let (start, label) = open.remove(index);
                spans.push(LabelledSpan {
                    start,
                    end: pos + 1,
                    label,
                });
            }
            if is_delimiter {
                last_delimiter = Some(j);
            }
        }
        if let Some(start) = open_paren {
            open.push((pos, clean(&value[start + 1..])));
        }
    }
    if !open.is_empty() {
        return Err(unbalanced(0));
    }
    Ok(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(n: usize, word: &str, pos: &str, bit: &str, speaker: &str, ner: &str, coref: &str) -> String {
        format!("bc/test 0 {n} {word} {pos} {bit} - - - {speaker} {ner} {coref}")
    }

    fn sample() -> String {
        [
            "#begin document (bc/test); part 000".to_string(),
            row(0, "Joe", "NNP", "(TOP(S(NP*)", "Joe_Smith", "(PERSON)", "(1)"),
            row(1, "saw", "VBD", "(VP*", "Joe_Smith", "*", "-"),
            row(2, "his", "PRP$", "(NP*", "Joe_Smith", "*", "(2|(1)"),
            row(3, "dog", "NN", "*))", "Joe_Smith", "*", "2)"),
            row(4, ".", ".", "*))", "Joe_Smith", "*", "-"),
            String::new(),
            "#end document".to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn test_labelled_spans_with_end_labels() {
        let spans = labelled_spans(&["(1)", "-", "(2|(1)", "2)"], 12, 1, "-", true).unwrap();
        let spans: Vec<_> = spans.iter().map(|s| (s.start, s.end, s.label.as_str())).collect();
        assert_eq!(spans, vec![(0, 1, "1"), (2, 3, "1"), (2, 4, "2")]);
    }

    #[test]
    fn test_ner_spans_strip_stars() {
        let spans = labelled_spans(&["(PERSON*", "*)", "*", "(GPE)"], 10, 1, "*", false).unwrap();
        let spans: Vec<_> = spans.iter().map(|s| (s.start, s.end, s.label.as_str())).collect();
        assert_eq!(spans, vec![(0, 2, "PERSON"), (3, 4, "GPE")]);
    }

    #[test]
    fn test_unbalanced_spans_are_fatal() {
        assert_eq!(
            labelled_spans(&["(PERSON*", "*"], 10, 7, "*", false),
            Err(DocumentError::UnbalancedLabelledSpan { column: 10, line: 7 })
        );
        assert_eq!(
            labelled_spans(&["-", "3)"], 12, 7, "-", true),
            Err(DocumentError::UnbalancedLabelledSpan { column: 12, line: 8 })
        );
    }

    #[test]
    fn test_parse_conll_document() {
        let docs = parse_conll_str(&sample()).unwrap();
        assert_eq!(docs.len(), 1);
        let (doc, raw) = &docs[0];

        assert_eq!(doc.doc_id, "(bc/test); part 000");
        assert!(doc.conll_doc);
        assert!(doc.use_marked_discourse());
        assert_eq!(doc.token_count(), 5);
        assert_eq!(doc.token(0).map(|t| t.ner.as_str()), Some("PERSON"));
        assert_eq!(doc.token(1).map(|t| t.ner.as_str()), Some("O"));
        assert_eq!(doc.token(0).and_then(Token::speaker), Some("Joe Smith"));

        let tree = doc.sentences[0].parse.as_ref().unwrap();
        assert_eq!(tree.leaf_count(), 5);

        let gold = raw.gold.as_ref().unwrap();
        let spans: Vec<_> = gold[0]
            .iter()
            .map(|m| (m.start, m.end, m.gold_cluster_id))
            .collect();
        assert_eq!(spans, vec![(0, 1, Some(1)), (2, 4, Some(2)), (2, 3, Some(1))]);
        assert!(raw.predicted[0].is_empty());
    }

    #[test]
    fn test_short_rows_rejected() {
        let text = "#begin document x\nx 0 0 a DT * -\n#end document";
        assert!(parse_conll_str(text).is_err());
    }
}
