use serde::{Deserialize, Serialize};

use super::annotation::{
    AnnotationMap, ParagraphAnnotation, SpeakerAnnotation, UtteranceAnnotation,
};
use super::tree::ParseTree;

/// A single token as produced by the upstream tokenizer and taggers
#[derive(Debug, Clone, Default)]
pub struct Token {
    /// Surface text
    pub word: String,
    pub lemma: String,
    /// Part-of-speech tag
    pub pos: String,
    /// Named-entity tag ("O" when untagged)
    pub ner: String,
    /// Character offset of the first character, if known
    pub begin_char: Option<usize>,
    /// Character offset one past the last character, if known
    pub end_char: Option<usize>,
    /// Open annotation record (utterance, speaker, paragraph, ...)
    pub annotations: AnnotationMap,
}

impl Token {
    pub fn new(word: &str, pos: &str) -> Self {
        Self {
            word: word.to_string(),
            lemma: word.to_lowercase(),
            pos: pos.to_string(),
            ner: "O".to_string(),
            ..Default::default()
        }
    }

    /// Utterance index, 0 when not yet assigned
    pub fn utterance(&self) -> usize {
        self.annotations
            .get::<UtteranceAnnotation>()
            .copied()
            .unwrap_or(0)
    }

    pub fn speaker(&self) -> Option<&str> {
        self.annotations
            .get::<SpeakerAnnotation>()
            .map(String::as_str)
    }

    pub fn paragraph(&self) -> Option<usize> {
        self.annotations.get::<ParagraphAnnotation>().copied()
    }

    pub fn is_verb(&self) -> bool {
        self.pos.starts_with('V')
    }

    pub fn is_person(&self) -> bool {
        self.ner.starts_with("PER")
    }
}

/// A typed dependency between two tokens of the same sentence.
///
/// Indices are 0-based token positions; a `None` governor marks the root edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub governor: Option<usize>,
    pub dependent: usize,
    pub relation: String,
}

impl DependencyEdge {
    pub fn new(governor: Option<usize>, dependent: usize, relation: &str) -> Self {
        Self {
            governor,
            dependent,
            relation: relation.to_string(),
        }
    }
}

/// Dependency graph for one sentence
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub fn new(edges: Vec<DependencyEdge>) -> Self {
        Self { edges }
    }

    /// All (governor, dependent) pairs joined by the given relation
    pub fn pairs_with_relation<'a>(
        &'a self,
        relation: &'a str,
    ) -> impl Iterator<Item = (usize, usize)> + 'a {
        self.edges.iter().filter_map(move |e| match e.governor {
            Some(gov) if e.relation == relation => Some((gov, e.dependent)),
            _ => None,
        })
    }

    /// First dependent of `governor` attached with `relation`
    pub fn child_with_relation(&self, governor: usize, relation: &str) -> Option<usize> {
        self.edges
            .iter()
            .find(|e| e.governor == Some(governor) && e.relation == relation)
            .map(|e| e.dependent)
    }

    /// Governor of `dependent` together with the relation name
    pub fn parent(&self, dependent: usize) -> Option<(usize, &str)> {
        self.edges.iter().find_map(|e| match e.governor {
            Some(gov) if e.dependent == dependent => Some((gov, e.relation.as_str())),
            _ => None,
        })
    }

    /// Every governor of `dependent`, enhanced graphs may have several
    pub fn parents(&self, dependent: usize) -> impl Iterator<Item = (usize, &str)> {
        self.edges.iter().filter_map(move |e| match e.governor {
            Some(gov) if e.dependent == dependent => Some((gov, e.relation.as_str())),
            _ => None,
        })
    }

    /// Relation between two nodes, if they are directly attached
    pub fn relation(&self, governor: usize, dependent: usize) -> Option<&str> {
        self.edges
            .iter()
            .find(|e| e.governor == Some(governor) && e.dependent == dependent)
            .map(|e| e.relation.as_str())
    }

    /// Ancestors of `node`, nearest first, stopping at the root
    pub fn path_to_root(&self, node: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some((gov, _)) = self.parent(current) {
            if gov == node || path.contains(&gov) {
                break;
            }
            path.push(gov);
            current = gov;
        }
        path
    }
}

/// A sentence with its tokens and upstream analyses
#[derive(Debug, Clone, Default)]
pub struct Sentence {
    pub tokens: Vec<Token>,
    /// Document-wide index of the first token
    pub token_offset: usize,
    /// Constituency parse
    pub parse: Option<ParseTree>,
    pub basic_dependencies: Option<DependencyGraph>,
    pub enhanced_dependencies: Option<DependencyGraph>,
    /// BIO chunk tags, one per token when supplied
    pub chunk_tags: Vec<String>,
    pub annotations: AnnotationMap,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            ..Default::default()
        }
    }

    /// Enhanced dependencies, falling back to basic ones
    pub fn dependencies(&self) -> Option<&DependencyGraph> {
        self.enhanced_dependencies
            .as_ref()
            .or(self.basic_dependencies.as_ref())
    }

    /// Space-joined surface text of tokens in `[start, end)`
    pub fn span_text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.tokens.len());
        let start = start.min(end);
        self.tokens[start..end]
            .iter()
            .map(|t| t.word.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn said_graph() -> DependencyGraph {
        // Joe(0) said(1) ,(2) "(3) I(4) am(5) happy(6)
        DependencyGraph::new(vec![
            DependencyEdge::new(None, 1, "root"),
            DependencyEdge::new(Some(1), 0, "nsubj"),
            DependencyEdge::new(Some(1), 6, "ccomp"),
            DependencyEdge::new(Some(6), 4, "nsubj"),
            DependencyEdge::new(Some(6), 5, "cop"),
        ])
    }

    #[test]
    fn test_dependency_queries() {
        let graph = said_graph();
        assert_eq!(graph.child_with_relation(1, "nsubj"), Some(0));
        assert_eq!(graph.child_with_relation(6, "nsubj"), Some(4));
        assert_eq!(graph.parent(4), Some((6, "nsubj")));
        assert_eq!(graph.parent(1), None);
        assert_eq!(graph.relation(6, 5), Some("cop"));
        assert_eq!(graph.pairs_with_relation("cop").collect::<Vec<_>>(), vec![(6, 5)]);
        assert_eq!(graph.path_to_root(4), vec![6, 1]);
    }

    #[test]
    fn test_enhanced_falls_back_to_basic() {
        let mut sentence = Sentence::new(vec![Token::new("Hi", "UH")]);
        assert!(sentence.dependencies().is_none());
        sentence.basic_dependencies = Some(said_graph());
        assert_eq!(sentence.dependencies().map(|g| g.edges.len()), Some(5));
        sentence.enhanced_dependencies = Some(DependencyGraph::default());
        assert_eq!(sentence.dependencies().map(|g| g.edges.len()), Some(0));
    }

    #[test]
    fn test_token_defaults() {
        let token = Token::new("Said", "VBD");
        assert_eq!(token.lemma, "said");
        assert_eq!(token.utterance(), 0);
        assert!(token.speaker().is_none());
        assert!(token.is_verb());
        assert!(!token.is_person());
    }
}
