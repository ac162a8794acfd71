use crate::error::{DocumentError, DocumentResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// Phrase or tag label; the surface word for leaves
    pub label: String,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
    /// Position among the leaves, set on leaf nodes only
    pub leaf_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    nodes: Vec<TreeNode>,
    root: usize,
    leaves: Vec<usize>,
}

impl ParseTree {
    /// Parse a Penn Treebank bracketed string such as `(ROOT (S (NP (NNP Joe)) (VP (VBD said))))`
    pub fn parse(text: &str) -> DocumentResult<Self> {
        let symbols = tokenize(text);
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut leaves = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut root = None;

        let mut i = 0;
        while i < symbols.len() {
            match symbols[i] {
                "(" => {
                    let label = match symbols.get(i + 1) {
                        Some(&next) if next != "(" && next != ")" => {
                            i += 1;
                            next.to_string()
                        }
                        _ => String::new(),
                    };
                    let id = nodes.len();
                    let parent = stack.last().copied();
                    nodes.push(TreeNode {
                        label,
                        children: Vec::new(),
                        parent,
                        leaf_index: None,
                    });
                    match parent {
                        Some(p) => nodes[p].children.push(id),
                        None if root.is_some() => {
                            return Err(malformed("more than one top-level bracket"));
                        }
                        None => root = Some(id),
                    }
                    stack.push(id);
                }
                ")" => {
                    if stack.pop().is_none() {
                        return Err(malformed("unexpected closing bracket"));
                    }
                }
                word => {
                    let Some(&parent) = stack.last() else {
                        return Err(malformed("leaf outside of any bracket"));
                    };
                    let id = nodes.len();
                    nodes.push(TreeNode {
                        label: word.to_string(),
                        children: Vec::new(),
                        parent: Some(parent),
                        leaf_index: Some(leaves.len()),
                    });
                    leaves.push(id);
                    nodes[parent].children.push(id);
                }
            }
            i += 1;
        }

        if !stack.is_empty() {
            return Err(malformed("unclosed bracket"));
        }
        let root = root.ok_or_else(|| malformed("empty tree"))?;

        Ok(Self {
            nodes,
            root,
            leaves,
        })
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn node(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn label(&self, id: usize) -> &str {
        self.nodes.get(id).map(|n| n.label.as_str()).unwrap_or("")
    }

    pub fn parent(&self, id: usize) -> Option<usize> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: usize) -> &[usize] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_leaf(&self, id: usize) -> bool {
        self.nodes.get(id).is_some_and(|n| n.leaf_index.is_some())
    }

    pub fn is_preterminal(&self, id: usize) -> bool {
        matches!(self.children(id), [only] if self.is_leaf(*only))
    }

    /// Node id of the `index`-th leaf
    pub fn leaf(&self, index: usize) -> Option<usize> {
        self.leaves.get(index).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Half-open range of leaf indices covered by a node
    pub fn leaf_span(&self, id: usize) -> (usize, usize) {
        let mut first = usize::MAX;
        let mut last = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(index) = self.nodes.get(current).and_then(|n| n.leaf_index) {
                first = first.min(index);
                last = last.max(index + 1);
            }
            pending.extend_from_slice(self.children(current));
        }
        if first == usize::MAX { (0, 0) } else { (first, last) }
    }

    /// Follow head children down to the lexical head leaf
    pub fn head_terminal(&self, id: usize, finder: &dyn HeadFinder) -> usize {
        let mut current = id;
        while !self.is_leaf(current) {
            match finder.head_child(self, current) {
                Some(child) => current = child,
                None => break,
            }
        }
        current
    }

    /// Highest contiguous NP ancestor of the given leaf that is headed by it,
    /// falling back to the leaf itself.
    pub fn noun_phrase_for_head(&self, head_leaf: usize, finder: &dyn HeadFinder) -> usize {
        let mut subtree = None;
        let mut node = head_leaf;
        while let Some(parent) = self.parent(node) {
            node = parent;
            let headed = self.head_terminal(node, finder) == head_leaf;
            if headed && basic_category(self.label(node)) == "NP" {
                subtree = Some(node);
            } else if subtree.is_some() {
                break;
            }
        }
        subtree.unwrap_or(head_leaf)
    }

    /// Render back to bracketed form
    pub fn to_penn(&self) -> String {
        let mut out = String::new();
        self.write_penn(self.root, &mut out);
        out
    }

    fn write_penn(&self, id: usize, out: &mut String) {
        if self.is_leaf(id) {
            out.push_str(self.label(id));
            return;
        }
        out.push('(');
        out.push_str(self.label(id));
        for &child in self.children(id) {
            out.push(' ');
            self.write_penn(child, out);
        }
        out.push(')');
    }
}

fn malformed(reason: &str) -> DocumentError {
    DocumentError::MalformedTree {
        reason: reason.to_string(),
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    let mut symbols = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(s) = start.take() {
                symbols.push(&text[s..i]);
            }
            if !c.is_whitespace() {
                symbols.push(&text[i..i + 1]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        symbols.push(&text[s..]);
    }
    symbols
}

/// Strip function tags and indices: `NP-SBJ-1` becomes `NP`
pub fn basic_category(label: &str) -> &str {
    if label.starts_with('-') {
        return label;
    }
    label.split(['-', '=']).next().unwrap_or(label)
}

/// Chooses the head child of a phrasal node
pub trait HeadFinder: Send + Sync {
    fn head_child(&self, tree: &ParseTree, node: usize) -> Option<usize>;
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    LeftToRight,
    RightToLeft,
}

/// One search pass over the children: the first child whose category is in the set wins
type HeadRule = (Direction, &'static [&'static str]);

use Direction::{LeftToRight as L, RightToLeft as R};

const NP_RULES: &[HeadRule] = &[
    (R, &["NN", "NNP", "NNPS", "NNS", "NX", "POS", "JJR", "PRP", "PRP$"]),
    (L, &["NP"]),
    (R, &["$", "ADJP", "PRN"]),
    (R, &["CD"]),
    (R, &["JJ", "JJS", "RB", "QP"]),
];
const VP_RULES: &[HeadRule] = &[
    (L, &["TO"]),
    (L, &["VBD"]),
    (L, &["VBN"]),
    (L, &["MD"]),
    (L, &["VBZ"]),
    (L, &["VB"]),
    (L, &["VBG"]),
    (L, &["VBP"]),
    (L, &["VP"]),
    (L, &["ADJP"]),
    (L, &["NN", "NNS", "NP"]),
];
const S_RULES: &[HeadRule] = &[
    (L, &["TO"]),
    (L, &["VP"]),
    (L, &["S"]),
    (L, &["SBAR"]),
    (L, &["ADJP"]),
    (L, &["UCP"]),
    (L, &["NP"]),
];
const SBAR_RULES: &[HeadRule] = &[
    (L, &["WHNP", "WHPP", "WHADVP", "WHADJP"]),
    (L, &["IN"]),
    (L, &["DT"]),
    (L, &["S", "SQ", "SINV", "SBAR", "FRAG"]),
];
const PP_RULES: &[HeadRule] = &[(L, &["IN", "TO", "VBG", "VBN", "RP", "FW"])];
const ADJP_RULES: &[HeadRule] = &[
    (L, &["NNS"]),
    (L, &["QP"]),
    (L, &["NN"]),
    (L, &["ADVP"]),
    (L, &["JJ"]),
    (L, &["VBN", "VBG"]),
    (L, &["ADJP"]),
    (L, &["JJR", "JJS"]),
];
const WHNP_RULES: &[HeadRule] = &[(L, &["WDT", "WP", "WP$", "WHADJP", "WHPP", "WHNP"])];

/// Simplified Collins-style head rules for Penn Treebank labels
#[derive(Debug, Clone, Copy, Default)]
pub struct PennHeadFinder;

impl PennHeadFinder {
    fn rules(category: &str) -> &'static [HeadRule] {
        match category {
            "NP" | "NML" | "NX" => NP_RULES,
            "VP" => VP_RULES,
            "S" | "SINV" | "SQ" => S_RULES,
            "SBAR" => SBAR_RULES,
            "PP" => PP_RULES,
            "ADJP" => ADJP_RULES,
            "WHNP" => WHNP_RULES,
            _ => &[],
        }
    }
}

impl HeadFinder for PennHeadFinder {
    fn head_child(&self, tree: &ParseTree, node: usize) -> Option<usize> {
        let children = tree.children(node);
        match children {
            [] => return None,
            [only] => return Some(*only),
            _ => {}
        }

        let category = basic_category(tree.label(node));
        for (direction, labels) in Self::rules(category) {
            let matches = |c: &&usize| labels.contains(&basic_category(tree.label(**c)));
            let found = match direction {
                Direction::LeftToRight => children.iter().find(matches),
                Direction::RightToLeft => children.iter().rev().find(matches),
            };
            if let Some(&child) = found {
                return Some(child);
            }
        }

        // NPs default to the last child, everything else to the first
        if category == "NP" {
            children.last().copied()
        } else {
            children.first().copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOE_SAID: &str =
        "(ROOT (S (NP (NNP Joe)) (VP (VBD said) (, ,) (`` ``) (S (NP (PRP I)) (VP (VBP am) (ADJP (JJ happy)))))))";

    #[test]
    fn test_parse_leaves_and_labels() {
        let tree = ParseTree::parse(JOE_SAID).unwrap();
        assert_eq!(tree.leaf_count(), 7);
        let joe = tree.leaf(0).unwrap();
        assert_eq!(tree.label(joe), "Joe");
        let tag = tree.parent(joe).unwrap();
        assert_eq!(tree.label(tag), "NNP");
        assert!(tree.is_preterminal(tag));
        assert_eq!(tree.leaf_span(tree.root()), (0, 7));
        assert_eq!(tree.to_penn(), JOE_SAID);
    }

    #[test]
    fn test_unbalanced_brackets_are_rejected() {
        assert!(matches!(
            ParseTree::parse("(S (NP (NN dog))"),
            Err(DocumentError::MalformedTree { .. })
        ));
        assert!(ParseTree::parse("(S (NN dog)))").is_err());
        assert!(ParseTree::parse("").is_err());
        assert!(ParseTree::parse("(A x) (B y)").is_err());
    }

    #[test]
    fn test_head_terminal() {
        let tree = ParseTree::parse(JOE_SAID).unwrap();
        let finder = PennHeadFinder;
        // S -> VP -> VBD said
        let s = tree.children(tree.root())[0];
        assert_eq!(tree.head_terminal(s, &finder), tree.leaf(1).unwrap());
    }

    #[test]
    fn test_highest_noun_phrase_with_same_head() {
        let tree =
            ParseTree::parse("(ROOT (S (NP (NP (DT the) (NN man)) (PP (IN in) (NP (NN black)))) (VP (VBD left))))")
                .unwrap();
        let finder = PennHeadFinder;
        let man = tree.leaf(1).unwrap();
        let np = tree.noun_phrase_for_head(man, &finder);
        // outer NP is headed by its first NP child, so it shares the head
        assert_eq!(tree.leaf_span(np), (0, 4));

        let left = tree.leaf(4).unwrap();
        assert_eq!(tree.noun_phrase_for_head(left, &finder), left);
    }

    #[test]
    fn test_basic_category() {
        assert_eq!(basic_category("NP-SBJ-1"), "NP");
        assert_eq!(basic_category("-LRB-"), "-LRB-");
        assert_eq!(basic_category("VP"), "VP");
    }
}
