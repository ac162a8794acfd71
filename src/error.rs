use thiserror::Error;

use crate::models::MentionId;

/// Data-integrity faults. Any of these aborts processing of the current document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("cannot find gold mention with id {id}")]
    MissingGoldAntecedent { id: MentionId },

    #[error("gold antecedent chain through mention {id} is cyclic")]
    CyclicGoldChain { id: MentionId },

    #[error("gold mention {id} has no gold cluster id")]
    MissingGoldCluster { id: MentionId },

    #[error("unbalanced labelled span in column {column} at line {line}")]
    UnbalancedLabelledSpan { column: usize, line: usize },

    #[error("malformed parse tree: {reason}")]
    MalformedTree { reason: String },

    #[error("illegal chunk tag {tag:?} at token {index}")]
    IllegalChunkTag { index: usize, tag: String },

    #[error("unknown sieve {name:?}")]
    UnknownSieve { name: String },

    #[error("mention {mention} has head index {head} outside its sentence")]
    MissingHeadLeaf { mention: MentionId, head: usize },
}

pub type DocumentResult<T> = Result<T, DocumentError>;
