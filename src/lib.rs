pub mod error;
pub mod io;
pub mod models;
pub mod rules;
pub mod sieves;
pub mod stages;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{DocumentError, DocumentResult};
pub use io::{
    AttributionReport, HumanReport, ResourcePaths, load_scorer, parse_conll_file,
    parse_document_file, parse_document_json,
};
pub use models::{Dictionaries, DocType, Document, Mention, Quotation, Token};
pub use sieves::{
    AttributionConfig, AttributionResult, LinearScorer, MentionSpeakerSieve, QuoteMentionSieve,
    QuoteScorer, attribute_quotes,
};
pub use stages::{PreprocessConfig, PreprocessResult, RawMentions, TwinPolicy, preprocess};
