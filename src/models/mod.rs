pub mod annotation;
pub mod cluster;
pub mod dictionaries;
pub mod document;
pub mod mention;
pub mod quote;
pub mod speaker;
pub mod token;
pub mod tree;

pub use annotation::*;
pub use cluster::*;
pub use dictionaries::*;
pub use document::*;
pub use mention::*;
pub use quote::*;
pub use speaker::*;
pub use token::*;
pub use tree::*;
