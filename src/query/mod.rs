pub mod ast;
pub mod parser;
pub mod matcher;
pub mod engine;

pub use ast::{Attribute, AttributeScope, Intrinsic, Query};
pub use parser::QueryParser;
pub use matcher::SpanMatcher;
