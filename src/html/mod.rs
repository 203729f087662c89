//! Markup attributes with embedded expressions.
//!
//! An attribute value such as `btn ${kind}` is tokenized once, when the
//! attribute is compiled, into [`CodeToken`]s. Each render then walks those
//! tokens against its own scope. Tokenizing never happens at render time and
//! rendering never mutates a compiled attribute.

pub mod attr;
pub mod element;
pub mod token;
pub mod tokenizer;

pub use attr::Attribute;
pub use element::Element;
pub use token::CodeToken;
pub use tokenizer::{Delimiters, reconstruct, tokenize};
