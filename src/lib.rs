//! Streaming XML well-formedness and namespace checking.
//!
//! The checker consumes the tokens of a document one at a time, as produced
//! by a tokenizer, and forwards them to a secondary handler once they are
//! known to be well-formed. Start tags are completed with defaulted
//! attributes from the document type, and all element and attribute names
//! are resolved to their namespaces on the way.
//!
//! ```
//! use exml_check::parser::{XmlCheckingTokenHandler, XmlToken, XmlTokenCollector};
//!
//! let mut checker = XmlCheckingTokenHandler::new(XmlTokenCollector::default());
//! for mut token in [
//!     XmlToken::stag("a").with_attribute("xmlns:p", "urn:p"),
//!     XmlToken::empty_elem_tag("p:b"),
//!     XmlToken::etag("a"),
//!     XmlToken::finished(),
//! ] {
//!     checker.handle_token(&mut token).unwrap();
//! }
//! assert_eq!(checker.handler().tokens[1].name.uri(), Some("urn:p"));
//! ```

pub mod error;
pub mod globals;
pub mod parser;
pub mod tree;
pub mod xmlmemory;

pub use error::{XmlCheckError, XmlCheckErrors, XmlPoint, XmlRange, XmlWellFormednessError};
