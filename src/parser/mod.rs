//! Provide the checking token handler and the components it is built on.
//!
//! Data flows from a tokenizer into [`XmlCheckingTokenHandler`], which uses
//! the element stack, the namespace scope chain, and the default attribute
//! injector, and then on to a secondary [`XmlTokenHandler`].

pub mod checker;
pub mod defaults;
pub mod element;
pub mod namespace;
pub mod qname;
#[cfg(feature = "diagnostics")]
pub mod report;
pub mod token;
pub mod trace;

pub use checker::{XmlCheckerConfig, XmlCheckerOption, XmlCheckerState, XmlCheckingTokenHandler};
pub use namespace::{XML_XML_NAMESPACE, XML_XMLNS_NAMESPACE, XmlNamespaceScope, XmlVersion};
pub use qname::{XmlCompleteName, XmlNameResolution, split_qname2};
#[cfg(feature = "diagnostics")]
pub use report::{StructuredWarning, XmlTaintedNamespaceWarning};
pub use token::{
    XmlEntityId, XmlLiteral, XmlToken, XmlTokenAttribute, XmlTokenCollector, XmlTokenHandler,
    XmlTokenHandlerStatus, XmlTokenType,
};
