//! Tokens delivered by a tokenizer to a token handler.
//!
//! A token is borrowed mutably by each handler in turn: the checker fills in
//! namespace resolutions and appends defaulted attributes before passing the
//! same token on to its secondary handler.

use std::rc::Rc;

use crate::{
    error::{XmlCheckError, XmlRange},
    parser::qname::XmlCompleteName,
    tree::XmlDoctype,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XmlTokenType {
    XmlTokenXMLDecl,
    XmlTokenDoctype,
    XmlTokenPI,
    XmlTokenComment,
    XmlTokenCDATA,
    XmlTokenText,
    XmlTokenSTag,
    XmlTokenETag,
    XmlTokenEmptyElemTag,
    XmlTokenFinished,
}

impl XmlTokenType {
    /// Check if the token is a start tag, self-closing or not.
    pub fn is_start_tag(&self) -> bool {
        matches!(self, Self::XmlTokenSTag | Self::XmlTokenEmptyElemTag)
    }
}

/// Identifies the entity a token was read from.
///
/// `None` in a token means the document entity itself. Entities compare by
/// handle, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XmlEntityId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTokenAttribute {
    pub name: XmlCompleteName,
    pub value: String,
    /// `false` if the attribute was injected from a default declaration.
    pub specified: bool,
    pub is_id: bool,
    pub range: Option<XmlRange>,
}

impl XmlTokenAttribute {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: XmlCompleteName::new(name),
            value: value.to_owned(),
            specified: true,
            is_id: false,
            range: None,
        }
    }
}

/// Character data of a token, possibly split in several parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlLiteral {
    parts: Vec<String>,
}

impl XmlLiteral {
    pub fn new(data: &str) -> Self {
        Self {
            parts: vec![data.to_owned()],
        }
    }

    pub fn push_part(&mut self, part: &str) {
        self.parts.push(part.to_owned());
    }

    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|part| part.as_str())
    }

    pub fn len(&self) -> usize {
        self.parts.iter().map(|part| part.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if all the data is XML white space.
    ///
    /// ```text
    /// [3] S ::= (#x20 | #x9 | #xD | #xA)+
    /// ```
    pub fn is_whitespace(&self) -> bool {
        self.parts()
            .all(|part| part.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n')))
    }

    /// Concatenate all parts.
    pub fn to_text(&self) -> String {
        self.parts.concat()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlToken {
    pub typ: XmlTokenType,
    /// Element name for tags, target for PIs, root name for DOCTYPE.
    pub name: XmlCompleteName,
    /// Attributes of tags, pseudo-attributes of PIs and of the XML declaration.
    pub attributes: Vec<XmlTokenAttribute>,
    pub literal: XmlLiteral,
    pub range: Option<XmlRange>,
    pub entity: Option<XmlEntityId>,
    /// Declarations carried by a DOCTYPE token.
    pub doctype: Option<Rc<XmlDoctype>>,
}

impl XmlToken {
    pub fn new(typ: XmlTokenType, name: &str) -> Self {
        Self {
            typ,
            name: XmlCompleteName::new(name),
            attributes: vec![],
            literal: XmlLiteral::default(),
            range: None,
            entity: None,
            doctype: None,
        }
    }

    pub fn stag(name: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenSTag, name)
    }

    pub fn etag(name: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenETag, name)
    }

    pub fn empty_elem_tag(name: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenEmptyElemTag, name)
    }

    pub fn text(data: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenText, "").with_literal(data)
    }

    pub fn cdata(data: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenCDATA, "").with_literal(data)
    }

    pub fn comment(data: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenComment, "").with_literal(data)
    }

    pub fn pi(target: &str, data: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenPI, target).with_literal(data)
    }

    /// An XML declaration with the given `version` pseudo-attribute.
    pub fn xml_decl(version: &str) -> Self {
        Self::new(XmlTokenType::XmlTokenXMLDecl, "xml").with_attribute("version", version)
    }

    pub fn doctype(name: &str, doctype: Option<Rc<XmlDoctype>>) -> Self {
        let mut token = Self::new(XmlTokenType::XmlTokenDoctype, name);
        token.doctype = doctype;
        token
    }

    pub fn finished() -> Self {
        Self::new(XmlTokenType::XmlTokenFinished, "")
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.push(XmlTokenAttribute::new(name, value));
        self
    }

    pub fn with_literal(mut self, data: &str) -> Self {
        self.literal = XmlLiteral::new(data);
        self
    }

    pub fn with_range(mut self, range: XmlRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_entity(mut self, entity: Option<XmlEntityId>) -> Self {
        self.entity = entity;
        self
    }

    pub fn is_whitespace(&self) -> bool {
        self.literal.is_whitespace()
    }

    /// Search a specified or defaulted attribute by its qualified name.
    pub fn get_attribute(&self, qname: &str) -> Option<&XmlTokenAttribute> {
        self.attributes.iter().find(|attr| attr.name.qname() == qname)
    }

    pub fn attribute_range(&self, index: usize) -> Option<XmlRange> {
        self.attributes.get(index).and_then(|attr| attr.range)
    }
}

/// Outcome of a successfully handled token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlTokenHandlerStatus {
    Continue,
    /// The handler wants the tokenizer to suspend before the next token.
    Block,
}

/// Receiver of a token stream.
pub trait XmlTokenHandler {
    fn handle_token(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError>;
}

impl<T: XmlTokenHandler + ?Sized> XmlTokenHandler for &mut T {
    fn handle_token(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        (**self).handle_token(token)
    }
}

impl<T: XmlTokenHandler + ?Sized> XmlTokenHandler for Box<T> {
    fn handle_token(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        (**self).handle_token(token)
    }
}

/// A handler that keeps a copy of every token it receives.
#[derive(Debug, Default)]
pub struct XmlTokenCollector {
    pub tokens: Vec<XmlToken>,
}

impl XmlTokenHandler for XmlTokenCollector {
    fn handle_token(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        self.tokens.push(token.clone());
        Ok(XmlTokenHandlerStatus::Continue)
    }
}
