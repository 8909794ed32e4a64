//! Provide the document type model consulted by the checker.
//!
//! The checker never validates against the DTD. It only needs the attribute
//! declarations, to inject default values and to find ID-typed attributes.

pub mod dtd;

pub use dtd::*;

/// A DTD Attribute type definition.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeType {
    XmlAttributeCDATA = 1,
    XmlAttributeID,
    XmlAttributeIDREF,
    XmlAttributeIDREFS,
    XmlAttributeEntity,
    XmlAttributeEntities,
    XmlAttributeNmtoken,
    XmlAttributeNmtokens,
    XmlAttributeEnumeration,
    XmlAttributeNotation,
}

impl XmlAttributeType {
    /// Parse the keyword used in an `<!ATTLIST ...>` declaration.
    ///
    /// A parenthesized list is an enumeration.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "CDATA" => Some(Self::XmlAttributeCDATA),
            "ID" => Some(Self::XmlAttributeID),
            "IDREF" => Some(Self::XmlAttributeIDREF),
            "IDREFS" => Some(Self::XmlAttributeIDREFS),
            "ENTITY" => Some(Self::XmlAttributeEntity),
            "ENTITIES" => Some(Self::XmlAttributeEntities),
            "NMTOKEN" => Some(Self::XmlAttributeNmtoken),
            "NMTOKENS" => Some(Self::XmlAttributeNmtokens),
            "NOTATION" => Some(Self::XmlAttributeNotation),
            s if s.starts_with('(') && s.ends_with(')') => Some(Self::XmlAttributeEnumeration),
            _ => None,
        }
    }
}

/// A DTD Attribute default definition.
///
/// `XmlAttributeNone` means a plain default value was given.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeDefault {
    XmlAttributeNone = 1,
    XmlAttributeRequired,
    XmlAttributeImplied,
    XmlAttributeFixed,
}

impl XmlAttributeDefault {
    /// Parse `#REQUIRED`, `#IMPLIED`, `#FIXED`, or `#DEFAULT` for a plain default.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "#REQUIRED" => Some(Self::XmlAttributeRequired),
            "#IMPLIED" => Some(Self::XmlAttributeImplied),
            "#FIXED" => Some(Self::XmlAttributeFixed),
            "#DEFAULT" => Some(Self::XmlAttributeNone),
            _ => None,
        }
    }
}
