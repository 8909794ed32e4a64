use crate::tree::{XmlAttributeDefault, XmlAttributeType};

/// An Attribute declaration in a DTD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub(crate) name: String,              /* Attribute qname, as declared */
    pub(crate) elem: String,              /* Element holding the attribute */
    pub(crate) atype: XmlAttributeType,   /* The attribute type */
    pub(crate) def: XmlAttributeDefault,  /* the default */
    pub(crate) default_value: Option<String>, /* or the default value */
    pub(crate) external: bool,            /* declared in the external subset */
}

impl XmlAttribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elem(&self) -> &str {
        &self.elem
    }

    pub fn atype(&self) -> XmlAttributeType {
        self.atype
    }

    pub fn def(&self) -> XmlAttributeDefault {
        self.def
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_id(&self) -> bool {
        self.atype == XmlAttributeType::XmlAttributeID
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Return the value to use when the attribute is not specified, if any.
    ///
    /// `#REQUIRED` and `#IMPLIED` attributes have no default.
    pub fn defaulted_value(&self) -> Option<&str> {
        match self.def {
            XmlAttributeDefault::XmlAttributeRequired | XmlAttributeDefault::XmlAttributeImplied => {
                None
            }
            XmlAttributeDefault::XmlAttributeNone | XmlAttributeDefault::XmlAttributeFixed => {
                self.default_value.as_deref()
            }
        }
    }
}
