mod attribute;
mod element;
mod known;

use std::collections::HashMap;

pub use attribute::*;
pub use element::*;
pub use known::*;

use super::{XmlAttributeDefault, XmlAttributeType};

/// The declarations of a document type, as far as the checker needs them.
///
/// Both declaration subsets are merged. Declarations from the external
/// subset are flagged, which only matters for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDoctype {
    pub(crate) name: Option<String>,
    pub(crate) public_id: Option<String>,
    pub(crate) system_id: Option<String>,
    pub(crate) elements: HashMap<String, XmlElement>,
}

impl XmlDoctype {
    pub fn new(name: Option<&str>) -> Self {
        Self {
            name: name.map(|name| name.to_owned()),
            ..Default::default()
        }
    }

    /// Set the external identifiers of the document type.
    pub fn with_external_id(mut self, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        self.public_id = public_id.map(|id| id.to_owned());
        self.system_id = system_id.map(|id| id.to_owned());
        self
    }

    /// Name of the document element, as given by the DOCTYPE declaration.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Register an attribute declaration.
    ///
    /// As in XML, the first declaration of an attribute is binding, so a
    /// redeclaration is ignored and `false` is returned.
    #[doc(alias = "xmlAddAttributeDecl")]
    pub fn add_attribute_decl(
        &mut self,
        elem: &str,
        name: &str,
        atype: XmlAttributeType,
        def: XmlAttributeDefault,
        default_value: Option<&str>,
        external: bool,
    ) -> bool {
        let element = self
            .elements
            .entry(elem.to_owned())
            .or_insert_with(|| XmlElement::new(elem));
        if element.get_attr_desc(name).is_some() {
            return false;
        }
        element.attributes.push(XmlAttribute {
            name: name.to_owned(),
            elem: elem.to_owned(),
            atype,
            def,
            default_value: default_value.map(|value| value.to_owned()),
            external,
        });
        true
    }

    /// Search the declarations of the element type `qname`.
    pub fn lookup_element(&self, qname: &str) -> Option<&XmlElement> {
        self.elements.get(qname)
    }

    /// Search the DTD for the description of this attribute on this element.
    #[doc(alias = "xmlGetDtdAttrDesc")]
    pub fn get_attr_desc(&self, elem: &str, name: &str) -> Option<&XmlAttribute> {
        self.lookup_element(elem)?.get_attr_desc(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> XmlDoctype {
        let mut dtd = XmlDoctype::new(Some("doc"));
        dtd.add_attribute_decl(
            "a",
            "id",
            XmlAttributeType::XmlAttributeID,
            XmlAttributeDefault::XmlAttributeImplied,
            None,
            false,
        );
        dtd.add_attribute_decl(
            "a",
            "xmlns:p",
            XmlAttributeType::XmlAttributeCDATA,
            XmlAttributeDefault::XmlAttributeFixed,
            Some("urn:p"),
            true,
        );
        dtd.add_attribute_decl(
            "a",
            "kind",
            XmlAttributeType::XmlAttributeEnumeration,
            XmlAttributeDefault::XmlAttributeNone,
            Some("plain"),
            false,
        );
        dtd
    }

    #[test]
    fn attribute_decl_test() {
        let mut dtd = sample();
        assert_eq!(dtd.name(), Some("doc"));
        let attr = dtd.get_attr_desc("a", "xmlns:p").unwrap();
        assert_eq!(attr.default_value(), Some("urn:p"));
        assert!(attr.is_external());
        assert!(dtd.get_attr_desc("b", "id").is_none());

        // the first declaration wins
        assert!(!dtd.add_attribute_decl(
            "a",
            "kind",
            XmlAttributeType::XmlAttributeCDATA,
            XmlAttributeDefault::XmlAttributeNone,
            Some("other"),
            false,
        ));
        assert_eq!(
            dtd.get_attr_desc("a", "kind").unwrap().default_value(),
            Some("plain")
        );
    }

    #[test]
    fn defaulted_attributes_test() {
        let dtd = sample();
        let elem = dtd.lookup_element("a").unwrap();
        let defaults = elem
            .defaulted_attributes()
            .map(|(attr, value)| (attr.name(), value))
            .collect::<Vec<_>>();
        assert_eq!(defaults, [("xmlns:p", "urn:p"), ("kind", "plain")]);
        assert_eq!(elem.id_attribute().map(|attr| attr.name()), Some("id"));
    }
}
