//! Default attribute injection.
//!
//! Declarations are matched on raw qualified names, before any namespace
//! processing, since DTDs declare attributes by their qualified names.

use crate::{
    parser::{
        qname::XmlCompleteName,
        token::{XmlToken, XmlTokenAttribute},
    },
    tree::{XmlDoctype, XmlKnownDefaultAttributes},
    xmlmemory::{XmlNoMemory, xml_strndup, xml_try_push},
};

fn push_default_attribute(token: &mut XmlToken, name: &str, value: &str) -> Result<bool, XmlNoMemory> {
    if token.get_attribute(name).is_some() {
        return Ok(false);
    }
    let attr = XmlTokenAttribute {
        name: XmlCompleteName::try_new(name)?,
        value: xml_strndup(value)?,
        specified: false,
        is_id: false,
        range: None,
    };
    xml_try_push(&mut token.attributes, attr)?;
    Ok(true)
}

/// Append to the start tag `token` the defaulted attributes it does not
/// specify.
///
/// Attributes with a default in `doctype` come first, in declaration order,
/// followed by those of the `known` table. Returns the number of attributes
/// appended. On failure some attributes may already have been appended.
pub fn inject_default_attributes(
    token: &mut XmlToken,
    doctype: Option<&XmlDoctype>,
    known: Option<&XmlKnownDefaultAttributes>,
) -> Result<usize, XmlNoMemory> {
    let mut injected = 0;
    if let Some(element) = doctype.and_then(|dtd| dtd.lookup_element(token.name.qname())) {
        for (attr, value) in element.defaulted_attributes() {
            if push_default_attribute(token, attr.name(), value)? {
                injected += 1;
            }
        }
    }
    if let Some(known) = known {
        let mut index = 0;
        while let Some((name, value, _)) =
            known.lookup_known_default_attribute(token.name.qname(), index)
        {
            if push_default_attribute(token, name, value)? {
                injected += 1;
            }
            index += 1;
        }
    }
    Ok(injected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        tree::{XmlAttributeDefault, XmlAttributeType},
        xmlmemory::xml_mem_setup_failure,
    };

    fn doctype() -> XmlDoctype {
        let mut dtd = XmlDoctype::new(Some("a"));
        for (name, def, value) in [
            ("req", XmlAttributeDefault::XmlAttributeRequired, None),
            ("imp", XmlAttributeDefault::XmlAttributeImplied, None),
            ("fix", XmlAttributeDefault::XmlAttributeFixed, Some("f")),
            ("plain", XmlAttributeDefault::XmlAttributeNone, Some("p")),
            ("xmlns:d", XmlAttributeDefault::XmlAttributeFixed, Some("urn:d")),
        ] {
            dtd.add_attribute_decl("a", name, XmlAttributeType::XmlAttributeCDATA, def, value, false);
        }
        dtd
    }

    #[test]
    fn inject_from_doctype_test() {
        let dtd = doctype();
        let mut token = XmlToken::stag("a").with_attribute("plain", "given");
        assert_eq!(inject_default_attributes(&mut token, Some(&dtd), None), Ok(2));
        let attrs = token
            .attributes
            .iter()
            .map(|attr| (attr.name.qname(), attr.value.as_str(), attr.specified))
            .collect::<Vec<_>>();
        assert_eq!(
            attrs,
            [
                ("plain", "given", true),
                ("fix", "f", false),
                ("xmlns:d", "urn:d", false)
            ]
        );

        // other elements are untouched
        let mut token = XmlToken::stag("b");
        assert_eq!(inject_default_attributes(&mut token, Some(&dtd), None), Ok(0));
        assert!(token.attributes.is_empty());
    }

    #[test]
    fn inject_known_defaults_test() {
        let mut known = XmlKnownDefaultAttributes::new();
        known.add("a", "fix", "known", true).add("a", "k", "v", false);
        let dtd = doctype();
        let mut token = XmlToken::stag("a");
        assert_eq!(inject_default_attributes(&mut token, Some(&dtd), Some(&known)), Ok(4));
        // the doctype default wins over the known one
        assert_eq!(token.get_attribute("fix").unwrap().value, "f");
        assert_eq!(token.get_attribute("k").unwrap().value, "v");

        let mut token = XmlToken::stag("a");
        assert_eq!(inject_default_attributes(&mut token, None, Some(&known)), Ok(2));
    }

    #[test]
    fn inject_failure_test() {
        let dtd = doctype();
        let mut token = XmlToken::stag("a");
        xml_mem_setup_failure(Some(0));
        assert_eq!(
            inject_default_attributes(&mut token, Some(&dtd), None),
            Err(XmlNoMemory)
        );
        assert!(token.attributes.is_empty());
    }
}
