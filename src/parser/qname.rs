use std::fmt;

use crate::xmlmemory::{XmlNoMemory, xml_strcpy, xml_strndup};

/// Parse an XML qualified name string
///
/// ```text
/// [NS 5] QName ::= (Prefix ':')? LocalPart
///
/// [NS 6] Prefix ::= NCName
///
/// [NS 7] LocalPart ::= NCName
/// ```
///
/// Returns `None` if the name doesn't have a prefix.
/// Otherwise, returns `Some((Prefix, LocalPart))`.
///
/// # Note
/// This function does not perform validation.
#[doc(alias = "xmlSplitQName2")]
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }
    name.split_once(':').filter(|qname| !qname.1.is_empty())
}

/// Namespace resolution state of a qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum XmlNameResolution {
    /// Not processed yet.
    #[default]
    Unresolved,
    /// Resolved to no namespace.
    NoNamespace,
    /// Resolved to the namespace with this URI.
    Namespace(String),
}

/// A qualified name as written in the document, together with the namespace
/// it resolves to once processed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlCompleteName {
    qname: String,
    prefix_len: Option<usize>,
    resolution: XmlNameResolution,
}

impl XmlCompleteName {
    /// Build an unresolved name from its qualified form.
    pub fn new(qname: &str) -> Self {
        Self {
            qname: qname.to_owned(),
            prefix_len: split_qname2(qname).map(|(prefix, _)| prefix.len()),
            resolution: XmlNameResolution::Unresolved,
        }
    }

    /// Same as [`XmlCompleteName::new`], reporting allocation failure.
    pub fn try_new(qname: &str) -> Result<Self, XmlNoMemory> {
        Ok(Self {
            qname: xml_strndup(qname)?,
            prefix_len: split_qname2(qname).map(|(prefix, _)| prefix.len()),
            resolution: XmlNameResolution::Unresolved,
        })
    }

    pub fn qname(&self) -> &str {
        &self.qname
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix_len.map(|len| &self.qname[..len])
    }

    pub fn local_part(&self) -> &str {
        self.prefix_len
            .map_or(&self.qname[..], |len| &self.qname[len + 1..])
    }

    pub fn resolution(&self) -> &XmlNameResolution {
        &self.resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution != XmlNameResolution::Unresolved
    }

    /// Namespace URI of a name resolved into a namespace.
    pub fn uri(&self) -> Option<&str> {
        match &self.resolution {
            XmlNameResolution::Namespace(uri) => Some(uri),
            _ => None,
        }
    }

    pub fn set_no_namespace(&mut self) {
        self.resolution = XmlNameResolution::NoNamespace;
    }

    /// Resolve the name into the namespace `uri`.
    pub fn set_uri(&mut self, uri: &str) -> Result<(), XmlNoMemory> {
        let res = match &mut self.resolution {
            XmlNameResolution::Namespace(buf) => xml_strcpy(buf, uri),
            resolution => xml_strndup(uri).map(|uri| *resolution = XmlNameResolution::Namespace(uri)),
        };
        if res.is_err() {
            self.resolution = XmlNameResolution::Unresolved;
        }
        res
    }

    /// Copy the resolution of `other`.
    pub fn set_resolution_from(&mut self, other: &XmlNameResolution) -> Result<(), XmlNoMemory> {
        match other {
            XmlNameResolution::Unresolved => self.reset_resolution(),
            XmlNameResolution::NoNamespace => self.set_no_namespace(),
            XmlNameResolution::Namespace(uri) => self.set_uri(uri)?,
        }
        Ok(())
    }

    pub fn reset_resolution(&mut self) {
        self.resolution = XmlNameResolution::Unresolved;
    }

    /// Compare expanded names, that is (namespace URI, local part).
    ///
    /// Unresolved names are never equal to anything.
    pub fn expanded_eq(&self, other: &Self) -> bool {
        self.is_resolved()
            && other.is_resolved()
            && self.resolution == other.resolution
            && self.local_part() == other.local_part()
    }
}

impl fmt::Display for XmlCompleteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_qname_test() {
        assert_eq!(split_qname2("p:a"), Some(("p", "a")));
        assert_eq!(split_qname2("a"), None);
        assert_eq!(split_qname2(":a"), None);
        assert_eq!(split_qname2("a:"), None);
        assert_eq!(split_qname2("p:a:b"), Some(("p", "a:b")));
    }

    #[test]
    fn complete_name_parts_test() {
        let name = XmlCompleteName::new("svg:rect");
        assert_eq!(name.prefix(), Some("svg"));
        assert_eq!(name.local_part(), "rect");
        assert!(!name.is_resolved());

        let name = XmlCompleteName::new("rect");
        assert_eq!(name.prefix(), None);
        assert_eq!(name.local_part(), "rect");
        assert_eq!(name.to_string(), "rect");
    }

    #[test]
    fn expanded_name_equality_test() {
        let mut a = XmlCompleteName::new("p:x");
        let mut b = XmlCompleteName::new("q:x");
        assert!(!a.expanded_eq(&b));
        a.set_uri("urn:x").unwrap();
        b.set_uri("urn:x").unwrap();
        assert!(a.expanded_eq(&b));
        b.set_uri("urn:y").unwrap();
        assert!(!a.expanded_eq(&b));

        let mut c = XmlCompleteName::new("x");
        c.set_no_namespace();
        assert!(!a.expanded_eq(&c));
        let mut d = XmlCompleteName::new("x");
        d.set_resolution_from(c.resolution()).unwrap();
        assert!(c.expanded_eq(&d));
    }
}
