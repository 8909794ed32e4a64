//! Namespace scope chain and qualified name resolution.
//!
//! Bindings live in one stack, innermost last. Each binding remembers the
//! element depth it was declared at, so closing an element pops everything
//! declared at its depth or deeper. Bindings seeded at construction have
//! depth 0 and are never popped by element ends.

use crate::{
    error::{XmlCheckError, XmlCheckErrors},
    parser::qname::XmlCompleteName,
    xmlmemory::{XmlNoMemory, xml_strndup, xml_try_reserve},
};

pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XML_XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// XML version announced by the XML declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlVersion {
    #[default]
    Xml10,
    Xml11,
}

impl XmlVersion {
    pub fn from_version_info(version: &str) -> Self {
        if version == "1.1" {
            Self::Xml11
        } else {
            Self::Xml10
        }
    }
}

/// One `xmlns[:prefix]="uri"` declaration in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNamespaceBinding {
    pub(crate) prefix: Option<String>,
    /// Empty if the declaration undeclares the prefix.
    pub(crate) uri: String,
    pub(crate) depth: usize,
    /// Declared only through a defaulted attribute that changed the binding.
    pub(crate) tainted: bool,
}

impl XmlNamespaceBinding {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }
}

/// Result of resolving a qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlResolveOutcome {
    /// The name was resolved. `binding` is the index of the scope entry
    /// used, `None` for no namespace or the predeclared `xml` prefix.
    Resolved { binding: Option<usize> },
    UndeclaredPrefix,
    ReservedPrefix,
}

/// Result of processing an attribute as a namespace declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlNsDeclaration {
    NotDeclaration,
    Declared,
    /// Declared by a defaulted attribute whose value differs from the
    /// binding otherwise in scope.
    Tainted,
}

/// Check if the attribute name `xmlns` or `xmlns:*`.
pub fn is_namespace_declaration(name: &XmlCompleteName) -> bool {
    match name.prefix() {
        Some(prefix) => prefix == "xmlns",
        None => name.qname() == "xmlns",
    }
}

#[derive(Debug, Clone, Default)]
pub struct XmlNamespaceScope {
    bindings: Vec<XmlNamespaceBinding>,
}

impl XmlNamespaceScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope seeded with bindings of an enclosing context.
    pub fn with_ambient<'a>(
        decls: impl IntoIterator<Item = (Option<&'a str>, &'a str)>,
    ) -> Result<Self, XmlNoMemory> {
        let mut scope = Self::new();
        for (prefix, uri) in decls {
            scope.push(prefix, uri, 0)?;
        }
        Ok(scope)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn binding(&self, index: usize) -> Option<&XmlNamespaceBinding> {
        self.bindings.get(index)
    }

    /// Push a binding declared on the element at `depth`.
    ///
    /// A `None` or empty `prefix` denotes the default namespace.
    #[doc(alias = "nsPush")]
    pub fn push(&mut self, prefix: Option<&str>, uri: &str, depth: usize) -> Result<(), XmlNoMemory> {
        self.push_binding(prefix, uri, depth, false)
    }

    fn push_binding(
        &mut self,
        prefix: Option<&str>,
        uri: &str,
        depth: usize,
        tainted: bool,
    ) -> Result<(), XmlNoMemory> {
        let prefix = prefix.filter(|prefix| !prefix.is_empty());
        xml_try_reserve(&mut self.bindings, 1)?;
        let binding = XmlNamespaceBinding {
            prefix: prefix.map(xml_strndup).transpose()?,
            uri: xml_strndup(uri)?,
            depth,
            tainted,
        };
        self.bindings.push(binding);
        Ok(())
    }

    /// Discard all bindings declared at `to_depth` or deeper.
    ///
    /// Returns the number of discarded bindings.
    #[doc(alias = "nsPop")]
    pub fn pop(&mut self, to_depth: usize) -> usize {
        let keep = self
            .bindings
            .iter()
            .rposition(|binding| binding.depth < to_depth)
            .map_or(0, |pos| pos + 1);
        let removed = self.bindings.len() - keep;
        self.bindings.truncate(keep);
        removed
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.bindings.truncate(len);
    }

    /// Search the innermost binding of `prefix`.
    pub fn lookup(&self, prefix: Option<&str>) -> Option<(usize, &XmlNamespaceBinding)> {
        let prefix = prefix.filter(|prefix| !prefix.is_empty());
        self.bindings
            .iter()
            .enumerate()
            .rev()
            .find(|(_, binding)| binding.prefix.as_deref() == prefix)
    }

    /// Namespace URI bound to `prefix`, `None` if unbound or undeclared.
    pub fn lookup_uri(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_XML_NAMESPACE);
        }
        self.lookup(prefix)
            .map(|(_, binding)| binding.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve `name` against the bindings in scope and record the result
    /// in `name`.
    ///
    /// Unprefixed attribute names are never in a namespace. Prefixed
    /// `xmlns:*` attributes are namespace declarations and resolve to the
    /// xmlns namespace, while the `xmlns` prefix is reserved on elements.
    pub fn resolve(
        &self,
        name: &mut XmlCompleteName,
        is_element: bool,
    ) -> Result<XmlResolveOutcome, XmlNoMemory> {
        let Some(prefix) = name.prefix() else {
            if is_element {
                if let Some((index, binding)) =
                    self.lookup(None).filter(|(_, binding)| !binding.uri.is_empty())
                {
                    name.set_uri(&binding.uri)?;
                    return Ok(XmlResolveOutcome::Resolved {
                        binding: Some(index),
                    });
                }
            }
            name.set_no_namespace();
            return Ok(XmlResolveOutcome::Resolved { binding: None });
        };

        match prefix {
            "xmlns" if is_element => Ok(XmlResolveOutcome::ReservedPrefix),
            "xmlns" => {
                name.set_uri(XML_XMLNS_NAMESPACE)?;
                Ok(XmlResolveOutcome::Resolved { binding: None })
            }
            "xml" => {
                name.set_uri(XML_XML_NAMESPACE)?;
                Ok(XmlResolveOutcome::Resolved { binding: None })
            }
            prefix => {
                let Some((index, binding)) = self
                    .lookup(Some(prefix))
                    .filter(|(_, binding)| !binding.uri.is_empty())
                else {
                    return Ok(XmlResolveOutcome::UndeclaredPrefix);
                };
                name.set_uri(&binding.uri)?;
                Ok(XmlResolveOutcome::Resolved {
                    binding: Some(index),
                })
            }
        }
    }

    /// Process an attribute of the element at `depth` as a namespace
    /// declaration, pushing a binding if it is one.
    ///
    /// `specified` is `false` for attributes injected from defaults.
    pub fn process_attribute(
        &mut self,
        name: &XmlCompleteName,
        value: &str,
        specified: bool,
        depth: usize,
        version: XmlVersion,
    ) -> Result<XmlNsDeclaration, XmlCheckError> {
        if !is_namespace_declaration(name) {
            return Ok(XmlNsDeclaration::NotDeclaration);
        }
        let invalid = || XmlCheckError::wf(XmlCheckErrors::XmlNsErrInvalidNSDeclaration);

        let prefix = name.prefix().map(|_| name.local_part());
        match prefix {
            Some("xmlns") => {
                return Err(XmlCheckError::wf(XmlCheckErrors::XmlNsErrReservedPrefix));
            }
            Some("xml") => {
                // the xml prefix may only be bound to its own namespace,
                // which it already is
                if value != XML_XML_NAMESPACE {
                    return Err(invalid());
                }
                return Ok(XmlNsDeclaration::Declared);
            }
            Some(_) if value.is_empty() && version == XmlVersion::Xml10 => {
                return Err(invalid());
            }
            _ => {}
        }
        if value == XML_XML_NAMESPACE || value == XML_XMLNS_NAMESPACE {
            return Err(invalid());
        }

        let tainted = !specified && self.lookup_uri(prefix).unwrap_or("") != value;
        self.push_binding(prefix, value, depth, tainted)?;
        if tainted {
            Ok(XmlNsDeclaration::Tainted)
        } else {
            Ok(XmlNsDeclaration::Declared)
        }
    }
}
