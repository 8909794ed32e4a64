//! Reports uses of namespace bindings that exist only because of attribute
//! defaulting.
//!
//! A document relying on such a binding resolves differently when its DTD
//! is not read. Each prefix is reported once per document, whatever element
//! declared it. Reporting never changes the outcome of a check.

use std::fmt;

use crate::{
    error::XmlRange,
    parser::{element::XmlElementStack, namespace::XmlNamespaceScope},
    xmlmemory::{XmlNoMemory, xml_strndup, xml_try_push, xml_try_reserve},
};

/// Receiver of tainted namespace warnings.
pub type StructuredWarning = Box<dyn FnMut(&XmlTaintedNamespaceWarning)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTaintedNamespaceWarning {
    /// Qualified name of the element whose defaulted attribute declared the binding.
    pub element: String,
    /// Start tag of that element.
    pub range: Option<XmlRange>,
    pub prefix: Option<String>,
    pub uri: String,
    /// The default came from the external subset.
    pub external: bool,
}

impl fmt::Display for XmlTaintedNamespaceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "namespace prefix '{prefix}'")?,
            None => write!(f, "default namespace")?,
        }
        write!(
            f,
            " bound to '{}' only by a defaulted attribute of <{}>",
            self.uri, self.element
        )?;
        if let Some(range) = self.range {
            write!(f, " at {range}")?;
        }
        if self.external {
            write!(f, " (external subset)")?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct XmlNsReporter {
    warned: Vec<Option<String>>,
    warnings: Vec<XmlTaintedNamespaceWarning>,
    callback: Option<StructuredWarning>,
}

impl XmlNsReporter {
    pub fn set_callback(&mut self, callback: Option<StructuredWarning>) {
        self.callback = callback;
    }

    /// Warnings recorded while no callback was set.
    pub fn warnings(&self) -> &[XmlTaintedNamespaceWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<XmlTaintedNamespaceWarning> {
        std::mem::take(&mut self.warnings)
    }

    fn make_warning(
        scope: &XmlNamespaceScope,
        elements: &XmlElementStack,
        binding: usize,
    ) -> Result<Option<XmlTaintedNamespaceWarning>, XmlNoMemory> {
        let Some(binding) = scope.binding(binding).filter(|binding| binding.is_tainted()) else {
            return Ok(None);
        };
        let Some(index) = binding.depth().checked_sub(1) else {
            return Ok(None);
        };
        let Some(record) = elements.get(index) else {
            return Ok(None);
        };
        let external = record
            .ns_decls()
            .iter()
            .rev()
            .find(|decl| decl.prefix.as_deref() == binding.prefix())
            .is_some_and(|decl| decl.external);
        Ok(Some(XmlTaintedNamespaceWarning {
            element: xml_strndup(elements.qname(index).unwrap_or_default())?,
            range: record.range(),
            prefix: binding.prefix().map(xml_strndup).transpose()?,
            uri: xml_strndup(binding.uri())?,
            external,
        }))
    }

    /// Note that a name was resolved with the scope entry `binding`.
    pub(crate) fn binding_used(
        &mut self,
        scope: &XmlNamespaceScope,
        elements: &XmlElementStack,
        binding: usize,
    ) {
        let Some(prefix) = scope
            .binding(binding)
            .filter(|binding| binding.is_tainted())
            .map(|binding| binding.prefix())
        else {
            return;
        };
        if self.warned.iter().any(|warned| warned.as_deref() == prefix) {
            return;
        }
        // failing to allocate a warning only loses the warning
        let Ok(Some(warning)) = Self::make_warning(scope, elements, binding) else {
            return;
        };
        if xml_try_reserve(&mut self.warned, 1).is_err() {
            return;
        }
        self.warned.push(warning.prefix.clone());
        if let Some(callback) = self.callback.as_mut() {
            callback(&warning);
        } else {
            xml_try_push(&mut self.warnings, warning).ok();
        }
    }
}
