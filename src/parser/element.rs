//! Stack of open elements.
//!
//! Records live in one arena: `records[..depth]` are the open elements, the
//! records past `depth` are kept for reuse. The qname of a record is stored
//! either in its own buffer or in a range of a buffer shared by the whole
//! stack, appended while it has spare capacity. Popping a record with shared
//! storage truncates the shared buffer back to where the record started.

use std::ops::Range;

#[cfg(feature = "diagnostics")]
use crate::error::XmlRange;
use crate::{
    parser::{qname::XmlNameResolution, token::XmlEntityId},
    xmlmemory::{XmlNoMemory, xml_str_reserve, xml_strcpy, xml_strndup, xml_try_push},
};

/// Initial capacity of the shared qname buffer.
const XML_ELEMENT_NAMES_INITIAL: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlElementQName {
    Owned(String),
    Shared(Range<usize>),
}

/// A namespace declaration of an element that changed the binding in scope
/// only because of attribute defaulting.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlNsDeclAnnotation {
    pub prefix: Option<String>,
    pub uri: String,
    /// The default came from the external subset.
    pub external: bool,
}

#[derive(Debug, Clone)]
pub struct XmlElementRecord {
    qname: XmlElementQName,
    resolution: XmlNameResolution,
    entity: Option<XmlEntityId>,
    parent: Option<usize>,
    #[cfg(feature = "diagnostics")]
    range: Option<XmlRange>,
    #[cfg(feature = "diagnostics")]
    ns_decls: Vec<XmlNsDeclAnnotation>,
}

impl XmlElementRecord {
    fn new() -> Self {
        Self {
            qname: XmlElementQName::Owned(String::new()),
            resolution: XmlNameResolution::Unresolved,
            entity: None,
            parent: None,
            #[cfg(feature = "diagnostics")]
            range: None,
            #[cfg(feature = "diagnostics")]
            ns_decls: vec![],
        }
    }

    pub fn resolution(&self) -> &XmlNameResolution {
        &self.resolution
    }

    pub fn entity(&self) -> Option<XmlEntityId> {
        self.entity
    }

    /// Index of the enclosing element.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    #[cfg(feature = "diagnostics")]
    pub fn range(&self) -> Option<XmlRange> {
        self.range
    }

    #[cfg(feature = "diagnostics")]
    pub fn ns_decls(&self) -> &[XmlNsDeclAnnotation] {
        &self.ns_decls
    }
}

#[derive(Debug, Default)]
pub struct XmlElementStack {
    records: Vec<XmlElementRecord>,
    depth: usize,
    names: String,
}

impl XmlElementStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.depth == 0
    }

    /// Number of records allocated, open or pooled.
    pub fn pooled(&self) -> usize {
        self.records.len()
    }

    /// Open an element named `qname`, read in `entity`.
    ///
    /// Returns the index of the new record, which is `depth() - 1`. On
    /// failure the stack is unchanged.
    pub fn push_element(
        &mut self,
        qname: &str,
        entity: Option<XmlEntityId>,
    ) -> Result<usize, XmlNoMemory> {
        let index = self.depth;
        if index == self.records.len() {
            xml_try_push(&mut self.records, XmlElementRecord::new())?;
        }

        if self.names.is_empty() && self.names.capacity() < qname.len() {
            xml_str_reserve(&mut self.names, qname.len().max(XML_ELEMENT_NAMES_INITIAL))?;
        }
        let storage = if self.names.capacity() - self.names.len() >= qname.len() {
            let start = self.names.len();
            self.names.push_str(qname);
            XmlElementQName::Shared(start..self.names.len())
        } else {
            match &mut self.records[index].qname {
                XmlElementQName::Owned(buf) => {
                    let mut buf = std::mem::take(buf);
                    xml_strcpy(&mut buf, qname)?;
                    XmlElementQName::Owned(buf)
                }
                XmlElementQName::Shared(_) => XmlElementQName::Owned(xml_strndup(qname)?),
            }
        };

        let record = &mut self.records[index];
        record.qname = storage;
        record.resolution = XmlNameResolution::Unresolved;
        record.entity = entity;
        record.parent = index.checked_sub(1);
        #[cfg(feature = "diagnostics")]
        {
            record.range = None;
            record.ns_decls.clear();
        }
        self.depth += 1;
        Ok(index)
    }

    /// Close the innermost element, keeping its record for reuse.
    pub fn pop_element(&mut self) {
        let Some(index) = self.depth.checked_sub(1) else {
            return;
        };
        let record = &mut self.records[index];
        if let XmlElementQName::Shared(range) = &record.qname {
            self.names.truncate(range.start);
        }
        #[cfg(feature = "diagnostics")]
        record.ns_decls.clear();
        self.depth = index;
    }

    /// Index of the innermost open element.
    pub fn top(&self) -> Option<usize> {
        self.depth.checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&XmlElementRecord> {
        self.records[..self.depth].get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut XmlElementRecord> {
        self.records[..self.depth].get_mut(index)
    }

    /// Qualified name of the open element `index`.
    pub fn qname(&self, index: usize) -> Option<&str> {
        match &self.get(index)?.qname {
            XmlElementQName::Owned(buf) => Some(buf),
            XmlElementQName::Shared(range) => self.names.get(range.clone()),
        }
    }

    /// Check if the innermost element is named `qname` and was read in
    /// `entity`.
    pub fn matches_close_tag(&self, qname: &str, entity: Option<XmlEntityId>) -> bool {
        self.top().is_some_and(|top| {
            self.qname(top) == Some(qname) && self.records[top].entity == entity
        })
    }

    pub(crate) fn set_resolution(
        &mut self,
        index: usize,
        resolution: &XmlNameResolution,
    ) -> Result<(), XmlNoMemory> {
        let Some(record) = self.get_mut(index) else {
            return Ok(());
        };
        match (&mut record.resolution, resolution) {
            (XmlNameResolution::Namespace(buf), XmlNameResolution::Namespace(uri)) => {
                xml_strcpy(buf, uri)?
            }
            (current, XmlNameResolution::Namespace(uri)) => {
                *current = XmlNameResolution::Namespace(xml_strndup(uri)?)
            }
            (current, other) => *current = other.clone(),
        }
        Ok(())
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn set_range(&mut self, index: usize, range: Option<XmlRange>) {
        if let Some(record) = self.get_mut(index) {
            record.range = range;
        }
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn annotate_ns_decl(
        &mut self,
        index: usize,
        prefix: Option<&str>,
        uri: &str,
        external: bool,
    ) -> Result<(), XmlNoMemory> {
        let Some(record) = self.get_mut(index) else {
            return Ok(());
        };
        let annotation = XmlNsDeclAnnotation {
            prefix: prefix.map(xml_strndup).transpose()?,
            uri: xml_strndup(uri)?,
            external,
        };
        xml_try_push(&mut record.ns_decls, annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlmemory::xml_mem_setup_failure;

    #[test]
    fn push_pop_test() {
        let mut stack = XmlElementStack::new();
        assert_eq!(stack.top(), None);
        let a = stack.push_element("a", None).unwrap();
        let b = stack.push_element("p:b", Some(XmlEntityId(1))).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.qname(b), Some("p:b"));
        assert_eq!(stack.get(b).unwrap().parent(), Some(a));
        assert!(stack.matches_close_tag("p:b", Some(XmlEntityId(1))));
        assert!(!stack.matches_close_tag("p:b", None));
        assert!(!stack.matches_close_tag("a", Some(XmlEntityId(1))));

        stack.pop_element();
        assert_eq!(stack.top(), Some(a));
        assert!(stack.matches_close_tag("a", None));
        assert!(stack.get(b).is_none());
        stack.pop_element();
        assert!(stack.is_empty());
        assert!(!stack.matches_close_tag("a", None));
        // popping an empty stack is a no-op
        stack.pop_element();
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn record_reuse_test() {
        let mut stack = XmlElementStack::new();
        for _ in 0..3 {
            stack.push_element("a", None).unwrap();
            stack.push_element("b", None).unwrap();
            stack.pop_element();
            stack.pop_element();
        }
        assert_eq!(stack.pooled(), 2);
    }

    #[test]
    fn owned_qname_storage_test() {
        let mut stack = XmlElementStack::new();
        let long = "l".repeat(XML_ELEMENT_NAMES_INITIAL);
        let outer = stack.push_element(&long, None).unwrap();
        // the shared buffer is full, so this name gets its own buffer
        let inner = stack.push_element("inner", None).unwrap();
        assert_eq!(stack.qname(outer), Some(long.as_str()));
        assert_eq!(stack.qname(inner), Some("inner"));
        stack.pop_element();
        assert_eq!(stack.qname(outer), Some(long.as_str()));
        stack.pop_element();
        let again = stack.push_element("c", None).unwrap();
        assert_eq!(stack.qname(again), Some("c"));
    }

    #[test]
    fn push_failure_leaves_stack_unchanged_test() {
        let mut stack = XmlElementStack::new();
        // record allocation fails
        xml_mem_setup_failure(Some(0));
        assert_eq!(stack.push_element("a", None), Err(XmlNoMemory));
        assert_eq!(stack.depth(), 0);
        // name buffer allocation fails
        xml_mem_setup_failure(Some(1));
        assert_eq!(stack.push_element("a", None), Err(XmlNoMemory));
        assert_eq!(stack.depth(), 0);
        // the retry succeeds
        assert_eq!(stack.push_element("a", None), Ok(0));
        assert_eq!(stack.qname(0), Some("a"));
    }

    #[test]
    fn resolution_test() {
        let mut stack = XmlElementStack::new();
        let a = stack.push_element("p:a", None).unwrap();
        stack
            .set_resolution(a, &XmlNameResolution::Namespace("urn:p".to_owned()))
            .unwrap();
        assert_eq!(
            stack.get(a).unwrap().resolution(),
            &XmlNameResolution::Namespace("urn:p".to_owned())
        );
        stack.pop_element();
        let b = stack.push_element("b", None).unwrap();
        assert_eq!(stack.get(b).unwrap().resolution(), &XmlNameResolution::Unresolved);
    }
}
