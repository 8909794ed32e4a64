//! Well-formedness and namespace checking of a token stream.
//!
//! [`XmlCheckingTokenHandler`] sits between a tokenizer and a secondary
//! token handler. Each token is checked against the XML and Namespaces in
//! XML well-formedness constraints, start tags get their defaulted
//! attributes and every element and attribute name is resolved, and only
//! then is the token passed on.
//!
//! The first well-formedness error is fatal: the checker enters the failed
//! state and rejects all further tokens. An allocation failure is not, and
//! leaves the checker as it was before the token, so that the token can be
//! delivered again.

use std::rc::Rc;

#[cfg(feature = "diagnostics")]
use crate::parser::report::{StructuredWarning, XmlNsReporter, XmlTaintedNamespaceWarning};
use crate::{
    error::{XmlCheckError, XmlCheckErrors, XmlRange, XmlWellFormednessError},
    generic_error,
    parser::{
        defaults::inject_default_attributes,
        element::XmlElementStack,
        namespace::{
            XML_XML_NAMESPACE, XmlNamespaceScope, XmlNsDeclaration, XmlResolveOutcome, XmlVersion,
        },
        token::{XmlToken, XmlTokenHandler, XmlTokenHandlerStatus, XmlTokenType},
    },
    tree::{XmlDoctype, XmlKnownDefaultAttributes},
    xmlmemory::xml_try_push,
};

/// Options of the checker, combined with `|` as `i32` bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlCheckerOption {
    /// Check a fragment: text, CDATA, and any number of elements are
    /// allowed at top level.
    XmlCheckFragment = 1 << 0,
    /// Do not inject defaulted attributes.
    XmlCheckNoDefaults = 1 << 1,
    /// Do not report tainted namespace bindings.
    XmlCheckNoTaintWarnings = 1 << 2,
    /// Do not mark ID attributes.
    XmlCheckNoIds = 1 << 3,
}

/// Construction parameters of a checker.
#[derive(Debug, Clone, Default)]
pub struct XmlCheckerConfig {
    /// Combination of [`XmlCheckerOption`].
    pub options: i32,
    /// Namespace bindings in effect around a fragment, as `(prefix, uri)`.
    pub nsdeclarations: Vec<(Option<String>, String)>,
    pub known_defaults: Option<Rc<XmlKnownDefaultAttributes>>,
}

impl XmlCheckerConfig {
    pub fn with_options(mut self, options: i32) -> Self {
        self.options = options;
        self
    }

    pub fn with_nsdeclaration(mut self, prefix: Option<&str>, uri: &str) -> Self {
        self.nsdeclarations
            .push((prefix.map(|prefix| prefix.to_owned()), uri.to_owned()));
        self
    }

    pub fn with_known_defaults(mut self, known: Rc<XmlKnownDefaultAttributes>) -> Self {
        self.known_defaults = Some(known);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlCheckerState {
    /// Before the document element.
    Prolog,
    /// The document element has started.
    Content,
    Finished,
    Failed,
}

pub struct XmlCheckingTokenHandler<H: XmlTokenHandler> {
    secondary: H,
    options: i32,
    state: XmlCheckerState,
    xml_decl_allowed: bool,
    doctype_seen: bool,
    root_seen: bool,
    version: XmlVersion,
    elements: XmlElementStack,
    scope: XmlNamespaceScope,
    doctype: Option<Rc<XmlDoctype>>,
    known_defaults: Option<Rc<XmlKnownDefaultAttributes>>,
    last_error: Option<XmlWellFormednessError>,
    /// Attributes of the current start tag marked as IDs by the checker.
    marked_ids: Vec<usize>,
    #[cfg(feature = "diagnostics")]
    reporter: XmlNsReporter,
}

impl<H: XmlTokenHandler> XmlCheckingTokenHandler<H> {
    /// Create a checker for a complete document, forwarding to `secondary`.
    pub fn new(secondary: H) -> Self {
        Self {
            secondary,
            options: 0,
            state: XmlCheckerState::Prolog,
            xml_decl_allowed: true,
            doctype_seen: false,
            root_seen: false,
            version: XmlVersion::Xml10,
            elements: XmlElementStack::new(),
            scope: XmlNamespaceScope::new(),
            doctype: None,
            known_defaults: None,
            last_error: None,
            marked_ids: vec![],
            #[cfg(feature = "diagnostics")]
            reporter: XmlNsReporter::default(),
        }
    }

    pub fn with_config(secondary: H, config: &XmlCheckerConfig) -> Result<Self, XmlCheckError> {
        let mut checker = Self::new(secondary);
        let unknown = checker.use_options(config.options);
        if unknown != 0 {
            generic_error!("Unknown checker options {unknown:#x} ignored\n");
        }
        checker.scope = XmlNamespaceScope::with_ambient(
            config
                .nsdeclarations
                .iter()
                .map(|(prefix, uri)| (prefix.as_deref(), uri.as_str())),
        )?;
        checker.known_defaults = config.known_defaults.clone();
        Ok(checker)
    }

    /// Applies the options to the checker.
    ///
    /// Returns the options the checker does not know.
    pub fn use_options(&mut self, mut options: i32) -> i32 {
        self.options = 0;
        if options & XmlCheckerOption::XmlCheckFragment as i32 != 0 {
            options -= XmlCheckerOption::XmlCheckFragment as i32;
            self.options |= XmlCheckerOption::XmlCheckFragment as i32;
        }
        if options & XmlCheckerOption::XmlCheckNoDefaults as i32 != 0 {
            options -= XmlCheckerOption::XmlCheckNoDefaults as i32;
            self.options |= XmlCheckerOption::XmlCheckNoDefaults as i32;
        }
        if options & XmlCheckerOption::XmlCheckNoTaintWarnings as i32 != 0 {
            options -= XmlCheckerOption::XmlCheckNoTaintWarnings as i32;
            self.options |= XmlCheckerOption::XmlCheckNoTaintWarnings as i32;
        }
        if options & XmlCheckerOption::XmlCheckNoIds as i32 != 0 {
            options -= XmlCheckerOption::XmlCheckNoIds as i32;
            self.options |= XmlCheckerOption::XmlCheckNoIds as i32;
        }
        options
    }

    pub fn has_option(&self, option: XmlCheckerOption) -> bool {
        self.options & option as i32 != 0
    }

    pub fn is_fragment(&self) -> bool {
        self.has_option(XmlCheckerOption::XmlCheckFragment)
    }

    /// Set the document type model used for defaulting and ID detection.
    ///
    /// A DOCTYPE token carrying declarations replaces it.
    pub fn set_doctype(&mut self, doctype: Option<Rc<XmlDoctype>>) {
        self.doctype = doctype;
    }

    pub fn doctype(&self) -> Option<&XmlDoctype> {
        self.doctype.as_deref()
    }

    pub fn state(&self) -> XmlCheckerState {
        self.state
    }

    pub fn version(&self) -> XmlVersion {
        self.version
    }

    pub fn elements(&self) -> &XmlElementStack {
        &self.elements
    }

    pub fn scope(&self) -> &XmlNamespaceScope {
        &self.scope
    }

    /// The error that made the checker fail.
    pub fn last_error(&self) -> Option<&XmlWellFormednessError> {
        self.last_error.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.secondary
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.secondary
    }

    pub fn into_handler(self) -> H {
        self.secondary
    }

    /// Deliver tainted namespace warnings to `callback` instead of keeping
    /// them.
    #[cfg(feature = "diagnostics")]
    pub fn set_warning_callback(&mut self, callback: Option<StructuredWarning>) {
        self.reporter.set_callback(callback);
    }

    /// Tainted namespace warnings kept so far.
    #[cfg(feature = "diagnostics")]
    pub fn warnings(&self) -> &[XmlTaintedNamespaceWarning] {
        self.reporter.warnings()
    }

    /// Remove and return the warnings kept so far.
    #[cfg(feature = "diagnostics")]
    pub fn take_warnings(&mut self) -> Vec<XmlTaintedNamespaceWarning> {
        self.reporter.take_warnings()
    }

    /// Check `token` and pass it on to the secondary handler.
    pub fn handle_token(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if matches!(
            self.state,
            XmlCheckerState::Finished | XmlCheckerState::Failed
        ) {
            return Err(XmlCheckError::Terminated);
        }

        let res = match token.typ {
            XmlTokenType::XmlTokenXMLDecl => self.handle_xml_decl(token),
            XmlTokenType::XmlTokenPI if token.name.qname() == "xml" => self.handle_xml_decl(token),
            XmlTokenType::XmlTokenPI => self.handle_pi(token),
            XmlTokenType::XmlTokenComment => self.forward(token),
            XmlTokenType::XmlTokenCDATA => self.handle_cdata(token),
            XmlTokenType::XmlTokenDoctype => self.handle_doctype(token),
            XmlTokenType::XmlTokenText => self.handle_text(token),
            XmlTokenType::XmlTokenSTag => self.handle_start_tag(token, false),
            XmlTokenType::XmlTokenEmptyElemTag => self.handle_start_tag(token, true),
            XmlTokenType::XmlTokenETag => self.handle_end_tag(token),
            XmlTokenType::XmlTokenFinished => self.handle_finished(token),
        };

        match res {
            Ok(status) => {
                self.xml_decl_allowed = false;
                Ok(status)
            }
            Err(XmlCheckError::WellFormedness(error)) => {
                self.state = XmlCheckerState::Failed;
                self.last_error = Some(error.clone());
                Err(XmlCheckError::WellFormedness(error))
            }
            Err(XmlCheckError::Aborted) => {
                self.state = XmlCheckerState::Failed;
                Err(XmlCheckError::Aborted)
            }
            Err(err) => Err(err),
        }
    }

    fn forward(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        self.secondary.handle_token(token).map_err(|err| match err {
            XmlCheckError::Terminated => XmlCheckError::Aborted,
            err => err,
        })
    }

    fn error_at(code: XmlCheckErrors, range: Option<XmlRange>) -> XmlCheckError {
        XmlWellFormednessError::new(code).with_location(range).into()
    }

    fn attribute_error(
        code: XmlCheckErrors,
        token: &XmlToken,
        index: usize,
        related: Option<usize>,
    ) -> XmlCheckError {
        XmlWellFormednessError::new(code)
            .with_location(token.attribute_range(index).or(token.range))
            .with_related_location(related.and_then(|related| token.attribute_range(related)))
            .with_attributes(index, related)
            .into()
    }

    /// Search a pair of attributes with the same name, returning
    /// `(later, earlier)` indices.
    fn find_duplicate_attribute(
        token: &XmlToken,
        same: impl Fn(usize, usize) -> bool,
    ) -> Option<(usize, usize)> {
        (1..token.attributes.len())
            .find_map(|i| (0..i).find(|&j| same(i, j)).map(|j| (i, j)))
    }

    #[cfg(feature = "diagnostics")]
    fn start_tag_range(&self, index: usize) -> Option<XmlRange> {
        self.elements.get(index).and_then(|record| record.range())
    }

    #[cfg(not(feature = "diagnostics"))]
    fn start_tag_range(&self, _index: usize) -> Option<XmlRange> {
        None
    }

    fn note_binding(&mut self, binding: Option<usize>) {
        #[cfg(feature = "diagnostics")]
        if let Some(binding) =
            binding.filter(|_| !self.has_option(XmlCheckerOption::XmlCheckNoTaintWarnings))
        {
            self.reporter
                .binding_used(&self.scope, &self.elements, binding);
        }
        #[cfg(not(feature = "diagnostics"))]
        let _ = binding;
    }

    fn handle_xml_decl(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if !self.xml_decl_allowed {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrOutOfPlaceXMLDecl,
                token.range,
            ));
        }
        let version = token
            .get_attribute("version")
            .map_or(XmlVersion::Xml10, |attr| {
                XmlVersion::from_version_info(&attr.value)
            });
        let status = self.forward(token)?;
        self.version = version;
        Ok(status)
    }

    fn handle_pi(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if token.name.qname() == "xml-stylesheet" {
            if let Some((i, j)) = Self::find_duplicate_attribute(token, |i, j| {
                token.attributes[i].name.qname() == token.attributes[j].name.qname()
            }) {
                return Err(Self::attribute_error(
                    XmlCheckErrors::XmlErrUniqueAttSpecXMLStylesheet,
                    token,
                    i,
                    Some(j),
                ));
            }
        }
        self.forward(token)
    }

    fn handle_cdata(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if self.elements.is_empty() && !self.is_fragment() {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrUnexpectedCDATA,
                token.range,
            ));
        }
        self.forward(token)
    }

    fn handle_doctype(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if self.doctype_seen || self.root_seen {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrOutOfPlaceDoctype,
                token.range,
            ));
        }
        let status = self.forward(token)?;
        self.doctype_seen = true;
        if let Some(doctype) = token.doctype.as_ref() {
            self.doctype = Some(doctype.clone());
        }
        Ok(status)
    }

    fn handle_text(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if self.elements.is_empty() && !self.is_fragment() && !token.is_whitespace() {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrUnexpectedText,
                token.range,
            ));
        }
        self.forward(token)
    }

    fn handle_start_tag(
        &mut self,
        token: &mut XmlToken,
        empty: bool,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if self.root_seen && self.elements.is_empty() && !self.is_fragment() {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrUnexpectedSTag,
                token.range,
            ));
        }

        let attr_count = token.attributes.len();
        let scope_len = self.scope.len();
        let depth = self.elements.depth();
        self.marked_ids.clear();
        let res = self
            .start_element(token)
            .and_then(|()| self.forward(token));
        match res {
            Ok(status) => {
                self.root_seen = true;
                self.state = XmlCheckerState::Content;
                if empty {
                    self.end_element();
                }
                Ok(status)
            }
            Err(XmlCheckError::NoMemory) => {
                for &i in &self.marked_ids {
                    if let Some(attr) = token.attributes.get_mut(i) {
                        attr.is_id = false;
                    }
                }
                self.marked_ids.clear();
                token.attributes.truncate(attr_count);
                for attr in token.attributes.iter_mut() {
                    attr.name.reset_resolution();
                }
                token.name.reset_resolution();
                while self.elements.depth() > depth {
                    self.elements.pop_element();
                }
                self.scope.truncate(scope_len);
                Err(XmlCheckError::NoMemory)
            }
            Err(err) => Err(err),
        }
    }

    /// Open the element of the start tag `token`, process its attributes,
    /// and resolve all of its names.
    fn start_element(&mut self, token: &mut XmlToken) -> Result<(), XmlCheckError> {
        let index = self.elements.push_element(token.name.qname(), token.entity)?;
        let depth = index + 1;
        #[cfg(feature = "diagnostics")]
        self.elements.set_range(index, token.range);

        if !self.has_option(XmlCheckerOption::XmlCheckNoDefaults) {
            inject_default_attributes(
                token,
                self.doctype.as_deref(),
                self.known_defaults.as_deref(),
            )?;
        }

        for i in 0..token.attributes.len() {
            let attr = &token.attributes[i];
            let decl = self
                .scope
                .process_attribute(&attr.name, &attr.value, attr.specified, depth, self.version)
                .map_err(|err| match err.code() {
                    Some(code) => Self::attribute_error(code, token, i, None),
                    None => err,
                })?;
            #[cfg(feature = "diagnostics")]
            if decl == XmlNsDeclaration::Tainted {
                let external = self
                    .doctype
                    .as_deref()
                    .and_then(|dtd| dtd.get_attr_desc(token.name.qname(), attr.name.qname()))
                    .is_some_and(|desc| desc.is_external());
                let prefix = attr.name.prefix().map(|_| attr.name.local_part());
                // the annotation only refines warnings
                self.elements
                    .annotate_ns_decl(index, prefix, &attr.value, external)
                    .ok();
            }
            #[cfg(not(feature = "diagnostics"))]
            let _ = decl;
        }

        match self.scope.resolve(&mut token.name, true)? {
            XmlResolveOutcome::Resolved { binding } => self.note_binding(binding),
            XmlResolveOutcome::UndeclaredPrefix => {
                return Err(Self::error_at(
                    XmlCheckErrors::XmlNsErrUndeclaredPrefix,
                    token.range,
                ));
            }
            XmlResolveOutcome::ReservedPrefix => {
                return Err(Self::error_at(
                    XmlCheckErrors::XmlNsErrReservedPrefix,
                    token.range,
                ));
            }
        }
        self.elements.set_resolution(index, token.name.resolution())?;

        for i in 0..token.attributes.len() {
            match self.scope.resolve(&mut token.attributes[i].name, false)? {
                XmlResolveOutcome::Resolved { binding } => self.note_binding(binding),
                XmlResolveOutcome::UndeclaredPrefix => {
                    return Err(Self::attribute_error(
                        XmlCheckErrors::XmlNsErrUndeclaredPrefix,
                        token,
                        i,
                        None,
                    ));
                }
                XmlResolveOutcome::ReservedPrefix => {
                    return Err(Self::attribute_error(
                        XmlCheckErrors::XmlNsErrReservedPrefix,
                        token,
                        i,
                        None,
                    ));
                }
            }
        }

        if !self.has_option(XmlCheckerOption::XmlCheckNoIds) {
            let id_name = self
                .doctype
                .as_deref()
                .and_then(|dtd| dtd.lookup_element(token.name.qname()))
                .and_then(|elem| elem.id_attribute())
                .map(|attr| attr.name());
            for (i, attr) in token.attributes.iter_mut().enumerate() {
                if attr.is_id {
                    continue;
                }
                let xml_id = attr.name.uri() == Some(XML_XML_NAMESPACE)
                    && attr.name.local_part() == "id";
                if xml_id || id_name == Some(attr.name.qname()) {
                    xml_try_push(&mut self.marked_ids, i)?;
                    attr.is_id = true;
                }
            }
        }

        if let Some((i, j)) = Self::find_duplicate_attribute(token, |i, j| {
            token.attributes[i]
                .name
                .expanded_eq(&token.attributes[j].name)
        }) {
            return Err(Self::attribute_error(
                XmlCheckErrors::XmlErrUniqueAttSpec,
                token,
                i,
                Some(j),
            ));
        }
        Ok(())
    }

    /// Close the innermost element and the namespace bindings it declared.
    fn end_element(&mut self) {
        let depth = self.elements.depth();
        self.elements.pop_element();
        self.scope.pop(depth);
    }

    fn handle_end_tag(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        let Some(top) = self.elements.top() else {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrUnexpectedETag,
                token.range,
            ));
        };
        if self.elements.qname(top) != Some(token.name.qname()) {
            return Err(XmlWellFormednessError::new(XmlCheckErrors::XmlErrMismatchedETag)
                .with_location(token.range)
                .with_related_location(self.start_tag_range(top))
                .into());
        }
        if !self
            .elements
            .matches_close_tag(token.name.qname(), token.entity)
        {
            return Err(XmlWellFormednessError::new(XmlCheckErrors::XmlErrGEMatchesContent)
                .with_location(token.range)
                .with_related_location(self.start_tag_range(top))
                .into());
        }

        if let Some(record) = self.elements.get(top) {
            token.name.set_resolution_from(record.resolution())?;
        }
        #[cfg(all(debug_assertions, feature = "diagnostics"))]
        if token.name.uri() != self.scope.lookup_uri(token.name.prefix()) {
            generic_error!(
                "Namespace of end tag {} differs from the one in scope\n",
                token.name
            );
        }

        let status = self.forward(token).inspect_err(|err| {
            if *err == XmlCheckError::NoMemory {
                token.name.reset_resolution();
            }
        })?;
        self.end_element();
        Ok(status)
    }

    fn handle_finished(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        if let Some(top) = self.elements.top() {
            return Err(XmlWellFormednessError::new(XmlCheckErrors::XmlErrUnexpectedEOF)
                .with_location(token.range)
                .with_related_location(self.start_tag_range(top))
                .into());
        }
        if !self.root_seen && !self.is_fragment() {
            return Err(Self::error_at(
                XmlCheckErrors::XmlErrMissingDocumentElement,
                token.range,
            ));
        }
        // an empty fragment forwards nothing but this end-of-input marker
        let status = self.forward(token)?;
        self.state = XmlCheckerState::Finished;
        Ok(status)
    }
}

impl<H: XmlTokenHandler> XmlTokenHandler for XmlCheckingTokenHandler<H> {
    fn handle_token(
        &mut self,
        token: &mut XmlToken,
    ) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        XmlCheckingTokenHandler::handle_token(self, token)
    }
}
