use std::rc::Rc;

use exml_check::{
    XmlCheckError, XmlCheckErrors, XmlPoint, XmlRange, XmlWellFormednessError,
    parser::{
        XML_XML_NAMESPACE, XmlCheckerConfig, XmlCheckerOption, XmlCheckerState,
        XmlCheckingTokenHandler, XmlToken, XmlTokenCollector, XmlTokenHandler,
        XmlTokenHandlerStatus, XmlTokenType,
    },
    tree::{XmlAttributeDefault, XmlAttributeType, XmlDoctype, XmlKnownDefaultAttributes},
};

type Checker = XmlCheckingTokenHandler<XmlTokenCollector>;

fn document() -> Checker {
    XmlCheckingTokenHandler::new(XmlTokenCollector::default())
}

fn fragment() -> Checker {
    let config =
        XmlCheckerConfig::default().with_options(XmlCheckerOption::XmlCheckFragment as i32);
    XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &config).unwrap()
}

fn feed(checker: &mut Checker, tokens: impl IntoIterator<Item = XmlToken>) -> Result<(), XmlCheckError> {
    for mut token in tokens {
        checker.handle_token(&mut token)?;
    }
    Ok(())
}

fn wf_error(res: Result<(), XmlCheckError>) -> XmlWellFormednessError {
    match res {
        Err(XmlCheckError::WellFormedness(error)) => error,
        other => panic!("expected a well-formedness error, got {other:?}"),
    }
}

fn line(n: u32) -> XmlRange {
    XmlRange::new(XmlPoint::new(n, 0), XmlPoint::new(n, 10))
}

fn forwarded_types(checker: &Checker) -> Vec<XmlTokenType> {
    checker.handler().tokens.iter().map(|token| token.typ).collect()
}

#[test]
fn nested_elements_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::stag("a"),
            XmlToken::stag("b"),
            XmlToken::etag("b"),
            XmlToken::etag("a"),
            XmlToken::finished(),
        ],
    )
    .unwrap();
    assert_eq!(
        forwarded_types(&checker),
        [
            XmlTokenType::XmlTokenSTag,
            XmlTokenType::XmlTokenSTag,
            XmlTokenType::XmlTokenETag,
            XmlTokenType::XmlTokenETag,
            XmlTokenType::XmlTokenFinished,
        ]
    );
    assert_eq!(checker.state(), XmlCheckerState::Finished);
}

#[test]
fn mismatched_end_tag_test() {
    let mut checker = document();
    feed(&mut checker, [XmlToken::stag("a").with_range(line(0))]).unwrap();
    let error = wf_error(feed(&mut checker, [XmlToken::etag("b").with_range(line(1))]));
    assert_eq!(error.code, XmlCheckErrors::XmlErrMismatchedETag);
    assert_eq!(error.location, Some(line(1)));
    #[cfg(feature = "diagnostics")]
    assert_eq!(error.related_location, Some(line(0)));

    // the element is still open at the moment of failure
    assert_eq!(checker.elements().depth(), 1);
    assert_eq!(checker.elements().qname(0), Some("a"));
    assert_eq!(checker.state(), XmlCheckerState::Failed);
    assert_eq!(
        feed(&mut checker, [XmlToken::finished()]),
        Err(XmlCheckError::Terminated)
    );
    assert_eq!(forwarded_types(&checker), [XmlTokenType::XmlTokenSTag]);
}

#[test]
fn duplicate_attribute_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("x", "1")
            .with_attribute("x", "2")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlErrUniqueAttSpec);
    assert_eq!(error.attribute, Some(1));
    assert_eq!(error.related_attribute, Some(0));
    assert!(checker.handler().tokens.is_empty());
}

#[test]
fn duplicate_expanded_name_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("xmlns:p", "urn:x")
            .with_attribute("xmlns:q", "urn:x")
            .with_attribute("p:a", "1")
            .with_attribute("q:a", "2")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlErrUniqueAttSpec);
    assert_eq!((error.attribute, error.related_attribute), (Some(3), Some(2)));
}

#[test]
fn duplicate_namespace_declaration_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("xmlns:p", "urn:x")
            .with_attribute("xmlns:p", "urn:y")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlErrUniqueAttSpec);
}

#[test]
fn undeclared_prefix_wins_over_duplicate_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("x", "1")
            .with_attribute("x", "2")
            .with_attribute("q:y", "3")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlNsErrUndeclaredPrefix);
    assert_eq!(error.attribute, Some(2));
}

#[test]
fn namespace_scope_test() {
    let mut checker = fragment();
    feed(
        &mut checker,
        [
            XmlToken::stag("a").with_attribute("xmlns:p", "urn:x"),
            XmlToken::stag("p:b"),
            XmlToken::etag("p:b"),
            XmlToken::etag("a"),
        ],
    )
    .unwrap();
    let tokens = &checker.handler().tokens;
    assert_eq!(tokens[1].name.uri(), Some("urn:x"));
    assert_eq!(tokens[2].name.uri(), Some("urn:x"));
    assert!(checker.scope().is_empty());

    let error = wf_error(feed(&mut checker, [XmlToken::stag("p:c")]));
    assert_eq!(error.code, XmlCheckErrors::XmlNsErrUndeclaredPrefix);
    assert_eq!(error.attribute, None);
}

#[test]
fn xml_declaration_after_comment_test() {
    let mut checker = document();
    feed(&mut checker, [XmlToken::comment("c")]).unwrap();
    let error = wf_error(feed(&mut checker, [XmlToken::pi("xml", "version=\"1.0\"")]));
    assert_eq!(error.code, XmlCheckErrors::XmlErrOutOfPlaceXMLDecl);

    // the target is compared case-sensitively
    let mut checker = document();
    feed(&mut checker, [XmlToken::comment("c"), XmlToken::pi("XML", "")]).unwrap();
}

fn id_doctype() -> Rc<XmlDoctype> {
    let mut dtd = XmlDoctype::new(Some("a"));
    dtd.add_attribute_decl(
        "a",
        "id",
        XmlAttributeType::XmlAttributeID,
        XmlAttributeDefault::XmlAttributeImplied,
        None,
        false,
    );
    Rc::new(dtd)
}

#[test]
fn id_attribute_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::doctype("a", Some(id_doctype())),
            XmlToken::stag("a").with_attribute("id", "foo"),
        ],
    )
    .unwrap();
    let stag = &checker.handler().tokens[1];
    assert_eq!(stag.attributes.len(), 1);
    assert!(stag.attributes[0].is_id);
    assert!(stag.attributes[0].specified);
}

#[test]
fn id_marking_disabled_test() {
    let config = XmlCheckerConfig::default().with_options(XmlCheckerOption::XmlCheckNoIds as i32);
    let mut checker =
        XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &config).unwrap();
    checker.set_doctype(Some(id_doctype()));
    feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("id", "foo")
            .with_attribute("xml:id", "bar")],
    )
    .unwrap();
    assert!(checker.handler().tokens[0].attributes.iter().all(|attr| !attr.is_id));
}

#[test]
fn xml_id_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [XmlToken::stag("b")
            .with_attribute("xml:id", "x1")
            .with_attribute("id", "x2")],
    )
    .unwrap();
    let attrs = &checker.handler().tokens[0].attributes;
    assert_eq!(attrs[0].name.uri(), Some(XML_XML_NAMESPACE));
    assert!(attrs[0].is_id);
    assert!(!attrs[1].is_id);
}

#[test]
fn empty_document_test() {
    let mut checker = document();
    let error = wf_error(feed(&mut checker, [XmlToken::finished().with_range(line(0))]));
    assert_eq!(error.code, XmlCheckErrors::XmlErrMissingDocumentElement);
    assert_eq!(error.location, Some(line(0)));

    let mut checker = fragment();
    feed(&mut checker, [XmlToken::finished()]).unwrap();
    // only the end of input itself is passed on
    assert_eq!(forwarded_types(&checker), [XmlTokenType::XmlTokenFinished]);
}

#[test]
fn self_closing_root_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::empty_elem_tag("a").with_attribute("xmlns", "urn:a"),
            XmlToken::finished(),
        ],
    )
    .unwrap();
    assert_eq!(
        forwarded_types(&checker),
        [
            XmlTokenType::XmlTokenEmptyElemTag,
            XmlTokenType::XmlTokenFinished
        ]
    );
    assert_eq!(checker.handler().tokens[0].name.uri(), Some("urn:a"));
    assert!(checker.elements().is_empty());
    assert_eq!(checker.elements().pooled(), 1);
    assert!(checker.scope().is_empty());
}

#[test]
fn reserved_prefix_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a").with_attribute("xmlns:xmlns", "urn:x")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlNsErrReservedPrefix);
    assert_eq!(error.attribute, Some(0));

    let mut checker = document();
    let error = wf_error(feed(&mut checker, [XmlToken::stag("xmlns:a")]));
    assert_eq!(error.code, XmlCheckErrors::XmlNsErrReservedPrefix);
    assert_eq!(error.attribute, None);
}

#[test]
fn invalid_declaration_test() {
    let mut checker = document();
    let error = wf_error(feed(
        &mut checker,
        [XmlToken::stag("a")
            .with_attribute("x", "1")
            .with_attribute("xmlns:p", "")],
    ));
    assert_eq!(error.code, XmlCheckErrors::XmlNsErrInvalidNSDeclaration);
    assert_eq!(error.attribute, Some(1));

    // XML 1.1 allows undeclaring prefixes
    let mut checker = document();
    let res = feed(
        &mut checker,
        [
            XmlToken::xml_decl("1.1"),
            XmlToken::stag("a").with_attribute("xmlns:p", "urn:p"),
            XmlToken::stag("b").with_attribute("xmlns:p", ""),
            XmlToken::stag("p:c"),
        ],
    );
    assert_eq!(
        wf_error(res).code,
        XmlCheckErrors::XmlNsErrUndeclaredPrefix
    );
}

#[test]
fn unexpected_eof_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::stag("a").with_range(line(0)),
            XmlToken::stag("b").with_range(line(1)),
        ],
    )
    .unwrap();
    let error = wf_error(feed(&mut checker, [XmlToken::finished().with_range(line(2))]));
    assert_eq!(error.code, XmlCheckErrors::XmlErrUnexpectedEOF);
    assert_eq!(error.location, Some(line(2)));
    #[cfg(feature = "diagnostics")]
    assert_eq!(error.related_location, Some(line(1)));
}

#[test]
fn whitespace_around_root_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::text("\n"),
            XmlToken::empty_elem_tag("a"),
            XmlToken::text(" \t"),
            XmlToken::comment("after"),
            XmlToken::finished(),
        ],
    )
    .unwrap();
    assert_eq!(checker.handler().tokens.len(), 5);
}

#[test]
fn known_defaults_test() {
    let mut known = XmlKnownDefaultAttributes::new();
    known.add("svg", "version", "1.1", false);
    let config = XmlCheckerConfig::default().with_known_defaults(Rc::new(known));
    let mut checker =
        XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &config).unwrap();
    feed(&mut checker, [XmlToken::empty_elem_tag("svg")]).unwrap();
    let attr = checker.handler().tokens[0].get_attribute("version").unwrap();
    assert_eq!(attr.value, "1.1");
    assert!(!attr.specified);
    assert!(attr.name.is_resolved());

    let config = config.with_options(XmlCheckerOption::XmlCheckNoDefaults as i32);
    let mut checker =
        XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &config).unwrap();
    feed(&mut checker, [XmlToken::empty_elem_tag("svg")]).unwrap();
    assert!(checker.handler().tokens[0].attributes.is_empty());
}

#[cfg(feature = "diagnostics")]
fn tainted_doctype() -> Rc<XmlDoctype> {
    let mut dtd = XmlDoctype::new(Some("a"));
    for elem in ["a", "b"] {
        dtd.add_attribute_decl(
            elem,
            "xmlns:p",
            XmlAttributeType::XmlAttributeCDATA,
            XmlAttributeDefault::XmlAttributeFixed,
            Some("urn:p"),
            true,
        );
    }
    Rc::new(dtd)
}

#[cfg(feature = "diagnostics")]
#[test]
fn tainted_namespace_warning_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::doctype("a", Some(tainted_doctype())),
            XmlToken::stag("a").with_range(line(1)),
            XmlToken::empty_elem_tag("p:x"),
            XmlToken::stag("b"),
            XmlToken::empty_elem_tag("p:y"),
            XmlToken::etag("b"),
            XmlToken::etag("a"),
            XmlToken::finished(),
        ],
    )
    .unwrap();
    let warnings = checker.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].element, "a");
    assert_eq!(warnings[0].prefix.as_deref(), Some("p"));
    assert_eq!(warnings[0].uri, "urn:p");
    assert_eq!(warnings[0].range, Some(line(1)));
    assert!(warnings[0].external);
    // the binding applies all the same
    assert_eq!(checker.handler().tokens[2].name.uri(), Some("urn:p"));

    assert_eq!(checker.take_warnings().len(), 1);
    assert!(checker.warnings().is_empty());
}

#[cfg(feature = "diagnostics")]
#[test]
fn explicit_declaration_not_tainted_test() {
    let mut checker = document();
    feed(
        &mut checker,
        [
            XmlToken::doctype("a", Some(tainted_doctype())),
            XmlToken::stag("a").with_attribute("xmlns:p", "urn:p"),
            XmlToken::empty_elem_tag("p:x"),
            // the default repeats the binding in scope
            XmlToken::empty_elem_tag("b"),
            XmlToken::etag("a"),
        ],
    )
    .unwrap();
    assert!(checker.warnings().is_empty());

    let config =
        XmlCheckerConfig::default().with_options(XmlCheckerOption::XmlCheckNoTaintWarnings as i32);
    let mut checker =
        XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &config).unwrap();
    checker.set_doctype(Some(tainted_doctype()));
    feed(&mut checker, [XmlToken::stag("a"), XmlToken::empty_elem_tag("p:x")]).unwrap();
    assert!(checker.warnings().is_empty());
}

struct Blocking {
    seen: usize,
}

impl XmlTokenHandler for Blocking {
    fn handle_token(&mut self, token: &mut XmlToken) -> Result<XmlTokenHandlerStatus, XmlCheckError> {
        self.seen += 1;
        match token.typ {
            XmlTokenType::XmlTokenSTag => Ok(XmlTokenHandlerStatus::Block),
            XmlTokenType::XmlTokenComment => Err(XmlCheckError::Aborted),
            _ => Ok(XmlTokenHandlerStatus::Continue),
        }
    }
}

#[test]
fn secondary_status_test() {
    let mut checker = XmlCheckingTokenHandler::new(Blocking { seen: 0 });
    assert_eq!(
        checker.handle_token(&mut XmlToken::stag("a")),
        Ok(XmlTokenHandlerStatus::Block)
    );
    assert_eq!(
        checker.handle_token(&mut XmlToken::text("t")),
        Ok(XmlTokenHandlerStatus::Continue)
    );
    assert_eq!(
        checker.handle_token(&mut XmlToken::comment("c")),
        Err(XmlCheckError::Aborted)
    );
    assert_eq!(checker.state(), XmlCheckerState::Failed);
    assert!(checker.last_error().is_none());
    assert_eq!(
        checker.handle_token(&mut XmlToken::etag("a")),
        Err(XmlCheckError::Terminated)
    );
    assert_eq!(checker.into_handler().seen, 3);
}

#[test]
fn chained_checkers_test() {
    let inner = XmlCheckingTokenHandler::new(XmlTokenCollector::default());
    let mut outer = XmlCheckingTokenHandler::new(inner);
    for mut token in [XmlToken::stag("a"), XmlToken::etag("a"), XmlToken::finished()] {
        outer.handle_token(&mut token).unwrap();
    }
    assert_eq!(outer.handler().state(), XmlCheckerState::Finished);
    assert_eq!(outer.handler().handler().tokens.len(), 3);
}
