//! Line-oriented token traces.
//!
//! A trace describes a token stream, one token per line, so that checker
//! behavior can be reproduced without a tokenizer:
//!
//! ```text
//! # comment
//! %option fragment            checker option (fragment, no-defaults, no-taint-warnings, no-ids)
//! %nsdecl p urn:p             ambient binding, `-` for the default namespace
//! %known svg version "1.1"    known default attribute, optionally followed by `fixed`
//! %expect XmlErrMismatchedETag    or `%expect ok`
//! xmldecl version="1.0"
//! doctype a
//! attlist a id ID #IMPLIED    declarations of the preceding doctype
//! attlist a xmlns:p CDATA #FIXED "urn:p" external
//! stag a x="1"
//! empty b
//! etag a
//! text "part one" " part two"
//! cdata "data"
//! comment "data"
//! pi xml-stylesheet href="style.css" "optional data"
//! entity 1                    following tokens come from entity 1, `-` for the document
//! finished
//! ```
//!
//! Every token gets the range of its line, and every attribute the range of
//! its `name="value"` pair. Columns are byte offsets.

use std::{fmt::Write as _, rc::Rc};

use anyhow::{Context, bail};

use crate::{
    error::{XmlCheckError, XmlCheckErrors, XmlPoint, XmlRange},
    parser::{
        checker::{XmlCheckerConfig, XmlCheckerOption, XmlCheckingTokenHandler},
        qname::XmlNameResolution,
        token::{
            XmlEntityId, XmlLiteral, XmlToken, XmlTokenAttribute, XmlTokenCollector, XmlTokenType,
        },
    },
    tree::{XmlAttributeDefault, XmlAttributeType, XmlDoctype, XmlKnownDefaultAttributes},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlTraceWord<'a> {
    Bare {
        text: &'a str,
    },
    Quoted {
        text: String,
    },
    Pair {
        name: &'a str,
        value: String,
        start: usize,
        end: usize,
    },
}

/// Read the string whose opening quote is at `start`.
///
/// Returns the unescaped string and the position after the closing quote.
fn parse_quoted(line: &str, start: usize) -> anyhow::Result<(String, usize)> {
    let mut value = String::new();
    let mut chars = line[start + 1..].char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, start + i + 2)),
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, c)) => value.push(c),
                None => break,
            },
            c => value.push(c),
        }
    }
    bail!("unterminated string at column {}", start + 1)
}

fn split_words(line: &str) -> anyhow::Result<Vec<XmlTraceWord<'_>>> {
    let bytes = line.as_bytes();
    let mut words = vec![];
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos].is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if bytes[pos] == b'"' {
            let (text, end) = parse_quoted(line, pos)?;
            words.push(XmlTraceWord::Quoted { text });
            pos = end;
            continue;
        }
        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'"' {
            pos += 1;
        }
        let text = &line[start..pos];
        match text.strip_suffix('=') {
            Some(name) if bytes.get(pos) == Some(&b'"') => {
                let (value, end) = parse_quoted(line, pos)?;
                words.push(XmlTraceWord::Pair {
                    name,
                    value,
                    start,
                    end,
                });
                pos = end;
            }
            _ => words.push(XmlTraceWord::Bare { text }),
        }
    }
    Ok(words)
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// Outcome a trace expects from the checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlTraceExpectation {
    Ok,
    Error(XmlCheckErrors),
}

/// A parsed trace.
#[derive(Debug, Clone, Default)]
pub struct XmlTrace {
    pub tokens: Vec<XmlToken>,
    pub config: XmlCheckerConfig,
    pub expect: Option<XmlTraceExpectation>,
}

/// Result of replaying a trace.
#[derive(Debug)]
pub struct XmlTraceRun {
    pub forwarded: Vec<XmlToken>,
    pub result: Result<(), XmlCheckError>,
    pub warnings: Vec<String>,
}

impl XmlTraceRun {
    pub fn error_code(&self) -> Option<XmlCheckErrors> {
        self.result.as_ref().err().and_then(|err| err.code())
    }
}

pub fn checker_option_from_name(name: &str) -> Option<XmlCheckerOption> {
    match name {
        "fragment" => Some(XmlCheckerOption::XmlCheckFragment),
        "no-defaults" => Some(XmlCheckerOption::XmlCheckNoDefaults),
        "no-taint-warnings" => Some(XmlCheckerOption::XmlCheckNoTaintWarnings),
        "no-ids" => Some(XmlCheckerOption::XmlCheckNoIds),
        _ => None,
    }
}

fn bare<'a>(word: Option<&XmlTraceWord<'a>>, what: &str) -> anyhow::Result<&'a str> {
    match word {
        Some(XmlTraceWord::Bare { text }) => Ok(*text),
        _ => bail!("expected {what}"),
    }
}

fn quoted(word: Option<&XmlTraceWord<'_>>, what: &str) -> anyhow::Result<String> {
    match word {
        Some(XmlTraceWord::Quoted { text }) => Ok(text.clone()),
        _ => bail!("expected quoted {what}"),
    }
}

fn push_attributes(
    token: &mut XmlToken,
    words: &[XmlTraceWord<'_>],
    line: u32,
) -> anyhow::Result<()> {
    for word in words {
        match word {
            XmlTraceWord::Pair {
                name,
                value,
                start,
                end,
            } => {
                let mut attr = XmlTokenAttribute::new(name, value);
                attr.range = Some(XmlRange::new(
                    XmlPoint::new(line, *start as u32),
                    XmlPoint::new(line, *end as u32),
                ));
                token.attributes.push(attr);
            }
            XmlTraceWord::Quoted { text } if token.typ == XmlTokenType::XmlTokenPI => {
                token.literal.push_part(text);
            }
            _ => bail!("expected name=\"value\""),
        }
    }
    Ok(())
}

fn parse_attlist(doctype: &mut XmlDoctype, words: &[XmlTraceWord<'_>]) -> anyhow::Result<()> {
    let elem = bare(words.first(), "element name")?;
    let name = bare(words.get(1), "attribute name")?;
    let keyword = bare(words.get(2), "attribute type")?;
    let atype = XmlAttributeType::from_keyword(keyword)
        .with_context(|| format!("unknown attribute type {keyword}"))?;
    let mut rest = words[3..].iter();
    let (def, value) = match rest.next() {
        Some(XmlTraceWord::Quoted { text }) => (XmlAttributeDefault::XmlAttributeNone, Some(text.clone())),
        Some(XmlTraceWord::Bare { text }) => {
            let def = XmlAttributeDefault::from_keyword(text)
                .with_context(|| format!("unknown attribute default {text}"))?;
            let value = match def {
                XmlAttributeDefault::XmlAttributeFixed | XmlAttributeDefault::XmlAttributeNone => {
                    Some(quoted(rest.next(), "default value")?)
                }
                _ => None,
            };
            (def, value)
        }
        _ => bail!("expected attribute default"),
    };
    let external = match rest.next() {
        None => false,
        Some(XmlTraceWord::Bare { text: "external" }) => true,
        Some(_) => bail!("unexpected word after attribute default"),
    };
    doctype.add_attribute_decl(elem, name, atype, def, value.as_deref(), external);
    Ok(())
}

/// Parse the text of a trace.
pub fn parse_trace(text: &str) -> anyhow::Result<XmlTrace> {
    let mut trace = XmlTrace::default();
    let mut known = XmlKnownDefaultAttributes::new();
    let mut pending: Option<(XmlToken, XmlDoctype)> = None;
    let mut entity = None;

    for (lineno, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let words = split_words(line).with_context(|| format!("line {}", lineno + 1))?;
        let Some(XmlTraceWord::Bare { text: keyword }) = words.first() else {
            bail!("line {}: expected a keyword", lineno + 1);
        };
        let args = &words[1..];

        if *keyword == "attlist" {
            let Some((_, doctype)) = pending.as_mut() else {
                bail!("line {}: attlist outside of a doctype", lineno + 1);
            };
            parse_attlist(doctype, args).with_context(|| format!("line {}", lineno + 1))?;
            continue;
        }
        if let Some((mut token, doctype)) = pending.take() {
            token.doctype = Some(Rc::new(doctype));
            trace.tokens.push(token);
        }

        let line_no = lineno as u32;
        let start = (line.len() - line.trim_start().len()) as u32;
        let range = XmlRange::new(
            XmlPoint::new(line_no, start),
            XmlPoint::new(line_no, line.trim_end().len() as u32),
        );
        let res: anyhow::Result<()> = (|| {
            let typ = match *keyword {
                "%option" | "%fragment" => {
                    let name = if *keyword == "%fragment" {
                        "fragment"
                    } else {
                        bare(args.first(), "option name")?
                    };
                    let option = checker_option_from_name(name)
                        .with_context(|| format!("unknown option {name}"))?;
                    trace.config.options |= option as i32;
                    return Ok(());
                }
                "%nsdecl" => {
                    let prefix = bare(args.first(), "prefix")?;
                    let uri = bare(args.get(1), "namespace name")?;
                    let prefix = (prefix != "-").then_some(prefix);
                    trace
                        .config
                        .nsdeclarations
                        .push((prefix.map(|prefix| prefix.to_owned()), uri.to_owned()));
                    return Ok(());
                }
                "%known" => {
                    let elem = bare(args.first(), "element name")?;
                    let name = bare(args.get(1), "attribute name")?;
                    let value = quoted(args.get(2), "value")?;
                    let fixed = matches!(args.get(3), Some(XmlTraceWord::Bare { text: "fixed" }));
                    known.add(elem, name, &value, fixed);
                    return Ok(());
                }
                "%expect" => {
                    let what = bare(args.first(), "expectation")?;
                    trace.expect = Some(if what == "ok" {
                        XmlTraceExpectation::Ok
                    } else {
                        XmlTraceExpectation::Error(
                            XmlCheckErrors::from_name(what)
                                .with_context(|| format!("unknown error {what}"))?,
                        )
                    });
                    return Ok(());
                }
                "entity" => {
                    let id = bare(args.first(), "entity id")?;
                    entity = match id {
                        "-" => None,
                        id => Some(XmlEntityId(id.parse().context("invalid entity id")?)),
                    };
                    return Ok(());
                }
                "xmldecl" => XmlTokenType::XmlTokenXMLDecl,
                "doctype" => XmlTokenType::XmlTokenDoctype,
                "pi" => XmlTokenType::XmlTokenPI,
                "comment" => XmlTokenType::XmlTokenComment,
                "cdata" => XmlTokenType::XmlTokenCDATA,
                "text" => XmlTokenType::XmlTokenText,
                "stag" => XmlTokenType::XmlTokenSTag,
                "etag" => XmlTokenType::XmlTokenETag,
                "empty" => XmlTokenType::XmlTokenEmptyElemTag,
                "finished" => XmlTokenType::XmlTokenFinished,
                other => bail!("unknown keyword {other}"),
            };

            let (name, args) = match typ {
                XmlTokenType::XmlTokenXMLDecl => ("xml", args),
                XmlTokenType::XmlTokenDoctype
                | XmlTokenType::XmlTokenPI
                | XmlTokenType::XmlTokenSTag
                | XmlTokenType::XmlTokenETag
                | XmlTokenType::XmlTokenEmptyElemTag => (bare(args.first(), "name")?, &args[1..]),
                _ => ("", args),
            };
            let mut token = XmlToken::new(typ, name)
                .with_range(range)
                .with_entity(entity);
            match typ {
                XmlTokenType::XmlTokenText
                | XmlTokenType::XmlTokenCDATA
                | XmlTokenType::XmlTokenComment => {
                    let mut literal = XmlLiteral::default();
                    for word in args {
                        literal.push_part(&quoted(Some(word), "character data")?);
                    }
                    token.literal = literal;
                }
                XmlTokenType::XmlTokenDoctype => {
                    let system_id = args.first().map(|word| quoted(Some(word), "system id")).transpose()?;
                    let doctype = XmlDoctype::new(Some(name)).with_external_id(None, system_id.as_deref());
                    pending = Some((token, doctype));
                    return Ok(());
                }
                XmlTokenType::XmlTokenFinished | XmlTokenType::XmlTokenETag if !args.is_empty() => {
                    bail!("unexpected arguments");
                }
                _ => push_attributes(&mut token, args, line_no)?,
            }
            trace.tokens.push(token);
            Ok(())
        })();
        res.with_context(|| format!("line {}", lineno + 1))?;
    }
    if let Some((mut token, doctype)) = pending.take() {
        token.doctype = Some(Rc::new(doctype));
        trace.tokens.push(token);
    }
    if !known.is_empty() {
        trace.config.known_defaults = Some(Rc::new(known));
    }
    Ok(trace)
}

impl XmlTrace {
    /// Feed the tokens of the trace to a checker, stopping at the first error.
    pub fn replay(&self) -> Result<XmlTraceRun, XmlCheckError> {
        let mut checker =
            XmlCheckingTokenHandler::with_config(XmlTokenCollector::default(), &self.config)?;
        let mut result = Ok(());
        for token in &self.tokens {
            let mut token = token.clone();
            if let Err(err) = checker.handle_token(&mut token) {
                result = Err(err);
                break;
            }
        }
        #[cfg(feature = "diagnostics")]
        let warnings = checker
            .take_warnings()
            .iter()
            .map(|warning| warning.to_string())
            .collect();
        #[cfg(not(feature = "diagnostics"))]
        let warnings = vec![];
        Ok(XmlTraceRun {
            forwarded: checker.into_handler().tokens,
            result,
            warnings,
        })
    }

    /// Check if `run` is what the trace expects. A trace without expectation
    /// expects success.
    pub fn is_expected(&self, run: &XmlTraceRun) -> bool {
        match self.expect.unwrap_or(XmlTraceExpectation::Ok) {
            XmlTraceExpectation::Ok => run.result.is_ok(),
            XmlTraceExpectation::Error(code) => run.error_code() == Some(code),
        }
    }
}

fn describe_name(out: &mut String, qname: &str, resolution: &XmlNameResolution) {
    out.push_str(qname);
    if let XmlNameResolution::Namespace(uri) = resolution {
        write!(out, "{{{uri}}}").ok();
    }
}

/// Format a token in trace syntax, with namespace URIs in braces after
/// resolved names and markers for defaulted and ID attributes.
pub fn describe_token(token: &XmlToken) -> String {
    let mut out = String::new();
    out.push_str(match token.typ {
        XmlTokenType::XmlTokenXMLDecl => "xmldecl",
        XmlTokenType::XmlTokenDoctype => "doctype",
        XmlTokenType::XmlTokenPI => "pi",
        XmlTokenType::XmlTokenComment => "comment",
        XmlTokenType::XmlTokenCDATA => "cdata",
        XmlTokenType::XmlTokenText => "text",
        XmlTokenType::XmlTokenSTag => "stag",
        XmlTokenType::XmlTokenETag => "etag",
        XmlTokenType::XmlTokenEmptyElemTag => "empty",
        XmlTokenType::XmlTokenFinished => "finished",
    });
    if !token.name.qname().is_empty() && token.typ != XmlTokenType::XmlTokenXMLDecl {
        out.push(' ');
        describe_name(&mut out, token.name.qname(), token.name.resolution());
    }
    for attr in &token.attributes {
        out.push(' ');
        describe_name(&mut out, attr.name.qname(), attr.name.resolution());
        out.push_str("=\"");
        escape_into(&mut out, &attr.value);
        out.push('"');
        if !attr.specified {
            out.push_str(" !default");
        }
        if attr.is_id {
            out.push_str(" !id");
        }
    }
    for part in token.literal.parts() {
        out.push_str(" \"");
        escape_into(&mut out, part);
        out.push('"');
    }
    out
}
