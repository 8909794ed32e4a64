//! Provide error kinds and error records reported by the checker.
//!
//! Every fallible operation in this crate returns [`XmlCheckError`].
//! Well-formedness and namespace defects carry an [`XmlWellFormednessError`]
//! with the source ranges needed to point at the offending markup, while
//! allocation failures are reported separately as [`XmlCheckError::NoMemory`].

use std::fmt;

use crate::xmlmemory::XmlNoMemory;

macro_rules! impl_xml_check_errors {
    ( $( $variant:ident $( = $default:literal )? => $message:literal ),* $(,)? ) => {
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum XmlCheckErrors {
            $(
                $variant $( = $default )?
            ),*
        }

        impl TryFrom<i32> for XmlCheckErrors {
            type Error = anyhow::Error;
            fn try_from(value: i32) -> Result<Self, Self::Error> {
                $(
                    if value == Self:: $variant as i32 {
                        return Ok(Self:: $variant);
                    }
                )*
                Err(anyhow::anyhow!("Invalid convert from value '{value}' to {}", std::any::type_name::<Self>()))
            }
        }

        impl Default for XmlCheckErrors {
            fn default() -> Self {
                Self::XmlErrOK
            }
        }

        impl XmlCheckErrors {
            /// Fixed English description of the error kind.
            pub fn message(&self) -> &'static str {
                match self {
                    $( Self:: $variant => $message ),*
                }
            }

            /// Look up an error kind by its variant name, e.g. `"XmlErrMismatchedETag"`.
            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name == stringify!($variant) {
                        return Some(Self:: $variant);
                    }
                )*
                None
            }

            /// Variant name of the error kind.
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self:: $variant => stringify!($variant) ),*
                }
            }
        }
    };
}
impl_xml_check_errors!(
    XmlErrOK = 0 => "no error",
    XmlErrOutOfPlaceXMLDecl = 1 => "XML declaration allowed only at the start of the document",
    XmlErrOutOfPlaceDoctype = 2 => "DOCTYPE declaration misplaced or repeated",
    XmlErrUnexpectedCDATA = 3 => "CDATA section outside of the document element",
    XmlErrUnexpectedText = 4 => "character data outside of the document element",
    XmlErrUnexpectedSTag = 5 => "extra content at the end of the document",
    XmlErrUnexpectedETag = 6 => "end tag without matching start tag",
    XmlErrUnexpectedEOF = 7 => "premature end of data, element not closed",
    XmlErrMissingDocumentElement = 8 => "document is empty, root element is missing",
    XmlErrMismatchedETag = 20 => "opening and ending tag mismatch",
    XmlErrGEMatchesContent = 21 => "element started and ended in different entities",
    XmlErrUniqueAttSpec = 30 => "attribute redefined",
    XmlErrUniqueAttSpecXMLStylesheet = 31 => "pseudo-attribute redefined in xml-stylesheet",
    XmlNsErrInvalidNSDeclaration = 200 => "invalid namespace declaration",
    XmlNsErrUndeclaredPrefix = 201 => "namespace prefix is not defined",
    XmlNsErrReservedPrefix = 202 => "reserved prefix xmlns used",
);

impl XmlCheckErrors {
    pub fn is_ok(&self) -> bool {
        *self == Self::XmlErrOK
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Check if this is a namespace constraint violation.
    pub fn is_namespace_error(&self) -> bool {
        matches!(
            self,
            Self::XmlNsErrInvalidNSDeclaration
                | Self::XmlNsErrUndeclaredPrefix
                | Self::XmlNsErrReservedPrefix
        )
    }
}

impl fmt::Display for XmlCheckErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A position in the source text. Both fields are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct XmlPoint {
    pub line: u32,
    pub column: u32,
}

impl XmlPoint {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for XmlPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// A source range. Either end may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct XmlRange {
    pub start: Option<XmlPoint>,
    pub end: Option<XmlPoint>,
}

impl XmlRange {
    pub fn new(start: XmlPoint, end: XmlPoint) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range whose end is not known.
    pub fn starting_at(start: XmlPoint) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.start.is_some()
    }

    /// Fill in an unknown end so that the range covers one column.
    ///
    /// An unknown start is left as is.
    pub fn normalized(&self) -> Self {
        match (self.start, self.end) {
            (Some(start), None) => Self::new(
                start,
                XmlPoint::new(start.line, start.column.saturating_add(1)),
            ),
            _ => *self,
        }
    }
}

impl fmt::Display for XmlRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{start}-{end}"),
            (Some(start), None) => write!(f, "{start}"),
            _ => f.write_str("?"),
        }
    }
}

/// A well-formedness or namespace defect, with the location it was found at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlWellFormednessError {
    pub code: XmlCheckErrors,
    pub location: Option<XmlRange>,
    /// Second location for errors involving two places in the document,
    /// such as the start tag of a mismatched end tag.
    pub related_location: Option<XmlRange>,
    /// Index of the offending attribute of the token, if any.
    pub attribute: Option<usize>,
    /// Index of the attribute the offending one conflicts with.
    pub related_attribute: Option<usize>,
}

impl XmlWellFormednessError {
    pub fn new(code: XmlCheckErrors) -> Self {
        Self {
            code,
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: Option<XmlRange>) -> Self {
        self.location = location.map(|range| range.normalized());
        self
    }

    pub fn with_related_location(mut self, location: Option<XmlRange>) -> Self {
        self.related_location = location.map(|range| range.normalized());
        self
    }

    pub fn with_attributes(mut self, attribute: usize, related: Option<usize>) -> Self {
        self.attribute = Some(attribute);
        self.related_attribute = related;
        self
    }
}

impl fmt::Display for XmlWellFormednessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code.message())?;
        if let Some(location) = self.location {
            write!(f, " at {location}")?;
        }
        if let Some(attribute) = self.attribute {
            write!(f, " (attribute #{attribute})")?;
        }
        if let Some(related) = self.related_location {
            write!(f, ", see {related}")?;
        }
        Ok(())
    }
}

/// Result of every fallible operation of the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlCheckError {
    /// An allocation failed. The document itself may be fine.
    NoMemory,
    /// The document is not well-formed or not namespace-well-formed.
    WellFormedness(XmlWellFormednessError),
    /// The secondary token handler refused a token.
    Aborted,
    /// A token was delivered after the checker reached a terminal state.
    Terminated,
}

impl XmlCheckError {
    pub(crate) fn wf(code: XmlCheckErrors) -> Self {
        Self::WellFormedness(XmlWellFormednessError::new(code))
    }

    /// Error kind of a well-formedness error, `None` for other outcomes.
    pub fn code(&self) -> Option<XmlCheckErrors> {
        match self {
            Self::WellFormedness(error) => Some(error.code),
            _ => None,
        }
    }

    pub fn is_no_memory(&self) -> bool {
        matches!(self, Self::NoMemory)
    }
}

impl From<XmlNoMemory> for XmlCheckError {
    fn from(_: XmlNoMemory) -> Self {
        Self::NoMemory
    }
}

impl From<XmlWellFormednessError> for XmlCheckError {
    fn from(error: XmlWellFormednessError) -> Self {
        Self::WellFormedness(error)
    }
}

impl fmt::Display for XmlCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMemory => f.write_str("out of memory"),
            Self::WellFormedness(error) => write!(f, "{error}"),
            Self::Aborted => f.write_str("token handler aborted"),
            Self::Terminated => f.write_str("checker already terminated"),
        }
    }
}

impl std::error::Error for XmlCheckError {}
