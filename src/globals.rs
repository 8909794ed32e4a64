use std::{cell::RefCell, io::Write};

use const_format::concatcp;

pub type GenericError = for<'a> fn(Option<&mut (dyn Write + 'static)>, &str);

const PARSER_VERSION: &str = concatcp!("exml-check ", env!("CARGO_PKG_VERSION"));

/// Version string of this checker.
#[doc(alias = "xmlParserVersion")]
pub fn parser_version() -> &'static str {
    PARSER_VERSION
}

pub struct XmlGlobalState {
    pub(crate) generic_error: GenericError,
    pub(crate) generic_error_context: Option<Box<dyn Write>>,
}

impl XmlGlobalState {
    fn new() -> Self {
        Self {
            generic_error: generic_error_default,
            generic_error_context: None,
        }
    }
}

thread_local! {
    pub static GLOBAL_STATE: RefCell<XmlGlobalState> = RefCell::new(XmlGlobalState::new());
}

/// Default generic error function.
///
/// Writes to `out` if a context is set, and to the standard error otherwise.
pub fn generic_error_default(out: Option<&mut (dyn Write + 'static)>, msg: &str) {
    if let Some(out) = out {
        write!(out, "{msg}").ok();
    } else {
        eprint!("{msg}");
    }
}

/// Set new generic error function and generic error context.
///
/// If `func` is `None`, set `generic_error_default`.
/// If `context` is `None`, current context is clear and no context is set.
#[doc(alias = "xmlSetGenericErrorFunc")]
pub fn set_generic_error(func: Option<GenericError>, context: Option<impl Write + 'static>) {
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.generic_error = func.unwrap_or(generic_error_default);
        state.generic_error_context = context.map(|context| {
            let boxed: Box<dyn Write + 'static> = Box::new(context);
            boxed
        });
    });
}

#[doc(hidden)]
pub fn __generic_error(msg: &str) {
    GLOBAL_STATE.with_borrow_mut(|state| {
        let func = state.generic_error;
        func(state.generic_error_context.as_deref_mut(), msg);
    });
}

/// Format a message and send it to the generic error function.
#[macro_export]
macro_rules! generic_error {
    ($($arg:tt)*) => {
        $crate::globals::__generic_error(&format!($($arg)*))
    };
}
