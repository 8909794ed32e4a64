//! Replay token traces through the well-formedness checker.
//!
//! Each trace is checked independently. Forwarded tokens are printed with
//! their resolved namespaces, followed by tainted namespace warnings and
//! the error, if any. The exit status is non-zero if a trace did not end as
//! its `%expect` directive says (success when it has none).

use std::{fs, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use encoding_rs::Encoding;
use exml_check::{
    XmlCheckError,
    generic_error,
    globals::parser_version,
    parser::{
        XmlCheckerOption,
        trace::{XmlTrace, describe_token, parse_trace},
    },
};

#[derive(Debug, Parser)]
#[command(version, name = "xmlchecklint", arg_required_else_help = true)]
struct CmdArgs {
    #[clap(required_unless_present = "checker_version")]
    trace_files: Vec<String>,
    /// encoding of the trace files
    #[arg(long, value_name = "label", default_value = "UTF-8")]
    encoding: String,
    /// check the traces as document fragments
    #[arg(long)]
    fragment: bool,
    /// namespace binding around the traces, `prefix=uri` or `=uri` for the default namespace
    #[arg(long, value_name = "prefix=uri")]
    nsdecl: Vec<String>,
    /// do not inject defaulted attributes
    #[arg(long)]
    nodefaults: bool,
    /// do not mark ID attributes
    #[arg(long)]
    noids: bool,
    /// don't print forwarded tokens
    #[arg(long)]
    quiet: bool,
    /// print the checker version
    #[arg(long)]
    checker_version: bool,
}

fn load_trace(path: &str, encoding: &'static Encoding) -> anyhow::Result<(String, XmlTrace)> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        generic_error!("{path}: malformed {} sequences replaced\n", encoding.name());
    }
    let trace = parse_trace(&text).with_context(|| format!("failed to parse {path}"))?;
    Ok((text.into_owned(), trace))
}

fn apply_args(trace: &mut XmlTrace, args: &CmdArgs) -> anyhow::Result<()> {
    if args.fragment {
        trace.config.options |= XmlCheckerOption::XmlCheckFragment as i32;
    }
    if args.nodefaults {
        trace.config.options |= XmlCheckerOption::XmlCheckNoDefaults as i32;
    }
    if args.noids {
        trace.config.options |= XmlCheckerOption::XmlCheckNoIds as i32;
    }
    for decl in &args.nsdecl {
        let (prefix, uri) = decl
            .split_once('=')
            .with_context(|| format!("invalid --nsdecl {decl}, expected prefix=uri"))?;
        let prefix = (!prefix.is_empty()).then(|| prefix.to_owned());
        trace.config.nsdeclarations.push((prefix, uri.to_owned()));
    }
    Ok(())
}

/// Print the source line an error points at.
fn print_context(text: &str, err: &XmlCheckError) {
    let XmlCheckError::WellFormedness(error) = err else {
        return;
    };
    let Some(start) = error.location.and_then(|range| range.start) else {
        return;
    };
    if let Some(line) = text.lines().nth(start.line as usize) {
        eprintln!("{line}");
        eprintln!("{}^", " ".repeat(start.column as usize));
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = CmdArgs::parse();
    if args.checker_version {
        println!("{}", parser_version());
        if args.trace_files.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
    }
    let encoding = Encoding::for_label(args.encoding.as_bytes())
        .with_context(|| format!("unknown encoding {}", args.encoding))?;

    let mut failed = false;
    for path in &args.trace_files {
        let (text, mut trace) = load_trace(path, encoding)?;
        apply_args(&mut trace, &args)?;
        let run = trace
            .replay()
            .with_context(|| format!("failed to set up the checker for {path}"))?;

        if !args.quiet {
            for token in &run.forwarded {
                println!("{}", describe_token(token));
            }
        }
        for warning in &run.warnings {
            eprintln!("{path}: warning: {warning}");
        }
        if let Err(err) = &run.result {
            generic_error!("{path}: {err}\n");
            print_context(&text, err);
        }
        if !trace.is_expected(&run) {
            failed = true;
        }
    }
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
