//! Revision selection and node filtering by path.

use std::io::{BufRead, Write};

use regex::bytes::Regex;

use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::Result;
use crate::range::SubversionRange;
use crate::record::Node;

/// Emit only the revisions inside the selection. Revision 0 carries the
/// preamble with it.
pub fn select<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    source.report(
        selection,
        Hooks::default(),
        &ReportOptions {
            passthrough: false,
            pass_empty: true,
            invert: false,
            suppress_dangling: true,
        },
        out,
    )
}

/// The complement of select.
pub fn deselect<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    source.report(
        selection,
        Hooks::default(),
        &ReportOptions {
            passthrough: false,
            pass_empty: true,
            invert: true,
            suppress_dangling: true,
        },
        out,
    )
}

/// Keep only nodes whose path matches one of the patterns.
pub fn sift<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    patterns: &[String],
    out: &mut W,
) -> Result<()> {
    filter_nodes(source, selection, patterns, true, out)
}

/// Drop every node whose path matches one of the patterns.
pub fn expunge<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    patterns: &[String],
    out: &mut W,
) -> Result<()> {
    filter_nodes(source, selection, patterns, false, out)
}

fn filter_nodes<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    patterns: &[String],
    keep_matching: bool,
    out: &mut W,
) -> Result<()> {
    let regexps = compile(patterns)?;
    let hooks = Hooks {
        node: Some(Box::new(move |_meta, node: &mut Node| {
            let matched = node
                .path()
                .is_some_and(|path| regexps.iter().any(|re| re.is_match(path)));
            if matched == keep_matching {
                Ok(node.to_bytes())
            } else {
                Ok(Vec::new())
            }
        })),
        ..Default::default()
    };
    source.report(
        selection,
        hooks,
        &ReportOptions {
            passthrough: true,
            pass_empty: false,
            invert: false,
            suppress_dangling: true,
        },
        out,
    )
}

pub(crate) fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| Ok(Regex::new(p)?)).collect()
}
