//! Make a dump stream reproducible for use as test input: drop the UUID,
//! regenerate commit times as a fixed ten-second cadence from the epoch,
//! and rewrite every committer to a fixed literal.

use std::io::{BufRead, Write};

use chrono::DateTime;

use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::{Result, SurgeryError};
use crate::properties::{svn_props, Properties};
use crate::range::SubversionRange;

const CANONICAL_AUTHOR: &str = "fred";

/// The canned timestamp for a revision: epoch + 10*(N-1) seconds, in
/// RFC-3339 form with microseconds.
fn canned_date(revision: u64) -> Result<String> {
    let seconds = 10 * (revision as i64 - 1);
    let date = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| SurgeryError::fatal(format!("unrepresentable timestamp for revision {}", revision)))?;
    Ok(date.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
}

pub fn testify<R: BufRead, W: Write>(source: &mut DumpfileSource<R>, out: &mut W) -> Result<()> {
    let hooks = Hooks {
        preamble: Some(Box::new(|preamble: &mut crate::record::Preamble| {
            preamble.strip_uuid();
            Ok(())
        })),
        props: Some(Box::new(|meta: &crate::dumpfile::RecordMeta, props: &mut Properties| {
            if meta.index != 0 {
                return Ok(());
            }
            if props.get(svn_props::DATE).is_some() {
                props.set(svn_props::DATE, canned_date(meta.revision)?);
            }
            if props.get(svn_props::AUTHOR).is_some() {
                props.set(svn_props::AUTHOR, CANONICAL_AUTHOR);
            }
            Ok(())
        })),
        ..Default::default()
    };
    source.report(
        &SubversionRange::all(),
        hooks,
        &ReportOptions {
            passthrough: true,
            pass_empty: true,
            invert: false,
            suppress_dangling: true,
        },
        out,
    )
}
