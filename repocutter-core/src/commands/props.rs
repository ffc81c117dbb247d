//! Property surgery: propdel, propset, proprename, setlog.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::{Result, SurgeryError};
use crate::properties::{svn_props, Properties};
use crate::range::SubversionRange;

const PROP_OPTS: ReportOptions = ReportOptions {
    passthrough: true,
    pass_empty: true,
    invert: false,
    suppress_dangling: true,
};

/// Remove the named properties from every property block in range.
pub fn propdel<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    names: &[String],
    out: &mut W,
) -> Result<()> {
    let hooks = Hooks {
        props: Some(Box::new(move |_meta, props: &mut Properties| {
            for name in names {
                props.delete(name);
            }
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &PROP_OPTS, out)
}

/// Assign `name=value` pairs in every property block in range.
pub fn propset<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    assignments: &[String],
    out: &mut W,
) -> Result<()> {
    let pairs: Vec<(&str, &str)> = assignments
        .iter()
        .map(|a| {
            a.split_once('=')
                .ok_or_else(|| SurgeryError::fatal(format!("propset requires name=value, got {:?}", a)))
        })
        .collect::<Result<_>>()?;
    let hooks = Hooks {
        props: Some(Box::new(move |_meta, props: &mut Properties| {
            for (name, value) in &pairs {
                props.set(name, value.as_bytes());
            }
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &PROP_OPTS, out)
}

/// Rename properties (`old->new`), preserving order and deletion markers.
pub fn proprename<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    mappings: &[String],
    out: &mut W,
) -> Result<()> {
    let pairs: Vec<(&str, &str)> = mappings
        .iter()
        .map(|m| {
            m.split_once("->")
                .ok_or_else(|| SurgeryError::fatal(format!("proprename requires old->new, got {:?}", m)))
        })
        .collect::<Result<_>>()?;
    let hooks = Hooks {
        props: Some(Box::new(move |_meta, props: &mut Properties| {
            for (old, new) in &pairs {
                props.rename(old, new);
            }
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &PROP_OPTS, out)
}

/// One entry of a parsed log-entries file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub author: String,
    pub message: Vec<u8>,
}

/// Parse a Subversion-style log listing (the format `repocutter log`
/// emits) into per-revision entries.
pub fn parse_logentries(text: &str) -> Result<HashMap<u64, LogEntry>> {
    let mut entries = HashMap::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.is_empty() || is_delimiter(line) {
            continue;
        }
        let header: Vec<&str> = line.split(" | ").collect();
        if header.len() < 4 || !header[0].starts_with('r') {
            return Err(SurgeryError::fatal(format!(
                "malformed log entry header {:?}",
                line
            )));
        }
        let revision: u64 = header[0][1..]
            .parse()
            .map_err(|_| SurgeryError::fatal(format!("malformed revision in {:?}", line)))?;
        let author = header[1].to_string();
        let count: usize = header[header.len() - 1]
            .split_whitespace()
            .next()
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| {
                SurgeryError::fatal(format!("malformed line count in {:?}", line))
            })?;
        // Blank separator between header and message.
        match lines.next() {
            Some("") => {}
            _ => {
                return Err(SurgeryError::fatal(format!(
                    "log entry for revision {} lacks its blank separator",
                    revision
                )));
            }
        }
        let mut message = Vec::new();
        for i in 0..count {
            let body = lines.next().ok_or_else(|| {
                SurgeryError::fatal(format!("truncated log message for revision {}", revision))
            })?;
            if i > 0 {
                message.push(b'\n');
            }
            message.extend_from_slice(body.as_bytes());
        }
        entries.insert(revision, LogEntry { author, message });
    }
    Ok(entries)
}

fn is_delimiter(line: &str) -> bool {
    line.len() >= 8 && line.bytes().all(|b| b == b'-')
}

/// Replace `svn:log` values from a parsed log-entries file. The author
/// recorded on the input must match the author in the entry.
pub fn setlog<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    entries: &HashMap<u64, LogEntry>,
    out: &mut W,
) -> Result<()> {
    let hooks = Hooks {
        props: Some(Box::new(move |meta: &crate::dumpfile::RecordMeta, props: &mut Properties| {
            if meta.index != 0 {
                return Ok(());
            }
            let Some(entry) = entries.get(&meta.revision) else {
                return Ok(());
            };
            let author = props.get(svn_props::AUTHOR);
            if author != Some(entry.author.as_bytes()) {
                return Err(SurgeryError::fatal(format!(
                    "setlog: author mismatch at revision {}: dump says {:?}, log entry says {:?}",
                    meta.revision,
                    author.map(|a| String::from_utf8_lossy(a).into_owned()),
                    entry.author
                )));
            }
            props.set(svn_props::LOG, entry.message.clone());
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &PROP_OPTS, out)
}
