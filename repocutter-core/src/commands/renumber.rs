//! Revision renumbering.
//!
//! Rewrites every `Revision-number` to a contiguous sequence starting at a
//! configurable base, and maps every `Node-copyfrom-rev` and every numeric
//! revision inside `svn:mergeinfo` values through the same mapping. Because
//! mergeinfo rewriting changes property payload lengths, this command walks
//! the stream with its own header/props/text state machine rather than the
//! generic record reader.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use crate::error::{Result, SurgeryError};
use crate::headers;
use crate::mergeinfo;
use crate::properties::{svn_props, Properties};
use crate::source::LineSource;

/// Map an old revision through the renumbering. A revision with no exact
/// entry (dropped by an earlier selection pass) maps to the nearest
/// renumbered revision below it.
fn lookup(map: &BTreeMap<u64, u64>, old: u64, lineno: u64) -> Result<u64> {
    if let Some(&new) = map.get(&old) {
        return Ok(new);
    }
    map.range(..old)
        .next_back()
        .map(|(_, &new)| new)
        .ok_or_else(|| {
            SurgeryError::parse(
                lineno,
                format!("revision reference {} precedes any revision header", old),
            )
        })
}

pub fn renumber<R: BufRead, W: Write>(
    source: &mut LineSource<R>,
    base: u64,
    out: &mut W,
) -> Result<()> {
    let mut map: BTreeMap<u64, u64> = BTreeMap::new();
    let mut counter = base;

    loop {
        let line = source.readline()?;
        if line.is_empty() {
            return Ok(());
        }
        let is_revision = line.starts_with(b"Revision-number:");
        if !is_revision && !line.starts_with(b"Node-") {
            // Preamble lines and inter-record whitespace pass verbatim.
            out.write_all(&line)?;
            continue;
        }

        // Header state: collect the record's header chunk.
        let mut header = Vec::new();
        if is_revision {
            let old = parse_number(&line, source.line_number())?;
            let new = counter;
            counter += 1;
            map.insert(old, new);
            header.extend_from_slice(format!("Revision-number: {}\n", new).as_bytes());
        } else {
            header.extend_from_slice(&line);
        }
        loop {
            let line = source.readline()?;
            if line.is_empty() {
                return Err(SurgeryError::parse(
                    source.line_number(),
                    "unexpected end of stream in record header",
                ));
            }
            if line.as_slice() == b"\n" {
                break;
            }
            if line.starts_with(b"Node-copyfrom-rev:") {
                let old = parse_number(&line, source.line_number())?;
                if map.is_empty() {
                    return Err(SurgeryError::parse(
                        source.line_number(),
                        "copyfrom reference before any revision header",
                    ));
                }
                let new = lookup(&map, old, source.line_number())?;
                header.extend_from_slice(format!("Node-copyfrom-rev: {}\n", new).as_bytes());
            } else {
                header.extend_from_slice(&line);
            }
        }

        // Props state: parse, renumber mergeinfo, fix the length headers.
        let prop_len = headers::get_count(&header, "Prop-content-length");
        let text_len = headers::get_count(&header, "Text-content-length");
        let props_bytes = if prop_len > 0 {
            let mut props = Properties::parse(source)?;
            if let Some(value) = props.get(svn_props::MERGE_INFO).map(|v| v.to_vec()) {
                let lineno = source.line_number();
                let rewritten = mergeinfo::rewrite_revisions(&value, &mut |old| {
                    lookup(&map, old, lineno)
                })?;
                props.set(svn_props::MERGE_INFO, rewritten);
            }
            let bytes = props.to_bytes();
            header = headers::set_length(&header, "Prop-content-length", bytes.len());
            header = headers::set_length(&header, "Content-length", bytes.len() + text_len);
            bytes
        } else {
            Vec::new()
        };

        out.write_all(&header)?;
        out.write_all(b"\n")?;
        out.write_all(&props_bytes)?;

        // Text state: the body passes through untouched.
        if text_len > 0 {
            let content = source.read(text_len)?;
            out.write_all(&content)?;
        }
    }
}

fn parse_number(line: &[u8], lineno: u64) -> Result<u64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|text| text.split_once(": "))
        .and_then(|(_, v)| v.trim().parse().ok())
        .ok_or_else(|| {
            SurgeryError::parse(
                lineno,
                format!("malformed numeric header {:?}", String::from_utf8_lossy(line)),
            )
        })
}
