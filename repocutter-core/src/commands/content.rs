//! Content surgery: strip, replace, obscure.

use std::cell::RefCell;
use std::io::{BufRead, Write};

use regex::bytes::Regex;

use crate::commands::filter::compile;
use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::{Result, SurgeryError};
use crate::headers;
use crate::mergeinfo;
use crate::names::NameSequence;
use crate::properties::{svn_props, Properties};
use crate::range::SubversionRange;
use crate::record::Node;

const CONTENT_OPTS: ReportOptions = ReportOptions {
    passthrough: true,
    pass_empty: true,
    invert: false,
    suppress_dangling: true,
};

/// Contents with this prefix are symbolic links and keep their target.
const LINK_PREFIX: &[u8] = b"link ";

/// Replace file contents with a diagnostic string naming the revision and
/// path. Symbolic-link contents are preserved. With patterns, only paths
/// matching one of them are stripped.
pub fn strip<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    patterns: &[String],
    out: &mut W,
) -> Result<()> {
    let regexps = compile(patterns)?;
    let hooks = Hooks {
        node: Some(Box::new(move |meta: &crate::dumpfile::RecordMeta, node: &mut Node| {
            if !node.has_text() || node.content.starts_with(LINK_PREFIX) {
                return Ok(node.to_bytes());
            }
            let path = node.path().map(|p| p.to_vec()).unwrap_or_default();
            if !regexps.is_empty() && !regexps.iter().any(|re| re.is_match(&path)) {
                return Ok(node.to_bytes());
            }
            let body = format!(
                "Revision is {}, file path is {}.\n",
                meta.revision,
                String::from_utf8_lossy(&path)
            );
            node.set_content(body.into_bytes());
            Ok(node.to_bytes())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &CONTENT_OPTS, out)
}

/// Parse a `/regex/replacement/` argument. The delimiter is the first
/// character and must also terminate the argument.
pub fn parse_substitution(arg: &str) -> Result<(Regex, Vec<u8>)> {
    let mut chars = arg.chars();
    let delimiter = chars
        .next()
        .ok_or_else(|| SurgeryError::fatal("empty replace specification"))?;
    let body = chars.as_str();
    let Some(body) = body.strip_suffix(delimiter) else {
        return Err(SurgeryError::fatal(format!(
            "replace specification must end with its delimiter {:?}",
            delimiter
        )));
    };
    let Some((pattern, replacement)) = body.split_once(delimiter) else {
        return Err(SurgeryError::fatal(
            "replace specification needs pattern and replacement",
        ));
    };
    Ok((Regex::new(pattern)?, replacement.as_bytes().to_vec()))
}

/// Regular-expression substitution over every content body in range.
pub fn replace<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    substitution: &str,
    out: &mut W,
) -> Result<()> {
    let (pattern, replacement) = parse_substitution(substitution)?;
    let hooks = Hooks {
        node: Some(Box::new(move |_meta, node: &mut Node| {
            if node.content.is_empty() {
                return Ok(node.to_bytes());
            }
            let rewritten = match pattern.replace_all(&node.content, replacement.as_slice()) {
                std::borrow::Cow::Owned(rewritten) => Some(rewritten),
                std::borrow::Cow::Borrowed(_) => None,
            };
            if let Some(rewritten) = rewritten {
                node.set_content(rewritten);
            }
            Ok(node.to_bytes())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &CONTENT_OPTS, out)
}

/// Path segments the obscure command never rewrites.
const LAYOUT_LITERALS: [&str; 3] = ["trunk", "tags", "branches"];

fn obscure_path(seq: &mut NameSequence, path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.is_empty() || LAYOUT_LITERALS.contains(&segment) {
                segment.to_string()
            } else {
                seq.obscure(segment)
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace path segments and committer IDs with generated fancy names,
/// consistently across the run. Symbolic-link targets are overwritten in
/// place without changing the content length.
pub fn obscure<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    let seq = RefCell::new(NameSequence::new());
    let hooks = Hooks {
        node: Some(Box::new(|_meta, node: &mut Node| {
            let mut seq = seq.borrow_mut();
            for name in ["Node-path", "Node-copyfrom-path"] {
                if let Some(value) = headers::get_header(&node.header, name) {
                    if let Ok(path) = std::str::from_utf8(value) {
                        let new = obscure_path(&mut seq, path);
                        node.header = headers::set_header(&node.header, name, new.as_bytes());
                    }
                }
            }
            if node.content.starts_with(LINK_PREFIX) {
                // Disguise the target but keep the body length.
                if let Ok(target) = std::str::from_utf8(&node.content[LINK_PREFIX.len()..]) {
                    let target = target.to_string();
                    let obscured = obscure_path(&mut seq, target.trim_end());
                    let tail = &mut node.content[LINK_PREFIX.len()..];
                    let n = tail.len().min(obscured.len());
                    tail[..n].copy_from_slice(&obscured.as_bytes()[..n]);
                }
            }
            Ok(node.to_bytes())
        })),
        props: Some(Box::new(|_meta, props: &mut Properties| {
            let mut seq = seq.borrow_mut();
            if let Some(author) = props.get_str(svn_props::AUTHOR).map(|a| a.to_string()) {
                props.set(svn_props::AUTHOR, seq.obscure(&author).to_lowercase());
            }
            if let Some(value) = props.get(svn_props::MERGE_INFO).map(|v| v.to_vec()) {
                let rewritten =
                    mergeinfo::rewrite_paths(&value, &mut |p| Some(obscure_path(&mut seq, p)));
                props.set(svn_props::MERGE_INFO, rewritten);
            }
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &CONTENT_OPTS, out)
}
