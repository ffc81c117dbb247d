//! Structural path surgery: pop, swap, and pathrename.
//!
//! All three rewrite the same three places: `Node-path`,
//! `Node-copyfrom-path`, and the paths inside `svn:mergeinfo` values.

use std::io::{BufRead, Write};

use regex::bytes::Regex;
use tracing::warn;

use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::{Result, SurgeryError};
use crate::headers;
use crate::mergeinfo;
use crate::properties::{svn_props, Properties};
use crate::range::SubversionRange;
use crate::record::{Node, NodeAction};

/// Remove the first segment of a path. `None` when nothing remains.
fn pop_path(path: &[u8]) -> Option<Vec<u8>> {
    let cut = path.iter().position(|&b| b == b'/')?;
    let rest = &path[cut + 1..];
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_vec())
    }
}

/// Exchange the first two segments of a path. `None` when the path has
/// fewer than two.
fn swap_path(path: &[u8]) -> Option<Vec<u8>> {
    let cut = path.iter().position(|&b| b == b'/')?;
    let (first, rest) = (&path[..cut], &path[cut + 1..]);
    if rest.is_empty() {
        return None;
    }
    let cut2 = rest.iter().position(|&b| b == b'/').unwrap_or(rest.len());
    let (second, tail) = (&rest[..cut2], &rest[cut2..]);
    let mut out = second.to_vec();
    out.push(b'/');
    out.extend_from_slice(first);
    out.extend_from_slice(tail);
    Some(out)
}

/// Apply a path transform to a mergeinfo path, which carries a leading
/// slash. `on_empty_drop` selects whether an untransformable path drops
/// the entry or keeps it unchanged.
fn mergeinfo_path(
    path: &str,
    f: impl Fn(&[u8]) -> Option<Vec<u8>>,
    on_empty_drop: bool,
) -> Option<String> {
    let bare = path.strip_prefix('/').unwrap_or(path);
    match f(bare.as_bytes()) {
        Some(new) => Some(format!("/{}", String::from_utf8_lossy(&new))),
        None if on_empty_drop => None,
        None => Some(path.to_string()),
    }
}

fn rewrite_mergeinfo(props: &mut Properties, f: &mut dyn FnMut(&str) -> Option<String>) {
    if let Some(value) = props.get(svn_props::MERGE_INFO).map(|v| v.to_vec()) {
        props.set(svn_props::MERGE_INFO, mergeinfo::rewrite_paths(&value, f));
    }
}

/// Remove the first segment from every path in the stream. Nodes whose
/// path vanishes entirely are dropped.
pub fn pop<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    let hooks = Hooks {
        node: Some(Box::new(|_meta, node: &mut Node| {
            let Some(path) = node.path().map(|p| p.to_vec()) else {
                return Ok(node.to_bytes());
            };
            match pop_path(&path) {
                Some(new) => node.header = headers::set_header(&node.header, "Node-path", &new),
                None => return Ok(Vec::new()),
            }
            if let Some(from) = headers::get_header(&node.header, "Node-copyfrom-path") {
                let new = pop_path(from).unwrap_or_default();
                node.header = headers::set_header(&node.header, "Node-copyfrom-path", &new);
            }
            Ok(node.to_bytes())
        })),
        props: Some(Box::new(|_meta, props: &mut Properties| {
            rewrite_mergeinfo(props, &mut |p| mergeinfo_path(p, pop_path, true));
            Ok(())
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

const STANDARD_LAYOUT: [&str; 3] = ["branches", "tags", "trunk"];

fn layout_node(dir: &str) -> String {
    format!(
        "Node-path: {}\nNode-kind: dir\nNode-action: add\nProp-content-length: 10\nContent-length: 10\n\nPROPS-END\n\n\n",
        dir
    )
}

/// Exchange the first two segments of every path, turning
/// `project/trunk/...` into `trunk/project/...`. The standard layout
/// directories are created at the first node of revision 1; paths that
/// collapse to a single segment are dropped.
pub fn swap<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    let mut injected = false;
    let hooks = Hooks {
        node: Some(Box::new(move |meta: &crate::dumpfile::RecordMeta, node: &mut Node| {
            let mut emitted = Vec::new();
            if meta.revision == 1 && !injected {
                injected = true;
                for dir in STANDARD_LAYOUT {
                    emitted.extend_from_slice(layout_node(dir).as_bytes());
                }
            }
            let Some(path) = node.path().map(|p| p.to_vec()) else {
                emitted.extend_from_slice(&node.to_bytes());
                return Ok(emitted);
            };
            match swap_path(&path) {
                Some(new) => {
                    if STANDARD_LAYOUT.iter().any(|d| new == d.as_bytes())
                        && node.action() == Some(NodeAction::Add)
                    {
                        warn!(
                            path = %String::from_utf8_lossy(&new),
                            "stream already creates a standard layout directory"
                        );
                    }
                    node.header = headers::set_header(&node.header, "Node-path", &new);
                }
                None => return Ok(emitted),
            }
            if let Some(from) = headers::get_header(&node.header, "Node-copyfrom-path") {
                if let Some(new) = swap_path(from) {
                    node.header = headers::set_header(&node.header, "Node-copyfrom-path", &new);
                }
            }
            emitted.extend_from_slice(&node.to_bytes());
            Ok(emitted)
        })),
        props: Some(Box::new(|_meta, props: &mut Properties| {
            rewrite_mergeinfo(props, &mut |p| mergeinfo_path(p, swap_path, false));
            Ok(())
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

/// Regular-expression replacement over every path. Replacements may use
/// numbered back-references (`${1}`).
pub fn pathrename<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    pairs: &[(String, String)],
    out: &mut W,
) -> Result<()> {
    let compiled: Vec<(Regex, Vec<u8>)> = pairs
        .iter()
        .map(|(from, to)| Ok((Regex::new(from)?, to.as_bytes().to_vec())))
        .collect::<Result<_>>()?;
    if compiled.is_empty() {
        return Err(SurgeryError::fatal("pathrename requires FROM TO pattern pairs"));
    }
    let rename = move |path: &[u8]| -> Vec<u8> {
        let mut path = path.to_vec();
        for (re, to) in &compiled {
            path = re.replace_all(&path, to.as_slice()).into_owned();
        }
        path
    };
    let rename2 = rename.clone();
    let hooks = Hooks {
        node: Some(Box::new(move |_meta, node: &mut Node| {
            for name in ["Node-path", "Node-copyfrom-path"] {
                if let Some(value) = headers::get_header(&node.header, name) {
                    let new = rename(value);
                    if new.is_empty() {
                        warn!(
                            header = name,
                            "path rename produced an empty path, keeping the original"
                        );
                        continue;
                    }
                    node.header = headers::set_header(&node.header, name, &new);
                }
            }
            Ok(node.to_bytes())
        })),
        props: Some(Box::new(move |_meta, props: &mut Properties| {
            rewrite_mergeinfo(props, &mut |p: &str| {
                let bare = p.strip_prefix('/').unwrap_or(p);
                let new = rename2(bare.as_bytes());
                Some(format!("/{}", String::from_utf8_lossy(&new)))
            });
            Ok(())
        })),
        ..Default::default()
    };
    source.report(
        selection,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::branchy_dump;
    use std::io::Cursor;

    fn run(
        dump: &str,
        f: impl FnOnce(&mut DumpfileSource<Cursor<Vec<u8>>>, &mut Vec<u8>) -> Result<()>,
    ) -> String {
        let mut source = DumpfileSource::new(Cursor::new(dump.as_bytes().to_vec()));
        let mut out = Vec::new();
        f(&mut source, &mut out).unwrap();
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_pop_strips_leading_segment() {
        let all = SubversionRange::all();
        let out = run(&branchy_dump(), |s, o| pop(s, &all, o));
        assert!(out.contains("Node-path: trunk\n"));
        assert!(out.contains("Node-path: trunk/main.c\n"));
        assert!(out.contains("Node-path: branches/dev\n"));
        assert!(out.contains("Node-copyfrom-path: trunk\n"));
        assert!(out.contains("/branches/dev:2"));
        assert!(!out.contains("project"));
    }

    #[test]
    fn test_pop_swap_roundtrip_on_deep_paths() {
        assert_eq!(pop_path(b"a/b/c").unwrap(), b"b/c");
        assert_eq!(pop_path(b"a"), None);
        assert_eq!(swap_path(b"a/b/c").unwrap(), b"b/a/c");
        assert_eq!(swap_path(b"a/b").unwrap(), b"b/a");
        assert_eq!(swap_path(b"a"), None);
        // swap is an involution on paths of depth >= 2
        assert_eq!(swap_path(&swap_path(b"proj/trunk/x.c").unwrap()).unwrap(), b"proj/trunk/x.c");
    }

    #[test]
    fn test_swap_reorders_and_injects_layout() {
        let all = SubversionRange::all();
        let out = run(&branchy_dump(), |s, o| swap(s, &all, o));
        // Injected layout directories appear once, before the first real
        // node of revision 1.
        assert!(out.contains("Node-path: branches\n"));
        assert!(out.contains("Node-path: tags\n"));
        assert!(out.contains("Node-path: trunk\n"));
        assert!(out.contains("Node-path: trunk/project\n"));
        assert!(out.contains("Node-path: trunk/project/main.c\n"));
        assert!(out.contains("Node-path: branches/project/dev\n"));
        assert!(out.contains("Node-copyfrom-path: trunk/project\n"));
        assert!(out.contains("/branches/project/dev:2"));
    }

    #[test]
    fn test_pathrename_with_backreferences() {
        let all = SubversionRange::all();
        let pairs = vec![("^project/(.*)".to_string(), "monorepo/${1}".to_string())];
        let out = run(&branchy_dump(), |s, o| pathrename(s, &all, &pairs, o));
        assert!(out.contains("Node-path: monorepo/trunk\n"));
        assert!(out.contains("Node-path: monorepo/trunk/main.c\n"));
        assert!(out.contains("Node-copyfrom-path: monorepo/trunk\n"));
        assert!(out.contains("/monorepo/branches/dev:2"));
    }

    #[test]
    fn test_pathrename_requires_pairs() {
        let mut source = DumpfileSource::new(Cursor::new(branchy_dump().into_bytes()));
        let mut out = Vec::new();
        assert!(pathrename(&mut source, &SubversionRange::all(), &[], &mut out).is_err());
    }
}
