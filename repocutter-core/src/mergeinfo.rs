//! Walkers over `svn:mergeinfo` property values.
//!
//! A mergeinfo value is a newline-separated list of `path:rangelist`
//! entries, where the range list is comma-separated revisions and
//! hyphenated intervals (`/trunk:1-3,5`, optionally with the
//! non-inheritable `*` marker). Several commands rewrite the paths; only
//! renumber rewrites the revisions.

use crate::error::{Result, SurgeryError};

/// A revision range list from one mergeinfo entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeinfoRange {
    spans: Vec<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    lo: u64,
    hi: u64,
    /// False when the span carries the non-inheritable `*` marker.
    inheritable: bool,
}

impl MergeinfoRange {
    /// Parse a range list such as `1-3,5,9-12*`.
    pub fn parse(text: &str) -> Result<Self> {
        let bad = |item: &str| {
            SurgeryError::fatal(format!("malformed mergeinfo range item {:?}", item))
        };
        let mut spans = Vec::new();
        for item in text.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (body, inheritable) = match item.strip_suffix('*') {
                Some(body) => (body, false),
                None => (item, true),
            };
            let (lo, hi) = match body.split_once('-') {
                Some((lo, hi)) => (
                    lo.parse().map_err(|_| bad(item))?,
                    hi.parse().map_err(|_| bad(item))?,
                ),
                None => {
                    let at = body.parse().map_err(|_| bad(item))?;
                    (at, at)
                }
            };
            if lo > hi {
                return Err(bad(item));
            }
            spans.push(Span { lo, hi, inheritable });
        }
        Ok(Self { spans })
    }

    /// Map every revision endpoint through `f`.
    pub fn map_revisions(&mut self, f: &mut dyn FnMut(u64) -> Result<u64>) -> Result<()> {
        for span in &mut self.spans {
            span.lo = f(span.lo)?;
            span.hi = f(span.hi)?;
            if span.lo > span.hi {
                std::mem::swap(&mut span.lo, &mut span.hi);
            }
        }
        Ok(())
    }

    /// Merge adjacent and overlapping spans with matching markers.
    pub fn optimize(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        self.spans.sort_by_key(|s| (s.lo, s.hi));
        let mut merged: Vec<Span> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            match merged.last_mut() {
                Some(last)
                    if last.inheritable == span.inheritable
                        && span.lo <= last.hi.saturating_add(1) =>
                {
                    last.hi = last.hi.max(span.hi);
                }
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Renders back to the dump form; single-revision spans print as `N`.
impl std::fmt::Display for MergeinfoRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if span.lo == span.hi {
                write!(f, "{}", span.lo)?;
            } else {
                write!(f, "{}-{}", span.lo, span.hi)?;
            }
            if !span.inheritable {
                write!(f, "*")?;
            }
        }
        Ok(())
    }
}

/// Rewrite the path of every mergeinfo entry through `f`. Returning `None`
/// drops the entry. Entries that cannot be split are passed through.
pub fn rewrite_paths(value: &[u8], f: &mut dyn FnMut(&str) -> Option<String>) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for line in value.split_inclusive(|&b| b == b'\n') {
        let (body, terminator) = split_terminator(line);
        let Some((path, ranges)) = split_entry(body) else {
            out.extend_from_slice(line);
            continue;
        };
        match f(path) {
            Some(new_path) => {
                out.extend_from_slice(new_path.as_bytes());
                out.push(b':');
                out.extend_from_slice(ranges.as_bytes());
                out.extend_from_slice(terminator);
            }
            None => {}
        }
    }
    out
}

/// Rewrite every revision number of every mergeinfo entry through `f`,
/// re-optimizing each range list afterwards.
pub fn rewrite_revisions(value: &[u8], f: &mut dyn FnMut(u64) -> Result<u64>) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(value.len());
    for line in value.split_inclusive(|&b| b == b'\n') {
        let (body, terminator) = split_terminator(line);
        let Some((path, ranges)) = split_entry(body) else {
            out.extend_from_slice(line);
            continue;
        };
        let mut range = MergeinfoRange::parse(ranges)?;
        range.map_revisions(f)?;
        range.optimize();
        out.extend_from_slice(path.as_bytes());
        out.push(b':');
        out.extend_from_slice(range.to_string().as_bytes());
        out.extend_from_slice(terminator);
    }
    Ok(out)
}

fn split_terminator(line: &[u8]) -> (&[u8], &[u8]) {
    match line.split_last() {
        Some((&b'\n', _)) => line.split_at(line.len() - 1),
        _ => (line, &[][..]),
    }
}

/// Split `path:rangelist` at the last colon; mergeinfo paths may themselves
/// contain colons.
fn split_entry(body: &[u8]) -> Option<(&str, &str)> {
    let text = std::str::from_utf8(body).ok()?;
    let (path, ranges) = text.rsplit_once(':')?;
    if ranges.is_empty() {
        return None;
    }
    Some((path, ranges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimized(spec: &str) -> String {
        let mut range = MergeinfoRange::parse(spec).unwrap();
        range.optimize();
        range.to_string()
    }

    #[test]
    fn test_optimize_merges_adjacent_spans() {
        assert_eq!(optimized("1-1,2-2,3-3,5-5"), "1-3,5");
        assert_eq!(optimized("1-2,3-4"), "1-4");
        assert_eq!(optimized("1-1"), "1");
    }

    #[test]
    fn test_optimize_keeps_marker_boundaries() {
        assert_eq!(optimized("1-2,3-4*"), "1-2,3-4*");
        assert_eq!(optimized("1-2*,3-4*"), "1-4*");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(MergeinfoRange::parse("1-x").is_err());
        assert!(MergeinfoRange::parse("5-2").is_err());
    }

    #[test]
    fn test_rewrite_paths() {
        let value = b"/trunk:1-3\n/branches/stable:4-6";
        let mut hook = |path: &str| Some(path.replace("/trunk", "/mainline"));
        let out = rewrite_paths(value, &mut hook);
        assert_eq!(out, b"/mainline:1-3\n/branches/stable:4-6");
    }

    #[test]
    fn test_rewrite_paths_can_drop_entries() {
        let value = b"/trunk:1-3\n/gone:4-6\n";
        let mut hook = |path: &str| {
            if path == "/gone" {
                None
            } else {
                Some(path.to_string())
            }
        };
        let out = rewrite_paths(value, &mut hook);
        assert_eq!(out, b"/trunk:1-3\n");
    }

    #[test]
    fn test_rewrite_revisions_renumbers_and_optimizes() {
        let value = b"/trunk:2,4";
        // Collapse the gap: 2 -> 1, 4 -> 2.
        let mut map = |rev: u64| Ok(rev / 2);
        let out = rewrite_revisions(value, &mut map).unwrap();
        assert_eq!(out, b"/trunk:1-2");
    }
}
