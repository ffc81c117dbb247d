//! Analytic commands: log, see, reduce. These report on the stream rather
//! than emitting a dump.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::io::{self, BufRead, Seek, Write};

use tracing::warn;

use crate::commands::filter::select;
use crate::dumpfile::{DumpfileSource, Hooks, ReportOptions};
use crate::error::Result;
use crate::properties::svn_props;
use crate::range::SubversionRange;
use crate::record::{Node, NodeAction, NodeKind};

const LOG_DELIMITER: &str =
    "------------------------------------------------------------------------";

const ANALYTIC_OPTS: ReportOptions = ReportOptions {
    passthrough: false,
    pass_empty: false,
    invert: false,
    suppress_dangling: false,
};

/// Emit a Subversion-style log listing for the selected revisions.
pub fn log<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    let wrote_any = Cell::new(false);
    let out = RefCell::new(out);
    let hooks = Hooks {
        node: Some(Box::new(|_meta, _node: &mut Node| Ok(Vec::new()))),
        props: Some(Box::new(|meta: &crate::dumpfile::RecordMeta, props| {
            if meta.index != 0 {
                return Ok(());
            }
            let Some(message) = props.get(svn_props::LOG).map(|m| m.to_vec()) else {
                return Ok(());
            };
            let author = props.get_str(svn_props::AUTHOR).unwrap_or("").to_string();
            let date = props.get_str(svn_props::DATE).unwrap_or("").to_string();
            let count = message.split(|&b| b == b'\n').filter(|l| !l.is_empty()).count();
            let mut out = out.borrow_mut();
            writeln!(out, "{}", LOG_DELIMITER)?;
            writeln!(
                out,
                "r{} | {} | {} | {} line{}",
                meta.revision,
                author,
                date,
                count,
                if count == 1 { "" } else { "s" }
            )?;
            writeln!(out)?;
            out.write_all(&message)?;
            if !message.ends_with(b"\n") {
                writeln!(out)?;
            }
            wrote_any.set(true);
            Ok(())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &ANALYTIC_OPTS, &mut io::sink())?;
    if wrote_any.get() {
        writeln!(out.borrow_mut(), "{}", LOG_DELIMITER)?;
    }
    Ok(())
}

/// Emit one condensed line per node: `REV-INDEX ACTION PATH`, with copies
/// reported as such and directory paths carrying a trailing slash.
pub fn see<R: BufRead, W: Write>(
    source: &mut DumpfileSource<R>,
    selection: &SubversionRange,
    out: &mut W,
) -> Result<()> {
    let out = RefCell::new(out);
    let hooks = Hooks {
        node: Some(Box::new(|meta: &crate::dumpfile::RecordMeta, node: &mut Node| {
            let slash = if node.kind() == Some(NodeKind::Dir) { "/" } else { "" };
            let path = String::from_utf8_lossy(node.path().unwrap_or_default()).into_owned();
            let copyfrom = node.copyfrom().map(|(rev, p)| (rev, p.to_vec()));
            let action = match (&copyfrom, node.action()) {
                (Some(_), Some(NodeAction::Add)) => "copy".to_string(),
                (_, Some(action)) => action.as_str().to_string(),
                (_, None) => "?".to_string(),
            };
            let mut out = out.borrow_mut();
            write!(
                out,
                "{:<10} {:<7} {}{}",
                format!("{}-{}", meta.revision, meta.index),
                action,
                path,
                slash
            )?;
            if let Some((rev, from)) = copyfrom {
                write!(out, " from {}:{}{}", rev, String::from_utf8_lossy(&from), slash)?;
            }
            writeln!(out)?;
            Ok(Vec::new())
        })),
        ..Default::default()
    };
    source.report(selection, hooks, &ANALYTIC_OPTS, &mut io::sink())
}

/// Two-pass reduction to the interesting revisions: anything that is not a
/// plain file change without properties, any copy source, and the
/// immediate neighbors of each. The input must be seekable.
pub fn reduce<R: BufRead + Seek, W: Write>(
    source: &mut DumpfileSource<R>,
    out: &mut W,
) -> Result<()> {
    let marks = RefCell::new(HashSet::new());
    let hooks = Hooks {
        node: Some(Box::new(|meta: &crate::dumpfile::RecordMeta, node: &mut Node| {
            let mut marks = marks.borrow_mut();
            let action = node.action();
            if action.is_none() {
                warn!(
                    revision = meta.revision,
                    index = meta.index,
                    "skipping a node that could not be classified"
                );
                return Ok(Vec::new());
            }
            let boring = node.kind() == Some(NodeKind::File)
                && action == Some(NodeAction::Change)
                && node.props.is_none()
                && node.copyfrom().is_none();
            if !boring {
                marks.insert(meta.revision);
            }
            if let Some((source_rev, _)) = node.copyfrom() {
                marks.insert(source_rev);
            }
            Ok(Vec::new())
        })),
        ..Default::default()
    };
    source.report(
        &SubversionRange::all(),
        hooks,
        &ANALYTIC_OPTS,
        &mut io::sink(),
    )?;
    let head = source.revision;

    // Mark the immediate neighbors, clamped to the stream bounds, then
    // merge into a selection.
    let mut wanted: Vec<u64> = marks
        .into_inner()
        .into_iter()
        .flat_map(|rev| [rev.saturating_sub(1), rev, rev.saturating_add(1).min(head)])
        .collect();
    wanted.sort_unstable();
    wanted.dedup();
    let mut intervals: Vec<(u64, u64)> = Vec::new();
    for rev in wanted {
        match intervals.last_mut() {
            Some((_, hi)) if rev <= hi.saturating_add(1) => *hi = rev.max(*hi),
            _ => intervals.push((rev, rev)),
        }
    }

    source.rewind()?;
    select(source, &SubversionRange::from_intervals(intervals), out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{branchy_dump, file_change_node, revision, sample_dump};
    use std::io::Cursor;

    #[test]
    fn test_log_listing() {
        let mut source = DumpfileSource::new(Cursor::new(sample_dump().into_bytes()));
        let mut out = Vec::new();
        log(&mut source, &SubversionRange::all(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let expected = format!(
            "{d}\nr1 | fred | 2020-01-02T00:00:00.000000Z | 1 line\n\nInitial import\n{d}\nr2 | wilma | 2020-01-03T00:00:00.000000Z | 1 line\n\nSecond commit\n{d}\n",
            d = LOG_DELIMITER
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_log_honors_selection() {
        let mut source = DumpfileSource::new(Cursor::new(sample_dump().into_bytes()));
        let mut out = Vec::new();
        log(&mut source, &SubversionRange::parse("2").unwrap(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("r2 | wilma"));
        assert!(!text.contains("r1 | fred"));
    }

    #[test]
    fn test_see_reports_copies_and_directories() {
        let mut source = DumpfileSource::new(Cursor::new(branchy_dump().into_bytes()));
        let mut out = Vec::new();
        see(&mut source, &SubversionRange::all(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("1-1"));
        assert!(lines[0].contains("add"));
        assert!(lines[0].contains("project/trunk/"));
        assert!(lines[1].contains("project/trunk/main.c"));
        assert!(!lines[1].contains("main.c/"));
        assert!(lines[2].contains("copy"));
        assert!(lines[2].contains("project/branches/dev/ from 1:project/trunk/"));
        assert!(lines[3].contains("change"));
    }

    #[test]
    fn test_reduce_keeps_interesting_neighborhood() {
        // Revisions: 0 empty, 1 layout (interesting), 2..4 plain file
        // changes (boring), 5 a dir property change (interesting).
        let mut dump = String::from("SVN-fs-dump-format-version: 2\n\n");
        dump.push_str(&revision(0, &[("svn:date", "2020-01-01T00:00:00.000000Z")]));
        dump.push_str(&revision(1, &[("svn:log", "layout")]));
        dump.push_str(&crate::testutil::dir_node("trunk"));
        for n in 2..=4 {
            dump.push_str(&revision(n, &[("svn:log", "tick")]));
            dump.push_str(&file_change_node(
                "trunk/f",
                "data\n",
                "6137cde4893c59f76f005a8123d8e8e6",
            ));
        }
        dump.push_str(&revision(5, &[("svn:log", "retag")]));
        dump.push_str(&crate::testutil::dir_node_with_props(
            "trunk",
            &[("svn:mergeinfo", "/branches/dev:2")],
        ));
        let mut source = DumpfileSource::new(Cursor::new(dump.into_bytes()));
        let mut out = Vec::new();
        reduce(&mut source, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for kept in [0, 1, 2, 4, 5] {
            assert!(
                text.contains(&format!("Revision-number: {}\n", kept)),
                "revision {} should survive",
                kept
            );
        }
        assert!(!text.contains("Revision-number: 3\n"));
    }
}
