//! The per-subcommand documentation dictionary.

use std::io::Write;

use anyhow::{anyhow, Result};

/// One-line summaries, in display order.
const ONELINERS: [(&str, &str); 19] = [
    ("select", "Select a revision range"),
    ("deselect", "Drop a revision range"),
    ("sift", "Keep only nodes matching regexps"),
    ("expunge", "Drop nodes matching regexps"),
    ("pathrename", "Transform path names by regexp"),
    ("pop", "Pop the first segment off each path"),
    ("swap", "Swap the top two components of each path"),
    ("propdel", "Delete revision and node properties"),
    ("propset", "Set revision and node properties"),
    ("proprename", "Rename revision and node properties"),
    ("setlog", "Replace log messages from a file"),
    ("strip", "Replace content with unique cookies"),
    ("replace", "Regexp substitution on content"),
    ("obscure", "Obscure pathnames and committers"),
    ("renumber", "Renumber revisions to close gaps"),
    ("reduce", "Strip revisions that do not touch structure"),
    ("see", "Report one line per node action"),
    ("log", "Extract a log listing"),
    ("testify", "Massage a stream into a repeatable test load"),
];

const DETAILS: [(&str, &str); 19] = [
    (
        "select",
        "select: passes through only the revisions in the selection set given\n\
         by -r/--range. Revision 0 owns the stream preamble, so a selection\n\
         that excludes it drops the format and UUID headers too. Revisions\n\
         with no nodes are preserved.",
    ),
    (
        "deselect",
        "deselect: the complement of select; passes through only the\n\
         revisions outside the selection set.",
    ),
    (
        "sift",
        "sift: takes one or more regular expressions and passes through only\n\
         the nodes whose path matches at least one of them. A revision left\n\
         with no nodes is dropped.",
    ),
    (
        "expunge",
        "expunge: takes one or more regular expressions and drops every node\n\
         whose path matches one of them. A revision left with no nodes is\n\
         dropped.",
    ),
    (
        "pathrename",
        "pathrename: takes FROM TO regexp pairs and rewrites Node-path,\n\
         Node-copyfrom-path, and svn:mergeinfo paths. The TO side may use\n\
         ${1}-style numbered back-references into the FROM pattern.",
    ),
    (
        "pop",
        "pop: removes the first segment from every path in the stream,\n\
         including copy sources and mergeinfo. Useful for turning a\n\
         single-project repository inside out. Nodes whose path vanishes\n\
         are dropped.",
    ),
    (
        "swap",
        "swap: exchanges the first two segments of every path, turning\n\
         project/trunk into trunk/project. The standard trunk/tags/branches\n\
         directories are created at the start of revision 1; paths with only\n\
         one segment are dropped.",
    ),
    (
        "propdel",
        "propdel: removes the named properties from every property block in\n\
         range, including deletion markers.",
    ),
    (
        "propset",
        "propset: takes name=value arguments and sets those properties in\n\
         every property block in range, appending new keys at the end.",
    ),
    (
        "proprename",
        "proprename: takes old->new arguments and renames those properties\n\
         everywhere, preserving their position.",
    ),
    (
        "setlog",
        "setlog: replaces svn:log values from the file given with\n\
         --logentries, which must be in the log-listing format this tool's\n\
         log subcommand emits. The author recorded on each replaced revision\n\
         must match the author in the file; a mismatch is fatal.",
    ),
    (
        "strip",
        "strip: replaces every file body (or only the bodies at paths\n\
         matching the optional regexps) with a short cookie naming the\n\
         revision and path. Symbolic links are preserved. Length headers are\n\
         rewritten and stale checksums removed; checksums are never\n\
         recomputed, which reposurgeon tolerates but other consumers may\n\
         not.",
    ),
    (
        "replace",
        "replace: takes a /pattern/replacement/ argument (any delimiter\n\
         character, repeated terminally) and applies the substitution to\n\
         every file body in range, adjusting lengths and removing stale\n\
         checksums.",
    ),
    (
        "obscure",
        "obscure: replaces every path segment except trunk, tags, and\n\
         branches, and every committer ID, with generated names that stay\n\
         consistent across the run. Symbolic-link targets are overwritten in\n\
         place without changing their length.",
    ),
    (
        "renumber",
        "renumber: rewrites revision numbers into a contiguous sequence\n\
         starting at --base (default 0), mapping Node-copyfrom-rev and\n\
         svn:mergeinfo revisions through the same table. References to\n\
         dropped revisions fall back to the nearest surviving older\n\
         revision. Operates on the whole stream; the range is ignored.",
    ),
    (
        "reduce",
        "reduce: two passes over a seekable dump file (given as an argument,\n\
         never standard input). The first marks revisions that touch\n\
         structure: directory operations, adds, deletes, copies, property\n\
         changes, and copy sources. The second emits those revisions and\n\
         their immediate neighbors.",
    ),
    (
        "see",
        "see: renders each node as one line, REV-INDEX ACTION PATH, marking\n\
         directories with a trailing slash and reporting copies with their\n\
         sources.",
    ),
    (
        "log",
        "log: extracts the revision log as a Subversion-style listing,\n\
         suitable for editing and feeding back with setlog.",
    ),
    (
        "testify",
        "testify: removes the UUID, regenerates commit dates on a fixed\n\
         ten-second cadence from the epoch, and renames every committer to\n\
         a fixed literal, making the stream usable as a reproducible test\n\
         load.",
    ),
];

/// Print the summary table, or the long description of one subcommand.
pub fn print<W: Write>(out: &mut W, topic: Option<&str>) -> Result<()> {
    match topic {
        None => {
            writeln!(out, "repocutter subcommands:\n")?;
            for (name, blurb) in ONELINERS {
                writeln!(out, "  {:<12} {}", name, blurb)?;
            }
            writeln!(
                out,
                "\nUse 'repocutter help <subcommand>' for details; global flags are\n\
                 -q/--quiet, -d/--debug, -r/--range, and -i/--infile."
            )?;
            Ok(())
        }
        Some(name) => {
            let entry = DETAILS
                .iter()
                .find(|(cmd, _)| *cmd == name)
                .ok_or_else(|| anyhow!("no such subcommand {:?}", name))?;
            writeln!(out, "{}", entry.1)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subcommand_is_documented() {
        assert_eq!(ONELINERS.len(), DETAILS.len());
        for (name, _) in ONELINERS {
            assert!(DETAILS.iter().any(|(cmd, _)| *cmd == name));
        }
    }

    #[test]
    fn test_print_summary_and_topic() {
        let mut out = Vec::new();
        print(&mut out, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("renumber"));

        let mut out = Vec::new();
        print(&mut out, Some("swap")).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("trunk/project"));

        assert!(print(&mut Vec::new(), Some("bogus")).is_err());
    }
}
