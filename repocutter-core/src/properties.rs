//! Property block codec.
//!
//! Parses and re-serializes the `K/V/D ... PROPS-END` block attached to
//! revisions and nodes. Key order and deletion markers are observable in the
//! dump format, so both are preserved: re-serializing a freshly parsed block
//! reproduces the original bytes exactly, including non-ASCII value bytes.

use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{Result, SurgeryError};
use crate::source::LineSource;

/// Well-known Subversion property names.
pub mod svn_props {
    /// Commit log message
    pub const LOG: &str = "svn:log";

    /// Committer ID
    pub const AUTHOR: &str = "svn:author";

    /// Commit timestamp
    pub const DATE: &str = "svn:date";

    /// Merge tracking data
    pub const MERGE_INFO: &str = "svn:mergeinfo";
}

/// An ordered property mapping with deletion markers.
///
/// Values are opaque byte strings; only the keys are required to be text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    properties: HashMap<String, Vec<u8>>,
    propkeys: Vec<String>,
    propdelkeys: Vec<String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a property block from `src`, consuming through the
    /// `PROPS-END` terminator.
    pub fn parse<R: BufRead>(src: &mut LineSource<R>) -> Result<Self> {
        let mut props = Properties::new();
        loop {
            let line = src.peek()?;
            if line.is_empty() {
                return Err(SurgeryError::parse(
                    src.line_number(),
                    "unexpected end of stream in property block",
                ));
            }
            if line.starts_with(b"PROPS-END") {
                src.flush();
                break;
            } else if line.starts_with(b"K ") {
                src.flush();
                let klen = parse_count(&line, src.line_number())?;
                let key = read_counted(src, klen)?;
                let vline = src.require(b"V ")?;
                let vlen = parse_count(&vline, src.line_number())?;
                let value = read_counted(src, vlen)?;
                let key = String::from_utf8(key).map_err(|_| {
                    SurgeryError::parse(src.line_number(), "property key is not valid text")
                })?;
                props.set(&key, value);
            } else if line.starts_with(b"D ") {
                src.flush();
                let klen = parse_count(&line, src.line_number())?;
                let key = read_counted(src, klen)?;
                let key = String::from_utf8(key).map_err(|_| {
                    SurgeryError::parse(src.line_number(), "property key is not valid text")
                })?;
                if !props.propdelkeys.iter().any(|k| k == &key) {
                    props.propdelkeys.push(key);
                }
            } else {
                return Err(SurgeryError::parse(
                    src.line_number(),
                    format!(
                        "malformed property block prefix {:?}",
                        String::from_utf8_lossy(&line)
                    ),
                ));
            }
        }
        Ok(props)
    }

    /// Serialize back to dump-stream form: keys in stored order, then
    /// deletion markers, then the terminator.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for key in &self.propkeys {
            let value = &self.properties[key];
            out.extend_from_slice(format!("K {}\n", key.len()).as_bytes());
            out.extend_from_slice(key.as_bytes());
            out.push(b'\n');
            out.extend_from_slice(format!("V {}\n", value.len()).as_bytes());
            out.extend_from_slice(value);
            out.push(b'\n');
        }
        for key in &self.propdelkeys {
            out.extend_from_slice(format!("D {}\n", key.len()).as_bytes());
            out.extend_from_slice(key.as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(b"PROPS-END\n");
        out
    }

    /// Get a property value.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.properties.get(name).map(|v| v.as_slice())
    }

    /// Get a property value as text, if it is valid UTF-8.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Set a property value, appending to the key order if new.
    pub fn set(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        if self.properties.insert(name.to_string(), value.into()).is_none() {
            self.propkeys.push(name.to_string());
        }
    }

    /// Remove a property, its ordering record, and any deletion marker.
    /// Returns true if anything was removed.
    pub fn delete(&mut self, name: &str) -> bool {
        let had_value = self.properties.remove(name).is_some();
        self.propkeys.retain(|k| k != name);
        let dels = self.propdelkeys.len();
        self.propdelkeys.retain(|k| k != name);
        had_value || dels != self.propdelkeys.len()
    }

    /// Rename a property, preserving its position in the key order and in
    /// the deletion-marker order. Returns true if anything was renamed.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        let mut renamed = false;
        if let Some(value) = self.properties.remove(old) {
            self.properties.insert(new.to_string(), value);
            renamed = true;
        }
        for key in self.propkeys.iter_mut().chain(self.propdelkeys.iter_mut()) {
            if key == old {
                *key = new.to_string();
                renamed = true;
            }
        }
        renamed
    }

    /// Check whether a property (or deletion marker) is present.
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name) || self.propdelkeys.iter().any(|k| k == name)
    }

    /// Property names in serialization order (deletion markers excluded).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.propkeys.iter().map(|k| k.as_str())
    }

    /// Deletion-marker names in serialization order.
    pub fn deleted_keys(&self) -> impl Iterator<Item = &str> {
        self.propdelkeys.iter().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.propkeys.is_empty() && self.propdelkeys.is_empty()
    }
}

fn parse_count(line: &[u8], lineno: u64) -> Result<usize> {
    let text = std::str::from_utf8(&line[2..])
        .map_err(|_| SurgeryError::parse(lineno, "malformed length line"))?;
    text.trim_end().parse::<usize>().map_err(|_| {
        SurgeryError::parse(lineno, format!("malformed length in {:?}", text.trim_end()))
    })
}

/// Read exactly `n` payload bytes followed by the mandatory newline.
fn read_counted<R: BufRead>(src: &mut LineSource<R>, n: usize) -> Result<Vec<u8>> {
    let payload = src.read(n)?;
    let sep = src.read(1)?;
    if sep != b"\n" {
        return Err(SurgeryError::parse(
            src.line_number(),
            "property length does not match its payload",
        ));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const BLOCK: &str = "K 10\nsvn:author\nV 4\nfred\nK 7\nsvn:log\nV 14\nInitial import\nD 8\nsvn:date\nPROPS-END\n";

    fn parse(text: &str) -> Properties {
        let mut src = LineSource::new(Cursor::new(text.as_bytes().to_vec()));
        Properties::parse(&mut src).unwrap()
    }

    #[test]
    fn test_parse_basic_block() {
        let props = parse(BLOCK);
        assert_eq!(props.get("svn:author"), Some(&b"fred"[..]));
        assert_eq!(props.get_str("svn:log"), Some("Initial import"));
        assert!(props.contains("svn:date"));
        assert_eq!(props.get("svn:date"), None);
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["svn:author", "svn:log"]);
        assert_eq!(props.deleted_keys().collect::<Vec<_>>(), vec!["svn:date"]);
    }

    #[test]
    fn test_serialization_is_stable() {
        let props = parse(BLOCK);
        assert_eq!(props.to_bytes(), BLOCK.as_bytes());
    }

    #[test]
    fn test_non_ascii_value_roundtrip() {
        let block: &[u8] = b"K 7\nsvn:log\nV 4\n\xc3\xa9\xff\x00\nPROPS-END\n";
        let mut src = LineSource::new(Cursor::new(block.to_vec()));
        let props = Properties::parse(&mut src).unwrap();
        assert_eq!(props.get("svn:log"), Some(&b"\xc3\xa9\xff\x00"[..]));
        assert_eq!(props.to_bytes(), block);
    }

    #[test]
    fn test_value_containing_newlines() {
        let block = "K 7\nsvn:log\nV 9\ntwo\nlines\nPROPS-END\n";
        let props = parse(block);
        assert_eq!(props.get_str("svn:log"), Some("two\nlines"));
        assert_eq!(props.to_bytes(), block.as_bytes());
    }

    #[test]
    fn test_set_appends_to_order() {
        let mut props = parse(BLOCK);
        props.set("svn:mergeinfo", "/trunk:1-3");
        assert_eq!(
            props.keys().collect::<Vec<_>>(),
            vec!["svn:author", "svn:log", "svn:mergeinfo"]
        );
        // Overwriting keeps the original position.
        props.set("svn:author", "barney");
        assert_eq!(props.keys().next(), Some("svn:author"));
        assert_eq!(props.get("svn:author"), Some(&b"barney"[..]));
    }

    #[test]
    fn test_delete_removes_marker_too() {
        let mut props = parse(BLOCK);
        assert!(props.delete("svn:date"));
        assert!(!props.contains("svn:date"));
        assert!(props.delete("svn:log"));
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["svn:author"]);
        assert!(!props.delete("no-such"));
    }

    #[test]
    fn test_rename_preserves_position() {
        let mut props = parse(BLOCK);
        assert!(props.rename("svn:log", "bugtraq:message"));
        assert_eq!(
            props.keys().collect::<Vec<_>>(),
            vec!["svn:author", "bugtraq:message"]
        );
        assert_eq!(props.get_str("bugtraq:message"), Some("Initial import"));
        assert!(props.rename("svn:date", "old:date"));
        assert_eq!(props.deleted_keys().collect::<Vec<_>>(), vec!["old:date"]);
    }

    #[test]
    fn test_malformed_prefix_is_fatal() {
        let mut src = LineSource::new(Cursor::new(b"Q 3\nfoo\nPROPS-END\n".to_vec()));
        assert!(Properties::parse(&mut src).is_err());
    }

    #[test]
    fn test_length_mismatch_is_fatal() {
        let mut src = LineSource::new(Cursor::new(b"K 2\nabc\nV 1\nx\nPROPS-END\n".to_vec()));
        assert!(Properties::parse(&mut src).is_err());
    }

    #[test]
    fn test_truncated_block_is_fatal() {
        let mut src = LineSource::new(Cursor::new(b"K 3\nfoo\nV 3\nbar\n".to_vec()));
        assert!(Properties::parse(&mut src).is_err());
    }
}

#[cfg(test)]
mod stability {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        /// Serializing then reparsing an arbitrary block is the identity.
        #[test]
        fn prop_serialize_parse_roundtrip(
            entries in proptest::collection::vec(("[a-z:][a-z:-]{0,15}", proptest::collection::vec(any::<u8>(), 0..64)), 0..8),
            dels in proptest::collection::vec("[a-z:][a-z:-]{0,15}", 0..4),
        ) {
            let mut props = Properties::new();
            for (key, value) in &entries {
                props.set(key, value.clone());
            }
            for key in &dels {
                if !props.contains(key) {
                    props.propdelkeys.push(key.clone());
                }
            }
            let bytes = props.to_bytes();
            let mut src = LineSource::new(Cursor::new(bytes.clone()));
            let reparsed = Properties::parse(&mut src).unwrap();
            prop_assert_eq!(reparsed.to_bytes(), bytes);
        }
    }
}
