//! The three dump-record shapes: preamble, revision, and node.
//!
//! Header chunks are kept as raw bytes so every header the engine does not
//! deliberately rewrite survives byte-exactly; typed accessors parse out the
//! handful of fields the transformations care about. Each shape serializes
//! itself back to stream form.

use crate::headers;
use crate::properties::Properties;

/// Node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
}

/// Node action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Add,
    Delete,
    Replace,
    Change,
}

impl NodeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAction::Add => "add",
            NodeAction::Delete => "delete",
            NodeAction::Replace => "replace",
            NodeAction::Change => "change",
        }
    }
}

/// The dump-stream preamble: format version and UUID headers, verbatim.
#[derive(Debug, Clone, Default)]
pub struct Preamble {
    pub bytes: Vec<u8>,
}

impl Preamble {
    /// Remove the `UUID:` header and the blank line that follows it.
    pub fn strip_uuid(&mut self) {
        let mut out = Vec::with_capacity(self.bytes.len());
        let mut eat_blank = false;
        for line in headers::lines(&self.bytes) {
            if line.starts_with(b"UUID:") {
                eat_blank = true;
                continue;
            }
            if eat_blank && line == b"\n" {
                eat_blank = false;
                continue;
            }
            eat_blank = false;
            out.extend_from_slice(line);
        }
        self.bytes = out;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// A property payload: raw bytes when no hook needs the parsed form.
#[derive(Debug, Clone)]
pub enum PropPayload {
    Raw(Vec<u8>),
    Parsed(Properties),
}

impl PropPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PropPayload::Raw(bytes) => bytes.clone(),
            PropPayload::Parsed(props) => props.to_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PropPayload::Raw(bytes) => bytes.len(),
            PropPayload::Parsed(props) => props.to_bytes().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One revision header with its property block.
#[derive(Debug, Clone)]
pub struct Revision {
    pub number: u64,
    /// Raw header lines, terminating blank line excluded.
    pub header: Vec<u8>,
    pub props: Option<PropPayload>,
}

impl Revision {
    /// Rewrite the two length headers from the current property payload.
    /// Called after a property hook has run.
    pub fn refresh_lengths(&mut self) {
        let plen = self.props.as_ref().map(|p| p.len()).unwrap_or(0);
        self.header = headers::set_length(&self.header, "Prop-content-length", plen);
        self.header = headers::set_length(&self.header, "Content-length", plen);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header.clone();
        out.push(b'\n');
        if let Some(props) = &self.props {
            out.extend_from_slice(&props.to_bytes());
        }
        out
    }
}

/// One node record: header, optional properties, optional content.
#[derive(Debug, Clone)]
pub struct Node {
    /// Raw header lines, terminating blank line excluded.
    pub header: Vec<u8>,
    pub props: Option<PropPayload>,
    pub content: Vec<u8>,
}

impl Node {
    pub fn path(&self) -> Option<&[u8]> {
        headers::get_header(&self.header, "Node-path")
    }

    pub fn kind(&self) -> Option<NodeKind> {
        match headers::get_header(&self.header, "Node-kind")? {
            b"file" => Some(NodeKind::File),
            b"dir" => Some(NodeKind::Dir),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<NodeAction> {
        match headers::get_header(&self.header, "Node-action")? {
            b"add" => Some(NodeAction::Add),
            b"delete" => Some(NodeAction::Delete),
            b"replace" => Some(NodeAction::Replace),
            b"change" => Some(NodeAction::Change),
            _ => None,
        }
    }

    /// The copy source, when this node is a copy.
    pub fn copyfrom(&self) -> Option<(u64, &[u8])> {
        let rev = headers::get_header(&self.header, "Node-copyfrom-rev")?;
        let rev = std::str::from_utf8(rev).ok()?.trim().parse().ok()?;
        let path = headers::get_header(&self.header, "Node-copyfrom-path")?;
        Some((rev, path))
    }

    /// Whether the node carries a `Text-content-length` header at all.
    pub fn has_text(&self) -> bool {
        headers::get_header(&self.header, "Text-content-length").is_some()
    }

    fn props_len(&self) -> usize {
        self.props.as_ref().map(|p| p.len()).unwrap_or(0)
    }

    /// Rewrite the property-side length headers from the current payload.
    /// Called after a property hook has run.
    pub fn refresh_prop_lengths(&mut self) {
        let plen = self.props_len();
        self.header = headers::set_length(&self.header, "Prop-content-length", plen);
        self.header = headers::set_length(
            &self.header,
            "Content-length",
            plen + self.content.len(),
        );
    }

    /// Replace the content body, adjusting `Text-content-length` and
    /// `Content-length` and removing the now-stale checksum headers.
    pub fn set_content(&mut self, content: Vec<u8>) {
        self.header = headers::set_length(&self.header, "Text-content-length", content.len());
        self.header = headers::set_length(
            &self.header,
            "Content-length",
            self.props_len() + content.len(),
        );
        self.header = headers::strip_checksums(&self.header);
        self.content = content;
    }

    /// Remove the copy-source headers (and their checksums), turning a copy
    /// into a plain action.
    pub fn strip_copyfrom(&mut self) {
        for name in [
            "Node-copyfrom-rev",
            "Node-copyfrom-path",
            "Text-copy-source-md5",
            "Text-copy-source-sha1",
        ] {
            self.header = headers::delete_header(&self.header, name);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.header.clone();
        out.push(b'\n');
        if let Some(props) = &self.props {
            out.extend_from_slice(&props.to_bytes());
        }
        out.extend_from_slice(&self.content);
        out
    }
}
