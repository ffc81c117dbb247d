//! Raw surgery on RFC-822-style header chunks.
//!
//! A header chunk is the run of `Name: value\n` lines that opens a revision
//! or node record, without the terminating blank line. All matching is
//! anchored at line starts, so `Content-length` never matches inside
//! `Prop-content-length`.

/// Iterate the lines of a chunk, terminators included.
pub fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split_inclusive(|&b| b == b'\n')
}

fn value_of<'a>(line: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let prefix_len = name.len() + 2;
    if line.len() >= prefix_len
        && line.starts_with(name.as_bytes())
        && &line[name.len()..prefix_len] == b": "
    {
        let mut value = &line[prefix_len..];
        if value.last() == Some(&b'\n') {
            value = &value[..value.len() - 1];
        }
        Some(value)
    } else {
        None
    }
}

/// Look up a header value in a chunk.
pub fn get_header<'a>(data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    lines(data).find_map(|line| value_of(line, name))
}

/// Look up a header and parse it as a decimal count, defaulting to 0 when
/// the header is absent or malformed.
pub fn get_count(data: &[u8], name: &str) -> usize {
    get_header(data, name)
        .and_then(|v| std::str::from_utf8(v).ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Replace the value of an existing header. A chunk without the header is
/// returned unchanged.
pub fn set_header(data: &[u8], name: &str, value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for line in lines(data) {
        if value_of(line, name).is_some() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value);
            out.push(b'\n');
        } else {
            out.extend_from_slice(line);
        }
    }
    out
}

/// Remove every line carrying the named header.
pub fn delete_header(data: &[u8], name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for line in lines(data) {
        if value_of(line, name).is_none() {
            out.extend_from_slice(line);
        }
    }
    out
}

/// Rewrite a length header in place. When the header is absent, a zero
/// value is a no-op and a nonzero value appends the header to the chunk.
pub fn set_length(data: &[u8], name: &str, value: usize) -> Vec<u8> {
    if get_header(data, name).is_some() {
        return set_header(data, name, value.to_string().as_bytes());
    }
    if value == 0 {
        return data.to_vec();
    }
    let mut out = data.to_vec();
    out.extend_from_slice(format!("{}: {}\n", name, value).as_bytes());
    out
}

const CHECKSUM_HEADERS: [&str; 4] = [
    "Text-content-md5",
    "Text-content-sha1",
    "Text-copy-source-md5",
    "Text-copy-source-sha1",
];

/// Remove all checksum headers. Required whenever content bytes are
/// rewritten, since the engine never computes fresh checksums.
pub fn strip_checksums(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for line in lines(data) {
        if !CHECKSUM_HEADERS.iter().any(|h| value_of(line, h).is_some()) {
            out.extend_from_slice(line);
        }
    }
    out
}
