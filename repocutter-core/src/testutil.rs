//! Dump-stream fixture builders shared by the command tests.

/// A property block with the given entries, lengths computed.
pub fn props_block(entries: &[(&str, &str)]) -> String {
    let mut block = String::new();
    for (key, value) in entries {
        block.push_str(&format!("K {}\n{}\n", key.len(), key));
        block.push_str(&format!("V {}\n{}\n", value.len(), value));
    }
    block.push_str("PROPS-END\n");
    block
}

/// A revision record followed by its separator blank line.
pub fn revision(number: u64, entries: &[(&str, &str)]) -> String {
    let block = props_block(entries);
    format!(
        "Revision-number: {}\nProp-content-length: {}\nContent-length: {}\n\n{}\n",
        number,
        block.len(),
        block.len(),
        block
    )
}

/// A directory-add node with an empty property block.
pub fn dir_node(path: &str) -> String {
    format!(
        "Node-path: {}\nNode-kind: dir\nNode-action: add\nProp-content-length: 10\nContent-length: 10\n\nPROPS-END\n\n\n",
        path
    )
}

/// A directory property-change node.
pub fn dir_node_with_props(path: &str, entries: &[(&str, &str)]) -> String {
    let block = props_block(entries);
    format!(
        "Node-path: {}\nNode-kind: dir\nNode-action: change\nProp-content-length: {}\nContent-length: {}\n\n{}\n\n",
        path,
        block.len(),
        block.len(),
        block
    )
}

/// A file-add node with plain content.
pub fn file_node(path: &str, content: &str) -> String {
    format!(
        "Node-path: {}\nNode-kind: file\nNode-action: add\nText-content-length: {}\nContent-length: {}\n\n{}\n\n",
        path,
        content.len(),
        content.len(),
        content
    )
}

/// A file-change node with content and an md5 checksum header.
pub fn file_change_node(path: &str, content: &str, md5: &str) -> String {
    format!(
        "Node-path: {}\nNode-kind: file\nNode-action: change\nText-content-length: {}\nText-content-md5: {}\nContent-length: {}\n\n{}\n\n",
        path,
        content.len(),
        md5,
        content.len(),
        content
    )
}

/// A directory copy node.
pub fn copy_node(path: &str, from_rev: u64, from_path: &str) -> String {
    format!(
        "Node-path: {}\nNode-kind: dir\nNode-action: add\nNode-copyfrom-rev: {}\nNode-copyfrom-path: {}\n\n\n",
        path, from_rev, from_path
    )
}

/// The standard three-revision fixture: preamble, empty revision 0, an
/// import revision, and a change revision.
pub fn sample_dump() -> String {
    let mut dump =
        String::from("SVN-fs-dump-format-version: 2\n\nUUID: 8b3f6a9c-2c14-4c92-b1b0-0e0f0a0b0c0d\n\n");
    dump.push_str(&revision(0, &[("svn:date", "2020-01-01T00:00:00.000000Z")]));
    dump.push_str(&revision(
        1,
        &[
            ("svn:author", "fred"),
            ("svn:date", "2020-01-02T00:00:00.000000Z"),
            ("svn:log", "Initial import"),
        ],
    ));
    dump.push_str(&dir_node("trunk"));
    dump.push_str(&file_node("trunk/README", "hello\n"));
    dump.push_str(&revision(
        2,
        &[
            ("svn:author", "wilma"),
            ("svn:date", "2020-01-03T00:00:00.000000Z"),
            ("svn:log", "Second commit"),
        ],
    ));
    dump.push_str(&file_node("trunk/README", "goodbye\n"));
    dump
}

/// A fixture with a copy, a mergeinfo property, and a multi-project layout.
pub fn branchy_dump() -> String {
    let mut dump = String::from("SVN-fs-dump-format-version: 2\n\n");
    dump.push_str(&revision(0, &[("svn:date", "2020-01-01T00:00:00.000000Z")]));
    dump.push_str(&revision(
        1,
        &[("svn:author", "fred"), ("svn:log", "layout")],
    ));
    dump.push_str(&dir_node("project/trunk"));
    dump.push_str(&file_node("project/trunk/main.c", "int main;\n"));
    dump.push_str(&revision(
        2,
        &[("svn:author", "fred"), ("svn:log", "branch")],
    ));
    dump.push_str(&copy_node("project/branches/dev", 1, "project/trunk"));
    dump.push_str(&revision(
        3,
        &[("svn:author", "wilma"), ("svn:log", "merge back")],
    ));
    dump.push_str(&dir_node_with_props(
        "project/trunk",
        &[("svn:mergeinfo", "/project/branches/dev:2")],
    ));
    dump
}
