//! Repocutter core library
//!
//! A streaming surgery engine for Subversion dump files:
//! - Line-buffered byte source with one-line pushback
//! - Property block codec with byte-stable re-serialization
//! - Record reader/emitter that keeps the three length headers consistent
//! - Revision selection ranges
//! - The transformation command family (selection, path surgery, property
//!   surgery, content surgery, renumbering, analytics)
//!
//! The engine is single-threaded and constant-memory in the number of
//! records: one record is materialized at a time and emitted before the
//! next is read.

pub mod commands;
pub mod dumpfile;
pub mod error;
pub mod headers;
pub mod mergeinfo;
pub mod names;
pub mod properties;
pub mod range;
pub mod record;
pub mod source;

#[cfg(test)]
pub mod testutil;

pub use dumpfile::{DumpfileSource, Hooks, RecordMeta, ReportOptions};
pub use error::{Result, SurgeryError};
pub use properties::Properties;
pub use range::SubversionRange;
pub use record::{Node, NodeAction, NodeKind, Preamble, Revision};
pub use source::LineSource;
