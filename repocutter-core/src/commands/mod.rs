//! The transformation command family.
//!
//! Each command installs a node hook, a property hook, or both into the
//! record reader and picks an emission policy. Hooks never panic on input
//! shape; they fail through `SurgeryError` and may return an empty byte
//! slice to drop a record silently.

pub mod analytic;
pub mod content;
pub mod filter;
pub mod paths;
pub mod props;
pub mod renumber;
pub mod testify;

pub use analytic::{log, reduce, see};
pub use content::{obscure, replace, strip};
pub use filter::{deselect, expunge, select, sift};
pub use paths::{pathrename, pop, swap};
pub use props::{propdel, proprename, propset, setlog};
pub use renumber::renumber;
pub use testify::testify;
