//! Revision selection ranges.
//!
//! A selection is a sorted, non-overlapping union of closed intervals over
//! revision numbers, parsed from specs like `0:HEAD`, `3`, or `2:5,9:12`.
//! Endpoints may carry a `.node` part (`2.1:3.1`) selecting individual nodes
//! within a revision. Hyphen separators are rejected; the hyphenated form
//! belongs to mergeinfo range lists only.

use crate::error::{Result, SurgeryError};

/// Symbolic upper bound: the maximum representable revision.
pub const HEAD: u64 = u64::MAX;

/// One endpoint of a selection interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub rev: u64,
    /// 1-based node index within the revision; `None` selects the whole
    /// revision boundary.
    pub node: Option<u64>,
}

/// A polyrange over revision numbers and revision.node pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubversionRange {
    intervals: Vec<(Endpoint, Endpoint)>,
}

impl SubversionRange {
    /// Parse a selection spec: comma-separated items, each `N`, `N:M`, or
    /// `N:HEAD`, with optional `.node` parts on numeric endpoints.
    pub fn parse(spec: &str) -> Result<Self> {
        let bad = |msg: &str| SurgeryError::Range {
            spec: spec.to_string(),
            msg: msg.to_string(),
        };
        if spec.is_empty() {
            return Err(bad("empty range spec"));
        }
        if spec.contains('-') {
            return Err(bad("hyphenated ranges are not accepted, use ':'"));
        }
        let mut intervals: Vec<(Endpoint, Endpoint)> = Vec::new();
        for item in spec.split(',') {
            let (lo, hi) = match item.split_once(':') {
                Some((lo, hi)) => {
                    let lo = parse_endpoint(lo).ok_or_else(|| bad("malformed lower bound"))?;
                    if lo.rev == HEAD {
                        return Err(bad("HEAD may appear only as an upper bound"));
                    }
                    let hi = parse_endpoint(hi).ok_or_else(|| bad("malformed upper bound"))?;
                    (lo, hi)
                }
                None => {
                    let at = parse_endpoint(item).ok_or_else(|| bad("malformed revision"))?;
                    if at.rev == HEAD {
                        return Err(bad("HEAD may appear only as an upper bound"));
                    }
                    (at, at)
                }
            };
            if lo.rev > hi.rev {
                return Err(bad("interval bounds out of order"));
            }
            if let Some((_, prev_hi)) = intervals.last() {
                if lo.rev <= prev_hi.rev {
                    return Err(bad("intervals must be non-overlapping and non-decreasing"));
                }
            }
            intervals.push((lo, hi));
        }
        Ok(Self { intervals })
    }

    /// The whole stream: `0:HEAD`.
    pub fn all() -> Self {
        Self {
            intervals: vec![(
                Endpoint { rev: 0, node: None },
                Endpoint {
                    rev: HEAD,
                    node: None,
                },
            )],
        }
    }

    /// Build a range from already-sorted, non-overlapping plain intervals.
    pub fn from_intervals(intervals: Vec<(u64, u64)>) -> Self {
        Self {
            intervals: intervals
                .into_iter()
                .map(|(lo, hi)| {
                    (
                        Endpoint { rev: lo, node: None },
                        Endpoint { rev: hi, node: None },
                    )
                })
                .collect(),
        }
    }

    /// Does any interval include revision `rev`?
    pub fn contains(&self, rev: u64) -> bool {
        self.intervals
            .iter()
            .any(|(lo, hi)| lo.rev <= rev && rev <= hi.rev)
    }

    /// Does any interval include node `node` (1-based) of revision `rev`?
    /// Endpoints without a node part bound whole revisions.
    pub fn contains_node(&self, rev: u64, node: u64) -> bool {
        self.intervals.iter().any(|(lo, hi)| {
            let lo_key = (lo.rev, lo.node.unwrap_or(0));
            let hi_key = (hi.rev, hi.node.unwrap_or(u64::MAX));
            lo_key <= (rev, node) && (rev, node) <= hi_key
        })
    }

    /// The high revision of the last interval.
    pub fn upperbound(&self) -> u64 {
        self.intervals.last().map(|(_, hi)| hi.rev).unwrap_or(0)
    }
}

fn parse_endpoint(text: &str) -> Option<Endpoint> {
    if text == "HEAD" {
        return Some(Endpoint {
            rev: HEAD,
            node: None,
        });
    }
    match text.split_once('.') {
        Some((rev, node)) => Some(Endpoint {
            rev: rev.parse().ok()?,
            node: Some(node.parse().ok()?),
        }),
        None => Some(Endpoint {
            rev: text.parse().ok()?,
            node: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_revision() {
        let range = SubversionRange::parse("3").unwrap();
        assert!(!range.contains(2));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert_eq!(range.upperbound(), 3);
    }

    #[test]
    fn test_interval_and_head() {
        let range = SubversionRange::parse("2:5,9:HEAD").unwrap();
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(5));
        assert!(!range.contains(6));
        assert!(range.contains(9));
        assert!(range.contains(1_000_000));
        assert_eq!(range.upperbound(), HEAD);
    }

    #[test]
    fn test_node_endpoints() {
        // Node counts per revision: [0, 1, 3, 2].
        let range = SubversionRange::parse("2.1:3.1").unwrap();
        let mut selected = Vec::new();
        let counts = [0u64, 1, 3, 2];
        for (rev, &count) in counts.iter().enumerate() {
            for node in 1..=count {
                if range.contains_node(rev as u64, node) {
                    selected.push((rev as u64, node));
                }
            }
        }
        assert_eq!(selected, vec![(2, 1), (2, 2), (2, 3), (3, 1)]);
    }

    #[test]
    fn test_plain_ranges_select_all_nodes() {
        let range = SubversionRange::parse("2:4").unwrap();
        assert!(range.contains_node(2, 1));
        assert!(range.contains_node(4, 999));
        assert!(!range.contains_node(5, 1));
    }

    #[test]
    fn test_hyphens_rejected() {
        assert!(SubversionRange::parse("1-3").is_err());
        assert!(SubversionRange::parse("1:3,5-7").is_err());
    }

    #[test]
    fn test_head_only_as_upper_bound() {
        assert!(SubversionRange::parse("HEAD").is_err());
        assert!(SubversionRange::parse("HEAD:3").is_err());
        assert!(SubversionRange::parse("0:HEAD").is_ok());
    }

    #[test]
    fn test_ordering_enforced() {
        assert!(SubversionRange::parse("5:3").is_err());
        assert!(SubversionRange::parse("1:4,3:6").is_err());
        assert!(SubversionRange::parse("4,2").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(SubversionRange::parse("").is_err());
        assert!(SubversionRange::parse("a:b").is_err());
        assert!(SubversionRange::parse("1:2:3").is_err());
    }
}
