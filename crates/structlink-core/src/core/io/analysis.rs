//! Line-oriented parsers for the tabular replies of the viewer's structural
//! analysis commands.
//!
//! Every parser walks the reply with the same small state machine: it seeks
//! its header sentinel (if the reply type has one), then consumes rows whose
//! token count matches the record shape, skipping anything else, until the
//! reply is exhausted. Values are parsed strictly; a row with an unparsable
//! number is dropped rather than aborting the whole reply.

use super::error::ParseError;
use super::records::{AtomSpec, parse_atom_spec};
use crate::core::models::ids::ModelKey;
use crate::core::models::object::{ResidueRef, residue_number};
use tracing::debug;

pub const CONTACT_HEADER: &str = "atom1";
pub const HBOND_HEADER: &str = "H-bonds";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    SeekingHeader,
    ConsumingRows,
    Done,
}

/// Runs the scan state machine over `lines`, handing the whitespace-split
/// tokens of every row after the header to `row`.
fn scan<T>(
    lines: &[String],
    header: Option<&'static str>,
    mut row: impl FnMut(&[&str]) -> Option<T>,
) -> Result<Vec<T>, ParseError> {
    let mut state = match header {
        Some(_) => ScanState::SeekingHeader,
        None => ScanState::ConsumingRows,
    };
    let mut records = Vec::new();
    let mut remaining = lines.iter();

    while state != ScanState::Done {
        let Some(line) = remaining.next() else {
            if state == ScanState::SeekingHeader {
                if let Some(h) = header {
                    return Err(ParseError::MissingHeader(h));
                }
            }
            state = ScanState::Done;
            continue;
        };
        match state {
            ScanState::SeekingHeader => {
                if header.is_some_and(|h| line.trim_start().starts_with(h)) {
                    state = ScanState::ConsumingRows;
                }
            }
            ScanState::ConsumingRows => {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if let Some(record) = row(&tokens) {
                    records.push(record);
                }
            }
            ScanState::Done => {}
        }
    }
    Ok(records)
}

fn parse_float(kind: &'static str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(kind, value, "Skipping row with unparsable number");
            None
        }
    }
}

/// One contact or clash row: `atom1 atom2 overlap distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub atom1: String,
    pub atom2: String,
    pub overlap: f64,
    pub distance: f64,
}

pub fn parse_contacts(lines: &[String]) -> Result<Vec<ContactRecord>, ParseError> {
    scan(lines, Some(CONTACT_HEADER), |tokens| {
        let [atom1, atom2, overlap, distance] = tokens else {
            return None;
        };
        Some(ContactRecord {
            atom1: atom1.to_string(),
            atom2: atom2.to_string(),
            overlap: parse_float("contact", overlap)?,
            distance: parse_float("contact", distance)?,
        })
    })
}

/// One hydrogen-bond row: `donor acceptor hydrogen D..A D-H..A`, where the
/// hydrogen column reads `no hydrogen` when none was located.
#[derive(Debug, Clone, PartialEq)]
pub struct HBondRecord {
    pub donor: String,
    pub acceptor: String,
    pub distance: f64,
}

/// Parses a hydrogen-bond reply.
///
/// The donor-acceptor distance (fourth column) is used unless the hydrogen is
/// missing, in which case it shifts to the fifth column. When hydrogens were
/// added before the search, the D-H..A distance (fifth column) is used.
pub fn parse_hbonds(
    lines: &[String],
    hydrogens_added: bool,
) -> Result<Vec<HBondRecord>, ParseError> {
    scan(lines, Some(HBOND_HEADER), |tokens| {
        if tokens.len() != 5 && tokens.len() != 6 {
            return None;
        }
        let no_hydrogen = tokens[2] == "no" && tokens[3] == "hydrogen";
        let distance = if no_hydrogen || hydrogens_added {
            tokens[4]
        } else {
            tokens[3]
        };
        Some(HBondRecord {
            donor: tokens[0].to_string(),
            acceptor: tokens[1].to_string(),
            distance: parse_float("hbond", distance)?,
        })
    })
}

/// One `list distmat` row: `tag atom1 atom2 distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceRecord {
    pub atom1: String,
    pub atom2: String,
    pub distance: f64,
}

/// Parses a distance-matrix reply, keeping rows at or below `cutoff`.
/// A cutoff of exactly zero keeps every syntactically valid row.
pub fn parse_distances(lines: &[String], cutoff: f64) -> Result<Vec<DistanceRecord>, ParseError> {
    scan(lines, None, |tokens| {
        let [_, atom1, atom2, distance] = tokens else {
            return None;
        };
        let distance = parse_float("distance", distance)?;
        if cutoff != 0.0 && distance > cutoff {
            return None;
        }
        Some(DistanceRecord {
            atom1: atom1.to_string(),
            atom2: atom2.to_string(),
            distance,
        })
    })
}

/// A physically connected stretch of residues: `physical chain <start> <end>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRange {
    pub start: AtomSpec,
    pub end: AtomSpec,
}

pub fn parse_chain_ranges(lines: &[String]) -> Result<Vec<ChainRange>, ParseError> {
    scan(lines, None, |tokens| {
        let [_, _, start, end] = tokens else {
            return None;
        };
        match (parse_atom_spec(start), parse_atom_spec(end)) {
            (Ok(start), Ok(end)) => Some(ChainRange { start, end }),
            _ => {
                debug!(start, end, "Skipping connectivity row with unparsable bounds");
                None
            }
        }
    })
}

impl ChainRange {
    fn model_matches(&self, model: ModelKey) -> bool {
        self.start.model.is_none_or(|m| m == model)
    }

    /// Chain identifiers spanned alphabetically when the bounds name
    /// different chains.
    fn chain_span(&self) -> Option<(&str, &str)> {
        let (a, b) = (self.start.chain.as_str(), self.end.chain.as_str());
        if a == b {
            None
        } else if a <= b {
            Some((a, b))
        } else {
            Some((b, a))
        }
    }

    /// Index bounds in ascending order, whichever way the range was reported.
    fn index_bounds(&self) -> Option<(i64, i64)> {
        let s = residue_number(&self.start.index)?;
        let e = residue_number(&self.end.index)?;
        Some(if e < s { (e, s) } else { (s, e) })
    }

    pub fn contains(&self, residue: &ResidueRef) -> bool {
        if !self.model_matches(residue.model) {
            return false;
        }
        if let Some((lo, hi)) = self.chain_span() {
            return lo <= residue.chain.as_str() && residue.chain.as_str() <= hi;
        }
        if residue.chain != self.start.chain {
            return false;
        }
        match (self.index_bounds(), residue.number()) {
            (Some((lo, hi)), Some(n)) => lo <= n && n <= hi,
            _ => false,
        }
    }

    /// Two residues are backbone neighbors when they share model and chain,
    /// both lie inside this range, and their indices differ by one.
    pub fn links(&self, a: &ResidueRef, b: &ResidueRef) -> bool {
        if a.model != b.model || a.chain != b.chain {
            return false;
        }
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        match (a.number(), b.number()) {
            (Some(x), Some(y)) => x.abs_diff(y) == 1,
            _ => false,
        }
    }
}
