//! The query [`Sequence`] type.
//!
//! A sequence is parsed once per request and never mutated afterwards. The
//! residues are stored upper-case; the accepted alphabet is DNA/RNA plus the
//! IUPAC ambiguity codes.
use core::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::error::{Result, ScreenError};

/// Residues accepted in a query (upper-case; input is case-folded first).
pub const IUPAC_NUCLEOTIDES: &[u8] = b"ACGTUNRYKMSWBDHV";

/// An identified nucleotide sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Sequence {
    /// First whitespace-delimited token of the FASTA header.
    pub id: String,
    /// Remainder of the header line, if any.
    pub description: Option<String>,
    #[serde(serialize_with = "serialize_residues")]
    residues: Vec<u8>,
}

fn serialize_residues<S: serde::Serializer>(residues: &[u8], s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(residues))
}

impl Sequence {
    /// Build a sequence, upper-casing and validating the residues.
    ///
    /// # Examples
    /// ```
    /// let s = ampliscreen::Sequence::new("q1", b"acgtn".to_vec()).unwrap();
    /// assert_eq!(s.as_str(), "ACGTN");
    /// ```
    pub fn new(id: impl Into<String>, residues: Vec<u8>) -> Result<Self> {
        let id = id.into();
        let mut residues = residues;
        residues.make_ascii_uppercase();
        if residues.is_empty() {
            return Err(ScreenError::Sequence(format!("sequence '{id}' is empty")));
        }
        if let Some(pos) = residues.iter().position(|b| !IUPAC_NUCLEOTIDES.contains(b)) {
            return Err(ScreenError::Sequence(format!(
                "sequence '{}' contains invalid character '{}' at position {}",
                id,
                residues[pos].escape_ascii(),
                pos + 1
            )));
        }
        Ok(Self { id, description: None, residues })
    }

    /// Attach a header description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.is_empty());
        self
    }

    pub fn len(&self) -> usize { self.residues.len() }

    pub fn is_empty(&self) -> bool { self.residues.is_empty() }

    pub fn as_bytes(&self) -> &[u8] { &self.residues }

    /// Residues as text. Always valid ASCII after construction.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.residues).unwrap_or_default()
    }

    /// Copy out `range` as a new sequence named `id`.
    ///
    /// Panics when `range` is out of bounds; callers pass coordinates already
    /// checked against this sequence.
    pub fn subsequence(&self, id: impl Into<String>, range: Range<usize>) -> Sequence {
        Sequence { id: id.into(), description: None, residues: self.residues[range].to_vec() }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}
