//! Primer pair generation.
//!
//! The design service answers with a flat `KEY=VALUE` mapping
//! ([`DesignResponse`]). [`pairs_from_response`] turns it into typed
//! [`PrimerPair`]s; no indexed key lookup happens past this module.
//!
//! # Examples
//! ```
//! use ampliscreen::primer::{DesignResponse, pairs_from_response};
//! use ampliscreen::Sequence;
//! let template = Sequence::new("q", b"ACGT".repeat(50)).unwrap();
//! let resp = DesignResponse::parse_boulder("PRIMER_PAIR_NUM_RETURNED=0\n=\n").unwrap();
//! assert!(pairs_from_response(&resp, &template).unwrap().is_empty());
//! ```
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::amplicon::extract_region;
use crate::error::{Result, ScreenError};
use crate::sequence::Sequence;

/// Acceptable primer melting range requested from the design service (°C).
pub const MELTING_RANGE: (u32, u32) = (55, 65);

/// Design task requested from the design service.
pub const DESIGN_TASK: &str = "generic";

/// Per-request primer design options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DesignParams {
    pub optimal_melting_temp: u32,
    pub product_min: usize,
    pub product_max: usize,
}

/// One candidate primer pair.
#[derive(Clone, Debug, Serialize)]
pub struct PrimerPair {
    /// 0-based 5' position of the left primer.
    pub left_start: usize,
    pub left_length: usize,
    /// 0-based position of the right primer's 5' end (its rightmost base).
    pub right_start: usize,
    pub right_length: usize,
    pub left_seq: String,
    pub right_seq: String,
    pub left_gc: f64,
    pub right_gc: f64,
    pub left_melt_temp: f64,
    pub right_melt_temp: f64,
    pub left_end_stability: f64,
    pub right_end_stability: f64,
    pub product_size: usize,
    pub compl_end: f64,
    pub amplified_region: Sequence,
}

impl PrimerPair {
    /// Half-open amplicon bounds on the template.
    pub fn product_range(&self) -> std::ops::Range<usize> { self.left_start..self.right_start + 1 }

    /// Melting temperatures as displayed (2 decimals).
    pub fn melt_temps_display(&self) -> (String, String) {
        (format!("{:.2}", self.left_melt_temp), format!("{:.2}", self.right_melt_temp))
    }
}

/// Raw design-service answer: a flat mapping of field name to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DesignResponse {
    fields: BTreeMap<String, String>,
}

impl DesignResponse {
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Parse one Boulder-IO record (`KEY=VALUE` lines ending at a lone `=`).
    ///
    /// A `PRIMER_ERROR` field means the service rejected the request and is
    /// reported as [`ScreenError::DesignService`].
    pub fn parse_boulder(text: &str) -> Result<Self> {
        let mut fields = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line == "=" {
                break;
            }
            if line.is_empty() {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ScreenError::MalformedDesignResponse(format!("not a KEY=VALUE line: '{line}'")))?;
            fields.insert(key.to_string(), value.to_string());
        }
        let resp = Self { fields };
        if let Some(err) = resp.get("PRIMER_ERROR") {
            return Err(ScreenError::DesignService(err.to_string()));
        }
        Ok(resp)
    }

    pub fn get(&self, key: &str) -> Option<&str> { self.fields.get(key).map(String::as_str) }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ScreenError::MalformedDesignResponse(format!("missing field {key}")))
    }

    fn number<T: std::str::FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.require(key)?;
        raw.trim()
            .parse()
            .map_err(|_| ScreenError::MalformedDesignResponse(format!("field {key} has unparsable value '{raw}'")))
    }

    /// `start,length` location fields such as `PRIMER_LEFT_0=12,20`.
    fn location(&self, key: &str) -> Result<(usize, usize)> {
        let raw = self.require(key)?;
        let parsed = raw.split_once(',').and_then(|(s, l)| Some((s.trim().parse().ok()?, l.trim().parse().ok()?)));
        parsed.ok_or_else(|| ScreenError::MalformedDesignResponse(format!("field {key} is not 'start,length': '{raw}'")))
    }
}

/// Service that proposes primer pairs for a template.
pub trait PrimerDesigner: Send + Sync {
    fn design(&self, template: &Sequence, params: &DesignParams) -> Result<DesignResponse>;
}

/// Map the flat response to typed pairs, extracting each amplified region.
pub fn pairs_from_response(resp: &DesignResponse, template: &Sequence) -> Result<Vec<PrimerPair>> {
    let count: usize = resp.number("PRIMER_PAIR_NUM_RETURNED")?;
    let mut pairs = Vec::with_capacity(count);
    for i in 0..count {
        let (left_start, left_length) = resp.location(&format!("PRIMER_LEFT_{i}"))?;
        let (right_start, right_length) = resp.location(&format!("PRIMER_RIGHT_{i}"))?;
        if left_start >= right_start || right_start >= template.len() {
            return Err(ScreenError::MalformedDesignResponse(format!(
                "pair {i} has coordinates {left_start}..{right_start} outside template of length {}",
                template.len()
            )));
        }
        let compl_end_key = format!("PRIMER_PAIR_{i}_COMPL_END");
        let compl_end = if resp.get(&compl_end_key).is_some() {
            resp.number(&compl_end_key)?
        } else {
            resp.number(&format!("PRIMER_PAIR_{i}_COMPL_END_TH"))?
        };

        let pair = PrimerPair {
            left_start,
            left_length,
            right_start,
            right_length,
            left_seq: resp.require(&format!("PRIMER_LEFT_{i}_SEQUENCE"))?.to_string(),
            right_seq: resp.require(&format!("PRIMER_RIGHT_{i}_SEQUENCE"))?.to_string(),
            left_gc: resp.number(&format!("PRIMER_LEFT_{i}_GC_PERCENT"))?,
            right_gc: resp.number(&format!("PRIMER_RIGHT_{i}_GC_PERCENT"))?,
            left_melt_temp: resp.number(&format!("PRIMER_LEFT_{i}_TM"))?,
            right_melt_temp: resp.number(&format!("PRIMER_RIGHT_{i}_TM"))?,
            left_end_stability: resp.number(&format!("PRIMER_LEFT_{i}_END_STABILITY"))?,
            right_end_stability: resp.number(&format!("PRIMER_RIGHT_{i}_END_STABILITY"))?,
            product_size: resp.number(&format!("PRIMER_PAIR_{i}_PRODUCT_SIZE"))?,
            compl_end,
            amplified_region: extract_region(template, left_start, right_start),
        };
        debug!(pair = i, left = left_start, right = right_start, size = pair.product_size, "mapped primer pair");
        pairs.push(pair);
    }
    Ok(pairs)
}

/// Run the design service and map its answer. An empty list means no
/// suitable primers were found.
pub fn design_primer_pairs(designer: &dyn PrimerDesigner, template: &Sequence, params: &DesignParams) -> Result<Vec<PrimerPair>> {
    let resp = designer.design(template, params)?;
    pairs_from_response(&resp, template)
}
