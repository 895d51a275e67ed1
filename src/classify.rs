//! Per-hit specificity classification.
//!
//! A hit is judged on its local alignments alone. More than one local
//! alignment against the same subject points at a repetitive target and is
//! rejected outright. For a single alignment the verdict is decided by the
//! identity ratio, the longest run of identical columns in the match line and
//! how much of the query that run covers, checked in this order (first match
//! wins):
//!
//! 1. [`Verdict::SelfAlignment`]: long run, identity above the floor, run
//!    covering the whole query.
//! 2. [`Verdict::ConflictingHit`]: long run, identity strictly inside the
//!    suspicious window.
//! 3. [`Verdict::ExceedsSubunitMatch`]: run longer than the subunit length.
//! 4. [`Verdict::Acceptable`].
//!
//! # Examples
//! ```
//! use ampliscreen::classify::{longest_match_run, Thresholds};
//! assert_eq!(longest_match_run("|||| ||||||  ||"), 6);
//! assert_eq!(Thresholds::default().self_identity_floor, 0.99);
//! ```
use core::fmt;

use serde::Serialize;

use crate::blast::{AlignmentHit, MATCH_SYMBOL};

/// Shortest run still reported when no long run exists.
pub const SHORT_RUN_MIN: usize = 5;

/// Classification thresholds for one request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Thresholds {
    /// Identity ratio a self alignment must exceed.
    pub self_identity_floor: f64,
    /// Exclusive (min, max) identity percentages of a conflicting hit.
    pub conflicting_identity_range: (f64, f64),
    /// Contiguous identical length that risks off-target amplification.
    pub subunit_length: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { self_identity_floor: 0.99, conflicting_identity_range: (80.0, 99.0), subunit_length: 20 }
    }
}

/// Outcome category for one hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    /// Near-identical over the whole query: the intended target.
    SelfAlignment,
    /// Long identical run with identity inside the suspicious window.
    ConflictingHit,
    /// Identical run longer than the subunit length.
    ExceedsSubunitMatch,
    /// More than one local alignment against the subject.
    MultipleLocalAlignments,
    /// No rule applied.
    Acceptable,
}

impl Verdict {
    /// Label used in tables and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::SelfAlignment => "Self alignment",
            Verdict::ConflictingHit => "Conflicting hits",
            Verdict::ExceedsSubunitMatch => "Match exceeding subunit length",
            Verdict::MultipleLocalAlignments => "Multiple HSPs",
            Verdict::Acceptable => "Good",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Measurements behind a verdict.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct HitMetrics {
    /// Number of local alignments (HSPs) on the subject.
    pub local_alignments: usize,
    /// Identity ratio per local alignment, in reported order.
    pub identity_ratios: Vec<f64>,
    /// Aligned length per local alignment, in reported order.
    pub aligned_lengths: Vec<usize>,
    /// Run length used for the decision (0 when below [`SHORT_RUN_MIN`]).
    pub run_length: usize,
    /// Longest run reaches the subunit length.
    pub long_run: bool,
    /// `run_length` over the query length.
    pub length_coverage: f64,
}

impl HitMetrics {
    /// Identities as percentages with two decimals, `;`-joined.
    pub fn identities_display(&self) -> String {
        self.identity_ratios.iter().map(|r| format!("{:.2}", r * 100.0)).collect::<Vec<_>>().join(";")
    }

    /// Aligned lengths, `;`-joined.
    pub fn aligned_lengths_display(&self) -> String {
        self.aligned_lengths.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(";")
    }
}

/// Verdict, reasons and metrics for one hit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HitVerdict {
    pub verdict: Verdict,
    pub reasons: Vec<String>,
    pub metrics: HitMetrics,
}

/// Length of the longest run of match symbols in a match line.
pub fn longest_match_run(match_line: &str) -> usize {
    let mut best = 0;
    let mut current = 0;
    for b in match_line.bytes() {
        if b == MATCH_SYMBOL {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

/// Classify one hit against a query of `query_length` residues.
pub fn classify_hit(hit: &AlignmentHit, query_length: usize, thresholds: &Thresholds) -> HitVerdict {
    let mut metrics = HitMetrics {
        local_alignments: hit.alignments.len(),
        identity_ratios: hit.alignments.iter().map(|a| ratio(a.identity_count, a.aligned_length)).collect(),
        aligned_lengths: hit.alignments.iter().map(|a| a.aligned_length).collect(),
        ..HitMetrics::default()
    };

    let hsp = match hit.alignments.as_slice() {
        [] => return HitVerdict { verdict: Verdict::Acceptable, reasons: Vec::new(), metrics },
        [single] => single,
        _ => return HitVerdict { verdict: Verdict::MultipleLocalAlignments, reasons: Vec::new(), metrics },
    };

    let identity = metrics.identity_ratios[0];
    let longest = longest_match_run(&hsp.match_line);
    metrics.long_run = longest >= thresholds.subunit_length;
    metrics.run_length = if metrics.long_run || longest >= SHORT_RUN_MIN { longest } else { 0 };
    metrics.length_coverage = ratio(metrics.run_length, query_length);

    let percent = identity * 100.0;
    let (min, max) = thresholds.conflicting_identity_range;
    let (verdict, reasons) = if metrics.long_run
        && identity > thresholds.self_identity_floor
        && metrics.length_coverage >= 1.0
    {
        (Verdict::SelfAlignment, Vec::new())
    } else if metrics.long_run && percent > min && percent < max {
        (Verdict::ConflictingHit, vec![format!("Identity is {percent:.2}%")])
    } else if metrics.run_length > thresholds.subunit_length {
        (Verdict::ExceedsSubunitMatch, vec![format!("{} bp identical sequence", metrics.run_length)])
    } else {
        (Verdict::Acceptable, Vec::new())
    };

    HitVerdict { verdict, reasons, metrics }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::blast::LocalAlignment;

    /// A hit with one local alignment per `(identities, aligned_length, match_line)`.
    pub(crate) fn hit(id: &str, hsps: &[(usize, usize, String)]) -> AlignmentHit {
        AlignmentHit {
            subject_id: id.to_string(),
            subject_description: format!("{id} description"),
            subject_length: 10_000,
            alignments: hsps
                .iter()
                .map(|(ident, len, midline)| LocalAlignment {
                    query_start: 1,
                    subject_start: 1,
                    aligned_length: *len,
                    identity_count: *ident,
                    score: 100.0,
                    bit_score: 200.0,
                    e_value: 1e-50,
                    query_line: "A".repeat(midline.len()),
                    match_line: midline.clone(),
                    subject_line: "A".repeat(midline.len()),
                })
                .collect(),
        }
    }

    pub(crate) fn run(n: usize) -> String { "|".repeat(n) }

    fn t(min: f64, max: f64, subunit: usize) -> Thresholds {
        Thresholds { conflicting_identity_range: (min, max), subunit_length: subunit, ..Thresholds::default() }
    }

    #[test]
    fn longest_run_scans_whole_line() {
        assert_eq!(longest_match_run(""), 0);
        assert_eq!(longest_match_run("   "), 0);
        assert_eq!(longest_match_run("||| |||||||| ||||"), 8);
        assert_eq!(longest_match_run(&run(300)), 300);
    }

    #[test]
    fn multiple_local_alignments_win_regardless_of_identity() {
        let h = hit("x", &[(300, 300, run(300)), (300, 300, run(300))]);
        let v = classify_hit(&h, 300, &Thresholds::default());
        assert_eq!(v.verdict, Verdict::MultipleLocalAlignments);
        assert_eq!(v.metrics.local_alignments, 2);
        assert!(v.reasons.is_empty());
    }

    #[test]
    fn self_alignment_needs_full_coverage() {
        let v = classify_hit(&hit("x", &[(300, 300, run(300))]), 300, &Thresholds::default());
        assert_eq!(v.verdict, Verdict::SelfAlignment);
        assert_eq!(v.metrics.length_coverage, 1.0);

        // Run covers 300 of a 500 nt query: not a self hit, but longer than the subunit.
        let v = classify_hit(&hit("x", &[(300, 300, run(300))]), 500, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ExceedsSubunitMatch);
        assert_eq!(v.reasons, vec!["300 bp identical sequence".to_string()]);
    }

    #[test]
    fn conflicting_inside_window() {
        let midline = format!("{} {}", run(150), run(149));
        let v = classify_hit(&hit("x", &[(270, 300, midline)]), 500, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ConflictingHit);
        assert_eq!(v.reasons, vec!["Identity is 90.00%".to_string()]);
    }

    #[test]
    fn conflicting_bounds_are_strict() {
        let line = format!("{} {}", run(50), run(49));
        // Exactly the minimum (80%).
        let v = classify_hit(&hit("x", &[(80, 100, line.clone())]), 100, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ExceedsSubunitMatch);
        // Exactly the maximum (99%).
        let v = classify_hit(&hit("x", &[(99, 100, line)]), 100, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ExceedsSubunitMatch);
    }

    #[test]
    fn exceeds_subunit_at_low_identity() {
        let midline = format!("{}{}", run(25), " ".repeat(75));
        let v = classify_hit(&hit("x", &[(40, 100, midline)]), 100, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ExceedsSubunitMatch);
        assert_eq!(v.metrics.run_length, 25);
    }

    #[test]
    fn long_run_equal_to_subunit_falls_through_to_acceptable() {
        // Long run present, identity outside the window, not a self hit and not
        // longer than the subunit: nothing applies.
        let midline = format!("{}{}", run(20), " ".repeat(80));
        let v = classify_hit(&hit("x", &[(50, 100, midline)]), 100, &t(80.0, 99.0, 20));
        assert!(v.metrics.long_run);
        assert_eq!(v.metrics.run_length, 20);
        assert_eq!(v.verdict, Verdict::Acceptable);
    }

    #[test]
    fn short_runs_are_measured_but_acceptable() {
        let midline = format!("{} {}", run(12), run(4));
        let v = classify_hit(&hit("x", &[(16, 17, midline)]), 200, &Thresholds::default());
        assert_eq!(v.verdict, Verdict::Acceptable);
        assert!(!v.metrics.long_run);
        assert_eq!(v.metrics.run_length, 12);

        let v = classify_hit(&hit("x", &[(4, 9, "|||| ||||".to_string())]), 200, &Thresholds::default());
        assert_eq!(v.metrics.run_length, 0);
        assert_eq!(v.metrics.length_coverage, 0.0);
    }

    #[test]
    fn high_identity_partial_hit_is_not_self() {
        // 100% identical over a 60 nt stretch of a 200 nt query.
        let v = classify_hit(&hit("x", &[(60, 60, run(60))]), 200, &t(80.0, 99.0, 20));
        assert_eq!(v.verdict, Verdict::ExceedsSubunitMatch);
    }

    #[test]
    fn hit_without_alignments_is_acceptable() {
        let v = classify_hit(&hit("x", &[]), 100, &Thresholds::default());
        assert_eq!(v.verdict, Verdict::Acceptable);
    }

    #[test]
    fn identity_display_uses_percent() {
        let v = classify_hit(&hit("x", &[(270, 300, run(10)), (93, 100, run(5))]), 300, &Thresholds::default());
        assert_eq!(v.metrics.identities_display(), "90.00;93.00");
        assert_eq!(v.metrics.aligned_lengths_display(), "300;100");
    }
}
