//! Pair-level specificity from per-hit verdicts.
//!
//! One self hit is the intended target and is expected. A second self hit
//! means the target region is duplicated in the genome, which disqualifies the
//! pair just like a conflicting hit or an over-long identical stretch.
use core::fmt;

use serde::Serialize;

use crate::blast::{AlignmentHit, SearchResult};
use crate::classify::{classify_hit, HitVerdict, Thresholds, Verdict};
use crate::present::format_alignment;

/// Pair-level outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PairStatus {
    Suitable,
    Bad,
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PairStatus::Suitable => "Suitable",
            PairStatus::Bad => "Bad",
        })
    }
}

/// Identifying data of a hit as listed in reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HitSummary {
    pub accession: String,
    pub description: String,
    pub subject_length: usize,
}

impl From<&AlignmentHit> for HitSummary {
    fn from(hit: &AlignmentHit) -> Self {
        HitSummary {
            accession: hit.subject_id.clone(),
            description: hit.subject_description.clone(),
            subject_length: hit.subject_length,
        }
    }
}

/// A hit with its verdict and the rendered text of each local alignment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedHit {
    pub summary: HitSummary,
    pub verdict: HitVerdict,
    /// One rendered block per local alignment.
    pub alignments: Vec<String>,
}

/// Everything reported about one amplicon's search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PairSpecificity {
    pub status: PairStatus,
    /// Hits judged [`Verdict::SelfAlignment`].
    pub self_hits: usize,
    /// Hits judged [`Verdict::ConflictingHit`].
    pub conflicting: usize,
    /// Hits judged [`Verdict::ExceedsSubunitMatch`].
    pub matching: usize,
    /// Summaries of the counted hits, one bucket per counter, in encounter order.
    pub self_alignments: Vec<HitSummary>,
    pub conflicting_alignments: Vec<HitSummary>,
    pub matching_alignments: Vec<HitSummary>,
    /// All hits in the order the search reported them.
    pub hits: Vec<ClassifiedHit>,
}

/// Accumulates verdicts for the hits of one amplicon.
#[derive(Debug, Default)]
pub struct SpecificityAggregator {
    self_hits: usize,
    conflicting: usize,
    matching: usize,
    self_alignments: Vec<HitSummary>,
    conflicting_alignments: Vec<HitSummary>,
    matching_alignments: Vec<HitSummary>,
    hits: Vec<ClassifiedHit>,
}

impl SpecificityAggregator {
    /// An aggregator with no hits recorded.
    pub fn new() -> Self { Self::default() }

    /// Record the next hit in encounter order.
    pub fn push(&mut self, hit: &AlignmentHit, mut verdict: HitVerdict) {
        let summary = HitSummary::from(hit);
        match verdict.verdict {
            Verdict::SelfAlignment => {
                self.self_hits += 1;
                if self.self_hits > 1 {
                    verdict.reasons.push(format!("Multiple self hits ({})", self.self_hits));
                }
                self.self_alignments.push(summary.clone());
            }
            Verdict::ConflictingHit => {
                self.conflicting += 1;
                self.conflicting_alignments.push(summary.clone());
            }
            Verdict::ExceedsSubunitMatch => {
                self.matching += 1;
                self.matching_alignments.push(summary.clone());
            }
            Verdict::MultipleLocalAlignments | Verdict::Acceptable => {}
        }
        let alignments = hit.alignments.iter().map(format_alignment).collect();
        self.hits.push(ClassifiedHit { summary, verdict, alignments });
    }

    /// Bad on a repeated self hit, any conflicting hit or any over-long match.
    pub fn status(&self) -> PairStatus {
        if self.self_hits > 1 || self.conflicting > 0 || self.matching > 0 {
            PairStatus::Bad
        } else {
            PairStatus::Suitable
        }
    }

    /// Final counts, buckets and hits with the pair status.
    pub fn finish(self) -> PairSpecificity {
        PairSpecificity {
            status: self.status(),
            self_hits: self.self_hits,
            conflicting: self.conflicting,
            matching: self.matching,
            self_alignments: self.self_alignments,
            conflicting_alignments: self.conflicting_alignments,
            matching_alignments: self.matching_alignments,
            hits: self.hits,
        }
    }
}

/// Classify every hit of `result` and aggregate the pair verdict.
pub fn assess(result: &SearchResult, thresholds: &Thresholds) -> PairSpecificity {
    let mut agg = SpecificityAggregator::new();
    for hit in &result.hits {
        let verdict = classify_hit(hit, result.query_length, thresholds);
        agg.push(hit, verdict);
    }
    agg.finish()
}
