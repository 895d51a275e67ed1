//! Request orchestration: design pairs, then screen each pair.
//!
//! Pairs are screened on a local rayon pool. Each pair is extracted,
//! searched and classified by a single worker so hit order is kept, and
//! results are collected in pair order. The first search failure aborts the
//! request; partial results are never returned.
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::amplicon::extract_amplicon;
use crate::blast::AlignmentSearch;
use crate::classify::Thresholds;
use crate::config::worker_threads;
use crate::error::{Result, ScreenError};
use crate::highlight::{highlight_product, HighlightedLine};
use crate::primer::{design_primer_pairs, DesignParams, PrimerDesigner, PrimerPair};
use crate::sequence::Sequence;
use crate::specificity::{assess, PairSpecificity, PairStatus};

/// Everything reported for one candidate pair.
#[derive(Clone, Debug, Serialize)]
pub struct PairReport {
    /// Index of the pair as ranked by the design service.
    pub index: usize,
    pub pair: PrimerPair,
    /// Length of the searched amplicon as reported by the search.
    pub query_length: usize,
    pub product: Vec<HighlightedLine>,
    pub specificity: PairSpecificity,
}

/// Result of a request that did not fail.
#[derive(Clone, Debug, Serialize)]
pub enum ScreenOutcome {
    /// The design service returned zero pairs.
    NoPrimers,
    Screened(Vec<PairReport>),
}

impl ScreenOutcome {
    /// Pair reports in design order; empty for [`ScreenOutcome::NoPrimers`].
    pub fn reports(&self) -> &[PairReport] {
        match self {
            ScreenOutcome::NoPrimers => &[],
            ScreenOutcome::Screened(r) => r,
        }
    }
}

/// Message shown when the design service found nothing.
pub const NO_PRIMERS_MESSAGE: &str = "No suitable primers found";

/// A local pool of `threads` workers.
fn worker_pool(threads: usize) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("ampliscreen-{i}"))
        .build()
        .map_err(|e| ScreenError::WorkerPool(e.to_string()))
}

/// Wires the design and search services together for one request.
pub struct Screener<'a> {
    designer: &'a dyn PrimerDesigner,
    search: &'a dyn AlignmentSearch,
    thresholds: Thresholds,
    threads: usize,
}

impl<'a> Screener<'a> {
    pub fn new(designer: &'a dyn PrimerDesigner, search: &'a dyn AlignmentSearch, thresholds: Thresholds) -> Self {
        Self { designer, search, thresholds, threads: 1 }
    }

    /// Worker threads for per-pair screening (0 = all cores).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Search and classify one pair.
    pub fn screen_pair(&self, template: &Sequence, index: usize, pair: &PrimerPair) -> Result<PairReport> {
        let amplicon = extract_amplicon(template, pair);
        debug!(pair = index, amplicon = %amplicon.id, len = amplicon.len(), "searching amplicon");
        let result = self.search.search(&amplicon)?;
        let specificity = assess(&result, &self.thresholds);
        debug!(pair = index, hits = result.hits.len(), status = %specificity.status, "classified amplicon");
        if specificity.status == PairStatus::Bad {
            warn!(
                pair = index,
                self_hits = specificity.self_hits,
                conflicting = specificity.conflicting,
                matching = specificity.matching,
                "primer pair rejected"
            );
        }
        Ok(PairReport {
            index,
            pair: pair.clone(),
            query_length: result.query_length,
            product: highlight_product(template, pair.product_range()),
            specificity,
        })
    }

    /// Screen already designed pairs, preserving their order.
    pub fn screen_pairs(&self, template: &Sequence, pairs: &[PrimerPair]) -> Result<Vec<PairReport>> {
        let n = worker_threads(self.threads);
        if n == 1 {
            return pairs.iter().enumerate().map(|(i, p)| self.screen_pair(template, i, p)).collect();
        }
        worker_pool(n)?.install(|| {
            pairs
                .par_iter()
                .enumerate()
                .map(|(i, p)| self.screen_pair(template, i, p))
                .collect()
        })
    }

    /// Design primer pairs for `template` and screen every one.
    pub fn run(&self, template: &Sequence, params: &DesignParams) -> Result<ScreenOutcome> {
        info!(id = %template.id, len = template.len(), opt_tm = params.optimal_melting_temp, "designing primers");
        let pairs = design_primer_pairs(self.designer, template, params)?;
        if pairs.is_empty() {
            info!(id = %template.id, "{NO_PRIMERS_MESSAGE}");
            return Ok(ScreenOutcome::NoPrimers);
        }
        info!(pairs = pairs.len(), threads = self.threads, "screening primer pairs");
        let reports = self.screen_pairs(template, &pairs)?;
        let suitable = reports.iter().filter(|r| r.specificity.status == PairStatus::Suitable).count();
        info!(pairs = reports.len(), suitable, "screening complete");
        Ok(ScreenOutcome::Screened(reports))
    }
}
