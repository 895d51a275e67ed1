//! Tabular and machine-readable output of screening results.
use std::io::Write;

use polars::prelude::*;
use serde::Serialize;

use crate::config::ScreenParams;
use crate::error::Result;
use crate::pipeline::{PairReport, ScreenOutcome};
use crate::primer::PrimerPair;
use crate::sequence::Sequence;

/// Summary of the request a report answers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryInfo {
    pub query_id: String,
    pub query_length: usize,
    pub melting_temp: i64,
    pub product_min: i64,
    pub product_max: i64,
    pub database: String,
    pub string_min: i64,
    pub string_max: i64,
    /// Identity window as displayed, e.g. `80 - 99`.
    pub stringency: String,
    pub subunit_length: i64,
}

impl QueryInfo {
    pub fn new(template: &Sequence, params: &ScreenParams) -> Self {
        Self {
            query_id: template.id.clone(),
            query_length: template.len(),
            melting_temp: params.melting_temp,
            product_min: params.product_min,
            product_max: params.product_max,
            database: params.database.clone(),
            string_min: params.string_min,
            string_max: params.string_max,
            stringency: format!("{} - {}", params.string_min, params.string_max),
            subunit_length: params.subunit_length,
        }
    }

    /// Product size range as displayed, e.g. `100-500`.
    pub fn product_size(&self) -> String { format!("{}-{}", self.product_min, self.product_max) }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    query: &'a QueryInfo,
    outcome: &'a ScreenOutcome,
}

/// Designed primers without screening, one row per pair.
pub fn primers_dataframe(pairs: &[PrimerPair]) -> PolarsResult<DataFrame> {
    let pair_v: Vec<u64> = (1..=pairs.len() as u64).collect();
    let left_v: Vec<String> = pairs.iter().map(|p| p.left_seq.clone()).collect();
    let left_pos_v: Vec<u64> = pairs.iter().map(|p| p.left_start as u64 + 1).collect();
    let right_v: Vec<String> = pairs.iter().map(|p| p.right_seq.clone()).collect();
    let right_pos_v: Vec<u64> = pairs.iter().map(|p| p.right_start as u64 + 1).collect();
    let left_tm_v: Vec<f64> = pairs.iter().map(|p| p.left_melt_temp).collect();
    let right_tm_v: Vec<f64> = pairs.iter().map(|p| p.right_melt_temp).collect();
    let left_gc_v: Vec<f64> = pairs.iter().map(|p| p.left_gc).collect();
    let right_gc_v: Vec<f64> = pairs.iter().map(|p| p.right_gc).collect();
    let size_v: Vec<u64> = pairs.iter().map(|p| p.product_size as u64).collect();
    let compl_v: Vec<f64> = pairs.iter().map(|p| p.compl_end).collect();

    df!(
        "pair"       => pair_v,
        "left"       => left_v,
        "left_pos"   => left_pos_v,
        "right"      => right_v,
        "right_pos"  => right_pos_v,
        "left_tm"    => left_tm_v,
        "right_tm"   => right_tm_v,
        "left_gc"    => left_gc_v,
        "right_gc"   => right_gc_v,
        "product"    => size_v,
        "compl_end"  => compl_v,
    )
}

/// One row per primer pair, in design order.
pub fn pairs_dataframe(reports: &[PairReport]) -> PolarsResult<DataFrame> {
    let pair_v: Vec<u64> = reports.iter().map(|r| r.index as u64 + 1).collect();
    let left_v: Vec<String> = reports.iter().map(|r| r.pair.left_seq.clone()).collect();
    let right_v: Vec<String> = reports.iter().map(|r| r.pair.right_seq.clone()).collect();
    let tm_v: Vec<String> = reports
        .iter()
        .map(|r| {
            let (l, rt) = r.pair.melt_temps_display();
            format!("{l}/{rt}")
        })
        .collect();
    let size_v: Vec<u64> = reports.iter().map(|r| r.pair.product_size as u64).collect();
    let self_v: Vec<u64> = reports.iter().map(|r| r.specificity.self_hits as u64).collect();
    let conf_v: Vec<u64> = reports.iter().map(|r| r.specificity.conflicting as u64).collect();
    let match_v: Vec<u64> = reports.iter().map(|r| r.specificity.matching as u64).collect();
    let status_v: Vec<String> = reports.iter().map(|r| r.specificity.status.to_string()).collect();

    df!(
        "pair"        => pair_v,
        "left"        => left_v,
        "right"       => right_v,
        "tm"          => tm_v,
        "product"     => size_v,
        "self"        => self_v,
        "conflicting" => conf_v,
        "matching"    => match_v,
        "status"      => status_v,
    )
}

#[derive(Debug, Serialize)]
struct HitRow<'a> {
    pair: usize,
    status: String,
    accession: &'a str,
    description: &'a str,
    subject_length: usize,
    verdict: &'static str,
    reasons: String,
    hsps: usize,
    identities: String,
    lengths: String,
}

/// Write one CSV row per hit of every pair.
pub fn write_hits_csv<W: Write>(outcome: &ScreenOutcome, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for report in outcome.reports() {
        for hit in &report.specificity.hits {
            let row = HitRow {
                pair: report.index + 1,
                status: report.specificity.status.to_string(),
                accession: &hit.summary.accession,
                description: &hit.summary.description,
                subject_length: hit.summary.subject_length,
                verdict: hit.verdict.verdict.as_str(),
                reasons: hit.verdict.reasons.join("; "),
                hsps: hit.verdict.metrics.local_alignments,
                identities: hit.verdict.metrics.identities_display(),
                lengths: hit.verdict.metrics.aligned_lengths_display(),
            };
            wtr.serialize(row)?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Pretty-printed JSON document: the request summary and the whole outcome.
pub fn write_json<W: Write>(query: &QueryInfo, outcome: &ScreenOutcome, mut writer: W) -> Result<()> {
    let doc = JsonReport { query, outcome };
    serde_json::to_writer_pretty(&mut writer, &doc).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    Ok(())
}
