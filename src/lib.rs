#![forbid(unsafe_code)]
//! # ampliscreen
//!
//! PCR primer design with **specificity screening** for RNAi target selection.
//!
//! For a single template sequence, candidate primer pairs are proposed by a
//! design service (`primer3_core`). The region each pair would amplify is then
//! searched against a genome database (`blastn`), and every hit is classified
//! to decide whether the pair could amplify, or trigger silencing of, anything
//! besides the intended target.
//!
//! ## Pipeline
//! - [`primer`]: typed [`primer::PrimerPair`]s from the flat design-service answer.
//! - [`amplicon`]: the amplified subsequence of a pair.
//! - [`classify`]: one verdict per hit (self, conflicting, over-long identical
//!   stretch, repetitive, acceptable).
//! - [`specificity`]: a pair is **Bad** on more than one self hit, any
//!   conflicting hit or any over-long match.
//! - [`present`] and [`highlight`]: text blocks for alignments and the product.
//! - [`pipeline`]: orchestration over a bounded rayon pool.
//!
//! The external services sit behind the [`primer::PrimerDesigner`] and
//! [`blast::AlignmentSearch`] traits; [`primer3::Primer3`] and
//! [`blast::Blastn`] drive the real tools.
//!
//! ## Examples
//! ```rust
//! use ampliscreen::blast::parse_blast_xml;
//! use ampliscreen::classify::Thresholds;
//! use ampliscreen::specificity::{assess, PairStatus};
//!
//! let xml = r#"<?xml version="1.0"?>
//! <BlastOutput>
//!   <BlastOutput_query-len>8</BlastOutput_query-len>
//!   <BlastOutput_iterations><Iteration><Iteration_hits>
//!     <Hit>
//!       <Hit_id>chr1</Hit_id><Hit_def>chromosome 1</Hit_def><Hit_len>1000</Hit_len>
//!       <Hit_hsps><Hsp>
//!         <Hsp_bit-score>16.4</Hsp_bit-score><Hsp_score>8</Hsp_score><Hsp_evalue>0.5</Hsp_evalue>
//!         <Hsp_query-from>1</Hsp_query-from><Hsp_hit-from>101</Hsp_hit-from>
//!         <Hsp_identity>8</Hsp_identity><Hsp_align-len>8</Hsp_align-len>
//!         <Hsp_qseq>ACGTACGT</Hsp_qseq><Hsp_hseq>ACGTACGT</Hsp_hseq><Hsp_midline>||||||||</Hsp_midline>
//!       </Hsp></Hit_hsps>
//!     </Hit>
//!   </Iteration_hits></Iteration></BlastOutput_iterations>
//! </BlastOutput>"#;
//! let result = parse_blast_xml(xml).unwrap();
//! let pair = assess(&result, &Thresholds::default());
//! assert_eq!(pair.status, PairStatus::Suitable);
//! ```

pub mod error;
pub mod sequence;
pub mod seqio;
pub mod config;
pub mod primer;
pub mod primer3;
pub mod amplicon;
pub mod blast;
pub mod classify;
pub mod specificity;
pub mod present;
pub mod highlight;
pub mod pipeline;
pub mod report;

pub use error::{Result, ScreenError};
pub use sequence::Sequence;
pub use pipeline::{PairReport, ScreenOutcome, Screener};

use blast::Blastn;
use config::{ScreenParams, Settings};
use primer3::Primer3;

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Design and screen primers for `template` with the installed tools.
///
/// Parameters are validated before any service is called.
pub fn screen_sequence(template: &Sequence, params: &ScreenParams, settings: &Settings) -> Result<ScreenOutcome> {
    params.validate(settings)?;
    let designer = Primer3::new(&settings.tools.primer3);
    let search = Blastn::new(
        &settings.tools.blastn,
        settings.database_path(&params.database)?,
        &settings.tools.blast_task,
        &settings.paths.tmp_dir,
    );
    Screener::new(&designer, &search, params.thresholds())
        .with_threads(settings.threads)
        .run(template, &params.design_params())
}

#[cfg(test)]
mod version_tests {
    #[test]
    fn version_matches_manifest() {
        assert_eq!(super::VERSION, env!("CARGO_PKG_VERSION"));
        assert!(!super::VERSION.is_empty());
    }
}
