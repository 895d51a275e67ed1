//! Alignment search: hit model, BLAST XML parsing and the `blastn` client.
//!
//! Search output is requested as BLAST XML (`-outfmt 5`) and deserialized with
//! `quick-xml`. Only the fields the classifier and presenter consume are
//! mapped; everything else in the document is ignored.
//!
//! Every [`Blastn::search`] call works inside its own [`tempfile::TempDir`]
//! under the configured scratch root. The directory is removed when the call
//! returns, on success and on failure alike.
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScreenError};
use crate::seqio::write_query_fasta;
use crate::sequence::Sequence;

/// Symbol marking an identical column in a match line.
pub const MATCH_SYMBOL: u8 = b'|';

/// One local alignment (HSP) between the query and a subject.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalAlignment {
    /// 1-based.
    pub query_start: usize,
    /// 1-based.
    pub subject_start: usize,
    pub aligned_length: usize,
    pub identity_count: usize,
    pub score: f64,
    pub bit_score: f64,
    pub e_value: f64,
    pub query_line: String,
    pub match_line: String,
    pub subject_line: String,
}

/// A database subject matched by the query, with its local alignments in
/// reported order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlignmentHit {
    pub subject_id: String,
    pub subject_description: String,
    pub subject_length: usize,
    pub alignments: Vec<LocalAlignment>,
}

/// Parsed result of searching one amplicon.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
    pub query_length: usize,
    pub hits: Vec<AlignmentHit>,
}

/// Service that searches an amplicon against a reference database.
pub trait AlignmentSearch: Send + Sync {
    fn search(&self, amplicon: &Sequence) -> Result<SearchResult>;
}

#[derive(Debug, Deserialize)]
#[serde(rename = "BlastOutput")]
struct BlastOutputXml {
    #[serde(rename = "BlastOutput_query-len")]
    query_len: usize,
    #[serde(rename = "BlastOutput_iterations", default)]
    iterations: IterationsXml,
}

#[derive(Debug, Default, Deserialize)]
struct IterationsXml {
    #[serde(rename = "Iteration", default)]
    iterations: Vec<IterationXml>,
}

#[derive(Debug, Deserialize)]
struct IterationXml {
    #[serde(rename = "Iteration_hits", default)]
    hits: HitsXml,
}

#[derive(Debug, Default, Deserialize)]
struct HitsXml {
    #[serde(rename = "Hit", default)]
    hits: Vec<HitXml>,
}

#[derive(Debug, Deserialize)]
struct HitXml {
    #[serde(rename = "Hit_id")]
    id: String,
    #[serde(rename = "Hit_def", default)]
    def: String,
    #[serde(rename = "Hit_len")]
    len: usize,
    #[serde(rename = "Hit_hsps", default)]
    hsps: HspsXml,
}

#[derive(Debug, Default, Deserialize)]
struct HspsXml {
    #[serde(rename = "Hsp", default)]
    hsps: Vec<HspXml>,
}

#[derive(Debug, Deserialize)]
struct HspXml {
    #[serde(rename = "Hsp_bit-score")]
    bit_score: f64,
    #[serde(rename = "Hsp_score")]
    score: f64,
    #[serde(rename = "Hsp_evalue")]
    evalue: f64,
    #[serde(rename = "Hsp_query-from")]
    query_from: usize,
    #[serde(rename = "Hsp_hit-from")]
    hit_from: usize,
    #[serde(rename = "Hsp_identity")]
    identity: usize,
    #[serde(rename = "Hsp_align-len")]
    align_len: usize,
    #[serde(rename = "Hsp_qseq")]
    qseq: String,
    #[serde(rename = "Hsp_hseq")]
    hseq: String,
    #[serde(rename = "Hsp_midline", default)]
    midline: String,
}

/// Rebuild a nucleotide match line column by column.
fn rebuild_midline(query: &str, subject: &str) -> String {
    query
        .bytes()
        .zip(subject.bytes())
        .map(|(q, s)| if q != b'-' && q.eq_ignore_ascii_case(&s) { MATCH_SYMBOL as char } else { ' ' })
        .collect()
}

impl From<HspXml> for LocalAlignment {
    fn from(h: HspXml) -> Self {
        // Leading or trailing mismatch columns are blanks, which XML text
        // trimming drops; the line must stay column-aligned with the query.
        let match_line = if h.midline.len() == h.qseq.len() { h.midline } else { rebuild_midline(&h.qseq, &h.hseq) };
        LocalAlignment {
            query_start: h.query_from,
            subject_start: h.hit_from,
            aligned_length: h.align_len,
            identity_count: h.identity,
            score: h.score,
            bit_score: h.bit_score,
            e_value: h.evalue,
            query_line: h.qseq,
            match_line,
            subject_line: h.hseq,
        }
    }
}

/// Parse a single-query BLAST XML report.
pub fn parse_blast_xml(xml: &str) -> Result<SearchResult> {
    if !xml.contains("<BlastOutput") {
        return Err(ScreenError::SearchOutput("expected a BlastOutput XML document".into()));
    }
    let parsed: BlastOutputXml = quick_xml::de::from_str(xml)?;
    let hits = parsed
        .iterations
        .iterations
        .into_iter()
        .next()
        .map(|it| it.hits.hits)
        .unwrap_or_default()
        .into_iter()
        .map(|h| AlignmentHit {
            subject_id: h.id,
            subject_description: h.def,
            subject_length: h.len,
            alignments: h.hsps.hsps.into_iter().map(LocalAlignment::from).collect(),
        })
        .collect();
    Ok(SearchResult { query_length: parsed.query_len, hits })
}

pub fn parse_blast_xml_file<P: AsRef<Path>>(path: P) -> Result<SearchResult> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_blast_xml(&text)
}

/// `blastn` against one nucleotide database.
#[derive(Clone, Debug)]
pub struct Blastn {
    binary_path: PathBuf,
    database: PathBuf,
    task: String,
    scratch_root: PathBuf,
}

impl Blastn {
    pub fn new(binary_path: impl Into<PathBuf>, database: impl Into<PathBuf>, task: impl Into<String>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            database: database.into(),
            task: task.into(),
            scratch_root: scratch_root.into(),
        }
    }
}

impl AlignmentSearch for Blastn {
    fn search(&self, amplicon: &Sequence) -> Result<SearchResult> {
        let workdir = tempfile::Builder::new().prefix("blast").tempdir_in(&self.scratch_root)?;
        let query = workdir.path().join("query");
        let out = workdir.path().join("output.xml");
        write_query_fasta(amplicon, &query)?;

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-query").arg(&query)
            .arg("-out").arg(&out)
            .arg("-outfmt").arg("5")
            .arg("-db").arg(&self.database)
            .arg("-task").arg(&self.task);
        debug!(id = %amplicon.id, workdir = %workdir.path().display(), "running blastn");

        let output = cmd
            .output()
            .map_err(|e| ScreenError::SearchService(format!("cannot start {}: {}", self.binary_path.display(), e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScreenError::SearchService(stderr.trim().to_string()));
        }
        if !out.exists() {
            return Err(ScreenError::SearchService(format!(
                "blastn exited successfully but wrote no report for {}",
                amplicon.id
            )));
        }
        parse_blast_xml_file(&out)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TWO_HITS_XML: &str = r#"<?xml version="1.0"?>
<!DOCTYPE BlastOutput PUBLIC "-//NCBI//NCBI BlastOutput/EN" "http://www.ncbi.nlm.nih.gov/dtd/NCBI_BlastOutput.dtd">
<BlastOutput>
  <BlastOutput_program>blastn</BlastOutput_program>
  <BlastOutput_version>BLASTN 2.12.0+</BlastOutput_version>
  <BlastOutput_db>TbruceiTREU927</BlastOutput_db>
  <BlastOutput_query-ID>Query_1</BlastOutput_query-ID>
  <BlastOutput_query-def>q1:11-30</BlastOutput_query-def>
  <BlastOutput_query-len>20</BlastOutput_query-len>
  <BlastOutput_param>
    <Parameters>
      <Parameters_expect>10</Parameters_expect>
    </Parameters>
  </BlastOutput_param>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_query-ID>Query_1</Iteration_query-ID>
      <Iteration_query-len>20</Iteration_query-len>
      <Iteration_hits>
        <Hit>
          <Hit_num>1</Hit_num>
          <Hit_id>Tb927.10.100</Hit_id>
          <Hit_def>hypothetical protein</Hit_def>
          <Hit_accession>Tb927.10.100</Hit_accession>
          <Hit_len>1500</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>37.3537</Hsp_bit-score>
              <Hsp_score>20</Hsp_score>
              <Hsp_evalue>1.2e-05</Hsp_evalue>
              <Hsp_query-from>1</Hsp_query-from>
              <Hsp_query-to>20</Hsp_query-to>
              <Hsp_hit-from>101</Hsp_hit-from>
              <Hsp_hit-to>120</Hsp_hit-to>
              <Hsp_identity>20</Hsp_identity>
              <Hsp_align-len>20</Hsp_align-len>
              <Hsp_qseq>ACGTACGTACGTACGTACGT</Hsp_qseq>
              <Hsp_hseq>ACGTACGTACGTACGTACGT</Hsp_hseq>
              <Hsp_midline>||||||||||||||||||||</Hsp_midline>
            </Hsp>
          </Hit_hsps>
        </Hit>
        <Hit>
          <Hit_num>2</Hit_num>
          <Hit_id>Tb927.3.200</Hit_id>
          <Hit_def>repeat family</Hit_def>
          <Hit_len>800</Hit_len>
          <Hit_hsps>
            <Hsp>
              <Hsp_num>1</Hsp_num>
              <Hsp_bit-score>20.1</Hsp_bit-score>
              <Hsp_score>10</Hsp_score>
              <Hsp_evalue>0.5</Hsp_evalue>
              <Hsp_query-from>2</Hsp_query-from>
              <Hsp_query-to>11</Hsp_query-to>
              <Hsp_hit-from>40</Hsp_hit-from>
              <Hsp_hit-to>49</Hsp_hit-to>
              <Hsp_identity>9</Hsp_identity>
              <Hsp_align-len>10</Hsp_align-len>
              <Hsp_qseq>CGTACGTACG</Hsp_qseq>
              <Hsp_hseq>AGTACGTACG</Hsp_hseq>
              <Hsp_midline> |||||||||</Hsp_midline>
            </Hsp>
            <Hsp>
              <Hsp_num>2</Hsp_num>
              <Hsp_bit-score>18.0</Hsp_bit-score>
              <Hsp_score>9</Hsp_score>
              <Hsp_evalue>1.9</Hsp_evalue>
              <Hsp_query-from>11</Hsp_query-from>
              <Hsp_query-to>19</Hsp_query-to>
              <Hsp_hit-from>300</Hsp_hit-from>
              <Hsp_hit-to>308</Hsp_hit-to>
              <Hsp_identity>9</Hsp_identity>
              <Hsp_align-len>9</Hsp_align-len>
              <Hsp_qseq>CGTACGTAC</Hsp_qseq>
              <Hsp_hseq>CGTACGTAC</Hsp_hseq>
              <Hsp_midline>|||||||||</Hsp_midline>
            </Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
      <Iteration_stat>
        <Statistics>
          <Statistics_db-num>11000</Statistics_db-num>
        </Statistics>
      </Iteration_stat>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>
"#;

    #[test]
    fn parses_hits_and_hsps_in_order() {
        let r = parse_blast_xml(TWO_HITS_XML).unwrap();
        assert_eq!(r.query_length, 20);
        assert_eq!(r.hits.len(), 2);
        assert_eq!(r.hits[0].subject_id, "Tb927.10.100");
        assert_eq!(r.hits[0].subject_description, "hypothetical protein");
        assert_eq!(r.hits[0].subject_length, 1500);
        let hsp = &r.hits[0].alignments[0];
        assert_eq!((hsp.query_start, hsp.subject_start), (1, 101));
        assert_eq!((hsp.identity_count, hsp.aligned_length), (20, 20));
        assert_eq!(hsp.e_value, 1.2e-05);
        assert_eq!(r.hits[1].alignments.len(), 2);
        assert_eq!(r.hits[1].alignments[1].subject_start, 300);
    }

    #[test]
    fn match_line_stays_column_aligned() {
        let r = parse_blast_xml(TWO_HITS_XML).unwrap();
        let hsp = &r.hits[1].alignments[0];
        assert_eq!(hsp.match_line.len(), hsp.query_line.len());
        assert_eq!(hsp.match_line, " |||||||||");
    }

    #[test]
    fn no_hits_report() {
        let xml = r#"<?xml version="1.0"?>
<BlastOutput>
  <BlastOutput_query-len>150</BlastOutput_query-len>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_iter-num>1</Iteration_iter-num>
      <Iteration_hits>
      </Iteration_hits>
      <Iteration_message>No hits found</Iteration_message>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>"#;
        let r = parse_blast_xml(xml).unwrap();
        assert_eq!(r.query_length, 150);
        assert!(r.hits.is_empty());
    }

    #[test]
    fn garbage_is_search_output_error() {
        assert!(matches!(parse_blast_xml("BLAST query/options error"), Err(ScreenError::SearchOutput(_))));
        assert!(matches!(parse_blast_xml("<BlastOutput><oops>"), Err(ScreenError::SearchOutput(_))));
    }

    #[test]
    fn rebuilt_midline_marks_identities_only() {
        assert_eq!(rebuild_midline("AC-GT", "ACTGA"), "|| | ");
        assert_eq!(rebuild_midline("acgt", "ACGA"), "||| ");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn failure_reports_stderr_and_removes_workdir() {
            let bin = tempfile::tempdir().unwrap();
            let scratch = tempfile::tempdir().unwrap();
            let exe = script(bin.path(), "blastn", "echo 'BLAST Database error: No alias or index file found' >&2\nexit 2");
            let blast = Blastn::new(exe, "/nowhere/db", "blastn", scratch.path());
            let amp = Sequence::new("amp", b"ACGTACGTAC".to_vec()).unwrap();

            let err = blast.search(&amp).unwrap_err();
            assert!(matches!(err, ScreenError::SearchService(ref m) if m.contains("No alias or index file found")));
            assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        }

        #[test]
        fn success_parses_report_and_removes_workdir() {
            let bin = tempfile::tempdir().unwrap();
            let scratch = tempfile::tempdir().unwrap();
            let fixture = bin.path().join("fixture.xml");
            std::fs::write(&fixture, TWO_HITS_XML).unwrap();
            let body = format!(
                "while [ $# -gt 0 ]; do if [ \"$1\" = \"-out\" ]; then out=\"$2\"; fi; shift; done\ncp '{}' \"$out\"",
                fixture.display()
            );
            let exe = script(bin.path(), "blastn", &body);
            let blast = Blastn::new(exe, "/nowhere/db", "blastn", scratch.path());
            let amp = Sequence::new("amp", b"ACGTACGTAC".to_vec()).unwrap();

            let r = blast.search(&amp).unwrap();
            assert_eq!(r.hits.len(), 2);
            assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
        }
    }
}
