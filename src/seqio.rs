//! FASTA input and query-file output.
//!
//! ### Design
//! - **Input** parsed with `needletail`; exactly one record is accepted per
//!   request (a file, stdin, or pasted text).
//! - **Output** written with `bio::io::fasta` so the search service receives a
//!   plain single-record query file.
//!
//! ### Errors
//! Parse problems surface as [`ScreenError::Sequence`]; write failures as
//! [`ScreenError::Io`].

use std::io::Read;
use std::path::Path;

use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};

use crate::error::{Result, ScreenError};
use crate::sequence::Sequence;

/// Read the single FASTA record in `path`.
pub fn read_single_fasta<P: AsRef<Path>>(path: P) -> Result<Sequence> {
    let p = path.as_ref();
    let reader = parse_fastx_file(p)
        .map_err(|e| ScreenError::Sequence(format!("{}: {}", p.display(), e)))?;
    single_record(reader)
}

/// Read the single FASTA record from any reader (stdin, an upload body...).
pub fn read_single_fasta_from<R: Read + Send>(input: R) -> Result<Sequence> {
    let reader = parse_fastx_reader(input)
        .map_err(|_| ScreenError::Sequence("the entered sequence does not appear to be valid fasta format".into()))?;
    single_record(reader)
}

/// Parse pasted FASTA text.
///
/// # Examples
/// ```
/// let s = ampliscreen::seqio::parse_fasta_text(">q1 test\nACGT\nACGT\n").unwrap();
/// assert_eq!(s.id, "q1");
/// assert_eq!(s.as_str(), "ACGTACGT");
/// ```
pub fn parse_fasta_text(text: &str) -> Result<Sequence> {
    read_single_fasta_from(std::io::Cursor::new(text.as_bytes().to_vec()))
}

fn single_record(mut reader: Box<dyn FastxReader + '_>) -> Result<Sequence> {
    let seq = match reader.next() {
        Some(record) => {
            let rec = record.map_err(|e| ScreenError::Sequence(e.to_string()))?;
            let header = String::from_utf8_lossy(rec.id()).to_string();
            let (id, description) = split_header(&header);
            Sequence::new(id, rec.seq().to_vec())?.with_description(description)
        }
        None => return Err(ScreenError::Sequence("no FASTA record found".into())),
    };
    if reader.next().is_some() {
        return Err(ScreenError::Sequence("more than one FASTA record supplied; submit a single sequence".into()));
    }
    Ok(seq)
}

fn split_header(header: &str) -> (String, Option<String>) {
    let header = header.trim();
    match header.split_once(char::is_whitespace) {
        Some((id, rest)) => (id.to_string(), Some(rest.trim().to_string())),
        None => (header.to_string(), None),
    }
}

/// Write `seq` as a one-record FASTA file at `path`.
pub fn write_query_fasta<P: AsRef<Path>>(seq: &Sequence, path: P) -> Result<()> {
    let mut writer = bio::io::fasta::Writer::to_file(path)?;
    writer.write(&seq.id, seq.description.as_deref(), seq.as_bytes())?;
    writer.flush()?;
    Ok(())
}
