//! Text rendering of a single local alignment.
//!
//! ```text
//! Score: 301.00; bits: 556.07; e-value: 0.00
//!
//! Query:    1 ACGTACGT...
//!             ||||||||...
//! Sbjct: 1001 ACGTACGT...
//!
//! ```
use crate::blast::LocalAlignment;

/// Alignment columns per block.
pub const ALIGNMENT_WIDTH: usize = 75;

const MATCH_INDENT: &str = "            ";

fn columns(line: &str, from: usize) -> &str {
    let end = (from + ALIGNMENT_WIDTH).min(line.len());
    line.get(from.min(end)..end).unwrap_or("")
}

/// Render `hsp` as a metrics header followed by 75-column blocks.
pub fn format_alignment(hsp: &LocalAlignment) -> String {
    let mut lines = vec![
        format!("Score: {:.2}; bits: {:.2}; e-value: {:.2}", hsp.score, hsp.bit_score, hsp.e_value),
        String::new(),
    ];
    let width = hsp.query_line.len().max(hsp.aligned_length);
    let mut offset = 0;
    while offset < width {
        lines.push(format!("Query: {:>4} {}", hsp.query_start + offset, columns(&hsp.query_line, offset)));
        lines.push(format!("{MATCH_INDENT}{}", columns(&hsp.match_line, offset)));
        lines.push(format!("Sbjct: {:>4} {}", hsp.subject_start + offset, columns(&hsp.subject_line, offset)));
        lines.push(String::new());
        offset += ALIGNMENT_WIDTH;
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hsp(len: usize) -> LocalAlignment {
        LocalAlignment {
            query_start: 1,
            subject_start: 1001,
            aligned_length: len,
            identity_count: len,
            score: 150.0,
            bit_score: 278.456,
            e_value: 3.2e-74,
            query_line: "ACGTA".repeat(len / 5),
            match_line: "|".repeat(len),
            subject_line: "ACGTA".repeat(len / 5),
        }
    }

    #[test]
    fn header_has_two_decimal_metrics() {
        let text = format_alignment(&hsp(10));
        assert_eq!(text.lines().next().unwrap(), "Score: 150.00; bits: 278.46; e-value: 0.00");
    }

    #[test]
    fn one_hundred_fifty_columns_make_two_blocks() {
        let text = format_alignment(&hsp(150));
        let query_rows: Vec<&str> = text.lines().filter(|l| l.starts_with("Query:")).collect();
        let subject_rows: Vec<&str> = text.lines().filter(|l| l.starts_with("Sbjct:")).collect();
        assert_eq!(query_rows.len(), 2);
        assert_eq!(query_rows[0], format!("Query:    1 {}", &"ACGTA".repeat(30)[..75]));
        assert!(query_rows[1].starts_with("Query:   76 "));
        assert!(subject_rows[0].starts_with("Sbjct: 1001 "));
        assert!(subject_rows[1].starts_with("Sbjct: 1076 "));
        assert_eq!(query_rows[1].len(), "Query:   76 ".len() + 75);
    }

    #[test]
    fn match_row_is_column_aligned_with_sequence_rows() {
        let text = format_alignment(&hsp(20));
        let lines: Vec<&str> = text.lines().collect();
        let q = lines.iter().position(|l| l.starts_with("Query:")).unwrap();
        assert_eq!(lines[q].find('A'), lines[q + 1].find('|'));
    }

    #[test]
    fn partial_last_block() {
        let text = format_alignment(&hsp(80));
        let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("Query:")).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "Query:   76 ACGTA");
    }
}
