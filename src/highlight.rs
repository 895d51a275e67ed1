//! Marks the amplified product within the wrapped query sequence.
//!
//! The query is wrapped at 60 columns. Each [`HighlightedLine`] records which
//! part of it (if any) lies inside the amplicon, covering the cases where the
//! product starts inside a line, spans a whole line, ends inside a line, or
//! starts and ends on the same line.
use std::ops::Range;

use serde::Serialize;

use crate::sequence::Sequence;

/// Residues per display line.
pub const LINE_WIDTH: usize = 60;

/// One wrapped line of the query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HighlightedLine {
    /// 0-based offset of the first residue on the line.
    pub start: usize,
    /// Cumulative residue count at the end of the line.
    pub end: usize,
    pub text: String,
    /// Part of the line inside the product, relative to the line start.
    pub product: Option<Range<usize>>,
}

impl HighlightedLine {
    pub fn left_flank(&self) -> &str {
        match &self.product {
            Some(r) => &self.text[..r.start],
            None => &self.text,
        }
    }

    pub fn product_text(&self) -> &str {
        match &self.product {
            Some(r) => &self.text[r.clone()],
            None => "",
        }
    }

    pub fn right_flank(&self) -> &str {
        match &self.product {
            Some(r) => &self.text[r.end..],
            None => "",
        }
    }

    /// Line text padded to 64 columns, then the cumulative count. `paint`
    /// styles the product part.
    pub fn render<F: Fn(&str) -> String>(&self, paint: F) -> String {
        let padding = " ".repeat(LINE_WIDTH - self.text.len() + 4);
        let body = match self.product {
            Some(_) => format!("{}{}{}", self.left_flank(), paint(self.product_text()), self.right_flank()),
            None => self.text.clone(),
        };
        format!("{body}{padding}{}", self.end)
    }
}

/// Wrap `seq` and mark the product `bounds` (0-based, half-open).
pub fn highlight_product(seq: &Sequence, bounds: Range<usize>) -> Vec<HighlightedLine> {
    seq.as_str()
        .as_bytes()
        .chunks(LINE_WIDTH)
        .enumerate()
        .map(|(i, chunk)| {
            let start = i * LINE_WIDTH;
            let end = start + chunk.len();
            let from = bounds.start.max(start);
            let to = bounds.end.min(end);
            let product = (from < to).then(|| (from - start)..(to - start));
            HighlightedLine { start, end, text: String::from_utf8_lossy(chunk).into_owned(), product }
        })
        .collect()
}

/// Plain-text rendering with the product upper-case and flanks lower-case.
pub fn render_plain(lines: &[HighlightedLine]) -> String {
    lines
        .iter()
        .map(|l| {
            let lowered = HighlightedLine { text: l.text.to_ascii_lowercase(), ..l.clone() };
            lowered.render(|p| p.to_ascii_uppercase())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
