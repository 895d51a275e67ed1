//! Amplicon extraction.
//!
//! The design service and the search service both use 0-based coordinates
//! here, so the product is `template[left_start..=right_start]`.
use crate::primer::PrimerPair;
use crate::sequence::Sequence;

/// The subsequence amplified by `pair`.
///
/// Panics if the pair's coordinates do not fit `template`; pairs are only
/// ever built against the template they are extracted from.
pub fn extract_amplicon(template: &Sequence, pair: &PrimerPair) -> Sequence {
    extract_region(template, pair.left_start, pair.right_start)
}

/// Extract `[left_start, right_start + 1)`, named `id:from-to` (1-based).
pub fn extract_region(template: &Sequence, left_start: usize, right_start: usize) -> Sequence {
    let id = format!("{}:{}-{}", template.id, left_start + 1, right_start + 1);
    template.subsequence(id, left_start..right_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primer::tests::{template, TWO_PAIRS};
    use crate::primer::{pairs_from_response, DesignResponse};

    #[test]
    fn length_matches_coordinates() {
        let t = template();
        let pairs = pairs_from_response(&DesignResponse::parse_boulder(TWO_PAIRS).unwrap(), &t).unwrap();
        for p in &pairs {
            let amp = extract_amplicon(&t, p);
            assert_eq!(amp.len(), p.right_start + 1 - p.left_start);
            assert_eq!(amp.as_bytes(), &t.as_bytes()[p.product_range()]);
        }
    }

    #[test]
    fn includes_both_end_bases() {
        let t = Sequence::new("t", b"AAAACGTCCCC".to_vec()).unwrap();
        let amp = extract_region(&t, 3, 7);
        assert_eq!(amp.as_str(), "ACGTC");
        assert_eq!(amp.id, "t:4-8");
    }

    #[test]
    #[should_panic]
    fn out_of_range_is_a_contract_violation() {
        let t = Sequence::new("t", b"ACGT".to_vec()).unwrap();
        extract_region(&t, 1, 10);
    }
}
