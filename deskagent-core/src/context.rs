//! Grounded-context assembly.
//!
//! Converts ranked results into the evidence payload 1:1, preserving rank
//! order. This is the single evidence boundary: generation prompts are
//! built only from the payload produced here, never from raw chunks or
//! anything that bypassed reranking.

use crate::types::{ContextPayload, EvidenceItem, RankedResult};

/// Build the evidence payload from ranked results.
///
/// Defensive by construction: every field is copied from the ranked
/// result, and `Candidate`'s serde defaults already turn missing text into
/// an empty string and missing page/table/image fields into empty
/// sequences, so assembly cannot fail.
pub fn build_context(ranked: &[RankedResult]) -> ContextPayload {
    ContextPayload {
        items: ranked
            .iter()
            .map(|r| EvidenceItem {
                section: r.candidate.section.clone(),
                pages: r.candidate.pages.clone(),
                text: r.candidate.text.clone(),
                tables: r.candidate.tables.clone(),
                images: r.candidate.images.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candidate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_preserves_rank_order_one_to_one() {
        let ranked = vec![
            RankedResult {
                candidate: Candidate {
                    chunk_id: "c1".into(),
                    section: "A".into(),
                    pages: vec![14],
                    tables: vec!["t1".into()],
                    images: vec![],
                    text: "Revenue was $1.2B".into(),
                    similarity: 0.9,
                },
                rerank_score: 0.8,
            },
            RankedResult {
                candidate: Candidate {
                    chunk_id: "c2".into(),
                    section: "B".into(),
                    pages: vec![20],
                    tables: vec![],
                    images: vec!["img1".into()],
                    text: "Second".into(),
                    similarity: 0.7,
                },
                rerank_score: 0.4,
            },
        ];
        let payload = build_context(&ranked);
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[0].section, "A");
        assert_eq!(payload.items[0].pages, vec![14]);
        assert_eq!(payload.items[0].tables, vec!["t1".to_string()]);
        assert_eq!(payload.items[1].text, "Second");
        assert_eq!(payload.top().unwrap().section, "A");
    }

    #[test]
    fn test_missing_fields_become_empty_not_failure() {
        // A candidate deserialized from metadata with everything absent but
        // the id and score.
        let candidate: Candidate =
            serde_json::from_str(r#"{"chunk_id": "c1", "similarity": 0.5}"#).unwrap();
        let ranked = vec![RankedResult {
            candidate,
            rerank_score: 0.1,
        }];
        let payload = build_context(&ranked);
        assert_eq!(payload.items[0].text, "");
        assert!(payload.items[0].pages.is_empty());
        assert!(payload.items[0].tables.is_empty());
        assert!(payload.items[0].images.is_empty());
    }

    #[test]
    fn test_empty_input_yields_empty_payload() {
        let payload = build_context(&[]);
        assert!(payload.is_empty());
        assert!(payload.top().is_none());
    }
}
