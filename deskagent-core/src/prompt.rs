//! Prompt construction for the three generation calls the pipeline makes:
//! intent planning, grounded answering, and action extraction.
//!
//! The answer prompt is evidence-bounded: it is built exclusively from the
//! assembled [`ContextPayload`] (plus tables the top chunk references) and
//! instructs the generator to answer only from that evidence, to emit the
//! exact refusal sentence when unanswerable, and to cite the source page.

use crate::config::PrioritySchema;
use crate::types::{ContextPayload, REFUSAL_TEXT};

/// Prompt for the model-backed intent planner. Requires strict JSON output.
pub fn planner_prompt(query: &str) -> String {
    format!(
        r#"You are an enterprise AI planner.

Your job is to determine whether the user INTENDS TO PERFORM AN ACTION.

IMPORTANT:
- Handle spelling mistakes and typos.
- Financial or report-related queries are ALWAYS INFORMATION.
- Confidence MUST reflect certainty of ACTION intent.
- If the request could reasonably be informational, confidence MUST be < 0.6.

Return STRICT JSON only.

INTENTS:
- INFORMATION
- ACTION
- INFORMATION_AND_ACTION

SUPPORTED ACTIONS:
- create_ticket
- schedule_meeting

FORMAT:
{{
  "intent": "...",
  "action_type": "... or null",
  "confidence": 0.0
}}

USER QUERY:
{query}
"#
    )
}

/// Prompt for structured action extraction. Requires strict JSON output.
pub fn extraction_prompt(query: &str, schema: PrioritySchema) -> String {
    format!(
        r#"Extract IT action parameters from the command.

Return STRICT JSON only.

FORMAT:
{{
  "priority": "{vocabulary}",
  "affected_user": "... or null",
  "issue": "..."
}}

COMMAND:
{query}
"#,
        vocabulary = schema.prompt_vocabulary()
    )
}

/// Build the grounded question-answering prompt from assembled evidence.
///
/// Each evidence item is prefixed with its page attribution so the
/// generator can cite pages without inventing them.
pub fn answer_prompt(question: &str, context: &ContextPayload, tables: &[String]) -> String {
    let mut prompt = format!(
        r#"You are a strict enterprise document question-answering assistant.

You MUST follow these rules EXACTLY.

==============================
PRIMARY RULE
==============================

Answer ONLY using the information provided in EVIDENCE below.

DO NOT use outside knowledge.
DO NOT guess.
DO NOT infer.
DO NOT assume.
DO NOT add extra information.

==============================
IF ANSWER NOT FOUND
==============================

If the answer is not explicitly present in the evidence, respond EXACTLY:

{REFUSAL_TEXT}

==============================
QUESTION
==============================

{question}

==============================
EVIDENCE
==============================
"#
    );

    for item in &context.items {
        prompt.push_str(&format!(
            "\n[{} | {}]\n{}\n",
            if item.section.is_empty() {
                "Untitled section"
            } else {
                &item.section
            },
            format_pages(&item.pages),
            item.text,
        ));
    }

    if !tables.is_empty() {
        prompt.push_str("\nTABLE EVIDENCE:\n");
        for (i, table) in tables.iter().enumerate() {
            prompt.push_str(&format!("\nTable {}:\n{}\n", i + 1, table));
        }
    }

    prompt.push_str(
        r#"
==============================
OUTPUT FORMAT
==============================

If answer is found:

- Answer in correct and concise sentences.
- Use EXACT words from evidence.
- DO NOT rephrase numbers.
- DO NOT explain extra.
- ALWAYS end answer with source page like: (Source: Page X)

==============================
IMPORTANT
==============================

Never answer without evidence.
Never fabricate page numbers.
Never answer from outside knowledge.
"#,
    );

    prompt.trim().to_string()
}

fn format_pages(pages: &[u32]) -> String {
    if pages.is_empty() {
        return "Page unknown".to_string();
    }
    let listed = pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Page {listed}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EvidenceItem;
    use pretty_assertions::assert_eq;

    fn payload() -> ContextPayload {
        ContextPayload {
            items: vec![
                EvidenceItem {
                    section: "Financial Highlights".into(),
                    pages: vec![14],
                    text: "Revenue was $1.2B".into(),
                    tables: vec![],
                    images: vec![],
                },
                EvidenceItem {
                    section: String::new(),
                    pages: vec![],
                    text: "Second item".into(),
                    tables: vec![],
                    images: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_planner_prompt_carries_query_and_contract() {
        let prompt = planner_prompt("raise a ticket");
        assert!(prompt.contains("raise a ticket"));
        assert!(prompt.contains("STRICT JSON"));
        assert!(prompt.contains("INFORMATION_AND_ACTION"));
        assert!(prompt.contains("Financial or report-related queries are ALWAYS INFORMATION"));
    }

    #[test]
    fn test_extraction_prompt_uses_schema_vocabulary() {
        let prompt = extraction_prompt("vpn down", PrioritySchema::HighNormal);
        assert!(prompt.contains("High | Normal"));
        let prompt = extraction_prompt("vpn down", PrioritySchema::LowMediumHigh);
        assert!(prompt.contains("Low | Medium | High"));
        assert!(prompt.contains("vpn down"));
    }

    #[test]
    fn test_answer_prompt_contains_refusal_and_page_attribution() {
        let prompt = answer_prompt("what was the revenue?", &payload(), &[]);
        assert!(prompt.contains(REFUSAL_TEXT));
        assert!(prompt.contains("[Financial Highlights | Page 14]"));
        assert!(prompt.contains("[Untitled section | Page unknown]"));
        assert!(prompt.contains("Revenue was $1.2B"));
        assert!(!prompt.contains("TABLE EVIDENCE"));
    }

    #[test]
    fn test_answer_prompt_numbers_tables() {
        let tables = vec!["[STRUCTURED TABLE]\n<table/>".to_string()];
        let prompt = answer_prompt("q", &payload(), &tables);
        assert!(prompt.contains("TABLE EVIDENCE"));
        assert!(prompt.contains("Table 1:"));
    }

    #[test]
    fn test_format_pages() {
        assert_eq!(format_pages(&[]), "Page unknown");
        assert_eq!(format_pages(&[14]), "Page 14");
        assert_eq!(format_pages(&[3, 4]), "Page 3, 4");
    }
}
