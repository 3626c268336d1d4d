//! Evidence prompt assembly
//!
//! Formats merged facts and fragments into one bounded context block.
//! Output is deterministic for identical inputs; absent evidence leaves
//! its section empty rather than inserting placeholder text that could be
//! mistaken for retrieved evidence.

use crate::corpus::Fragment;
use crate::graph::Fact;
use indexmap::{IndexMap, IndexSet};

/// System role text for answer generation
pub const ANSWER_SYSTEM_PROMPT: &str = "You are an RBI regulatory assistant. \
Use ONLY the provided context. \
If info is missing say so.";

/// Assembles the evidence block and the final answer prompt
pub struct PromptAssembler {
    fragment_char_budget: usize,
}

impl PromptAssembler {
    pub fn new(fragment_char_budget: usize) -> Self {
        Self {
            fragment_char_budget,
        }
    }

    /// Build the bounded evidence block for one question
    pub fn evidence_block(&self, question: &str, fragments: &[Fragment], facts: &[Fact]) -> String {
        // Group fact labels by relation, deduplicating within each group.
        let mut grouped: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
        for fact in facts {
            grouped
                .entry(fact.relation.as_str())
                .or_default()
                .insert(fact.label.as_str());
        }

        let kg_text = grouped
            .iter()
            .map(|(relation, labels)| {
                let labels: Vec<&str> = labels.iter().copied().collect();
                format!("{}: {}", relation, labels.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n");

        let chunk_text = fragments
            .iter()
            .map(|fragment| {
                format!(
                    "[{}]: {}",
                    fragment.id,
                    truncate_chars(&fragment.text, self.fragment_char_budget)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "User question:\n{}\n\n\
             ================ KG INFO ================\n{}\n\n\
             ================ DOCUMENT EXCERPTS ================\n{}\n\n\
             ================ INSTRUCTIONS ================\n\
             Answer STRICTLY using the above KG + document context.\n\
             Do NOT hallucinate.\n\
             If information is missing, respond:\n\
             \"I cannot find this information in the RBI documents.\"",
            question, kg_text, chunk_text
        )
    }

    /// Build the full user prompt for final answer generation
    pub fn answer_prompt(
        &self,
        question: &str,
        fragments: &[Fragment],
        facts: &[Fact],
        previous_answer: &str,
    ) -> String {
        let previous = if previous_answer.is_empty() {
            "(none)"
        } else {
            previous_answer
        };

        format!(
            "PREVIOUS ANSWER:\n{}\n\n{}\n\nTASK:\nAnswer precisely.",
            previous,
            self.evidence_block(question, fragments, facts)
        )
    }
}

/// Truncate to a character budget without splitting a UTF-8 code point
fn truncate_chars(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(1200)
    }

    fn sample_facts() -> Vec<Fact> {
        vec![
            Fact::new("c1", "pertainsTo", "Topic::DLG_Cap", "DLG Cap"),
            Fact::new("c2", "pertainsTo", "Topic::DLG_Cap", "DLG Cap"),
            Fact::new("c1", "issuedBy", "Entity::RBI", "Reserve Bank of India"),
        ]
    }

    #[test]
    fn test_facts_grouped_and_deduplicated() {
        let block = assembler().evidence_block("q", &[], &sample_facts());

        assert!(block.contains("pertainsTo: DLG Cap\n"));
        assert!(block.contains("issuedBy: Reserve Bank of India"));
        // Duplicate label under one relation collapses to a single entry.
        assert_eq!(block.matches("DLG Cap").count(), 1);
    }

    #[test]
    fn test_fragment_truncation() {
        let long_text = "x".repeat(2000);
        let fragments = vec![Fragment::new("c1", long_text)];

        let block = PromptAssembler::new(1200).evidence_block("q", &fragments, &[]);

        let line = block
            .lines()
            .find(|l| l.starts_with("[c1]:"))
            .expect("fragment line present");
        assert_eq!(line.len(), "[c1]: ".len() + 1200);
    }

    #[test]
    fn test_truncation_is_char_safe() {
        // Multi-byte characters must not be split mid-code-point.
        let text = "₹".repeat(10);
        assert_eq!(truncate_chars(&text, 3), "₹₹₹");
    }

    #[test]
    fn test_deterministic_output() {
        let fragments = vec![
            Fragment::new("c1", "alpha"),
            Fragment::new("c2", "beta"),
        ];
        let facts = sample_facts();

        let a = assembler().evidence_block("question", &fragments, &facts);
        let b = assembler().evidence_block("question", &fragments, &facts);

        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_evidence_has_no_placeholder() {
        let block = assembler().evidence_block("q", &[], &[]);

        assert!(block.contains("================ KG INFO ================\n\n"));
        assert!(!block.to_lowercase().contains("no facts"));
        assert!(!block.to_lowercase().contains("no documents"));
    }

    #[test]
    fn test_answer_prompt_carries_previous_answer() {
        let with_prev = assembler().answer_prompt("q", &[], &[], "The cap is 5%.");
        assert!(with_prev.starts_with("PREVIOUS ANSWER:\nThe cap is 5%."));

        let without_prev = assembler().answer_prompt("q", &[], &[], "");
        assert!(without_prev.starts_with("PREVIOUS ANSWER:\n(none)"));
    }
}
