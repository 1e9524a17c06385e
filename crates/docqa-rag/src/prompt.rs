//! Prompt assembly

use docqa_core::PromptContext;

const GROUNDED_INSTRUCTIONS: &str = "Answer the question using only the sources below. \
Cite every source you rely on by its id in square brackets, for example [doc-1]. \
If the sources do not contain the answer, say that you do not know.";

const FALLBACK_INSTRUCTIONS: &str = "Answer the question from general knowledge. \
State clearly that no supporting sources were available.";

/// Marker placed where sources would go when retrieval found none
pub const NO_SOURCES_MARKER: &str = "[no sources]";

/// Instruction template, then each passage tagged with its id, then the query.
pub fn build_prompt(context: &PromptContext, query: &str) -> String {
    let mut prompt = String::with_capacity(context.used() + query.len() + 512);
    prompt.push_str(GROUNDED_INSTRUCTIONS);
    prompt.push_str("\n\nSources:\n\n");

    for passage in context.passages() {
        prompt.push_str(&format!("[{}] {}\n\n", passage.id(), passage.chunk.text));
    }

    push_question(&mut prompt, query);
    prompt
}

/// Prompt used when no passage could be retrieved.
pub fn build_fallback_prompt(query: &str) -> String {
    let mut prompt = String::from(FALLBACK_INSTRUCTIONS);
    prompt.push_str("\n\nSources: ");
    prompt.push_str(NO_SOURCES_MARKER);
    prompt.push_str("\n\n");
    push_question(&mut prompt, query);
    prompt
}

fn push_question(prompt: &mut String, query: &str) {
    prompt.push_str("---\n\nQuestion: ");
    prompt.push_str(query);
    prompt.push_str("\nAnswer:");
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::{DocumentChunk, RetrievedPassage};
    use std::sync::Arc;

    fn context(rows: &[(&str, &str)]) -> PromptContext {
        let mut context = PromptContext::with_budget(1000);
        for (rank, (id, text)) in rows.iter().enumerate() {
            assert!(context.try_push(RetrievedPassage {
                chunk: Arc::new(DocumentChunk::new(*id, *text, vec![])),
                score: 1.0,
                rank,
            }));
        }
        context
    }

    #[test]
    fn test_passages_tagged_in_rank_order() {
        let prompt = build_prompt(
            &context(&[("geo-1", "Paris is in France."), ("geo-2", "Lyon is in France.")]),
            "Where is Paris?",
        );

        let first = prompt.find("[geo-1] Paris is in France.").unwrap();
        let second = prompt.find("[geo-2] Lyon is in France.").unwrap();
        assert!(first < second);
        assert!(prompt.starts_with(GROUNDED_INSTRUCTIONS));
        assert!(prompt.ends_with("Question: Where is Paris?\nAnswer:"));
    }

    #[test]
    fn test_fallback_prompt_marks_missing_sources() {
        let prompt = build_fallback_prompt("Where is Paris?");
        assert!(prompt.contains(NO_SOURCES_MARKER));
        assert!(prompt.ends_with("Question: Where is Paris?\nAnswer:"));
    }
}
