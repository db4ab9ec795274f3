//! Generation backend trait and prompt assembly.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

/// A stream of incrementally produced answer fragments.
///
/// The stream ends when the backend closes it; there is no explicit
/// terminal item. Fragments already yielded before a failure are not
/// retracted — the error arrives as the final item.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A text-generation backend consumed as a black box.
///
/// For a deterministic backend, concatenating every fragment of
/// [`generate_stream`](Generator::generate_stream) equals the buffered
/// result of [`generate`](Generator::generate) for the same prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a complete answer for the prompt, buffered.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate an answer as a stream of text fragments.
    async fn generate_stream(&self, prompt: &str) -> Result<AnswerStream>;
}

/// System instruction prepended to every synthesized prompt.
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer using the provided context when it is relevant; \
     if the context is empty, answer the query directly.";

/// Build the synthesis prompt from retrieved context and the user query.
///
/// The generation backend accepts a single prompt string, so the system
/// instruction is folded into it ahead of the user content.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nBased on the following context: {context}, \
         answer the following query: {query}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_interpolates_context_and_query() {
        let prompt = build_prompt("Quarterly revenue rose 12%.", "What happened to revenue?");
        assert!(prompt.contains("Based on the following context: Quarterly revenue rose 12%."));
        assert!(prompt.contains("answer the following query: What happened to revenue?"));
    }

    #[test]
    fn empty_context_still_yields_a_prompt() {
        let prompt = build_prompt("", "What happened to revenue?");
        assert!(prompt.contains("answer the following query: What happened to revenue?"));
    }
}
