//! Ollama-style embedding and generation clients.
//!
//! Both clients speak to a `{model, prompt}` HTTP backend that replies
//! either with a single JSON object or with a newline-delimited stream of
//! JSON fragments. Embedding fragments are accumulated into one
//! contiguous vector before returning; generation fragments are forwarded
//! to the caller as they arrive.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{AnswerStream, Generator};

/// The default Ollama base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Splits an incrementally received byte stream into complete lines.
///
/// Backends that stream newline-delimited JSON do not align fragments
/// with transport chunks, so a partial line is carried over until its
/// terminator arrives.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Feed a chunk and return every line completed by it.
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
        }
        lines
    }

    /// Return the trailing unterminated line, if any.
    fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}

/// Fold one response line into the embedding accumulator.
///
/// A line may be a complete embedding object or a stream fragment; any
/// `embedding` (or legacy `embeddings`) array it carries is appended in
/// arrival order. Blank lines are skipped.
fn fold_embedding_line(acc: &mut Vec<f32>, line: &str) -> Result<()> {
    if line.trim().is_empty() {
        return Ok(());
    }

    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| RagError::InvalidEmbeddingFormat(format!("fragment is not JSON: {e}")))?;

    let Some(fragment) = value.get("embedding").or_else(|| value.get("embeddings")) else {
        return Ok(());
    };
    let numbers = fragment.as_array().ok_or_else(|| {
        RagError::InvalidEmbeddingFormat("embedding field is not an array".to_string())
    })?;
    for number in numbers {
        let v = number.as_f64().ok_or_else(|| {
            RagError::InvalidEmbeddingFormat(format!("non-numeric embedding entry: {number}"))
        })?;
        acc.push(v as f32);
    }
    Ok(())
}

/// One parsed line of a generation response.
#[derive(Debug, Default, PartialEq)]
struct GenerateChunk {
    text: Option<String>,
    done: bool,
}

/// Parse one generation response line. Returns `None` for blank lines.
fn parse_generate_line(line: &str) -> Result<Option<GenerateChunk>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| RagError::GenerationService(format!("malformed stream fragment: {e}")))?;

    let text = value
        .get("response")
        .or_else(|| value.get("text"))
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned);
    let done = value.get("done").and_then(serde_json::Value::as_bool).unwrap_or(false);

    Ok(Some(GenerateChunk { text, done }))
}

// ── Embedding client ───────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an Ollama-style `/api/embeddings`
/// endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    /// Create a new embedder for the given backend, model, and dimension.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self::from_client(reqwest::Client::new(), base_url, model, dimension)
    }

    /// Create an embedder from an existing HTTP client.
    ///
    /// Use this to share one client (and its timeout policy) across the
    /// embedding and generation backends.
    pub fn from_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Self {
        Self { client, base_url: base_url.into(), model: model.into(), dimension }
    }

    fn unavailable(message: impl Into<String>) -> RagError {
        RagError::ProviderUnavailable { provider: "ollama".to_string(), message: message.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "ollama", model = %self.model, text_len = text.len(), "embedding text");

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&EmbedRequest { model: &self.model, prompt: text })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "ollama", error = %e, "embedding request failed");
                Self::unavailable(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "ollama", %status, "embedding API error");
            return Err(Self::unavailable(format!("API returned {status}: {body}")));
        }

        // The backend may answer with one JSON object or a stream of
        // newline-delimited fragments; either way the embedding arrays
        // are folded into a single vector before returning.
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut embedding = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| Self::unavailable(format!("stream read failed: {e}")))?;
            for line in lines.push(&chunk) {
                fold_embedding_line(&mut embedding, &line)?;
            }
        }
        if let Some(line) = lines.finish() {
            fold_embedding_line(&mut embedding, &line)?;
        }

        if embedding.is_empty() {
            return Err(RagError::InvalidEmbeddingFormat(
                "response ended without an embedding field".to_string(),
            ));
        }

        debug!(provider = "ollama", dimension = embedding.len(), "embedding assembled");
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// ── Generation client ──────────────────────────────────────────────

/// A [`Generator`] backed by an Ollama-style `/api/generate` endpoint.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create a new generator for the given backend and model.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::from_client(reqwest::Client::new(), base_url, model)
    }

    /// Create a generator from an existing HTTP client.
    pub fn from_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self { client, base_url: base_url.into(), model: model.into() }
    }

    async fn send(&self, prompt: &str, stream: bool) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest { model: &self.model, prompt, stream })
            .send()
            .await
            .map_err(|e| {
                error!(provider = "ollama", error = %e, "generation request failed");
                RagError::GenerationService(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "ollama", %status, "generation API error");
            return Err(RagError::GenerationService(format!("API returned {status}: {body}")));
        }

        Ok(response)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = "ollama", model = %self.model, "buffered generation");

        let body = self
            .send(prompt, false)
            .await?
            .text()
            .await
            .map_err(|e| RagError::GenerationService(format!("failed to read response: {e}")))?;

        // Non-streaming backends still sometimes frame the body as a
        // short fragment sequence; concatenate whatever text arrives.
        let mut answer = String::new();
        let mut saw_text = false;
        for line in body.lines() {
            if let Some(chunk) = parse_generate_line(line)? {
                if let Some(text) = chunk.text {
                    saw_text = true;
                    answer.push_str(&text);
                }
            }
        }
        if !saw_text {
            return Err(RagError::GenerationService(
                "response contained no generation payload".to_string(),
            ));
        }
        Ok(answer)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<AnswerStream> {
        debug!(provider = "ollama", model = %self.model, "streaming generation");

        let response = self.send(prompt, true).await?;
        let mut body = response.bytes_stream();

        let stream = try_stream! {
            let mut lines = LineBuffer::default();
            'read: while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| {
                    RagError::GenerationService(format!("stream read failed: {e}"))
                })?;
                for line in lines.push(&chunk) {
                    if let Some(fragment) = parse_generate_line(&line)? {
                        if let Some(text) = fragment.text {
                            yield text;
                        }
                        if fragment.done {
                            break 'read;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_buffer_reassembles_split_lines() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"a\":").is_empty());
        assert_eq!(buffer.push(b"1}\n{\"b\":2}\n{\"c\"").len(), 2);
        assert_eq!(buffer.finish(), Some("{\"c\"".to_string()));
    }

    #[test]
    fn single_object_embedding_is_accumulated() {
        let mut acc = Vec::new();
        fold_embedding_line(&mut acc, r#"{"embedding": [0.1, 0.2, 0.3]}"#).unwrap();
        assert_eq!(acc, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn streamed_fragments_concatenate_in_arrival_order() {
        let mut acc = Vec::new();
        for line in [
            r#"{"model": "llama2"}"#,
            r#"{"embedding": [1.0, 2.0]}"#,
            "",
            r#"{"embedding": [3.0]}"#,
        ] {
            fold_embedding_line(&mut acc, line).unwrap();
        }
        assert_eq!(acc, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn legacy_embeddings_key_is_accepted() {
        let mut acc = Vec::new();
        fold_embedding_line(&mut acc, r#"{"embeddings": [4.0, 5.0]}"#).unwrap();
        assert_eq!(acc, vec![4.0, 5.0]);
    }

    #[test]
    fn non_numeric_embedding_entry_is_rejected() {
        let mut acc = Vec::new();
        let result = fold_embedding_line(&mut acc, r#"{"embedding": [1.0, "x"]}"#);
        assert!(matches!(result, Err(RagError::InvalidEmbeddingFormat(_))));
    }

    #[test]
    fn non_array_embedding_field_is_rejected() {
        let mut acc = Vec::new();
        let result = fold_embedding_line(&mut acc, r#"{"embedding": "oops"}"#);
        assert!(matches!(result, Err(RagError::InvalidEmbeddingFormat(_))));
    }

    #[test]
    fn generate_line_extracts_response_text() {
        let chunk = parse_generate_line(r#"{"response": "Hello", "done": false}"#).unwrap();
        assert_eq!(chunk, Some(GenerateChunk { text: Some("Hello".to_string()), done: false }));
    }

    #[test]
    fn generate_line_accepts_text_field() {
        let chunk = parse_generate_line(r#"{"text": "Hi"}"#).unwrap();
        assert_eq!(chunk, Some(GenerateChunk { text: Some("Hi".to_string()), done: false }));
    }

    #[test]
    fn generate_done_marker_has_no_text() {
        let chunk = parse_generate_line(r#"{"done": true}"#).unwrap();
        assert_eq!(chunk, Some(GenerateChunk { text: None, done: true }));
    }

    #[test]
    fn blank_generate_line_is_skipped() {
        assert_eq!(parse_generate_line("  ").unwrap(), None);
    }

    #[test]
    fn malformed_generate_line_is_an_error() {
        let result = parse_generate_line("not json");
        assert!(matches!(result, Err(RagError::GenerationService(_))));
    }
}
