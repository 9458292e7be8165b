//! Best-effort LLM reranking of ranked candidates
//!
//! The reranker asks an OpenAI-compatible chat model to return a
//! permutation of candidate indices as its entire answer. Every failure
//! mode (missing credential, transport error, unparseable or invalid
//! response) degrades to the identity ordering with a logged warning; this
//! component never propagates an error to the search pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
enum RerankCallError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("empty completion")]
    EmptyCompletion,
}

/// Trait for rerankers
///
/// Capability: query plus ordered candidate texts in, `(original_index,
/// score)` pairs out, covering every input index exactly once. Infallible
/// by signature; implementations fall back to identity order internally.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, candidates: &[String]) -> Vec<(usize, f32)>;

    fn name(&self) -> &str;
}

/// Identity fallback: original input order, score 1.0 each.
pub fn identity_ranking(len: usize) -> Vec<(usize, f32)> {
    (0..len).map(|i| (i, 1.0)).collect()
}

/// Parse a free-text model response into a permutation of `0..len`.
///
/// Tolerant by design: takes the substring between the first `[` and the
/// last `]` and parses it as a JSON integer list. Strict JSON-only parsing
/// would regress robustness against real model output variance. Returns
/// `None` unless the list is exactly a permutation of the input indices.
pub fn parse_ranking(raw: &str, len: usize) -> Option<Vec<usize>> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end < start {
        return None;
    }

    let list: Vec<i64> = serde_json::from_str(&raw[start..=end]).ok()?;
    if list.len() != len {
        return None;
    }

    let mut seen = vec![false; len];
    let mut order = Vec::with_capacity(len);
    for value in list {
        let idx = usize::try_from(value).ok()?;
        if idx >= len || seen[idx] {
            return None;
        }
        seen[idx] = true;
        order.push(idx);
    }

    Some(order)
}

/// Turn a raw model response into the rerank output, assigning synthetic
/// display scores 1.0, 0.9, 0.8, ... by output position. Unparseable
/// responses keep the original order.
pub fn ranking_from_response(raw: &str, len: usize) -> Vec<(usize, f32)> {
    match parse_ranking(raw, len) {
        Some(order) => order
            .into_iter()
            .enumerate()
            .map(|(pos, idx)| (idx, 1.0 - 0.1 * pos as f32))
            .collect(),
        None => {
            tracing::warn!("Could not parse reranking response, keeping original order: {raw:?}");
            identity_ranking(len)
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// LLM-backed reranker over an OpenAI-compatible chat completions endpoint.
pub struct ChatReranker {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatReranker {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
        temperature: f32,
    ) -> Result<Self, crate::embedding::ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| crate::embedding::ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        })
    }

    fn build_prompt(query: &str, candidates: &[String]) -> String {
        let mut prompt = format!(
            "Rerank the following items based on relevance to the query: \"{}\"\n\nItems:\n",
            query
        );
        for (i, candidate) in candidates.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, candidate));
        }
        prompt.push_str(
            "\nReturn only the ranking as a JSON array of indices (0-based), \
             ordered from most to least relevant.",
        );
        prompt
    }

    async fn request_ranking(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<String, RerankCallError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a reranking assistant. Return only valid JSON.".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: Self::build_prompt(query, candidates),
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RerankCallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RerankCallError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RerankCallError::Transport(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(RerankCallError::EmptyCompletion)
    }
}

#[async_trait]
impl Reranker for ChatReranker {
    async fn rerank(&self, query: &str, candidates: &[String]) -> Vec<(usize, f32)> {
        if candidates.is_empty() {
            return Vec::new();
        }

        match self.request_ranking(query, candidates).await {
            Ok(raw) => ranking_from_response(&raw, candidates.len()),
            Err(e) => {
                tracing::warn!("Reranking failed, keeping original order: {}", e);
                identity_ranking(candidates.len())
            }
        }
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        assert_eq!(parse_ranking("[2, 0, 1]", 3), Some(vec![2, 0, 1]));
    }

    #[test]
    fn test_parse_array_with_prose() {
        let raw = "Sure! Here is the ranking:\n[1, 0]\nHope that helps.";
        assert_eq!(parse_ranking(raw, 2), Some(vec![1, 0]));
    }

    #[test]
    fn test_parse_no_brackets() {
        assert_eq!(parse_ranking("most relevant is item 2", 3), None);
    }

    #[test]
    fn test_parse_garbage_inside_brackets() {
        assert_eq!(parse_ranking("[first, second]", 2), None);
        assert_eq!(parse_ranking("[1, 0", 2), None);
    }

    #[test]
    fn test_parse_rejects_non_permutations() {
        // wrong length
        assert_eq!(parse_ranking("[0, 1]", 3), None);
        // duplicate index
        assert_eq!(parse_ranking("[0, 0, 1]", 3), None);
        // out of range
        assert_eq!(parse_ranking("[0, 1, 5]", 3), None);
        // negative index
        assert_eq!(parse_ranking("[-1, 0, 1]", 3), None);
    }

    #[test]
    fn test_parse_reversed_brackets() {
        assert_eq!(parse_ranking("] nonsense [", 2), None);
    }

    #[test]
    fn test_fallback_is_identity() {
        let ranking = ranking_from_response("no array here", 4);
        assert_eq!(
            ranking,
            vec![(0, 1.0), (1, 1.0), (2, 1.0), (3, 1.0)]
        );
    }

    #[test]
    fn test_synthetic_scores() {
        let ranking = ranking_from_response("[2, 0, 1]", 3);
        assert_eq!(ranking[0], (2, 1.0));
        assert_eq!(ranking[1].0, 0);
        assert!((ranking[1].1 - 0.9).abs() < 1e-6);
        assert!((ranking[2].1 - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_identity_ranking() {
        assert_eq!(identity_ranking(0), vec![]);
        assert_eq!(identity_ranking(2), vec![(0, 1.0), (1, 1.0)]);
    }

    #[test]
    fn test_build_prompt_numbers_items() {
        let prompt = ChatReranker::build_prompt(
            "heart ring",
            &["gold heart ring".to_string(), "silver chain".to_string()],
        );
        assert!(prompt.contains("\"heart ring\""));
        assert!(prompt.contains("1. gold heart ring"));
        assert!(prompt.contains("2. silver chain"));
        assert!(prompt.contains("JSON array of indices"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_degrades_to_identity() {
        // Connection refused on a closed local port must not surface
        let reranker =
            ChatReranker::new("http://127.0.0.1:9", "test-model", "key", 1, 0.0).unwrap();
        let candidates = vec!["a".to_string(), "b".to_string()];
        let ranking = reranker.rerank("query", &candidates).await;
        assert_eq!(ranking, vec![(0, 1.0), (1, 1.0)]);
    }
}
