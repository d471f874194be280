//! Ollama 임베딩 - 로컬 sentence-transformer 모델
//!
//! 기본 모델은 `all-minilm` (all-MiniLM-L6-v2, 384차원)입니다.
//! ref: https://github.com/ollama/ollama/blob/main/docs/api.md#generate-embeddings

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{reject_blank, EmbeddingProvider};
use crate::error::{Result, SearchError};

/// Ollama 임베딩 구현체
#[derive(Debug)]
pub struct OllamaEmbedding {
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    truncate: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// 새 Ollama 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `endpoint` - Ollama 서버 주소
    /// * `model` - 임베딩 모델 이름
    /// * `dimension` - 모델 출력 차원
    pub fn new(endpoint: &str, model: &str, dimension: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension,
            client,
        })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
            truncate: true,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SearchError::EmbeddingUnavailable(format!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.endpoint
                    ))
                } else {
                    SearchError::EmbeddingUnavailable(format!("Ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 404 || body.contains("not found") {
                return Err(SearchError::EmbeddingUnavailable(format!(
                    "Model '{}' not found. Pull it with: ollama pull {}",
                    self.model, self.model
                )));
            }
            return Err(SearchError::EmbeddingUnavailable(format!(
                "Ollama error ({}): {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            SearchError::EmbeddingUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;

        if parsed.embeddings.len() != texts.len() {
            return Err(SearchError::EmbeddingUnavailable(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }

        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        reject_blank(text)?;
        self.request(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::EmbeddingUnavailable("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        for text in texts {
            reject_blank(text)?;
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let embedder = OllamaEmbedding::new("http://localhost:11434/", "all-minilm", 384).unwrap();
        assert_eq!(embedder.endpoint, "http://localhost:11434");
        assert_eq!(embedder.name(), "all-minilm");
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_embedding_unavailable() {
        // 포트 1은 항상 연결 거부
        let embedder = OllamaEmbedding::new("http://127.0.0.1:1", "all-minilm", 384).unwrap();
        let result = embedder.embed("hello").await;
        assert!(matches!(result, Err(SearchError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let embedder = OllamaEmbedding::new("http://127.0.0.1:1", "all-minilm", 384).unwrap();
        let result = embedder.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }
}
