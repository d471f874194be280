//! 임베딩 모듈 - 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환하는 프로바이더 모음입니다.
//! 프로세스 시작 시 한 번 생성되고 이후 읽기 전용으로 공유됩니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = create_embedder(&AppConfig::from_env()?)?;
//! let embedding = embedder.embed("Quentin Tarantino").await?;
//! ```

mod gemini;
mod ollama;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::config::{AppConfig, EmbedderKind};
use crate::error::{Result, SearchError};

pub use gemini::{get_api_key, has_api_key, GeminiEmbedding, GEMINI_DEFAULT_DIMENSION};
pub use ollama::OllamaEmbedding;

/// 기본 배치 구현에서 동시에 실행할 임베딩 요청 수
pub const DEFAULT_EMBED_CONCURRENCY: usize = 4;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 같은 모델에 같은 입력이면 같은 벡터를 반환해야 합니다.
/// 실패 시 0 벡터로 대체하지 않고 `EmbeddingUnavailable`을 반환합니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 동시 호출, 입력 순서 유지)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let futures: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        stream::iter(futures)
            .buffered(DEFAULT_EMBED_CONCURRENCY)
            .try_collect()
            .await
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

/// 벡터 차원 검증
///
/// 저장된 벡터와 쿼리 벡터는 모두 같은 차원이어야 합니다.
pub fn ensure_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(SearchError::DimensionalityMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// 프로바이더 호출 + 차원 검증
pub async fn embed_checked(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let vector = provider.embed(text).await?;
    ensure_dimension(&vector, provider.dimension())?;
    Ok(vector)
}

/// 배치 호출 + 개수/차원 검증
pub async fn embed_batch_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = provider.embed_batch(texts).await?;
    if vectors.len() != texts.len() {
        return Err(SearchError::EmbeddingUnavailable(format!(
            "{} returned {} embeddings for {} inputs",
            provider.name(),
            vectors.len(),
            texts.len()
        )));
    }
    for vector in &vectors {
        ensure_dimension(vector, provider.dimension())?;
    }
    Ok(vectors)
}

fn reject_blank(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(SearchError::EmbeddingUnavailable(
            "Cannot embed empty text".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Factory Function
// ============================================================================

/// 설정에 맞는 임베딩 프로바이더 생성
pub fn create_embedder(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedder {
        EmbedderKind::Ollama => Arc::new(OllamaEmbedding::new(
            &config.ollama_host,
            &config.model,
            config.dimension,
        )?),
        EmbedderKind::Gemini => {
            if !has_api_key() {
                return Err(SearchError::Config(
                    "GEMINI_API_KEY or GOOGLE_AI_API_KEY not set.\n\
                     Set: export GEMINI_API_KEY=your-api-key"
                        .to_string(),
                ));
            }
            Arc::new(GeminiEmbedding::from_env_with_dimension(config.dimension)?)
        }
    };

    tracing::info!(
        "Using {} embedding (dimension: {})",
        embedder.name(),
        embedder.dimension()
    );
    Ok(embedder)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// 테스트용 결정적 임베딩 (bag-of-words 해시)
    pub(crate) struct HashEmbedding {
        pub dimension: usize,
    }

    impl HashEmbedding {
        pub(crate) fn new(dimension: usize) -> Self {
            Self { dimension }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for HashEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            reject_blank(text)?;
            let mut vector = vec![0.0; self.dimension];
            for word in text.split_whitespace() {
                let mut hasher = DefaultHasher::new();
                word.to_lowercase().hash(&mut hasher);
                let slot = (hasher.finish() % self.dimension as u64) as usize;
                vector[slot] += 1.0;
            }
            Ok(vector)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn name(&self) -> &str {
            "hash"
        }
    }

    /// 항상 실패하는 임베딩
    pub(crate) struct FailingEmbedding;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(SearchError::EmbeddingUnavailable("model offline".to_string()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// 선언한 차원과 다른 벡터를 반환하는 임베딩
    pub(crate) struct SkewedEmbedding;

    #[async_trait]
    impl EmbeddingProvider for SkewedEmbedding {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 4])
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &str {
            "skewed"
        }
    }

    #[tokio::test]
    async fn test_hash_embedding_is_deterministic() {
        let embedder = HashEmbedding::new(16);
        let a = embedder.embed("hello world").await.unwrap();
        let b = embedder.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn test_embed_checked_rejects_wrong_dimension() {
        let result = embed_checked(&SkewedEmbedding, "text").await;
        assert!(matches!(
            result,
            Err(SearchError::DimensionalityMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_blank_text_is_not_zero_vector() {
        let embedder = HashEmbedding::new(8);
        let result = embedder.embed("   ").await;
        assert!(matches!(result, Err(SearchError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_default_embed_batch_propagates_error() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let result = FailingEmbedding.embed_batch(&texts).await;
        assert!(matches!(result, Err(SearchError::EmbeddingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_default_embed_batch_keeps_input_order() {
        let embedder = HashEmbedding::new(16);
        let texts: Vec<String> = (0..10).map(|i| format!("paragraph number {}", i)).collect();

        let vectors = embed_batch_checked(&embedder, &texts).await.unwrap();

        assert_eq!(vectors.len(), texts.len());
        for (text, vector) in texts.iter().zip(&vectors) {
            assert_eq!(&embedder.embed(text).await.unwrap(), vector);
        }
    }

    #[tokio::test]
    async fn test_embed_batch_checked_rejects_wrong_dimension() {
        let texts = vec!["a".to_string()];
        let result = embed_batch_checked(&SkewedEmbedding, &texts).await;
        assert!(matches!(result, Err(SearchError::DimensionalityMismatch { .. })));
    }

    #[tokio::test]
    async fn test_embed_batch_checked_empty_input() {
        let result = embed_batch_checked(&FailingEmbedding, &[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_ensure_dimension() {
        assert!(ensure_dimension(&[0.0; 3], 3).is_ok());
        assert!(ensure_dimension(&[0.0; 2], 3).is_err());
    }
}
