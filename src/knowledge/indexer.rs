//! 문서 인덱서 - 문단 청킹 + 임베딩 + 벌크 색인
//!
//! 문서마다 본문을 문단으로 나눠 임베딩을 붙인 청크를 큐에 쌓고,
//! 요약 레코드는 즉시 씁니다. 모든 문서를 처리한 뒤 청크를
//! 한 번의 벌크 요청으로 제출합니다.
//!
//! 증분 인덱싱이 아닙니다: 이전 실행의 청크를 지우지 않으므로
//! 깨끗한 코퍼스가 필요하면 먼저 스키마를 재생성해야 합니다.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::embedding::{embed_batch_checked, EmbeddingProvider};
use crate::error::Result;

use super::chunker::split_paragraphs;
use super::schema::{PAGE_CONTENTS_IDX, PAGE_SUMMARIES_IDX};
use super::store::DocumentStore;
use super::types::{ContentChunk, IndexReport, PageDocument, SummaryRecord};

/// 문서 인덱서
pub struct Indexer {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Indexer {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// 문서 배치 인덱싱
    ///
    /// 문단 하나라도 임베딩에 실패하면 벌크 제출 전체가 취소됩니다.
    /// 그 전에 쓰인 요약 레코드는 남습니다.
    ///
    /// # Returns
    /// 저장소가 보고한 청크 수와 소요 시간
    pub async fn index_documents(&self, docs: &[PageDocument]) -> Result<IndexReport> {
        let mut queued: Vec<ContentChunk> = Vec::new();
        let mut seen_titles: HashSet<&str> = HashSet::new();

        for doc in docs {
            let paragraphs: Vec<String> = split_paragraphs(&doc.content)
                .into_iter()
                .map(str::to_string)
                .collect();
            // 문서당 배치 요청 한 번 (순서 유지)
            let embeddings = embed_batch_checked(self.embedder.as_ref(), &paragraphs).await?;

            if paragraphs.is_empty() {
                tracing::debug!("No paragraphs in document: {}", doc.title);
            }

            queued.extend(paragraphs.into_iter().zip(embeddings).map(|(text, embedding)| {
                ContentChunk {
                    title: doc.title.clone(),
                    text,
                    embedding,
                }
            }));

            if !seen_titles.insert(doc.title.as_str()) {
                tracing::warn!(
                    "Duplicate title in batch, summary will be overwritten: {}",
                    doc.title
                );
            }

            self.store
                .index_summary(
                    PAGE_SUMMARIES_IDX,
                    &SummaryRecord {
                        title: doc.title.clone(),
                        summary: doc.summary.clone(),
                    },
                )
                .await?;
        }

        let response = self
            .store
            .bulk_index_chunks(PAGE_CONTENTS_IDX, &queued)
            .await?;

        tracing::info!(
            "Indexed {} documents into {} chunks in {} ms",
            docs.len(),
            response.items,
            response.took.as_millis()
        );

        Ok(response.into())
    }
}

/// 수집 파일 로드 (`{title, summary, content}` 객체의 JSON 배열)
pub fn load_page_documents(path: &Path) -> Result<Vec<PageDocument>> {
    let raw = std::fs::read_to_string(path)?;
    let docs: Vec<PageDocument> = serde_json::from_str(&raw)?;
    tracing::debug!("Loaded {} page documents from {:?}", docs.len(), path);
    Ok(docs)
}

// ============================================================================
// Tests
// ============================================================================
