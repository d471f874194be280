//! 문서 조회 - 청크 히트를 요약과 합쳐 표시용 문서로 변환
//!
//! 두 인덱스를 제목으로 조인할 뿐 벡터 필드는 건드리지 않습니다.

use std::sync::Arc;

use crate::error::{Result, SearchError};

use super::chunker::split_summary;
use super::schema::{PAGE_CONTENTS_IDX, PAGE_SUMMARIES_IDX};
use super::store::DocumentStore;
use super::types::DisplayDocument;

/// 표시용 문서 조회기
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 청크 ID로 표시용 문서 조회
    ///
    /// 청크나 요약 중 하나라도 없으면 `DocumentNotFound`입니다.
    pub async fn get_display_document(&self, id: &str) -> Result<DisplayDocument> {
        let chunk = self
            .store
            .get_chunk(PAGE_CONTENTS_IDX, id)
            .await?
            .ok_or_else(|| SearchError::DocumentNotFound(format!("chunk '{}'", id)))?;

        let record = self
            .store
            .get_summary(PAGE_SUMMARIES_IDX, &chunk.title)
            .await?
            .ok_or_else(|| {
                SearchError::DocumentNotFound(format!("summary for '{}'", chunk.title))
            })?;

        Ok(DisplayDocument {
            paragraphs: split_summary(&record.summary),
            title: chunk.title,
        })
    }
}
