//! Document Store - 저장소 경계 트레이트
//!
//! 코어가 저장소에 요구하는 최소 기능입니다:
//! 인덱스 생성/삭제, ID로 색인, 벌크 색인, ID로 조회,
//! 페이지네이션 쿼리 실행, 매핑 조회.
//! 코사인 유사도는 저장소의 쿼리 실행 안에서 계산되어야 합니다.

use async_trait::async_trait;

use crate::error::Result;

use super::hybrid::HybridQuery;
use super::schema::IndexSchema;
use super::types::{
    BulkResponse, ContentChunk, Page, SearchPage, StoredChunk, SummaryRecord,
};

/// DocumentStore 트레이트 (async)
///
/// 구현체는 동시 사용에 안전해야 합니다 (`Send + Sync`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 인덱스 생성 (이미 있으면 에러)
    async fn create_index(&self, schema: &IndexSchema) -> Result<()>;

    /// 인덱스 삭제 (없으면 `false`, 에러 아님)
    async fn delete_index(&self, name: &str) -> Result<bool>;

    /// 등록된 매핑 조회
    async fn get_mapping(&self, name: &str) -> Result<Option<IndexSchema>>;

    /// 요약 레코드 색인 (같은 제목이면 덮어쓰기)
    async fn index_summary(&self, index: &str, record: &SummaryRecord) -> Result<()>;

    /// 청크 벌크 색인 (전부 성공 또는 전부 실패)
    async fn bulk_index_chunks(&self, index: &str, chunks: &[ContentChunk])
        -> Result<BulkResponse>;

    /// ID로 청크 조회 (벡터 필드 제외)
    async fn get_chunk(&self, index: &str, id: &str) -> Result<Option<StoredChunk>>;

    /// 제목으로 요약 조회
    async fn get_summary(&self, index: &str, title: &str) -> Result<Option<SummaryRecord>>;

    /// 하이브리드 쿼리 실행
    async fn search(&self, query: &HybridQuery, page: Page) -> Result<SearchPage>;

    /// 인덱스의 문서 수
    async fn count(&self, index: &str) -> Result<usize>;
}
