//! Knowledge 모듈 - 위키 하이브리드 검색
//!
//! - Schema: 청크 인덱스 + 요약 인덱스 매핑 관리
//! - Indexer: 문단 청킹 + 임베딩 + 벌크 색인
//! - Hybrid: 키워드 점수 + 벡터 유사도를 한 쿼리로 통합
//! - Retriever: 청크 히트를 요약과 합쳐 표시용 문서로 변환
//! - SQLite: FTS5 + SQL 코사인 함수 기반 DocumentStore

mod chunker;
mod hybrid;
mod indexer;
mod retriever;
mod schema;
mod sqlite;
mod store;
mod types;
mod vector;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::embedding::{create_embedder, EmbeddingProvider};
use crate::error::Result;

// Re-exports
pub use chunker::{split_paragraphs, split_summary, PARAGRAPH_DELIMITER};
pub use hybrid::{validate_page, HybridQuery, HybridSearcher, RelatedMatch, MATCH_FIELDS};
pub use indexer::{load_page_documents, Indexer};
pub use retriever::Retriever;
pub use schema::{
    FieldKind, FieldMapping, IndexSchema, SchemaDefinition, SchemaManager, Similarity,
    EMBEDDING_FLD, PAGE_CONTENTS_IDX, PAGE_SUMMARIES_IDX, SUMMARY_FLD, TEXT_FLD, TITLE_FLD,
};
pub use sqlite::SqliteStore;
pub use store::DocumentStore;
pub use types::{
    BulkResponse, ContentChunk, DisplayDocument, IndexReport, Page, PageDocument, SearchHit,
    SearchPage, StoredChunk, SummaryRecord,
};
pub use vector::{cosine_similarity, decode_vector, encode_vector};

// ============================================================================
// WikiSearch
// ============================================================================

/// 인덱스 통계
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// 청크 인덱스 문서 수
    pub chunk_count: usize,
    /// 요약 인덱스 문서 수
    pub summary_count: usize,
}

/// 검색 컨텍스트
///
/// 저장소 핸들과 임베딩 프로바이더를 한 번 만들어 모든 연산이 공유합니다.
pub struct WikiSearch {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    schemas: SchemaManager,
    indexer: Indexer,
    searcher: HybridSearcher,
    retriever: Retriever,
}

impl WikiSearch {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            schemas: SchemaManager::new(store.clone(), embedder.dimension()),
            indexer: Indexer::new(store.clone(), embedder.clone()),
            searcher: HybridSearcher::new(store.clone(), embedder.clone()),
            retriever: Retriever::new(store.clone()),
            store,
            embedder,
        }
    }

    /// 설정에서 SQLite 저장소와 임베딩 프로바이더 생성
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&config.db_path())?);
        let embedder = create_embedder(config)?;
        Ok(Self::new(store, embedder))
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    /// 두 인덱스 삭제 후 재생성 (기존 데이터 폐기)
    pub async fn create_schemas(&self) -> Result<()> {
        self.schemas.create_schemas().await
    }

    pub async fn get_schema_definition(&self) -> Result<SchemaDefinition> {
        self.schemas.get_schema_definition().await
    }

    pub async fn index_documents(&self, docs: &[PageDocument]) -> Result<IndexReport> {
        self.indexer.index_documents(docs).await
    }

    /// 전체 재인덱싱: 스키마 재생성 → 수집 파일 로드 → 인덱싱
    pub async fn regenerate_index(&self, path: &Path) -> Result<IndexReport> {
        let started = Instant::now();

        self.create_schemas().await?;
        let docs = load_page_documents(path)?;
        let report = self.index_documents(&docs).await?;

        tracing::info!(
            "Index with {} page documents created in {} milliseconds",
            docs.len(),
            started.elapsed().as_millis()
        );
        Ok(report)
    }

    pub async fn build_query(&self, text: &str) -> Result<HybridQuery> {
        self.searcher.build_query(text).await
    }

    pub async fn search(&self, text: &str, size: i64, offset: i64) -> Result<SearchPage> {
        self.searcher.search(text, size, offset).await
    }

    pub async fn get_display_document(&self, id: &str) -> Result<DisplayDocument> {
        self.retriever.get_display_document(id).await
    }

    /// 인덱스별 문서 수 (아직 생성되지 않은 인덱스는 0)
    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            chunk_count: self.count_if_exists(PAGE_CONTENTS_IDX).await?,
            summary_count: self.count_if_exists(PAGE_SUMMARIES_IDX).await?,
        })
    }

    async fn count_if_exists(&self, index: &str) -> Result<usize> {
        if self.store.get_mapping(index).await?.is_none() {
            return Ok(0);
        }
        self.store.count(index).await
    }
}

// ============================================================================
// Tests
// ============================================================================
