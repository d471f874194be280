//! 인덱스 스키마 - 콘텐츠/요약 이중 인덱스 정의
//!
//! - `page_contents`: 문단 단위 청크 (title, text, embedding)
//! - `page_summaries`: 문서 요약 (제목을 키로 사용)

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::store::DocumentStore;

/// 콘텐츠 인덱스 이름
pub const PAGE_CONTENTS_IDX: &str = "page_contents";
/// 요약 인덱스 이름
pub const PAGE_SUMMARIES_IDX: &str = "page_summaries";

pub const TITLE_FLD: &str = "title";
pub const SUMMARY_FLD: &str = "summary";
pub const TEXT_FLD: &str = "text";
pub const EMBEDDING_FLD: &str = "embedding";

// ============================================================================
// Types
// ============================================================================

/// 벡터 유사도 함수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    Cosine,
}

/// 필드 타입
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// 전문 검색 대상 텍스트
    Text,
    /// 고정 길이 벡터
    DenseVector { dims: usize, similarity: Similarity },
}

/// 필드 매핑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldMapping {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Text,
        }
    }

    pub fn dense_vector(name: &str, dims: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::DenseVector {
                dims,
                similarity: Similarity::Cosine,
            },
        }
    }
}

/// 인덱스 스키마
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    /// 문서 ID로 쓰는 자연 키 (없으면 저장소가 ID 생성)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub fields: Vec<FieldMapping>,
}

impl IndexSchema {
    /// 콘텐츠 인덱스 스키마
    pub fn contents(dims: usize) -> Self {
        Self {
            name: PAGE_CONTENTS_IDX.to_string(),
            key: None,
            fields: vec![
                FieldMapping::text(TITLE_FLD),
                FieldMapping::text(TEXT_FLD),
                FieldMapping::dense_vector(EMBEDDING_FLD, dims),
            ],
        }
    }

    /// 요약 인덱스 스키마 (제목이 키)
    pub fn summaries() -> Self {
        Self {
            name: PAGE_SUMMARIES_IDX.to_string(),
            key: Some(TITLE_FLD.to_string()),
            fields: vec![FieldMapping::text(SUMMARY_FLD)],
        }
    }

    /// 전문 검색 대상 필드 이름들
    pub fn text_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Text)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// 벡터 필드 (이름, 차원)
    pub fn vector_field(&self) -> Option<(&str, usize)> {
        self.fields.iter().find_map(|f| match f.kind {
            FieldKind::DenseVector { dims, .. } => Some((f.name.as_str(), dims)),
            FieldKind::Text => None,
        })
    }

    /// 이름으로 벡터 필드 차원 조회
    pub fn vector_dims(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .filter(|f| f.name == name)
            .find_map(|f| match f.kind {
                FieldKind::DenseVector { dims, .. } => Some(dims),
                FieldKind::Text => None,
            })
    }
}

/// 현재 매핑 (진단용)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    pub contents: Option<IndexSchema>,
    pub summaries: Option<IndexSchema>,
}

// ============================================================================
// SchemaManager
// ============================================================================

/// 인덱스 스키마 관리자
pub struct SchemaManager {
    store: Arc<dyn DocumentStore>,
    dimension: usize,
}

impl SchemaManager {
    pub fn new(store: Arc<dyn DocumentStore>, dimension: usize) -> Self {
        Self { store, dimension }
    }

    /// 기대하는 두 스키마
    pub fn expected_schemas(&self) -> [IndexSchema; 2] {
        [IndexSchema::contents(self.dimension), IndexSchema::summaries()]
    }

    /// 두 인덱스를 삭제 후 재생성 (기존 데이터는 모두 버림)
    ///
    /// 없는 인덱스 삭제는 에러가 아니므로 반복 호출해도 안전합니다.
    pub async fn create_schemas(&self) -> Result<()> {
        for schema in self.expected_schemas() {
            let existed = self.store.delete_index(&schema.name).await?;
            self.store.create_index(&schema).await?;
            tracing::info!(
                "Index '{}' {} (fields: {})",
                schema.name,
                if existed { "recreated" } else { "created" },
                schema.fields.len()
            );
        }
        Ok(())
    }

    /// 저장소에 등록된 현재 매핑
    pub async fn get_schema_definition(&self) -> Result<SchemaDefinition> {
        Ok(SchemaDefinition {
            contents: self.store.get_mapping(PAGE_CONTENTS_IDX).await?,
            summaries: self.store.get_mapping(PAGE_SUMMARIES_IDX).await?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
