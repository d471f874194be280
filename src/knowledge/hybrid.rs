//! 하이브리드 검색 - 키워드 점수 + 벡터 유사도 통합
//!
//! 하나의 쿼리로 두 점수를 더합니다:
//!
//! ```text
//! score = lexical(title, summary, text) + max(0, cosine(embed(query), embedding))
//! ```
//!
//! 벡터 항은 0 아래로 내려가지 않으므로 키워드 점수를 깎지 않습니다.

use std::sync::Arc;

use crate::embedding::{embed_checked, EmbeddingProvider};
use crate::error::{Result, SearchError};

use super::schema::{
    IndexSchema, PAGE_SUMMARIES_IDX, SUMMARY_FLD, TEXT_FLD, TITLE_FLD,
};
use super::store::DocumentStore;
use super::types::{Page, SearchPage};

/// 키워드 매치 대상 필드
pub const MATCH_FIELDS: [&str; 3] = [TITLE_FLD, SUMMARY_FLD, TEXT_FLD];

// ============================================================================
// Types
// ============================================================================

/// 하이브리드 쿼리
#[derive(Debug, Clone, PartialEq)]
pub struct HybridQuery {
    /// 검색 대상 인덱스 (청크 인덱스)
    pub index: String,
    /// 정규화된 검색 토큰 (OR 매치)
    pub terms: Vec<String>,
    /// 대상 인덱스에서 매치할 필드
    pub fields: Vec<String>,
    /// 다른 인덱스 필드 매치 (요약 인덱스)
    pub related: Option<RelatedMatch>,
    /// 벡터 필드 이름
    pub vector_field: String,
    /// 쿼리 임베딩
    pub query_vector: Vec<f32>,
}

/// 키로 연결된 다른 인덱스의 필드 매치
///
/// `join_field` 값이 관련 인덱스의 문서 ID와 같은 청크가 매치됩니다.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedMatch {
    pub index: String,
    pub join_field: String,
    pub fields: Vec<String>,
}

// ============================================================================
// HybridSearcher
// ============================================================================

/// 하이브리드 쿼리 빌더 + 실행기
pub struct HybridSearcher {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    contents: IndexSchema,
    summaries: IndexSchema,
}

impl HybridSearcher {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let contents = IndexSchema::contents(embedder.dimension());
        Self {
            store,
            embedder,
            contents,
            summaries: IndexSchema::summaries(),
        }
    }

    /// 하이브리드 쿼리 생성
    ///
    /// 매치 필드를 스키마별로 나눠 청크 인덱스 필드는 직접,
    /// 요약 필드는 제목 키로 연결해 매치합니다.
    pub async fn build_query(&self, text: &str) -> Result<HybridQuery> {
        let query_vector = embed_checked(self.embedder.as_ref(), text).await?;
        Ok(self.query_with_vector(text, query_vector))
    }

    fn query_with_vector(&self, text: &str, query_vector: Vec<f32>) -> HybridQuery {
        let own = self.contents.text_fields();
        let related = self.summaries.text_fields();

        let fields: Vec<String> = MATCH_FIELDS
            .iter()
            .filter(|f| own.contains(f))
            .map(|f| f.to_string())
            .collect();
        let related_fields: Vec<String> = MATCH_FIELDS
            .iter()
            .filter(|f| related.contains(f))
            .map(|f| f.to_string())
            .collect();

        let vector_field = self
            .contents
            .vector_field()
            .map(|(name, _)| name.to_string())
            .unwrap_or_default();

        HybridQuery {
            index: self.contents.name.clone(),
            terms: tokenize_query(text),
            fields,
            related: (!related_fields.is_empty()).then(|| RelatedMatch {
                index: PAGE_SUMMARIES_IDX.to_string(),
                join_field: TITLE_FLD.to_string(),
                fields: related_fields,
            }),
            vector_field,
            query_vector,
        }
    }

    /// 하이브리드 검색
    ///
    /// # Arguments
    /// * `text` - 검색어
    /// * `size` - 최대 결과 수 (0 허용)
    /// * `offset` - 건너뛸 결과 수
    ///
    /// # Returns
    /// 점수 내림차순 결과와 전체 매치 수
    pub async fn search(&self, text: &str, size: i64, offset: i64) -> Result<SearchPage> {
        let page = validate_page(size, offset)?;

        // 매치 가능한 토큰이 없으면 어떤 문서도 키워드 매치되지 않음
        if tokenize_query(text).is_empty() {
            tracing::debug!("Query '{}' has no searchable terms", text);
            return Ok(SearchPage::default());
        }

        let query = self.build_query(text).await?;
        tracing::debug!(
            "Hybrid search: terms={:?}, size={}, offset={}",
            query.terms,
            page.size,
            page.offset
        );

        self.store.search(&query, page).await
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// size/offset 검증 (음수 거부)
pub fn validate_page(size: i64, offset: i64) -> Result<Page> {
    if size < 0 {
        return Err(SearchError::InvalidQueryParameter {
            name: "size",
            value: size,
        });
    }
    if offset < 0 {
        return Err(SearchError::InvalidQueryParameter {
            name: "offset",
            value: offset,
        });
    }
    Ok(Page {
        size: size as usize,
        offset: offset as usize,
    })
}

/// 검색어 토큰화
///
/// 문자/숫자가 아닌 문자는 모두 구분자로 취급합니다. FTS5 unicode61
/// 토크나이저가 저장 텍스트를 나누는 방식과 같아서 `don't`는 `don`, `t`가
/// 됩니다. 소문자로 바꾸고 중복은 제거합니다 (순서 유지).
fn tokenize_query(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let term = word.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

// ============================================================================
// Tests
// ============================================================================
