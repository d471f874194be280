//! 에러 타입 - 하이브리드 검색 코어의 에러 분류
//!
//! 모든 연산은 `Result<T, SearchError>`를 반환하며, 코어 내부에서는
//! 재시도나 폴백 없이 호출자에게 그대로 전파합니다.

use thiserror::Error;

/// 코어 결과 타입
pub type Result<T> = std::result::Result<T, SearchError>;

/// 하이브리드 검색 에러
#[derive(Debug, Error)]
pub enum SearchError {
    /// 임베딩 모델/서비스가 벡터를 만들 수 없음 (자동 재시도 없음)
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// 저장소 연결/실행 실패 (재시도는 호출자 책임)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// ID 또는 제목 조회 실패
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// 음수 size/offset 등 잘못된 검색 파라미터
    #[error("Invalid query parameter `{name}`: {value}")]
    InvalidQueryParameter { name: &'static str, value: i64 },

    /// 벡터 차원 불일치 (스키마/모델 버전 불일치)
    #[error("Dimensionality mismatch: expected {expected}, got {actual}")]
    DimensionalityMismatch { expected: usize, actual: usize },

    /// 설정 오류 (API 키 누락, 잘못된 차원 등)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 수집 파일 읽기 실패
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 수집 파일 파싱 실패
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for SearchError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            // SQL 함수가 돌려준 코어 에러는 분류를 유지
            rusqlite::Error::UserFunctionError(inner) => match inner.downcast::<SearchError>() {
                Ok(search_err) => *search_err,
                Err(other) => SearchError::StoreUnavailable(other.to_string()),
            },
            other => SearchError::StoreUnavailable(other.to_string()),
        }
    }
}
