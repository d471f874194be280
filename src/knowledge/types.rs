//! 공통 데이터 타입
//!
//! 저장소 응답을 임의의 맵이 아닌 명시적 구조체로 다룹니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 수집된 위키 문서 (입력용, 인덱싱 후 버려짐)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    pub title: String,
    pub summary: String,
    pub content: String,
}

/// 문단 단위 인덱싱 단위
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChunk {
    /// 원본 문서 제목 (여러 청크가 공유)
    pub title: String,
    /// 문단 텍스트 (trim 후 비어있지 않음)
    pub text: String,
    /// 임베딩 벡터 (차원 D)
    pub embedding: Vec<f32>,
}

/// 저장소에서 읽어온 청크 (벡터 필드 제외)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredChunk {
    pub id: String,
    pub title: String,
    pub text: String,
}

/// 문서 요약 레코드 (제목이 키)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub summary: String,
}

/// 검색 결과 한 건
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub text: String,
    /// lexical_score + max(0, cosine_similarity)
    pub score: f64,
}

/// 페이지네이션된 검색 결과
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    /// 점수 내림차순
    pub hits: Vec<SearchHit>,
    /// 페이지와 무관한 전체 매치 수
    pub total: usize,
}

/// 화면 표시용 문서
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayDocument {
    pub title: String,
    pub paragraphs: Vec<String>,
}

/// 벌크 쓰기 응답
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResponse {
    /// 쓰여진 항목 수
    pub items: usize,
    /// 저장소가 측정한 소요 시간
    pub took: Duration,
}

/// 인덱싱 리포트
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    /// 인덱싱된 청크 수
    pub count: usize,
    pub elapsed: Duration,
}

impl From<BulkResponse> for IndexReport {
    fn from(response: BulkResponse) -> Self {
        Self {
            count: response.items,
            elapsed: response.took,
        }
    }
}

/// 검색 페이지네이션 (검증 완료된 값)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub size: usize,
    pub offset: usize,
}
