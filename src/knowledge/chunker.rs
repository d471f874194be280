//! 문단 분할
//!
//! 줄바꿈 문자(`'\n'`) 하나가 본문 청킹과 요약 문단 분할 모두의
//! 유일한 구분자입니다 (설정 불가).

/// 문단 구분자
pub const PARAGRAPH_DELIMITER: char = '\n';

/// 본문을 인덱싱할 문단으로 분할
///
/// 공백뿐인 문단은 버리고, 남은 문단은 원문 그대로 순서를 유지합니다.
pub fn split_paragraphs(content: &str) -> Vec<&str> {
    content
        .split(PARAGRAPH_DELIMITER)
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// 요약을 표시용 문단으로 분할 (빈 줄 포함)
pub fn split_summary(summary: &str) -> Vec<String> {
    summary
        .split(PARAGRAPH_DELIMITER)
        .map(str::to_string)
        .collect()
}
