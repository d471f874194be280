//! 설정 - 환경변수 기반 런타임 설정
//!
//! 설정 파일 없이 환경변수와 CLI 플래그만으로 구성합니다.
//!
//! | 환경변수 | 기본값 |
//! |---|---|
//! | `WIKI_HYBRID_DATA_DIR` | `~/.wiki-hybrid/` (로컬 데이터 디렉토리) |
//! | `WIKI_HYBRID_EMBEDDER` | `ollama` (`gemini` 선택 가능) |
//! | `WIKI_HYBRID_MODEL` | `all-minilm` |
//! | `WIKI_HYBRID_DIMENSION` | `384` |
//! | `OLLAMA_HOST` | `http://localhost:11434` |
//! | `WIKI_PAGES_FILE` | `wiki_pages.json` |

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, SearchError};

/// 데이터베이스 파일 이름
pub const DB_FILENAME: &str = "wiki.db";

/// 기본 수집 파일 이름
pub const DEFAULT_WIKI_PAGES_FILE: &str = "wiki_pages.json";

/// 기본 Ollama 엔드포인트
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// 기본 임베딩 모델 (all-MiniLM-L6-v2)
pub const DEFAULT_MODEL: &str = "all-minilm";

/// 기본 임베딩 차원 (all-MiniLM-L6-v2 출력 차원)
pub const DEFAULT_DIMENSION: usize = 384;

/// 검색 결과 기본 개수
pub const DEFAULT_SEARCH_SIZE: i64 = 5;

/// 검색 기본 오프셋
pub const DEFAULT_SEARCH_OFFSET: i64 = 0;

/// 데이터 디렉토리 경로 (~/.wiki-hybrid/)
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("WIKI_HYBRID_DATA_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wiki-hybrid")
}

/// 임베딩 프로바이더 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// 로컬 Ollama 서버
    Ollama,
    /// Google Gemini API
    Gemini,
}

impl FromStr for EmbedderKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(EmbedderKind::Ollama),
            "gemini" => Ok(EmbedderKind::Gemini),
            other => Err(SearchError::Config(format!(
                "Unknown embedder '{}'. Use 'ollama' or 'gemini'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedderKind::Ollama => write!(f, "ollama"),
            EmbedderKind::Gemini => write!(f, "gemini"),
        }
    }
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub embedder: EmbedderKind,
    pub model: String,
    pub dimension: usize,
    pub ollama_host: String,
    pub wiki_pages_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir(),
            embedder: EmbedderKind::Ollama,
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
            wiki_pages_file: PathBuf::from(DEFAULT_WIKI_PAGES_FILE),
        }
    }
}

impl AppConfig {
    /// 환경변수에서 설정 로드 (없는 값은 기본값)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(kind) = env_value("WIKI_HYBRID_EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if config.embedder == EmbedderKind::Gemini {
            config.dimension = crate::embedding::GEMINI_DEFAULT_DIMENSION;
        }
        if let Some(model) = env_value("WIKI_HYBRID_MODEL") {
            config.model = model;
        }
        if let Some(dim) = env_value("WIKI_HYBRID_DIMENSION") {
            config.dimension = dim.parse().map_err(|_| {
                SearchError::Config(format!("WIKI_HYBRID_DIMENSION is not a number: {}", dim))
            })?;
        }
        if let Some(host) = env_value("OLLAMA_HOST") {
            config.ollama_host = host;
        }
        if let Some(file) = env_value("WIKI_PAGES_FILE") {
            config.wiki_pages_file = PathBuf::from(file);
        }

        if config.dimension == 0 {
            return Err(SearchError::Config(
                "Embedding dimension must be greater than 0".to_string(),
            ));
        }

        Ok(config)
    }

    /// SQLite DB 경로
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILENAME)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_kind_parse() {
        assert_eq!("ollama".parse::<EmbedderKind>().unwrap(), EmbedderKind::Ollama);
        assert_eq!(" Gemini ".parse::<EmbedderKind>().unwrap(), EmbedderKind::Gemini);
        assert!("openai".parse::<EmbedderKind>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.dimension, 384);
        assert_eq!(config.embedder, EmbedderKind::Ollama);
        assert!(config.db_path().ends_with(DB_FILENAME));
    }
}
