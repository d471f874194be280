//! wiki-hybrid - 위키 하이브리드 검색
//!
//! SQLite FTS5 키워드 점수와 임베딩 코사인 유사도를 한 쿼리로 합산하는
//! 위키 문서 검색 라이브러리입니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod knowledge;

// Re-exports
pub use config::{get_data_dir, AppConfig, EmbedderKind};
pub use embedding::{
    create_embedder, get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding,
    OllamaEmbedding,
};
pub use error::{Result, SearchError};
pub use knowledge::{
    DisplayDocument, DocumentStore, HybridQuery, IndexReport, IndexStats, PageDocument,
    SchemaDefinition, SearchHit, SearchPage, SqliteStore, WikiSearch,
};
