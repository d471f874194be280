//! CLI 모듈
//!
//! wiki-hybrid CLI 명령어 정의 및 구현

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::{AppConfig, DEFAULT_SEARCH_OFFSET, DEFAULT_SEARCH_SIZE};
use crate::embedding::EmbeddingProvider;
use crate::error::SearchError;
use crate::knowledge::WikiSearch;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "wiki-hybrid")]
#[command(version, about = "위키 하이브리드 검색 (키워드 + 벡터)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 인덱스 재생성 (기존 데이터 삭제 후 수집 파일 인덱싱)
    Reindex {
        /// 수집 파일 경로 (기본: WIKI_PAGES_FILE 또는 wiki_pages.json)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// 인덱스 매핑 출력 (JSON)
    Mapping,

    /// 하이브리드 검색
    Search {
        /// 검색어
        #[arg(default_value = "")]
        query: String,

        /// 결과 개수
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_SIZE, allow_negative_numbers = true)]
        size: i64,

        /// 건너뛸 결과 수
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_OFFSET, allow_negative_numbers = true)]
        offset: i64,
    },

    /// 검색 결과 ID로 문서 표시
    Show {
        /// 청크 ID
        id: String,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_env().context("설정 로드 실패")?;

    match cli.command {
        Commands::Reindex { file } => cmd_reindex(&config, file).await,
        Commands::Mapping => cmd_mapping(&config).await,
        Commands::Search {
            query,
            size,
            offset,
        } => cmd_search(&config, &query, size, offset).await,
        Commands::Show { id } => cmd_show(&config, &id).await,
        Commands::Status => cmd_status(&config).await,
    }
}

fn open_search(config: &AppConfig) -> Result<WikiSearch> {
    WikiSearch::from_config(config).context("검색 컨텍스트 초기화 실패")
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 재인덱싱 명령어 (reindex)
async fn cmd_reindex(config: &AppConfig, file: Option<PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(|| config.wiki_pages_file.clone());
    let search = open_search(config)?;

    println!("[*] 인덱스 재생성 중: {}", path.display());

    let report = search
        .regenerate_index(&path)
        .await
        .with_context(|| format!("인덱싱 실패: {}", path.display()))?;

    println!(
        "[OK] 청크 {} 개 인덱싱 완료 ({} ms)",
        report.count,
        report.elapsed.as_millis()
    );
    Ok(())
}

/// 매핑 명령어 (mapping)
async fn cmd_mapping(config: &AppConfig) -> Result<()> {
    let search = open_search(config)?;
    let definition = search
        .get_schema_definition()
        .await
        .context("매핑 조회 실패")?;

    println!("{}", serde_json::to_string_pretty(&definition)?);
    Ok(())
}

/// 검색 명령어 (search)
async fn cmd_search(config: &AppConfig, query: &str, size: i64, offset: i64) -> Result<()> {
    let search = open_search(config)?;

    println!("[*] 검색 중: \"{}\"", query);

    let page = search
        .search(query, size, offset)
        .await
        .context("검색 실패")?;

    if page.hits.is_empty() {
        println!("\n[!] 검색 결과가 없습니다. (전체 {} 건)", page.total);
        return Ok(());
    }

    println!(
        "\n[OK] 검색 결과 ({} / 전체 {} 건):\n",
        page.hits.len(),
        page.total
    );

    for (i, hit) in page.hits.iter().enumerate() {
        println!(
            "{}. [점수: {:.4}] {}",
            offset as usize + i + 1,
            hit.score,
            hit.title
        );
        println!("   ID: {}", hit.id);
        println!("   내용: {}", truncate_text(&hit.text, 200));
        println!();
    }

    Ok(())
}

/// 문서 표시 명령어 (show)
async fn cmd_show(config: &AppConfig, id: &str) -> Result<()> {
    let search = open_search(config)?;

    let doc = match search.get_display_document(id).await {
        Ok(doc) => doc,
        Err(SearchError::DocumentNotFound(what)) => {
            println!("[!] 문서를 찾을 수 없습니다: {}", what);
            return Ok(());
        }
        Err(e) => return Err(e).context("문서 조회 실패"),
    };

    println!("# {}\n", doc.title);
    for paragraph in &doc.paragraphs {
        println!("{}", paragraph);
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status(config: &AppConfig) -> Result<()> {
    println!("wiki-hybrid v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 수집 파일: {}", config.wiki_pages_file.display());

    match WikiSearch::from_config(config) {
        Ok(search) => {
            println!("{}", embedder_line(config, search.embedder()));
            match search.stats().await {
                Ok(stats) => {
                    println!("[OK] 청크 인덱스: {} 건", stats.chunk_count);
                    println!("[OK] 요약 인덱스: {} 건", stats.summary_count);
                }
                Err(e) => {
                    println!("[!] 통계 조회 실패: {}", e);
                }
            }
        }
        Err(e) => {
            println!("[!] 검색 컨텍스트 초기화 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// 실제 사용 중인 임베딩 모델 표시
fn embedder_line(config: &AppConfig, embedder: &dyn EmbeddingProvider) -> String {
    format!(
        "[*] 임베딩: {} ({}, {}차원)",
        config.embedder,
        embedder.name(),
        embedder.dimension()
    )
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
