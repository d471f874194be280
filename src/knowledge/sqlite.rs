//! SQLite Document Store - FTS5 키워드 점수 + SQL 코사인 함수
//!
//! 인덱스 하나가 테이블 하나와 FTS5 가상 테이블 하나로 구성됩니다.
//! 하이브리드 점수는 한 쿼리 안에서 계산됩니다:
//!
//! ```text
//! score = -bm25(...) + MAX(0, cosine_similarity(query, embedding))
//! ```
//!
//! ref: https://www.sqlite.org/fts5.html#the_bm25_function

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use uuid::Uuid;

use crate::embedding::ensure_dimension;
use crate::error::{Result, SearchError};

use super::hybrid::HybridQuery;
use super::schema::{FieldKind, IndexSchema, SUMMARY_FLD, TEXT_FLD, TITLE_FLD};
use super::store::DocumentStore;
use super::types::{
    BulkResponse, ContentChunk, Page, SearchHit, SearchPage, StoredChunk, SummaryRecord,
};
use super::vector::{cosine_similarity, decode_vector, encode_vector};

/// 인덱스 메타데이터 테이블
const META_DDL: &str = "CREATE TABLE IF NOT EXISTS index_meta (
    name TEXT PRIMARY KEY,
    definition TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

// ============================================================================
// SqliteStore
// ============================================================================

/// SQLite 기반 DocumentStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// 저장소 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// 메모리 저장소 (테스트용)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        register_functions(&conn)?;
        conn.execute(META_DDL, [])?;

        tracing::debug!("Document store initialized at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// DB 경로 (메모리 저장소면 None)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SearchError::StoreUnavailable(format!("Lock error: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create_index(&self, schema: &IndexSchema) -> Result<()> {
        let mut conn = self.lock()?;

        if index_definition(&conn, &schema.name)?.is_some() {
            return Err(SearchError::StoreUnavailable(format!(
                "Index '{}' already exists",
                schema.name
            )));
        }

        let table = quote_ident(&schema.name)?;
        let mut columns = vec![
            "seq INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "id TEXT NOT NULL UNIQUE".to_string(),
        ];
        for field in &schema.fields {
            let column = quote_ident(&field.name)?;
            match field.kind {
                FieldKind::Text => columns.push(format!("{} TEXT NOT NULL DEFAULT ''", column)),
                FieldKind::DenseVector { .. } => columns.push(format!("{} BLOB NOT NULL", column)),
            }
        }

        let tx = conn.transaction()?;
        tx.execute_batch(&format!("CREATE TABLE {} ({});", table, columns.join(", ")))?;

        let text_fields = schema.text_fields();
        if !text_fields.is_empty() {
            tx.execute_batch(&fts_ddl(&schema.name, &text_fields)?)?;
        }

        tx.execute(
            "INSERT INTO index_meta (name, definition, created_at) VALUES (?1, ?2, ?3)",
            params![
                schema.name,
                serde_json::to_string(schema)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;

        tracing::debug!("Created index '{}'", schema.name);
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let existed = index_definition(&conn, name)?.is_some();

        let table = quote_ident(name)?;
        let fts = quote_ident(&fts_table_name(name))?;

        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {}; DROP TABLE IF EXISTS {};",
            fts, table
        ))?;
        tx.execute("DELETE FROM index_meta WHERE name = ?1", params![name])?;
        tx.commit()?;

        Ok(existed)
    }

    async fn get_mapping(&self, name: &str) -> Result<Option<IndexSchema>> {
        let conn = self.lock()?;
        index_definition(&conn, name)
    }

    async fn index_summary(&self, index: &str, record: &SummaryRecord) -> Result<()> {
        let conn = self.lock()?;
        require_index(&conn, index)?;

        // REPLACE는 delete 트리거를 건너뛰므로 UPSERT로 FTS 동기화
        let summary = quote_ident(SUMMARY_FLD)?;
        conn.execute(
            &format!(
                "INSERT INTO {table} (id, {summary}) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET {summary} = excluded.{summary}",
                table = quote_ident(index)?,
                summary = summary,
            ),
            params![record.title, record.summary],
        )?;

        Ok(())
    }

    async fn bulk_index_chunks(
        &self,
        index: &str,
        chunks: &[ContentChunk],
    ) -> Result<BulkResponse> {
        let started = Instant::now();
        let mut conn = self.lock()?;
        let schema = require_index(&conn, index)?;

        if chunks.is_empty() {
            return Ok(BulkResponse {
                items: 0,
                took: Duration::ZERO,
            });
        }

        let (vector_field, dims) = schema.vector_field().ok_or_else(|| {
            SearchError::StoreUnavailable(format!("Index '{}' has no vector field", index))
        })?;
        for chunk in chunks {
            ensure_dimension(&chunk.embedding, dims)?;
        }

        let sql = format!(
            "INSERT INTO {} (id, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
            quote_ident(index)?,
            quote_ident(TITLE_FLD)?,
            quote_ident(TEXT_FLD)?,
            quote_ident(vector_field)?,
        );

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for chunk in chunks {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    chunk.title,
                    chunk.text,
                    encode_vector(&chunk.embedding),
                ])?;
            }
        }
        tx.commit()?;

        Ok(BulkResponse {
            items: chunks.len(),
            took: started.elapsed(),
        })
    }

    async fn get_chunk(&self, index: &str, id: &str) -> Result<Option<StoredChunk>> {
        let conn = self.lock()?;
        if index_definition(&conn, index)?.is_none() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT id, {}, {} FROM {} WHERE id = ?1",
            quote_ident(TITLE_FLD)?,
            quote_ident(TEXT_FLD)?,
            quote_ident(index)?,
        );
        let chunk = conn
            .query_row(&sql, params![id], |row| {
                Ok(StoredChunk {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                })
            })
            .optional()?;

        Ok(chunk)
    }

    async fn get_summary(&self, index: &str, title: &str) -> Result<Option<SummaryRecord>> {
        let conn = self.lock()?;
        if index_definition(&conn, index)?.is_none() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?1",
            quote_ident(SUMMARY_FLD)?,
            quote_ident(index)?,
        );
        let record = conn
            .query_row(&sql, params![title], |row| {
                Ok(SummaryRecord {
                    title: row.get(0)?,
                    summary: row.get(1)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    async fn search(&self, query: &HybridQuery, page: Page) -> Result<SearchPage> {
        let conn = self.lock()?;
        let schema = require_index(&conn, &query.index)?;
        let dims = schema.vector_dims(&query.vector_field).ok_or_else(|| {
            SearchError::StoreUnavailable(format!(
                "Index '{}' has no vector field '{}'",
                query.index, query.vector_field
            ))
        })?;
        ensure_dimension(&query.query_vector, dims)?;

        let related_schema = match &query.related {
            Some(related) => Some(require_index(&conn, &related.index)?),
            None => None,
        };

        let (cte, mut values) =
            matched_cte(query, &schema, &query.vector_field, related_schema.as_ref())?;

        // 저장된 벡터 차원 확인 (모델 교체 후 재인덱싱 누락)
        let mut check_values = values.clone();
        check_values.push(Value::Integer((dims * std::mem::size_of::<f32>()) as i64));
        let skewed: Option<i64> = conn
            .query_row(
                &format!(
                    "{} SELECT length(embedding) FROM matched WHERE length(embedding) != ? LIMIT 1",
                    cte
                ),
                params_from_iter(check_values.iter()),
                |row| row.get(0),
            )
            .optional()?;
        if let Some(bytes) = skewed {
            return Err(SearchError::DimensionalityMismatch {
                expected: dims,
                actual: bytes as usize / std::mem::size_of::<f32>(),
            });
        }

        let total: i64 = conn.query_row(
            &format!("{} SELECT COUNT(*) FROM matched", cte),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Blob(encode_vector(&query.query_vector)));
        values.push(Value::Integer(page.size as i64));
        values.push(Value::Integer(page.offset as i64));

        let sql = format!(
            "{} SELECT id, title, text,
                    lexical + MAX(0.0, cosine_similarity(?, embedding)) AS score
             FROM matched
             ORDER BY score DESC, seq ASC
             LIMIT ? OFFSET ?",
            cte
        );
        let mut stmt = conn.prepare(&sql)?;
        let hits = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(SearchHit {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                    score: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SearchPage {
            hits,
            total: total as usize,
        })
    }

    async fn count(&self, index: &str) -> Result<usize> {
        let conn = self.lock()?;
        require_index(&conn, index)?;

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(index)?),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `cosine_similarity(a, b)` SQL 함수 등록
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "cosine_similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let query = vector_arg(ctx, 0)?;
            let stored = vector_arg(ctx, 1)?;
            if query.len() != stored.len() {
                let err = SearchError::DimensionalityMismatch {
                    expected: stored.len(),
                    actual: query.len(),
                };
                return Err(rusqlite::Error::UserFunctionError(Box::new(err)));
            }
            Ok(f64::from(cosine_similarity(&query, &stored)))
        },
    )
}

fn vector_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Vec<f32>> {
    let bytes = ctx
        .get_raw(idx)
        .as_blob()
        .map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))?;
    decode_vector(bytes).map_err(|e| rusqlite::Error::UserFunctionError(Box::new(e)))
}

/// 등록된 스키마 조회
fn index_definition(conn: &Connection, name: &str) -> Result<Option<IndexSchema>> {
    let definition: Option<String> = conn
        .query_row(
            "SELECT definition FROM index_meta WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    Ok(definition
        .map(|d| serde_json::from_str(&d))
        .transpose()?)
}

fn require_index(conn: &Connection, name: &str) -> Result<IndexSchema> {
    index_definition(conn, name)?.ok_or_else(|| {
        SearchError::StoreUnavailable(format!(
            "Index '{}' does not exist. Recreate the schemas first",
            name
        ))
    })
}

fn fts_table_name(index: &str) -> String {
    format!("{}_fts", index)
}

/// 식별자 검증 후 인용 (영문/숫자/밑줄만 허용)
fn quote_ident(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SearchError::StoreUnavailable(format!(
            "Invalid identifier: '{}'",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

/// 외부 콘텐츠 FTS5 테이블 + 동기화 트리거
///
/// ref: https://www.sqlite.org/fts5.html#external_content_tables
fn fts_ddl(index: &str, text_fields: &[&str]) -> Result<String> {
    let table = quote_ident(index)?;
    let fts_name = fts_table_name(index);
    let fts = quote_ident(&fts_name)?;

    let quoted = text_fields
        .iter()
        .map(|f| quote_ident(f))
        .collect::<Result<Vec<_>>>()?;
    let cols = quoted.join(", ");
    let new_cols = quoted
        .iter()
        .map(|c| format!("new.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let old_cols = quoted
        .iter()
        .map(|c| format!("old.{}", c))
        .collect::<Vec<_>>()
        .join(", ");

    let ai = quote_ident(&format!("{}_ai", index))?;
    let ad = quote_ident(&format!("{}_ad", index))?;
    let au = quote_ident(&format!("{}_au", index))?;

    Ok(format!(
        r#"
        CREATE VIRTUAL TABLE {fts} USING fts5(
            {bare_cols},
            content='{index}',
            content_rowid='seq'
        );

        CREATE TRIGGER {ai} AFTER INSERT ON {table} BEGIN
            INSERT INTO {fts}(rowid, {cols}) VALUES (new.seq, {new_cols});
        END;

        CREATE TRIGGER {ad} AFTER DELETE ON {table} BEGIN
            INSERT INTO {fts}({fts}, rowid, {cols}) VALUES ('delete', old.seq, {old_cols});
        END;

        CREATE TRIGGER {au} AFTER UPDATE ON {table} BEGIN
            INSERT INTO {fts}({fts}, rowid, {cols}) VALUES ('delete', old.seq, {old_cols});
            INSERT INTO {fts}(rowid, {cols}) VALUES (new.seq, {new_cols});
        END;
        "#,
        bare_cols = text_fields.join(", "),
    ))
}

/// FTS5 MATCH 식 생성
///
/// 각 토큰을 큰따옴표로 감싸고 컬럼 필터를 붙여 OR로 연결합니다.
/// ref: https://www.sqlite.org/fts5.html#fts5_column_filters
fn fts_match_expression(columns: &[&str], terms: &[String]) -> String {
    let colset = format!("{{{}}}", columns.join(" "));
    terms
        .iter()
        .map(|t| format!("{} : \"{}\"", colset, t.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// 매치된 청크와 lexical 점수를 담는 `matched` CTE
///
/// lexical 점수는 필드별 점수 중 최댓값 (best fields)입니다.
fn matched_cte(
    query: &HybridQuery,
    schema: &IndexSchema,
    vector_field: &str,
    related_schema: Option<&IndexSchema>,
) -> Result<(String, Vec<Value>)> {
    let mut values = Vec::new();
    let table = quote_ident(&schema.name)?;

    let own_fields = schema.text_fields();
    let content_columns: Vec<&str> = query
        .fields
        .iter()
        .map(String::as_str)
        .filter(|f| own_fields.contains(f))
        .collect();

    let content_hits = if content_columns.is_empty() || query.terms.is_empty() {
        "content_hits AS (SELECT NULL AS seq, NULL AS score WHERE 0)".to_string()
    } else {
        let fts = quote_ident(&fts_table_name(&schema.name))?;
        values.push(Value::Text(fts_match_expression(
            &content_columns,
            &query.terms,
        )));
        format!(
            "content_hits AS (
                SELECT rowid AS seq, -bm25({fts}) AS score
                FROM {fts} WHERE {fts} MATCH ?
            )",
            fts = fts
        )
    };

    let mut join_column = quote_ident(TITLE_FLD)?;
    let mut related_hits = "related_hits AS (SELECT NULL AS key, NULL AS score WHERE 0)".to_string();
    if let (Some(related), Some(related_schema)) = (&query.related, related_schema) {
        let related_fields = related_schema.text_fields();
        let related_columns: Vec<&str> = related
            .fields
            .iter()
            .map(String::as_str)
            .filter(|f| related_fields.contains(f))
            .collect();

        join_column = quote_ident(&related.join_field)?;
        if !related_columns.is_empty() && !query.terms.is_empty() {
            let rtable = quote_ident(&related_schema.name)?;
            let rfts = quote_ident(&fts_table_name(&related_schema.name))?;
            values.push(Value::Text(fts_match_expression(
                &related_columns,
                &query.terms,
            )));
            related_hits = format!(
                "related_hits AS (
                    SELECT r.id AS key, -bm25({rfts}) AS score
                    FROM {rfts} JOIN {rtable} r ON r.seq = {rfts}.rowid
                    WHERE {rfts} MATCH ?
                )",
                rfts = rfts,
                rtable = rtable
            );
        }
    }

    let cte = format!(
        "WITH {content_hits},
         {related_hits},
         matched AS (
            SELECT c.seq AS seq,
                   c.id AS id,
                   c.{title} AS title,
                   c.{text} AS text,
                   c.{embedding} AS embedding,
                   MAX(COALESCE(ch.score, 0.0), COALESCE(rh.score, 0.0)) AS lexical
            FROM {table} c
            LEFT JOIN content_hits ch ON ch.seq = c.seq
            LEFT JOIN related_hits rh ON rh.key = c.{join_column}
            WHERE ch.seq IS NOT NULL OR rh.key IS NOT NULL
         )",
        content_hits = content_hits,
        related_hits = related_hits,
        title = quote_ident(TITLE_FLD)?,
        text = quote_ident(TEXT_FLD)?,
        embedding = quote_ident(vector_field)?,
        table = table,
        join_column = join_column,
    );

    Ok((cte, values))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::hybrid::RelatedMatch;
    use crate::knowledge::schema::{EMBEDDING_FLD, PAGE_CONTENTS_IDX, PAGE_SUMMARIES_IDX};
    use tempfile::TempDir;

    async fn create_test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_index(&IndexSchema::contents(3)).await.unwrap();
        store.create_index(&IndexSchema::summaries()).await.unwrap();
        store
    }

    fn chunk(title: &str, text: &str, embedding: [f32; 3]) -> ContentChunk {
        ContentChunk {
            title: title.to_string(),
            text: text.to_string(),
            embedding: embedding.to_vec(),
        }
    }

    fn query(text: &str, vector: [f32; 3]) -> HybridQuery {
        HybridQuery {
            index: PAGE_CONTENTS_IDX.to_string(),
            terms: text.split_whitespace().map(|t| t.to_lowercase()).collect(),
            fields: vec![TITLE_FLD.to_string(), TEXT_FLD.to_string()],
            related: Some(RelatedMatch {
                index: PAGE_SUMMARIES_IDX.to_string(),
                join_field: TITLE_FLD.to_string(),
                fields: vec![SUMMARY_FLD.to_string()],
            }),
            vector_field: EMBEDDING_FLD.to_string(),
            query_vector: vector.to_vec(),
        }
    }

    fn page(size: usize, offset: usize) -> Page {
        Page { size, offset }
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("test.db");
        let store = SqliteStore::open(&db_path).unwrap();
        assert_eq!(store.db_path(), Some(db_path.as_path()));
        store.create_index(&IndexSchema::summaries()).await.unwrap();

        // 다시 열어도 인덱스가 유지됨
        drop(store);
        let store = SqliteStore::open(&db_path).unwrap();
        assert!(store.get_mapping(PAGE_SUMMARIES_IDX).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_index_is_not_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(!store.delete_index(PAGE_CONTENTS_IDX).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_index_fails() {
        let store = create_test_store().await;
        let result = store.create_index(&IndexSchema::summaries()).await;
        assert!(matches!(result, Err(SearchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_delete_discards_data() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(PAGE_CONTENTS_IDX, &[chunk("A", "alpha", [1.0, 0.0, 0.0])])
            .await
            .unwrap();

        assert!(store.delete_index(PAGE_CONTENTS_IDX).await.unwrap());
        store.create_index(&IndexSchema::contents(3)).await.unwrap();
        assert_eq!(store.count(PAGE_CONTENTS_IDX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_summary_last_write_wins() {
        let store = create_test_store().await;
        let first = SummaryRecord {
            title: "A".to_string(),
            summary: "old summary".to_string(),
        };
        let second = SummaryRecord {
            title: "A".to_string(),
            summary: "new summary".to_string(),
        };
        store.index_summary(PAGE_SUMMARIES_IDX, &first).await.unwrap();
        store.index_summary(PAGE_SUMMARIES_IDX, &second).await.unwrap();

        assert_eq!(store.count(PAGE_SUMMARIES_IDX).await.unwrap(), 1);
        let record = store.get_summary(PAGE_SUMMARIES_IDX, "A").await.unwrap();
        assert_eq!(record, Some(second));
    }

    #[tokio::test]
    async fn test_bulk_index_and_get_chunk() {
        let store = create_test_store().await;
        let response = store
            .bulk_index_chunks(
                PAGE_CONTENTS_IDX,
                &[
                    chunk("A", "alpha one", [1.0, 0.0, 0.0]),
                    chunk("A", "alpha two", [0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(response.items, 2);

        let page = store
            .search(&query("alpha", [1.0, 0.0, 0.0]), page(10, 0))
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let id = &page.hits[0].id;
        let stored = store.get_chunk(PAGE_CONTENTS_IDX, id).await.unwrap().unwrap();
        assert_eq!(stored.title, "A");
        assert_eq!(stored.text, "alpha one");

        assert!(store
            .get_chunk(PAGE_CONTENTS_IDX, "missing-id")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_bulk_rejects_wrong_dimension_atomically() {
        let store = create_test_store().await;
        let chunks = vec![
            chunk("A", "fine", [1.0, 0.0, 0.0]),
            ContentChunk {
                title: "A".to_string(),
                text: "broken".to_string(),
                embedding: vec![1.0, 0.0],
            },
        ];
        let result = store.bulk_index_chunks(PAGE_CONTENTS_IDX, &chunks).await;
        assert!(matches!(
            result,
            Err(SearchError::DimensionalityMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(store.count(PAGE_CONTENTS_IDX).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_rejects_wrong_query_dimension() {
        let store = create_test_store().await;
        let mut q = query("alpha", [1.0, 0.0, 0.0]);
        q.query_vector = vec![1.0; 5];
        let result = store.search(&q, page(5, 0)).await;
        assert!(matches!(
            result,
            Err(SearchError::DimensionalityMismatch {
                expected: 3,
                actual: 5
            })
        ));
    }

    #[tokio::test]
    async fn test_search_detects_stored_dimension_skew() {
        let store = create_test_store().await;
        {
            // 다른 모델로 쓰인 2차원 벡터
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO page_contents (id, title, text, embedding) VALUES (?1, ?2, ?3, ?4)",
                params!["stale", "A", "alpha", encode_vector(&[1.0, 0.0])],
            )
            .unwrap();
        }

        let result = store.search(&query("alpha", [1.0, 0.0, 0.0]), page(5, 0)).await;
        assert!(matches!(
            result,
            Err(SearchError::DimensionalityMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_search_unknown_vector_field_fails() {
        let store = create_test_store().await;
        let mut q = query("alpha", [1.0, 0.0, 0.0]);
        q.vector_field = TEXT_FLD.to_string();
        let result = store.search(&q, page(5, 0)).await;
        assert!(matches!(result, Err(SearchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_equal_scores_keep_insertion_order() {
        let store = create_test_store().await;
        let response = store
            .bulk_index_chunks(
                PAGE_CONTENTS_IDX,
                &[
                    chunk("A", "same text", [1.0, 0.0, 0.0]),
                    chunk("A", "same text", [1.0, 0.0, 0.0]),
                    chunk("A", "same text", [1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();
        assert_eq!(response.items, 3);

        let q = query("same", [1.0, 0.0, 0.0]);
        let all = store.search(&q, page(10, 0)).await.unwrap();
        assert_eq!(all.hits.len(), 3);
        assert!(all.hits.windows(2).all(|w| w[0].score == w[1].score));

        // 삽입 순서 (seq) 확인
        let conn = store.lock().unwrap();
        let inserted: Vec<String> = conn
            .prepare("SELECT id FROM page_contents ORDER BY seq")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        drop(conn);
        let returned: Vec<String> = all.hits.iter().map(|h| h.id.clone()).collect();
        assert_eq!(returned, inserted);

        // 페이지 경계에서도 같은 순서
        let second = store.search(&q, page(1, 1)).await.unwrap();
        assert_eq!(second.hits[0].id, inserted[1]);
    }

    #[tokio::test]
    async fn test_search_missing_index_fails() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.search(&query("alpha", [1.0, 0.0, 0.0]), page(5, 0)).await;
        assert!(matches!(result, Err(SearchError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_vector_term_never_lowers_lexical_score() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(PAGE_CONTENTS_IDX, &[chunk("A", "alpha", [1.0, 0.0, 0.0])])
            .await
            .unwrap();

        // 영벡터는 코사인 0 -> lexical 점수만 남음
        let lexical = store
            .search(&query("alpha", [0.0, 0.0, 0.0]), page(1, 0))
            .await
            .unwrap()
            .hits[0]
            .score;
        let opposite = store
            .search(&query("alpha", [-1.0, 0.0, 0.0]), page(1, 0))
            .await
            .unwrap()
            .hits[0]
            .score;
        let aligned = store
            .search(&query("alpha", [1.0, 0.0, 0.0]), page(1, 0))
            .await
            .unwrap()
            .hits[0]
            .score;

        assert!(lexical >= 0.0);
        assert!((opposite - lexical).abs() < 1e-9);
        assert!((aligned - lexical - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_search_orders_and_paginates() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(
                PAGE_CONTENTS_IDX,
                &[
                    chunk("A", "rust language", [0.0, 1.0, 0.0]),
                    chunk("B", "rust compiler", [1.0, 0.0, 0.0]),
                    chunk("C", "rust borrow checker", [0.7, 0.7, 0.0]),
                    chunk("D", "python", [1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let q = query("rust", [1.0, 0.0, 0.0]);
        let all = store.search(&q, page(10, 0)).await.unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.hits.len(), 3);
        assert!(all.hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(all.hits[0].title, "B");

        let second = store.search(&q, page(1, 1)).await.unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.hits.len(), 1);
        assert_eq!(second.hits[0].id, all.hits[1].id);
    }

    #[tokio::test]
    async fn test_search_size_zero_reports_total() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(
                PAGE_CONTENTS_IDX,
                &[
                    chunk("A", "x marks", [1.0, 0.0, 0.0]),
                    chunk("B", "x again", [1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let result = store.search(&query("x", [1.0, 0.0, 0.0]), page(0, 0)).await.unwrap();
        assert!(result.hits.is_empty());
        assert_eq!(result.total, 2);
    }

    #[tokio::test]
    async fn test_summary_match_surfaces_chunks() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(PAGE_CONTENTS_IDX, &[chunk("Film", "plot details", [1.0, 0.0, 0.0])])
            .await
            .unwrap();
        store
            .index_summary(
                PAGE_SUMMARIES_IDX,
                &SummaryRecord {
                    title: "Film".to_string(),
                    summary: "directed by tarantino".to_string(),
                },
            )
            .await
            .unwrap();

        let result = store
            .search(&query("tarantino", [1.0, 0.0, 0.0]), page(5, 0))
            .await
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.hits[0].text, "plot details");
    }

    #[tokio::test]
    async fn test_title_match() {
        let store = create_test_store().await;
        store
            .bulk_index_chunks(PAGE_CONTENTS_IDX, &[chunk("Pulp Fiction", "a 1994 film", [0.0, 0.0, 1.0])])
            .await
            .unwrap();

        let result = store
            .search(&query("pulp", [1.0, 0.0, 0.0]), page(5, 0))
            .await
            .unwrap();
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn test_sql_cosine_function() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let similarity: f64 = conn
            .query_row(
                "SELECT cosine_similarity(?1, ?2)",
                params![encode_vector(&[1.0, 0.0]), encode_vector(&[1.0, 0.0])],
                |row| row.get(0),
            )
            .unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);

        let mismatch: rusqlite::Result<f64> = conn.query_row(
            "SELECT cosine_similarity(?1, ?2)",
            params![encode_vector(&[1.0, 0.0]), encode_vector(&[1.0, 0.0, 0.0])],
            |row| row.get(0),
        );
        assert!(mismatch.is_err());
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("page_contents").unwrap(), "\"page_contents\"");
        assert!(quote_ident("bad name").is_err());
        assert!(quote_ident("1abc").is_err());
        assert!(quote_ident("").is_err());
        assert!(quote_ident("x\"; DROP TABLE y").is_err());
    }

    #[test]
    fn test_fts_match_expression() {
        let terms = vec!["pulp".to_string(), "fiction".to_string()];
        assert_eq!(
            fts_match_expression(&["title", "text"], &terms),
            "{title text} : \"pulp\" OR {title text} : \"fiction\""
        );
    }
}
