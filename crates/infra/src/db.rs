//! # PostgreSQL データベース接続管理
//!
//! 接続プールの作成、マイグレーションの適用、疎通確認を行う。
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use healthlog_infra::db;
//!
//! let pool = db::create_pool("postgres://localhost/healthlog", 10).await?;
//! db::run_migrations(&pool).await?;
//! ```

use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::error::InfraError;

/// 接続取得のタイムアウト
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// PostgreSQL 接続プールを作成する
///
/// アプリケーション起動時に一度だけ呼び出し、作成したプールを共有する。
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, InfraError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// データベースマイグレーションを実行する
///
/// 適用済みのマイグレーションはスキップされる。sqlx が advisory lock を
/// 使用するため、複数プロセスから同時に呼び出しても安全。
pub async fn run_migrations(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// データベースへの疎通を確認する（Readiness Check 用）
pub async fn check_connection(pool: &PgPool) -> Result<(), InfraError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
