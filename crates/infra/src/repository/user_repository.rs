//! # UserRepository
//!
//! ライフサイクル操作に必要なユーザー情報の読み取りを担当するリポジトリ。
//!
//! クエリは実行時に組み立てる `sqlx::query_as` を使い、ビルド時に
//! データベース接続を要求しない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healthlog_domain::{
    inactivity::InactivityThreshold,
    user::{User, UserId},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ID でユーザーを検索
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    /// 非アクティブ整理の対象ユーザーを ID 順で取得する
    ///
    /// 選定条件は [`InactivityThreshold::is_candidate`] と同じ
    /// （管理者を除外し、未ログインまたは最終ログインが `cutoff` 以前）。
    async fn find_inactive_candidates(
        &self,
        threshold: InactivityThreshold,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserId>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id:            Uuid,
    username:      String,
    is_admin:      bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at:    DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User::from_db(
            UserId::from_uuid(row.id),
            row.username,
            row.is_admin,
            row.last_login_at,
            row.created_at,
        )
    }
}

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, fields(user_id = %id))]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, is_admin, last_login_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    #[tracing::instrument(skip_all, fields(days = threshold.days()))]
    async fn find_inactive_candidates(
        &self,
        threshold: InactivityThreshold,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserId>, InfraError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM users
            WHERE is_admin = FALSE
              AND (last_login_at IS NULL OR last_login_at <= $1)
            ORDER BY id
            "#,
        )
        .bind(threshold.cutoff(now))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}
