//! # PostgreSQL 削除ストア
//!
//! `READ COMMITTED` のトランザクション内で、対象ユーザー行を `FOR UPDATE` で
//! ロックしてから子コレクション → `users` の順に削除する。
//!
//! ユーザースコープの外部キーは `ON DELETE CASCADE` を持たない。ロック取得後に
//! 並行して挿入された子行は `users` の削除で外部キー違反となり、
//! トランザクションごとロールバックされる（孤立行は残らない）。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CollectionDescriptor, DeletionStore, DeletionTransaction, LockCondition};
use crate::error::InfraError;

/// PostgreSQL 実装の削除ストア
#[derive(Debug, Clone)]
pub struct PgDeletionStore {
    pool:              PgPool,
    statement_timeout: Option<Duration>,
}

impl PgDeletionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: None,
        }
    }

    /// 削除トランザクション内の各ステートメントにタイムアウトを設定する
    ///
    /// 超過したステートメントはキャンセルされ、削除計画はロールバックされる。
    pub fn with_statement_timeout(self, timeout: Duration) -> Self {
        Self {
            statement_timeout: Some(timeout),
            ..self
        }
    }
}

#[async_trait]
impl DeletionStore for PgDeletionStore {
    async fn begin(&self) -> Result<Box<dyn DeletionTransaction>, InfraError> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.statement_timeout {
            // is_local = true のため設定はこのトランザクション内に閉じる
            sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(format!("{}ms", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(Box::new(PgDeletionTransaction { tx }))
    }

    async fn count_owned(
        &self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError> {
        // テーブル名・列名はレジストリの静的な定義のみ（外部入力は含まない）
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ANY($1)",
            collection.name, collection.owner_column
        );

        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}

struct PgDeletionTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DeletionTransaction for PgDeletionTransaction {
    async fn lock_users(
        &mut self,
        user_ids: &[Uuid],
        condition: &LockCondition,
    ) -> Result<Vec<Uuid>, InfraError> {
        // ID 順にロックし、重なり合う削除単位同士のデッドロックを避ける。
        // 待機中に他トランザクションが行を更新した場合、WHERE 句は更新後の行で再評価される
        let locked: Vec<Uuid> = match condition {
            LockCondition::Existing => {
                sqlx::query_scalar(
                    "SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
                )
                .bind(user_ids)
                .fetch_all(&mut *self.tx)
                .await?
            }
            LockCondition::StillInactive { threshold, now } => {
                sqlx::query_scalar(
                    r#"
                    SELECT id FROM users
                    WHERE id = ANY($1)
                      AND is_admin = FALSE
                      AND (last_login_at IS NULL OR last_login_at <= $2)
                    ORDER BY id
                    FOR UPDATE
                    "#,
                )
                .bind(user_ids)
                .bind(threshold.cutoff(*now))
                .fetch_all(&mut *self.tx)
                .await?
            }
        };

        Ok(locked)
    }

    async fn delete_owned(
        &mut self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ANY($1)",
            collection.name, collection.owner_column
        );

        let result = sqlx::query(&sql)
            .bind(user_ids)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), InfraError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), InfraError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
