//! # UserDataDeletionExecutor
//!
//! 削除単位を 1 つのトランザクションで削除する。
//!
//! ## 削除計画
//!
//! 1. トランザクションを開始する
//! 2. 対象ユーザー行をロックする（並行する削除・整理を直列化）。
//!    非アクティブ整理ではロック時点で選定ルールを再確認し、満たさなくなった
//!    ユーザーは削除単位から外す
//! 3. ロックできたユーザーについて、レジストリの順序で各コレクションから
//!    所有行を削除する（`users` が最後）
//! 4. コミットする
//!
//! 2〜4 のいずれかが失敗した場合はロールバックし、失敗したステップを
//! [`DeletionError::RolledBack`] で報告する。

use std::sync::Arc;

use healthlog_domain::{deletion::DeletionUnit, user::UserId};
use tracing::Instrument as _;

use super::{
    CollectionCount,
    CollectionRegistry,
    DeletionError,
    DeletionReport,
    DeletionStore,
    DeletionTransaction,
    LockCondition,
};
use crate::error::InfraError;

/// ユーザー行ロックのステップ名
const LOCK_STEP: &str = "users:lock";

/// ユーザーデータ削除の実行者
#[derive(Clone)]
pub struct UserDataDeletionExecutor {
    store:    Arc<dyn DeletionStore>,
    registry: CollectionRegistry,
}

impl UserDataDeletionExecutor {
    pub fn new(store: Arc<dyn DeletionStore>, registry: CollectionRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// 削除単位のユーザーと所有データをすべて削除する
    ///
    /// 成功時は全ユーザーが削除済み、失敗時は誰も削除されていない。
    /// 存在しないユーザー ID は 0 件の削除として扱う（冪等）。
    pub async fn execute(&self, unit: &DeletionUnit) -> Result<DeletionReport, DeletionError> {
        self.execute_with(unit, LockCondition::Existing).await
    }

    /// ロック時の条件を指定して削除単位を削除する
    ///
    /// [`LockCondition::StillInactive`] を指定すると、ユーザー行のロック時に
    /// 選定ルールを再評価する。選定後に管理者へ昇格したユーザーや
    /// 再ログインしたユーザーは削除せず、レポートにも含めない。
    #[tracing::instrument(skip_all, fields(user_count = unit.len(), ?condition))]
    pub async fn execute_with(
        &self,
        unit: &DeletionUnit,
        condition: LockCondition,
    ) -> Result<DeletionReport, DeletionError> {
        let mut tx = self.store.begin().await.map_err(DeletionError::Begin)?;

        let locked = match tx.lock_users(&unit.to_uuids(), &condition).await {
            Ok(locked) => locked,
            Err(source) => return Err(Self::abort(tx, LOCK_STEP, source).await),
        };
        if locked.len() < unit.len() {
            tracing::debug!(
                requested = unit.len(),
                locked = locked.len(),
                "ロック時点で対象外のユーザーを削除単位から除外"
            );
        }

        let mut rows_deleted = Vec::with_capacity(self.registry.collections().len());
        for collection in self.registry.collections() {
            let result = tx
                .delete_owned(collection, &locked)
                .instrument(tracing::debug_span!("delete_owned", collection = collection.name))
                .await;

            match result {
                Ok(count) => {
                    tracing::debug!(collection = collection.name, count, "所有行を削除");
                    rows_deleted.push(CollectionCount {
                        collection: collection.name,
                        count,
                    });
                }
                Err(source) => return Err(Self::abort(tx, collection.name, source).await),
            }
        }

        tx.commit().await.map_err(DeletionError::Commit)?;

        let report = DeletionReport {
            user_ids: locked.into_iter().map(UserId::from_uuid).collect(),
            rows_deleted,
        };

        tracing::info!(
            removed_users = report.user_ids.len(),
            total_rows = report.total_rows(),
            "削除トランザクションをコミット"
        );

        Ok(report)
    }

    /// 削除単位のユーザーが所有する行数をコレクションごとに数える
    ///
    /// 削除は行わない。件数は呼び出し時点のスナップショットであり、
    /// 直後の削除件数と一致することは保証しない。
    #[tracing::instrument(skip_all, fields(user_count = unit.len()))]
    pub async fn count_all(&self, unit: &DeletionUnit) -> Result<Vec<CollectionCount>, InfraError> {
        let user_ids = unit.to_uuids();

        let mut counts = Vec::with_capacity(self.registry.collections().len());
        for collection in self.registry.collections() {
            let count = self.store.count_owned(collection, &user_ids).await?;
            counts.push(CollectionCount {
                collection: collection.name,
                count,
            });
        }

        Ok(counts)
    }

    async fn abort(
        tx: Box<dyn DeletionTransaction>,
        step: &'static str,
        source: InfraError,
    ) -> DeletionError {
        tracing::error!(
            error.category = "infrastructure",
            error.kind = "deletion",
            step,
            error = %source,
            statement_timeout = source.is_statement_timeout(),
            "削除計画が失敗したためロールバック"
        );

        if let Err(rollback_error) = tx.rollback().await {
            // ロールバック要求が失敗しても、コミットされていないトランザクションは
            // 接続の切断時にデータベース側で破棄される
            tracing::error!(
                step,
                error = %rollback_error,
                "ロールバック要求に失敗"
            );
        }

        DeletionError::RolledBack { step, source }
    }
}
