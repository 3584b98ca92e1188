//! # ユーザーデータ削除基盤
//!
//! 1 人以上のユーザーと、そのユーザーが所有する全コレクションの行を
//! 単一トランザクションで削除する。
//!
//! ## 構成
//!
//! - [`CollectionRegistry`]: 削除対象コレクションを削除順に保持する
//! - [`DeletionStore`] / [`DeletionTransaction`]: 削除計画を実行するストアの抽象
//! - [`UserDataDeletionExecutor`]: 削除計画（ロック → 子から親へ削除 → コミット）を実行する
//!
//! 削除計画のどこかで失敗した場合は必ずロールバックし、部分削除は残らない。

mod executor;
mod postgres;
mod registry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
pub use executor::UserDataDeletionExecutor;
use healthlog_domain::{
    inactivity::InactivityThreshold,
    user::{User, UserId},
};
pub use postgres::PgDeletionStore;
pub use registry::{CollectionDescriptor, CollectionRegistry, RegistryError, USERS_COLLECTION};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::InfraError;

/// 削除計画を実行するストア
///
/// トランザクションの開始と、トランザクション外での件数確認を提供する。
#[async_trait]
pub trait DeletionStore: Send + Sync {
    /// 削除用トランザクションを開始する
    async fn begin(&self) -> Result<Box<dyn DeletionTransaction>, InfraError>;

    /// 指定ユーザーが所有する行数を数える（削除はしない）
    async fn count_owned(
        &self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError>;
}

/// ユーザー行のロック時に満たしているべき条件
///
/// 対象者の選定とロックの間に状態が変わったユーザーは、ロックの時点で
/// 条件を再確認して削除単位から外す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCondition {
    /// 実在するユーザーをすべてロックする
    Existing,
    /// ロック時点でも非アクティブ整理の対象であるユーザーだけをロックする
    StillInactive {
        threshold: InactivityThreshold,
        now:       DateTime<Utc>,
    },
}

impl LockCondition {
    /// ユーザーが条件を満たすかどうか
    pub fn admits(&self, user: &User) -> bool {
        match self {
            Self::Existing => true,
            Self::StillInactive { threshold, now } => threshold.is_candidate(user, *now),
        }
    }
}

/// 削除用トランザクション
///
/// `commit` / `rollback` のどちらも呼ばずにドロップした場合もロールバックされる。
#[async_trait]
pub trait DeletionTransaction: Send {
    /// 対象ユーザーのうち `condition` を満たす行をロックし、その ID を ID 順に返す
    ///
    /// 同じユーザーを含む並行した削除はここで直列化される。
    /// 以降の削除はロックできたユーザーだけを対象にする。
    async fn lock_users(
        &mut self,
        user_ids: &[Uuid],
        condition: &LockCondition,
    ) -> Result<Vec<Uuid>, InfraError>;

    /// コレクションから指定ユーザーが所有する行を削除し、削除件数を返す
    async fn delete_owned(
        &mut self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError>;

    async fn commit(self: Box<Self>) -> Result<(), InfraError>;

    async fn rollback(self: Box<Self>) -> Result<(), InfraError>;
}

/// コレクションごとの行数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    pub collection: &'static str,
    pub count:      u64,
}

/// コミット済み削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    /// ロックして削除したユーザー（ID 順）
    ///
    /// 削除単位のうち、既に存在しなかったユーザーやロック時点で条件を
    /// 満たさなかったユーザーは含まない。
    pub user_ids:     Vec<UserId>,
    /// コレクションごとの削除件数（削除順）
    pub rows_deleted: Vec<CollectionCount>,
}

impl DeletionReport {
    /// 全コレクションの削除件数の合計
    pub fn total_rows(&self) -> u64 {
        self.rows_deleted.iter().map(|c| c.count).sum()
    }

    /// 指定コレクションの削除件数
    pub fn rows_for(&self, collection: &str) -> Option<u64> {
        self.rows_deleted
            .iter()
            .find(|c| c.collection == collection)
            .map(|c| c.count)
    }
}

/// 削除計画の実行エラー
///
/// どのバリアントでも、データは削除前の状態のまま変更されていない。
#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("削除トランザクションを開始できませんでした: {0}")]
    Begin(#[source] InfraError),

    #[error("{step} で失敗したためロールバックしました: {source}")]
    RolledBack {
        /// 失敗したステップ（コレクション名、またはユーザー行のロック）
        step:   &'static str,
        #[source]
        source: InfraError,
    },

    #[error("削除トランザクションのコミットに失敗しました: {0}")]
    Commit(#[source] InfraError),
}

impl DeletionError {
    /// 原因となったインフラエラー
    pub fn infra_error(&self) -> &InfraError {
        match self {
            Self::Begin(source) | Self::Commit(source) | Self::RolledBack { source, .. } => source,
        }
    }
}
