//! # 削除単位と削除フェーズ
//!
//! 1 回の削除呼び出しが対象とするユーザー集合（[`DeletionUnit`]）と、
//! その処理状況（[`DeletionPhase`]）を定義する。
//!
//! ## 削除単位の不変条件
//!
//! - 空ではない（空の Sweep 結果は削除単位を作らずに短絡する）
//! - 重複を含まない（入力の重複は生成時に取り除く）
//! - 単位内の全ユーザーが完全に削除されるか、誰も削除されないかのどちらか
//!
//! ## 状態遷移
//!
//! ```text
//! Requested ──→ Validated ──→ Executing ──→ Committed
//!     │                           │
//!     ↓                           ↓
//!  Rejected                   RolledBack
//! ```
//!
//! 部分的にコミットされた状態は存在しない。

use std::collections::BTreeSet;

use strum::IntoStaticStr;
use uuid::Uuid;

use crate::{DomainError, user::UserId};

/// 削除単位（1 回の原子的な削除で対象となるユーザー ID の集合）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionUnit {
    user_ids: BTreeSet<UserId>,
}

impl DeletionUnit {
    /// 単一ユーザーの削除単位を作成する
    pub fn single(user_id: UserId) -> Self {
        Self {
            user_ids: BTreeSet::from([user_id]),
        }
    }

    /// 複数ユーザーの削除単位を作成する
    ///
    /// 重複は取り除かれる。空の場合は `field = "user_ids"` の
    /// バリデーションエラーを返す。
    pub fn new(user_ids: impl IntoIterator<Item = UserId>) -> Result<Self, DomainError> {
        let user_ids: BTreeSet<UserId> = user_ids.into_iter().collect();
        if user_ids.is_empty() {
            return Err(DomainError::validation(
                "user_ids",
                "削除対象のユーザーが 1 件もありません",
            ));
        }

        Ok(Self { user_ids })
    }

    pub fn len(&self) -> usize {
        self.user_ids.len()
    }

    /// 常に `false`（空の削除単位は作成できない）
    pub fn is_empty(&self) -> bool {
        self.user_ids.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.user_ids.contains(user_id)
    }

    /// ID 順に並んだユーザー ID を返す
    pub fn user_ids(&self) -> impl Iterator<Item = &UserId> {
        self.user_ids.iter()
    }

    /// SQL の `= ANY($1)` に渡すための UUID 配列
    pub fn to_uuids(&self) -> Vec<Uuid> {
        self.user_ids.iter().map(|id| *id.as_uuid()).collect()
    }

    pub fn into_vec(self) -> Vec<UserId> {
        self.user_ids.into_iter().collect()
    }
}

/// 削除単位の処理フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeletionPhase {
    /// 呼び出しを受け付けた
    Requested,
    /// 入力検証に失敗した（ストアには一切アクセスしていない）
    Rejected,
    /// 入力検証を通過した
    Validated,
    /// トランザクション内で削除計画を実行中
    Executing,
    /// コミット済み（全ユーザーを完全に削除した）
    Committed,
    /// ロールバック済み（誰も削除されていない）
    RolledBack,
}

impl DeletionPhase {
    /// 入力検証の通過を記録する
    pub fn validate(self) -> Result<Self, DomainError> {
        self.transition(Self::Validated)
    }

    /// 入力検証の失敗を記録する
    pub fn reject(self) -> Result<Self, DomainError> {
        self.transition(Self::Rejected)
    }

    /// 削除計画の実行開始を記録する
    pub fn begin_execution(self) -> Result<Self, DomainError> {
        self.transition(Self::Executing)
    }

    /// コミットを記録する
    pub fn commit(self) -> Result<Self, DomainError> {
        self.transition(Self::Committed)
    }

    /// ロールバックを記録する
    pub fn roll_back(self) -> Result<Self, DomainError> {
        self.transition(Self::RolledBack)
    }

    /// これ以上遷移しない状態かどうか
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Committed | Self::RolledBack)
    }

    fn transition(self, to: Self) -> Result<Self, DomainError> {
        let allowed = matches!(
            (self, to),
            (Self::Requested, Self::Validated)
                | (Self::Requested, Self::Rejected)
                | (Self::Validated, Self::Executing)
                | (Self::Executing, Self::Committed)
                | (Self::Executing, Self::RolledBack)
        );

        if allowed {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.into(),
                to:   to.into(),
            })
        }
    }
}
