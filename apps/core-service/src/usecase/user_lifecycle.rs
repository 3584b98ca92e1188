//! # ユーザーライフサイクルユースケース
//!
//! 管理者によるユーザー削除と、非アクティブユーザーの一括整理（Sweep）を実装する。
//!
//! どちらの操作も入力検証をストアへのアクセスより先に行い、検証を通過した
//! ユーザー集合を 1 つの削除単位として [`UserDataDeletionExecutor`] に渡す。
//! 削除は別タスクで実行するため、クライアントが切断しても
//! コミットかロールバックまで必ず走り切る。

use std::sync::Arc;

use healthlog_domain::{
    DomainError,
    clock::Clock,
    deletion::{DeletionPhase, DeletionUnit},
    inactivity::InactivityThreshold,
    user::UserId,
};
use healthlog_infra::{
    deletion::{CollectionCount, DeletionReport, LockCondition, UserDataDeletionExecutor},
    repository::UserRepository,
};
use healthlog_shared::{event_log::event, log_business_event};
use serde::Deserialize;
use tracing::Instrument as _;

use crate::error::CoreError;

/// 非アクティブ日数の入力
///
/// JSON の数値と数字文字列のどちらも受け付ける。それ以外の値（小数、真偽値など）も
/// いったん受け取り、閾値への変換時に `days` のバリデーションエラーにする。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DaysInput {
    Integer(i64),
    Text(String),
    Other(serde_json::Value),
}

impl DaysInput {
    fn into_threshold(self) -> Result<InactivityThreshold, DomainError> {
        match self {
            Self::Integer(days) => InactivityThreshold::new(days),
            Self::Text(raw) => InactivityThreshold::parse(&raw),
            Self::Other(value) => Err(DomainError::validation(
                "days",
                format!("日数は整数である必要があります: {value}"),
            )),
        }
    }
}

fn threshold_from(days: Option<DaysInput>) -> Result<InactivityThreshold, DomainError> {
    days.ok_or_else(|| DomainError::validation("days", "日数は必須です"))?
        .into_threshold()
}

/// ユーザー削除の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteUserOutput {
    pub removed_user_id: UserId,
    pub rows_deleted:    Vec<CollectionCount>,
}

/// 非アクティブユーザー整理の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepOutput {
    pub removed_user_ids: Vec<UserId>,
    pub rows_deleted:     Vec<CollectionCount>,
}

impl SweepOutput {
    fn empty() -> Self {
        Self {
            removed_user_ids: Vec::new(),
            rows_deleted:     Vec::new(),
        }
    }

    pub fn removed_count(&self) -> usize {
        self.removed_user_ids.len()
    }
}

/// 整理対象のプレビュー（削除は行わない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPreview {
    pub candidate_user_ids: Vec<UserId>,
    pub row_counts:         Vec<CollectionCount>,
}

/// 1 ユーザーが所有するデータの件数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataSummary {
    pub user_id:    UserId,
    pub row_counts: Vec<CollectionCount>,
}

/// ユーザーライフサイクルユースケース
pub struct UserLifecycleUseCaseImpl {
    user_repository: Arc<dyn UserRepository>,
    executor:        Arc<UserDataDeletionExecutor>,
    clock:           Arc<dyn Clock>,
}

impl UserLifecycleUseCaseImpl {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        executor: Arc<UserDataDeletionExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repository,
            executor,
            clock,
        }
    }

    /// ユーザーとその所有データをすべて削除する
    ///
    /// 存在しないユーザーの削除は 0 件の削除として成功する。
    #[tracing::instrument(skip_all, fields(actor_id = %actor_id))]
    pub async fn delete_user(
        &self,
        raw_user_id: &str,
        actor_id: &UserId,
    ) -> Result<DeleteUserOutput, CoreError> {
        let (user_id, phase) = validate(UserId::parse(raw_user_id))?;
        let unit = DeletionUnit::single(user_id.clone());

        match self.run_deletion(unit, phase, LockCondition::Existing).await {
            Ok(report) => {
                log_business_event!(
                    event.category = event::category::USER_LIFECYCLE,
                    event.action = event::action::USER_DELETED,
                    event.entity_type = event::entity_type::USER,
                    event.entity_id = %user_id,
                    event.actor_id = %actor_id,
                    event.result = event::result::SUCCESS,
                    event.phase = %DeletionPhase::Committed,
                    rows_deleted = report.total_rows(),
                    "ユーザーを削除"
                );
                Ok(DeleteUserOutput {
                    removed_user_id: user_id,
                    rows_deleted:    report.rows_deleted,
                })
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::USER_LIFECYCLE,
                    event.action = event::action::USER_DELETED,
                    event.entity_type = event::entity_type::USER,
                    event.entity_id = %user_id,
                    event.actor_id = %actor_id,
                    event.result = event::result::FAILURE,
                    event.phase = %DeletionPhase::RolledBack,
                    error = %e,
                    "ユーザーの削除に失敗"
                );
                Err(e)
            }
        }
    }

    /// 非アクティブユーザーを一括で削除する
    ///
    /// 対象者全員を 1 つの削除単位として扱うため、全員が削除されるか誰も削除されないかのどちらか。
    /// 対象者がいない場合はトランザクションを開始せずに空の結果を返す。
    ///
    /// 選定ルールは削除トランザクション内のロック時にも同じ基準時刻で再評価する。
    /// 選定後に管理者へ昇格したユーザーや再ログインしたユーザーは削除されず、
    /// 結果の `removed_user_ids` にも含まれない。
    #[tracing::instrument(skip_all, fields(actor_id = %actor_id))]
    pub async fn sweep_inactive_users(
        &self,
        days: Option<DaysInput>,
        actor_id: &UserId,
    ) -> Result<SweepOutput, CoreError> {
        let (threshold, phase) = validate(threshold_from(days))?;
        let now = self.clock.now();

        let candidates = self
            .user_repository
            .find_inactive_candidates(threshold, now)
            .await?;

        if candidates.is_empty() {
            log_business_event!(
                event.category = event::category::USER_LIFECYCLE,
                event.action = event::action::INACTIVE_USERS_SWEPT,
                event.entity_type = event::entity_type::USER,
                event.actor_id = %actor_id,
                event.result = event::result::SUCCESS,
                inactivity.days = threshold.days(),
                removed_count = 0,
                "整理対象の非アクティブユーザーなし"
            );
            return Ok(SweepOutput::empty());
        }

        let unit = DeletionUnit::new(candidates)?;
        let candidate_count = unit.len();

        let condition = LockCondition::StillInactive { threshold, now };
        match self.run_deletion(unit, phase, condition).await {
            Ok(report) => {
                log_business_event!(
                    event.category = event::category::USER_LIFECYCLE,
                    event.action = event::action::INACTIVE_USERS_SWEPT,
                    event.entity_type = event::entity_type::USER,
                    event.actor_id = %actor_id,
                    event.result = event::result::SUCCESS,
                    event.phase = %DeletionPhase::Committed,
                    inactivity.days = threshold.days(),
                    candidate_count,
                    removed_count = report.user_ids.len(),
                    rows_deleted = report.total_rows(),
                    "非アクティブユーザーを整理"
                );
                Ok(SweepOutput {
                    removed_user_ids: report.user_ids,
                    rows_deleted:     report.rows_deleted,
                })
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::USER_LIFECYCLE,
                    event.action = event::action::INACTIVE_USERS_SWEPT,
                    event.entity_type = event::entity_type::USER,
                    event.actor_id = %actor_id,
                    event.result = event::result::FAILURE,
                    event.phase = %DeletionPhase::RolledBack,
                    inactivity.days = threshold.days(),
                    candidate_count,
                    error = %e,
                    "非アクティブユーザーの整理に失敗"
                );
                Err(e)
            }
        }
    }

    /// 整理対象と、削除される行数をプレビューする
    #[tracing::instrument(skip_all)]
    pub async fn preview_sweep(&self, days: Option<DaysInput>) -> Result<SweepPreview, CoreError> {
        let threshold = threshold_from(days)?;

        let candidates = self
            .user_repository
            .find_inactive_candidates(threshold, self.clock.now())
            .await?;

        if candidates.is_empty() {
            return Ok(SweepPreview {
                candidate_user_ids: Vec::new(),
                row_counts:         self.zero_counts(),
            });
        }

        let unit = DeletionUnit::new(candidates)?;
        let row_counts = self.executor.count_all(&unit).await?;

        Ok(SweepPreview {
            candidate_user_ids: unit.into_vec(),
            row_counts,
        })
    }

    /// 1 ユーザーが所有するデータの件数をコレクションごとに返す
    #[tracing::instrument(skip_all)]
    pub async fn user_data_summary(&self, raw_user_id: &str) -> Result<UserDataSummary, CoreError> {
        let user_id = UserId::parse(raw_user_id)?;
        let row_counts = self
            .executor
            .count_all(&DeletionUnit::single(user_id.clone()))
            .await?;

        Ok(UserDataSummary {
            user_id,
            row_counts,
        })
    }

    /// 削除単位を別タスクで実行し、完了まで待つ
    async fn run_deletion(
        &self,
        unit: DeletionUnit,
        phase: DeletionPhase,
        condition: LockCondition,
    ) -> Result<DeletionReport, CoreError> {
        let phase = phase.begin_execution()?;
        tracing::debug!(%phase, user_count = unit.len(), "削除単位の実行を開始");

        let executor = Arc::clone(&self.executor);
        let outcome = tokio::spawn(
            async move { executor.execute_with(&unit, condition).await }.in_current_span(),
        )
            .await
            .map_err(|e| CoreError::Internal(format!("削除タスクが異常終了しました: {e}")))?;

        match outcome {
            Ok(report) => {
                let phase = phase.commit()?;
                tracing::debug!(%phase, "削除単位をコミット");
                Ok(report)
            }
            Err(e) => {
                let phase = phase.roll_back()?;
                tracing::debug!(%phase, "削除単位をロールバック");
                Err(e.into())
            }
        }
    }

    fn zero_counts(&self) -> Vec<CollectionCount> {
        self.executor
            .registry()
            .collections()
            .iter()
            .map(|collection| CollectionCount {
                collection: collection.name,
                count:      0,
            })
            .collect()
    }
}

/// 入力検証の結果を削除フェーズに反映する
fn validate<T>(input: Result<T, DomainError>) -> Result<(T, DeletionPhase), CoreError> {
    let phase = DeletionPhase::Requested;
    match input {
        Ok(value) => Ok((value, phase.validate()?)),
        Err(error) => {
            let phase = phase.reject()?;
            tracing::info!(%phase, field = ?error.field(), "入力検証に失敗したため受け付けない");
            Err(error.into())
        }
    }
}
