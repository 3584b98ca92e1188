//! # ユーザーライフサイクルハンドラ
//!
//! 管理者向けのユーザー削除・非アクティブユーザー整理 API を提供する。
//! すべてのエンドポイントは [`require_admin`](crate::middleware::require_admin) の内側に置かれる。
//!
//! ## エンドポイント
//!
//! - `DELETE /internal/admin/users/{user_id}` - ユーザーと所有データの削除
//! - `POST /internal/admin/users/cleanup-inactive` - 非アクティブユーザーの一括削除
//! - `POST /internal/admin/users/cleanup-inactive/preview` - 一括削除の対象と件数の確認
//! - `GET /internal/admin/users/{user_id}/data` - ユーザーが所有するデータの件数

use std::sync::Arc;

use axum::{
    Extension,
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use healthlog_domain::user::UserId;
use healthlog_infra::deletion::CollectionCount;
use healthlog_shared::ApiResponse;
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    error::CoreError,
    middleware::AdminActor,
    usecase::{DaysInput, UserLifecycleUseCaseImpl},
};

/// ユーザーライフサイクル API の共有状態
pub struct UserLifecycleState {
    pub usecase: UserLifecycleUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 非アクティブユーザー整理リクエスト
///
/// `days` は数値（`30`）と数字文字列（`"30"`）のどちらも受け付ける。
#[derive(Debug, Deserialize)]
pub struct SweepInactiveUsersRequest {
    #[serde(default)]
    pub days: Option<DaysInput>,
}

/// ユーザー削除レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserResponse {
    pub removed_user_id: UserId,
}

/// 非アクティブユーザー整理レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepInactiveUsersResponse {
    pub removed_count:    usize,
    pub removed_user_ids: Vec<UserId>,
}

/// 整理プレビューレスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPreviewResponse {
    pub candidate_count:    usize,
    pub candidate_user_ids: Vec<UserId>,
    #[serde(serialize_with = "serialize_row_counts")]
    pub row_counts:         Vec<CollectionCount>,
}

/// ユーザーデータ件数レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataSummaryResponse {
    pub user_id:    UserId,
    #[serde(serialize_with = "serialize_row_counts")]
    pub row_counts: Vec<CollectionCount>,
    pub total_rows: u64,
}

/// コレクションごとの件数を削除順のまま `{ "collection": count }` として出力する
fn serialize_row_counts<S: Serializer>(
    counts: &[CollectionCount],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(counts.iter().map(|c| (c.collection, c.count)))
}

// --- ハンドラ ---

/// DELETE /internal/admin/users/{user_id}
///
/// ユーザーと所有データをすべて削除する。存在しないユーザーでも 200 を返す。
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn delete_user(
    State(state): State<Arc<UserLifecycleState>>,
    Extension(actor): Extension<AdminActor>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, CoreError> {
    let output = state.usecase.delete_user(&user_id, &actor.user_id).await?;

    let response = ApiResponse::new(DeleteUserResponse {
        removed_user_id: output.removed_user_id,
    });
    Ok((StatusCode::OK, Json(response)))
}

/// POST /internal/admin/users/cleanup-inactive
///
/// 指定日数以上ログインしていない一般ユーザーをまとめて削除する。
#[tracing::instrument(skip_all)]
pub async fn sweep_inactive_users(
    State(state): State<Arc<UserLifecycleState>>,
    Extension(actor): Extension<AdminActor>,
    payload: Result<Json<SweepInactiveUsersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CoreError> {
    let Json(req) = payload?;

    let output = state
        .usecase
        .sweep_inactive_users(req.days, &actor.user_id)
        .await?;

    let response = ApiResponse::new(SweepInactiveUsersResponse {
        removed_count:    output.removed_count(),
        removed_user_ids: output.removed_user_ids,
    });
    Ok((StatusCode::OK, Json(response)))
}

/// POST /internal/admin/users/cleanup-inactive/preview
///
/// 一括削除の対象者と、削除される行数をコレクションごとに返す。削除は行わない。
#[tracing::instrument(skip_all)]
pub async fn preview_inactive_users(
    State(state): State<Arc<UserLifecycleState>>,
    Extension(_actor): Extension<AdminActor>,
    payload: Result<Json<SweepInactiveUsersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CoreError> {
    let Json(req) = payload?;

    let preview = state.usecase.preview_sweep(req.days).await?;

    let response = ApiResponse::new(SweepPreviewResponse {
        candidate_count:    preview.candidate_user_ids.len(),
        candidate_user_ids: preview.candidate_user_ids,
        row_counts:         preview.row_counts,
    });
    Ok((StatusCode::OK, Json(response)))
}

/// GET /internal/admin/users/{user_id}/data
///
/// ユーザーが所有するデータの件数をコレクションごとに返す。
#[tracing::instrument(skip_all, fields(user_id = %user_id))]
pub async fn get_user_data_summary(
    State(state): State<Arc<UserLifecycleState>>,
    Extension(_actor): Extension<AdminActor>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, CoreError> {
    let summary = state.usecase.user_data_summary(&user_id).await?;

    let total_rows = summary.row_counts.iter().map(|c| c.count).sum();
    let response = ApiResponse::new(UserDataSummaryResponse {
        user_id: summary.user_id,
        row_counts: summary.row_counts,
        total_rows,
    });
    Ok((StatusCode::OK, Json(response)))
}
