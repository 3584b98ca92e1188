//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンス（RFC 9457 Problem Details）への変換を定義する。
//!
//! 入力検証エラーは不正な入力項目を `field` で返す。削除やデータベースの失敗は
//! 内部情報を含まない固定の detail を返し、詳細はログにのみ出力する。

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use healthlog_domain::DomainError;
use healthlog_infra::{InfraError, deletion::DeletionError};
use healthlog_shared::{
    ErrorResponse,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// 入力検証の失敗（ストアには一切アクセスしていない）
    #[error("{field} が不正です: {message}")]
    Validation {
        field:   &'static str,
        message: String,
    },

    /// 操作者を特定できない
    #[error("認証されていません: {0}")]
    Unauthorized(String),

    /// 操作者が管理者ではない
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 削除トランザクションの失敗（ロールバック済み）
    #[error("ユーザーデータの削除に失敗しました: {0}")]
    Deletion(#[from] DeletionError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for CoreError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation { field, message } => Self::Validation { field, message },
            DomainError::InvalidTransition { .. } => Self::Internal(error.to_string()),
        }
    }
}

impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            field:   "body",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = match &self {
            CoreError::Validation { field, message } => {
                ErrorResponse::validation_error(*field, message.clone())
            }
            CoreError::Unauthorized(msg) => ErrorResponse::unauthorized(msg.clone()),
            CoreError::Forbidden(msg) => ErrorResponse::forbidden(msg.clone()),
            CoreError::Deletion(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DELETION,
                    span_trace = %e.infra_error().span_trace(),
                    "ユーザーデータの削除に失敗: {}",
                    e
                );
                ErrorResponse::deletion_failed()
            }
            CoreError::Database(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            CoreError::Internal(msg) => {
                tracing::error!(error.kind = kind::INTERNAL, "内部エラー: {}", msg);
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    async fn response_json(error: CoreError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_validationは400でfieldを返す() {
        let error: CoreError = DomainError::validation("days", "日数は必須です").into();

        let (status, json) = response_json(error).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "days");
        assert_eq!(json["detail"], "日数は必須です");
    }

    #[tokio::test]
    async fn test_削除失敗は500で内部情報を返さない() {
        let error = CoreError::Deletion(DeletionError::RolledBack {
            step:   "loans",
            source: InfraError::unexpected("connection reset by peer"),
        });

        let (status, json) = response_json(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["type"],
            "https://healthlog.example.com/errors/deletion-failed"
        );
        let detail = json["detail"].as_str().unwrap();
        assert!(!detail.contains("loans"));
        assert!(!detail.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_不正な状態遷移は500の内部エラーになる() {
        let error: CoreError = DomainError::InvalidTransition {
            from: "committed",
            to:   "rolled_back",
        }
        .into();

        let (status, json) = response_json(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "内部エラーが発生しました");
    }

    #[tokio::test]
    async fn test_認証と権限のエラーはそれぞれ401と403になる() {
        let (unauthorized, _) = response_json(CoreError::Unauthorized("x".to_string())).await;
        let (forbidden, _) = response_json(CoreError::Forbidden("x".to_string())).await;

        assert_eq!(unauthorized, StatusCode::UNAUTHORIZED);
        assert_eq!(forbidden, StatusCode::FORBIDDEN);
    }
}
