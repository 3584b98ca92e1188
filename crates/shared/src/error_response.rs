//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! 全エンドポイント共通のエラーレスポンス構造体を提供する。
//!
//! ## 設計
//!
//! - `ErrorResponse` は純粋なデータ構造（`Serialize` / `Deserialize` のみ）
//! - axum の `IntoResponse` 変換はサービス側の責務（shared に axum 依存を入れない）
//! - 入力検証エラーは拡張メンバー `field` で不正な入力項目を示す

use serde::{Deserialize, Serialize};

/// error_type URI のベースパス
const ERROR_TYPE_BASE: &str = "https://healthlog.example.com/errors";

/// エラーレスポンス（RFC 9457 Problem Details）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
    /// 不正だった入力項目（バリデーションエラー時のみ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field:      Option<String>,
}

impl ErrorResponse {
    /// 汎用コンストラクタ
    ///
    /// `error_type_suffix` はベース URI に付加される（例: `"deletion-failed"`）。
    pub fn new(
        error_type_suffix: &str,
        title: impl Into<String>,
        status: u16,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            error_type: format!("{ERROR_TYPE_BASE}/{error_type_suffix}"),
            title: title.into(),
            status,
            detail: detail.into(),
            field: None,
        }
    }

    /// 不正だった入力項目を付与する
    pub fn with_field(self, field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..self
        }
    }

    /// 400 Bad Request
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("bad-request", "Bad Request", 400, detail)
    }

    /// 401 Unauthorized
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new("unauthorized", "Unauthorized", 401, detail)
    }

    /// 403 Forbidden
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new("forbidden", "Forbidden", 403, detail)
    }

    /// 400 Validation Error
    pub fn validation_error(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new("validation-error", "Validation Error", 400, detail).with_field(field)
    }

    /// 500 Internal Server Error
    ///
    /// detail は固定値（内部情報を漏らさないため）。
    pub fn internal_error() -> Self {
        Self::new(
            "internal-error",
            "Internal Server Error",
            500,
            "内部エラーが発生しました",
        )
    }

    /// 500 ユーザーデータ削除の失敗
    ///
    /// 削除トランザクションはロールバック済みであり、どのユーザーも削除されていない。
    pub fn deletion_failed() -> Self {
        Self::new(
            "deletion-failed",
            "Deletion Failed",
            500,
            "ユーザーデータの削除に失敗しました。データは変更されていません",
        )
    }

    /// 503 Service Unavailable
    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new("service-unavailable", "Service Unavailable", 503, detail)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_new_で全フィールドが正しく設定される() {
        let error = ErrorResponse::new("custom-error", "Custom Error", 418, "カスタムエラー");

        assert_eq!(
            error.error_type,
            "https://healthlog.example.com/errors/custom-error"
        );
        assert_eq!(error.title, "Custom Error");
        assert_eq!(error.status, 418);
        assert_eq!(error.detail, "カスタムエラー");
        assert_eq!(error.field, None);
    }

    #[test]
    fn test_validation_error_はfieldを含めてシリアライズする() {
        let error = ErrorResponse::validation_error("days", "日数は必須です");
        let json = serde_json::to_value(&error).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "https://healthlog.example.com/errors/validation-error",
                "title": "Validation Error",
                "status": 400,
                "detail": "日数は必須です",
                "field": "days"
            })
        );
    }

    #[test]
    fn test_fieldがない場合はキー自体を出力しない() {
        let json = serde_json::to_value(ErrorResponse::forbidden("権限がありません")).unwrap();

        assert!(json.get("field").is_none());
        assert!(json.get("error_type").is_none());
        assert_eq!(json["type"], "https://healthlog.example.com/errors/forbidden");
    }

    #[test]
    fn test_deletion_failed_は内部情報を含まない固定detailを返す() {
        let error = ErrorResponse::deletion_failed();

        assert_eq!(error.status, 500);
        assert_eq!(
            error.detail,
            "ユーザーデータの削除に失敗しました。データは変更されていません"
        );
    }

    #[test]
    fn test_全便利コンストラクタのstatusが正しい() {
        assert_eq!(ErrorResponse::bad_request("").status, 400);
        assert_eq!(ErrorResponse::unauthorized("").status, 401);
        assert_eq!(ErrorResponse::forbidden("").status, 403);
        assert_eq!(ErrorResponse::validation_error("days", "").status, 400);
        assert_eq!(ErrorResponse::internal_error().status, 500);
        assert_eq!(ErrorResponse::deletion_failed().status, 500);
        assert_eq!(ErrorResponse::service_unavailable("").status, 503);
    }

    #[test]
    fn test_fieldなしのjsonもデシリアライズできる() {
        let json = r#"{
            "type": "https://healthlog.example.com/errors/unauthorized",
            "title": "Unauthorized",
            "status": 401,
            "detail": "認証されていません"
        }"#;
        let error: ErrorResponse = serde_json::from_str(json).unwrap();

        assert_eq!(error, ErrorResponse::unauthorized("認証されていません"));
    }
}
