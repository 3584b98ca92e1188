//! # ドメイン層エラー定義
//!
//! 入力検証の失敗や不正な状態遷移を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗（どの入力が不正かを `field` で示す） |
//! | `InvalidTransition` | 500 Internal Server Error | 削除フェーズの不正な遷移（実装バグ） |
//!
//! ## 使用例
//!
//! ```rust
//! use healthlog_domain::DomainError;
//!
//! let error = DomainError::validation("days", "正の整数である必要があります");
//! assert_eq!(error.field(), Some("days"));
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// `field` には不正だった入力の名前（`"user_id"`, `"days"` など）を入れる。
    /// API 層はこの名前をそのままクライアントに返す。
    #[error("{field} が不正です: {message}")]
    Validation {
        /// 不正だった入力の名前
        field:   &'static str,
        /// 人間可読な理由
        message: String,
    },

    /// 削除フェーズの不正な遷移
    #[error("不正な状態遷移です: {from} → {to}")]
    InvalidTransition {
        from: &'static str,
        to:   &'static str,
    },
}

impl DomainError {
    /// バリデーションエラーを生成する
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// バリデーションエラーの場合、不正だった入力の名前を返す
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::InvalidTransition { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validationのメッセージに入力名が含まれる() {
        let error = DomainError::validation("user_id", "必須です");

        assert_eq!(error.to_string(), "user_id が不正です: 必須です");
    }

    #[test]
    fn test_invalid_transitionはfieldを持たない() {
        let error = DomainError::InvalidTransition {
            from: "committed",
            to:   "executing",
        };

        assert_eq!(error.field(), None);
    }
}
