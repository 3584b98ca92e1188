//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で調査しやすいよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
/// - `event.actor_id`: 操作者 ID
/// - `event.phase`: 削除単位の最終フェーズ
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const USER_LIFECYCLE: &str = "user_lifecycle";
    }

    /// イベントアクション
    pub mod action {
        pub const USER_DELETED: &str = "user.deleted";
        pub const INACTIVE_USERS_SWEPT: &str = "users.inactive_swept";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const USER: &str = "user";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const DELETION: &str = "deletion";
        pub const USER_LOOKUP: &str = "user_lookup";
        pub const INTERNAL: &str = "internal";
    }
}

#[cfg(test)]
mod tests {
    use super::event;

    #[test]
    fn test_log_business_eventはドット記法のフィールドを受け付ける() {
        // サブスクライバ未設定でもマクロ展開とフィールド構文が有効であることを確認する
        crate::log_business_event!(
            event.category = event::category::USER_LIFECYCLE,
            event.action = event::action::USER_DELETED,
            event.entity_type = event::entity_type::USER,
            event.entity_id = "0192f1a0-0000-7000-8000-000000000001",
            event.result = event::result::SUCCESS,
            "ユーザーを削除"
        );
    }
}
