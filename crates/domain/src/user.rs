//! # ユーザー
//!
//! ライフサイクルエンジンが扱う範囲のユーザーモデル。
//!
//! 認証情報（パスワードハッシュ等）や一般的なプロフィール更新は対象外で、
//! ここでは削除判定に必要な属性（管理者フラグ、最終ログイン日時）のみを保持する。

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::DomainError;

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    ///
    /// すべてのユーザースコープのコレクションはこの ID を `user_id` 列として持つ。
    pub struct UserId;
}

impl UserId {
    /// 外部入力（パスパラメータ等）からユーザー ID を解釈する
    ///
    /// 前後の空白はトリミングする。空文字列と UUID として解釈できない値は
    /// `field = "user_id"` のバリデーションエラーになる。
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("user_id", "ユーザー ID は必須です"));
        }

        Uuid::parse_str(raw).map(Self::from_uuid).map_err(|_| {
            DomainError::validation("user_id", format!("ユーザー ID の形式が不正です: {raw}"))
        })
    }
}

/// ユーザーエンティティ
///
/// # 不変条件
///
/// - `last_login_at` が `None` のユーザーは一度もログインしていない
/// - 管理者（`is_admin = true`）は非アクティブ整理の対象にならない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id:            UserId,
    username:      String,
    is_admin:      bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at:    DateTime<Utc>,
}

impl User {
    /// 新しい一般ユーザーを作成する
    ///
    /// 作成直後は非管理者・未ログイン。
    pub fn new(id: UserId, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin: false,
            last_login_at: None,
            created_at: now,
        }
    }

    /// データベースからユーザーを復元する
    pub fn from_db(
        id: UserId,
        username: String,
        is_admin: bool,
        last_login_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            is_admin,
            last_login_at,
            created_at,
        }
    }

    /// 管理者権限を付与したユーザーを返す
    pub fn promoted_to_admin(self) -> Self {
        Self {
            is_admin: true,
            ..self
        }
    }

    /// 最終ログイン日時を記録したユーザーを返す
    pub fn logged_in_at(self, at: DateTime<Utc>) -> Self {
        Self {
            last_login_at: Some(at),
            ..self
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
