//! # Healthlog ドメイン層
//!
//! ユーザーデータのライフサイクル（削除・非アクティブユーザー整理）に関わる
//! ドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）に一切依存しない。
//! 削除対象の選定ルールや削除単位の不変条件はここで完結させ、
//! SQL 側はその写像として実装する。
//!
//! ## モジュール構成
//!
//! - [`user`] - ユーザー ID とユーザーエンティティ
//! - [`inactivity`] - 非アクティブ判定の閾値と選定ルール
//! - [`deletion`] - 削除単位（Deletion Unit）と削除フェーズの状態遷移
//! - [`clock`] - 現在時刻の抽象化
//! - [`error`] - ドメインエラー
//!
//! ## 使用例
//!
//! ```rust
//! use healthlog_domain::{deletion::DeletionUnit, user::UserId};
//!
//! let user_id = UserId::new();
//! let unit = DeletionUnit::single(user_id.clone());
//! assert_eq!(unit.len(), 1);
//! assert!(unit.contains(&user_id));
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod deletion;
pub mod error;
pub mod inactivity;
pub mod user;

pub use error::DomainError;
