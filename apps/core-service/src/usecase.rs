//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリと削除実行者を `Arc` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `user_lifecycle`: ユーザー削除・非アクティブユーザー整理

pub mod user_lifecycle;

pub use user_lifecycle::{
    DaysInput,
    DeleteUserOutput,
    SweepOutput,
    SweepPreview,
    UserDataSummary,
    UserLifecycleUseCaseImpl,
};
