//! # Core Service ライブラリ
//!
//! ユーザーデータのライフサイクル（削除・非アクティブユーザー整理）を扱う
//! 内部サービスのユースケース、ハンドラ、ルーター構築を公開する。

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod usecase;
