//! # Healthlog インフラ層
//!
//! PostgreSQL との接続と、ユーザーデータ削除の実行を担当するインフラストラクチャ層。
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層に依存しない。
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プール、マイグレーション、疎通確認
//! - [`deletion`] - コレクションレジストリと削除計画の実行
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - ユーザーの読み取り
//! - `mock` - テスト用インメモリストア（`test-utils` feature）

pub mod db;
pub mod deletion;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod repository;

pub use error::InfraError;
