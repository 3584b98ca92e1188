//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ロジックはユースケースに委譲

pub mod health;
pub mod user_lifecycle;

pub use health::{ReadinessState, health_check, readiness_check};
pub use user_lifecycle::{
    UserLifecycleState,
    delete_user,
    get_user_data_summary,
    preview_inactive_users,
    sweep_inactive_users,
};
