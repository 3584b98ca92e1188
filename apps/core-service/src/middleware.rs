//! # ミドルウェア
//!
//! Core Service 用のミドルウェアを提供する。

mod admin;

pub use admin::{ACTOR_ID_HEADER, AdminActor, AdminGuardState, require_admin};
