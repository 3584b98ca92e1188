//! # Core Service アプリケーション構築
//!
//! State の初期化とルーター構築を担当する。
//! `main.rs` はインフラ初期化とサーバー起動に集中する。

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use healthlog_domain::clock::Clock;
use healthlog_infra::{deletion::UserDataDeletionExecutor, repository::UserRepository};
use healthlog_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    handler::{
        ReadinessState,
        UserLifecycleState,
        delete_user,
        get_user_data_summary,
        health_check,
        preview_inactive_users,
        readiness_check,
        sweep_inactive_users,
    },
    middleware::{AdminGuardState, require_admin},
    usecase::UserLifecycleUseCaseImpl,
};

/// 管理者向けライフサイクル API のルーター
///
/// すべてのルートに管理者ガードを適用する。
pub fn lifecycle_routes(state: Arc<UserLifecycleState>, guard: AdminGuardState) -> Router {
    Router::new()
        .route(
            "/internal/admin/users/cleanup-inactive",
            post(sweep_inactive_users),
        )
        .route(
            "/internal/admin/users/cleanup-inactive/preview",
            post(preview_inactive_users),
        )
        .route("/internal/admin/users/{user_id}", delete(delete_user))
        .route(
            "/internal/admin/users/{user_id}/data",
            get(get_user_data_summary),
        )
        .layer(from_fn_with_state(guard, require_admin))
        .with_state(state)
}

/// ヘルスチェックのルーター
pub fn health_routes(readiness_state: Arc<ReadinessState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state)
}

/// State の組み立てとルーター定義を行う
///
/// インフラ初期化済みの依存を受け取り、ユースケース → State → Router の
/// 順に組み立てる。
pub fn build_app(
    user_repository: Arc<dyn UserRepository>,
    executor: Arc<UserDataDeletionExecutor>,
    clock: Arc<dyn Clock>,
    readiness_state: Arc<ReadinessState>,
) -> Router {
    let guard = AdminGuardState {
        user_repository: user_repository.clone(),
    };

    let lifecycle_state = Arc::new(UserLifecycleState {
        usecase: UserLifecycleUseCaseImpl::new(user_repository, executor, clock),
    });

    let router = Router::new()
        .merge(health_routes(readiness_state))
        .merge(lifecycle_routes(lifecycle_state, guard));

    with_request_tracing(router)
}

/// Request ID とリクエストトレースのレイヤーを適用する
///
/// 下に書いたレイヤーほど外側で実行される。
/// 1. `SetRequestIdLayer`: UUID v7 を生成（クライアント提供値があればそれを使用）
/// 2. `TraceLayer`: `request_id` を含むスパンを作成し、全ログに付与
/// 3. `PropagateRequestIdLayer`: レスポンスヘッダーに `X-Request-Id` をコピー
pub fn with_request_tracing(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
