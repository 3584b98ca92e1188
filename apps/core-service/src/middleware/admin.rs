//! # 管理者ガードミドルウェア
//!
//! 上流のゲートウェイが認証済みユーザー ID を `X-Actor-Id` ヘッダーで転送してくる。
//! このミドルウェアはその ID をユーザーリポジトリで解決し、管理者であることを確認してから
//! ライフサイクル API のハンドラーに到達させる。
//!
//! | 状況 | レスポンス |
//! |------|-----------|
//! | ヘッダーがない / UUID として解釈できない | 401 Unauthorized |
//! | ユーザーが存在しない / 管理者ではない | 403 Forbidden |
//! | ユーザーの取得に失敗 | 500 Internal Server Error |
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! let guard = AdminGuardState { user_repository };
//!
//! Router::new()
//!     .route("/internal/admin/users/{user_id}", delete(delete_user))
//!     .layer(from_fn_with_state(guard, require_admin))
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use healthlog_domain::user::UserId;
use healthlog_infra::repository::UserRepository;

use crate::error::CoreError;

/// 操作者のユーザー ID を運ぶヘッダー名
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// 管理者であることを確認済みの操作者
///
/// リクエスト extensions に挿入され、ハンドラーから `Extension<AdminActor>` で取り出す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminActor {
    pub user_id: UserId,
}

/// 管理者ガードの状態
#[derive(Clone)]
pub struct AdminGuardState {
    pub user_repository: Arc<dyn UserRepository>,
}

/// 管理者ガードミドルウェア
pub async fn require_admin(
    State(state): State<AdminGuardState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(actor_id) = request
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| UserId::parse(value).ok())
    else {
        return CoreError::Unauthorized("操作者を特定できません".to_string()).into_response();
    };

    let actor = match state.user_repository.find_by_id(&actor_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(actor_id = %actor_id, "存在しないユーザーからの管理操作を拒否");
            return CoreError::Forbidden("この操作を実行する権限がありません".to_string())
                .into_response();
        }
        Err(e) => return CoreError::Database(e).into_response(),
    };

    if !actor.is_admin() {
        tracing::warn!(actor_id = %actor_id, "管理者ではないユーザーからの管理操作を拒否");
        return CoreError::Forbidden("この操作を実行する権限がありません".to_string())
            .into_response();
    }

    request.extensions_mut().insert(AdminActor { user_id: actor_id });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        Router,
        http::{Method, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use chrono::{DateTime, Utc};
    use healthlog_domain::user::User;
    use healthlog_infra::mock::InMemoryUserStore;
    use tower::ServiceExt;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// 挿入された操作者 ID をそのまま返すテスト用ハンドラ
    async fn echo_actor(Extension(actor): Extension<AdminActor>) -> String {
        actor.user_id.to_string()
    }

    fn create_test_app(store: &InMemoryUserStore) -> Router {
        let guard = AdminGuardState {
            user_repository: Arc::new(store.clone()),
        };

        Router::new()
            .route("/test", get(echo_actor))
            .layer(from_fn_with_state(guard, require_admin))
    }

    fn request_with_actor(actor_id: Option<&str>) -> Request<Body> {
        let builder = Request::builder().method(Method::GET).uri("/test");
        let builder = match actor_id {
            Some(id) => builder.header(ACTOR_ID_HEADER, id),
            None => builder,
        };
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_管理者はリクエストが通過し操作者がextensionに入る() {
        // Given
        let store = InMemoryUserStore::new();
        let admin_id = UserId::new();
        store.insert_user(User::new(admin_id.clone(), "admin", now()).promoted_to_admin());
        let sut = create_test_app(&store);

        // When
        let response = sut
            .oneshot(request_with_actor(Some(&admin_id.to_string())))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, admin_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_ヘッダーがない場合は401を返す() {
        // Given
        let sut = create_test_app(&InMemoryUserStore::new());

        // When
        let response = sut.oneshot(request_with_actor(None)).await.unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_uuidでないヘッダーは401を返す() {
        // Given
        let sut = create_test_app(&InMemoryUserStore::new());

        // When
        let response = sut
            .oneshot(request_with_actor(Some("not-a-uuid")))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_存在しないユーザーは403を返す() {
        // Given
        let sut = create_test_app(&InMemoryUserStore::new());

        // When
        let response = sut
            .oneshot(request_with_actor(Some(&UserId::new().to_string())))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_一般ユーザーは403を返す() {
        // Given
        let store = InMemoryUserStore::new();
        let user_id = UserId::new();
        store.insert_user(User::new(user_id.clone(), "user", now()));
        let sut = create_test_app(&store);

        // When
        let response = sut
            .oneshot(request_with_actor(Some(&user_id.to_string())))
            .await
            .unwrap();

        // Then
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
