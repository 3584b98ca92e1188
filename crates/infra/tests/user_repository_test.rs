//! PostgresUserRepository 統合テスト
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p healthlog-infra --test user_repository_test
//! ```

mod common;

use chrono::Duration;
use common::{insert_user, test_now};
use healthlog_domain::{inactivity::InactivityThreshold, user::UserId};
use healthlog_infra::repository::{PostgresUserRepository, UserRepository};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_by_idでユーザーを取得できる(pool: PgPool) {
    let id = insert_user(&pool, "alice", true, Some(test_now())).await;
    let sut = PostgresUserRepository::new(pool);

    let user = sut.find_by_id(&id).await.unwrap().unwrap();

    assert_eq!(user.id(), &id);
    assert_eq!(user.username(), "alice");
    assert!(user.is_admin());
    assert_eq!(user.last_login_at(), Some(test_now()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_by_idで存在しないidはnoneを返す(pool: PgPool) {
    let sut = PostgresUserRepository::new(pool);

    let user = sut.find_by_id(&UserId::new()).await.unwrap();

    assert!(user.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_非アクティブ候補は境界を含み管理者を除外する(pool: PgPool) {
    let now = test_now();
    let exactly_30 = insert_user(&pool, "exactly30", false, Some(now - Duration::days(30))).await;
    let days_31 = insert_user(&pool, "days31", false, Some(now - Duration::days(31))).await;
    let never = insert_user(&pool, "never", false, None).await;
    insert_user(&pool, "days29", false, Some(now - Duration::days(29))).await;
    insert_user(&pool, "admin", true, Some(now - Duration::days(100))).await;
    insert_user(&pool, "admin_never", true, None).await;
    let sut = PostgresUserRepository::new(pool);

    let candidates = sut
        .find_inactive_candidates(InactivityThreshold::new(30).unwrap(), now)
        .await
        .unwrap();

    let mut expected = vec![exactly_30, days_31, never];
    expected.sort();
    assert_eq!(candidates, expected);
}
