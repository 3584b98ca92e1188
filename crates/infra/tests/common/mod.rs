//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシードヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use healthlog_domain::user::UserId;
use sqlx::PgPool;
use uuid::Uuid;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// ユーザーを作成する
pub async fn insert_user(
    pool: &PgPool,
    username: &str,
    is_admin: bool,
    last_login_at: Option<DateTime<Utc>>,
) -> UserId {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO users (id, username, is_admin, last_login_at, created_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(username)
    .bind(is_admin)
    .bind(last_login_at)
    .bind(test_now() - Duration::days(3650))
    .execute(pool)
    .await
    .expect("ユーザー作成に失敗");

    UserId::from_uuid(id)
}

/// `user_id` だけで作成できるコレクションに 1 行追加する
pub async fn insert_owned_row(pool: &PgPool, table: &str, user_id: &UserId) -> Uuid {
    sqlx::query_scalar(&format!(
        "INSERT INTO {table} (user_id) VALUES ($1) RETURNING id"
    ))
    .bind(user_id.as_uuid())
    .fetch_one(pool)
    .await
    .expect("所有行の作成に失敗")
}

/// 親行を参照する子コレクションに 1 行追加する
pub async fn insert_child_row(
    pool: &PgPool,
    table: &str,
    parent_column: &str,
    parent_id: Uuid,
    user_id: &UserId,
) -> Uuid {
    sqlx::query_scalar(&format!(
        "INSERT INTO {table} (user_id, {parent_column}) VALUES ($1, $2) RETURNING id"
    ))
    .bind(user_id.as_uuid())
    .bind(parent_id)
    .fetch_one(pool)
    .await
    .expect("子行の作成に失敗")
}

/// 全 15 コレクションにデータを持つユーザーを作成する
///
/// `users` を除く 14 コレクションに 1 行ずつ作成する。
pub async fn insert_user_with_full_data(pool: &PgPool, username: &str) -> UserId {
    let user_id = insert_user(pool, username, false, None).await;

    for table in [
        "weight_logs",
        "sex_logs",
        "menstrual_records",
        "exercise_logs",
        "stool_logs",
        "memos",
    ] {
        insert_owned_row(pool, table, &user_id).await;
    }

    let item = insert_owned_row(pool, "daily_items", &user_id).await;
    insert_child_row(pool, "daily_logs", "item_id", item, &user_id).await;

    let medication = insert_owned_row(pool, "medications", &user_id).await;
    insert_child_row(pool, "medication_logs", "medication_id", medication, &user_id).await;

    let loan = insert_owned_row(pool, "loans", &user_id).await;
    insert_child_row(pool, "loan_repayments", "loan_id", loan, &user_id).await;

    let account = insert_owned_row(pool, "accounts", &user_id).await;
    insert_child_row(pool, "transactions", "account_id", account, &user_id).await;

    user_id
}

/// 指定ユーザーが所有する行数をテーブルごとに数える
pub async fn count_rows(pool: &PgPool, table: &str, user_id: &UserId) -> i64 {
    let column = if table == "users" { "id" } else { "user_id" };
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM {table} WHERE {column} = $1"
    ))
    .bind(user_id.as_uuid())
    .fetch_one(pool)
    .await
    .expect("件数の取得に失敗")
}
