//! # Core Service サーバー
//!
//! ユーザーデータのライフサイクル（削除・非アクティブユーザー整理）を扱う内部サービス。
//!
//! ## アクセス制御
//!
//! Core Service は内部ネットワークからのみアクセス可能とする。
//! 上流のゲートウェイが認証した操作者の ID を `X-Actor-Id` ヘッダーで受け取り、
//! 管理者であることを確認してから処理する。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | 接続プールの最大接続数（デフォルト: `10`） |
//! | `DELETION_STATEMENT_TIMEOUT_MS` | No | 削除トランザクション内のステートメントタイムアウト（デフォルト: `30000`） |
//! | `RUN_MIGRATIONS` | No | 起動時にマイグレーションを適用するか（デフォルト: `true`） |
//! | `LOG_FORMAT` | No | ログ出力形式（`json` / `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（.env ファイルを使用）
//! cargo run -p healthlog-core-service
//!
//! # 本番環境
//! CORE_PORT=3001 DATABASE_URL=postgres://... cargo run -p healthlog-core-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use healthlog_core_service::{
    app_builder::build_app,
    config::CoreConfig,
    handler::ReadinessState,
};
use healthlog_domain::clock::SystemClock;
use healthlog_infra::{
    db,
    deletion::{CollectionRegistry, PgDeletionStore, UserDataDeletionExecutor},
    repository::PostgresUserRepository,
};
use healthlog_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Core Service サーバーのエントリーポイント
///
/// 以下の順序で初期化を行う:
///
/// 1. 環境変数の読み込み（.env ファイル）
/// 2. トレーシングの初期化
/// 3. アプリケーション設定の読み込み
/// 4. データベース接続とマイグレーション
/// 5. 削除対象コレクションの検証
/// 6. ルーターの構築と HTTP サーバーの起動
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("core-service"));
    let _tracing_guard = tracing::info_span!("app", service = "core-service").entered();

    let config = CoreConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("データベースへの接続に失敗しました")?;

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションの適用に失敗しました")?;
        tracing::info!("マイグレーションを適用しました");
    }

    // 削除順序が不正なレジストリでは起動しない
    let registry = CollectionRegistry::standard().context("削除対象コレクションの定義が不正です")?;
    tracing::info!(
        collections = registry.collections().len(),
        "削除対象コレクションを検証しました"
    );

    let deletion_store = PgDeletionStore::new(pool.clone())
        .with_statement_timeout(config.deletion_statement_timeout);
    let executor = Arc::new(UserDataDeletionExecutor::new(
        Arc::new(deletion_store),
        registry,
    ));
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let readiness_state = Arc::new(ReadinessState { pool });

    let app = build_app(
        user_repository,
        executor,
        Arc::new(SystemClock),
        readiness_state,
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("バインドアドレスが不正です")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
