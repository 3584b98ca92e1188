//! # Core Service 設定
//!
//! 環境変数から Core Service サーバーの設定を読み込む。

use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Core Service サーバーの設定
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// 接続プールの最大接続数
    pub database_max_connections: u32,
    /// 削除トランザクション内のステートメントタイムアウト
    pub deletion_statement_timeout: Duration,
    /// 起動時にマイグレーションを適用するか
    pub run_migrations: bool,
}

impl CoreConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を読み込む
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            host: lookup("CORE_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse("CORE_PORT", required("CORE_PORT")?)?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .map(|v| parse("DATABASE_MAX_CONNECTIONS", v))
                .transpose()?
                .unwrap_or(10),
            deletion_statement_timeout: Duration::from_millis(
                lookup("DELETION_STATEMENT_TIMEOUT_MS")
                    .map(|v| parse("DELETION_STATEMENT_TIMEOUT_MS", v))
                    .transpose()?
                    .unwrap_or(30_000),
            ),
            run_migrations: lookup("RUN_MIGRATIONS")
                .map(|v| parse("RUN_MIGRATIONS", v))
                .transpose()?
                .unwrap_or(true),
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
