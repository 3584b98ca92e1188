//! # 非アクティブユーザーの選定ルール
//!
//! 非アクティブユーザー整理（Sweep）の対象を決める閾値と判定ロジック。
//!
//! ## 選定ルール
//!
//! ユーザーが対象になるのは以下をすべて満たす場合のみ:
//!
//! - 管理者ではない（閾値に関係なく無条件に除外）
//! - 一度もログインしていない、または最終ログインが `now - days` 以前
//!
//! 境界は **含む**（`last_login_at <= cutoff`）。ちょうど `days` 日前に
//! ログインしたユーザーは対象になる。`UserRepository` の SQL 実装は
//! [`InactivityThreshold::is_candidate`] と同じ条件を WHERE 句で表現する。

use chrono::{DateTime, Duration, Utc};

use crate::{DomainError, user::User};

/// 閾値として受け付ける最大日数（100 年）
pub const MAX_INACTIVITY_DAYS: u32 = 36_500;

/// 非アクティブ判定の閾値（日数）
///
/// # 不変条件
///
/// - 1 以上 [`MAX_INACTIVITY_DAYS`] 以下の整数
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InactivityThreshold(u32);

impl InactivityThreshold {
    /// 日数から閾値を作成する
    pub fn new(days: i64) -> Result<Self, DomainError> {
        if days <= 0 {
            return Err(DomainError::validation(
                "days",
                format!("日数は 1 以上である必要があります: {days}"),
            ));
        }

        let days = u32::try_from(days)
            .ok()
            .filter(|d| *d <= MAX_INACTIVITY_DAYS)
            .ok_or_else(|| {
                DomainError::validation(
                    "days",
                    format!("日数は {MAX_INACTIVITY_DAYS} 以下である必要があります: {days}"),
                )
            })?;

        Ok(Self(days))
    }

    /// 文字列表現から閾値を作成する
    ///
    /// 前後の空白はトリミングする。整数として解釈できない値
    /// （空文字列、小数、`"30days"` など）は拒否する。
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("days", "日数は必須です"));
        }

        let days = raw.parse::<i64>().map_err(|_| {
            DomainError::validation("days", format!("日数は整数である必要があります: {raw}"))
        })?;

        Self::new(days)
    }

    pub fn days(&self) -> u32 {
        self.0
    }

    /// この時刻以前に最終ログインしたユーザーが対象になる
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.0))
    }

    /// ユーザーが整理対象かどうかを判定する
    pub fn is_candidate(&self, user: &User, now: DateTime<Utc>) -> bool {
        if user.is_admin() {
            return false;
        }

        match user.last_login_at() {
            None => true,
            Some(last_login_at) => last_login_at <= self.cutoff(now),
        }
    }
}
