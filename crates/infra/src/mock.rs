//! # テスト用インメモリストア
//!
//! ユースケース・ハンドラテストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! healthlog-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! [`InMemoryUserStore`] は [`UserRepository`] と [`DeletionStore`] の両方を実装し、
//! 同じデータを共有する。トランザクションは開始時点のスナップショットに対して
//! 変更を加え、コミット時にのみ反映する。

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healthlog_domain::{
    inactivity::InactivityThreshold,
    user::{User, UserId},
};
use uuid::Uuid;

use crate::{
    deletion::{CollectionDescriptor, DeletionStore, DeletionTransaction, LockCondition},
    error::InfraError,
    repository::UserRepository,
};

#[derive(Clone, Default)]
struct StoreData {
    users: BTreeMap<UserId, User>,
    /// コレクション名 → 各行の所有ユーザー
    rows:  BTreeMap<&'static str, Vec<Uuid>>,
}

impl StoreData {
    fn count_owned(&self, collection: &CollectionDescriptor, user_ids: &[Uuid]) -> u64 {
        if collection.is_users() {
            return self
                .users
                .keys()
                .filter(|id| user_ids.contains(id.as_uuid()))
                .count() as u64;
        }

        self.rows
            .get(collection.name)
            .map(|owners| owners.iter().filter(|o| user_ids.contains(*o)).count() as u64)
            .unwrap_or(0)
    }
}

#[derive(Default)]
struct StoreState {
    data:           StoreData,
    fail_on_delete: Option<&'static str>,
    steps:          Vec<String>,
}

/// テスト用のインメモリユーザーストア
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.state
            .lock()
            .unwrap()
            .data
            .users
            .insert(user.id().clone(), user);
    }

    /// 指定ユーザーが所有する行を `count` 件追加する
    pub fn insert_rows(&self, collection: &'static str, owner: &UserId, count: usize) {
        let mut state = self.state.lock().unwrap();
        let rows = state.data.rows.entry(collection).or_default();
        rows.extend(std::iter::repeat_n(*owner.as_uuid(), count));
    }

    pub fn user_exists(&self, id: &UserId) -> bool {
        self.state.lock().unwrap().data.users.contains_key(id)
    }

    /// 指定ユーザーが所有する行数（`users` 以外の全コレクションの合計）
    pub fn total_rows_owned_by(&self, id: &UserId) -> usize {
        self.state
            .lock()
            .unwrap()
            .data
            .rows
            .values()
            .map(|owners| owners.iter().filter(|o| *o == id.as_uuid()).count())
            .sum()
    }

    /// 指定コレクションの削除で失敗させる
    pub fn fail_on_delete(&self, collection: &'static str) {
        self.state.lock().unwrap().fail_on_delete = Some(collection);
    }

    /// これまでに実行された削除ステップ
    ///
    /// `"lock:users"`、`"delete:<collection>"`、`"commit"`、`"rollback"` を実行順に返す。
    pub fn executed_steps(&self) -> Vec<String> {
        self.state.lock().unwrap().steps.clone()
    }

    fn record(&self, step: impl Into<String>) {
        self.state.lock().unwrap().steps.push(step.into());
    }
}

#[async_trait]
impl UserRepository for InMemoryUserStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self.state.lock().unwrap().data.users.get(id).cloned())
    }

    async fn find_inactive_candidates(
        &self,
        threshold: InactivityThreshold,
        now: DateTime<Utc>,
    ) -> Result<Vec<UserId>, InfraError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .data
            .users
            .values()
            .filter(|user| threshold.is_candidate(user, now))
            .map(|user| user.id().clone())
            .collect())
    }
}

#[async_trait]
impl DeletionStore for InMemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn DeletionTransaction>, InfraError> {
        let working = self.state.lock().unwrap().data.clone();
        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            working,
        }))
    }

    async fn count_owned(
        &self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .data
            .count_owned(collection, user_ids))
    }
}

struct InMemoryTransaction {
    store:   InMemoryUserStore,
    working: StoreData,
}

#[async_trait]
impl DeletionTransaction for InMemoryTransaction {
    async fn lock_users(
        &mut self,
        user_ids: &[Uuid],
        condition: &LockCondition,
    ) -> Result<Vec<Uuid>, InfraError> {
        self.store.record("lock:users");
        Ok(self
            .working
            .users
            .values()
            .filter(|user| user_ids.contains(user.id().as_uuid()) && condition.admits(user))
            .map(|user| *user.id().as_uuid())
            .collect())
    }

    async fn delete_owned(
        &mut self,
        collection: &CollectionDescriptor,
        user_ids: &[Uuid],
    ) -> Result<u64, InfraError> {
        self.store.record(format!("delete:{}", collection.name));

        let fail_on = self.store.state.lock().unwrap().fail_on_delete;
        if fail_on == Some(collection.name) {
            return Err(InfraError::unexpected(format!(
                "{} の削除に失敗しました（テスト用）",
                collection.name
            )));
        }

        let deleted = self.working.count_owned(collection, user_ids);
        if collection.is_users() {
            self.working
                .users
                .retain(|id, _| !user_ids.contains(id.as_uuid()));
        } else if let Some(owners) = self.working.rows.get_mut(collection.name) {
            owners.retain(|owner| !user_ids.contains(owner));
        }

        Ok(deleted)
    }

    async fn commit(self: Box<Self>) -> Result<(), InfraError> {
        let Self { store, working } = *self;
        store.record("commit");
        store.state.lock().unwrap().data = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), InfraError> {
        self.store.record("rollback");
        Ok(())
    }
}
