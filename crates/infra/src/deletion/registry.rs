//! # CollectionRegistry
//!
//! ユーザースコープのコレクション（テーブル）を削除順に保持する。
//!
//! ## 削除順の制約
//!
//! - 参照元（子）は参照先（親）より先に削除する
//!   （例: `medication_logs` → `medications`）
//! - `users` 自身は常に最後（全コレクションが `user_id` で参照するため）
//!
//! 外部キーは `ON DELETE CASCADE` を使わないため、この順序が崩れると
//! 削除はデータベースの制約違反で失敗し、トランザクションごとロールバックされる。
//! 起動時に [`CollectionRegistry::standard`] が順序を検証し、誤った登録では起動しない。

use std::collections::HashMap;

use itertools::Itertools;
use thiserror::Error;

/// ユーザー行そのものを保持するコレクション名
pub const USERS_COLLECTION: &str = "users";

/// ユーザースコープのコレクション定義
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionDescriptor {
    /// テーブル名
    pub name:         &'static str,
    /// 所有ユーザーを示す列（`users` 自身は `id`）
    pub owner_column: &'static str,
    /// このコレクションが参照する他のユーザースコープのコレクション
    ///
    /// `users` への参照は暗黙なので含めない。
    pub references:   &'static [&'static str],
}

impl CollectionDescriptor {
    /// `user_id` 列で所有されるコレクションを定義する
    pub const fn owned_by_user(name: &'static str) -> Self {
        Self {
            name,
            owner_column: "user_id",
            references: &[],
        }
    }

    /// 参照先コレクションを設定する
    pub const fn referencing(self, references: &'static [&'static str]) -> Self {
        Self { references, ..self }
    }

    /// `users` 自身
    pub const fn users() -> Self {
        Self {
            name:         USERS_COLLECTION,
            owner_column: "id",
            references:   &[],
        }
    }

    pub fn is_users(&self) -> bool {
        self.name == USERS_COLLECTION
    }
}

/// 標準のコレクション一覧（削除順）
const USER_COLLECTIONS: &[CollectionDescriptor] = &[
    CollectionDescriptor::owned_by_user("weight_logs"),
    CollectionDescriptor::owned_by_user("sex_logs"),
    CollectionDescriptor::owned_by_user("menstrual_records"),
    CollectionDescriptor::owned_by_user("exercise_logs"),
    CollectionDescriptor::owned_by_user("daily_logs").referencing(&["daily_items"]),
    CollectionDescriptor::owned_by_user("daily_items"),
    CollectionDescriptor::owned_by_user("stool_logs"),
    CollectionDescriptor::owned_by_user("memos"),
    CollectionDescriptor::owned_by_user("medication_logs").referencing(&["medications"]),
    CollectionDescriptor::owned_by_user("medications"),
    CollectionDescriptor::owned_by_user("loan_repayments").referencing(&["loans"]),
    CollectionDescriptor::owned_by_user("loans"),
    CollectionDescriptor::owned_by_user("transactions").referencing(&["accounts"]),
    CollectionDescriptor::owned_by_user("accounts"),
    CollectionDescriptor::users(),
];

/// レジストリ検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("コレクションが 1 件も登録されていません")]
    Empty,

    #[error("コレクション {0} が重複して登録されています")]
    Duplicate(&'static str),

    #[error("{collection} が未登録のコレクション {referenced} を参照しています")]
    UnknownReference {
        collection: &'static str,
        referenced: &'static str,
    },

    #[error("{collection} は参照先の {referenced} より先に削除する必要があります")]
    ReferenceOrder {
        collection: &'static str,
        referenced: &'static str,
    },

    #[error("users は最後に 1 件だけ登録する必要があります")]
    UsersNotLast,
}

/// 削除順に並んだコレクションのレジストリ
#[derive(Debug, Clone)]
pub struct CollectionRegistry {
    collections: Vec<CollectionDescriptor>,
}

impl CollectionRegistry {
    /// 標準のコレクション一覧からレジストリを生成する
    pub fn standard() -> Result<Self, RegistryError> {
        Self::from_descriptors(USER_COLLECTIONS.to_vec())
    }

    /// 任意のコレクション一覧からレジストリを生成する
    ///
    /// 削除順の制約を満たさない場合はエラーを返す。
    pub fn from_descriptors(collections: Vec<CollectionDescriptor>) -> Result<Self, RegistryError> {
        Self::verify(&collections)?;
        Ok(Self { collections })
    }

    /// 期待されるコレクション名の一覧を返す（登録漏れ検出テスト用）
    pub fn expected_collection_names() -> Vec<&'static str> {
        vec![
            "weight_logs",
            "sex_logs",
            "menstrual_records",
            "exercise_logs",
            "daily_logs",
            "daily_items",
            "stool_logs",
            "memos",
            "medication_logs",
            "medications",
            "loan_repayments",
            "loans",
            "transactions",
            "accounts",
            "users",
        ]
    }

    /// 削除順のコレクション一覧
    pub fn collections(&self) -> &[CollectionDescriptor] {
        &self.collections
    }

    /// 登録済みコレクションの名前一覧を返す
    pub fn registered_names(&self) -> Vec<&'static str> {
        self.collections.iter().map(|c| c.name).collect()
    }

    fn verify(collections: &[CollectionDescriptor]) -> Result<(), RegistryError> {
        let Some(last) = collections.last() else {
            return Err(RegistryError::Empty);
        };

        if let Some(duplicate) = collections.iter().map(|c| c.name).duplicates().next() {
            return Err(RegistryError::Duplicate(duplicate));
        }

        let users_count = collections.iter().filter(|c| c.is_users()).count();
        if !last.is_users() || users_count != 1 {
            return Err(RegistryError::UsersNotLast);
        }

        let positions: HashMap<&str, usize> = collections
            .iter()
            .enumerate()
            .map(|(index, c)| (c.name, index))
            .collect();

        for (index, collection) in collections.iter().enumerate() {
            for &referenced in collection.references {
                let position = positions.get(referenced).copied().ok_or(
                    RegistryError::UnknownReference {
                        collection: collection.name,
                        referenced,
                    },
                )?;

                if position <= index {
                    return Err(RegistryError::ReferenceOrder {
                        collection: collection.name,
                        referenced,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_standardは検証を通過する() {
        let registry = CollectionRegistry::standard().unwrap();

        assert_eq!(
            registry.registered_names(),
            CollectionRegistry::expected_collection_names()
        );
    }

    #[test]
    fn test_standardではusersが最後に並ぶ() {
        let registry = CollectionRegistry::standard().unwrap();

        let last = registry.collections().last().unwrap();
        assert_eq!(last.name, "users");
        assert_eq!(last.owner_column, "id");
    }

    #[test]
    fn test_参照元が参照先より後に並ぶとエラーになる() {
        let collections = vec![
            CollectionDescriptor::owned_by_user("medications"),
            CollectionDescriptor::owned_by_user("medication_logs").referencing(&["medications"]),
            CollectionDescriptor::users(),
        ];

        let error = CollectionRegistry::from_descriptors(collections).unwrap_err();

        assert_eq!(
            error,
            RegistryError::ReferenceOrder {
                collection: "medication_logs",
                referenced: "medications",
            }
        );
    }

    #[test]
    fn test_未登録のコレクションを参照するとエラーになる() {
        let collections = vec![
            CollectionDescriptor::owned_by_user("loan_repayments").referencing(&["loans"]),
            CollectionDescriptor::users(),
        ];

        let error = CollectionRegistry::from_descriptors(collections).unwrap_err();

        assert_eq!(
            error,
            RegistryError::UnknownReference {
                collection: "loan_repayments",
                referenced: "loans",
            }
        );
    }

    #[test]
    fn test_usersが最後でないとエラーになる() {
        let collections = vec![
            CollectionDescriptor::users(),
            CollectionDescriptor::owned_by_user("memos"),
        ];

        let error = CollectionRegistry::from_descriptors(collections).unwrap_err();

        assert_eq!(error, RegistryError::UsersNotLast);
    }

    #[test]
    fn test_usersがない場合もエラーになる() {
        let collections = vec![CollectionDescriptor::owned_by_user("memos")];

        let error = CollectionRegistry::from_descriptors(collections).unwrap_err();

        assert_eq!(error, RegistryError::UsersNotLast);
    }

    #[test]
    fn test_重複登録はエラーになる() {
        let collections = vec![
            CollectionDescriptor::owned_by_user("memos"),
            CollectionDescriptor::owned_by_user("memos"),
            CollectionDescriptor::users(),
        ];

        let error = CollectionRegistry::from_descriptors(collections).unwrap_err();

        assert_eq!(error, RegistryError::Duplicate("memos"));
    }

    #[test]
    fn test_空のレジストリはエラーになる() {
        let error = CollectionRegistry::from_descriptors(Vec::new()).unwrap_err();

        assert_eq!(error, RegistryError::Empty);
    }
}
