//! 内存版存储（InMemoryStore / InMemorySession）
//!
//! `InMemoryStore` 持有已提交数据与各表自增序列，可在多个会话间共享；
//! `InMemorySession` 对应一个事务：写入先暂存在会话内，提交时在存储锁内整体校验并应用，
//! 回滚时直接丢弃。典型用途：测试环境、示例与本地开发。
//!
//! 行以 `serde_json::Value` 保存，主键为标识的 `Display` 形式。
//!
use super::StorageSession;
use super::constraint::{Rows, Tables};
use crate::config::StoreConfig;
use crate::entity::IdentityKey;
use crate::error::{StorageError, StorageResult as Result};
use crate::model::Model;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

type RowId = (String, String);

#[derive(Debug, Default)]
struct Committed {
    tables: Tables,
    sequences: HashMap<String, u64>,
}

/// 多会话共享的内存存储
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    committed: Arc<Mutex<Committed>>,
    config: Arc<StoreConfig>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            committed: Arc::new(Mutex::new(Committed::default())),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// 开启一个新会话（事务）
    pub fn session(&self) -> InMemorySession {
        InMemorySession {
            store: self.clone(),
            staged: Mutex::new(Staged::default()),
        }
    }

    /// 读取已提交数据（不经过任何会话）
    pub async fn load<M: Model>(&self, key: &M::Key) -> Result<Option<M>> {
        let committed = self.committed.lock().await;
        let row = committed
            .tables
            .get(M::TABLE)
            .and_then(|rows| rows.get(&key.to_string()))
            .cloned();
        Ok(row.map(serde_json::from_value).transpose()?)
    }

    /// 已提交的行数
    pub async fn count(&self, table: &str) -> usize {
        let committed = self.committed.lock().await;
        committed.tables.get(table).map_or(0, BTreeMap::len)
    }

    fn check_row(&self, table: &str, rows: &Rows, key: &str, row: &Value) -> Result<()> {
        for constraint in self.config.constraints_for(table) {
            constraint.check_row(rows, key, row)?;
        }
        Ok(())
    }

    fn next_key<K: IdentityKey>(
        &self,
        sequences: &mut HashMap<String, u64>,
        table: &str,
        rows: &Rows,
    ) -> Result<K> {
        let seq = sequences
            .entry(table.to_string())
            .or_insert(self.config.sequence_start());
        loop {
            let exhausted = || StorageError::backend(format!("sequence exhausted: {table}"));
            let candidate = K::from_sequence(*seq).ok_or_else(exhausted)?;
            *seq = seq.checked_add(1).ok_or_else(exhausted)?;
            if !rows.contains_key(&candidate.to_string()) {
                return Ok(candidate);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Staged {
    // None 表示删除
    writes: BTreeMap<RowId, Option<Value>>,
    inserted: HashSet<RowId>,
}

impl Staged {
    /// 本事务可见的单表数据：已提交数据叠加暂存写入
    fn view(&self, committed: &Tables, table: &str) -> Rows {
        let mut rows = committed.get(table).cloned().unwrap_or_default();
        for ((t, key), write) in &self.writes {
            if t != table {
                continue;
            }
            match write {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        rows
    }

    fn apply(&self, committed: &Tables) -> Tables {
        let mut tables = committed.clone();
        for ((table, key), write) in &self.writes {
            let rows = tables.entry(table.clone()).or_default();
            match write {
                Some(row) => {
                    rows.insert(key.clone(), row.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        tables
    }

    fn clear(&mut self) {
        self.writes.clear();
        self.inserted.clear();
    }
}

/// 内存存储上的一个事务
#[derive(Debug)]
pub struct InMemorySession {
    store: InMemoryStore,
    staged: Mutex<Staged>,
}

impl InMemorySession {
    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }

    /// 尚未提交的写入数
    pub async fn staged_writes(&self) -> usize {
        self.staged.lock().await.writes.len()
    }
}

#[async_trait]
impl StorageSession for InMemorySession {
    async fn fetch<M: Model>(&self, key: &M::Key) -> Result<Option<M>> {
        let staged = self.staged.lock().await;
        let id = (M::TABLE.to_string(), key.to_string());
        let row = match staged.writes.get(&id) {
            Some(write) => write.clone(),
            None => {
                let committed = self.store.committed.lock().await;
                committed
                    .tables
                    .get(M::TABLE)
                    .and_then(|rows| rows.get(&id.1))
                    .cloned()
            }
        };
        Ok(row.map(serde_json::from_value).transpose()?)
    }

    async fn insert<M: Model>(&self, mut model: M) -> Result<M::Key> {
        let mut staged = self.staged.lock().await;
        let mut guard = self.store.committed.lock().await;
        let committed = &mut *guard;
        let rows = staged.view(&committed.tables, M::TABLE);

        let key = match model.key() {
            Some(key) => key.clone(),
            None => self
                .store
                .next_key::<M::Key>(&mut committed.sequences, M::TABLE, &rows)?,
        };
        let key_str = key.to_string();
        if rows.contains_key(&key_str) {
            return Err(StorageError::conflict(format!(
                "duplicate key: {}.{key_str}",
                M::TABLE
            )));
        }

        model.set_key(key.clone());
        let row = serde_json::to_value(&model)?;
        self.store.check_row(M::TABLE, &rows, &key_str, &row)?;

        let id = (M::TABLE.to_string(), key_str);
        // 覆盖本事务内删除的已提交行时按更新对账
        if !matches!(staged.writes.get(&id), Some(None)) {
            staged.inserted.insert(id.clone());
        }
        staged.writes.insert(id, Some(row));
        trace!(table = M::TABLE, %key, "staged insert");
        Ok(key)
    }

    async fn update<M: Model>(&self, model: M) -> Result<()> {
        let Some(key) = model.key() else {
            return Err(StorageError::backend(format!(
                "update without key: {}",
                M::TABLE
            )));
        };
        let key_str = key.to_string();

        let mut staged = self.staged.lock().await;
        let committed = self.store.committed.lock().await;
        let rows = staged.view(&committed.tables, M::TABLE);
        if !rows.contains_key(&key_str) {
            return Err(StorageError::backend(format!(
                "no such row: {}.{key_str}",
                M::TABLE
            )));
        }

        let row = serde_json::to_value(&model)?;
        self.store.check_row(M::TABLE, &rows, &key_str, &row)?;
        staged
            .writes
            .insert((M::TABLE.to_string(), key_str), Some(row));
        trace!(table = M::TABLE, %key, "staged update");
        Ok(())
    }

    async fn delete<M: Model>(&self, key: &M::Key) -> Result<()> {
        let id = (M::TABLE.to_string(), key.to_string());

        let mut staged = self.staged.lock().await;
        let committed = self.store.committed.lock().await;
        let rows = staged.view(&committed.tables, M::TABLE);
        if !rows.contains_key(&id.1) {
            return Err(StorageError::backend(format!(
                "no such row: {}.{}",
                M::TABLE,
                id.1
            )));
        }

        // 本事务内插入又删除的行无需落到已提交数据
        if staged.inserted.remove(&id) {
            staged.writes.remove(&id);
        } else {
            staged.writes.insert(id, None);
        }
        trace!(table = M::TABLE, %key, "staged delete");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut staged = self.staged.lock().await;
        let mut committed = self.store.committed.lock().await;
        if staged.writes.is_empty() {
            return Ok(());
        }

        // 与其它会话已提交的数据对账：主键重复、被并发删除的行
        for (id, write) in &staged.writes {
            let (table, key) = id;
            let exists = committed
                .tables
                .get(table)
                .is_some_and(|rows| rows.contains_key(key));
            let inserted = staged.inserted.contains(id);
            if inserted && exists {
                return Err(StorageError::conflict(format!(
                    "duplicate key: {table}.{key}"
                )));
            }
            if !inserted && !exists {
                let op = if write.is_some() { "update" } else { "delete" };
                return Err(StorageError::conflict(format!(
                    "{op} of vanished row: {table}.{key}"
                )));
            }
        }

        let next = staged.apply(&committed.tables);
        for constraint in self.store.config.constraints() {
            constraint.check(&next)?;
        }

        committed.tables = next;
        let writes = staged.writes.len();
        staged.clear();
        debug!(writes, "in-memory transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut staged = self.staged.lock().await;
        let discarded = staged.writes.len();
        staged.clear();
        debug!(discarded, "in-memory transaction rolled back");
        Ok(())
    }

    fn discard(&self) {
        match self.staged.try_lock() {
            Ok(mut staged) => {
                let discarded = staged.writes.len();
                staged.clear();
                debug!(discarded, "in-memory transaction discarded");
            }
            Err(_) => warn!("staged writes busy, discard skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Constraint;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct UserRow {
        id: Option<i64>,
        email: String,
    }

    impl Model for UserRow {
        const TABLE: &'static str = "users";
        type Key = i64;

        fn key(&self) -> Option<&Self::Key> {
            self.id.as_ref()
        }

        fn set_key(&mut self, key: Self::Key) {
            self.id = Some(key);
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ItemRow {
        id: Option<i64>,
        owner_id: i64,
    }

    impl Model for ItemRow {
        const TABLE: &'static str = "items";
        type Key = i64;

        fn key(&self) -> Option<&Self::Key> {
            self.id.as_ref()
        }

        fn set_key(&mut self, key: Self::Key) {
            self.id = Some(key);
        }
    }

    fn user(id: Option<i64>, email: &str) -> UserRow {
        UserRow {
            id,
            email: email.into(),
        }
    }

    fn store_with_constraints() -> InMemoryStore {
        InMemoryStore::new(
            StoreConfig::builder()
                .constraints(vec![
                    Constraint::unique("users", "email"),
                    Constraint::foreign_key("items", "owner_id", "users"),
                ])
                .build(),
        )
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryStore::default();
        let session = store.session();

        let key = session.insert(user(None, "a@x.io")).await.unwrap();
        assert_eq!(key, 1);
        assert_eq!(
            session.fetch::<UserRow>(&key).await.unwrap(),
            Some(user(Some(1), "a@x.io"))
        );
        assert_eq!(store.load::<UserRow>(&key).await.unwrap(), None);

        session.commit().await.unwrap();
        assert_eq!(store.count("users").await, 1);
        assert_eq!(session.staged_writes().await, 0);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = InMemoryStore::default();
        let session = store.session();
        session.insert(user(None, "a@x.io")).await.unwrap();
        session.rollback().await.unwrap();
        session.commit().await.unwrap();
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn sequence_skips_explicit_keys() {
        let store = InMemoryStore::default();
        let session = store.session();
        session.insert(user(Some(1), "a@x.io")).await.unwrap();
        let minted = session.insert(user(None, "b@x.io")).await.unwrap();
        assert_eq!(minted, 2);

        let dup = session.insert(user(Some(2), "c@x.io")).await.unwrap_err();
        assert!(matches!(dup, StorageError::IntegrityConflict { .. }));
    }

    #[tokio::test]
    async fn unique_violation_reported_at_write() {
        let store = store_with_constraints();
        let session = store.session();
        session.insert(user(None, "a@x.io")).await.unwrap();
        let err = session.insert(user(None, "a@x.io")).await.unwrap_err();
        assert!(matches!(err, StorageError::IntegrityConflict { .. }));
    }

    #[tokio::test]
    async fn foreign_key_is_deferred_to_commit() {
        let store = store_with_constraints();
        let session = store.session();

        // 子记录先于父记录写入也可以，只要提交时引用成立
        session
            .insert(ItemRow {
                id: None,
                owner_id: 1,
            })
            .await
            .unwrap();
        session.insert(user(None, "a@x.io")).await.unwrap();
        session.commit().await.unwrap();

        session.delete::<UserRow>(&1).await.unwrap();
        let err = session.commit().await.unwrap_err();
        assert!(matches!(err, StorageError::IntegrityConflict { .. }));
        session.rollback().await.unwrap();
        assert_eq!(store.count("users").await, 1);
    }

    #[tokio::test]
    async fn concurrent_sessions_conflict_on_commit() {
        let store = store_with_constraints();
        let first = store.session();
        let second = store.session();

        first.insert(user(None, "same@x.io")).await.unwrap();
        second.insert(user(None, "same@x.io")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(matches!(err, StorageError::IntegrityConflict { .. }));
    }

    #[tokio::test]
    async fn insert_then_delete_in_one_transaction_leaves_nothing() {
        let store = InMemoryStore::default();
        let session = store.session();
        let key = session.insert(user(None, "a@x.io")).await.unwrap();
        session.delete::<UserRow>(&key).await.unwrap();
        assert_eq!(session.staged_writes().await, 0);
        session.commit().await.unwrap();
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn update_and_delete_require_existing_row() {
        let store = InMemoryStore::default();
        let session = store.session();
        let err = session.update(user(Some(9), "a@x.io")).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
        let err = session.delete::<UserRow>(&9).await.unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
    }

    #[tokio::test]
    async fn reinsert_after_delete_overwrites_committed_row() {
        let store = InMemoryStore::default();
        let seed = store.session();
        seed.insert(user(None, "old@x.io")).await.unwrap();
        seed.commit().await.unwrap();

        let session = store.session();
        session.delete::<UserRow>(&1).await.unwrap();
        session.insert(user(Some(1), "new@x.io")).await.unwrap();
        session.commit().await.unwrap();

        assert_eq!(
            store.load::<UserRow>(&1).await.unwrap(),
            Some(user(Some(1), "new@x.io"))
        );

        session.delete::<UserRow>(&1).await.unwrap();
        session.commit().await.unwrap();
        assert_eq!(store.count("users").await, 0);
    }

    #[tokio::test]
    async fn discard_drops_staged_writes() {
        let store = InMemoryStore::default();
        let session = store.session();
        session.insert(user(None, "a@x.io")).await.unwrap();

        session.discard();
        assert_eq!(session.staged_writes().await, 0);
        session.commit().await.unwrap();
        assert_eq!(store.count("users").await, 0);
    }
}
