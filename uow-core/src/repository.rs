//! 仓储（Repository）
//!
//! 面向单一聚合类型的门面：持有一个适配器与一个身份映射，负责
//! - 按标识获取实体（先查身份映射，未命中再读存储并登记）；
//! - 暂存新建与删除；
//! - 在存储事务内批量写出（`persist_all`），但不负责提交事务，提交由工作单元完成。
//!
//! 仓储与其所属工作单元共享作用域，作用域结束后所有操作以 `ScopeClosed` 失败。
//!
use crate::adapter::{Adapter, KeyOf};
use crate::entity::{Entity, EntityRef};
use crate::error::{DomainError, DomainResult as Result};
use crate::identity_map::{IdentityMap, Tracked};
use crate::model::Model;
use crate::scope::{Scope, ScopeState};
use crate::storage::StorageSession;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct State<A: Adapter> {
    identity_map: IdentityMap<KeyOf<A>, A::Entity>,
    // 带显式标识创建、尚未插入的实体
    fresh: HashSet<KeyOf<A>>,
    // 本作用域内已发出删除的标识
    deleted: HashSet<KeyOf<A>>,
}

pub struct Repository<A, S>
where
    A: Adapter,
{
    adapter: A,
    session: Arc<S>,
    scope: Scope,
    state: Mutex<State<A>>,
}

impl<A, S> Repository<A, S>
where
    A: Adapter,
    S: StorageSession,
{
    pub fn new(adapter: A, session: Arc<S>, scope: Scope) -> Self {
        Self {
            adapter,
            session,
            scope,
            state: Mutex::new(State {
                identity_map: IdentityMap::new(<A::Model as Model>::TABLE),
                fresh: HashSet::new(),
                deleted: HashSet::new(),
            }),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn table(&self) -> &'static str {
        <A::Model as Model>::TABLE
    }

    /// 当前跟踪的实体数（存活条目与待分配标识的新建实体）
    pub async fn tracked(&self) -> usize {
        self.state.lock().await.identity_map.len()
    }

    /// 获取实体
    ///
    /// 同一作用域内对同一标识的重复获取返回同一实例，且不再访问存储；
    /// 存储中不存在返回 `None`；已在本作用域删除返回 `AlreadyRemoved`。
    pub async fn get(&self, key: &KeyOf<A>) -> Result<Option<EntityRef<A::Entity>>> {
        self.scope.ensure_open()?;
        let mut state = self.state.lock().await;

        if let Some(entity) = state.identity_map.get(key)? {
            debug!(table = self.table(), %key, "identity map hit");
            return Ok(Some(entity));
        }

        debug!(table = self.table(), %key, "identity map miss");
        let Some(model) = self.session.fetch::<A::Model>(key).await? else {
            return Ok(None);
        };
        let entity = EntityRef::new(self.adapter.to_entity(model), self.scope.clone());
        state.identity_map.put(key.clone(), entity.clone())?;
        Ok(Some(entity))
    }

    /// 登记新建实体
    ///
    /// 未携带标识的草稿在持久化时由存储层分配标识；
    /// 已携带标识的草稿直接按该标识登记，持久化时以插入写出。
    pub async fn create(&self, draft: A::Entity) -> Result<EntityRef<A::Entity>> {
        self.scope.ensure_open()?;
        let mut state = self.state.lock().await;

        let key = draft.id().cloned();
        let entity = EntityRef::new(draft, self.scope.clone());
        match key {
            Some(key) => {
                state.identity_map.put(key.clone(), entity.clone())?;
                state.fresh.insert(key);
            }
            None => state.identity_map.stage(entity.clone()),
        }
        Ok(entity)
    }

    /// 标记删除；标识必须已在本作用域内登记
    pub async fn remove(&self, key: &KeyOf<A>) -> Result<()> {
        self.scope.ensure_open()?;
        let mut state = self.state.lock().await;

        state.identity_map.mark_removed(key)?;
        // 尚未插入即被删除，存储层无需任何写入
        if state.fresh.remove(key) {
            state.deleted.insert(key.clone());
        }
        debug!(table = self.table(), %key, "entity marked removed");
        Ok(())
    }

    /// 写出单个被跟踪的实体
    ///
    /// 遇到完整性冲突时回滚存储事务并中止作用域。
    pub async fn persist(&self, entity: &EntityRef<A::Entity>) -> Result<()> {
        self.scope.ensure_open()?;
        let mut state = self.state.lock().await;
        let outcome = self.write_one(&mut state, entity).await;
        self.settle(outcome).await
    }

    /// 在当前存储事务内写出全部变更：插入新建、更新存活、删除墓碑
    ///
    /// 每个墓碑标识在一个作用域内只发出一次删除；本方法可重复调用。
    /// 遇到完整性冲突时回滚存储事务并中止作用域。
    pub async fn persist_all(&self) -> Result<()> {
        self.scope.ensure_open()?;
        let mut state = self.state.lock().await;
        let outcome = self.write_all(&mut state).await;
        self.settle(outcome).await
    }

    // 完整性冲突意味着事务已不可用：先回滚，再让作用域进入终态
    async fn settle(&self, outcome: Result<()>) -> Result<()> {
        let Err(err) = outcome else {
            return Ok(());
        };
        if err.is_integrity_conflict() {
            if let Err(rollback) = self.session.rollback().await {
                warn!(
                    table = self.table(),
                    error = %rollback,
                    "rollback after integrity conflict failed"
                );
            }
            if self.scope.close(ScopeState::Aborted) {
                warn!(
                    table = self.table(),
                    error = %err,
                    "integrity conflict while persisting, scope aborted"
                );
            }
        }
        Err(err)
    }

    async fn write_one(
        &self,
        state: &mut State<A>,
        entity: &EntityRef<A::Entity>,
    ) -> Result<()> {
        let key = entity.cell().read().await.id().cloned();
        match key {
            Some(key) => {
                match state.identity_map.get(&key)? {
                    Some(tracked) if tracked.ptr_eq(entity) => {}
                    _ => return Err(self.unknown(&key)),
                }
                self.write_keyed(state, &key, entity).await.map(|_| ())
            }
            None => {
                if !matches!(state.identity_map.locate(entity), Some(Tracked::Pending)) {
                    return Err(DomainError::UnknownEntity {
                        table: self.table(),
                        key: "<transient>".to_string(),
                    });
                }
                self.insert_pending(state, entity).await.map(|_| ())
            }
        }
    }

    async fn write_all(&self, state: &mut State<A>) -> Result<()> {
        let keyed: Vec<_> = state
            .identity_map
            .entries()
            .map(|(key, entity)| (key.clone(), entity.clone()))
            .collect();
        let (mut inserted, mut updated) = (0usize, 0usize);
        for (key, entity) in &keyed {
            if self.write_keyed(state, key, entity).await? {
                inserted += 1;
            } else {
                updated += 1;
            }
        }

        let pending = state.identity_map.pending().to_vec();
        for entity in &pending {
            self.insert_pending(state, entity).await?;
            inserted += 1;
        }

        let removed: Vec<_> = state
            .identity_map
            .removed_keys()
            .filter(|key| !state.deleted.contains(*key))
            .cloned()
            .collect();
        for key in &removed {
            self.session.delete::<A::Model>(key).await?;
            state.deleted.insert(key.clone());
        }

        debug!(
            table = self.table(),
            inserted,
            updated,
            deleted = removed.len(),
            "repository persisted"
        );
        Ok(())
    }

    /// 写出已登记标识的实体，返回是否为插入
    async fn write_keyed(
        &self,
        state: &mut State<A>,
        key: &KeyOf<A>,
        entity: &EntityRef<A::Entity>,
    ) -> Result<bool> {
        let model = {
            let guard = entity.cell().read().await;
            if guard.id() != Some(key) {
                return Err(self.unknown(key));
            }
            self.adapter.to_model(&guard)
        };

        if state.fresh.contains(key) {
            self.session.insert(model).await?;
            state.fresh.remove(key);
            Ok(true)
        } else {
            self.session.update(model).await?;
            Ok(false)
        }
    }

    /// 插入新建实体，回写存储层分配的标识并移入身份映射
    async fn insert_pending(
        &self,
        state: &mut State<A>,
        entity: &EntityRef<A::Entity>,
    ) -> Result<KeyOf<A>> {
        let model = self.adapter.to_model(&*entity.cell().read().await);
        let key = self.session.insert(model).await?;
        entity.cell().write().await.assign_id(key.clone());
        state.identity_map.promote(key.clone(), entity)?;
        Ok(key)
    }

    fn unknown(&self, key: &KeyOf<A>) -> DomainError {
        DomainError::UnknownEntity {
            table: self.table(),
            key: key.to_string(),
        }
    }
}
