//! 存储会话（storage）
//!
//! 定义协调层消费的存储会话协议，以及一个用于测试/演示的内存实现：
//! - 会话代表一个存储事务：按标识读取、插入、更新、删除，最后提交或回滚；
//! - 完整性冲突（唯一/外键等约束违例）以 `StorageError::IntegrityConflict` 单独上报；
//! - 内存实现（`InMemoryStore`/`InMemorySession`）支持声明式约束（`Constraint`）。
//!
//! 该模块只关心协议，真实后端（如 Postgres）由上层提供实现并注入。
//!
mod constraint;
mod memory;

pub use constraint::Constraint;
pub use memory::{InMemorySession, InMemoryStore};

use crate::{error::StorageResult as Result, model::Model};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait StorageSession: Send + Sync {
    async fn fetch<M: Model>(&self, key: &M::Key) -> Result<Option<M>>;

    /// 插入记录并返回其标识；记录未携带标识时由存储层分配
    async fn insert<M: Model>(&self, model: M) -> Result<M::Key>;

    async fn update<M: Model>(&self, model: M) -> Result<()>;

    async fn delete<M: Model>(&self, key: &M::Key) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn rollback(&self) -> Result<()>;

    /// 同步丢弃尚未提交的写入；工作单元在析构时调用，不得阻塞
    ///
    /// 关闭连接即回滚的后端无需实现。
    fn discard(&self) {}
}

#[async_trait]
impl<T> StorageSession for Arc<T>
where
    T: StorageSession + ?Sized,
{
    async fn fetch<M: Model>(&self, key: &M::Key) -> Result<Option<M>> {
        (**self).fetch::<M>(key).await
    }

    async fn insert<M: Model>(&self, model: M) -> Result<M::Key> {
        (**self).insert(model).await
    }

    async fn update<M: Model>(&self, model: M) -> Result<()> {
        (**self).update(model).await
    }

    async fn delete<M: Model>(&self, key: &M::Key) -> Result<()> {
        (**self).delete::<M>(key).await
    }

    async fn commit(&self) -> Result<()> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<()> {
        (**self).rollback().await
    }

    fn discard(&self) {
        (**self).discard()
    }
}
