//! 实体（Entity）基础抽象
//!
//! 为领域实体提供统一的标识能力：标识由存储层在首次持久化时分配，此前实体处于瞬态（transient）。
//!
use crate::error::DomainResult;
use crate::scope::Scope;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::{self, Debug, Display};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// 聚合标识
///
/// 除可比较、可哈希、可显示外，还要求存储层能由自增序列生成新标识。
pub trait IdentityKey:
    Clone + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// 由存储层序列值生成标识；超出该类型可表示范围时返回 `None`
    fn from_sequence(seq: u64) -> Option<Self>;
}

macro_rules! impl_identity_key_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl IdentityKey for $t {
                fn from_sequence(seq: u64) -> Option<Self> {
                    <$t>::try_from(seq).ok()
                }
            }
        )*
    };
}

impl_identity_key_int!(i32, i64, u32, u64);

impl IdentityKey for String {
    fn from_sequence(seq: u64) -> Option<Self> {
        Some(seq.to_string())
    }
}

/// 具备（可能尚未分配的）唯一标识的实体抽象
pub trait Entity: Send + Sync + 'static {
    /// 实体标识类型
    type Id: IdentityKey;

    /// 获取实体标识；瞬态实体返回 `None`
    fn id(&self) -> Option<&Self::Id>;

    /// 写入存储层分配的标识（仅由仓储在首次持久化时调用）
    fn assign_id(&mut self, id: Self::Id);

    fn is_transient(&self) -> bool {
        self.id().is_none()
    }
}

/// 身份映射中的规范实例句柄
///
/// 同一作用域内对同一标识的多次获取返回指向同一实例的句柄，
/// 通过任一句柄所做的修改对其它句柄可见。作用域结束后 `read/write` 以 `ScopeClosed` 失败。
///
/// 注意：持有写锁期间调用 `UnitOfWork::commit` 会等待该锁释放。
pub struct EntityRef<E> {
    inner: Arc<RwLock<E>>,
    scope: Scope,
}

impl<E> Clone for EntityRef<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            scope: self.scope.clone(),
        }
    }
}

impl<E> EntityRef<E> {
    pub(crate) fn new(entity: E, scope: Scope) -> Self {
        Self {
            inner: Arc::new(RwLock::new(entity)),
            scope,
        }
    }

    pub async fn read(&self) -> DomainResult<RwLockReadGuard<'_, E>> {
        self.scope.ensure_open()?;
        Ok(self.inner.read().await)
    }

    pub async fn write(&self) -> DomainResult<RwLockWriteGuard<'_, E>> {
        self.scope.ensure_open()?;
        Ok(self.inner.write().await)
    }

    /// 两个句柄是否指向同一实例
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // 仓储内部访问，不做作用域检查（调用方已检查）
    pub(crate) fn cell(&self) -> &RwLock<E> {
        &self.inner
    }
}

impl<E> Debug for EntityRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("scope", &self.scope.state())
            .finish_non_exhaustive()
    }
}
