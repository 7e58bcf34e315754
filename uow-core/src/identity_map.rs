//! 身份映射（Identity Map）
//!
//! 单一作用域内 标识 → 实体 的缓存，保证每个标识只有一个规范的内存实例。
//! 被删除的标识以 `Slot::Removed` 墓碑记录，此后对该标识的获取与重新登记都会失败，
//! 调用方由此得知该实体已被删除，而不仅仅是"不存在"。
//!
//! 尚未分配标识的瞬态实体单独暂存在 `pending` 中，首次持久化分配标识后再 `promote` 到映射里。
//!
use crate::entity::{EntityRef, IdentityKey};
use crate::error::{DomainError, DomainResult};
use std::collections::HashMap;

/// 映射条目：存活实例或墓碑
#[derive(Debug)]
pub enum Slot<E> {
    Live(EntityRef<E>),
    Removed,
}

/// 实例在映射中的位置
#[derive(Debug, PartialEq, Eq)]
pub enum Tracked<'a, K> {
    Keyed(&'a K),
    Pending,
}

#[derive(Debug)]
pub struct IdentityMap<K, E> {
    table: &'static str,
    slots: HashMap<K, Slot<E>>,
    pending: Vec<EntityRef<E>>,
}

impl<K, E> IdentityMap<K, E>
where
    K: IdentityKey,
{
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            slots: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// 命中返回规范实例；未登记返回 `None`；已删除返回 `AlreadyRemoved`
    pub fn get(&self, key: &K) -> DomainResult<Option<EntityRef<E>>> {
        match self.slots.get(key) {
            Some(Slot::Live(entity)) => Ok(Some(entity.clone())),
            Some(Slot::Removed) => Err(self.already_removed(key)),
            None => Ok(None),
        }
    }

    /// 登记实例；同一实例重复登记视为复用，不同实例占用同一标识则拒绝
    pub fn put(&mut self, key: K, entity: EntityRef<E>) -> DomainResult<()> {
        match self.slots.get(&key) {
            Some(Slot::Removed) => Err(self.already_removed(&key)),
            Some(Slot::Live(existing)) if existing.ptr_eq(&entity) => Ok(()),
            Some(Slot::Live(_)) => Err(DomainError::DuplicateRegistration {
                table: self.table,
                key: key.to_string(),
            }),
            None => {
                self.slots.insert(key, Slot::Live(entity));
                Ok(())
            }
        }
    }

    /// 将存活条目替换为墓碑，返回被删除的实例
    pub fn mark_removed(&mut self, key: &K) -> DomainResult<EntityRef<E>> {
        match self.slots.get(key) {
            Some(Slot::Live(_)) => {}
            Some(Slot::Removed) => return Err(self.already_removed(key)),
            None => return Err(self.unknown(key)),
        }

        match self.slots.insert(key.clone(), Slot::Removed) {
            Some(Slot::Live(entity)) => Ok(entity),
            _ => Err(self.unknown(key)),
        }
    }

    pub fn is_removed(&self, key: &K) -> bool {
        matches!(self.slots.get(key), Some(Slot::Removed))
    }

    pub fn contains(&self, key: &K) -> bool {
        matches!(self.slots.get(key), Some(Slot::Live(_)))
    }

    /// 所有存活条目（不含墓碑与瞬态实例）
    pub fn entries(&self) -> impl Iterator<Item = (&K, &EntityRef<E>)> {
        self.slots.iter().filter_map(|(key, slot)| match slot {
            Slot::Live(entity) => Some((key, entity)),
            Slot::Removed => None,
        })
    }

    pub fn removed_keys(&self) -> impl Iterator<Item = &K> {
        self.slots.iter().filter_map(|(key, slot)| match slot {
            Slot::Removed => Some(key),
            Slot::Live(_) => None,
        })
    }

    /// 暂存瞬态实例，等待持久化时分配标识
    pub fn stage(&mut self, entity: EntityRef<E>) {
        if !self.pending.iter().any(|p| p.ptr_eq(&entity)) {
            self.pending.push(entity);
        }
    }

    pub fn pending(&self) -> &[EntityRef<E>] {
        &self.pending
    }

    /// 瞬态实例获得标识后移入映射
    pub fn promote(&mut self, key: K, entity: &EntityRef<E>) -> DomainResult<()> {
        self.put(key, entity.clone())?;
        self.pending.retain(|p| !p.ptr_eq(entity));
        Ok(())
    }

    /// 查找实例是否由本映射跟踪
    pub fn locate(&self, entity: &EntityRef<E>) -> Option<Tracked<'_, K>> {
        if self.pending.iter().any(|p| p.ptr_eq(entity)) {
            return Some(Tracked::Pending);
        }
        self.slots.iter().find_map(|(key, slot)| match slot {
            Slot::Live(live) if live.ptr_eq(entity) => Some(Tracked::Keyed(key)),
            _ => None,
        })
    }

    /// 存活条目与瞬态实例总数
    pub fn len(&self) -> usize {
        self.entries().count() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn already_removed(&self, key: &K) -> DomainError {
        DomainError::AlreadyRemoved {
            table: self.table,
            key: key.to_string(),
        }
    }

    fn unknown(&self, key: &K) -> DomainError {
        DomainError::UnknownEntity {
            table: self.table,
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[derive(Debug)]
    struct Tag(&'static str);

    fn tag(scope: &Scope, name: &'static str) -> EntityRef<Tag> {
        EntityRef::new(Tag(name), scope.clone())
    }

    #[tokio::test]
    async fn put_then_get_returns_same_instance() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        let rust = tag(&scope, "rust");
        map.put(1, rust.clone()).unwrap();

        let hit = map.get(&1).unwrap().unwrap();
        assert!(hit.ptr_eq(&rust));
        assert_eq!(hit.read().await.unwrap().0, "rust");
        assert!(map.get(&2).unwrap().is_none());
    }

    #[test]
    fn re_registering_same_instance_is_accepted() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        let rust = tag(&scope, "rust");
        map.put(1, rust.clone()).unwrap();
        map.put(1, rust).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn different_instance_under_live_key_is_rejected() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        map.put(1, tag(&scope, "rust")).unwrap();

        match map.put(1, tag(&scope, "go")).unwrap_err() {
            DomainError::DuplicateRegistration { table, key } => {
                assert_eq!(table, "tags");
                assert_eq!(key, "1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tombstone_blocks_get_put_and_second_remove() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        let rust = tag(&scope, "rust");
        map.put(5, rust.clone()).unwrap();

        let removed = map.mark_removed(&5).unwrap();
        assert!(removed.ptr_eq(&rust));
        assert!(map.is_removed(&5));
        assert!(!map.contains(&5));

        assert!(matches!(
            map.get(&5),
            Err(DomainError::AlreadyRemoved { .. })
        ));
        assert!(matches!(
            map.put(5, rust),
            Err(DomainError::AlreadyRemoved { .. })
        ));
        assert!(matches!(
            map.mark_removed(&5),
            Err(DomainError::AlreadyRemoved { .. })
        ));
    }

    #[test]
    fn removing_unknown_key_fails() {
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        assert!(matches!(
            map.mark_removed(&8),
            Err(DomainError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn entries_exclude_tombstones() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        map.put(1, tag(&scope, "a")).unwrap();
        map.put(2, tag(&scope, "b")).unwrap();
        map.mark_removed(&2).unwrap();

        let live: Vec<i64> = map.entries().map(|(k, _)| *k).collect();
        assert_eq!(live, vec![1]);
        let removed: Vec<i64> = map.removed_keys().copied().collect();
        assert_eq!(removed, vec![2]);
    }

    #[test]
    fn staged_instance_is_promoted_under_assigned_key() {
        let scope = Scope::new();
        let mut map = IdentityMap::<i64, Tag>::new("tags");
        let draft = tag(&scope, "new");
        map.stage(draft.clone());
        map.stage(draft.clone());
        assert_eq!(map.pending().len(), 1);
        assert_eq!(map.locate(&draft), Some(Tracked::Pending));

        map.promote(10, &draft).unwrap();
        assert!(map.pending().is_empty());
        assert_eq!(map.locate(&draft), Some(Tracked::Keyed(&10)));
        assert!(map.get(&10).unwrap().unwrap().ptr_eq(&draft));
    }

    #[test]
    fn foreign_instance_is_not_located() {
        let scope = Scope::new();
        let map = IdentityMap::<i64, Tag>::new("tags");
        assert!(map.is_empty());
        assert_eq!(map.locate(&tag(&scope, "stray")), None);
    }
}
