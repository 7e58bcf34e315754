//! 适配器（Adapter）
//!
//! 模型与实体之间无状态的双向转换：`to_entity` 与 `to_model` 互为逆运算，
//! 对所有已持久化字段满足 `to_model(to_entity(m)) == m`。
//! 每个聚合类型各自实现一个适配器，由组合根注入仓储。
//!
use crate::entity::Entity;
use crate::model::Model;
use std::sync::Arc;

pub trait Adapter: Send + Sync + 'static {
    type Model: Model;
    type Entity: Entity<Id = <Self::Model as Model>::Key>;

    fn to_entity(&self, model: Self::Model) -> Self::Entity;

    fn to_model(&self, entity: &Self::Entity) -> Self::Model;
}

impl<T> Adapter for Arc<T>
where
    T: Adapter,
{
    type Model = T::Model;
    type Entity = T::Entity;

    fn to_entity(&self, model: Self::Model) -> Self::Entity {
        (**self).to_entity(model)
    }

    fn to_model(&self, entity: &Self::Entity) -> Self::Model {
        (**self).to_model(entity)
    }
}

/// 适配器对应聚合的标识类型
pub type KeyOf<A> = <<A as Adapter>::Model as Model>::Key;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PersonRow {
        id: Option<i64>,
        first_name: String,
        last_name: String,
        is_active: bool,
    }

    impl Model for PersonRow {
        const TABLE: &'static str = "people";
        type Key = i64;

        fn key(&self) -> Option<&Self::Key> {
            self.id.as_ref()
        }

        fn set_key(&mut self, key: Self::Key) {
            self.id = Some(key);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct FullName {
        first: String,
        last: String,
    }

    #[derive(Debug)]
    struct Person {
        id: Option<i64>,
        name: FullName,
        is_active: bool,
    }

    impl Entity for Person {
        type Id = i64;

        fn id(&self) -> Option<&Self::Id> {
            self.id.as_ref()
        }

        fn assign_id(&mut self, id: Self::Id) {
            self.id = Some(id);
        }
    }

    struct PersonAdapter;

    impl Adapter for PersonAdapter {
        type Model = PersonRow;
        type Entity = Person;

        fn to_entity(&self, model: PersonRow) -> Person {
            Person {
                id: model.id,
                name: FullName {
                    first: model.first_name,
                    last: model.last_name,
                },
                is_active: model.is_active,
            }
        }

        fn to_model(&self, entity: &Person) -> PersonRow {
            PersonRow {
                id: entity.id,
                first_name: entity.name.first.clone(),
                last_name: entity.name.last.clone(),
                is_active: entity.is_active,
            }
        }
    }

    #[test]
    fn model_entity_model_is_identity() {
        let row = PersonRow {
            id: Some(9),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            is_active: true,
        };
        let adapter = PersonAdapter;
        let back = adapter.to_model(&adapter.to_entity(row.clone()));
        assert_eq!(back, row);
    }

    #[test]
    fn same_model_adapts_to_same_identity() {
        let row = PersonRow {
            id: Some(4),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            is_active: false,
        };
        let adapter = Arc::new(PersonAdapter);
        let a = adapter.to_entity(row.clone());
        let b = adapter.to_entity(row);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.name, b.name);
    }
}
