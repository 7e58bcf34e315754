//! 初始数据填充
//!
//! 首个超级用户不存在时创建之，并为其登记几件物品；重复执行不会重复创建。
//! 另附两个演示流程：唯一约束冲突导致整体回滚，以及删除后提交。
//!
use crate::config::DemoConfig;
use crate::domain::{Item, ItemAdapter, User, UserAdapter, UserId};
use crate::error::DemoResult;
use std::sync::Arc;
use tracing::{info, warn};
use uow_core::storage::{InMemorySession, InMemoryStore};
use uow_core::unit_of_work::UnitOfWork;

const SUPERUSER_ID: i64 = 1;

const STARTER_ITEMS: &[(&str, &str)] = &[
    ("Handbook", "Onboarding notes for new operators"),
    ("Runbook", "What to do when the pager goes off"),
];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PopulateReport {
    pub superuser_created: bool,
    pub items_created: usize,
}

fn unit(store: &InMemoryStore) -> UnitOfWork<InMemorySession> {
    UnitOfWork::new(Arc::new(store.session()))
}

pub async fn run(store: &InMemoryStore, config: &DemoConfig) -> DemoResult<PopulateReport> {
    let mut uow = unit(store);
    let users = uow.repository(UserAdapter)?;
    let items = uow.repository(ItemAdapter)?;

    let superuser_id = UserId::new(SUPERUSER_ID);
    if users.get(&superuser_id).await?.is_some() {
        info!(id = %superuser_id, "superuser already present");
        uow.abort().await?;
        return Ok(PopulateReport::default());
    }

    let mut superuser = User::new(
        config.first_superuser(),
        config.first_superuser_password_hash(),
        true,
    );
    superuser.id = Some(superuser_id.clone());
    users.create(superuser).await?;

    for (title, description) in STARTER_ITEMS {
        items
            .create(Item {
                id: None,
                title: title.to_string(),
                description: Some(description.to_string()),
                owner_id: superuser_id.clone(),
            })
            .await?;
    }

    uow.commit().await?;
    info!(email = config.first_superuser(), "superuser created");
    Ok(PopulateReport {
        superuser_created: true,
        items_created: STARTER_ITEMS.len(),
    })
}

/// 以已被占用的邮箱注册新用户：提交失败并回滚，同一单元内的物品也不会落库
pub async fn show_conflict(store: &InMemoryStore, config: &DemoConfig) -> DemoResult<bool> {
    let mut uow = unit(store);
    let items = uow.repository(ItemAdapter)?;
    let users = uow.repository(UserAdapter)?;

    items
        .create(Item {
            id: None,
            title: "Orphaned draft".to_string(),
            description: None,
            owner_id: UserId::new(SUPERUSER_ID),
        })
        .await?;
    users
        .create(User::new(
            config.first_superuser(),
            config.first_superuser_password_hash(),
            false,
        ))
        .await?;

    match uow.commit().await {
        Ok(()) => Ok(false),
        Err(err) if err.is_integrity_conflict() => {
            warn!(error = %err, "duplicate registration rejected");
            Ok(true)
        }
        Err(err) => Err(err.into()),
    }
}

/// 删除第一件物品并提交，返回被删除物品的标识
pub async fn retire_first_item(store: &InMemoryStore) -> DemoResult<Option<i64>> {
    let mut uow = unit(store);
    let items = uow.repository(ItemAdapter)?;

    let first = 1;
    let Some(item) = items.get(&first).await? else {
        uow.abort().await?;
        return Ok(None);
    };
    let title = item.read().await?.title.clone();
    items.remove(&first).await?;
    uow.commit().await?;

    info!(id = first, %title, "item retired");
    Ok(Some(first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemRow, UserRow};
    use uow_core::model::Model;

    fn setup() -> (InMemoryStore, DemoConfig) {
        let config = DemoConfig::default();
        (InMemoryStore::new(config.store().clone()), config)
    }

    #[tokio::test]
    async fn populate_is_idempotent() {
        let (store, config) = setup();

        let first = run(&store, &config).await.unwrap();
        assert!(first.superuser_created);
        assert_eq!(first.items_created, 2);

        let second = run(&store, &config).await.unwrap();
        assert_eq!(second, PopulateReport::default());
        assert_eq!(store.count(UserRow::TABLE).await, 1);
        assert_eq!(store.count(ItemRow::TABLE).await, 2);

        let admin = store
            .load::<UserRow>(&UserId::new(SUPERUSER_ID))
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_superuser);
        assert_eq!(admin.email, "admin@example.com");
    }

    #[tokio::test]
    async fn conflicting_email_rolls_back_everything() {
        let (store, config) = setup();
        run(&store, &config).await.unwrap();

        assert!(show_conflict(&store, &config).await.unwrap());
        assert_eq!(store.count(UserRow::TABLE).await, 1);
        assert_eq!(store.count(ItemRow::TABLE).await, 2);
    }

    #[tokio::test]
    async fn retiring_removes_the_row() {
        let (store, config) = setup();
        assert_eq!(retire_first_item(&store).await.unwrap(), None);

        run(&store, &config).await.unwrap();
        assert_eq!(retire_first_item(&store).await.unwrap(), Some(1));
        assert!(store.load::<ItemRow>(&1).await.unwrap().is_none());
        assert_eq!(store.count(ItemRow::TABLE).await, 1);
    }
}
