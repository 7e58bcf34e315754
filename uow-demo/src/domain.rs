//! 演示聚合：用户（User）与物品（Item）
//!
//! 每个聚合各有一份存储形态（`*Row`）、一份领域形态与一个无状态适配器。
//! 用户实体把资料与账户状态分组，物品通过 `owner_id` 引用用户。
//!
use uow_core::adapter::Adapter;
use uow_macros::{entity, entity_id, model};

#[entity_id]
pub struct UserId(i64);

#[model(table = "users", key = UserId)]
pub struct UserRow {
    pub email: String,
    pub hashed_password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[model(table = "items")]
pub struct ItemRow {
    pub title: String,
    pub description: Option<String>,
    pub owner_id: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountStatus {
    pub is_active: bool,
    pub is_superuser: bool,
}

#[entity(id = UserId)]
pub struct User {
    pub profile: Profile,
    pub hashed_password: String,
    pub status: AccountStatus,
}

impl User {
    pub fn new(email: &str, hashed_password: &str, is_superuser: bool) -> Self {
        Self {
            id: None,
            profile: Profile {
                email: email.to_string(),
                full_name: None,
            },
            hashed_password: hashed_password.to_string(),
            status: AccountStatus {
                is_active: true,
                is_superuser,
            },
        }
    }
}

#[entity]
pub struct Item {
    pub title: String,
    pub description: Option<String>,
    pub owner_id: UserId,
}

pub struct UserAdapter;

impl Adapter for UserAdapter {
    type Model = UserRow;
    type Entity = User;

    fn to_entity(&self, model: UserRow) -> User {
        User {
            id: model.id,
            profile: Profile {
                email: model.email,
                full_name: model.full_name,
            },
            hashed_password: model.hashed_password,
            status: AccountStatus {
                is_active: model.is_active,
                is_superuser: model.is_superuser,
            },
        }
    }

    fn to_model(&self, entity: &User) -> UserRow {
        UserRow {
            id: entity.id.clone(),
            email: entity.profile.email.clone(),
            hashed_password: entity.hashed_password.clone(),
            full_name: entity.profile.full_name.clone(),
            is_active: entity.status.is_active,
            is_superuser: entity.status.is_superuser,
        }
    }
}

pub struct ItemAdapter;

impl Adapter for ItemAdapter {
    type Model = ItemRow;
    type Entity = Item;

    fn to_entity(&self, model: ItemRow) -> Item {
        Item {
            id: model.id,
            title: model.title,
            description: model.description,
            owner_id: model.owner_id,
        }
    }

    fn to_model(&self, entity: &Item) -> ItemRow {
        ItemRow {
            id: entity.id,
            title: entity.title.clone(),
            description: entity.description.clone(),
            owner_id: entity.owner_id.clone(),
        }
    }
}
