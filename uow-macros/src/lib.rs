//! 持久化协调层的过程宏
//!
//! - `#[entity]`：为领域实体补齐可选标识字段并实现 `uow_core::entity::Entity`
//! - `#[model]`：为存储记录补齐主键字段、派生 serde 并实现 `uow_core::model::Model`
//! - `#[entity_id]`：为单字段 tuple struct 生成标识类型所需的派生与转换
//!
use proc_macro::TokenStream;

mod derive_utils;
mod entity;
mod entity_id;
mod field_utils;
mod model;

/// 实体宏
/// - 若缺失则追加字段 `id: Option<IdType>` 并置于最前
/// - 参数：`#[entity(id = IdType, debug = true|false)]`，`id` 默认 `i64`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 存储记录宏
/// - 参数：`#[model(table = "users", key = KeyType)]`，`table` 必填，`key` 默认 `i64`
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model::expand(attr, item)
}

/// 实体 ID 宏
/// 仅支持单字段 tuple struct，例如 `struct UserId(i64);`
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}
