//! 持久化协调层基础库（uow-core）
//!
//! 提供领域实体与存储记录之间的协调构件，用于在应用中实现：
//! - 模型（`model`）与实体（`entity`）的双向转换（`adapter`）
//! - 单一作用域内的身份映射（`identity_map`），保证同一标识只有一个内存实例
//! - 面向单一聚合类型的仓储（`repository`）：读取、暂存创建/删除、批量持久化
//! - 工作单元（`unit_of_work`）：多个仓储在同一存储事务中原子提交，冲突时整体回滚
//! - 存储会话协议（`storage`）及用于测试/演示的内存实现
//!
//! 本 crate 不关心具体存储引擎，只定义会话接口与最小必要的错误类型，
//! 便于在不同基础设施（例如 Postgres）上进行适配实现。
//!
//! 典型用法：
//! 1. 为每个聚合定义 `Model`（存储形态）与 `Entity`（领域形态），并实现 `Adapter`；
//! 2. 用存储会话创建 `UnitOfWork`，通过 `UnitOfWork::repository` 获得仓储；
//! 3. 通过仓储 `get/create/remove` 获取并修改实体；
//! 4. 调用 `UnitOfWork::commit` 一次性落库，完整性冲突时自动回滚。
//!
pub mod adapter;
pub mod config;
pub mod entity;
pub mod error;
pub mod identity_map;
pub mod model;
pub mod repository;
pub mod scope;
pub mod storage;
pub mod unit_of_work;

#[cfg(test)]
pub(crate) mod test_support;

// 允许在本 crate 内部通过 ::uow_core 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::uow_core 路径。
extern crate self as uow_core;
