//! 持久化协调层演示
//!
//! 组合根：初始化日志与配置，构建内存存储，执行初始数据填充流程。
//! 通过 `UOW_DEMO_CONFIG` 指定 JSON 配置文件，`RUST_LOG` 调整日志级别。
//!
mod config;
mod domain;
mod error;
mod populate;
mod telemetry;

use config::DemoConfig;
use tracing::info;
use uow_core::model::Model;
use uow_core::storage::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = DemoConfig::load()?;
    let store = InMemoryStore::new(config.store().clone());

    info!("populating store with initial data");
    let report = populate::run(&store, &config).await?;
    info!(?report, "initial data created");

    // 再次执行：超级用户已存在，不会重复创建
    let again = populate::run(&store, &config).await?;
    info!(?again, "populate is idempotent");

    let rejected = populate::show_conflict(&store, &config).await?;
    let retired = populate::retire_first_item(&store).await?;
    info!(rejected, ?retired, "conflict and removal flows finished");

    let users = store.count(domain::UserRow::TABLE).await;
    let items = store.count(domain::ItemRow::TABLE).await;
    info!(users, items, "done");
    Ok(())
}
