//! 演示配置
//!
//! 从 `UOW_DEMO_CONFIG` 指向的 JSON 文件加载；未设置时使用内置默认值：
//!
//! ```json
//! {
//!   "first_superuser": "admin@example.com",
//!   "first_superuser_password_hash": "...",
//!   "store": { "sequence_start": 1, "constraints": [ ... ] }
//! }
//! ```
use crate::error::{DemoError, DemoResult};
use serde::Deserialize;
use tracing::info;
use uow_core::config::StoreConfig;
use uow_core::storage::Constraint;

pub const CONFIG_ENV: &str = "UOW_DEMO_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default = "default_superuser")]
    first_superuser: String,
    #[serde(default = "default_password_hash")]
    first_superuser_password_hash: String,
    #[serde(default = "default_store")]
    store: StoreConfig,
}

fn default_superuser() -> String {
    "admin@example.com".to_string()
}

// 口令散列不在本层职责内，这里只保存外部给定的散列值
fn default_password_hash() -> String {
    "$argon2id$v=19$m=19456,t=2,p=1$placeholder".to_string()
}

fn default_store() -> StoreConfig {
    StoreConfig::builder()
        .constraints(vec![
            Constraint::unique("users", "email"),
            Constraint::foreign_key("items", "owner_id", "users"),
        ])
        .build()
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            first_superuser: default_superuser(),
            first_superuser_password_hash: default_password_hash(),
            store: default_store(),
        }
    }
}

impl DemoConfig {
    pub fn load() -> DemoResult<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|source| {
                    DemoError::ConfigFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                let config = Self::from_json(&raw)?;
                info!(%path, "loaded config");
                Ok(config)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_json(raw: &str) -> DemoResult<Self> {
        let config: DemoConfig = serde_json::from_str(raw)?;
        config.store.validate()?;
        Ok(config)
    }

    pub fn first_superuser(&self) -> &str {
        &self.first_superuser
    }

    pub fn first_superuser_password_hash(&self) -> &str {
        &self.first_superuser_password_hash
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DemoConfig::from_json("{}").unwrap();
        assert_eq!(config.first_superuser(), "admin@example.com");
        assert_eq!(config.store().constraints().len(), 2);
    }

    #[test]
    fn store_section_is_validated() {
        let err = DemoConfig::from_json(
            r#"{"store": {"constraints": [{"kind": "unique", "table": "users", "field": ""}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DemoError::Domain(_)));
    }
}
