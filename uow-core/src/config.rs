//! 存储配置
//!
//! 内存存储的序列起点与约束声明，既可通过构建器组装，也可从 JSON 加载：
//!
//! ```
//! use uow_core::config::StoreConfig;
//! use uow_core::storage::Constraint;
//!
//! let config = StoreConfig::builder()
//!     .constraints(vec![Constraint::unique("users", "email")])
//!     .build();
//! assert_eq!(config.sequence_start(), 1);
//!
//! let loaded = StoreConfig::from_json(
//!     r#"{"constraints": [{"kind": "unique", "table": "users", "field": "email"}]}"#,
//! )
//! .unwrap();
//! assert_eq!(loaded.constraints(), config.constraints());
//! ```
use crate::error::{DomainError, DomainResult as Result};
use crate::storage::Constraint;
use bon::Builder;
use serde::{Deserialize, Serialize};

fn default_sequence_start() -> u64 {
    1
}

#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 每张表自增序列的起点
    #[builder(default = default_sequence_start())]
    #[serde(default = "default_sequence_start")]
    sequence_start: u64,
    #[builder(default)]
    #[serde(default)]
    constraints: Vec<Constraint>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl StoreConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn sequence_start(&self) -> u64 {
        self.sequence_start
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// 约束所属表的约束子集
    pub fn constraints_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Constraint> {
        self.constraints.iter().filter(move |c| c.table() == table)
    }

    /// 校验约束声明中的表名与字段名非空
    pub fn validate(&self) -> Result<()> {
        for constraint in &self.constraints {
            let blank = match constraint {
                Constraint::Unique { table, field } => table.is_empty() || field.is_empty(),
                Constraint::ForeignKey {
                    table,
                    field,
                    references,
                } => table.is_empty() || field.is_empty() || references.is_empty(),
            };
            if blank {
                return Err(DomainError::Config {
                    reason: format!("constraint with empty name: {constraint:?}"),
                });
            }
        }
        Ok(())
    }
}
