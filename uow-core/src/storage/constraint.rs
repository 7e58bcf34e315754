//! 内存存储的声明式约束
//!
//! - `Unique`：写入时立即检查，提交时对合并后的数据再检查一次；
//! - `ForeignKey`：仅在提交时检查（延迟约束），删除被引用的行同样视为冲突。
//!
use crate::error::{StorageError, StorageResult as Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// 单表数据：主键字符串 → 行
pub(crate) type Rows = BTreeMap<String, Value>;
/// 表名 → 单表数据
pub(crate) type Tables = HashMap<String, Rows>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    Unique {
        table: String,
        field: String,
    },
    ForeignKey {
        table: String,
        field: String,
        references: String,
    },
}

impl Constraint {
    pub fn unique(table: impl Into<String>, field: impl Into<String>) -> Self {
        Constraint::Unique {
            table: table.into(),
            field: field.into(),
        }
    }

    pub fn foreign_key(
        table: impl Into<String>,
        field: impl Into<String>,
        references: impl Into<String>,
    ) -> Self {
        Constraint::ForeignKey {
            table: table.into(),
            field: field.into(),
            references: references.into(),
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Constraint::Unique { table, .. } | Constraint::ForeignKey { table, .. } => table,
        }
    }

    /// 写入单行时的即时检查；`rows` 为该表在当前事务中的可见数据
    pub(crate) fn check_row(&self, rows: &Rows, key: &str, row: &Value) -> Result<()> {
        match self {
            Constraint::Unique { table, field } => {
                let Some(value) = present(row, field) else {
                    return Ok(());
                };
                let clash = rows
                    .iter()
                    .any(|(other_key, other)| other_key != key && other.get(field) == Some(value));
                if clash {
                    return Err(StorageError::conflict(format!(
                        "unique violation: {table}.{field}={value}"
                    )));
                }
                Ok(())
            }
            Constraint::ForeignKey { .. } => Ok(()),
        }
    }

    /// 提交前对合并后的全部数据检查
    pub(crate) fn check(&self, tables: &Tables) -> Result<()> {
        match self {
            Constraint::Unique { table, field } => {
                let Some(rows) = tables.get(table) else {
                    return Ok(());
                };
                let mut seen = HashSet::new();
                for row in rows.values() {
                    if let Some(value) = present(row, field) {
                        if !seen.insert(value.to_string()) {
                            return Err(StorageError::conflict(format!(
                                "unique violation: {table}.{field}={value}"
                            )));
                        }
                    }
                }
                Ok(())
            }
            Constraint::ForeignKey {
                table,
                field,
                references,
            } => {
                let Some(rows) = tables.get(table) else {
                    return Ok(());
                };
                let parents = tables.get(references);
                for (key, row) in rows {
                    let Some(value) = present(row, field) else {
                        continue;
                    };
                    let parent_key = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    if !parents.is_some_and(|p| p.contains_key(&parent_key)) {
                        return Err(StorageError::conflict(format!(
                            "foreign key violation: {table}.{field}={value} (row {key}) has no {references} row"
                        )));
                    }
                }
                Ok(())
            }
        }
    }
}

fn present<'a>(row: &'a Value, field: &str) -> Option<&'a Value> {
    row.get(field).filter(|v| !v.is_null())
}
