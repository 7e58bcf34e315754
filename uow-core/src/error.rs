//! 协调层统一错误定义
//!
//! 聚焦身份映射、仓储、工作单元与存储会话的最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use crate::scope::ScopeState;
use thiserror::Error;

/// 统一错误类型（协调层最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 身份映射/仓储 ---
    #[error("already removed: table={table}, key={key}")]
    AlreadyRemoved { table: &'static str, key: String },
    #[error("unknown entity: table={table}, key={key}")]
    UnknownEntity { table: &'static str, key: String },
    #[error("duplicate registration: table={table}, key={key}")]
    DuplicateRegistration { table: &'static str, key: String },

    // --- 工作单元 ---
    #[error("integrity conflict: {reason}")]
    IntegrityConflict { reason: String },
    #[error("scope closed: state={state}")]
    ScopeClosed { state: ScopeState },

    // --- 存储/配置 ---
    #[error("storage error: {reason}")]
    Storage { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("invalid config: {reason}")]
    Config { reason: String },
}

impl DomainError {
    pub fn is_integrity_conflict(&self) -> bool {
        matches!(self, DomainError::IntegrityConflict { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储会话错误
///
/// `IntegrityConflict` 必须与其它后端故障区分开：工作单元据此判断是否需要
/// 以冲突语义回滚并上报。
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("integrity conflict: {reason}")]
    IntegrityConflict { reason: String },
    #[error("backend error: {reason}")]
    Backend { reason: String },
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn conflict(reason: impl Into<String>) -> Self {
        StorageError::IntegrityConflict {
            reason: reason.into(),
        }
    }

    pub fn backend(reason: impl Into<String>) -> Self {
        StorageError::Backend {
            reason: reason.into(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::IntegrityConflict { reason } => DomainError::IntegrityConflict { reason },
            StorageError::Backend { reason } => DomainError::Storage { reason },
            StorageError::Serde { source } => DomainError::Serde { source },
        }
    }
}

// ---- Cross-crate conversions for infrastructure convenience ----
// 允许基础设施层直接使用 `?` 将 sqlx 错误转换为 StorageError，
// 唯一/外键/检查约束违例统一视为完整性冲突

#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StorageError::IntegrityConflict {
                    reason: db.message().to_string(),
                }
            }
            sqlx::Error::RowNotFound => StorageError::Backend {
                reason: "row not found".to_string(),
            },
            _ => StorageError::Backend {
                reason: err.to_string(),
            },
        }
    }
}
