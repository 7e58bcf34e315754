//! 协调作用域（Scope）
//!
//! 一个工作单元对应一个作用域：`Open → Committed` 或 `Open → Aborted`，两者均为终态。
//! 作用域句柄在工作单元、其仓储以及仓储交出的实体句柄之间共享，
//! 任一终态之后，所有持有者上的操作都以 `ScopeClosed` 失败。
//!
use crate::error::{DomainError, DomainResult};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const OPEN: u8 = 0;
const COMMITTED: u8 = 1;
const ABORTED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Open,
    Committed,
    Aborted,
}

impl ScopeState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScopeState::Open)
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            OPEN => ScopeState::Open,
            COMMITTED => ScopeState::Committed,
            _ => ScopeState::Aborted,
        }
    }

    fn raw(self) -> u8 {
        match self {
            ScopeState::Open => OPEN,
            ScopeState::Committed => COMMITTED,
            ScopeState::Aborted => ABORTED,
        }
    }
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeState::Open => write!(f, "open"),
            ScopeState::Committed => write!(f, "committed"),
            ScopeState::Aborted => write!(f, "aborted"),
        }
    }
}

/// 共享的作用域状态句柄
#[derive(Debug, Clone, Default)]
pub struct Scope {
    state: Arc<AtomicU8>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScopeState {
        ScopeState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ScopeState::Open
    }

    pub fn ensure_open(&self) -> DomainResult<()> {
        match self.state() {
            ScopeState::Open => Ok(()),
            state => Err(DomainError::ScopeClosed { state }),
        }
    }

    /// 从 `Open` 迁移到终态；已处于终态时不做任何修改并返回 `false`
    pub(crate) fn close(&self, to: ScopeState) -> bool {
        self.state
            .compare_exchange(OPEN, to.raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
