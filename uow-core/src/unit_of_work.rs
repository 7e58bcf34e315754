//! 工作单元（Unit of Work）
//!
//! 在一个存储会话（事务）之上协调多个仓储：
//! - `register` 按登记顺序记录参与者，提交时也按此顺序写出；
//! - `commit` 依次调用各参与者的 `persist_all`，最后提交存储事务；
//!   任一步失败即回滚并进入 `Aborted`，完整性冲突以 `IntegrityConflict` 上报；
//! - `abort` 回滚并进入 `Aborted`；未提交即被丢弃的工作单元同样视为中止，
//!   并同步丢弃会话中暂存的写入。
//!
//! 终态之后，工作单元、其仓储以及仓储交出的实体句柄上的操作均以 `ScopeClosed` 失败。
//!
use crate::adapter::Adapter;
use crate::error::DomainResult as Result;
use crate::repository::Repository;
use crate::scope::{Scope, ScopeState};
use crate::storage::StorageSession;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 参与提交的一方（通常是一个仓储）
#[async_trait]
pub trait Participant: Send + Sync {
    fn table(&self) -> &'static str;

    async fn persist_all(&self) -> Result<()>;
}

#[async_trait]
impl<A, S> Participant for Repository<A, S>
where
    A: Adapter,
    S: StorageSession,
{
    fn table(&self) -> &'static str {
        Repository::table(self)
    }

    async fn persist_all(&self) -> Result<()> {
        Repository::persist_all(self).await
    }
}

pub struct UnitOfWork<S>
where
    S: StorageSession,
{
    session: Arc<S>,
    scope: Scope,
    participants: Vec<Arc<dyn Participant>>,
}

impl<S> UnitOfWork<S>
where
    S: StorageSession,
{
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            scope: Scope::new(),
            participants: Vec::new(),
        }
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn state(&self) -> ScopeState {
        self.scope.state()
    }

    /// 登记参与者；同一实例重复登记时每次提交只写出一次
    pub fn register<P>(&mut self, participant: Arc<P>) -> Result<()>
    where
        P: Participant + 'static,
    {
        self.scope.ensure_open()?;
        debug!(table = participant.table(), "participant registered");
        self.participants.push(participant);
        Ok(())
    }

    /// 基于本单元的会话与作用域创建仓储并登记
    pub fn repository<A>(&mut self, adapter: A) -> Result<Arc<Repository<A, S>>>
    where
        A: Adapter,
        S: 'static,
    {
        self.scope.ensure_open()?;
        let repository = Arc::new(Repository::new(
            adapter,
            Arc::clone(&self.session),
            self.scope.clone(),
        ));
        self.register(Arc::clone(&repository))?;
        Ok(repository)
    }

    #[instrument(skip(self), fields(participants = self.participants.len()))]
    pub async fn commit(&self) -> Result<()> {
        self.scope.ensure_open()?;

        match self.flush().await {
            Ok(()) => {
                self.scope.close(ScopeState::Committed);
                info!("unit of work committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback) = self.session.rollback().await {
                    warn!(error = %rollback, "rollback after failed commit failed");
                }
                self.scope.close(ScopeState::Aborted);
                if err.is_integrity_conflict() {
                    warn!(error = %err, "commit rejected by integrity conflict, rolled back");
                } else {
                    warn!(error = %err, "commit failed, rolled back");
                }
                Err(err)
            }
        }
    }

    pub async fn abort(&self) -> Result<()> {
        self.scope.ensure_open()?;
        self.scope.close(ScopeState::Aborted);
        self.session.rollback().await?;
        info!(participants = self.participants.len(), "unit of work aborted");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        for (idx, participant) in self.participants.iter().enumerate() {
            let seen = self.participants[..idx]
                .iter()
                .any(|earlier| std::ptr::addr_eq(Arc::as_ptr(earlier), Arc::as_ptr(participant)));
            if seen {
                continue;
            }
            participant.persist_all().await?;
        }
        self.session.commit().await?;
        Ok(())
    }
}

impl<S> Drop for UnitOfWork<S>
where
    S: StorageSession,
{
    fn drop(&mut self) {
        if self.scope.close(ScopeState::Aborted) {
            self.session.discard();
            warn!(
                participants = self.participants.len(),
                "unit of work dropped while open, aborted"
            );
        }
    }
}
