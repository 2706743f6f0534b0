//! Task actions
//!
//! A task's action is an opaque asynchronous operation. The orchestrator only
//! observes whether it succeeded and, if not, the failure reason.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// The unit of work behind a registered task
#[async_trait]
pub trait TaskAction: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> TaskAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn run(&self) -> anyhow::Result<()> {
        (self)().await
    }
}

/// Shared handle to an action, cloned into each spawned execution
pub type SharedAction = Arc<dyn TaskAction>;

/// Action that does nothing, used for aggregate tasks that only group prerequisites
pub struct NoopAction;

#[async_trait]
impl TaskAction for NoopAction {
    async fn run(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
