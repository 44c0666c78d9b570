use super::*;

/// Decides whether a worker may mine. The error message is sent back to the miner.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, worker: &StratumWorker) -> Result;
}

/// Admits every worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _worker: &StratumWorker) -> Result {
        Ok(())
    }
}
