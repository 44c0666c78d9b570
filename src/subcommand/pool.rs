use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Pool;

impl Pool {
    pub(crate) async fn run(self, settings: Settings, cancel_token: CancellationToken) -> Result {
        let daemon = Arc::new(settings.rpc_client()?);

        warn!("No native MTP backend linked, every submitted proof will be rejected");

        let pool = crate::Pool::new(settings.pool_config(), daemon)
            .with_verifier(Arc::new(Unlinked))
            .with_authorizer(Arc::new(AllowAll));

        let handle = pool.start(cancel_token.clone()).await?;

        info!("Pool running on {}", handle.local_addr());

        cancel_token.cancelled().await;

        handle.join().await
    }
}
