use super::*;

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const SHARE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Payout address for the coinbase. Without one no pool output is added.
    pub address: Option<String>,
    pub listen: String,
    pub port: u16,
    pub start_difficulty: f64,
    pub connection_timeout: Duration,
    pub coinbase_signature: String,
    pub poll_interval: Duration,
    /// Longest the current job goes without being resent to miners.
    pub rebroadcast_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            address: None,
            listen: "0.0.0.0".into(),
            port: 3000,
            start_difficulty: 1.0,
            connection_timeout: Duration::from_secs(600),
            coinbase_signature: DEFAULT_COINBASE_SIGNATURE.into(),
            poll_interval: Duration::from_secs(1),
            rebroadcast_interval: BroadcastTimer::PERIOD,
        }
    }
}

/// MTP mining pool: talks to the coin daemon, serves Stratum and reports what happens as
/// [`Event`]s.
pub struct Pool {
    config: PoolConfig,
    daemon: Arc<dyn Daemon>,
    verifier: Arc<dyn MtpVerifier>,
    authorizer: Arc<dyn Authorizer>,
    events: broadcast::Sender<Event>,
}

impl Pool {
    pub fn new(config: PoolConfig, daemon: Arc<dyn Daemon>) -> Self {
        Self {
            config,
            daemon,
            verifier: Arc::new(Unlinked),
            authorizer: Arc::new(AllowAll),
            events: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn MtpVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Runs the startup pipeline and spawns the pool. Fails if the daemon is unreachable, the
    /// payout address is rejected or the listener cannot bind.
    pub async fn start(self, cancel: CancellationToken) -> Result<PoolHandle> {
        let config = &self.config;

        ensure!(
            config.start_difficulty > 0.0,
            "start difficulty must be positive, got {}",
            config.start_difficulty
        );

        self.daemon.getinfo().await.context("Daemon not ready.")?;

        if let Some(address) = &config.address {
            let valid = self
                .daemon
                .validate_address(address)
                .await
                .context("Invalid coinbase address")?;

            ensure!(valid, "Invalid coinbase address");
        }

        let info = self
            .daemon
            .getinfo()
            .await
            .context("failed to query daemon network")?;

        let jobs = Arc::new(JobManager::new(JobConfig {
            pool_address: config.address.clone(),
            signature: config.coinbase_signature.clone(),
            testnet: info.testnet,
            rebroadcast_interval: config.rebroadcast_interval,
        }));

        let (shares_tx, shares) = mpsc::channel(SHARE_CHANNEL_CAPACITY);

        let server = Arc::new(Server::new(ServerContext {
            jobs: jobs.clone(),
            processor: ShareProcessor::new(jobs.clone(), self.verifier.clone()),
            authorizer: self.authorizer.clone(),
            events: self.events.clone(),
            shares: shares_tx,
            start_difficulty: config.start_difficulty,
            connection_timeout: config.connection_timeout,
        }));

        let orchestrator = Orchestrator {
            daemon: self.daemon.clone(),
            jobs,
            server: server.clone(),
            events: self.events.clone(),
        };

        match self.daemon.getblocktemplate().await {
            Ok(template) => orchestrator.update(template, false),
            Err(err) => warn!("Failed to fetch first block template: {err}"),
        }

        let listener = TcpListener::bind((config.listen.as_str(), config.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", config.listen, config.port))?;

        let local_addr = listener.local_addr()?;

        info!("Stratum listening on {local_addr}");

        tokio::spawn(server.clone().serve(listener, cancel.clone()));

        self.events
            .send(Event::Started {
                address: local_addr,
            })
            .ok();

        let task = tokio::spawn(orchestrator.run(shares, config.poll_interval, cancel));

        Ok(PoolHandle {
            local_addr,
            events: self.events,
            server,
            task,
        })
    }
}

pub struct PoolHandle {
    local_addr: SocketAddr,
    events: broadcast::Sender<Event>,
    server: Arc<Server>,
    task: tokio::task::JoinHandle<()>,
}

impl PoolHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.server.client_count()
    }

    /// Queues a difficulty change for the client with `subscription_id`, sent along with its next
    /// job. Returns false if no such client is connected.
    pub fn set_difficulty(&self, subscription_id: &str, difficulty: f64) -> bool {
        match self.server.client(subscription_id) {
            Some(client) => {
                client.enqueue_difficulty(difficulty);
                true
            }
            None => false,
        }
    }

    /// Waits for the pool to finish stopping after its cancellation token fires.
    pub async fn join(self) -> Result {
        self.task.await.context("pool task panicked")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Refresh {
    Poll,
    Rebroadcast,
    AfterBlock,
}

enum Outcome {
    Template {
        refresh: Refresh,
        result: Result<BlockTemplate, DaemonError>,
    },
    BlockSubmitted,
}

struct Orchestrator {
    daemon: Arc<dyn Daemon>,
    jobs: Arc<JobManager>,
    server: Arc<Server>,
    events: broadcast::Sender<Event>,
}

impl Orchestrator {
    async fn run(
        self,
        mut shares: mpsc::Receiver<Share>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut poll = tokio::time::interval(poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut tasks = JoinSet::new();
        let mut polling = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = poll.tick(), if !polling => {
                    polling = true;
                    self.fetch_template(&mut tasks, Refresh::Poll);
                }
                _ = self.jobs.timer().wait() => {
                    debug!("Rebroadcast timer fired");
                    self.fetch_template(&mut tasks, Refresh::Rebroadcast);
                }
                Some(share) = shares.recv() => self.submit_share(share, &mut tasks),
                Some(outcome) = tasks.join_next(), if !tasks.is_empty() => match outcome {
                    Ok(Outcome::Template { refresh, result }) => {
                        if refresh == Refresh::Poll {
                            polling = false;
                        }

                        match result {
                            Ok(template) => self.refresh(template, refresh),
                            Err(err) => warn!("Failed to fetch block template: {err}"),
                        }
                    }
                    Ok(Outcome::BlockSubmitted) => self.fetch_template(&mut tasks, Refresh::AfterBlock),
                    Err(err) => error!("Pool task failed: {err}"),
                }
            }
        }

        info!("Stopping pool");

        self.server.stop();
        tasks.shutdown().await;
    }

    fn fetch_template(&self, tasks: &mut JoinSet<Outcome>, refresh: Refresh) {
        let daemon = self.daemon.clone();

        tasks.spawn(async move {
            Outcome::Template {
                refresh,
                result: daemon.getblocktemplate().await,
            }
        });
    }

    fn refresh(&self, template: BlockTemplate, refresh: Refresh) {
        match refresh {
            Refresh::Poll => {
                let unchanged = self
                    .jobs
                    .current()
                    .is_some_and(|job| job.template.previous_block_hash == template.previous_block_hash);

                if !unchanged {
                    self.update(template, false);
                }
            }
            Refresh::Rebroadcast => self.update(template, true),
            Refresh::AfterBlock => self.update(template, false),
        }
    }

    /// Processes a template and broadcasts: always on a new block, otherwise only when
    /// `update_job` asks for the current job to be resent.
    fn update(&self, template: BlockTemplate, update_job: bool) {
        let transition = match self.jobs.process_template(template) {
            Ok(transition) => transition,
            Err(err) => {
                error!("Failed to build job from template: {err:#}");
                Transition::Rejected
            }
        };

        match transition {
            Transition::NewBlock(job) => {
                self.events
                    .send(Event::NewBlock {
                        job_id: job.id,
                        height: job.height(),
                    })
                    .ok();

                self.broadcast(&job, true);
            }
            _ if update_job => {
                if let Some(job) = self.jobs.current() {
                    self.broadcast(&job, false);
                }
            }
            _ => {}
        }
    }

    fn broadcast(&self, job: &Arc<Job>, clean_jobs: bool) {
        self.events
            .send(Event::BroadcastJobs {
                job_id: job.id,
                clean_jobs,
            })
            .ok();

        self.server.broadcast(job, clean_jobs);
    }

    fn submit_share(&self, share: Share, tasks: &mut JoinSet<Outcome>) {
        let share = Arc::new(share);

        match &share.error {
            Some(error) => warn!("Rejected share from {}: {error}", share.worker.name()),
            None => debug!(
                "Accepted share from {} at difficulty {}",
                share.worker.name(),
                share.share_difficulty
            ),
        }

        if !share.is_block() {
            self.events
                .send(Event::ShareSubmitted {
                    valid_share: share.is_valid(),
                    valid_block: false,
                    tx_hash: None,
                    block_accept_error: None,
                    share,
                })
                .ok();

            return;
        }

        let daemon = self.daemon.clone();
        let events = self.events.clone();

        tasks.spawn(async move {
            let (valid_block, tx_hash, block_accept_error) = match submit_block(&*daemon, &share).await
            {
                Ok(tx_hash) => (true, Some(tx_hash), None),
                Err(err) => {
                    error!("Block submission failed: {err}");
                    (false, None, Some(err))
                }
            };

            events
                .send(Event::ShareSubmitted {
                    valid_share: share.is_valid(),
                    valid_block,
                    tx_hash,
                    block_accept_error,
                    share,
                })
                .ok();

            Outcome::BlockSubmitted
        });
    }
}

/// Submits a block and confirms it with `getblock`. Returns the coinbase txid.
async fn submit_block(daemon: &dyn Daemon, share: &Share) -> Result<String, String> {
    let (Some(block_hex), Some(block_hash)) = (&share.block_hex, &share.block_hash) else {
        return Err("missing block data".into());
    };

    info!(
        "Submitting block {block_hash} at height {}",
        share.height.unwrap_or_default()
    );

    match daemon.submitblock(block_hex).await {
        Ok(None) => info!("Submitted block {block_hash} to daemon"),
        Ok(Some(reason)) => {
            error!("Daemon rejected a supposedly valid block: {reason}");
            return Err(reason);
        }
        Err(err) => return Err(err.to_string()),
    }

    let block = daemon.getblock(block_hash).await.map_err(|err| {
        error!("Failed to verify block submission {block_hash}: {err}");
        err.to_string()
    })?;

    block
        .tx
        .into_iter()
        .next()
        .ok_or_else(|| format!("block {block_hash} has no transactions"))
}
