use super::*;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Instructions from the pool to a connection task.
#[derive(Debug)]
pub(crate) enum Command {
    Job { job: Arc<Job>, clean_jobs: bool },
    EnqueueDifficulty(f64),
    Disconnect(String),
}

/// State every connection reads.
pub(crate) struct ServerContext {
    pub(crate) jobs: Arc<JobManager>,
    pub(crate) processor: ShareProcessor,
    pub(crate) authorizer: Arc<dyn Authorizer>,
    pub(crate) events: broadcast::Sender<Event>,
    pub(crate) shares: mpsc::Sender<Share>,
    pub(crate) start_difficulty: f64,
    pub(crate) connection_timeout: Duration,
}

/// Never waits on the connection. A client whose queue is full is cut off through `backlog`.
#[derive(Debug, Clone)]
pub(crate) struct ClientHandle {
    pub(crate) subscription_id: String,
    commands: mpsc::Sender<Command>,
    backlog: CancellationToken,
}

impl ClientHandle {
    fn send(&self, command: Command) {
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Client {} is not keeping up, disconnecting", self.subscription_id);
                self.backlog.cancel();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Client {} already gone", self.subscription_id);
            }
        }
    }

    /// Takes effect with the next job sent to the client.
    pub(crate) fn enqueue_difficulty(&self, difficulty: f64) {
        self.send(Command::EnqueueDifficulty(difficulty));
    }

    pub(crate) fn disconnect(&self, reason: &str) {
        self.send(Command::Disconnect(reason.into()));
    }
}

/// Accepts miner connections and fans jobs out to them.
pub(crate) struct Server {
    context: Arc<ServerContext>,
    clients: DashMap<String, ClientHandle>,
    extranonces: ExtraNonceCounter,
    subscriptions: SubscriptionCounter,
    stopped: AtomicBool,
}

impl Server {
    pub(crate) fn new(context: ServerContext) -> Self {
        Self {
            context: Arc::new(context),
            clients: DashMap::new(),
            extranonces: ExtraNonceCounter::new(),
            subscriptions: SubscriptionCounter::new(),
            stopped: AtomicBool::new(false),
        }
    }

    pub(crate) fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub(crate) fn client(&self, subscription_id: &str) -> Option<ClientHandle> {
        self.clients
            .get(subscription_id)
            .map(|entry| entry.value().clone())
    }

    pub(crate) async fn serve(self: Arc<Self>, listener: TcpListener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, address)) => self.clone().accept(stream, address),
                    Err(err) => warn!("Failed to accept connection: {err}"),
                }
            }
        }

        info!("Stratum listener closed");
    }

    fn accept(self: Arc<Self>, stream: TcpStream, address: SocketAddr) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }

        let local_port = match stream.local_addr() {
            Ok(local) => local.port(),
            Err(err) => {
                warn!("Dropping connection from {address}: {err}");
                return;
            }
        };

        let subscription_id = self.subscriptions.next();
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let backlog = CancellationToken::new();

        self.clients.insert(
            subscription_id.clone(),
            ClientHandle {
                subscription_id: subscription_id.clone(),
                commands: tx,
                backlog: backlog.clone(),
            },
        );

        info!("Accepted connection from {address}");

        self.context
            .events
            .send(Event::ClientConnected {
                address,
                subscription_id: subscription_id.clone(),
            })
            .ok();

        let (reader, writer) = stream.into_split();

        let connection = Connection::new(
            self.context.clone(),
            address,
            local_port,
            subscription_id.clone(),
            self.extranonces.next(),
            reader,
            writer,
            rx,
            backlog,
        );

        tokio::spawn(async move {
            let reason = connection.serve().await;

            self.clients.remove(&subscription_id);

            info!("Client {address} disconnected: {reason}");

            self.context
                .events
                .send(Event::ClientDisconnected {
                    address,
                    subscription_id,
                    reason,
                })
                .ok();
        });
    }

    /// Queues `job` for every connected client and pushes back the rebroadcast deadline.
    pub(crate) fn broadcast(&self, job: &Arc<Job>, clean_jobs: bool) {
        let handles = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();

        debug!(
            "Broadcasting job {} to {} clients, clean_jobs={clean_jobs}",
            job.id,
            handles.len()
        );

        for handle in handles {
            handle.send(Command::Job {
                job: job.clone(),
                clean_jobs,
            });
        }

        self.context.jobs.reset_broadcast();
    }

    pub(crate) fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        self.context.jobs.stop_broadcast();

        let handles = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();

        for handle in handles {
            handle.disconnect("Server stopping");
        }
    }
}
