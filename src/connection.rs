use super::*;

const DEFAULT_DISCONNECT_REASON: &str = "Client Disconnect";
const DEFAULT_USER_AGENT: &str = "unknown";
const BACKLOGGED: &str = "Backlogged";
/// Longest a single write may wait on a miner that is not reading.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) struct Connection<R, W> {
    context: Arc<ServerContext>,
    remote: SocketAddr,
    local_port: u16,
    reader: FramedRead<R, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
    commands: mpsc::Receiver<Command>,
    backlog: CancellationToken,
    subscription_id: String,
    extranonce1: Extranonce,
    subscribed: bool,
    authorized: bool,
    user_agent: String,
    difficulty: f64,
    previous_difficulty: f64,
    pending_difficulty: Option<f64>,
    last_activity: Instant,
    connected_at: Instant,
    workers: HashMap<String, Arc<StratumWorker>>,
    disconnect_reason: Option<String>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        context: Arc<ServerContext>,
        remote: SocketAddr,
        local_port: u16,
        subscription_id: String,
        extranonce1: Extranonce,
        reader: R,
        writer: W,
        commands: mpsc::Receiver<Command>,
        backlog: CancellationToken,
    ) -> Self {
        let now = Instant::now();

        Self {
            context,
            remote,
            local_port,
            reader: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE)),
            writer: FramedWrite::new(writer, LinesCodec::new()),
            commands,
            backlog,
            subscription_id,
            extranonce1,
            subscribed: false,
            authorized: false,
            user_agent: DEFAULT_USER_AGENT.into(),
            difficulty: 0.0,
            previous_difficulty: 0.0,
            pending_difficulty: None,
            last_activity: now,
            connected_at: now,
            workers: HashMap::new(),
            disconnect_reason: None,
        }
    }

    /// Runs until the miner goes away or is disconnected. Returns the disconnect reason.
    pub(crate) async fn serve(mut self) -> String {
        while self.disconnect_reason.is_none() {
            tokio::select! {
                line = self.reader.next() => match line {
                    Some(Ok(line)) => {
                        if let Err(err) = self.handle_line(&line).await {
                            warn!("Connection with {} failed: {err:#}", self.remote);
                            self.disconnect(DEFAULT_DISCONNECT_REASON);
                        }
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!("Socket flooded by {}", self.remote);
                        self.disconnect("Socket flooded");
                    }
                    Some(Err(LinesCodecError::Io(err))) => {
                        debug!("Read error from {}: {err}", self.remote);
                        self.disconnect(DEFAULT_DISCONNECT_REASON);
                    }
                    None => self.disconnect(DEFAULT_DISCONNECT_REASON),
                },
                command = self.commands.recv() => {
                    let result = match command {
                        Some(Command::Job { job, clean_jobs }) => self.send_job(&job, clean_jobs).await,
                        Some(Command::EnqueueDifficulty(difficulty)) => {
                            self.pending_difficulty = Some(difficulty);
                            Ok(())
                        }
                        Some(Command::Disconnect(reason)) => {
                            self.disconnect(&reason);
                            Ok(())
                        }
                        None => {
                            self.disconnect("Server stopping");
                            Ok(())
                        }
                    };

                    if let Err(err) = result {
                        warn!("Failed to write to {}: {err:#}", self.remote);
                        self.disconnect(DEFAULT_DISCONNECT_REASON);
                    }
                }
                _ = self.backlog.cancelled() => {
                    warn!("Disconnecting {}: command queue full", self.remote);
                    self.disconnect(BACKLOGGED);
                }
            }
        }

        for worker in self.workers.values() {
            worker.mark_removed();
        }

        debug!(
            "Connection with {} closed after {:?}",
            self.remote,
            self.connected_at.elapsed()
        );

        self.disconnect_reason
            .unwrap_or_else(|| DEFAULT_DISCONNECT_REASON.into())
    }

    fn disconnect(&mut self, reason: &str) {
        let reason = if self.backlog.is_cancelled() {
            BACKLOGGED
        } else {
            reason
        };

        if self.disconnect_reason.is_none() {
            self.disconnect_reason = Some(reason.into());
        }
    }

    async fn handle_line(&mut self, line: &str) -> Result {
        let message = match serde_json::from_str::<Message>(line) {
            Ok(message) => message,
            Err(err) => {
                warn!("Malformed message from {}: {err}", self.remote);

                self.context
                    .events
                    .send(Event::MalformedMessage {
                        address: self.remote,
                        message: line.into(),
                    })
                    .ok();

                self.disconnect("Malformed message");
                return Ok(());
            }
        };

        let (id, method, params) = match message {
            Message::Request { id, method, params } => (id, method, params),
            Message::Notification { id, method, params } => (id, method, params),
            Message::Response { .. } => {
                debug!("Ignoring response from {}", self.remote);
                return Ok(());
            }
        };

        match (self.subscribed, method.as_str()) {
            (false, "mining.subscribe") => self.subscribe(id, params).await,
            (true, "mining.authorize") => self.authorize(id, params).await,
            (true, "mining.submit") => self.submit(id, params).await,
            _ => {
                debug!("Unknown method {method} from {}", self.remote);

                self.context
                    .events
                    .send(Event::UnknownMethod {
                        address: self.remote,
                        method,
                    })
                    .ok();

                Ok(())
            }
        }
    }

    async fn subscribe(&mut self, id: Id, params: Value) -> Result {
        let subscribe = serde_json::from_value::<Subscribe>(params).unwrap_or_default();

        if let Some(user_agent) = subscribe.user_agent {
            self.user_agent = user_agent;
        }

        self.subscribed = true;

        info!(
            "Subscribed {} as {} with user agent {}",
            self.remote, self.subscription_id, self.user_agent
        );

        let result = SubscribeResult {
            subscription_id: HexBytes::from(hex_to_le(&self.subscription_id)?),
            extranonce1: self.extranonce1.clone(),
        };

        self.respond(id, Some(json!(result)), None).await
    }

    async fn authorize(&mut self, id: Id, params: Value) -> Result {
        let authorize = serde_json::from_value::<Authorize>(params.clone()).unwrap_or_else(|_| Authorize {
            username: params
                .get(0)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .into(),
            password: None,
        });

        let worker = Arc::new(StratumWorker::new(
            authorize.username.clone(),
            authorize.password.unwrap_or_default(),
            self.remote,
            self.local_port,
            self.user_agent.clone(),
        ));

        match self.context.authorizer.authorize(&worker).await {
            Ok(()) => {
                info!("Authorized {} on {}", authorize.username, self.remote);

                self.respond(id, Some(json!(true)), None).await?;

                self.authorized = true;
                self.workers.insert(authorize.username, worker);

                self.send_difficulty(self.context.start_difficulty).await?;

                if let Some(job) = self.context.jobs.current() {
                    self.send_job(&job, true).await?;
                }
            }
            Err(err) => {
                warn!(
                    "Rejected worker {} on {}: {err}",
                    authorize.username, self.remote
                );

                self.respond(
                    id,
                    Some(json!(false)),
                    Some(JsonRpcError {
                        error_code: 24,
                        message: err.to_string(),
                        traceback: None,
                    }),
                )
                .await?;

                worker.mark_removed();
                self.disconnect("Unauthorized");
            }
        }

        Ok(())
    }

    async fn submit(&mut self, id: Id, params: Value) -> Result {
        self.last_activity = Instant::now();

        let name = params.get(0).and_then(Value::as_str).unwrap_or_default();

        let worker = match self.workers.get(name) {
            Some(worker) if self.authorized => worker.clone(),
            _ => {
                warn!("Submit from unauthorized worker {name:?} on {}", self.remote);

                return self
                    .respond(
                        id,
                        None,
                        Some(StratumError::UnauthorizedWorker.into_response()),
                    )
                    .await;
            }
        };

        let share = self.context.processor.process(
            Submitter {
                worker: &worker,
                extranonce1: &self.extranonce1,
                difficulty: self.difficulty,
                previous_difficulty: self.previous_difficulty,
            },
            &params,
        );

        let result = json!(share.is_valid());
        let error = share.error.clone().map(StratumError::into_response);

        if self.context.shares.send(share).await.is_err() {
            warn!("Pool stopped, dropping share from {}", self.remote);
        }

        self.respond(id, Some(result), error).await
    }

    async fn send_difficulty(&mut self, difficulty: f64) -> Result {
        if difficulty == self.difficulty || difficulty <= 0.0 {
            return Ok(());
        }

        let Some(job) = self.context.jobs.current() else {
            return Ok(());
        };

        self.previous_difficulty = self.difficulty;
        self.difficulty = difficulty.min(job.difficulty_adj);

        debug!("Setting difficulty {} for {}", self.difficulty, self.remote);

        let target = target_from_difficulty(self.difficulty).to_little_endian();

        self.send(Message::notification(
            "mining.set_target",
            json!(SetTarget(HexBytes::from(target))),
        ))
        .await
    }

    async fn send_job(&mut self, job: &Job, clean_jobs: bool) -> Result {
        if self.last_activity.elapsed() > self.context.connection_timeout {
            info!("Disconnecting idle client {}", self.remote);
            self.disconnect("Timeout");
            return Ok(());
        }

        if !self.subscribed {
            return Ok(());
        }

        if let Some(difficulty) = self.pending_difficulty.take() {
            self.send_difficulty(difficulty).await?;
        }

        self.send(Message::notification(
            "mining.notify",
            json!(job.notify(clean_jobs)),
        ))
        .await
    }

    async fn respond(
        &mut self,
        id: Id,
        result: Option<Value>,
        error: Option<JsonRpcError>,
    ) -> Result {
        self.send(Message::Response { id, result, error }).await
    }

    async fn send(&mut self, message: Message) -> Result {
        let frame = serde_json::to_string(&message)?;

        tokio::select! {
            sent = tokio::time::timeout(WRITE_TIMEOUT, self.writer.send(frame)) => {
                sent.context("write timed out")??;
            }
            _ = self.backlog.cancelled() => bail!("command queue full"),
        }

        Ok(())
    }
}
