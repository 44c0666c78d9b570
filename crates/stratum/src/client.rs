use {
    super::*,
    error::{ChannelRecvSnafu, IoSnafu, SerializationSnafu, TimeoutSnafu},
    snafu::ResultExt,
    std::{
        collections::BTreeMap,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    },
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter},
        net::{TcpStream, ToSocketAddrs, tcp::OwnedWriteHalf},
        sync::{Mutex, mpsc, oneshot},
        task::JoinHandle,
    },
    tracing::{debug, warn},
};

pub use error::ClientError;

mod error;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

type Pending = Arc<Mutex<BTreeMap<Id, oneshot::Sender<Message>>>>;

/// Minimal async Stratum client. Responses are matched to requests by id; everything the server
/// pushes arrives on `incoming`, which closes when the server hangs up.
pub struct Client {
    pub incoming: mpsc::Receiver<Message>,
    id_counter: AtomicU64,
    listener: JoinHandle<()>,
    password: Option<String>,
    pending: Pending,
    username: String,
    writer: BufWriter<OwnedWriteHalf>,
}

impl Client {
    pub async fn connect(
        address: impl ToSocketAddrs,
        username: impl Into<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .context(TimeoutSnafu)?
            .context(IoSnafu)?;

        let (reader, writer) = {
            let (rx, tx) = stream.into_split();
            (BufReader::new(rx), BufWriter::new(tx))
        };

        let (incoming_tx, incoming_rx) = mpsc::channel(64);

        let pending = Pending::default();

        let listener = {
            let pending = pending.clone();
            tokio::spawn(async move { Self::listener(reader, incoming_tx, pending).await })
        };

        Ok(Self {
            incoming: incoming_rx,
            id_counter: AtomicU64::new(1),
            listener,
            password,
            pending,
            username: username.into(),
            writer,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn disconnect(&mut self) -> Result {
        self.writer.shutdown().await.context(IoSnafu)?;
        self.listener.abort();
        Ok(())
    }

    async fn listener<R>(mut reader: BufReader<R>, incoming: mpsc::Sender<Message>, pending: Pending)
    where
        R: AsyncRead + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("Stratum server disconnected");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("Read error: {err}");
                    break;
                }
            }

            let message = match serde_json::from_str::<Message>(&line) {
                Ok(message) => message,
                Err(err) => {
                    warn!("Invalid JSON message: {line:?} - {err}");
                    continue;
                }
            };

            let response_id = match &message {
                Message::Response { id, .. } => Some(id.clone()),
                _ => None,
            };

            match response_id {
                Some(id) => {
                    let tx = pending.lock().await.remove(&id);

                    match tx {
                        Some(tx) => {
                            if tx.send(message).is_err() {
                                debug!("Dropped response for id={id}: receiver went away");
                            }
                        }
                        None => warn!("Unmatched response: {line}"),
                    }
                }
                None => {
                    if incoming.send(message).await.is_err() {
                        break;
                    }
                }
            }
        }

        pending.lock().await.clear();
    }

    pub async fn subscribe(&mut self, user_agent: &str) -> Result<SubscribeResult> {
        let params = serde_json::to_value(Subscribe {
            user_agent: Some(user_agent.into()),
        })
        .context(SerializationSnafu)?;

        let result = Self::result("mining.subscribe", self.request("mining.subscribe", params).await?)?;

        serde_json::from_value(result).context(SerializationSnafu)
    }

    pub async fn authorize(&mut self) -> Result {
        let params = serde_json::to_value(Authorize {
            username: self.username.clone(),
            password: self.password.clone(),
        })
        .context(SerializationSnafu)?;

        let result = Self::result("mining.authorize", self.request("mining.authorize", params).await?)?;

        if result == Value::Bool(true) {
            Ok(())
        } else {
            Err(ClientError::Protocol {
                message: format!("mining.authorize returned {result}"),
            })
        }
    }

    pub async fn submit(&mut self, submit: &Submit) -> Result {
        let params = serde_json::to_value(submit).context(SerializationSnafu)?;

        let result = Self::result("mining.submit", self.request("mining.submit", params).await?)?;

        if result == Value::Bool(true) {
            Ok(())
        } else {
            Err(ClientError::Protocol {
                message: format!("mining.submit returned {result}"),
            })
        }
    }

    /// Sends a request and waits for the response with the matching id.
    pub async fn request(&mut self, method: &str, params: Value) -> Result<Message> {
        let id = Id::Number(self.id_counter.fetch_add(1, Ordering::Relaxed));

        let (tx, rx) = oneshot::channel();

        self.pending.lock().await.insert(id.clone(), tx);

        let message = Message::Request {
            id,
            method: method.into(),
            params,
        };

        let frame = serde_json::to_string(&message).context(SerializationSnafu)?;

        self.send_raw(&frame).await?;

        rx.await.context(ChannelRecvSnafu)
    }

    /// Writes one line without waiting for any reply.
    pub async fn send_raw(&mut self, line: &str) -> Result {
        self.writer
            .write_all(line.as_bytes())
            .await
            .context(IoSnafu)?;
        self.writer.write_all(b"\n").await.context(IoSnafu)?;
        self.writer.flush().await.context(IoSnafu)
    }

    fn result(method: &'static str, message: Message) -> Result<Value> {
        match message {
            Message::Response {
                error: Some(error), ..
            } => Err(ClientError::Rejected { method, error }),
            Message::Response { result, .. } => Ok(result.unwrap_or(Value::Null)),
            other => Err(ClientError::Protocol {
                message: format!("unexpected reply to {method}: {other:?}"),
            }),
        }
    }
}
