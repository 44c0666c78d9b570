use {super::*, reqwest::StatusCode, snafu::ResultExt};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DaemonError {
    #[snafu(display("Failed to reach daemon at {url}: {source}"))]
    Transport { url: String, source: reqwest::Error },

    #[snafu(display("Daemon rejected username and/or password."))]
    Unauthorized,

    #[snafu(display("Daemon returned HTTP {status}: {body}"))]
    Status { status: u16, body: String },

    #[snafu(display("Failed to parse daemon response: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("Daemon error {code}: {message}"))]
    Rpc { code: i64, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DaemonInfo {
    #[serde(default)]
    pub blocks: u64,
    #[serde(default)]
    pub testnet: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockInfo {
    pub hash: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub tx: Vec<String>,
}

/// Coin daemon JSON-RPC. Implementors provide `call`; the typed helpers are built on it.
#[async_trait]
pub trait Daemon: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, DaemonError>;

    async fn getinfo(&self) -> Result<DaemonInfo, DaemonError> {
        ResultExt::context(serde_json::from_value(self.call("getinfo", json!([])).await?), JsonSnafu)
    }

    async fn getblocktemplate(&self) -> Result<BlockTemplate, DaemonError> {
        ResultExt::context(
            serde_json::from_value(self.call("getblocktemplate", json!([])).await?),
            JsonSnafu,
        )
    }

    /// Addresses with characters outside `[A-Za-z0-9]` are rejected without asking the daemon.
    async fn validate_address(&self, address: &str) -> Result<bool, DaemonError> {
        if address.is_empty() || !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(false);
        }

        let result = self.call("validateaddress", json!([address])).await?;

        Ok(result
            .get("isvalid")
            .and_then(Value::as_bool)
            .unwrap_or_default())
    }

    /// Returns the daemon's rejection reason, if it gave one.
    async fn submitblock(&self, block_hex: &str) -> Result<Option<String>, DaemonError> {
        let result = self.call("submitblock", json!([block_hex])).await?;

        Ok(match result {
            Value::Null => None,
            Value::String(reason) => Some(reason),
            other => Some(other.to_string()),
        })
    }

    async fn getblock(&self, hash: &str) -> Result<BlockInfo, DaemonError> {
        ResultExt::context(serde_json::from_value(self.call("getblock", json!([hash])).await?), JsonSnafu)
    }
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
}

fn parse_response(status: StatusCode, body: &str) -> Result<Value, DaemonError> {
    let parsed = serde_json::from_str::<RpcResponse>(body).or_else(|err| {
        if body.contains(":-nan,") {
            serde_json::from_str(&body.replace(":-nan,", ":0,"))
        } else {
            Err(err)
        }
    });

    let response = match parsed {
        Ok(response) => response,
        Err(_) if !status.is_success() => {
            return Err(DaemonError::Status {
                status: status.as_u16(),
                body: body.into(),
            });
        }
        Err(source) => return Err(DaemonError::Json { source }),
    };

    if !response.error.is_null() {
        return Err(DaemonError::Rpc {
            code: response
                .error
                .get("code")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            message: response
                .error
                .get("message")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| response.error.to_string()),
        });
    }

    Ok(response.result)
}

/// JSON-RPC over HTTP with basic auth.
#[derive(Debug)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
    id: AtomicU64,
}

impl RpcClient {
    const TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        Ok(Self {
            client: Context::context(
                reqwest::Client::builder().timeout(Self::TIMEOUT).build(),
                "failed to build daemon HTTP client",
            )?,
            url: format!("http://{host}:{port}/"),
            username: username.into(),
            password: password.into(),
            id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Daemon for RpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, DaemonError> {
        let request = json!({
            "method": method,
            "params": params,
            "id": self.id.fetch_add(1, Ordering::Relaxed),
        });

        let response = ResultExt::context(
            self.client
                .post(&self.url)
                .basic_auth(&self.username, Some(&self.password))
                .json(&request)
                .send()
                .await,
            TransportSnafu { url: &self.url },
        )?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            error!("Daemon rejected username and/or password.");
            return Err(DaemonError::Unauthorized);
        }

        let body = ResultExt::context(
            response.text().await,
            TransportSnafu { url: &self.url },
        )?;

        parse_response(status, &body)
    }
}
