use {super::*, options::Options};

const ENV_PREFIX: &str = "MTP_POOL_";

/// TOML config file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub rpc_host: Option<String>,
    pub rpc_port: Option<u16>,
    pub rpc_username: Option<String>,
    pub rpc_password: Option<String>,

    pub pool: Option<PoolSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSection {
    pub address: Option<String>,
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub start_diff: Option<f64>,
    pub connection_timeout: Option<u64>,
    pub coinbase_signature: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settings {
    pub config: Option<PathBuf>,

    pub rpc_host: Option<String>,
    pub rpc_port: Option<u16>,
    pub rpc_username: Option<String>,
    pub rpc_password: Option<String>,

    pub pool_address: Option<String>,
    pub pool_listen: Option<String>,
    pub pool_port: Option<u16>,
    pub pool_start_diff: Option<f64>,
    pub pool_connection_timeout: Option<u64>,
    pub pool_coinbase_signature: Option<String>,
}

impl Settings {
    /// Load settings from the command line, `MTP_POOL_*` variables and the config file
    pub fn load(options: Options) -> Result<Self> {
        let mut env = BTreeMap::<String, String>::new();

        for (var, value) in std::env::vars_os() {
            let Some(var) = var.to_str() else {
                continue;
            };

            let Some(key) = var.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            env.insert(
                key.into(),
                value.into_string().map_err(|value| {
                    anyhow!(
                        "environment variable `{var}` not valid unicode: `{}`",
                        value.to_string_lossy()
                    )
                })?,
            );
        }

        Self::merge(options, env)
    }

    pub fn merge(options: Options, env: BTreeMap<String, String>) -> Result<Self> {
        let settings = Self::from_options(&options).or(Self::from_env(&env)?);

        let config = match &settings.config {
            Some(path) => toml::from_str(&fs::read_to_string(path).with_context(|| {
                format!("failed to open config file `{}`", path.display())
            })?)
            .with_context(|| format!("failed to deserialize config file `{}`", path.display()))?,
            None => Config::default(),
        };

        let settings = settings.or(Self::from_config(&config)).or_defaults();

        settings.validate()?;

        Ok(settings)
    }

    pub fn from_options(options: &Options) -> Self {
        Self {
            config: options.config.clone(),
            rpc_host: options.rpc_host.clone(),
            rpc_port: options.rpc_port,
            rpc_username: options.rpc_username.clone(),
            rpc_password: options.rpc_password.clone(),
            pool_address: options.address.clone(),
            pool_listen: options.listen.clone(),
            pool_port: options.port,
            pool_start_diff: options.start_diff,
            pool_connection_timeout: options.connection_timeout,
            pool_coinbase_signature: options.coinbase_signature.clone(),
        }
    }

    pub fn from_env(env: &BTreeMap<String, String>) -> Result<Self> {
        let get_string = |key: &str| env.get(key).cloned();

        let get_u16 = |key: &str| -> Result<Option<u16>> {
            env.get(key)
                .map(|int| int.parse::<u16>())
                .transpose()
                .with_context(|| format!("failed to parse environment variable {ENV_PREFIX}{key} as u16"))
        };

        let get_u64 = |key: &str| -> Result<Option<u64>> {
            env.get(key)
                .map(|int| int.parse::<u64>())
                .transpose()
                .with_context(|| format!("failed to parse environment variable {ENV_PREFIX}{key} as u64"))
        };

        let get_f64 = |key: &str| -> Result<Option<f64>> {
            env.get(key)
                .map(|f| f.parse::<f64>())
                .transpose()
                .with_context(|| format!("failed to parse environment variable {ENV_PREFIX}{key} as f64"))
        };

        Ok(Self {
            config: env.get("CONFIG").map(PathBuf::from),
            rpc_host: get_string("RPC_HOST"),
            rpc_port: get_u16("RPC_PORT")?,
            rpc_username: get_string("RPC_USERNAME"),
            rpc_password: get_string("RPC_PASSWORD"),
            pool_address: get_string("ADDRESS"),
            pool_listen: get_string("LISTEN"),
            pool_port: get_u16("PORT")?,
            pool_start_diff: get_f64("START_DIFF")?,
            pool_connection_timeout: get_u64("CONNECTION_TIMEOUT")?,
            pool_coinbase_signature: get_string("COINBASE_SIGNATURE"),
        })
    }

    pub fn from_config(config: &Config) -> Self {
        let pool = config.pool.as_ref();

        Self {
            config: None,
            rpc_host: config.rpc_host.clone(),
            rpc_port: config.rpc_port,
            rpc_username: config.rpc_username.clone(),
            rpc_password: config.rpc_password.clone(),
            pool_address: pool.and_then(|p| p.address.clone()),
            pool_listen: pool.and_then(|p| p.listen.clone()),
            pool_port: pool.and_then(|p| p.port),
            pool_start_diff: pool.and_then(|p| p.start_diff),
            pool_connection_timeout: pool.and_then(|p| p.connection_timeout),
            pool_coinbase_signature: pool.and_then(|p| p.coinbase_signature.clone()),
        }
    }

    /// Merge self with another Settings, self takes priority
    pub fn or(self, other: Self) -> Self {
        Self {
            config: self.config.or(other.config),
            rpc_host: self.rpc_host.or(other.rpc_host),
            rpc_port: self.rpc_port.or(other.rpc_port),
            rpc_username: self.rpc_username.or(other.rpc_username),
            rpc_password: self.rpc_password.or(other.rpc_password),
            pool_address: self.pool_address.or(other.pool_address),
            pool_listen: self.pool_listen.or(other.pool_listen),
            pool_port: self.pool_port.or(other.pool_port),
            pool_start_diff: self.pool_start_diff.or(other.pool_start_diff),
            pool_connection_timeout: self
                .pool_connection_timeout
                .or(other.pool_connection_timeout),
            pool_coinbase_signature: self
                .pool_coinbase_signature
                .or(other.pool_coinbase_signature),
        }
    }

    fn or_defaults(self) -> Self {
        let defaults = PoolConfig::default();

        Self {
            config: self.config,
            rpc_host: Some(self.rpc_host.unwrap_or_else(|| "127.0.0.1".into())),
            rpc_port: Some(self.rpc_port.unwrap_or(18888)),
            rpc_username: self.rpc_username,
            rpc_password: self.rpc_password,
            pool_address: self.pool_address,
            pool_listen: Some(self.pool_listen.unwrap_or(defaults.listen)),
            pool_port: Some(self.pool_port.unwrap_or(defaults.port)),
            pool_start_diff: Some(self.pool_start_diff.unwrap_or(defaults.start_difficulty)),
            pool_connection_timeout: Some(
                self.pool_connection_timeout
                    .unwrap_or(defaults.connection_timeout.as_secs()),
            ),
            pool_coinbase_signature: Some(
                self.pool_coinbase_signature
                    .unwrap_or(defaults.coinbase_signature),
            ),
        }
    }

    fn validate(&self) -> Result {
        if let Some(start_diff) = self.pool_start_diff {
            ensure!(
                start_diff > 0.0 && start_diff.is_finite(),
                "invalid start difficulty {start_diff}: must be positive"
            );
        }

        match (&self.rpc_username, &self.rpc_password) {
            (None, Some(_)) => bail!("daemon RPC password specified without username"),
            (Some(_), None) => bail!("daemon RPC username specified without password"),
            _ => {}
        }

        Ok(())
    }

    pub fn rpc_client(&self) -> Result<RpcClient> {
        let client = RpcClient::new(
            self.rpc_host.as_deref().unwrap_or("127.0.0.1"),
            self.rpc_port.unwrap_or(18888),
            self.rpc_username.as_deref().unwrap_or_default(),
            self.rpc_password.as_deref().unwrap_or_default(),
        )?;

        info!("Connecting to daemon at {}", client.url());

        Ok(client)
    }

    pub fn pool_config(&self) -> PoolConfig {
        let defaults = PoolConfig::default();

        PoolConfig {
            address: self.pool_address.clone(),
            listen: self.pool_listen.clone().unwrap_or(defaults.listen),
            port: self.pool_port.unwrap_or(defaults.port),
            start_difficulty: self.pool_start_diff.unwrap_or(defaults.start_difficulty),
            connection_timeout: self
                .pool_connection_timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.connection_timeout),
            coinbase_signature: self
                .pool_coinbase_signature
                .clone()
                .unwrap_or(defaults.coinbase_signature),
            poll_interval: defaults.poll_interval,
            rebroadcast_interval: defaults.rebroadcast_interval,
        }
    }

    pub fn job_config(&self, testnet: bool) -> JobConfig {
        JobConfig {
            pool_address: self.pool_address.clone(),
            signature: self
                .pool_coinbase_signature
                .clone()
                .unwrap_or_else(|| DEFAULT_COINBASE_SIGNATURE.into()),
            testnet,
            rebroadcast_interval: BroadcastTimer::PERIOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let settings = Settings::merge(Options::default(), BTreeMap::new()).unwrap();

        assert_eq!(settings.rpc_host, Some("127.0.0.1".into()));
        assert_eq!(settings.rpc_port, Some(18888));
        assert_eq!(settings.pool_listen, Some("0.0.0.0".into()));
        assert_eq!(settings.pool_port, Some(3000));
        assert_eq!(settings.pool_start_diff, Some(1.0));
        assert_eq!(settings.pool_connection_timeout, Some(600));
        assert_eq!(
            settings.pool_coinbase_signature,
            Some("/MintPond MTP Ref/".into())
        );
        assert_eq!(settings.pool_address, None);
    }

    #[test]
    fn settings_from_env() {
        let settings = Settings::from_env(&env(&[
            ("RPC_PORT", "8888"),
            ("RPC_USERNAME", "user"),
            ("START_DIFF", "0.5"),
        ]))
        .unwrap();

        assert_eq!(settings.rpc_port, Some(8888));
        assert_eq!(settings.rpc_username, Some("user".into()));
        assert_eq!(settings.pool_start_diff, Some(0.5));
    }

    #[test]
    fn bad_env_value() {
        let err = Settings::from_env(&env(&[("PORT", "lots")])).unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to parse environment variable MTP_POOL_PORT as u16"
        );
    }

    #[test]
    fn command_line_beats_env() {
        let options = Options {
            port: Some(4000),
            ..Default::default()
        };

        let settings = Settings::merge(options, env(&[("PORT", "5000"), ("LISTEN", "127.0.0.1")]))
            .unwrap();

        assert_eq!(settings.pool_port, Some(4000));
        assert_eq!(settings.pool_listen, Some("127.0.0.1".into()));
    }

    #[test]
    fn config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtp-pool.toml");

        fs::write(
            &path,
            r#"
                rpc_port = 28888
                rpc_username = "user"
                rpc_password = "pass"

                [pool]
                port = 3333
                start_diff = 0.01
                coinbase_signature = "/test/"
            "#,
        )
        .unwrap();

        let options = Options {
            config: Some(path),
            rpc_port: Some(18000),
            ..Default::default()
        };

        let settings = Settings::merge(options, env(&[("START_DIFF", "2")])).unwrap();

        assert_eq!(settings.rpc_port, Some(18000));
        assert_eq!(settings.rpc_username, Some("user".into()));
        assert_eq!(settings.pool_port, Some(3333));
        assert_eq!(settings.pool_start_diff, Some(2.0));
        assert_eq!(settings.pool_coinbase_signature, Some("/test/".into()));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(toml::from_str::<Config>("vardiff = true").is_err());
        assert!(toml::from_str::<Config>("[pool]\nversion_mask = \"ff\"").is_err());
    }

    #[test]
    fn missing_config_file() {
        let options = Options {
            config: Some("/nonexistent/mtp-pool.toml".into()),
            ..Default::default()
        };

        assert!(
            Settings::merge(options, BTreeMap::new())
                .unwrap_err()
                .to_string()
                .starts_with("failed to open config file")
        );
    }

    #[test]
    fn start_diff_must_be_positive() {
        for start_diff in ["0", "-1"] {
            assert!(Settings::merge(Options::default(), env(&[("START_DIFF", start_diff)])).is_err());
        }
    }

    #[test]
    fn rpc_credentials_come_in_pairs() {
        assert!(Settings::merge(Options::default(), env(&[("RPC_USERNAME", "user")])).is_err());
        assert!(Settings::merge(Options::default(), env(&[("RPC_PASSWORD", "pass")])).is_err());
    }

    #[test]
    fn pool_config() {
        let settings = Settings::merge(
            Options::default(),
            env(&[("CONNECTION_TIMEOUT", "30"), ("ADDRESS", "TBVKqLhVBt4a")]),
        )
        .unwrap();

        let config = settings.pool_config();

        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.address, Some("TBVKqLhVBt4a".into()));
        assert_eq!(config.port, 3000);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }
}
