use super::*;

/// One authorized worker name on a connection. Shares keep a handle to it, so it outlives the
/// connection and reports `is_removed` once the miner is gone.
#[derive(Debug)]
pub struct StratumWorker {
    name: Username,
    password: String,
    remote: SocketAddr,
    port: u16,
    user_agent: String,
    removed: AtomicBool,
}

impl StratumWorker {
    pub(crate) fn new(
        name: String,
        password: String,
        remote: SocketAddr,
        port: u16,
        user_agent: String,
    ) -> Self {
        Self {
            name: Username::from(name),
            password,
            remote,
            port,
            user_agent,
            removed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn ip(&self) -> IpAddr {
        self.remote.ip()
    }

    /// Local port the worker connected to.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Payout address, the part of the name before the first `.`.
    pub fn miner_address(&self) -> &str {
        self.name.miner_address()
    }

    pub fn short_name(&self) -> &str {
        self.name.short_name()
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
    }
}
