use super::*;

/// Everything the pool reports to observers.
#[derive(Debug, Clone)]
pub enum Event {
    Started {
        address: SocketAddr,
    },
    ClientConnected {
        address: SocketAddr,
        subscription_id: String,
    },
    ClientDisconnected {
        address: SocketAddr,
        subscription_id: String,
        reason: String,
    },
    ShareSubmitted {
        share: Arc<Share>,
        valid_share: bool,
        valid_block: bool,
        tx_hash: Option<String>,
        block_accept_error: Option<String>,
    },
    NewBlock {
        job_id: JobId,
        height: u64,
    },
    BroadcastJobs {
        job_id: JobId,
        clean_jobs: bool,
    },
    UnknownMethod {
        address: SocketAddr,
        method: String,
    },
    MalformedMessage {
        address: SocketAddr,
        message: String,
    },
}
