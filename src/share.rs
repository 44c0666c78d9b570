use super::*;

/// Outcome of one `mining.submit`. Hex fields are in display order, reversed from the wire.
#[derive(Debug, Clone)]
pub struct Share {
    pub job_id: Option<JobId>,
    pub height: Option<u64>,
    pub worker: Arc<StratumWorker>,
    pub extranonce1: String,
    pub extranonce2: String,
    pub nonce: String,
    pub time: String,
    pub mtp_hash_root: String,
    pub mtp_hash_value: String,
    pub share_difficulty: f64,
    pub stratum_difficulty: f64,
    pub submit_time: u64,
    pub error: Option<StratumError>,
    pub block_hex: Option<String>,
    pub block_hash: Option<String>,
}

impl Share {
    pub(crate) fn new(
        worker: Arc<StratumWorker>,
        extranonce1: &Extranonce,
        stratum_difficulty: f64,
    ) -> Self {
        Self {
            job_id: None,
            height: None,
            worker,
            extranonce1: le_to_hex(extranonce1.as_bytes()),
            extranonce2: String::new(),
            nonce: String::new(),
            time: String::new(),
            mtp_hash_root: String::new(),
            mtp_hash_value: String::new(),
            share_difficulty: 0.0,
            stratum_difficulty,
            submit_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|duration| duration.as_millis() as u64)
                .unwrap_or_default(),
            error: None,
            block_hex: None,
            block_hash: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_block(&self) -> bool {
        self.is_valid() && self.block_hex.is_some()
    }
}
