use super::*;

const NONCE_SIZE: usize = 4;
const TIME_SIZE: usize = 4;
/// Seconds a submitted time may run ahead of the local clock.
const MAX_TIME_AHEAD: u64 = 7200;
/// Shares within one percent of the client difficulty still count.
const DIFFICULTY_TOLERANCE: f64 = 0.99;

/// Per-connection inputs to share validation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Submitter<'a> {
    pub(crate) worker: &'a Arc<StratumWorker>,
    pub(crate) extranonce1: &'a Extranonce,
    pub(crate) difficulty: f64,
    pub(crate) previous_difficulty: f64,
}

pub(crate) struct ShareProcessor {
    jobs: Arc<JobManager>,
    verifier: Arc<dyn MtpVerifier>,
}

impl ShareProcessor {
    pub(crate) fn new(jobs: Arc<JobManager>, verifier: Arc<dyn MtpVerifier>) -> Self {
        Self { jobs, verifier }
    }

    /// Judges raw `mining.submit` params. The returned share carries the error, if any.
    pub(crate) fn process(&self, submitter: Submitter, params: &Value) -> Share {
        let mut share = Share::new(
            submitter.worker.clone(),
            submitter.extranonce1,
            submitter.difficulty,
        );

        if let Err(error) = self.evaluate(&mut share, submitter, params) {
            share.error = Some(error);
        }

        share
    }

    fn evaluate(
        &self,
        share: &mut Share,
        submitter: Submitter,
        params: &Value,
    ) -> Result<(), StratumError> {
        let submit = Submit::from_params(params)?;

        let nonce = submit.nonce.as_bytes();
        let extranonce1 = submitter.extranonce1.as_bytes();
        let extranonce2 = submit.extranonce2.as_bytes();
        let hash_root = submit.mtp_hash_root.as_bytes();
        let block = submit.mtp_block.as_bytes();
        let proof = submit.mtp_proof.as_bytes();

        share.nonce = le_to_hex(nonce);
        share.extranonce2 = le_to_hex(extranonce2);
        share.time = le_to_hex(submit.ntime.as_bytes());
        share.mtp_hash_root = le_to_hex(hash_root);

        if nonce.len() != NONCE_SIZE {
            return Err(StratumError::IncorrectNonceSize);
        }

        if extranonce2.len() != EXTRANONCE2_SIZE {
            return Err(StratumError::IncorrectExtranonce2Size);
        }

        let time: [u8; TIME_SIZE] = submit
            .ntime
            .as_bytes()
            .try_into()
            .map_err(|_| StratumError::IncorrectTimeSize)?;

        if hash_root.len() != MTP_HASH_ROOT_SIZE {
            return Err(StratumError::IncorrectMtpHashRootSize);
        }

        if block.len() != MTP_BLOCK_SIZE {
            return Err(StratumError::IncorrectMtpBlockSize);
        }

        let job = JobId::from_wire(submit.job_id.as_bytes())
            .and_then(|id| self.jobs.get(id))
            .ok_or(StratumError::Stale)?;

        share.job_id = Some(job.id);
        share.height = Some(job.height());

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or_default();

        let time_value = u64::from(u32::from_le_bytes(time));

        if time_value < u64::from(job.template.current_time) || time_value > now + MAX_TIME_AHEAD {
            return Err(StratumError::TimeOutOfRange);
        }

        if !job.register_submit(nonce, extranonce1, extranonce2, &time) {
            return Err(StratumError::Duplicate);
        }

        let input = job.serialize_mtp_input(extranonce1, extranonce2, &time);

        let hash_value = self
            .verifier
            .verify(&input, nonce, hash_root, block, proof)
            .ok_or(StratumError::MtpVerifyFailed)?;

        share.mtp_hash_value = le_to_hex(&hash_value);

        let hash = U256::from_little_endian(&hash_value);
        let share_difficulty = difficulty(hash);

        share.share_difficulty = round_to(share_difficulty, 8);

        if job.target >= hash {
            let (header, coinbase) =
                job.serialize_hash_header(nonce, extranonce1, extranonce2, &time, &hash_value);

            match job.serialize_block(&header, hash_root, block, proof, &coinbase) {
                Ok(serialized) => {
                    share.block_hex = Some(hex::encode(serialized));
                    share.block_hash = Some(le_to_hex(&sha256d(&header)));
                    return Ok(());
                }
                Err(err) => error!("Failed to serialize block for job {}: {err}", job.id),
            }
        }

        if share_difficulty / submitter.difficulty >= DIFFICULTY_TOLERANCE {
            return Ok(());
        }

        if submitter.previous_difficulty > 0.0 && share_difficulty >= submitter.previous_difficulty
        {
            share.stratum_difficulty = submitter.previous_difficulty;
            return Ok(());
        }

        Err(StratumError::LowDifficulty)
    }
}
