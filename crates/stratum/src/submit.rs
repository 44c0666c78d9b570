use super::*;

/// `mining.submit(worker, jobId, extraNonce2, time, nonce, mtpHashRoot, mtpBlock, mtpProof)`.
/// Every field after the worker name is raw wire bytes; sizes are judged by the share processor.
#[derive(Debug, PartialEq, Clone)]
pub struct Submit {
    pub username: String,
    pub job_id: HexBytes,
    pub extranonce2: HexBytes,
    pub ntime: HexBytes,
    pub nonce: HexBytes,
    pub mtp_hash_root: HexBytes,
    pub mtp_block: HexBytes,
    pub mtp_proof: HexBytes,
}

impl Submit {
    /// Lenient parse used by the server. A field that is missing or not a hex string fails with
    /// its own malformed error, checked in a fixed order.
    pub fn from_params(params: &Value) -> Result<Self, StratumError> {
        let field = |index: usize, error: StratumError| -> Result<HexBytes, StratumError> {
            params
                .get(index)
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<HexBytes>().ok())
                .ok_or(error)
        };

        let username = params
            .get(0)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let job_id = field(1, StratumError::MalformedJobId)?;
        let ntime = field(3, StratumError::MalformedTime)?;
        let nonce = field(4, StratumError::MalformedNonce)?;
        let extranonce2 = field(2, StratumError::MalformedExtranonce2)?;
        let mtp_hash_root = field(5, StratumError::MalformedMtpHashRoot)?;
        let mtp_block = field(6, StratumError::MalformedMtpBlock)?;
        let mtp_proof = field(7, StratumError::MalformedMtpProof)?;

        Ok(Self {
            username,
            job_id,
            extranonce2,
            ntime,
            nonce,
            mtp_hash_root,
            mtp_block,
            mtp_proof,
        })
    }
}

impl Serialize for Submit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(8))?;
        seq.serialize_element(&self.username)?;
        seq.serialize_element(&self.job_id)?;
        seq.serialize_element(&self.extranonce2)?;
        seq.serialize_element(&self.ntime)?;
        seq.serialize_element(&self.nonce)?;
        seq.serialize_element(&self.mtp_hash_root)?;
        seq.serialize_element(&self.mtp_block)?;
        seq.serialize_element(&self.mtp_proof)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Submit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (username, job_id, extranonce2, ntime, nonce, mtp_hash_root, mtp_block, mtp_proof) =
            <(
                String,
                HexBytes,
                HexBytes,
                HexBytes,
                HexBytes,
                HexBytes,
                HexBytes,
                HexBytes,
            )>::deserialize(deserializer)?;

        Ok(Submit {
            username,
            job_id,
            extranonce2,
            ntime,
            nonce,
            mtp_hash_root,
            mtp_block,
            mtp_proof,
        })
    }
}
