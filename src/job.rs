use super::*;

/// Pool-wide inputs to every coinbase.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub pool_address: Option<String>,
    pub signature: String,
    pub testnet: bool,
    pub rebroadcast_interval: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            pool_address: None,
            signature: DEFAULT_COINBASE_SIGNATURE.into(),
            testnet: false,
            rebroadcast_interval: BroadcastTimer::PERIOD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Submission {
    nonce: Vec<u8>,
    extranonce1: Vec<u8>,
    extranonce2: Vec<u8>,
    time: Vec<u8>,
}

#[derive(Debug)]
pub struct Job {
    pub(crate) id: JobId,
    pub(crate) template: BlockTemplate,
    pub(crate) difficulty: f64,
    pub(crate) difficulty_adj: f64,
    pub(crate) target: U256,
    pub(crate) coinbase: Coinbase,
    pub(crate) merkle_tree: MerkleTree,
    bits: [u8; 4],
    prev_hash: [u8; 32],
    submissions: Mutex<HashSet<Submission>>,
    transaction_data: Vec<u8>,
}

impl Job {
    pub(crate) fn new(id: JobId, template: BlockTemplate, config: &JobConfig) -> Result<Self> {
        let prev_hash: [u8; 32] = hex_to_le(&template.previous_block_hash)?
            .try_into()
            .map_err(|_| anyhow!("previousblockhash must be 32 bytes"))?;

        let bits: [u8; 4] = hex_to_le(&template.bits)?
            .try_into()
            .map_err(|_| anyhow!("bits must be 4 bytes"))?;

        let target = match &template.target {
            Some(target) => U256::from_str_radix(target, 16)
                .map_err(|err| anyhow!("invalid target `{target}`: {err:?}"))?,
            None => target_from_bits(LittleEndian::read_u32(&bits))?,
        };

        let network_difficulty = difficulty(target);

        let coinbase = CoinbaseBuilder::new(&template, config.testnet)
            .with_pool_address(config.pool_address.clone())
            .with_signature(config.signature.clone())
            .build()?;

        let merkle_tree = MerkleTree::new(
            template
                .transactions
                .iter()
                .map(TemplateTransaction::hash_bytes)
                .collect::<Result<_>>()?,
        );

        let mut transaction_data = Vec::new();
        for tx in &template.transactions {
            transaction_data.extend(
                hex::decode(&tx.data).with_context(|| "invalid transaction data in template")?,
            );
        }

        Ok(Self {
            id,
            difficulty: round_to(network_difficulty, 9),
            difficulty_adj: round_to(network_difficulty * POOL_MULTIPLIER, 9),
            target,
            coinbase,
            merkle_tree,
            bits,
            prev_hash,
            submissions: Mutex::new(HashSet::new()),
            transaction_data,
            template,
        })
    }

    pub(crate) fn height(&self) -> u64 {
        self.template.height
    }

    /// Previous block hash as display hex.
    pub(crate) fn prev_hash_hex(&self) -> String {
        le_to_hex(&self.prev_hash)
    }

    pub(crate) fn notify(&self, clean_jobs: bool) -> Notify {
        Notify {
            job_id: self.id,
            prevhash: self.prev_hash.into(),
            coinb1: self.coinbase.coinbase1.clone().into(),
            coinb2: self.coinbase.coinbase2.clone().into(),
            merkle_branches: self
                .merkle_tree
                .steps()
                .iter()
                .map(|step| HexBytes::from(*step))
                .collect(),
            version: self.template.version.to_le_bytes().into(),
            nbits: self.bits.into(),
            ntime: self.template.current_time.to_le_bytes().into(),
            clean_jobs,
        }
    }

    fn header_prefix(
        &self,
        extranonce1: &[u8],
        extranonce2: &[u8],
        time: &[u8; 4],
    ) -> (Vec<u8>, Vec<u8>) {
        let coinbase = self.coinbase.serialize(extranonce1, extranonce2);
        let merkle_root = self.merkle_tree.with_first(sha256d(&coinbase));

        let mut prefix = Vec::with_capacity(HEADER_SIZE);
        prefix.extend_from_slice(&self.template.version.to_le_bytes());
        prefix.extend_from_slice(&self.prev_hash);
        prefix.extend_from_slice(&merkle_root);
        prefix.extend_from_slice(time);
        prefix.extend_from_slice(&self.bits);

        (prefix, coinbase)
    }

    /// The 180-byte header hashed for the block hash, plus the coinbase it commits to.
    pub(crate) fn serialize_hash_header(
        &self,
        nonce: &[u8],
        extranonce1: &[u8],
        extranonce2: &[u8],
        time: &[u8; 4],
        mtp_hash_value: &[u8; 32],
    ) -> (Vec<u8>, Vec<u8>) {
        let (mut header, coinbase) = self.header_prefix(extranonce1, extranonce2, time);

        header.extend_from_slice(nonce);
        header.extend_from_slice(&MTP_VERSION.to_be_bytes());
        header.extend_from_slice(mtp_hash_value);
        header.resize(HEADER_SIZE, 0);

        (header, coinbase)
    }

    /// The 80-byte input the MTP proof is computed over.
    pub(crate) fn serialize_mtp_input(
        &self,
        extranonce1: &[u8],
        extranonce2: &[u8],
        time: &[u8; 4],
    ) -> [u8; 80] {
        let (prefix, _) = self.header_prefix(extranonce1, extranonce2, time);

        let mut input = [0u8; 80];
        input[..76].copy_from_slice(&prefix);
        BigEndian::write_u32(&mut input[76..], MTP_VERSION);
        input
    }

    pub(crate) fn serialize_block(
        &self,
        header: &[u8],
        hash_root: &[u8],
        block: &[u8],
        proof: &[u8],
        coinbase: &[u8],
    ) -> Result<Vec<u8>> {
        let mut serialized = Vec::with_capacity(
            header.len()
                + hash_root.len()
                + block.len()
                + proof.len()
                + 9
                + coinbase.len()
                + self.transaction_data.len(),
        );

        serialized.extend_from_slice(header);
        serialized.extend_from_slice(hash_root);
        serialized.extend_from_slice(block);
        serialized.extend_from_slice(proof);
        serialized.extend(pack_var_int(self.template.transactions.len() as u64 + 1)?);
        serialized.extend_from_slice(coinbase);
        serialized.extend_from_slice(&self.transaction_data);

        Ok(serialized)
    }

    /// Records a submission. Returns false if the same tuple was already submitted for this job.
    pub(crate) fn register_submit(
        &self,
        nonce: &[u8],
        extranonce1: &[u8],
        extranonce2: &[u8],
        time: &[u8],
    ) -> bool {
        self.submissions.lock().insert(Submission {
            nonce: nonce.to_vec(),
            extranonce1: extranonce1.to_vec(),
            extranonce2: extranonce2.to_vec(),
            time: time.to_vec(),
        })
    }
}
