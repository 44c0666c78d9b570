use super::*;

#[derive(Clone, Debug)]
pub struct CoinbaseBuilder {
    aux_flags: String,
    founders: Founders,
    height: u64,
    pool_address: Option<String>,
    signature: String,
    timestamp: Option<u64>,
    value: u64,
    witness_commitment: Option<String>,
    znode: Option<Znode>,
}

impl CoinbaseBuilder {
    const MAX_INPUT_SCRIPT_SIZE: usize = 100;

    /// Bytes reserved in the input script for extranonce1 and extranonce2.
    pub(crate) const EXTRANONCE_SIZE: usize = Extranonce::SIZE + EXTRANONCE2_SIZE;

    pub fn new(template: &BlockTemplate, testnet: bool) -> Self {
        Self {
            aux_flags: template.coinbaseaux.flags.clone(),
            founders: Founders::for_network(testnet),
            height: template.height,
            pool_address: None,
            signature: DEFAULT_COINBASE_SIGNATURE.into(),
            timestamp: None,
            value: template.coinbase_value,
            witness_commitment: template.default_witness_commitment.clone(),
            znode: template.znode.clone(),
        }
    }

    pub fn with_pool_address(mut self, pool_address: Option<String>) -> Self {
        self.pool_address = pool_address;
        self
    }

    pub fn with_signature(mut self, signature: String) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub(crate) fn build(self) -> Result<Coinbase> {
        let timestamp = match self.timestamp {
            Some(timestamp) => timestamp,
            None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
        };

        let signature = serialize_string(&self.signature);

        let mut input_script = serialize_number(self.height);
        input_script.extend(
            hex::decode(&self.aux_flags)
                .with_context(|| format!("invalid coinbaseaux flags `{}`", self.aux_flags))?,
        );
        input_script.extend(serialize_number(timestamp));
        input_script.push(Self::EXTRANONCE_SIZE as u8);

        let input_script_len = input_script.len() + Self::EXTRANONCE_SIZE + signature.len();

        ensure!(
            input_script_len <= Self::MAX_INPUT_SCRIPT_SIZE,
            "Coinbase input script is too large"
        );

        let mut coinbase1 = Vec::with_capacity(42 + input_script.len());
        coinbase1.write_u32::<LittleEndian>(1)?;
        coinbase1.extend(pack_var_int(1)?);
        coinbase1.extend_from_slice(&[0; 32]);
        coinbase1.extend_from_slice(&[0xff; 4]);
        coinbase1.extend(pack_var_int(input_script_len as u64)?);
        coinbase1.extend(input_script);

        let outputs = self.outputs()?;

        let mut coinbase2 = signature;
        coinbase2.extend_from_slice(&[0xff; 4]);
        coinbase2.extend(pack_var_int(outputs.len() as u64)?);
        for output in outputs {
            coinbase2.extend(output);
        }
        coinbase2.write_u32::<LittleEndian>(0)?;

        Ok(Coinbase {
            coinbase1,
            coinbase2,
        })
    }

    fn outputs(&self) -> Result<Vec<Vec<u8>>> {
        let mut outputs = Vec::new();

        if let Some(Znode {
            payee: Some(payee),
            amount,
        }) = &self.znode
        {
            outputs.push(Self::output(*amount, &address_to_script(payee)?)?);
        }

        for (address, reward) in self.founders.outputs() {
            outputs.push(Self::output(reward, &address_to_script(address)?)?);
        }

        if let Some(address) = &self.pool_address {
            outputs.insert(0, Self::output(self.value, &address_to_script(address)?)?);
        }

        if let Some(commitment) = &self.witness_commitment {
            let script = hex::decode(commitment)
                .with_context(|| format!("invalid witness commitment `{commitment}`"))?;
            outputs.insert(0, Self::output(0, &script)?);
        }

        Ok(outputs)
    }

    fn output(value: u64, script: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(9 + script.len());
        output.write_u64::<LittleEndian>(value)?;
        output.extend(pack_var_int(script.len() as u64)?);
        output.extend_from_slice(script);
        Ok(output)
    }
}
