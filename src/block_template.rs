use super::*;

/// `getblocktemplate` result. Hex fields are kept as the daemon sent them and decoded when a job
/// is built, so a malformed template fails job construction instead of the RPC call.
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct BlockTemplate {
    pub bits: String,
    #[serde(rename = "previousblockhash")]
    pub previous_block_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(rename = "curtime")]
    pub current_time: u32,
    pub height: u64,
    pub version: i32,
    #[serde(default)]
    pub transactions: Vec<TemplateTransaction>,
    #[serde(rename = "coinbasevalue")]
    pub coinbase_value: u64,
    #[serde(default)]
    pub coinbaseaux: CoinbaseAux,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_witness_commitment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub znode: Option<Znode>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct TemplateTransaction {
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl TemplateTransaction {
    /// Transaction hash in wire order, preferring `txid` over `hash`.
    pub(crate) fn hash_bytes(&self) -> Result<[u8; 32]> {
        let hex = self
            .txid
            .as_deref()
            .or(self.hash.as_deref())
            .ok_or_else(|| anyhow!("template transaction has neither txid nor hash"))?;

        hex_to_le(hex)?
            .try_into()
            .map_err(|bytes: Vec<u8>| anyhow!("transaction hash `{hex}` is {} bytes", bytes.len()))
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct CoinbaseAux {
    #[serde(default)]
    pub flags: String,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct Znode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(default)]
    pub amount: u64,
}
