use super::*;

/// A coinbase transaction split around the extranonce placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Coinbase {
    pub(crate) coinbase1: Vec<u8>,
    pub(crate) coinbase2: Vec<u8>,
}

impl Coinbase {
    pub(crate) fn serialize(&self, extranonce1: &[u8], extranonce2: &[u8]) -> Vec<u8> {
        let mut tx = Vec::with_capacity(
            self.coinbase1.len() + extranonce1.len() + extranonce2.len() + self.coinbase2.len(),
        );

        tx.extend_from_slice(&self.coinbase1);
        tx.extend_from_slice(extranonce1);
        tx.extend_from_slice(extranonce2);
        tx.extend_from_slice(&self.coinbase2);
        tx
    }

    pub(crate) fn hash(&self, extranonce1: &[u8], extranonce2: &[u8]) -> [u8; 32] {
        sha256d(&self.serialize(extranonce1, extranonce2))
    }
}
