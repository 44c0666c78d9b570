use super::*;

type Hash = [u8; 32];

fn join(left: &Hash, right: &Hash) -> Hash {
    let mut concat = [0u8; 64];
    concat[..32].copy_from_slice(left);
    concat[32..].copy_from_slice(right);
    sha256d(&concat)
}

fn duplicate_last_if_odd(level: &mut Vec<Hash>) {
    if level.len() % 2 == 1
        && let Some(last) = level.last().copied()
    {
        level.push(last);
    }
}

/// Merkle tree over the non-coinbase transaction hashes of a template. The coinbase occupies the
/// first leaf and is only known once a miner submits, so the tree keeps the branch needed to fold
/// any coinbase hash up to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MerkleTree {
    hashes: Vec<Hash>,
    steps: Vec<Hash>,
}

impl MerkleTree {
    pub(crate) fn new(hashes: Vec<Hash>) -> Self {
        let mut steps = Vec::new();
        let mut level = hashes.clone();

        while let Some((first, rest)) = level.split_first() {
            steps.push(*first);

            let mut rest = rest.to_vec();
            duplicate_last_if_odd(&mut rest);

            level = rest
                .chunks_exact(2)
                .map(|pair| join(&pair[0], &pair[1]))
                .collect();
        }

        Self { hashes, steps }
    }

    pub(crate) fn steps(&self) -> &[Hash] {
        &self.steps
    }

    /// Merkle root with `first` in the coinbase slot.
    pub(crate) fn with_first(&self, first: Hash) -> Hash {
        self.steps
            .iter()
            .fold(first, |acc, step| join(&acc, step))
    }

    /// Root of the non-coinbase hashes alone.
    pub(crate) fn root(&self) -> Option<Hash> {
        let mut level = self.hashes.clone();

        while level.len() > 1 {
            duplicate_last_if_odd(&mut level);

            level = level
                .chunks_exact(2)
                .map(|pair| join(&pair[0], &pair[1]))
                .collect();
        }

        level.first().copied()
    }

    /// Branch length prefix and side mask for proving `hash` is in the tree. The sibling hashes
    /// are never accumulated and the side mask is always zero, so the output is not a usable
    /// inclusion proof.
    pub(crate) fn hash_proof(&self, hash: &Hash) -> Option<Vec<u8>> {
        if self.hashes.is_empty() {
            let mut proof = vec![0];
            proof.extend_from_slice(&0i32.to_le_bytes());
            return Some(proof);
        }

        if !self.hashes.contains(hash) {
            return None;
        }

        let mut len = self.hashes.len() + 1;
        let mut branch_len = 0u64;

        while len > 1 {
            len = len.div_ceil(2);
            branch_len += 1;
        }

        let mut proof = pack_var_int(branch_len + 1).ok()?;
        proof.extend(serialize_number(0));

        Some(proof)
    }
}
