use super::*;

pub const MTP_VERSION: u32 = 0x1000;
/// Serialized header size, the trailing bytes after the MTP hash value are reserved zeros.
pub const HEADER_SIZE: usize = 180;
pub const MTP_L: usize = 64;
pub const MTP_HASH_ROOT_SIZE: usize = 16;
pub const MTP_BLOCK_SIZE: usize = 8 * MTP_L * 2 * 128;

/// Memory-hard proof verification. Returns the 32-byte MTP hash value when the proof checks
/// out against the 80-byte input.
pub trait MtpVerifier: Send + Sync {
    fn verify(
        &self,
        input: &[u8; 80],
        nonce: &[u8],
        hash_root: &[u8],
        block: &[u8],
        proof: &[u8],
    ) -> Option<[u8; 32]>;
}

/// Stand-in used until a native MTP backend is linked. Every proof is unverifiable.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlinked;

impl MtpVerifier for Unlinked {
    fn verify(&self, _: &[u8; 80], _: &[u8], _: &[u8], _: &[u8], _: &[u8]) -> Option<[u8; 32]> {
        None
    }
}
