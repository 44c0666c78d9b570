use super::*;

/// The difficulty 1 target, `0x00000000ffff0000…`. Share difficulty is measured against it as
/// well, so it doubles as the proof-of-work limit.
pub(crate) static DIFF1: LazyLock<U256> =
    LazyLock::new(|| U256::from_big_endian(&Target::MAX.to_be_bytes()));

/// Pool difficulty is the network difficulty scaled by this factor.
pub(crate) const POOL_MULTIPLIER: f64 = 65536.0;

pub(crate) fn u256_to_f64(value: U256) -> f64 {
    value
        .0
        .iter()
        .rev()
        .fold(0.0, |acc, word| acc * 18_446_744_073_709_551_616.0 + *word as f64)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Difficulty of a target, or of a hash value read as a 256-bit integer.
pub(crate) fn difficulty(target: U256) -> f64 {
    u256_to_f64(*DIFF1) / u256_to_f64(target)
}

/// Expands compact `bits` into the full target.
pub(crate) fn target_from_bits(bits: u32) -> Result<U256> {
    let exponent = bits >> 24;
    let mantissa = U256::from(bits & 0x00ff_ffff);

    ensure!(exponent <= 32, "bits exponent {exponent} out of range");

    Ok(if exponent >= 3 {
        mantissa << (8 * (exponent - 3) as usize)
    } else {
        mantissa >> (8 * (3 - exponent) as usize)
    })
}

/// Target a share must meet to count at `difficulty`.
pub(crate) fn target_from_difficulty(difficulty: f64) -> U256 {
    // 2^32 - 1 keeps DIFF1 (2^224) * scale inside 256 bits.
    const MAX_SCALE: u64 = 0xFFFF_FFFF;

    let scale = (u64::MAX as f64 / difficulty)
        .floor()
        .clamp(1.0, MAX_SCALE as f64) as u64;

    let numerator = DIFF1.saturating_mul(U256::from(scale));
    let denominator = (difficulty * scale as f64).round() as u64;

    if denominator == 0 {
        U256::MAX
    } else {
        numerator / U256::from(denominator)
    }
}
