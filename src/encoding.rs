use super::*;

pub(crate) fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

pub(crate) fn reversed(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().copied().collect()
}

/// Decodes display hex into wire (little-endian) byte order.
pub(crate) fn hex_to_le(hex: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(hex).with_context(|| format!("invalid hex `{hex}`"))?;
    Ok(reversed(&bytes))
}

/// Encodes wire bytes as display hex.
pub(crate) fn le_to_hex(bytes: &[u8]) -> String {
    hex::encode(reversed(bytes))
}

/// Script number push in the BIP34 style: small values use the single byte opcodes, everything
/// else is a length byte followed by little-endian bytes.
pub(crate) fn serialize_number(mut n: u64) -> Vec<u8> {
    if (1..=16).contains(&n) {
        return vec![0x50 + n as u8];
    }

    let mut buf = vec![0];

    while n > 0x7f {
        buf.push((n & 0xff) as u8);
        n >>= 8;
    }

    buf[0] = buf.len() as u8;
    buf.push(n as u8);
    buf
}

pub(crate) fn serialize_string(s: &str) -> Vec<u8> {
    let len = s.len();
    let mut buf = Vec::with_capacity(len + 5);

    if len < 253 {
        buf.push(len as u8);
    } else if len < 0x10000 {
        buf.push(253);
        buf.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        buf.push(254);
        buf.extend_from_slice(&(len as u32).to_le_bytes());
    }

    buf.extend_from_slice(s.as_bytes());
    buf
}

pub(crate) fn pack_var_int(n: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(5);

    if n < 0xfd {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.write_u16::<LittleEndian>(n as u16)?;
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.write_u32::<LittleEndian>(n as u32)?;
    } else {
        bail!("UInt64 not implemented");
    }

    Ok(buf)
}

/// Pay-to-pubkey-hash script for a base58 address. The version byte and checksum are stripped
/// without being checked.
pub(crate) fn address_to_script(address: &str) -> Result<Vec<u8>> {
    let decoded = base58::decode(address)
        .with_context(|| format!("base58 decode failed for {address}"))?;

    ensure!(
        decoded.len() > 5,
        "base58 decode failed for {address}: payload too short"
    );

    let pubkey_hash = &decoded[1..decoded.len() - 4];

    let mut script = Vec::with_capacity(pubkey_hash.len() + 5);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_PUSH_20]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);

    Ok(script)
}

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_PUSH_20: u8 = 0x14;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers_use_opcodes() {
        assert_eq!(serialize_number(1), vec![0x51]);
        assert_eq!(serialize_number(16), vec![0x60]);
    }

    #[test]
    fn zero_and_larger_numbers_are_length_prefixed() {
        assert_eq!(serialize_number(0), vec![0x01, 0x00]);
        assert_eq!(serialize_number(17), vec![0x01, 0x11]);
        assert_eq!(serialize_number(0x7f), vec![0x01, 0x7f]);
        assert_eq!(serialize_number(0x80), vec![0x02, 0x80, 0x00]);
        assert_eq!(serialize_number(500_000), vec![0x03, 0x20, 0xa1, 0x07]);
    }

    #[test]
    fn strings_are_length_prefixed() {
        assert_eq!(serialize_string("ab"), vec![2, b'a', b'b']);

        let long = "x".repeat(300);
        let encoded = serialize_string(&long);
        assert_eq!(&encoded[..3], &[253, 0x2c, 0x01]);
        assert_eq!(encoded.len(), 303);
    }

    #[test]
    fn var_int_boundaries() {
        assert_eq!(pack_var_int(0xfc).unwrap(), vec![0xfc]);
        assert_eq!(pack_var_int(0xfd).unwrap(), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(pack_var_int(0xffff).unwrap(), vec![0xfd, 0xff, 0xff]);
        assert_eq!(
            pack_var_int(0x10000).unwrap(),
            vec![0xfe, 0x00, 0x00, 0x01, 0x00]
        );
        assert_eq!(
            pack_var_int(0x1_0000_0000).unwrap_err().to_string(),
            "UInt64 not implemented"
        );
    }

    #[test]
    fn hex_byte_order() {
        assert_eq!(hex_to_le("0102ff").unwrap(), vec![0xff, 0x02, 0x01]);
        assert_eq!(le_to_hex(&[0xff, 0x02, 0x01]), "0102ff");
        assert!(hex_to_le("zz").is_err());
    }

    #[test]
    fn double_sha256() {
        assert_eq!(
            hex::encode(sha256d(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }

    #[test]
    fn p2pkh_script_from_address() {
        let script = address_to_script("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").unwrap();

        assert_eq!(
            hex::encode(script),
            "76a91477bff20c60e522dfaa3350c39b030a5d004e839a88ac"
        );
    }

    #[test]
    fn founder_addresses_decode() {
        for address in Founders::MAINNET.addresses.iter().chain(Founders::TESTNET.addresses.iter()) {
            let script = address_to_script(address).unwrap();
            assert_eq!(script.len(), 25, "{address}");
        }
    }

    #[test]
    fn invalid_base58_fails() {
        assert!(
            address_to_script("0OIl")
                .unwrap_err()
                .to_string()
                .contains("base58 decode failed")
        );
    }
}
