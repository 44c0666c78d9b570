use super::*;

/// `mining.set_target([target])` with the 256-bit share target in little-endian byte order.
#[derive(Debug, PartialEq, Clone)]
pub struct SetTarget(pub HexBytes);

impl Serialize for SetTarget {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(1))?;
        seq.serialize_element(&self.0)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SetTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (target,) = <(HexBytes,)>::deserialize(deserializer)?;

        if target.len() != 32 {
            return Err(de::Error::custom(format!(
                "target must be 32 bytes, got {}",
                target.len()
            )));
        }

        Ok(SetTarget(target))
    }
}
