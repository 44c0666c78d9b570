use super::*;

/// Four byte job identifier. Displayed as big-endian hex, carried on the wire little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct JobId(u32);

impl JobId {
    pub fn new(n: u32) -> Self {
        Self(n)
    }

    pub fn to_wire(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Wire bytes of any length other than four never name a job.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        (bytes.len() == 4).then(|| Self(LittleEndian::read_u32(bytes)))
    }
}

impl FromStr for JobId {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 8 {
            return Err(InternalError::Parse {
                message: format!("job id '{s}' must be 8 hex characters"),
            });
        }

        let id = u32::from_str_radix(s, 16).map_err(|e| InternalError::Parse {
            message: format!("invalid job id hex string '{s}': {e}"),
        })?;

        Ok(JobId(id))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl From<JobId> for u32 {
    fn from(id: JobId) -> u32 {
        id.0
    }
}

impl From<u32> for JobId {
    fn from(id: u32) -> JobId {
        JobId(id)
    }
}

impl Serialize for JobId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.to_wire()))
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = HexBytes::deserialize(deserializer)?;

        JobId::from_wire(wire.as_bytes())
            .ok_or_else(|| de::Error::custom(format!("job id must be 4 bytes, got {}", wire.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_big_endian() {
        assert_eq!(JobId::new(1).to_string(), "00000001");
        assert_eq!(JobId::new(0xdeadbeef).to_string(), "deadbeef");
        assert_eq!("0000001f".parse::<JobId>().unwrap(), JobId::new(0x1f));
    }

    #[test]
    fn parse_requires_eight_chars() {
        assert!("1f".parse::<JobId>().is_err());
        assert!("00000000f".parse::<JobId>().is_err());
        assert!("0000000g".parse::<JobId>().is_err());
    }

    #[test]
    fn wire_is_little_endian() {
        let id = JobId::new(1);
        assert_eq!(id.to_wire(), [1, 0, 0, 0]);
        assert_eq!(serde_json::to_value(id).unwrap(), json!("01000000"));
        assert_eq!(
            serde_json::from_value::<JobId>(json!("01000000")).unwrap(),
            id
        );
    }

    #[test]
    fn from_wire_rejects_other_lengths() {
        assert_eq!(JobId::from_wire(&[1, 0, 0, 0]), Some(JobId::new(1)));
        assert_eq!(JobId::from_wire(&[1, 0, 0]), None);
        assert_eq!(JobId::from_wire(&[1, 0, 0, 0, 0]), None);
        assert!(serde_json::from_value::<JobId>(json!("010000")).is_err());
    }
}
