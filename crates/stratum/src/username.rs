use super::*;

/// Worker login of the form `<minerAddress>.<shortName>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn miner_address(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    pub fn short_name(&self) -> &str {
        self.0
            .split('.')
            .nth(1)
            .filter(|name| !name.is_empty())
            .unwrap_or("worker")
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
