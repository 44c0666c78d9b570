use super::*;

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Subscribe {
    pub user_agent: Option<String>,
}

impl Serialize for Subscribe {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = usize::from(self.user_agent.is_some());
        let mut seq = serializer.serialize_seq(Some(len))?;
        if let Some(user_agent) = &self.user_agent {
            seq.serialize_element(user_agent)?;
        }
        seq.end()
    }
}

/// Miners send anything from no params to extra session data; only a leading string user agent
/// is used.
impl<'de> Deserialize<'de> for Subscribe {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let params = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();

        let user_agent = params
            .first()
            .and_then(Value::as_str)
            .filter(|user_agent| !user_agent.is_empty())
            .map(String::from);

        Ok(Subscribe { user_agent })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct SubscribeResult {
    pub subscription_id: HexBytes,
    pub extranonce1: Extranonce,
}

impl Serialize for SubscribeResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.subscription_id)?;
        seq.serialize_element(&self.extranonce1)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for SubscribeResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (subscription_id, extranonce1) = <(HexBytes, Extranonce)>::deserialize(deserializer)?;

        Ok(SubscribeResult {
            subscription_id,
            extranonce1,
        })
    }
}
